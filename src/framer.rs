//! Part framing state machine.
//!
//! Consumes an ordered sequence of byte buffers and yields complete parts,
//! reassembling parts whose declared length spans multiple buffers. The
//! machine has two states: Idle (no partial part) and Awaiting-Continuation
//! (a declared length exceeded the bytes available when the part began).
//!
//! How a buffer boundary inside a part payload is bridged depends on which
//! layer produced the boundaries, so the policy is explicit:
//!
//! - [`ContinuationPolicy::Transparent`]: boundaries are arbitrary transport
//!   splits; header varints and payload bytes continue directly in the next
//!   buffer. Splitting a serialized part sequence at any offset yields the
//!   identical sequence of parts.
//! - [`ContinuationPolicy::Reframed`]: boundaries are server-framed chunks;
//!   while a partial part is pending, each new buffer opens with a complete
//!   MEDIA_HEADER part (dispatched normally) followed by a part of the
//!   pending type whose payload continues the accumulated bytes.

use bytes::Bytes;
use tracing::warn;

use crate::error::UmpError;
use crate::part::{self, Part};
use crate::varint;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How buffer boundaries that fall inside a part payload are bridged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuationPolicy {
    /// Raw byte continuation across arbitrary splits.
    #[default]
    Transparent,
    /// Each continuation buffer is re-framed with MEDIA_HEADER + a part of
    /// the pending type.
    Reframed,
}

/// Policy for protocol violations with a defined recovery. Real-world
/// clients disagree on these, so both behaviors are offered; strict is the
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Fail fatally on any violation.
    #[default]
    Strict,
    /// Log and consume the bytes as a continuation regardless of the
    /// declared type (legacy-compatible behavior).
    Lenient,
}

// ---------------------------------------------------------------------------
// Framer
// ---------------------------------------------------------------------------

struct PartialPart {
    expected_type: u32,
    remaining: usize,
    accumulated: Vec<u8>,
    /// Reframed mode: the current buffer's MEDIA_HEADER has been consumed
    /// and the continuation part header is the next thing expected.
    mid_reframe: bool,
}

/// Streaming part framer. Feed buffers with [`PartFramer::push`]; call
/// [`PartFramer::finish`] at end of input to distinguish a clean stop from
/// a truncated one.
pub struct PartFramer {
    policy: ContinuationPolicy,
    strictness: Strictness,
    /// Header bytes cut off by a buffer end, prepended to the next buffer.
    /// Never grows past one part header (10 bytes).
    stash: Vec<u8>,
    pending: Option<PartialPart>,
}

/// Decode `[varint type] [varint length]` from the front of `buf`.
fn parse_header(buf: &[u8]) -> Result<(u32, usize, usize), UmpError> {
    let (part_type, n1) = varint::decode(buf)?;
    let (part_len, n2) = varint::decode(&buf[n1..])?;
    Ok((part_type, part_len as usize, n1 + n2))
}

impl PartFramer {
    pub fn new(policy: ContinuationPolicy, strictness: Strictness) -> Self {
        Self {
            policy,
            strictness,
            stash: Vec::new(),
            pending: None,
        }
    }

    /// True when no partial part or header fragment is outstanding.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.stash.is_empty()
    }

    /// Feed the next input buffer, returning every part completed by it in
    /// order. An empty return just means more input is needed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Part>, UmpError> {
        let owned;
        let buf: &[u8] = if self.stash.is_empty() {
            chunk
        } else {
            let mut v = std::mem::take(&mut self.stash);
            v.extend_from_slice(chunk);
            owned = v;
            &owned
        };

        let mut parts = Vec::new();
        let mut cur = 0usize;

        if self.pending.is_some() {
            cur = match self.policy {
                ContinuationPolicy::Transparent => self.fill_pending(buf, cur, &mut parts),
                ContinuationPolicy::Reframed => {
                    self.reframed_continuation(buf, cur, &mut parts)?
                }
            };
        }

        // Idle: walk whole parts out of the remainder of the buffer.
        while cur < buf.len() {
            let (part_type, part_len, consumed) = match parse_header(&buf[cur..]) {
                Ok(h) => h,
                Err(UmpError::TruncatedInput) => {
                    self.stash = buf[cur..].to_vec();
                    return Ok(parts);
                }
                Err(e) => return Err(e),
            };
            cur += consumed;
            let avail = buf.len() - cur;

            if part_len == 0 {
                parts.push(Part::new(part_type, Bytes::new()));
            } else if part_len <= avail {
                parts.push(Part::new(
                    part_type,
                    Bytes::copy_from_slice(&buf[cur..cur + part_len]),
                ));
                cur += part_len;
            } else {
                let mut accumulated = Vec::with_capacity(part_len);
                accumulated.extend_from_slice(&buf[cur..]);
                self.pending = Some(PartialPart {
                    expected_type: part_type,
                    remaining: part_len - avail,
                    accumulated,
                    mid_reframe: false,
                });
                cur = buf.len();
            }
        }

        Ok(parts)
    }

    /// End of input. Idle is a clean stop; anything else is a truncation.
    pub fn finish(&self) -> Result<(), UmpError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(UmpError::TruncatedInput)
        }
    }

    /// Transparent continuation: append raw bytes to the pending part.
    fn fill_pending(&mut self, buf: &[u8], mut cur: usize, parts: &mut Vec<Part>) -> usize {
        if let Some(p) = self.pending.as_mut() {
            let take = p.remaining.min(buf.len() - cur);
            p.accumulated.extend_from_slice(&buf[cur..cur + take]);
            p.remaining -= take;
            cur += take;
            if p.remaining == 0 {
                if let Some(done) = self.pending.take() {
                    parts.push(Part::new(done.expected_type, done.accumulated));
                }
            }
        }
        cur
    }

    /// Reframed continuation: MEDIA_HEADER + a part of the pending type,
    /// repeated until the pending part is satisfied or the buffer ends.
    fn reframed_continuation(
        &mut self,
        buf: &[u8],
        mut cur: usize,
        parts: &mut Vec<Part>,
    ) -> Result<usize, UmpError> {
        while cur < buf.len() {
            let Some(p) = self.pending.as_mut() else {
                break;
            };

            if !p.mid_reframe {
                let entry = cur;
                let (part_type, part_len, consumed) = match parse_header(&buf[cur..]) {
                    Ok(h) => h,
                    Err(UmpError::TruncatedInput) => {
                        self.stash = buf[cur..].to_vec();
                        return Ok(buf.len());
                    }
                    Err(e) => return Err(e),
                };
                let header_ok =
                    part_type == part::MEDIA_HEADER && part_len <= buf.len() - cur - consumed;
                if !header_ok {
                    match self.strictness {
                        Strictness::Strict => {
                            return Err(UmpError::ProtocolViolation(format!(
                                "continuation buffer not re-framed: got part type {part_type} \
                                 while awaiting {} more bytes of type {}",
                                p.remaining, p.expected_type,
                            )));
                        }
                        Strictness::Lenient => {
                            warn!(
                                part_type,
                                expected = p.expected_type,
                                "unframed continuation buffer, consuming bytes as-is"
                            );
                            return Ok(self.fill_pending(buf, entry, parts));
                        }
                    }
                }
                cur += consumed;
                parts.push(Part::new(
                    part::MEDIA_HEADER,
                    Bytes::copy_from_slice(&buf[cur..cur + part_len]),
                ));
                cur += part_len;
                p.mid_reframe = true;
                continue;
            }

            // The continuation part header follows the re-framed MEDIA_HEADER.
            let (cont_type, cont_len, consumed) = match parse_header(&buf[cur..]) {
                Ok(h) => h,
                Err(UmpError::TruncatedInput) => {
                    self.stash = buf[cur..].to_vec();
                    return Ok(buf.len());
                }
                Err(e) => return Err(e),
            };
            if cont_type != p.expected_type {
                match self.strictness {
                    Strictness::Strict => {
                        return Err(UmpError::ProtocolViolation(format!(
                            "continuation type mismatch: expected {}, got {cont_type}",
                            p.expected_type,
                        )));
                    }
                    Strictness::Lenient => {
                        warn!(
                            expected = p.expected_type,
                            got = cont_type,
                            "continuation type mismatch, treating as continuation"
                        );
                    }
                }
            }
            cur += consumed;

            let mut to_copy = cont_len;
            if cont_len > p.remaining {
                match self.strictness {
                    Strictness::Strict => {
                        return Err(UmpError::ProtocolViolation(format!(
                            "continuation declares {cont_len} bytes but only {} remain",
                            p.remaining,
                        )));
                    }
                    Strictness::Lenient => {
                        warn!(
                            declared = cont_len,
                            remaining = p.remaining,
                            "continuation overruns declared part length, clamping"
                        );
                        to_copy = p.remaining;
                    }
                }
            }

            let take = to_copy.min(buf.len() - cur);
            p.accumulated.extend_from_slice(&buf[cur..cur + take]);
            p.remaining -= take;
            cur += take;

            if p.remaining == 0 {
                // Lenient overrun: drop the declared excess before resuming.
                let excess = cont_len.saturating_sub(to_copy).min(buf.len() - cur);
                cur += excess;
                if let Some(done) = self.pending.take() {
                    parts.push(Part::new(done.expected_type, done.accumulated));
                }
            } else {
                // Either the buffer ended mid-payload (next chunk re-frames)
                // or the continuation carried fewer bytes than remain and a
                // fresh re-frame cycle follows in this buffer.
                p.mid_reframe = false;
            }
        }
        Ok(cur)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
