//! Part routing.
//!
//! The dispatcher owns the single pending ONESIE_HEADER slot and routes
//! every completed part by type to the crypto envelope, the media stream
//! assembler, or an opaque pass-through event. Unrecognized type numbers
//! never fail: the part catalog is expected to grow, so anything unknown
//! is forwarded with its payload untouched.

use bytes::Bytes;
use prost::Message;
use tracing::{debug, warn};

use crate::error::UmpError;
use crate::framer::{ContinuationPolicy, PartFramer, Strictness};
use crate::media::{FinalizedStream, StreamAssembler};
use crate::onesie;
use crate::part::{self, Part};
use crate::proto;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One dispatched outcome per completed part (plus finalized media
/// streams). In-scope types arrive decoded; everything else is opaque.
#[derive(Debug, Clone)]
pub enum UmpEvent {
    /// Decrypted, decompressed player response body with OK status.
    PlayerResponse { video_id: Option<String>, body: Bytes },
    /// Decrypted inner response part; schema-decoded by the caller.
    EncryptedInnertubeResponsePart { body: Bytes },
    /// The upstream proxy reported a failure inside an otherwise valid
    /// envelope. Non-fatal: decoding continues.
    UpstreamError {
        proxy_status: i32,
        http_status: i32,
        body: Bytes,
    },
    /// A media stream header was opened or updated.
    MediaHeader(proto::MediaHeader),
    /// A media stream completed via MEDIA_END.
    MediaStream(FinalizedStream),
    SabrRedirect(proto::SabrRedirect),
    SabrError(proto::SabrError),
    StreamProtectionStatus(proto::StreamProtectionStatus),
    NextRequestPolicy(proto::NextRequestPolicy),
    FormatInitializationMetadata(proto::FormatInitializationMetadata),
    /// Forward-compatible pass-through for undocumented part types.
    Unknown { part_type: u32, data: Bytes },
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes completed parts and holds the pending-onesie-header coupling
/// between ONESIE_HEADER and the next ONESIE_DATA.
pub struct Dispatcher {
    strictness: Strictness,
    onesie_key: Option<[u8; onesie::KEY_LEN]>,
    /// At most one header may await its data part at a time.
    pending_header: Option<proto::OnesieHeader>,
    assembler: StreamAssembler,
}

impl Dispatcher {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            onesie_key: None,
            pending_header: None,
            assembler: StreamAssembler::new(strictness),
        }
    }

    /// Install the 32-byte onesie key sourced from configuration.
    pub fn set_onesie_key(&mut self, key: &[u8]) -> Result<(), UmpError> {
        let key: [u8; onesie::KEY_LEN] = key
            .try_into()
            .map_err(|_| UmpError::InvalidKeyLength(key.len()))?;
        self.onesie_key = Some(key);
        Ok(())
    }

    /// Header ids still open; see [`StreamAssembler::unfinished_ids`].
    pub fn unfinished_ids(&self) -> Vec<u32> {
        self.assembler.unfinished_ids()
    }

    /// Route one part. Returns the events it produced, in order.
    pub fn dispatch(&mut self, part: Part) -> Result<Vec<UmpEvent>, UmpError> {
        let mut events = Vec::new();
        match part.part_type {
            part::ONESIE_HEADER => self.on_onesie_header(&part.data)?,
            part::ONESIE_DATA => self.on_onesie_data(&part.data, &mut events)?,
            part::ONESIE_ENCRYPTED_MEDIA => self.assembler.on_encrypted_media(&part.data)?,
            part::MEDIA_HEADER => {
                let header = proto::MediaHeader::decode(&part.data[..])?;
                self.assembler.on_media_header(&header)?;
                events.push(UmpEvent::MediaHeader(header));
            }
            part::MEDIA => self.assembler.on_media(&part.data)?,
            part::MEDIA_END => {
                if let Some(stream) = self.assembler.on_media_end(&part.data)? {
                    events.push(UmpEvent::MediaStream(stream));
                }
            }
            part::SABR_REDIRECT => {
                events.push(UmpEvent::SabrRedirect(proto::SabrRedirect::decode(
                    &part.data[..],
                )?));
            }
            part::SABR_ERROR => {
                events.push(UmpEvent::SabrError(proto::SabrError::decode(
                    &part.data[..],
                )?));
            }
            part::STREAM_PROTECTION_STATUS => {
                events.push(UmpEvent::StreamProtectionStatus(
                    proto::StreamProtectionStatus::decode(&part.data[..])?,
                ));
            }
            part::NEXT_REQUEST_POLICY => {
                events.push(UmpEvent::NextRequestPolicy(
                    proto::NextRequestPolicy::decode(&part.data[..])?,
                ));
            }
            part::FORMAT_INITIALIZATION_METADATA => {
                events.push(UmpEvent::FormatInitializationMetadata(
                    proto::FormatInitializationMetadata::decode(&part.data[..])?,
                ));
            }
            other => {
                debug!(part_type = other, bytes = part.data.len(), "pass-through part");
                events.push(UmpEvent::Unknown {
                    part_type: other,
                    data: part.data,
                });
            }
        }
        Ok(events)
    }

    fn on_onesie_header(&mut self, data: &[u8]) -> Result<(), UmpError> {
        let header = proto::OnesieHeader::decode(data)?;
        let header_type = header
            .r#type
            .and_then(|v| proto::OnesieHeaderType::try_from(v).ok());

        let Some(header_type) = header_type else {
            debug!(raw = ?header.r#type, "onesie header with unrecognized type, dropped");
            return Ok(());
        };

        if !header_type.expects_data() {
            // NEW_HOST / RESTRICTED_FORMATS_HINT / STREAM_METADATA carry no
            // data part and never occupy the pending slot.
            debug!(?header_type, "standalone onesie header");
            return Ok(());
        }

        if self.pending_header.is_some() {
            match self.strictness {
                Strictness::Strict => {
                    return Err(UmpError::ProtocolViolation(
                        "second onesie header while one is pending".into(),
                    ));
                }
                Strictness::Lenient => {
                    warn!("second onesie header while one is pending, replacing");
                }
            }
        }
        self.pending_header = Some(header);
        Ok(())
    }

    fn on_onesie_data(&mut self, data: &[u8], events: &mut Vec<UmpEvent>) -> Result<(), UmpError> {
        let Some(header) = self.pending_header.take() else {
            return match self.strictness {
                Strictness::Strict => Err(UmpError::ProtocolViolation(
                    "onesie data without a pending header".into(),
                )),
                Strictness::Lenient => {
                    warn!("onesie data without a pending header, dropping");
                    Ok(())
                }
            };
        };
        let header_type = header
            .r#type
            .and_then(|v| proto::OnesieHeaderType::try_from(v).ok())
            .ok_or(UmpError::MissingCryptoParams("onesie header type"))?;

        match header_type {
            proto::OnesieHeaderType::MediaDecryptionKey => {
                self.assembler.set_media_key(data)?;
            }
            proto::OnesieHeaderType::PlayerResponse => {
                let key = self
                    .onesie_key
                    .ok_or(UmpError::MissingCryptoParams("onesie key"))?;
                match onesie::open_player_response(&key, &header, data) {
                    Ok(body) => events.push(UmpEvent::PlayerResponse {
                        video_id: header.video_id.clone(),
                        body: Bytes::from(body),
                    }),
                    // Structured, non-fatal: surface and keep decoding.
                    Err(UmpError::Upstream {
                        proxy_status,
                        http_status,
                        body,
                    }) => events.push(UmpEvent::UpstreamError {
                        proxy_status,
                        http_status,
                        body: Bytes::from(body),
                    }),
                    Err(e) => return Err(e),
                }
            }
            proto::OnesieHeaderType::EncryptedInnertubeResponsePart => {
                let key = self
                    .onesie_key
                    .ok_or(UmpError::MissingCryptoParams("onesie key"))?;
                let plaintext = onesie::open_with_header(&key, &header, data)?;
                events.push(UmpEvent::EncryptedInnertubeResponsePart {
                    body: Bytes::from(plaintext),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decoder: framer + dispatcher
// ---------------------------------------------------------------------------

/// The whole pipeline behind one push-buffers/get-events surface. Single
/// consumption pass: feed each response buffer once, in order.
pub struct UmpDecoder {
    framer: PartFramer,
    dispatcher: Dispatcher,
}

impl UmpDecoder {
    pub fn new(policy: ContinuationPolicy, strictness: Strictness) -> Self {
        Self {
            framer: PartFramer::new(policy, strictness),
            dispatcher: Dispatcher::new(strictness),
        }
    }

    pub fn set_onesie_key(&mut self, key: &[u8]) -> Result<(), UmpError> {
        self.dispatcher.set_onesie_key(key)
    }

    /// Feed the next input buffer; returns the ordered events it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<UmpEvent>, UmpError> {
        let mut events = Vec::new();
        for part in self.framer.push(chunk)? {
            events.extend(self.dispatcher.dispatch(part)?);
        }
        Ok(events)
    }

    /// End of input. Truncation mid-part is an error; open media streams
    /// are reported for the caller to judge.
    pub fn finish(self) -> Result<Vec<u32>, UmpError> {
        self.framer.finish()?;
        Ok(self.dispatcher.unfinished_ids())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint;
    use prost::Message;

    const KEY: [u8; 32] = [0x42; 32];

    fn encode_part(out: &mut Vec<u8>, part_type: u32, payload: &[u8]) {
        varint::encode(out, part_type);
        varint::encode(out, payload.len() as u32);
        out.extend_from_slice(payload);
    }

    fn onesie_header_part(
        header_type: proto::OnesieHeaderType,
        sealed: Option<&onesie::SealedEnvelope>,
    ) -> Vec<u8> {
        let header = proto::OnesieHeader {
            r#type: Some(header_type as i32),
            video_id: Some("dQw4w9WgXcQ".into()),
            crypto_params: sealed.map(|s| proto::CryptoParams {
                hmac: Some(s.hmac.to_vec()),
                iv: Some(s.iv.to_vec()),
                compression_type: Some(proto::CompressionType::Gzip as i32),
            }),
        };
        header.encode_to_vec()
    }

    fn player_response_wrapper(proxy_status: i32, http_status: i32, body: &[u8]) -> Vec<u8> {
        proto::OnesiePlayerResponse {
            onesie_proxy_status: Some(proxy_status),
            body: Some(body.to_vec()),
            http_status: Some(http_status),
        }
        .encode_to_vec()
    }

    #[test]
    fn sealed_player_response_dispatches() {
        let wrapper = player_response_wrapper(1, 200, b"{\"ok\":true}");
        let sealed = onesie::seal(&KEY, &wrapper, true).unwrap();

        let mut wire = Vec::new();
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::PlayerResponse, Some(&sealed)),
        );
        encode_part(&mut wire, part::ONESIE_DATA, &sealed.ciphertext);

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        decoder.set_onesie_key(&KEY).unwrap();
        let events = decoder.push(&wire).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            UmpEvent::PlayerResponse { video_id, body } => {
                assert_eq!(video_id.as_deref(), Some("dQw4w9WgXcQ"));
                assert_eq!(&body[..], b"{\"ok\":true}");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn upstream_failure_is_non_fatal() {
        let wrapper = player_response_wrapper(1, 503, b"backend unavailable");
        let sealed = onesie::seal(&KEY, &wrapper, true).unwrap();

        let mut wire = Vec::new();
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::PlayerResponse, Some(&sealed)),
        );
        encode_part(&mut wire, part::ONESIE_DATA, &sealed.ciphertext);
        // A sibling part after the failed wrapper must still dispatch.
        encode_part(&mut wire, 99, b"future");

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        decoder.set_onesie_key(&KEY).unwrap();
        let events = decoder.push(&wire).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            UmpEvent::UpstreamError {
                http_status, body, ..
            } => {
                assert_eq!(*http_status, 503);
                assert_eq!(&body[..], b"backend unavailable");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(events[1], UmpEvent::Unknown { part_type: 99, .. }));
    }

    #[test]
    fn missing_crypto_params_is_fatal() {
        let wrapper = player_response_wrapper(1, 200, b"x");
        let sealed = onesie::seal(&KEY, &wrapper, true).unwrap();

        let mut wire = Vec::new();
        // Header without crypto params.
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::PlayerResponse, None),
        );
        encode_part(&mut wire, part::ONESIE_DATA, &sealed.ciphertext);

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        decoder.set_onesie_key(&KEY).unwrap();
        assert!(matches!(
            decoder.push(&wire),
            Err(UmpError::MissingCryptoParams("crypto_params"))
        ));
    }

    #[test]
    fn double_pending_header_strict_vs_lenient() {
        let header = onesie_header_part(proto::OnesieHeaderType::PlayerResponse, None);
        let mut wire = Vec::new();
        encode_part(&mut wire, part::ONESIE_HEADER, &header);
        encode_part(&mut wire, part::ONESIE_HEADER, &header);

        let mut strict = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        assert!(matches!(
            strict.push(&wire),
            Err(UmpError::ProtocolViolation(_))
        ));

        let mut lenient = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Lenient);
        lenient.push(&wire).unwrap();
    }

    #[test]
    fn standalone_header_types_skip_pending_slot() {
        let mut wire = Vec::new();
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::NewHost, None),
        );
        // A data-bearing header right after must not trip the double-pending
        // check, because NEW_HOST never occupied the slot.
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::PlayerResponse, None),
        );

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        decoder.push(&wire).unwrap();
    }

    #[test]
    fn media_key_then_encrypted_media_roundtrip() {
        let media_key = [5u8; 16];
        let plain = b"encrypted media bytes".to_vec();
        let mut ks = onesie::MediaKeystream::new(&media_key).unwrap();
        let mut ciphertext = plain.clone();
        ks.apply(&mut ciphertext);

        let media_header = proto::MediaHeader {
            header_id: Some(1),
            ..Default::default()
        }
        .encode_to_vec();

        let mut wire = Vec::new();
        encode_part(
            &mut wire,
            part::ONESIE_HEADER,
            &onesie_header_part(proto::OnesieHeaderType::MediaDecryptionKey, None),
        );
        encode_part(&mut wire, part::ONESIE_DATA, &media_key);
        encode_part(&mut wire, part::MEDIA_HEADER, &media_header);
        let mut payload = Vec::new();
        varint::encode(&mut payload, 1);
        payload.extend_from_slice(&ciphertext);
        encode_part(&mut wire, part::ONESIE_ENCRYPTED_MEDIA, &payload);
        let mut end = Vec::new();
        varint::encode(&mut end, 1);
        encode_part(&mut wire, part::MEDIA_END, &end);

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        let events = decoder.push(&wire).unwrap();
        let stream = events
            .iter()
            .find_map(|e| match e {
                UmpEvent::MediaStream(s) => Some(s),
                _ => None,
            })
            .expect("stream should finalize");
        assert_eq!(&stream.data[..], &plain[..]);
    }

    #[test]
    fn unknown_part_passes_through_unchanged() {
        let mut wire = Vec::new();
        encode_part(&mut wire, 77, &[1, 2, 3]);

        let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
        let events = decoder.push(&wire).unwrap();
        match &events[0] {
            UmpEvent::Unknown { part_type, data } => {
                assert_eq!(*part_type, 77);
                assert_eq!(&data[..], &[1, 2, 3]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
