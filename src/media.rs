//! Per-header-id media stream reassembly.
//!
//! MEDIA_HEADER opens a stream state; MEDIA and ONESIE_ENCRYPTED_MEDIA
//! parts carry a leading varint header id followed by payload bytes;
//! MEDIA_END finalizes the id and emits the completed stream. Distinct ids
//! are independent and may be open concurrently.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::UmpError;
use crate::framer::Strictness;
use crate::onesie::{self, MediaKeystream, MEDIA_KEY_LEN};
use crate::proto::{CompressionType, MediaHeader};
use crate::varint;

/// A stream finalized by MEDIA_END, decompressed when its header asked
/// for it.
#[derive(Debug, Clone)]
pub struct FinalizedStream {
    pub header_id: u32,
    pub data: Bytes,
}

struct MediaStream {
    compression: CompressionType,
    /// Continuous keystream for encrypted chunks; created from the media
    /// key at the first encrypted chunk and never reset for this id.
    cipher: Option<MediaKeystream>,
    buf: Vec<u8>,
    finalized: bool,
}

/// Correlates MEDIA_HEADER / MEDIA / ONESIE_ENCRYPTED_MEDIA / MEDIA_END
/// parts by header id.
pub struct StreamAssembler {
    streams: HashMap<u32, MediaStream>,
    /// Most recently observed media decryption key. May arrive before or
    /// interleaved with the chunks it protects.
    media_key: Option<[u8; MEDIA_KEY_LEN]>,
    strictness: Strictness,
}

impl StreamAssembler {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            streams: HashMap::new(),
            media_key: None,
            strictness,
        }
    }

    /// Install the media decryption key from a MEDIA_DECRYPTION_KEY body.
    pub fn set_media_key(&mut self, key: &[u8]) -> Result<(), UmpError> {
        let key: [u8; MEDIA_KEY_LEN] = key
            .try_into()
            .map_err(|_| UmpError::InvalidKeyLength(key.len()))?;
        debug!("media decryption key updated");
        self.media_key = Some(key);
        Ok(())
    }

    /// Open or update the stream state for a MEDIA_HEADER.
    pub fn on_media_header(&mut self, header: &MediaHeader) -> Result<(), UmpError> {
        let header_id = header.header_id.unwrap_or(0);
        let compression = header
            .compression_algorithm
            .and_then(|v| CompressionType::try_from(v).ok())
            .unwrap_or(CompressionType::None);

        if let Some(stream) = self.streams.get_mut(&header_id) {
            if stream.finalized {
                return self.violation(format!(
                    "media header for finalized header_id={header_id}"
                ));
            }
            stream.compression = compression;
        } else {
            self.streams.insert(
                header_id,
                MediaStream {
                    compression,
                    cipher: None,
                    buf: Vec::new(),
                    finalized: false,
                },
            );
        }
        Ok(())
    }

    /// Append a clear MEDIA payload: leading varint header id, then bytes.
    pub fn on_media(&mut self, data: &[u8]) -> Result<(), UmpError> {
        let (header_id, consumed) = varint::decode(data)?;
        let Some(stream) = self.lookup(header_id)? else {
            return Ok(()); // lenient drop
        };
        stream.buf.extend_from_slice(&data[consumed..]);
        Ok(())
    }

    /// Append an ONESIE_ENCRYPTED_MEDIA payload, decrypting with the id's
    /// running keystream.
    pub fn on_encrypted_media(&mut self, data: &[u8]) -> Result<(), UmpError> {
        let (header_id, consumed) = varint::decode(data)?;
        let key = self.media_key;
        let Some(stream) = self.lookup(header_id)? else {
            return Ok(());
        };
        if stream.cipher.is_none() {
            let key = key.ok_or(UmpError::MissingCryptoParams("media decryption key"))?;
            stream.cipher = Some(MediaKeystream::new(&key)?);
        }
        let mut chunk = data[consumed..].to_vec();
        if let Some(cipher) = stream.cipher.as_mut() {
            cipher.apply(&mut chunk);
        }
        stream.buf.extend_from_slice(&chunk);
        Ok(())
    }

    /// Finalize the id named by a MEDIA_END payload and emit its stream.
    pub fn on_media_end(&mut self, data: &[u8]) -> Result<Option<FinalizedStream>, UmpError> {
        let (header_id, _) = varint::decode(data)?;
        let Some(stream) = self.lookup(header_id)? else {
            return Ok(None);
        };
        stream.finalized = true;
        let raw = std::mem::take(&mut stream.buf);
        let data = match stream.compression {
            CompressionType::Gzip | CompressionType::Brotli => {
                let compression = stream.compression;
                onesie::decompress(&raw, compression)?
            }
            CompressionType::None => raw,
        };
        debug!(header_id, bytes = data.len(), "media stream finalized");
        Ok(Some(FinalizedStream {
            header_id,
            data: Bytes::from(data),
        }))
    }

    /// Header ids that are open but not finalized. A non-empty answer at
    /// end of input is incomplete, not erroneous; the caller decides.
    pub fn unfinished_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .streams
            .iter()
            .filter(|(_, s)| !s.finalized)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn lookup(&mut self, header_id: u32) -> Result<Option<&mut MediaStream>, UmpError> {
        match self.streams.get(&header_id) {
            None => {
                self.violation(format!("data for unknown header_id={header_id}"))?;
                Ok(None)
            }
            Some(s) if s.finalized => {
                self.violation(format!("data for finalized header_id={header_id}"))?;
                Ok(None)
            }
            Some(_) => Ok(self.streams.get_mut(&header_id)),
        }
    }

    fn violation(&self, msg: String) -> Result<(), UmpError> {
        match self.strictness {
            Strictness::Strict => Err(UmpError::ProtocolViolation(msg)),
            Strictness::Lenient => {
                warn!("{msg}, dropping");
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
