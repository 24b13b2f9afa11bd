//! Onesie crypto envelope.
//!
//! Request and response bodies travel AES-128-CTR encrypted with an
//! HMAC-SHA256 over `ciphertext || iv`, optionally gzip or brotli
//! compressed underneath. The 32-byte key splits into the AES key (first
//! half) and the HMAC key (second half); it is supplied by the caller and
//! never mutated here.
//!
//! ONESIE_ENCRYPTED_MEDIA uses a different mode: an all-zero IV, no HMAC,
//! and one continuous keystream across every chunk of a header id --
//! [`MediaKeystream`] keeps that position.

use std::io::{Read, Write};

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use prost::Message;

use crate::error::UmpError;
use crate::proto::{CompressionType, OnesieHeader, OnesiePlayerResponse, OnesieProxyStatus};

type Aes128Ctr = Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Full onesie key: AES half followed by HMAC half.
pub const KEY_LEN: usize = 32;
/// AES-128-CTR initialization vector length.
pub const IV_LEN: usize = 16;
/// Media decryption key length (ONESIE_DATA type MEDIA_DECRYPTION_KEY).
pub const MEDIA_KEY_LEN: usize = 16;

fn split_key(key: &[u8]) -> Result<(&[u8], &[u8]), UmpError> {
    if key.len() != KEY_LEN {
        return Err(UmpError::InvalidKeyLength(key.len()));
    }
    Ok((&key[..16], &key[16..]))
}

// ---------------------------------------------------------------------------
// seal / open
// ---------------------------------------------------------------------------

/// Output of [`seal`]. The three fields travel as separate request fields;
/// transmitting them is the transport collaborator's job.
pub struct SealedEnvelope {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
    pub hmac: [u8; 32],
}

/// Encrypt an outgoing body under a fresh random IV and authenticate it.
/// With `gzip` set the plaintext is gzip-compressed first.
pub fn seal(key: &[u8], plaintext: &[u8], gzip: bool) -> Result<SealedEnvelope, UmpError> {
    let (aes_key, hmac_key) = split_key(key)?;

    let mut ciphertext = if gzip {
        gzip_compress(plaintext)?
    } else {
        plaintext.to_vec()
    };

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut cipher = Aes128Ctr::new_from_slices(aes_key, &iv)
        .map_err(|_| UmpError::InvalidKeyLength(aes_key.len()))?;
    cipher.apply_keystream(&mut ciphertext);

    let mut mac = HmacSha256::new_from_slice(hmac_key)
        .map_err(|_| UmpError::InvalidKeyLength(hmac_key.len()))?;
    mac.update(&ciphertext);
    mac.update(&iv);
    let hmac: [u8; 32] = mac.finalize().into_bytes().into();

    Ok(SealedEnvelope {
        ciphertext,
        iv,
        hmac,
    })
}

/// Verify and decrypt an incoming body. The HMAC over `ciphertext || iv`
/// is checked in constant time before any decryption happens; on mismatch
/// no plaintext is produced.
pub fn open(key: &[u8], ciphertext: &[u8], iv: &[u8], hmac: &[u8]) -> Result<Vec<u8>, UmpError> {
    let (aes_key, hmac_key) = split_key(key)?;

    let mut mac = HmacSha256::new_from_slice(hmac_key)
        .map_err(|_| UmpError::InvalidKeyLength(hmac_key.len()))?;
    mac.update(ciphertext);
    mac.update(iv);
    mac.verify_slice(hmac)
        .map_err(|_| UmpError::AuthenticationFailed)?;

    let mut plaintext = ciphertext.to_vec();
    let mut cipher = Aes128Ctr::new_from_slices(aes_key, iv)
        .map_err(|_| UmpError::MissingCryptoParams("16-byte iv"))?;
    cipher.apply_keystream(&mut plaintext);
    Ok(plaintext)
}

/// Verify, decrypt and decompress an ONESIE_DATA body using the crypto
/// params of its pending header. Every required field must be populated.
pub fn open_with_header(
    key: &[u8],
    header: &OnesieHeader,
    ciphertext: &[u8],
) -> Result<Vec<u8>, UmpError> {
    let params = header
        .crypto_params
        .as_ref()
        .ok_or(UmpError::MissingCryptoParams("crypto_params"))?;
    let hmac = params
        .hmac
        .as_deref()
        .ok_or(UmpError::MissingCryptoParams("hmac"))?;
    let iv = params
        .iv
        .as_deref()
        .ok_or(UmpError::MissingCryptoParams("iv"))?;
    let compression = params
        .compression_type
        .and_then(|v| CompressionType::try_from(v).ok())
        .ok_or(UmpError::MissingCryptoParams("compression_type"))?;

    let plaintext = open(key, ciphertext, iv, hmac)?;
    decompress(&plaintext, compression)
}

/// Open a PLAYER_RESPONSE body and unwrap it. Beyond decrypt + decompress
/// the wrapper must report an OK proxy verdict and HTTP 200; anything else
/// fails with [`UmpError::Upstream`] carrying the wrapper body, which the
/// dispatcher treats as non-fatal.
pub fn open_player_response(
    key: &[u8],
    header: &OnesieHeader,
    ciphertext: &[u8],
) -> Result<Vec<u8>, UmpError> {
    let plaintext = open_with_header(key, header, ciphertext)?;
    let wrapper = OnesiePlayerResponse::decode(&plaintext[..])?;
    let proxy_status = wrapper.onesie_proxy_status.unwrap_or(0);
    let http_status = wrapper.http_status.unwrap_or(0);
    let body = wrapper.body.unwrap_or_default();
    if proxy_status != OnesieProxyStatus::Ok as i32 || http_status != 200 {
        return Err(UmpError::Upstream {
            proxy_status,
            http_status,
            body,
        });
    }
    Ok(body)
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Decompress an onesie body. Brotli when tagged as such; both remaining
/// tag values are gzip on the wire.
pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>, UmpError> {
    let mut out = Vec::new();
    match compression {
        CompressionType::Brotli => {
            brotli::Decompressor::new(data, 4096)
                .read_to_end(&mut out)
                .map_err(UmpError::DecompressionFailed)?;
        }
        _ => {
            GzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(UmpError::DecompressionFailed)?;
        }
    }
    Ok(out)
}

/// Gzip a plaintext request body before sealing.
pub fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, UmpError> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).map_err(UmpError::DecompressionFailed)?;
    enc.finish().map_err(UmpError::DecompressionFailed)
}

// ---------------------------------------------------------------------------
// Media keystream
// ---------------------------------------------------------------------------

/// Resumable AES-128-CTR keystream for one header id's encrypted media.
///
/// The IV is fixed at sixteen zero bytes and the counter position carries
/// over from chunk to chunk; the cipher is never reset between chunks of
/// the same id. Continuity across different ids is unspecified upstream,
/// so each id owns its own keystream.
pub struct MediaKeystream {
    cipher: Aes128Ctr,
}

impl MediaKeystream {
    pub fn new(key: &[u8]) -> Result<Self, UmpError> {
        if key.len() != MEDIA_KEY_LEN {
            return Err(UmpError::InvalidKeyLength(key.len()));
        }
        let cipher = Aes128Ctr::new_from_slices(key, &[0u8; IV_LEN])
            .map_err(|_| UmpError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Decrypt (or, symmetrically, encrypt) the next chunk in place.
    pub fn apply(&mut self, data: &mut [u8]) {
        self.cipher.apply_keystream(data);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
