use thiserror::Error;

/// Error type shared by every layer of the decoder.
#[derive(Debug, Error)]
pub enum UmpError {
    /// Input ended in the middle of a varint or a declared part length with
    /// no more buffers available.
    #[error("input truncated mid-part")]
    TruncatedInput,

    /// The byte stream broke a protocol rule (mismatched continuation type,
    /// a second pending onesie header, data for an unknown or finalized
    /// header id). Fatal in strict mode; lenient mode logs and proceeds
    /// where recovery is defined.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// An onesie header needed for decryption was absent or incomplete.
    #[error("missing crypto parameter: {0}")]
    MissingCryptoParams(&'static str),

    /// A key had the wrong length: 32 bytes for the onesie key, 16 for the
    /// media decryption key.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// HMAC verification failed. The plaintext is never released.
    #[error("hmac authentication failed")]
    AuthenticationFailed,

    /// Gzip or brotli stream was malformed. Fatal for the affected part
    /// only; sibling streams are untouched.
    #[error("decompression failed")]
    DecompressionFailed(#[source] std::io::Error),

    /// The decrypted player response reported a non-OK upstream status.
    /// Non-fatal: the dispatcher surfaces this as an event and keeps going.
    #[error("upstream returned proxy_status={proxy_status} http_status={http_status}")]
    Upstream {
        proxy_status: i32,
        http_status: i32,
        body: Vec<u8>,
    },

    /// A structured part payload failed protobuf decoding.
    #[error("malformed part payload")]
    Decode(#[from] prost::DecodeError),
}
