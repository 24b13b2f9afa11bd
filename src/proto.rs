//! Wire messages carried inside structured part payloads.
//!
//! Only the messages the decoder itself must read are defined here; every
//! other part payload stays opaque. Field tags follow the deployed protocol.

/// Compression applied to an onesie body or a media stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompressionType {
    None = 0,
    Gzip = 1,
    Brotli = 2,
}

/// Discriminator for what an ONESIE_HEADER announces. Types with a data
/// part occupy the dispatcher's pending slot; the rest are standalone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OnesieHeaderType {
    PlayerResponse = 0,
    MediaDecryptionKey = 2,
    NewHost = 6,
    RestrictedFormatsHint = 14,
    StreamMetadata = 16,
    EncryptedInnertubeResponsePart = 25,
}

impl OnesieHeaderType {
    /// Whether a following ONESIE_DATA part carries this header's body.
    pub fn expects_data(self) -> bool {
        matches!(
            self,
            OnesieHeaderType::PlayerResponse
                | OnesieHeaderType::MediaDecryptionKey
                | OnesieHeaderType::EncryptedInnertubeResponsePart
        )
    }
}

/// Decryption parameters for an onesie body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoParams {
    #[prost(bytes = "vec", optional, tag = "4")]
    pub hmac: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub iv: Option<Vec<u8>>,
    #[prost(enumeration = "CompressionType", optional, tag = "6")]
    pub compression_type: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnesieHeader {
    #[prost(enumeration = "OnesieHeaderType", optional, tag = "1")]
    pub r#type: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub video_id: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub crypto_params: Option<CryptoParams>,
}

/// Proxy verdict inside a decrypted player response wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OnesieProxyStatus {
    Unknown = 0,
    Ok = 1,
}

/// Wrapper around the player response body after decrypt + decompress.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OnesiePlayerResponse {
    #[prost(enumeration = "OnesieProxyStatus", optional, tag = "1")]
    pub onesie_proxy_status: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub body: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "3")]
    pub http_status: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FormatId {
    #[prost(int32, optional, tag = "1")]
    pub itag: Option<i32>,
    #[prost(int64, optional, tag = "2")]
    pub last_modified: Option<i64>,
    #[prost(string, optional, tag = "3")]
    pub xtags: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeRange {
    #[prost(int64, optional, tag = "1")]
    pub start: Option<i64>,
    #[prost(int64, optional, tag = "2")]
    pub end: Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MediaHeader {
    #[prost(uint32, optional, tag = "1")]
    pub header_id: Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub video_id: Option<String>,
    #[prost(int32, optional, tag = "3")]
    pub itag: Option<i32>,
    #[prost(uint64, optional, tag = "4")]
    pub lmt: Option<u64>,
    #[prost(string, optional, tag = "5")]
    pub xtags: Option<String>,
    #[prost(int64, optional, tag = "6")]
    pub start_range: Option<i64>,
    #[prost(enumeration = "CompressionType", optional, tag = "7")]
    pub compression_algorithm: Option<i32>,
    #[prost(bool, optional, tag = "8")]
    pub is_init_seg: Option<bool>,
    #[prost(int64, optional, tag = "9")]
    pub sequence_number: Option<i64>,
    #[prost(int64, optional, tag = "11")]
    pub start_ms: Option<i64>,
    #[prost(int64, optional, tag = "12")]
    pub duration_ms: Option<i64>,
    #[prost(message, optional, tag = "13")]
    pub format_id: Option<FormatId>,
    #[prost(int64, optional, tag = "14")]
    pub content_length: Option<i64>,
    #[prost(message, optional, tag = "15")]
    pub time_range: Option<TimeRange>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SabrError {
    #[prost(string, optional, tag = "1")]
    pub error_type: Option<String>,
    #[prost(int32, optional, tag = "2")]
    pub code: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SabrRedirect {
    #[prost(string, optional, tag = "1")]
    pub url: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamProtectionStatus {
    #[prost(int32, optional, tag = "1")]
    pub status: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlaybackCookie {
    #[prost(int32, optional, tag = "1")]
    pub field1: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub field2: Option<i32>,
    #[prost(message, optional, tag = "7")]
    pub video_fmt: Option<FormatId>,
    #[prost(message, optional, tag = "8")]
    pub audio_fmt: Option<FormatId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NextRequestPolicy {
    #[prost(int32, optional, tag = "1")]
    pub target_audio_readahead_ms: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub target_video_readahead_ms: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub backoff_time_ms: Option<i32>,
    #[prost(message, optional, tag = "7")]
    pub playback_cookie: Option<PlaybackCookie>,
    #[prost(string, optional, tag = "8")]
    pub video_id: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FormatInitializationMetadata {
    #[prost(message, optional, tag = "1")]
    pub format_id: Option<FormatId>,
    #[prost(int64, optional, tag = "2")]
    pub duration_ms: Option<i64>,
    #[prost(string, optional, tag = "3")]
    pub mime_type: Option<String>,
    #[prost(int64, optional, tag = "4")]
    pub end_segment_number: Option<i64>,
}
