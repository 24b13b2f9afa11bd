//! UMP part types and the framed part value.
//!
//! A part is `[varint type] [varint length] [length bytes of payload]`.
//! The catalog below covers the documented type numbers; anything else is
//! still framed and forwarded with its payload untouched.

use bytes::Bytes;

// ---------------------------------------------------------------------------
// Part type constants
// ---------------------------------------------------------------------------

pub const ONESIE_HEADER: u32 = 10;
pub const ONESIE_DATA: u32 = 11;
pub const ONESIE_ENCRYPTED_MEDIA: u32 = 12;
pub const MEDIA_HEADER: u32 = 20;
pub const MEDIA: u32 = 21;
pub const MEDIA_END: u32 = 22;
pub const LIVE_METADATA: u32 = 31;
pub const HOSTNAME_CHANGE_HINT: u32 = 32;
pub const NEXT_REQUEST_POLICY: u32 = 35;
pub const FORMAT_INITIALIZATION_METADATA: u32 = 42;
pub const SABR_REDIRECT: u32 = 43;
pub const SABR_ERROR: u32 = 44;
pub const SABR_SEEK: u32 = 45;
pub const RELOAD_PLAYER_RESPONSE: u32 = 46;
pub const SABR_CONTEXT_UPDATE: u32 = 57;
pub const STREAM_PROTECTION_STATUS: u32 = 58;
pub const SABR_CONTEXT_SENDING_POLICY: u32 = 59;

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// One complete framed part. Produced once per logical frame by the framer;
/// after dispatch it is owned by its handler.
#[derive(Debug, Clone)]
pub struct Part {
    pub part_type: u32,
    pub data: Bytes,
}

impl Part {
    pub fn new(part_type: u32, data: impl Into<Bytes>) -> Self {
        Self {
            part_type,
            data: data.into(),
        }
    }
}
