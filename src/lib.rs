//! Decoder for the UMP framed streaming protocol.
//!
//! A UMP response body multiplexes media bytes, control signals, and
//! encrypted onesie payloads over one HTTP stream whose buffer boundaries
//! are unrelated to logical message boundaries. Each frame (a "part") is:
//!
//!   [varint: part_type] [varint: part_size] [raw bytes: part_data]
//!
//! The varint encoding is the protocol's own prefix-counted format, NOT a
//! protobuf varint.
//!
//! The crate covers the varint codec ([`varint`]), the part framing state
//! machine with cross-buffer continuation ([`framer`]), the onesie
//! AES-CTR + HMAC + compression envelope ([`onesie`]), per-header-id media
//! stream reassembly ([`media`]), and the type-routing dispatcher
//! ([`dispatch`]). [`UmpDecoder`] glues the pipeline behind a single
//! push-buffers/get-events surface:
//!
//! ```
//! use yt_ump::{ContinuationPolicy, Strictness, UmpDecoder};
//!
//! let mut decoder = UmpDecoder::new(ContinuationPolicy::Transparent, Strictness::Strict);
//! // for each response buffer: decoder.push(&buf)? yields typed events
//! let events = decoder.push(&[]).unwrap();
//! assert!(events.is_empty());
//! ```
//!
//! Transport, key retrieval, and the schemas of inner payloads beyond the
//! framing/crypto envelope live with the caller.

pub mod dispatch;
pub mod error;
pub mod framer;
pub mod media;
pub mod onesie;
pub mod part;
pub mod proto;
pub mod varint;

pub use dispatch::{Dispatcher, UmpDecoder, UmpEvent};
pub use error::UmpError;
pub use framer::{ContinuationPolicy, PartFramer, Strictness};
pub use media::{FinalizedStream, StreamAssembler};
pub use part::Part;
