//! Incremental yEnc codec.
//!
//! yEnc maps every byte `b` to `b + 42` (mod 256) and escapes the few results
//! that cannot travel in a text line (NUL, LF, CR, `=`, and `.` at the start
//! of a line) as `=` followed by `value + 64`. Encoded data is framed by
//! `=ybegin`, optional `=ypart` and `=yend` lines carrying sizes and CRC-32
//! checksums.
//!
//! [`YencFilter`] implements [`MimeFilter`](mimefilter_core::MimeFilter) for
//! both directions. Input may be cut at any byte: escapes, line breaks and
//! marker lines split across calls decode the same as when delivered whole.
//!
//! # Crate Structure
//!
//! - [`filter`]: the filter, its configuration and accessors
//! - [`header`]: `=ybegin`/`=ypart`/`=yend` line types
//! - [`crc`]: the resumable CRC-32 accumulator
//! - [`state`]: protocol state that can be saved and seeded
//! - [`error`]: integrity conditions

pub mod crc;
pub mod error;
pub mod filter;
pub mod header;
pub mod state;

mod decode;
mod encode;
mod session;

pub use crc::{Crc32, CRC_INIT};
pub use error::{Result, Token, YencError};
pub use filter::{YencConfig, YencFilter, DEFAULT_LINE_WIDTH};
pub use header::{YencHeader, YencPart, YencTrailer, MAX_MARKER_LINE};
pub use state::{DecodeState, Direction, EncodeState, LinePosition, Progress, YencState};

/// The escape marker, `=`.
pub const ESCAPE: u8 = b'=';
/// Added to every byte when encoding.
pub const ENCODE_OFFSET: u8 = 42;
/// Added on top of [`ENCODE_OFFSET`] to escaped bytes.
pub const ESCAPE_OFFSET: u8 = 64;
