//! Buffer and backup primitive for streaming filters.
//!
//! This is the lowest layer of mimefilter. A filter consumes its input in
//! whole tokens (one wire line, one escape pair) but receives that input in
//! arbitrarily cut chunks. [`FilterBuffer`] hides the cuts:
//! - unconsumed tails are kept with [`Staged::backup`] and transparently
//!   prepended to the next chunk
//! - output is produced into a reusable area with optional leading slack
//!   ("prespace") so downstream stages can prepend bytes without copying
//!
//! Everything else builds on the [`Staged`] and [`Output`] types provided here.

pub mod buffer;
pub mod output;

pub use buffer::{FilterBuffer, Staged, DEFAULT_CAPACITY};
pub use output::Output;
