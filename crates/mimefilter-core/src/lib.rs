//! Streaming filter contract for mimefilter.
//!
//! A filter is a stateful, synchronous byte transform. Callers push chunks
//! through [`MimeFilter::filter`] in whatever sizes they happen to read, then
//! call [`MimeFilter::complete`] once at end of stream. Tokens cut by a chunk
//! boundary are carried over internally; callers never see partial tokens.
//!
//! Provided here:
//! - [`MimeFilter`] and the [`Lifecycle`] every implementation tracks
//! - [`TeeFilter`], the pass-through reference filter
//! - [`FilterChain`], an ordered pipeline of filters
//! - [`FilterReader`] / [`FilterWriter`], `std::io` adapters
//! - `FilterCodec`, a `tokio_util::codec` adapter (behind the `async` feature)

pub mod chain;
#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod filter;
pub mod reader;
pub mod tee;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{FilterChain, FilterId};
#[cfg(feature = "async")]
pub use codec::FilterCodec;
pub use error::{FilterError, Result};
pub use filter::{transform, Lifecycle, MimeFilter, Phase};
pub use mimefilter_buffer::{FilterBuffer, Output, Staged};
pub use reader::FilterReader;
pub use tee::TeeFilter;
pub use writer::FilterWriter;
