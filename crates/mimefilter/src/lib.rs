//! Streaming content filters with an incremental yEnc codec.
//!
//! mimefilter transforms unbounded byte streams delivered in arbitrarily
//! sized chunks. Tokens cut by a chunk boundary (an escape pair, a line
//! break, a checksum trailer) are carried over inside the filter, so callers
//! push plain buffers in and read plain buffers out.
//!
//! # Crate Structure
//!
//! - [`buffer`]: Output area, prespace and backup primitive
//! - [`filter`]: The `MimeFilter` contract, tee filter, filter chains and I/O adapters
//! - [`yenc`]: yEnc encoder/decoder with part and file CRC-32 tracking
//!
//! ```
//! use mimefilter::filter::{transform, MimeFilter};
//! use mimefilter::yenc::YencFilter;
//!
//! let encoded = transform(&mut YencFilter::encoder(), b"\x00\xd6\x01");
//!
//! let mut decoder = YencFilter::decoder();
//! let (head, tail) = encoded.split_at(2);
//! let mut decoded = decoder.filter(head, 0).to_vec();
//! decoded.extend_from_slice(&decoder.complete(tail, 0));
//! assert_eq!(decoded, b"\x00\xd6\x01");
//! ```

/// Re-export buffer types.
pub mod buffer {
    pub use mimefilter_buffer::*;
}

/// Re-export the filter contract and adapters.
pub mod filter {
    pub use mimefilter_core::*;
}

/// Re-export yEnc types.
pub mod yenc {
    pub use mimefilter_yenc::*;
}
