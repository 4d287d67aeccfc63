use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FilterError;
use crate::filter::MimeFilter;

/// Adapts a [`MimeFilter`] to `tokio_util::codec`.
///
/// As a `Decoder`, every readable buffer is drained through `filter` and
/// `decode_eof` completes the filter once. As an `Encoder`, each item is
/// filtered into the destination; call [`finish`](Self::finish) to flush the
/// filter before closing the sink. Items may be [`Bytes`] or `&[u8]`.
///
/// After the filter has completed, further input is rejected with
/// [`FilterError::Completed`].
#[derive(Debug)]
pub struct FilterCodec<F> {
    filter: F,
    completed: bool,
}

impl<F: MimeFilter> FilterCodec<F> {
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            completed: false,
        }
    }

    /// Complete the filter into `dst`. Subsequent calls are no-ops.
    pub fn finish(&mut self, dst: &mut BytesMut) {
        if self.completed {
            return;
        }
        self.completed = true;
        dst.extend_from_slice(&self.filter.complete(&[], 0));
    }

    /// Borrow the filter.
    pub fn filter_ref(&self) -> &F {
        &self.filter
    }

    /// Consume the codec and return the filter.
    pub fn into_inner(self) -> F {
        self.filter
    }
}

fn non_empty(bytes: &[u8]) -> Option<Bytes> {
    if bytes.is_empty() {
        None
    } else {
        Some(Bytes::copy_from_slice(bytes))
    }
}

impl<F: MimeFilter> Decoder for FilterCodec<F> {
    type Item = Bytes;
    type Error = FilterError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FilterError> {
        if src.is_empty() {
            return Ok(None);
        }
        if self.completed {
            return Err(FilterError::Completed);
        }
        let input = src.split();
        Ok(non_empty(&self.filter.filter(&input, 0)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FilterError> {
        if let Some(chunk) = self.decode(src)? {
            return Ok(Some(chunk));
        }
        if self.completed {
            return Ok(None);
        }
        self.completed = true;
        Ok(non_empty(&self.filter.complete(&[], 0)))
    }
}

impl<F: MimeFilter> FilterCodec<F> {
    fn encode_slice(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), FilterError> {
        if self.completed {
            return Err(FilterError::Completed);
        }
        dst.extend_from_slice(&self.filter.filter(item, 0));
        Ok(())
    }
}

impl<F: MimeFilter> Encoder<Bytes> for FilterCodec<F> {
    type Error = FilterError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FilterError> {
        self.encode_slice(&item, dst)
    }
}

impl<F: MimeFilter> Encoder<&[u8]> for FilterCodec<F> {
    type Error = FilterError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), FilterError> {
        self.encode_slice(item, dst)
    }
}
