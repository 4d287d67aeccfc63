use std::io::{self, ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::filter::MimeFilter;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads filtered bytes from any `Read` stream.
///
/// Chunks are pulled from the inner reader as needed and pushed through the
/// filter; `complete` is called exactly once when the inner reader reports
/// EOF. Callers just see the transformed stream.
pub struct FilterReader<R, F> {
    inner: R,
    filter: F,
    pending: BytesMut,
    finished: bool,
}

impl<R: Read, F: MimeFilter> FilterReader<R, F> {
    /// Wrap `inner`, transforming everything read through `filter`.
    pub fn new(inner: R, filter: F) -> Self {
        Self {
            inner,
            filter,
            pending: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            finished: false,
        }
    }

    /// True once the inner reader hit EOF and the filter was completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Borrow the filter, e.g. to inspect checksums after EOF.
    pub fn filter_ref(&self) -> &F {
        &self.filter
    }

    /// Mutably borrow the filter.
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// Consume the reader and return the inner stream and the filter.
    pub fn into_parts(self) -> (R, F) {
        (self.inner, self.filter)
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if read == 0 {
            let out = self.filter.complete(&[], 0);
            trace!(produced = out.len(), "filter completed at EOF");
            self.pending.extend_from_slice(&out);
            self.finished = true;
        } else {
            let out = self.filter.filter(&chunk[..read], 0);
            trace!(read, produced = out.len(), "filtered chunk");
            self.pending.extend_from_slice(&out);
        }
        Ok(())
    }
}

impl<R: Read, F: MimeFilter> Read for FilterReader<R, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.pending.is_empty() {
                let n = buf.len().min(self.pending.len());
                buf[..n].copy_from_slice(&self.pending[..n]);
                self.pending.advance(n);
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}
