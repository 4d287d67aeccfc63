use std::io::{self, ErrorKind, Write};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::error::{FilterError, Result};
use crate::filter::MimeFilter;

/// Writes filtered bytes to any `Write` stream.
///
/// Every buffer written is pushed through the filter and whatever it
/// produces is written to the inner stream. Call [`finish`](Self::finish)
/// at end of stream to flush the filter's retained state.
///
/// Once the filter has taken a buffer, `write` reports it as written even if
/// the inner stream then fails. The filtered output it could not deliver is
/// kept and sent first by the next `write`, `flush` or `finish`, which also
/// return the inner stream's error if it persists. Retrying a `write` never
/// feeds the same input through the filter twice.
pub struct FilterWriter<W, F> {
    inner: W,
    filter: F,
    pending: BytesMut,
    finished: bool,
}

impl<W: Write, F: MimeFilter> FilterWriter<W, F> {
    /// Wrap `inner`, transforming everything written through `filter`.
    pub fn new(inner: W, filter: F) -> Self {
        Self {
            inner,
            filter,
            pending: BytesMut::new(),
            finished: false,
        }
    }

    /// Complete the filter, write its tail and flush the inner stream.
    ///
    /// Any further write fails with [`FilterError::Completed`]. If the inner
    /// stream failed, calling `finish` again retries the undelivered output.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished && self.pending.is_empty() {
            return Err(FilterError::Completed);
        }
        self.drain_pending()?;

        if !self.finished {
            self.finished = true;
            let out = self.filter.complete(&[], 0);
            trace!(produced = out.len(), "filter completed");
            let mut offset = 0;
            if let Err(err) = write_fully(&mut self.inner, &out, &mut offset) {
                self.pending.extend_from_slice(&out[offset..]);
                return Err(err);
            }
        }
        flush_fully(&mut self.inner)
    }

    /// Filtered bytes not yet accepted by the inner stream.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// True once [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Borrow the filter, e.g. to read checksums after [`finish`](Self::finish).
    pub fn filter_ref(&self) -> &F {
        &self.filter
    }

    /// Mutably borrow the filter.
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// Consume the writer and return the inner stream and the filter.
    pub fn into_parts(self) -> (W, F) {
        (self.inner, self.filter)
    }

    fn drain_pending(&mut self) -> Result<()> {
        let mut offset = 0;
        let result = write_fully(&mut self.inner, &self.pending, &mut offset);
        self.pending.advance(offset);
        result
    }
}

impl<W: Write, F: MimeFilter> Write for FilterWriter<W, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(FilterError::Completed.into());
        }
        self.drain_pending()?;

        let out = self.filter.filter(buf, 0);
        trace!(written = buf.len(), produced = out.len(), "filtered chunk");
        let mut offset = 0;
        if let Err(err) = write_fully(&mut self.inner, &out, &mut offset) {
            self.pending.extend_from_slice(&out[offset..]);
            debug!(
                error = %err,
                pending = self.pending.len(),
                "inner write failed, keeping filtered output"
            );
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_pending()?;
        flush_fully(&mut self.inner).map_err(Into::into)
    }
}

/// Write `bytes[*offset..]`, advancing `offset` past everything accepted.
fn write_fully<W: Write>(inner: &mut W, bytes: &[u8], offset: &mut usize) -> Result<()> {
    while *offset < bytes.len() {
        match inner.write(&bytes[*offset..]) {
            Ok(0) => return Err(FilterError::SinkClosed),
            Ok(n) => *offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FilterError::Io(err)),
        }
    }
    Ok(())
}

fn flush_fully<W: Write>(inner: &mut W) -> Result<()> {
    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FilterError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::testing::LineFilter;

    #[test]
    fn writes_filtered_stream() {
        let mut writer = FilterWriter::new(Cursor::new(Vec::<u8>::new()), LineFilter::new());

        writer.write_all(b"first\nsec").unwrap();
        assert_eq!(writer.get_ref().get_ref().as_slice(), b"FIRST\n");

        writer.write_all(b"ond").unwrap();
        writer.finish().unwrap();

        let (inner, _filter) = writer.into_parts();
        assert_eq!(inner.into_inner(), b"FIRST\nSECOND");
    }

    #[test]
    fn write_after_finish_rejected() {
        let mut writer = FilterWriter::new(Vec::new(), LineFilter::new());
        writer.finish().unwrap();

        let err = writer.write(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(matches!(writer.finish(), Err(FilterError::Completed)));
    }

    #[test]
    fn finish_flushes_inner() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FilterWriter::new(sink, LineFilter::new());

        writer.write_all(b"x").unwrap();
        assert!(!flag.load(Ordering::SeqCst));
        writer.finish().unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn zero_length_write_reports_sink_closed() {
        let mut writer = FilterWriter::new(ZeroWriter, LineFilter::new());
        assert_eq!(writer.write(b"line\n").unwrap(), 5);
        assert_eq!(writer.pending(), b"LINE\n");

        let err = writer.write(b"more\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(writer.flush().unwrap_err().kind(), ErrorKind::WriteZero);
        assert!(matches!(writer.finish(), Err(FilterError::SinkClosed)));
    }

    #[test]
    fn failed_inner_write_is_retried_without_refiltering() {
        let sink = FailFirst {
            failed: false,
            data: Vec::new(),
        };
        let mut writer = FilterWriter::new(sink, LineFilter::new());

        assert_eq!(writer.write(b"one\n").unwrap(), 4);
        assert!(writer.get_ref().data.is_empty());
        assert_eq!(writer.pending(), b"ONE\n");

        writer.write_all(b"two\n").unwrap();
        writer.finish().unwrap();
        assert!(writer.pending().is_empty());
        assert_eq!(writer.get_ref().data, b"ONE\nTWO\n");
    }

    #[test]
    fn interrupted_write_retries() {
        let sink = InterruptOnce {
            interrupted: false,
            data: Vec::new(),
        };
        let mut writer = FilterWriter::new(sink, LineFilter::new());
        writer.write_all(b"retry\n").unwrap();
        assert_eq!(writer.get_ref().data, b"RETRY\n");
        assert!(writer.get_ref().interrupted);
    }

    #[test]
    fn accessors() {
        let mut writer = FilterWriter::new(Vec::new(), LineFilter::new());
        let _ = writer.get_mut();
        let _ = writer.filter_ref();
        let _ = writer.filter_mut();
        assert!(!writer.is_finished());
        writer.flush().unwrap();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailFirst {
        failed: bool,
        data: Vec<u8>,
    }

    impl Write for FailFirst {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::from(ErrorKind::BrokenPipe));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct InterruptOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptOnce {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
