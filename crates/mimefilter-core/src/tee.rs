use std::io::{self, Write};

use mimefilter_buffer::Output;
use tracing::warn;

use crate::filter::{Lifecycle, MimeFilter};

/// Pass-through filter that copies everything it sees to a sink.
///
/// The output is always the input, unchanged and uncopied; the filter never
/// backs anything up. Sink failures cannot travel through the filter
/// contract, so the first one is kept for [`take_error`](Self::take_error)
/// and later sink writes are skipped.
#[derive(Debug)]
pub struct TeeFilter<W> {
    sink: W,
    error: Option<io::Error>,
    lifecycle: Lifecycle,
}

impl<W: Write> TeeFilter<W> {
    /// Create a tee writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            error: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Mutably borrow the sink.
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consume the tee and return the sink.
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Take the first sink error, if any, re-enabling sink writes.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn tee(&mut self, input: &[u8]) {
        if self.error.is_some() || input.is_empty() {
            return;
        }
        if let Err(err) = self.sink.write_all(input) {
            warn!(error = %err, "tee sink write failed; skipping further writes");
            self.error = Some(err);
        }
    }
}

impl<W: Write> MimeFilter for TeeFilter<W> {
    fn filter<'a>(&'a mut self, input: &'a [u8], _prespace: usize) -> Output<'a> {
        self.lifecycle.on_filter("tee");
        self.tee(input);
        Output::shared(input)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], _prespace: usize) -> Output<'a> {
        self.lifecycle.on_complete("tee");
        self.tee(input);
        if self.error.is_none() {
            if let Err(err) = self.sink.flush() {
                warn!(error = %err, "tee sink flush failed");
                self.error = Some(err);
            }
        }
        Output::shared(input)
    }

    fn reset(&mut self) {
        self.lifecycle.on_reset();
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::filter::Phase;

    #[test]
    fn passes_input_through_and_copies_to_sink() {
        let mut tee = TeeFilter::new(Vec::new());

        let input = b"first chunk ";
        let out = tee.filter(input, 0);
        assert_eq!(out.as_bytes(), input);
        assert!(std::ptr::eq(out.as_bytes(), &input[..]));

        assert_eq!(tee.filter(b"second", 0).as_bytes(), b"second");
        assert!(tee.complete(b"", 0).is_empty());

        assert_eq!(tee.sink().as_slice(), b"first chunk second");
    }

    #[test]
    fn complete_flushes_sink() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut tee = TeeFilter::new(sink);

        tee.filter(b"x", 0);
        assert!(!flag.load(Ordering::SeqCst));
        tee.complete(b"y", 0);
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn sink_error_is_retained_and_output_unaffected() {
        let mut tee = TeeFilter::new(FailingWriter);

        assert_eq!(tee.filter(b"data", 0).as_bytes(), b"data");
        assert_eq!(tee.complete(b"more", 0).as_bytes(), b"more");

        let err = tee.take_error().expect("sink error should be kept");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(tee.take_error().is_none());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut tee = TeeFilter::new(Vec::new());
        tee.complete(b"abc", 0);
        assert_eq!(tee.lifecycle.phase(), Phase::Complete);

        tee.reset();
        assert_eq!(tee.lifecycle.phase(), Phase::Idle);
        tee.filter(b"def", 0);
        assert_eq!(tee.into_sink(), b"abcdef");
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

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
