use mimefilter_buffer::Output;
use tracing::warn;

/// A stateful, synchronous stream transform.
///
/// Implementations transform as much of each input as forms complete
/// tokens and retain incomplete trailing tokens for the next call. The
/// returned [`Output`] borrows the filter (or the input) and is only valid
/// until the next call.
///
/// Calls on one instance must be strictly ordered: zero or more `filter`
/// calls, optionally one `complete`, then optionally `reset`. Calling
/// `filter` or `complete` after `complete` without a `reset` is a usage
/// error (see [`Lifecycle`]).
pub trait MimeFilter {
    /// Transform the next chunk of the stream.
    ///
    /// `prespace` asks the filter to reserve that many bytes of writable
    /// slack before its output; pass-through filters may ignore it.
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a>;

    /// Transform the final chunk and flush every retained token.
    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a>;

    /// Return to the freshly constructed state, keeping allocations.
    fn reset(&mut self);
}

impl<F: MimeFilter + ?Sized> MimeFilter for Box<F> {
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        (**self).filter(input, prespace)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        (**self).complete(input, prespace)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<F: MimeFilter + ?Sized> MimeFilter for &mut F {
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        (**self).filter(input, prespace)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        (**self).complete(input, prespace)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Run `input` through `filter` as one whole stream and collect the output.
pub fn transform<F: MimeFilter + ?Sized>(filter: &mut F, input: &[u8]) -> Vec<u8> {
    filter.complete(input, 0).to_vec()
}

/// Where a filter instance is in its call sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Just constructed or just reset.
    #[default]
    Idle,
    /// One or more `filter` calls made.
    Streaming,
    /// `complete` has been called; only `reset` is valid.
    Complete,
}

/// Call-order tracker embedded in every filter.
///
/// Out-of-order use trips a `debug_assert!` in debug builds. Release builds
/// log a warning and carry on; the output is then unspecified but memory
/// safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record a `filter` call.
    pub fn on_filter(&mut self, filter: &'static str) {
        self.check(filter, "filter");
        self.phase = Phase::Streaming;
    }

    /// Record a `complete` call.
    pub fn on_complete(&mut self, filter: &'static str) {
        self.check(filter, "complete");
        self.phase = Phase::Complete;
    }

    /// Record a `reset` call. Valid from any phase.
    pub fn on_reset(&mut self) {
        self.phase = Phase::Idle;
    }

    fn check(&self, filter: &'static str, op: &'static str) {
        if self.phase == Phase::Complete {
            warn!(filter, op, "filter used after complete without reset");
            debug_assert!(
                false,
                "{filter}: {op} called after complete without reset"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LineFilter;

    #[test]
    fn lifecycle_transitions() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Idle);

        lifecycle.on_filter("test");
        lifecycle.on_filter("test");
        assert_eq!(lifecycle.phase(), Phase::Streaming);

        lifecycle.on_complete("test");
        assert_eq!(lifecycle.phase(), Phase::Complete);

        lifecycle.on_reset();
        assert_eq!(lifecycle.phase(), Phase::Idle);

        lifecycle.on_complete("test");
        assert_eq!(lifecycle.phase(), Phase::Complete);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "filter called after complete without reset")]
    fn filter_after_complete_panics_in_debug() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.on_complete("test");
        lifecycle.on_filter("test");
    }

    #[test]
    fn boxed_filter_delegates() {
        let mut boxed: Box<dyn MimeFilter> = Box::new(LineFilter::new());
        assert!(boxed.filter(b"abc", 0).is_empty());
        assert_eq!(boxed.complete(b"\n", 0).as_bytes(), b"ABC\n");
        boxed.reset();
        assert_eq!(transform(&mut boxed, b"x\ny"), b"X\nY");
    }

    #[test]
    fn borrowed_filter_delegates() {
        let mut inner = LineFilter::new();
        let mut borrowed = &mut inner;
        let first = MimeFilter::filter(&mut borrowed, b"one\ntw", 0).to_vec();
        assert_eq!(first, b"ONE\n");
        assert_eq!(inner.complete(b"o", 0).as_bytes(), b"TWO");
    }
}
