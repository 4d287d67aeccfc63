use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::output::Output;

/// Initial capacity of each buffer region: 4 KiB.
pub const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Reusable working memory owned by one filter instance.
///
/// Holds three regions:
/// - the output area, laid out as `[prespace slack][payload]`
/// - the backup region: unconsumed input retained for the next call
/// - a merge area joining backup and new input into one contiguous view
///
/// Regions grow on demand and are never shrunk; [`reset`](Self::reset)
/// clears them but keeps their allocations.
#[derive(Debug)]
pub struct FilterBuffer {
    out: BytesMut,
    backup: BytesMut,
    merged: BytesMut,
}

impl Default for FilterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBuffer {
    /// Create a buffer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer whose output area starts with `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: BytesMut::with_capacity(capacity),
            backup: BytesMut::new(),
            merged: BytesMut::new(),
        }
    }

    /// Open one filter invocation over `input`.
    ///
    /// Pending backup bytes are joined in front of `input`, and the backup
    /// region is emptied so it can collect this call's leftovers. The output
    /// area is cleared and `prespace` bytes of leading slack are reserved.
    pub fn stage<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Staged<'a> {
        self.out.clear();
        self.out.resize(prespace, 0);

        let input: &'a [u8] = if self.backup.is_empty() {
            input
        } else {
            trace!(
                backup = self.backup.len(),
                input = input.len(),
                "joining backup with new input"
            );
            self.merged.clear();
            std::mem::swap(&mut self.backup, &mut self.merged);
            self.merged.extend_from_slice(input);
            &self.merged
        };

        Staged {
            input,
            out: &mut self.out,
            prespace,
            backup: &mut self.backup,
        }
    }

    /// True when unconsumed input is waiting for the next call.
    pub fn has_backup(&self) -> bool {
        !self.backup.is_empty()
    }

    /// Number of bytes waiting in the backup region.
    pub fn backup_len(&self) -> usize {
        self.backup.len()
    }

    /// The bytes waiting in the backup region.
    pub fn pending(&self) -> &[u8] {
        &self.backup
    }

    /// Current capacity of the output area.
    pub fn capacity(&self) -> usize {
        self.out.capacity()
    }

    /// Drop all pending state, keeping allocations.
    pub fn reset(&mut self) {
        self.out.clear();
        self.backup.clear();
        self.merged.clear();
    }
}

/// One filter invocation in progress.
///
/// Gives the codec a contiguous view of its input together with disjoint
/// mutable access to the output area and the backup region.
#[derive(Debug)]
pub struct Staged<'a> {
    input: &'a [u8],
    out: &'a mut BytesMut,
    prespace: usize,
    backup: &'a mut BytesMut,
}

impl<'a> Staged<'a> {
    /// The input for this call, including any joined backup.
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Slack reserved before the payload.
    pub fn prespace(&self) -> usize {
        self.prespace
    }

    /// Guarantee that `additional` bytes can be written past the payload.
    ///
    /// Growth at least doubles the area, so repeated small requests stay
    /// amortized O(1).
    pub fn ensure_space(&mut self, additional: usize) {
        let needed = self.out.len() + additional;
        let capacity = self.out.capacity();
        if needed > capacity {
            let target = needed.max(capacity.saturating_mul(2));
            trace!(capacity, target, "growing filter output area");
            self.out.reserve(target - self.out.len());
        }
    }

    /// Append one byte to the payload.
    pub fn push(&mut self, byte: u8) {
        self.out.put_u8(byte);
    }

    /// Append `bytes` to the payload.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    /// The payload written so far in this call.
    pub fn payload(&self) -> &[u8] {
        &self.out[self.prespace..]
    }

    /// Length of the payload written so far in this call.
    pub fn payload_len(&self) -> usize {
        self.out.len() - self.prespace
    }

    /// Retain `bytes` to be prepended to the next call's input.
    ///
    /// Successive calls concatenate. An empty slice is a no-op.
    pub fn backup(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        trace!(len = bytes.len(), "backing up incomplete token");
        self.backup.extend_from_slice(bytes);
    }

    /// Close the invocation and hand out the produced payload.
    pub fn finish(self) -> Output<'a> {
        let Staged { out, prespace, .. } = self;
        Output::owned(&mut out[..], prespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_without_backup_uses_input_directly() {
        let mut buf = FilterBuffer::new();
        let input = b"hello";
        let staged = buf.stage(input, 0);

        assert_eq!(staged.input(), b"hello");
        assert!(std::ptr::eq(staged.input(), &input[..]));
    }

    #[test]
    fn backup_is_prepended_to_next_input() {
        let mut buf = FilterBuffer::new();
        {
            let mut staged = buf.stage(b"line one\nline t", 0);
            let input = staged.input();
            staged.backup(&input[9..]);
        }
        assert_eq!(buf.pending(), b"line t");

        let staged = buf.stage(b"wo\n", 0);
        assert_eq!(staged.input(), b"line two\n");
        drop(staged);
        assert!(!buf.has_backup());
    }

    #[test]
    fn repeated_backup_concatenates() {
        let mut buf = FilterBuffer::new();
        {
            let mut staged = buf.stage(b"abc", 0);
            staged.backup(b"a");
            staged.backup(b"");
            staged.backup(b"bc");
        }
        assert_eq!(buf.backup_len(), 3);
        assert_eq!(buf.pending(), b"abc");
    }

    #[test]
    fn backup_collected_while_merged_input_is_live() {
        let mut buf = FilterBuffer::new();
        {
            let mut staged = buf.stage(b"=y", 0);
            let input = staged.input();
            staged.backup(input);
        }
        {
            let mut staged = buf.stage(b"begin", 0);
            assert_eq!(staged.input(), b"=ybegin");
            let input = staged.input();
            staged.backup(input);
        }
        let staged = buf.stage(b" line=128\n", 0);
        assert_eq!(staged.input(), b"=ybegin line=128\n");
    }

    #[test]
    fn output_reserves_prespace() {
        let mut buf = FilterBuffer::new();
        let mut staged = buf.stage(b"data", 8);
        staged.extend(b"xyz");
        staged.push(b'!');

        assert_eq!(staged.payload(), b"xyz!");
        assert_eq!(staged.payload_len(), 4);
        assert_eq!(staged.prespace(), 8);

        let mut out = staged.finish();
        assert_eq!(out.as_bytes(), b"xyz!");
        assert_eq!(out.prespace(), 8);
        assert!(out.prepend(b"HDR:"));
        assert_eq!(out.as_bytes(), b"HDR:xyz!");
    }

    #[test]
    fn ensure_space_grows_geometrically() {
        let mut buf = FilterBuffer::with_capacity(16);
        let mut staged = buf.stage(b"", 0);
        staged.ensure_space(17);
        assert!(staged.out.capacity() >= 17);
        staged.extend(&[0u8; 17]);

        let before = staged.out.capacity();
        staged.ensure_space(before - staged.out.len() + 1);
        assert!(staged.out.capacity() >= before * 2);
    }

    #[test]
    fn output_area_is_reused_between_calls() {
        let mut buf = FilterBuffer::with_capacity(64);
        {
            let mut staged = buf.stage(b"", 0);
            staged.extend(b"first call");
        }
        let capacity = buf.capacity();
        let staged = buf.stage(b"", 0);
        assert!(staged.payload().is_empty());
        drop(staged);
        assert_eq!(buf.capacity(), capacity);
    }

    #[test]
    fn reset_clears_backup_but_keeps_capacity() {
        let mut buf = FilterBuffer::with_capacity(128);
        {
            let mut staged = buf.stage(b"partial", 0);
            staged.backup(b"partial");
        }
        let capacity = buf.capacity();
        buf.reset();

        assert!(!buf.has_backup());
        assert!(buf.capacity() >= capacity);
        let staged = buf.stage(b"fresh", 0);
        assert_eq!(staged.input(), b"fresh");
    }
}
