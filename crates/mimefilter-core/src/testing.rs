//! Test doubles shared by the unit tests of this crate.

use mimefilter_buffer::{FilterBuffer, Output};

use crate::filter::{Lifecycle, MimeFilter};

/// Upper-cases whole lines; a trailing partial line is backed up until its
/// newline arrives or the stream completes.
pub(crate) struct LineFilter {
    buffer: FilterBuffer,
    lifecycle: Lifecycle,
}

impl LineFilter {
    pub(crate) fn new() -> Self {
        Self {
            buffer: FilterBuffer::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    fn run<'a>(&'a mut self, input: &'a [u8], prespace: usize, last: bool) -> Output<'a> {
        let mut staged = self.buffer.stage(input, prespace);
        let input = staged.input();
        let end = if last {
            input.len()
        } else {
            input
                .iter()
                .rposition(|&b| b == b'\n')
                .map_or(0, |pos| pos + 1)
        };

        staged.ensure_space(end);
        for &byte in &input[..end] {
            staged.push(byte.to_ascii_uppercase());
        }
        staged.backup(&input[end..]);
        staged.finish()
    }
}

impl MimeFilter for LineFilter {
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_filter("line");
        self.run(input, prespace, false)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_complete("line");
        self.run(input, prespace, true)
    }

    fn reset(&mut self) {
        self.lifecycle.on_reset();
        self.buffer.reset();
    }
}
