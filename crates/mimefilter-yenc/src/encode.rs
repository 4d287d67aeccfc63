use mimefilter_buffer::Staged;

use crate::session::Session;
use crate::state::EncodeState;
use crate::{ENCODE_OFFSET, ESCAPE, ESCAPE_OFFSET};

/// True when `value` (already offset) cannot appear literally in a line.
fn needs_escape(value: u8, column: usize) -> bool {
    matches!(value, 0 | b'\n' | b'\r' | ESCAPE) || (value == b'.' && column == 0)
}

/// Encode everything staged. The encoder never backs up input: every
/// source byte maps to output on its own.
pub(crate) fn step(
    state: &mut EncodeState,
    line_width: usize,
    session: &mut Session,
    staged: &mut Staged<'_>,
    last: bool,
) {
    let input = staged.input();
    session.absorb(input);

    // Worst case: every byte escaped, plus line breaks and the final newline.
    staged.ensure_space(input.len() * 2 + input.len() / line_width + 2);

    for &byte in input {
        let value = byte.wrapping_add(ENCODE_OFFSET);
        if needs_escape(value, state.column) {
            staged.push(ESCAPE);
            staged.push(value.wrapping_add(ESCAPE_OFFSET));
        } else {
            staged.push(value);
        }

        state.column += 1;
        if state.column >= line_width {
            staged.push(b'\n');
            state.column = 0;
        }
    }

    if last && state.column > 0 {
        staged.push(b'\n');
        state.column = 0;
    }
}
