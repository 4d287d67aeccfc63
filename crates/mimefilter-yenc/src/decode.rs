use mimefilter_buffer::Staged;
use tracing::debug;

use crate::error::{Token, YencError};
use crate::header::{self, Marker, YencHeader, YencPart, YencTrailer};
use crate::session::Session;
use crate::state::{DecodeState, LinePosition, Progress};
use crate::{ENCODE_OFFSET, ESCAPE, ESCAPE_OFFSET};

/// Decode everything staged.
///
/// Incomplete marker lines and a trailing line-start `=` are backed up; a
/// mid-line `=` at the end of the input leaves the state in
/// [`LinePosition::Escape`]. When `last` is set nothing is backed up and
/// unfinished tokens are recorded as issues instead.
pub(crate) fn step(
    state: &mut DecodeState,
    session: &mut Session,
    staged: &mut Staged<'_>,
    last: bool,
) {
    let input = staged.input();
    staged.ensure_space(input.len());

    // Decoded bytes from `mark` on have not been fed to the accumulators yet.
    let mut mark = staged.payload_len();
    let mut pos = 0;

    while pos < input.len() {
        match state.line {
            LinePosition::Start => match input[pos] {
                b'\r' | b'\n' => pos += 1,
                ESCAPE => match input.get(pos + 1) {
                    Some(b'y') => {
                        let rest = &input[pos..];
                        let Some(eol) = rest.iter().position(|&b| b == b'\n') else {
                            if last {
                                absorb(session, staged, &mut mark);
                                unterminated_marker(rest, state, session);
                            } else if rest.len() > header::MAX_MARKER_LINE {
                                oversized_marker(rest, state, session);
                            } else {
                                staged.backup(rest);
                            }
                            break;
                        };
                        absorb(session, staged, &mut mark);
                        marker_line(&rest[..=eol], state, session);
                        pos += eol + 1;
                    }
                    Some(_) => {
                        enter_line(state);
                        if state.line == LinePosition::Middle {
                            state.line = LinePosition::Escape;
                        }
                        pos += 1;
                    }
                    None => {
                        if !last {
                            staged.backup(&input[pos..]);
                        } else if state.progress.accepts_data() {
                            session.record(YencError::Truncated(Token::Escape));
                        }
                        pos = input.len();
                    }
                },
                _ => enter_line(state),
            },
            LinePosition::Middle => {
                let rest = &input[pos..];
                let mut used = 0;
                for &byte in rest {
                    used += 1;
                    match byte {
                        b'\n' => {
                            state.line = LinePosition::Start;
                            break;
                        }
                        b'\r' => {}
                        ESCAPE => {
                            state.line = LinePosition::Escape;
                            break;
                        }
                        _ => staged.push(byte.wrapping_sub(ENCODE_OFFSET)),
                    }
                }
                pos += used;
            }
            LinePosition::Escape => {
                match input[pos] {
                    b'\n' => {
                        debug!("dropping escape marker at end of line");
                        state.line = LinePosition::Start;
                    }
                    b'\r' => {
                        debug!("dropping escape marker at end of line");
                        state.line = LinePosition::Middle;
                    }
                    byte => {
                        staged.push(byte.wrapping_sub(ESCAPE_OFFSET + ENCODE_OFFSET));
                        state.line = LinePosition::Middle;
                    }
                }
                pos += 1;
            }
            LinePosition::Skip => match input[pos..].iter().position(|&b| b == b'\n') {
                Some(eol) => {
                    state.line = LinePosition::Start;
                    pos += eol + 1;
                }
                None => pos = input.len(),
            },
        }
    }

    absorb(session, staged, &mut mark);

    if last {
        if state.line == LinePosition::Escape {
            session.record(YencError::Truncated(Token::Escape));
            state.line = LinePosition::Middle;
        }
        if state.progress.accepts_data() && session.is_open() {
            session.record(YencError::MissingTrailer);
        }
    }
}

/// Leave `Start` for a data line, or skip the line outside a part.
fn enter_line(state: &mut DecodeState) {
    if state.progress.accepts_data() {
        state.progress = Progress::Data;
        state.line = LinePosition::Middle;
    } else {
        state.line = LinePosition::Skip;
    }
}

fn absorb(session: &mut Session, staged: &Staged<'_>, mark: &mut usize) {
    session.absorb(&staged.payload()[*mark..]);
    *mark = staged.payload_len();
}

/// Act on one complete `=y...` line.
fn marker_line(line: &[u8], state: &mut DecodeState, session: &mut Session) {
    match header::classify(line) {
        Marker::Begin => {
            state.progress = Progress::Begun;
            match YencHeader::parse(line) {
                Ok(header) => session.begin(header),
                Err(err) => {
                    session.start_part();
                    session.record(err);
                }
            }
        }
        Marker::Part => {
            state.progress = Progress::Part;
            match YencPart::parse(line) {
                Ok(part) => session.enter_part(part),
                Err(err) => {
                    session.start_part();
                    session.record(err);
                }
            }
        }
        Marker::End => {
            state.progress = Progress::End;
            match YencTrailer::parse(line) {
                Ok(trailer) => session.end(trailer),
                Err(err) => session.record(err),
            }
        }
        Marker::Unknown => {
            debug!(line = %String::from_utf8_lossy(line).trim_end(), "skipping unknown marker line");
        }
    }
}

/// A marker line that outgrew [`header::MAX_MARKER_LINE`] before its newline.
/// The rest of it is skipped.
fn oversized_marker(line: &[u8], state: &mut DecodeState, session: &mut Session) {
    session.record(YencError::MalformedLine {
        keyword: header::classify(line).keyword(),
        reason: format!("longer than {} bytes", header::MAX_MARKER_LINE),
    });
    state.line = LinePosition::Skip;
}

/// A marker line cut off by the end of the stream.
///
/// Complete keywords are still honored, since trailers are often sent
/// without a final newline.
fn unterminated_marker(line: &[u8], state: &mut DecodeState, session: &mut Session) {
    if header::is_partial_keyword(line) {
        session.record(YencError::Truncated(Token::MarkerLine));
        return;
    }
    let before = session.issues.len();
    marker_line(line, state, session);
    let malformed = session.issues[before..]
        .iter()
        .any(|issue| matches!(issue, YencError::MalformedLine { .. }));
    if malformed {
        session.issues.truncate(before);
        session.record(YencError::Truncated(Token::MarkerLine));
    }
}

#[cfg(test)]
mod tests {
    use mimefilter_buffer::FilterBuffer;

    use super::*;
    use crate::header::MAX_MARKER_LINE;

    struct Harness {
        buffer: FilterBuffer,
        state: DecodeState,
        session: Session,
    }

    impl Harness {
        fn new(state: DecodeState) -> Self {
            Self {
                buffer: FilterBuffer::new(),
                state,
                session: Session::default(),
            }
        }

        fn feed(&mut self, input: &[u8], last: bool) -> Vec<u8> {
            let mut staged = self.buffer.stage(input, 0);
            step(&mut self.state, &mut self.session, &mut staged, last);
            staged.finish().to_vec()
        }
    }

    #[test]
    fn decodes_plain_and_escaped_bytes() {
        let mut h = Harness::new(DecodeState::data());
        let out = h.feed(b"\x2a=@\x2b\r\n", false);
        assert_eq!(out, [0x00, 0xD6, 0x01]);
        assert_eq!(h.state.line, LinePosition::Start);
        assert_eq!(h.session.part_size, 3);
    }

    #[test]
    fn preamble_lines_are_skipped() {
        let mut h = Harness::new(DecodeState::preamble());
        let out = h.feed(b"hello there\r\n=not a marker\n\n", true);
        assert!(out.is_empty());
        assert!(h.session.issues.is_empty());
        assert_eq!(h.state.progress, Progress::Preamble);
    }

    #[test]
    fn unframed_data_lines_decode_from_default_state() {
        let mut h = Harness::new(DecodeState::default());
        let out = h.feed(b"\x92\x8f\x96\x96\x99\n", true);
        assert_eq!(out, b"hello");
        assert!(h.session.issues.is_empty());
        assert_eq!(h.state.progress, Progress::Data);
    }

    #[test]
    fn overlong_marker_line_is_dropped() {
        let mut h = Harness::new(DecodeState::default());
        let mut line = b"=ybegin line=128 size=1 name=".to_vec();
        line.resize(MAX_MARKER_LINE + 1, b'n');
        for piece in line.chunks(100) {
            assert!(h.feed(piece, false).is_empty());
        }
        assert!(!h.buffer.has_backup());
        assert_eq!(h.state.line, LinePosition::Skip);
        assert!(matches!(
            h.session.issues.as_slice(),
            [YencError::MalformedLine { keyword: "=ybegin", .. }]
        ));

        assert_eq!(h.feed(b"nnn.bin\n\x6b\n", false), b"A");
        assert!(h.session.header.is_none());
    }

    #[test]
    fn mid_line_escape_survives_chunk_boundary() {
        let mut h = Harness::new(DecodeState::data());
        assert_eq!(h.feed(b"\x2a=", false), [0x00]);
        assert_eq!(h.state.line, LinePosition::Escape);
        assert!(!h.buffer.has_backup());

        assert_eq!(h.feed(b"@\x2b\n", false), [0xD6, 0x01]);
    }

    #[test]
    fn line_start_escape_is_backed_up() {
        let mut h = Harness::new(DecodeState::data());
        assert!(h.feed(b"=", false).is_empty());
        assert_eq!(h.buffer.pending(), b"=");

        assert_eq!(h.feed(b"n\n", false), [0x04]);
    }

    #[test]
    fn split_marker_line_is_buffered_whole() {
        let mut h = Harness::new(DecodeState::default());
        assert!(h.feed(b"=yb", false).is_empty());
        assert!(h.feed(b"egin line=128 size=1 na", false).is_empty());
        assert_eq!(h.buffer.pending(), b"=ybegin line=128 size=1 na");

        let out = h.feed(b"me=x\n\x6b\n=yend size=1\n", false);
        assert_eq!(out, b"A");
        assert_eq!(h.state.progress, Progress::End);
        assert_eq!(h.session.header.as_ref().map(|h| h.name.as_str()), Some("x"));
        assert!(h.session.issues.is_empty());
    }

    #[test]
    fn lines_after_trailer_are_skipped() {
        let mut h = Harness::new(DecodeState::default());
        let out = h.feed(b"=ybegin line=128 size=1 name=x\n\x6b\n=yend size=1\n\x6b\x6b\n", true);
        assert_eq!(out, b"A");
        assert!(h.session.issues.is_empty());
    }

    #[test]
    fn truncated_escape_on_complete() {
        let mut h = Harness::new(DecodeState::data());
        assert_eq!(h.feed(b"\x6b=", true), b"A");
        assert_eq!(h.session.issues, [YencError::Truncated(Token::Escape)]);
    }

    #[test]
    fn truncated_line_start_escape_on_complete() {
        let mut h = Harness::new(DecodeState::data());
        assert!(h.feed(b"\x6b\n=", true) == b"A");
        assert_eq!(h.session.issues, [YencError::Truncated(Token::Escape)]);
    }

    #[test]
    fn missing_trailer_on_complete() {
        let mut h = Harness::new(DecodeState::default());
        h.feed(b"=ybegin line=128 size=1 name=x\n\x6b\n", true);
        assert_eq!(h.session.issues, [YencError::MissingTrailer]);
    }

    #[test]
    fn unterminated_trailer_is_honored() {
        let mut h = Harness::new(DecodeState::default());
        h.feed(b"=ybegin line=128 size=1 name=x\n\x6b\n=yend size=1", true);
        assert!(h.session.issues.is_empty());
        assert_eq!(h.state.progress, Progress::End);
    }

    #[test]
    fn cut_marker_keyword_is_truncation() {
        let mut h = Harness::new(DecodeState::default());
        h.feed(b"=ybegin line=128 size=1 name=x\n\x6b\n=yen", true);
        assert_eq!(
            h.session.issues,
            [
                YencError::Truncated(Token::MarkerLine),
                YencError::MissingTrailer
            ]
        );
    }

    #[test]
    fn cut_trailer_fields_are_truncation() {
        let mut h = Harness::new(DecodeState::default());
        h.feed(b"=ybegin line=128 size=1 name=x\n\x6b\n=yend si", true);
        assert_eq!(h.session.issues, [YencError::Truncated(Token::MarkerLine)]);
    }

    #[test]
    fn malformed_escape_before_newline_is_dropped() {
        let mut h = Harness::new(DecodeState::data());
        assert_eq!(h.feed(b"\x6b=\n\x6c\n", false), b"AB");
        assert_eq!(h.state.line, LinePosition::Start);
    }

    #[test]
    fn unknown_marker_lines_are_ignored() {
        let mut h = Harness::new(DecodeState::data());
        assert_eq!(h.feed(b"=ycomment whatever\n\x6b\n", false), b"A");
    }
}
