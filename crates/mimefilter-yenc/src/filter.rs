use mimefilter_core::{FilterBuffer, Lifecycle, MimeFilter, Output};
use tracing::{trace, warn};

use crate::crc::Crc32;
use crate::error::{Result, YencError};
use crate::header::{YencHeader, YencPart, YencTrailer};
use crate::session::Session;
use crate::state::{DecodeState, Direction, YencState};
use crate::{decode, encode};

/// Conventional yEnc line width.
pub const DEFAULT_LINE_WIDTH: usize = 128;

const FILTER_NAME: &str = "yenc";

/// Construction parameters for a [`YencFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YencConfig {
    pub direction: Direction,
    /// Source bytes per encoded line. Ignored when decoding.
    pub line_width: usize,
    /// Decoding only: ignore lines before the first `=ybegin` instead of
    /// decoding them as data.
    pub skip_preamble: bool,
}

impl Default for YencConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            line_width: DEFAULT_LINE_WIDTH,
            skip_preamble: false,
        }
    }
}

impl YencConfig {
    pub fn encode() -> Self {
        Self {
            direction: Direction::Encode,
            ..Self::default()
        }
    }

    pub fn decode() -> Self {
        Self::default()
    }

    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_skip_preamble(mut self, skip_preamble: bool) -> Self {
        self.skip_preamble = skip_preamble;
        self
    }

    /// State a filter built from this config starts in, and returns to on
    /// reset.
    pub fn initial_state(&self) -> YencState {
        match self.direction {
            Direction::Decode if self.skip_preamble => YencState::Decode(DecodeState::preamble()),
            direction => YencState::initial(direction),
        }
    }
}

/// Incremental yEnc encoder or decoder.
///
/// Encoding turns arbitrary bytes into yEnc data lines; the `=ybegin` and
/// `=yend` framing is left to the caller (see [`YencHeader`] and
/// [`YencTrailer`]). Decoding accepts bare data lines as well as framed
/// streams, whose marker lines are parsed and whose trailer checksums and
/// size are checked. Lines after an `=yend` are ignored until the next
/// `=ybegin`, and with [`YencConfig::skip_preamble`] so are lines before
/// the first one.
///
/// Integrity problems never stop decoding: they are collected as
/// [`YencError`] values, available from [`issues`](Self::issues) and
/// [`verify`](Self::verify).
///
/// ```
/// use mimefilter_core::transform;
/// use mimefilter_yenc::YencFilter;
///
/// let encoded = transform(&mut YencFilter::encoder(), b"hello");
/// assert_eq!(encoded, b"\x92\x8f\x96\x96\x99\n");
///
/// let decoded = transform(&mut YencFilter::decoder(), &encoded);
/// assert_eq!(decoded, b"hello");
/// ```
#[derive(Debug)]
pub struct YencFilter {
    config: YencConfig,
    state: YencState,
    session: Session,
    buffer: FilterBuffer,
    lifecycle: Lifecycle,
}

impl Default for YencFilter {
    fn default() -> Self {
        Self::decoder()
    }
}

impl YencFilter {
    pub fn new(direction: Direction) -> Self {
        Self::with_config(YencConfig {
            direction,
            ..YencConfig::default()
        })
    }

    pub fn encoder() -> Self {
        Self::new(Direction::Encode)
    }

    pub fn decoder() -> Self {
        Self::new(Direction::Decode)
    }

    /// Build a filter from `config`. A zero line width falls back to
    /// [`DEFAULT_LINE_WIDTH`].
    pub fn with_config(mut config: YencConfig) -> Self {
        if config.line_width == 0 {
            warn!(
                fallback = DEFAULT_LINE_WIDTH,
                "yEnc line width of zero, using default"
            );
            config.line_width = DEFAULT_LINE_WIDTH;
        }
        Self {
            config,
            state: config.initial_state(),
            session: Session::default(),
            buffer: FilterBuffer::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn config(&self) -> &YencConfig {
        &self.config
    }

    /// Direction of the current state, which [`set_state`](Self::set_state)
    /// may have changed from the configured one.
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    pub fn state(&self) -> YencState {
        self.state
    }

    /// Replace the protocol state, e.g. to resume a decode in the middle of
    /// a part. The state is taken as is.
    pub fn set_state(&mut self, state: YencState) {
        trace!(?state, "seeding yEnc state");
        self.state = state;
    }

    /// Seed the whole-file accumulator with a raw register value carried
    /// over from an earlier part. Trailer `crc32` values are then checked
    /// even when the first part was not seen by this filter.
    pub fn set_crc(&mut self, raw_total: u32) {
        trace!(raw_total = format_args!("{raw_total:08x}"), "seeding yEnc crc");
        self.session.total_crc = Crc32::from_raw(raw_total);
        self.session.crc_seeded = true;
    }

    /// Begin a new part: the part accumulator and part size restart, the
    /// whole-file accumulator carries on.
    pub fn start_part(&mut self) {
        self.session.start_part();
    }

    /// Checksum of the bytes of the current part.
    pub fn part_crc(&self) -> u32 {
        self.session.part_crc.value()
    }

    /// Checksum of every byte seen since construction or reset.
    pub fn total_crc(&self) -> u32 {
        self.session.total_crc.value()
    }

    pub fn part_crc_state(&self) -> Crc32 {
        self.session.part_crc
    }

    /// Raw whole-file accumulator, suitable for [`set_crc`](Self::set_crc)
    /// on the filter that handles the next part.
    pub fn total_crc_state(&self) -> Crc32 {
        self.session.total_crc
    }

    /// Decoded (or, when encoding, source) bytes in the current part.
    pub fn part_size(&self) -> u64 {
        self.session.part_size
    }

    /// The most recent `=ybegin` line.
    pub fn header(&self) -> Option<&YencHeader> {
        self.session.header.as_ref()
    }

    /// The most recent `=ypart` line of the current part.
    pub fn part(&self) -> Option<&YencPart> {
        self.session.part.as_ref()
    }

    /// The most recent `=yend` line.
    pub fn trailer(&self) -> Option<&YencTrailer> {
        self.session.trailer.as_ref()
    }

    /// Number of `=yend` lines decoded.
    pub fn completed_parts(&self) -> u32 {
        self.session.completed_parts
    }

    /// Integrity conditions recorded so far, oldest first.
    pub fn issues(&self) -> &[YencError] {
        &self.session.issues
    }

    pub fn take_issues(&mut self) -> Vec<YencError> {
        std::mem::take(&mut self.session.issues)
    }

    /// `Err` with the first recorded condition, if any.
    pub fn verify(&self) -> Result<()> {
        match self.session.issues.first() {
            Some(issue) => Err(issue.clone()),
            None => Ok(()),
        }
    }

    fn run<'a>(&'a mut self, input: &'a [u8], prespace: usize, last: bool) -> Output<'a> {
        let mut staged = self.buffer.stage(input, prespace);
        match &mut self.state {
            YencState::Encode(state) => encode::step(
                state,
                self.config.line_width,
                &mut self.session,
                &mut staged,
                last,
            ),
            YencState::Decode(state) => decode::step(state, &mut self.session, &mut staged, last),
        }
        trace!(
            input = staged.input().len(),
            produced = staged.payload_len(),
            last,
            "yEnc step"
        );
        staged.finish()
    }
}

impl MimeFilter for YencFilter {
    fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_filter(FILTER_NAME);
        self.run(input, prespace, false)
    }

    fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Output<'a> {
        self.lifecycle.on_complete(FILTER_NAME);
        self.run(input, prespace, true)
    }

    fn reset(&mut self) {
        self.state = self.config.initial_state();
        self.session.reset();
        self.buffer.reset();
        self.lifecycle.on_reset();
    }
}
