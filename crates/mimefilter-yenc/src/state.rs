//! Protocol state carried between filter calls.

/// Which way a [`YencFilter`](crate::YencFilter) transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Binary in, yEnc text out.
    Encode,
    /// yEnc text in, binary out.
    #[default]
    Decode,
}

/// Decoder position within the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinePosition {
    /// At column 0: blank lines, marker lines and escapes are told apart here.
    #[default]
    Start,
    /// Inside a data line.
    Middle,
    /// An escape marker was consumed; the next byte is the escaped value.
    Escape,
    /// Ignoring bytes until the end of the line.
    Skip,
}

/// How far through the yEnc framing the decoder has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    /// Waiting for `=ybegin`; non-marker lines are ignored.
    Preamble,
    /// `=ybegin` seen.
    Begun,
    /// `=ypart` seen.
    Part,
    /// Decoding data lines.
    #[default]
    Data,
    /// `=yend` seen; non-marker lines are ignored.
    End,
}

impl Progress {
    /// True when data lines are decoded in this phase.
    pub fn accepts_data(self) -> bool {
        matches!(self, Progress::Begun | Progress::Part | Progress::Data)
    }
}

/// Decoder state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeState {
    pub line: LinePosition,
    pub progress: Progress,
}

impl DecodeState {
    /// State for a stream that starts directly with data lines, e.g. a part
    /// whose header lines were consumed by the caller.
    pub fn data() -> Self {
        Self {
            line: LinePosition::Start,
            progress: Progress::Data,
        }
    }

    /// State that ignores everything before the first `=ybegin`, for input
    /// such as a whole article where the encoded block follows other text.
    pub fn preamble() -> Self {
        Self {
            line: LinePosition::Start,
            progress: Progress::Preamble,
        }
    }

    /// True when a token is split across the last call boundary.
    pub fn is_mid_token(&self) -> bool {
        self.line == LinePosition::Escape
    }
}

/// Encoder state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeState {
    /// Source bytes already written on the current output line.
    pub column: usize,
}

/// Direction-specific state of a yEnc filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YencState {
    Encode(EncodeState),
    Decode(DecodeState),
}

impl YencState {
    /// Initial state for `direction`. Decoding starts ready for data lines.
    pub fn initial(direction: Direction) -> Self {
        match direction {
            Direction::Encode => YencState::Encode(EncodeState::default()),
            Direction::Decode => YencState::Decode(DecodeState::default()),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            YencState::Encode(_) => Direction::Encode,
            YencState::Decode(_) => Direction::Decode,
        }
    }
}
