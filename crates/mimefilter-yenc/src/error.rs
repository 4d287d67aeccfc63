use std::fmt;

/// The kind of token left incomplete by a truncated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// An escape marker with no escaped byte after it.
    Escape,
    /// A `=ybegin`/`=ypart`/`=yend` line with no line terminator.
    MarkerLine,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Escape => f.write_str("escape sequence"),
            Token::MarkerLine => f.write_str("marker line"),
        }
    }
}

/// Conditions detected while encoding or decoding a yEnc stream.
///
/// None of these are fatal: decoded bytes are always delivered and the
/// filter stays usable. Consumers decide whether to discard the data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YencError {
    /// The stream ended in the middle of a token.
    #[error("stream truncated inside {0}")]
    Truncated(Token),

    /// A `=ybegin` was seen but the stream completed without `=yend`.
    #[error("stream ended without =yend trailer")]
    MissingTrailer,

    /// The part checksum disagrees with the trailer's `pcrc32`.
    #[error("part checksum mismatch (trailer {expected:08x}, decoded {actual:08x})")]
    PartCrcMismatch { expected: u32, actual: u32 },

    /// The file checksum disagrees with the trailer's `crc32`.
    #[error("file checksum mismatch (trailer {expected:08x}, decoded {actual:08x})")]
    TotalCrcMismatch { expected: u32, actual: u32 },

    /// The decoded part length disagrees with the trailer's `size`.
    #[error("size mismatch (trailer {expected} bytes, decoded {actual})")]
    SizeMismatch { expected: u64, actual: u64 },

    /// A marker line is missing a required field or has an unparsable one.
    #[error("malformed {keyword} line: {reason}")]
    MalformedLine {
        keyword: &'static str,
        reason: String,
    },
}

impl YencError {
    /// True for checksum and size disagreements, i.e. likely data corruption.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            YencError::PartCrcMismatch { .. }
                | YencError::TotalCrcMismatch { .. }
                | YencError::SizeMismatch { .. }
        )
    }

    /// True when the stream stopped early.
    pub fn is_truncation(&self) -> bool {
        matches!(self, YencError::Truncated(_) | YencError::MissingTrailer)
    }
}

pub type Result<T> = std::result::Result<T, YencError>;
