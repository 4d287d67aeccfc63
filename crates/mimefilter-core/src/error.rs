/// Errors raised by the stream adapters around a filter.
///
/// The filter contract itself never fails; these cover the I/O plumbing.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// An I/O error occurred on the wrapped stream.
    #[error("filter I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The filter was already completed and must be reset before reuse.
    #[error("filter already completed")]
    Completed,

    /// The wrapped writer accepted zero bytes.
    #[error("sink closed (wrote zero bytes)")]
    SinkClosed,
}

impl From<FilterError> for std::io::Error {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Io(io) => io,
            FilterError::SinkClosed => std::io::Error::new(std::io::ErrorKind::WriteZero, err),
            other => std::io::Error::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
