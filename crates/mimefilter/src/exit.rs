use std::fmt;
use std::io;

use mimefilter_core::FilterError;
use mimefilter_yenc::YencError;

// Exit code constants. USAGE matches sysexits EX_USAGE.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn filter_error(context: &str, err: FilterError) -> CliError {
    match err {
        FilterError::Io(source) => io_error(context, source),
        FilterError::SinkClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        FilterError::Completed => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn yenc_error(context: &str, issues: &[YencError]) -> CliError {
    let detail = match issues {
        [] => "no issues".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    };
    CliError::new(DATA_INVALID, format!("{context}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_exit_codes() {
        let denied = io_error("open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.code, PERMISSION_DENIED);
        assert!(denied.message.starts_with("open: "));

        let missing = io_error("open", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.code, FAILURE);
    }

    #[test]
    fn filter_errors_unwrap_io() {
        let err = filter_error(
            "write",
            FilterError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert_eq!(filter_error("write", FilterError::SinkClosed).code, FAILURE);
    }

    #[test]
    fn yenc_issues_summarized() {
        let issues = [YencError::MissingTrailer, YencError::MissingTrailer];
        let err = yenc_error("decode", &issues);
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.ends_with("(and 1 more)"));
    }
}
