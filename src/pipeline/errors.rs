use thiserror::Error;

/// Recorded failure messages are capped at this many characters.
pub const MAX_ERROR_LENGTH: usize = 1024;

/// The error taxonomy shared by the engine and every stage. The numeric
/// codes are stable and surface verbatim under minimal error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorCode {
    #[error("required input was absent")]
    NullInput = 1,
    #[error("input was present but ill-formed")]
    InvalidInput = 2,
    #[error("memory allocation failed")]
    OutOfMemory = 3,
    #[error("a structural capacity bound was hit")]
    CapacityExceeded = 4,
    #[error("context key exceeds the maximum length")]
    KeyTooLong = 5,
    #[error("name exceeds the maximum length")]
    NameTooLong = 6,
    #[error("item not found")]
    NotFound = 7,
    #[error("arithmetic overflow in a size computation")]
    Overflow = 8,
    #[error("mutation attempted while the pipeline is executing")]
    Reentrancy = 9,
    #[error("context memory budget would be exceeded")]
    MemoryLimitExceeded = 10,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// How much of a failure message is preserved when it is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDetail {
    #[default]
    Full,
    Minimal,
}

/// A stage failure. Failures are plain values; nothing unwinds across a
/// stage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StageError {
    pub code: ErrorCode,
    pub message: String,
}

impl StageError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type StageResult = Result<(), StageError>;

/// Prepares a failure message for recording. Minimal detail keeps only
/// the numeric code; full detail passes the message through with control
/// characters replaced and the length capped.
pub fn sanitize_message(message: &str, code: ErrorCode, detail: ErrorDetail) -> String {
    match detail {
        ErrorDetail::Minimal => format!("Error code: {}", code.code()),
        ErrorDetail::Full => message
            .chars()
            .take(MAX_ERROR_LENGTH)
            .map(|c| if c.is_control() { '?' } else { c })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::NullInput.code(), 1);
        assert_eq!(ErrorCode::InvalidInput.code(), 2);
        assert_eq!(ErrorCode::Reentrancy.code(), 9);
        assert_eq!(ErrorCode::MemoryLimitExceeded.code(), 10);
    }

    #[test]
    fn minimal_detail_replaces_message() {
        let sanitized = sanitize_message("something broke", ErrorCode::InvalidInput, ErrorDetail::Minimal);
        assert_eq!(sanitized, "Error code: 2");
    }

    #[test]
    fn full_detail_strips_control_characters() {
        let sanitized = sanitize_message("bad\x07input\nhere", ErrorCode::InvalidInput, ErrorDetail::Full);
        assert_eq!(sanitized, "bad?input?here");
    }

    #[test]
    fn full_detail_caps_length() {
        let long = "x".repeat(MAX_ERROR_LENGTH * 2);
        let sanitized = sanitize_message(&long, ErrorCode::InvalidInput, ErrorDetail::Full);
        assert_eq!(sanitized.len(), MAX_ERROR_LENGTH);
    }
}
