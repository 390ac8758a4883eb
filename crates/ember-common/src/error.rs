//! Error types for emberdb.

use thiserror::Error;

/// Result type alias using EmberError.
pub type Result<T> = std::result::Result<T, EmberError>;

/// Errors that can occur in emberdb operations.
#[derive(Debug, Error)]
pub enum EmberError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Storage errors
    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: u32 },

    #[error("Page corrupted: {page_id}, reason: {reason}")]
    PageCorrupted { page_id: u32, reason: String },

    #[error("Invalid database file header: {0}")]
    InvalidFileHeader(String),

    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("Storage engine is closed")]
    StorageClosed,

    // Index errors
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),

    // SQL errors
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    // Interpreter errors
    #[error("Stack overflow (limit {limit})")]
    StackOverflow { limit: usize },

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Invalid register: r{0}")]
    InvalidRegister(i32),

    #[error("Invalid jump target: {0}")]
    InvalidJump(i32),

    #[error("Division by zero at instruction {ip}")]
    DivisionByZero { ip: usize },

    #[error("Arithmetic overflow at instruction {ip}")]
    ArithmeticOverflow { ip: usize },

    #[error("Program too large: {size} instructions (max {max})")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("Execution ran past the end of the program")]
    ProgramOverrun,

    #[error("Step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("Corrupt value: {0}")]
    CorruptValue(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EmberError {
    /// Builds a parse error at the given source position.
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        EmberError::Parse {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let ember_err: EmberError = io_err.into();
        assert!(matches!(ember_err, EmberError::Io(_)));
        assert!(ember_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_storage_errors_display() {
        let err = EmberError::PageNotFound { page_id: 42 };
        assert_eq!(err.to_string(), "Page not found: 42");

        let err = EmberError::PageCorrupted {
            page_id: 7,
            reason: "bad free-list link".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Page corrupted: 7, reason: bad free-list link"
        );

        let err = EmberError::InvalidFileHeader("bad magic".to_string());
        assert_eq!(err.to_string(), "Invalid database file header: bad magic");

        assert_eq!(
            EmberError::BufferPoolFull.to_string(),
            "Buffer pool full, unable to allocate frame"
        );
        assert_eq!(
            EmberError::StorageClosed.to_string(),
            "Storage engine is closed"
        );
    }

    #[test]
    fn test_index_errors_display() {
        let err = EmberError::TypeMismatch {
            expected: "INTEGER".to_string(),
            actual: "STRING".to_string(),
        };
        assert_eq!(err.to_string(), "Type mismatch: expected INTEGER, got STRING");

        let err = EmberError::IndexCorrupted("leaf depth 2 != 3".to_string());
        assert_eq!(err.to_string(), "Index corrupted: leaf depth 2 != 3");
    }

    #[test]
    fn test_parse_error_display() {
        let err = EmberError::parse(3, 14, "expected ';'");
        assert_eq!(err.to_string(), "Parse error at 3:14: expected ';'");
    }

    #[test]
    fn test_interpreter_errors_display() {
        assert_eq!(
            EmberError::StackOverflow { limit: 1024 }.to_string(),
            "Stack overflow (limit 1024)"
        );
        assert_eq!(EmberError::StackUnderflow.to_string(), "Stack underflow");
        assert_eq!(EmberError::InvalidRegister(300).to_string(), "Invalid register: r300");
        assert_eq!(EmberError::InvalidJump(-1).to_string(), "Invalid jump target: -1");
        assert_eq!(
            EmberError::DivisionByZero { ip: 4 }.to_string(),
            "Division by zero at instruction 4"
        );
        assert_eq!(
            EmberError::ProgramTooLarge { size: 2000, max: 1024 }.to_string(),
            "Program too large: 2000 instructions (max 1024)"
        );
        assert_eq!(
            EmberError::ProgramOverrun.to_string(),
            "Execution ran past the end of the program"
        );
        assert_eq!(
            EmberError::StepLimitExceeded { limit: 10 }.to_string(),
            "Step limit of 10 instructions exceeded"
        );
    }

    #[test]
    fn test_config_errors_display() {
        let err = EmberError::ConfigError("order must be at least 3, got 2".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: order must be at least 3, got 2"
        );

        let err = EmberError::InvalidParameter {
            name: "cache_pages".to_string(),
            value: "0".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid parameter: cache_pages = 0");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(EmberError::Internal("test".to_string()))
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmberError>();
    }
}
