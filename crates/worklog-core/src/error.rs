use thiserror::Error;

/// Top-level error type for the work-log assistant.
///
/// Subsystem crates define their own error enums and wrap this one, so the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorklogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid month name: {0}")]
    InvalidMonthName(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),
}

impl From<toml::de::Error> for WorklogError {
    fn from(err: toml::de::Error) -> Self {
        WorklogError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WorklogError {
    fn from(err: toml::ser::Error) -> Self {
        WorklogError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WorklogError {
    fn from(err: serde_json::Error) -> Self {
        WorklogError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for work-log operations.
pub type Result<T> = std::result::Result<T, WorklogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(WorklogError, &str)> = vec![
            (
                WorklogError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                WorklogError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (
                WorklogError::InvalidMonthName("smarch".to_string()),
                "Invalid month name: smarch",
            ),
            (
                WorklogError::InvalidDateRange("start after end".to_string()),
                "Invalid date range: start after end",
            ),
            (
                WorklogError::InvalidDocument("empty text".to_string()),
                "Invalid document: empty text",
            ),
            (
                WorklogError::Embedding("empty input".to_string()),
                "Embedding error: empty input",
            ),
            (
                WorklogError::Index("lock poisoned".to_string()),
                "Index error: lock poisoned",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WorklogError = io_err.into();
        assert!(matches!(err, WorklogError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: WorklogError = err.unwrap_err().into();
        assert!(matches!(err, WorklogError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: WorklogError = err.unwrap_err().into();
        assert!(matches!(err, WorklogError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
