use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a source from loading or a report from being written.
///
/// Row-level problems (bad ratios, blank entity names) never surface here;
/// they are absorbed by the loader and the classifier.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A source file could not be opened.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the accepted header names for a required column were found.
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A command-line or menu value is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ReportError::FileRead {
            path: PathBuf::from("/data/thang3.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/thang3.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = ReportError::MissingColumn {
            path: PathBuf::from("ton_that.csv"),
            column: "Tỷ lệ tổn thất".to_string(),
        };
        assert_eq!(err.to_string(), "Missing column 'Tỷ lệ tổn thất' in ton_that.csv");
    }

    #[test]
    fn test_error_display_config() {
        let err = ReportError::Config("month must be 1-12".to_string());
        assert_eq!(err.to_string(), "Configuration error: month must be 1-12");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReportError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
