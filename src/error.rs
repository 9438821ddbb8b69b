// Error taxonomy for the import pipeline and the analysis bridge.
//
// Import errors surface to the user as a flash message on the upload page.
// Analysis errors never leave the bridge: they are logged and the batch is
// returned unannotated.

use thiserror::Error;

/// Failures of the CSV catalog import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The upload was empty or no file field was supplied.
    #[error("Please select a CSV file to upload")]
    NoFileSupplied,

    /// A required column was missing or a required cell was empty/malformed.
    /// The store is untouched when this is reported.
    #[error("CSV error: {0}")]
    Parse(String),

    /// The replace-all write failed. The transaction is rolled back, so the
    /// prior catalog survives.
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Internal failures of the external analysis process. Absorbed by the
/// bridge; callers of `analyze` never see these.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The interpreter could not be spawned at all.
    #[error("could not start analysis process: {0}")]
    Launch(#[source] std::io::Error),

    /// The process ran but exited non-zero. Its output file is ignored.
    #[error("analysis process exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    /// The output file existed but was not the expected index->result map.
    #[error("malformed analysis result: {0}")]
    ResultParse(#[from] serde_json::Error),

    /// Temp file or pipe I/O failed mid-flight.
    #[error("analysis i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_file_message_is_user_facing() {
        let err = ImportError::NoFileSupplied;
        assert_eq!(err.to_string(), "Please select a CSV file to upload");
    }

    #[test]
    fn test_parse_error_carries_cause() {
        let err = ImportError::Parse("missing required column 'Name'".to_string());
        assert!(err.to_string().contains("missing required column 'Name'"));
    }

    #[test]
    fn test_exit_error_includes_stderr() {
        let err = AnalysisError::Exit {
            code: Some(2),
            stderr: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("2"));
        assert!(text.contains("boom"));
    }
}
