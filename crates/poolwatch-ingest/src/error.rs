/// Why a line could not be turned into a [`LogRecord`](poolwatch_common::types::LogRecord).
///
/// A parse failure discards the whole line; callers log it and move on.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// A status token carried a value that is not an integer status code.
    #[error("Parse: invalid {token} value '{value}'")]
    InvalidStatus { token: &'static str, value: String },
}

/// Failures while following the log file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source: I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        SourceError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
