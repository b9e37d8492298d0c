use std::path::PathBuf;
use thiserror::Error;

/// Core error type for esbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Failure of a single module transform request.
///
/// Fatal to the request only. The caller decides whether to serve an error
/// response or log and pass the source through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The module text is not syntactically valid.
    ///
    /// `line` is 1-based, `column` is 0-based (in characters).
    #[error("Failed to parse {path} at {line}:{column}: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// The rewritten body could not be assembled.
    #[error("Failed to emit {path}: {message}")]
    Emit { path: String, message: String },
}

impl TransformError {
    /// Stable error code, mirrored in CLI JSON output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "TRANSFORM_PARSE_ERROR",
            Self::Emit { .. } => "TRANSFORM_EMIT_ERROR",
        }
    }
}
