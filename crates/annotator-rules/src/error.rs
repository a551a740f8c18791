use std::path::PathBuf;

/// Errors raised while loading a rule set. All of them are configuration
/// errors: they are detected before any tree is touched.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read rule set {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field} regular expression {pattern:?}: {source}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("invalid rule set: {message}")]
    InvalidDocument { message: String },
}

impl RulesError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}
