use annotator_model::ModelError;
use annotator_rules::RulesError;
use thiserror::Error;

/// Failure categories of an annotation run. Every one of them aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed rule set, or a collection the rule set cannot place.
    Configuration,
    /// A history-derived start index could not be parsed.
    HistoryParse,
    /// A variable named by a rule is absent from the tree.
    MissingReference,
    /// An attribute value does not have the shape or type its use requires.
    Validation,
}

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("collection short name not found at any configured path: {}", paths.join(", "))]
    UnresolvedShortName { paths: Vec<String> },

    #[error("no mission pattern matches collection short name {short_name:?}")]
    UnmappedMission { short_name: String },

    #[error("{path}: cannot derive start index from history: {message}")]
    HistoryParse { path: String, message: String },

    #[error("{path}: referenced variable {reference:?} does not exist")]
    MissingReference { path: String, reference: String },

    #[error("{path}: invalid attribute {attribute:?}: {message}")]
    Validation {
        path: String,
        attribute: String,
        message: String,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AnnotateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rules(_) | Self::UnresolvedShortName { .. } | Self::UnmappedMission { .. } => {
                ErrorKind::Configuration
            }
            Self::HistoryParse { .. } => ErrorKind::HistoryParse,
            Self::MissingReference { .. } => ErrorKind::MissingReference,
            Self::Validation { .. } | Self::Model(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn validation(
        path: &str,
        attribute: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            path: path.to_string(),
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
