use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid path {path:?}: {message}")]
    InvalidPath { path: String, message: String },
    #[error("duplicate node in tree: {path}")]
    DuplicatePath { path: String },
    #[error("unknown array element type: {name}")]
    UnknownElementType { name: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
