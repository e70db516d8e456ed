//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Source specifier is empty")]
    EmptySpecifier,

    #[error("Invalid stream key: {0}")]
    InvalidKey(String),
}
