use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that escape a middleware or handler and end up in the error pipeline.
///
/// Handlers answer expected failures (unknown id, missing fields) with explicit
/// responses; only the unexpected ones travel up as `Err`.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("panic: {0}")]
    Panic(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::NotFound => 404,
            ServerError::Io(_)
            | ServerError::Json(_)
            | ServerError::Storage(_)
            | ServerError::Internal(_)
            | ServerError::Panic(_) => 500,
        }
    }

    /// The underlying message, without the variant's prefix.
    pub fn message(&self) -> String {
        match self {
            ServerError::Io(err) => err.to_string(),
            ServerError::Json(err) => err.to_string(),
            ServerError::Storage(err) => err.to_string(),
            ServerError::NotFound => "not found".to_string(),
            ServerError::BadRequest(msg) | ServerError::Internal(msg) | ServerError::Panic(msg) => {
                msg.clone()
            }
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
