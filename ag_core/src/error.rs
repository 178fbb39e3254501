//! Error type for graph construction and differentiation.

use ag_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Shape or axis problem raised by a tensor primitive.
    #[error(transparent)]
    Shape(#[from] TensorError),

    /// Invalid hyperparameter or argument.
    #[error("configuration error: {0}")]
    Config(String),

    /// Graph used in a state that no longer supports the request.
    #[error("state error: {0}")]
    State(String),

    #[error("{op}: expected {expected} values, got {got}")]
    Arity {
        op: &'static str,
        expected: usize,
        got: usize,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
