//! Error type for tensor operations.

use thiserror::Error;

use crate::shape::Shape;

/// Shape and axis errors raised by tensor primitives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("{op}: shapes {lhs} and {rhs} cannot be broadcast together")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    #[error("axis {axis} is out of range for a tensor of rank {ndim}")]
    AxisOutOfRange { axis: isize, ndim: usize },

    #[error("axis {axis} is repeated")]
    DuplicateAxis { axis: usize },

    #[error("cannot reshape tensor of shape {from} into shape {to}")]
    ReshapeSize { from: Shape, to: Shape },

    #[error("data length {len} does not match shape {shape}")]
    DataLength { len: usize, shape: Shape },

    #[error("index {index:?} is out of range for shape {shape}")]
    IndexOutOfRange { index: Vec<usize>, shape: Shape },

    #[error("coordinate has {got} components but tensor has rank {ndim}")]
    CoordLength { got: usize, ndim: usize },

    #[error("cannot squeeze axis {axis} of size {dim}")]
    NotSingleton { axis: usize, dim: usize },

    #[error("cannot split axis of size {dim} into pieces {sizes:?}")]
    SplitSize { dim: usize, sizes: Vec<usize> },

    #[error("matmul: inner dimensions of {lhs} and {rhs} do not match")]
    MatMul { lhs: Shape, rhs: Shape },

    #[error("{op}: expected rank {expected}, got {got}")]
    Rank {
        op: &'static str,
        expected: String,
        got: usize,
    },

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, TensorError>;
