//! # ag_tensor - N-dimensional tensors
//!
//! Dense row-major tensors over `i64` and `f64` with the primitives the
//! autograd engine is built from:
//!
//! - [`Shape`] and [`Strides`] - shape, row-major strides, axis normalisation
//! - [`Tensor`] - construction, indexing, elementwise math with broadcasting,
//!   reductions, shape manipulation, gather/scatter and batched matmul
//! - [`RandomSource`] - the pseudo-random interface random constructors consume
//!
//! Tensors have value semantics and know nothing about computation graphs.
//!
//! ## Example
//!
//! ```
//! use ag_tensor::Tensor;
//!
//! let x = Tensor::new([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! let w = Tensor::<f64>::ones([3, 2]);
//! let y = x.matmul(&w).unwrap();
//! assert_eq!(y.as_slice(), &[6.0, 6.0, 15.0, 15.0]);
//!
//! let col_sums = x.sum(&[0], false).unwrap();
//! assert_eq!(col_sums.as_slice(), &[5.0, 7.0, 9.0]);
//! ```

mod element;
mod error;
mod linalg;
mod manip;
mod random;
mod reduce;
mod shape;
mod tensor;

pub use element::Element;
pub use error::{Result, TensorError};
pub use random::{RandomSource, StdRandom};
pub use shape::{Coords, Shape, Strides};
pub use tensor::{Tensor, DEFAULT_ATOL, DEFAULT_RTOL};
