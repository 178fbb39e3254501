//! # ag_core - Define-by-run Reverse-mode Autodiff
//!
//! Computation graphs are recorded as operations run: every op applied to
//! [`Variable`]s creates a [`Function`] node linking inputs to outputs.
//! [`Variable::backward`] walks that graph in reverse generation order and
//! accumulates gradients, which are themselves `Variable`s. Running backward
//! with [`BackwardOptions::create_graph`] records the gradient computation
//! too, so derivatives of any order can be taken.
//!
//! ## Quick Start
//!
//! ```
//! use ag_core::{ops, BackwardOptions, Variable};
//!
//! // y = exp(x^2)^2 at x = 0.5
//! let x = Variable::constant(0.5);
//! let y = ops::square(&ops::exp(&ops::square(&x)?)?)?;
//! y.backward(BackwardOptions::default())?;
//!
//! let gx = x.grad().unwrap().item()?;
//! assert!((gx - 3.297442541400256).abs() < 1e-12);
//! # Ok::<(), ag_core::Error>(())
//! ```
//!
//! ## Higher-order derivatives
//!
//! ```
//! use ag_core::{ops, BackwardOptions, Variable};
//!
//! // f(x) = x^4, f''(2) = 12 x^2 = 48
//! let x = Variable::constant(2.0);
//! let y = ops::pow(&x, 4.0)?;
//! y.backward(BackwardOptions::new().create_graph(true))?;
//!
//! let gx = x.grad().unwrap();
//! x.cleargrad();
//! gx.backward(BackwardOptions::default())?;
//! assert!((x.grad().unwrap().item()? - 48.0).abs() < 1e-9);
//! # Ok::<(), ag_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - **[`Variable`]**: reference-counted graph node with data, gradient and creator.
//! - **[`Function`]** / **[`Forwarder`]**: a recorded op and its forward/backward rule.
//! - **[`ops`]**: the differentiable operation library.
//! - **[`config`]**: `no_grad` / `test_mode` scoped mode switches.
//! - **[`dot`]**: Graphviz rendering of a graph.
//! - **[`finite_diff`]**: numerical gradient checking.

mod backward;
pub mod config;
pub mod dot;
mod error;
pub mod finite_diff;
mod function;
pub mod ops;
mod variable;

pub use backward::BackwardOptions;
pub use config::{no_grad, test_mode, using_config, Config, ConfigGuard, Flag};
pub use error::{Error, Result};
pub use function::{Forwarder, Function};
pub use variable::Variable;

/// Re-exported so downstream crates can build tensors without a direct
/// dependency.
pub use ag_tensor::{RandomSource, Shape, StdRandom, Tensor, TensorError};
