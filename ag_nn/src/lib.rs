//! # ag_nn - Layers and optimizers for ag_core
//!
//! Neural network building blocks on top of the `ag_core` autodiff engine:
//!
//! - **Layers**: [`Linear`], [`Mlp`], and the recurrent [`Rnn`] and [`Lstm`]
//! - **Parameters**: named, path-ordered parameter sets ([`Parameters`])
//! - **Optimizers**: [`Sgd`], [`MomentumSgd`], [`Adam`], [`AdamW`]
//! - **Batching**: [`SeqBatches`] for truncated backprop through time
//!
//! ## Example: fitting a line
//!
//! ```
//! use ag_core::{ops, BackwardOptions, StdRandom, Tensor, Variable};
//! use ag_nn::{shared, Layer, Linear, Optimizer, Sgd};
//!
//! let x = Variable::new(Tensor::linspace(0.0, 1.0, 20).reshape([20, 1]).unwrap());
//! let t = Variable::new(x.data().mul_c(2.0).add_c(1.0));
//!
//! let mut layer = Linear::new(1, shared(StdRandom::seeded(0)));
//! let mut opt = Sgd::new(0.5);
//!
//! for _ in 0..500 {
//!     let y = layer.call(&x).unwrap();
//!     let loss = ops::mean_squared_error(&y, &t).unwrap();
//!     layer.clear_grads();
//!     loss.backward(BackwardOptions::default()).unwrap();
//!     opt.update(&layer.parameters()).unwrap();
//! }
//!
//! let w = layer.weight().unwrap().item().unwrap();
//! let b = layer.bias().unwrap().data().as_slice()[0];
//! assert!((w - 2.0).abs() < 0.05 && (b - 1.0).abs() < 0.05);
//! ```

pub mod batch;
pub mod layers;
pub mod optim;

pub use batch::SeqBatches;
pub use layers::{shared, Activation, Layer, Linear, Lstm, Mlp, Model, Parameters, Rnn, SharedRandom};
pub use optim::{Adam, AdamW, MomentumSgd, Optimizer, Sgd};
