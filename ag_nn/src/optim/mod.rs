//! Optimizers that update a model's [`Parameters`] from their gradients.

mod adam;
mod sgd;

pub use adam::{Adam, AdamW};
pub use sgd::{MomentumSgd, Sgd};

use ag_core::{Result, Tensor, Variable};
use tracing::debug;

use crate::layers::Parameters;

/// Gradient-based parameter update rule.
///
/// Implementors provide [`update_one`](Optimizer::update_one); per-parameter
/// state is keyed by the parameter's path.
pub trait Optimizer {
    /// Called once per [`update`](Optimizer::update), before any parameter.
    fn begin_step(&mut self) {}

    fn update_one(&mut self, path: &str, param: &Variable, grad: &Tensor) -> Result<()>;

    /// Update every parameter that has a gradient; others are skipped.
    fn update(&mut self, params: &Parameters) -> Result<()> {
        self.begin_step();
        let mut updated = 0usize;
        for (path, param) in params {
            let Some(grad) = param.grad() else {
                continue;
            };
            let grad = grad.data().clone();
            self.update_one(path, param, &grad)?;
            updated += 1;
        }
        debug!(updated, skipped = params.len() - updated, "optimizer step");
        Ok(())
    }
}
