//! Stochastic gradient descent, plain and with momentum.

use std::collections::HashMap;

use ag_core::{Result, Tensor, Variable};

use super::Optimizer;

/// Plain SGD: `p -= lr * g`.
#[derive(Debug, Clone)]
pub struct Sgd {
    pub lr: f64,
}

impl Sgd {
    pub fn new(lr: f64) -> Self {
        Sgd { lr }
    }
}

impl Default for Sgd {
    fn default() -> Self {
        Sgd::new(0.01)
    }
}

impl Optimizer for Sgd {
    fn update_one(&mut self, _path: &str, param: &Variable, grad: &Tensor) -> Result<()> {
        let next = param.data().sub(&grad.mul_c(self.lr))?;
        param.set_data(next);
        Ok(())
    }
}

/// SGD with momentum: `v = momentum * v - lr * g; p += v`.
#[derive(Debug, Clone)]
pub struct MomentumSgd {
    pub lr: f64,
    pub momentum: f64,
    velocities: HashMap<String, Tensor>,
}

impl MomentumSgd {
    pub fn new(lr: f64, momentum: f64) -> Self {
        MomentumSgd {
            lr,
            momentum,
            velocities: HashMap::new(),
        }
    }

    /// Forget accumulated velocities.
    pub fn reset(&mut self) {
        self.velocities.clear();
    }
}

impl Default for MomentumSgd {
    fn default() -> Self {
        MomentumSgd::new(0.01, 0.9)
    }
}

impl Optimizer for MomentumSgd {
    fn update_one(&mut self, path: &str, param: &Variable, grad: &Tensor) -> Result<()> {
        let v = self
            .velocities
            .entry(path.to_owned())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        *v = v.mul_c(self.momentum).sub(&grad.mul_c(self.lr))?;
        let next = param.data().add(v)?;
        param.set_data(next);
        Ok(())
    }
}
