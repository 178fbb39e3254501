//! Adam and AdamW.

use std::collections::HashMap;

use ag_core::{Result, Tensor, Variable};

use super::Optimizer;

/// Adam (adaptive moment estimation).
///
/// The step counter advances once per [`Optimizer::update`], not per
/// parameter, and the bias correction is folded into the step size:
/// `lr_t = alpha * sqrt(1 - beta2^t) / (1 - beta1^t)`.
#[derive(Debug, Clone)]
pub struct Adam {
    pub alpha: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u32,
    ms: HashMap<String, Tensor>,
    vs: HashMap<String, Tensor>,
}

impl Adam {
    pub fn new(alpha: f64) -> Self {
        Self::with_params(alpha, 0.9, 0.999, 1e-8)
    }

    pub fn with_params(alpha: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Adam {
            alpha,
            beta1,
            beta2,
            eps,
            t: 0,
            ms: HashMap::new(),
            vs: HashMap::new(),
        }
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u32 {
        self.t
    }

    /// Bias-corrected step size for the current step.
    pub fn lr(&self) -> f64 {
        let t = self.t.max(1) as i32;
        self.alpha * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t))
    }

    pub fn reset(&mut self) {
        self.ms.clear();
        self.vs.clear();
        self.t = 0;
    }
}

impl Default for Adam {
    fn default() -> Self {
        Adam::new(0.001)
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update_one(&mut self, path: &str, param: &Variable, grad: &Tensor) -> Result<()> {
        let lr = self.lr();
        let m = self
            .ms
            .entry(path.to_owned())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        *m = m.add(&grad.sub(m)?.mul_c(1.0 - self.beta1))?;

        let v = self
            .vs
            .entry(path.to_owned())
            .or_insert_with(|| Tensor::zeros(grad.shape()));
        *v = v.add(&grad.mul(grad)?.sub(v)?.mul_c(1.0 - self.beta2))?;

        let step = m.mul_c(lr).div(&v.sqrt().add_c(self.eps))?;
        let next = param.data().sub(&step)?;
        param.set_data(next);
        Ok(())
    }
}

/// Adam with decoupled weight decay: `p -= alpha * weight_decay * p` before
/// the Adam step.
#[derive(Debug, Clone)]
pub struct AdamW {
    pub weight_decay: f64,
    adam: Adam,
}

impl AdamW {
    pub fn new(alpha: f64, weight_decay: f64) -> Self {
        AdamW {
            weight_decay,
            adam: Adam::new(alpha),
        }
    }

    pub fn inner(&self) -> &Adam {
        &self.adam
    }
}

impl Optimizer for AdamW {
    fn begin_step(&mut self) {
        self.adam.begin_step();
    }

    fn update_one(&mut self, path: &str, param: &Variable, grad: &Tensor) -> Result<()> {
        let decayed = param.data().mul_c(1.0 - self.adam.alpha * self.weight_decay);
        param.set_data(decayed);
        self.adam.update_one(path, param, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Parameters;
    use ag_core::{ops, BackwardOptions};
    use approx::assert_relative_eq;

    #[test]
    fn test_adam_first_step_is_alpha_sized() {
        let p = Variable::new(vec![1.0, 2.0]);
        p.set_grad(Variable::new(vec![0.1, -0.2])).unwrap();
        let mut params = Parameters::new();
        params.insert("p", p.clone());

        let mut opt = Adam::new(0.1);
        opt.update(&params).unwrap();
        assert_eq!(opt.steps(), 1);
        // m = 0.1 g, v = 0.001 g^2, lr_t = 0.1 * sqrt(0.001) / 0.1
        assert_relative_eq!(p.data().as_slice()[0], 0.9, epsilon = 1e-6);
        assert_relative_eq!(p.data().as_slice()[1], 2.1, epsilon = 1e-6);
    }

    #[test]
    fn test_adam_step_counter_per_update() {
        let mut params = Parameters::new();
        for name in ["a", "b", "c"] {
            let p = Variable::constant(1.0);
            p.set_grad(Variable::constant(1.0)).unwrap();
            params.insert(name, p);
        }
        let mut opt = Adam::default();
        opt.update(&params).unwrap();
        opt.update(&params).unwrap();
        assert_eq!(opt.steps(), 2);
    }

    #[test]
    fn test_adam_minimises_quadratic() {
        let x = Variable::constant(5.0).named("x");
        let mut params = Parameters::new();
        params.insert("x", x.clone());
        let mut opt = Adam::new(0.2);

        for _ in 0..200 {
            params.clear_grads();
            let y = ops::square(&x).unwrap();
            y.backward(BackwardOptions::default()).unwrap();
            opt.update(&params).unwrap();
        }
        assert!(x.item().unwrap().abs() < 0.5, "x = {}", x.item().unwrap());
    }

    #[test]
    fn test_adamw_decays_without_gradient_signal() {
        let p = Variable::constant(1.0);
        p.set_grad(Variable::constant(0.0)).unwrap();
        let mut params = Parameters::new();
        params.insert("p", p.clone());

        let mut opt = AdamW::new(0.1, 0.5);
        opt.update(&params).unwrap();
        assert_relative_eq!(p.item().unwrap(), 0.95, epsilon = 1e-9);
        assert_eq!(opt.inner().steps(), 1);
    }
}
