//! Linear (fully connected) layer.

use ag_core::{ops, Result, Tensor, Variable};
use tracing::debug;

use super::{single, Layer, Parameters, SharedRandom};

/// A linear (fully connected) layer: `y = x @ w + b`.
///
/// The weight is `[in_size, out_size]`. When the input size is not given it
/// is taken from the last axis of the first input, and the weight is
/// allocated then.
pub struct Linear {
    out_size: usize,
    in_size: Option<usize>,
    weight: Option<Variable>,
    bias: Option<Variable>,
    rng: SharedRandom,
}

impl Linear {
    /// Layer with a zero bias and a lazily initialised weight.
    pub fn new(out_size: usize, rng: SharedRandom) -> Self {
        Linear {
            out_size,
            in_size: None,
            weight: None,
            bias: Some(Variable::new(Tensor::<f64>::zeros([out_size])).named("b")),
            rng,
        }
    }

    /// Fix the input size and allocate the weight immediately.
    pub fn with_in_size(mut self, in_size: usize) -> Self {
        self.in_size = Some(in_size);
        self.weight = Some(self.init_weight(in_size));
        self
    }

    /// Drop the bias term.
    pub fn no_bias(mut self) -> Self {
        self.bias = None;
        self
    }

    /// Xavier initialisation: standard normal scaled by `1/sqrt(in_size)`.
    fn init_weight(&self, in_size: usize) -> Variable {
        let scale = (1.0 / in_size as f64).sqrt();
        let w = Tensor::randn([in_size, self.out_size], &mut *self.rng.borrow_mut()).mul_c(scale);
        debug!(in_size, out_size = self.out_size, "initialised linear weight");
        Variable::new(w).named("w")
    }

    pub fn weight(&self) -> Option<&Variable> {
        self.weight.as_ref()
    }

    pub fn bias(&self) -> Option<&Variable> {
        self.bias.as_ref()
    }

    pub fn in_size(&self) -> Option<usize> {
        self.in_size
    }

    pub fn out_size(&self) -> usize {
        self.out_size
    }

    /// Apply the layer to one input.
    pub fn apply(&mut self, x: &Variable) -> Result<Variable> {
        let w = match &self.weight {
            Some(w) => w.clone(),
            None => {
                let in_size = x.dims().last().copied().unwrap_or(1);
                let w = self.init_weight(in_size);
                self.in_size = Some(in_size);
                self.weight = Some(w.clone());
                w
            }
        };
        ops::linear(x, &w, self.bias.as_ref())
    }
}

impl Layer for Linear {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>> {
        let x = single("Linear", xs)?;
        Ok(vec![self.apply(x)?])
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert_opt("w", self.weight.as_ref());
        params.insert_opt("b", self.bias.as_ref());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::shared;
    use ag_core::{BackwardOptions, StdRandom};

    fn rng() -> SharedRandom {
        shared(StdRandom::seeded(0))
    }

    #[test]
    fn test_linear_forward_lazy_init() {
        let mut layer = Linear::new(2, rng());
        assert!(layer.weight().is_none());
        assert_eq!(layer.parameters().len(), 1);

        let x = Variable::new_of(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let y = layer.apply(&x).unwrap();
        assert_eq!(y.dims(), vec![1, 2]);
        assert_eq!(layer.in_size(), Some(3));
        assert_eq!(layer.weight().unwrap().dims(), vec![3, 2]);
        assert_eq!(layer.parameters().len(), 2);
    }

    #[test]
    fn test_linear_backward() {
        let mut layer = Linear::new(2, rng()).with_in_size(3);
        let x = Variable::new_of(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let loss = ops::sum(&layer.call(&x).unwrap(), &[], false).unwrap();
        loss.backward(BackwardOptions::default()).unwrap();

        assert!(layer.weight().unwrap().grad().is_some());
        assert_eq!(layer.bias().unwrap().grad().unwrap().data().as_slice(), &[1.0, 1.0]);
        assert!(x.grad().is_some());

        layer.clear_grads();
        assert!(layer.weight().unwrap().grad().is_none());
    }

    #[test]
    fn test_no_bias_and_xavier_scale() {
        let layer = Linear::new(50, rng()).with_in_size(400).no_bias();
        assert!(layer.bias().is_none());
        let w = layer.weight().unwrap().data().clone();
        let std = w.std(&[], false).unwrap().item().unwrap();
        // 1 / sqrt(400) = 0.05
        assert!((std - 0.05).abs() < 0.005, "std {std}");
    }

    #[test]
    fn test_rejects_multiple_inputs() {
        let mut layer = Linear::new(1, rng());
        let x = Variable::new_of(&[vec![1.0]]).unwrap();
        assert!(layer.forward(&[x.clone(), x]).is_err());
    }
}
