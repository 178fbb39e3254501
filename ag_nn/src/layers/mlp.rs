//! Multi-layer perceptron.

use ag_core::{Result, Variable};

use super::{single, Layer, Linear, Model, Parameters, SharedRandom};

/// Activation applied between hidden layers, e.g. [`ag_core::ops::sigmoid`].
pub type Activation = fn(&Variable) -> Result<Variable>;

/// A stack of [`Linear`] layers with an activation between all but the last.
pub struct Mlp {
    layers: Vec<Linear>,
    activation: Activation,
}

impl Mlp {
    /// One `Linear` per entry of `out_sizes`; parameters are named `l0.w`,
    /// `l0.b`, `l1.w`, ...
    pub fn new(out_sizes: &[usize], activation: Activation, rng: SharedRandom) -> Self {
        let layers = out_sizes
            .iter()
            .map(|&size| Linear::new(size, rng.clone()))
            .collect();
        Mlp { layers, activation }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl Layer for Mlp {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>> {
        let mut x = single("Mlp", xs)?.clone();
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter_mut().enumerate() {
            x = layer.apply(&x)?;
            if i < last {
                x = (self.activation)(&x)?;
            }
        }
        Ok(vec![x])
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        for (i, layer) in self.layers.iter().enumerate() {
            params.extend_prefixed(&format!("l{i}"), layer.parameters());
        }
        params
    }
}

impl Model for Mlp {}
