//! Long short-term memory layer.

use ag_core::{ops, Result, Variable};
use tracing::debug;

use super::{single, Layer, Linear, Parameters, SharedRandom};

/// One LSTM cell applied step by step, carrying `(h, c)` between calls.
///
/// Input projections (`x2*`) have a bias; recurrent projections (`h2*`) do
/// not. On the first step after construction or [`reset_state`], the
/// recurrent terms are skipped entirely, so the `h2*` weights take no part in
/// that step's graph.
///
/// [`reset_state`]: Layer::reset_state
pub struct Lstm {
    hidden_size: usize,
    x2f: Linear,
    x2i: Linear,
    x2o: Linear,
    x2u: Linear,
    h2f: Linear,
    h2i: Linear,
    h2o: Linear,
    h2u: Linear,
    h: Option<Variable>,
    c: Option<Variable>,
}

impl Lstm {
    pub fn new(hidden_size: usize, rng: SharedRandom) -> Self {
        let input = |rng: &SharedRandom| Linear::new(hidden_size, rng.clone());
        let recurrent = |rng: &SharedRandom| {
            Linear::new(hidden_size, rng.clone())
                .with_in_size(hidden_size)
                .no_bias()
        };
        Lstm {
            hidden_size,
            x2f: input(&rng),
            x2i: input(&rng),
            x2o: input(&rng),
            x2u: input(&rng),
            h2f: recurrent(&rng),
            h2i: recurrent(&rng),
            h2o: recurrent(&rng),
            h2u: recurrent(&rng),
            h: None,
            c: None,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Carried `(h, c)`, if a step has run since the last reset.
    pub fn state(&self) -> Option<(&Variable, &Variable)> {
        self.h.as_ref().zip(self.c.as_ref())
    }

    fn step(&mut self, x: &Variable) -> Result<Variable> {
        let (f, i, o, u) = match &self.h {
            None => (
                ops::sigmoid(&self.x2f.apply(x)?)?,
                ops::sigmoid(&self.x2i.apply(x)?)?,
                ops::sigmoid(&self.x2o.apply(x)?)?,
                ops::tanh(&self.x2u.apply(x)?)?,
            ),
            Some(h) => (
                ops::sigmoid(&ops::add(&self.x2f.apply(x)?, &self.h2f.apply(h)?)?)?,
                ops::sigmoid(&ops::add(&self.x2i.apply(x)?, &self.h2i.apply(h)?)?)?,
                ops::sigmoid(&ops::add(&self.x2o.apply(x)?, &self.h2o.apply(h)?)?)?,
                ops::tanh(&ops::add(&self.x2u.apply(x)?, &self.h2u.apply(h)?)?)?,
            ),
        };

        let c_new = match &self.c {
            None => ops::mul(&i, &u)?,
            Some(c) => ops::add(&ops::mul(&f, c)?, &ops::mul(&i, &u)?)?,
        };
        let h_new = ops::mul(&o, &ops::tanh(&c_new)?)?;

        self.h = Some(h_new.clone());
        self.c = Some(c_new);
        Ok(h_new)
    }
}

impl Layer for Lstm {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>> {
        let x = single("Lstm", xs)?;
        Ok(vec![self.step(x)?])
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        for (name, layer) in [
            ("x2f", &self.x2f),
            ("x2i", &self.x2i),
            ("x2o", &self.x2o),
            ("x2u", &self.x2u),
            ("h2f", &self.h2f),
            ("h2i", &self.h2i),
            ("h2o", &self.h2o),
            ("h2u", &self.h2u),
        ] {
            params.extend_prefixed(name, layer.parameters());
        }
        params
    }

    fn reset_state(&mut self) {
        debug!(hidden_size = self.hidden_size, "lstm state reset");
        self.h = None;
        self.c = None;
    }
}
