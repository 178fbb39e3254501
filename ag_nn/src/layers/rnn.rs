//! Elman recurrent layer.

use ag_core::{ops, Result, Variable};
use tracing::debug;

use super::{single, Layer, Linear, Parameters, SharedRandom};

/// `h' = tanh(x2h(x) + h2h(h))`, carrying `h` between calls.
pub struct Rnn {
    x2h: Linear,
    h2h: Linear,
    h: Option<Variable>,
}

impl Rnn {
    pub fn new(hidden_size: usize, rng: SharedRandom) -> Self {
        Rnn {
            x2h: Linear::new(hidden_size, rng.clone()),
            h2h: Linear::new(hidden_size, rng).with_in_size(hidden_size).no_bias(),
            h: None,
        }
    }

    /// The carried hidden state, if any.
    pub fn state(&self) -> Option<&Variable> {
        self.h.as_ref()
    }
}

impl Layer for Rnn {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>> {
        let x = single("Rnn", xs)?;
        let pre = self.x2h.apply(x)?;
        let h_new = match &self.h {
            None => ops::tanh(&pre)?,
            Some(h) => ops::tanh(&ops::add(&pre, &self.h2h.apply(h)?)?)?,
        };
        self.h = Some(h_new.clone());
        Ok(vec![h_new])
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.extend_prefixed("x2h", self.x2h.parameters());
        params.extend_prefixed("h2h", self.h2h.parameters());
        params
    }

    fn reset_state(&mut self) {
        debug!("rnn state reset");
        self.h = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::shared;
    use ag_core::{BackwardOptions, StdRandom};

    #[test]
    fn test_state_carried_and_reset() {
        let mut rnn = Rnn::new(4, shared(StdRandom::seeded(1)));
        let x = Variable::new_of(&[vec![0.5, -0.5]]).unwrap();
        let h1 = rnn.call(&x).unwrap();
        assert_eq!(h1.dims(), vec![1, 4]);
        let h2 = rnn.call(&x).unwrap();
        assert!(rnn.state().unwrap().ptr_eq(&h2));

        ops::sum(&h2, &[], false)
            .unwrap()
            .backward(BackwardOptions::default())
            .unwrap();
        assert!(rnn.parameters().get("h2h.w").unwrap().grad().is_some());

        rnn.reset_state();
        assert!(rnn.state().is_none());
    }

    #[test]
    fn test_parameter_paths() {
        let mut rnn = Rnn::new(3, shared(StdRandom::seeded(2)));
        rnn.call(&Variable::new_of(&[vec![1.0]]).unwrap()).unwrap();
        let params = rnn.parameters();
        let paths: Vec<&str> = params.paths().collect();
        assert_eq!(paths, vec!["h2h.w", "x2h.b", "x2h.w"]);
    }
}
