//! Layer and model interfaces plus the named parameter set.

mod linear;
mod lstm;
mod mlp;
mod rnn;

pub use linear::Linear;
pub use lstm::Lstm;
pub use mlp::{Activation, Mlp};
pub use rnn::Rnn;

use std::cell::RefCell;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::rc::Rc;

use ag_core::dot::get_dot_graph;
use ag_core::{Error, RandomSource, Result, Variable};

/// Random source shared by the layers of one model.
pub type SharedRandom = Rc<RefCell<dyn RandomSource>>;

/// Wrap a concrete source for sharing between layers.
pub fn shared<R: RandomSource + 'static>(src: R) -> SharedRandom {
    Rc::new(RefCell::new(src))
}

/// Trainable variables keyed by dotted path (`"l0.w"`). Iteration is
/// lexicographic by path.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    params: BTreeMap<String, Variable>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, param: Variable) {
        self.params.insert(path.into(), param);
    }

    /// Insert a variable only if it exists (lazily initialised weights).
    pub fn insert_opt(&mut self, path: impl Into<String>, param: Option<&Variable>) {
        if let Some(p) = param {
            self.insert(path, p.clone());
        }
    }

    /// Merge a child's parameters under `prefix.`.
    pub fn extend_prefixed(&mut self, prefix: &str, child: Parameters) {
        for (path, p) in child.params {
            self.params.insert(format!("{prefix}.{path}"), p);
        }
    }

    pub fn get(&self, path: &str) -> Option<&Variable> {
        self.params.get(path)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Variable> {
        self.params.iter()
    }

    pub fn clear_grads(&self) {
        for p in self.params.values() {
            p.cleargrad();
        }
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a Variable);
    type IntoIter = btree_map::Iter<'a, String, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// A differentiable building block with owned parameters.
pub trait Layer {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>>;

    fn parameters(&self) -> Parameters;

    /// Convenience for single-input, single-output layers.
    fn call(&mut self, x: &Variable) -> Result<Variable> {
        let mut ys = self.forward(std::slice::from_ref(x))?;
        match ys.len() {
            1 => Ok(ys.remove(0)),
            got => Err(Error::Arity {
                op: "Layer::call",
                expected: 1,
                got,
            }),
        }
    }

    fn clear_grads(&self) {
        self.parameters().clear_grads();
    }

    /// Forget carried state; stateless layers have none.
    fn reset_state(&mut self) {}
}

/// A top-level layer that can render its own graph.
pub trait Model: Layer {
    /// DOT graph of one forward pass over `xs`, with data in the labels.
    fn plot(&mut self, xs: &[Variable]) -> Result<String> {
        let ys = self.forward(xs)?;
        let y = ys
            .first()
            .ok_or_else(|| Error::State("model produced no output".into()))?;
        Ok(get_dot_graph(y, true))
    }
}

/// Reject inputs other than exactly one variable.
pub(crate) fn single<'a>(op: &'static str, xs: &'a [Variable]) -> Result<&'a Variable> {
    match xs {
        [x] => Ok(x),
        _ => Err(Error::Arity {
            op,
            expected: 1,
            got: xs.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_are_sorted_by_path() {
        let mut child = Parameters::new();
        child.insert("w", Variable::constant(1.0));
        child.insert("b", Variable::constant(2.0));

        let mut params = Parameters::new();
        params.extend_prefixed("l1", child.clone());
        params.extend_prefixed("l0", child);
        params.insert_opt("skip", None);

        let paths: Vec<&str> = params.paths().collect();
        assert_eq!(paths, vec!["l0.b", "l0.w", "l1.b", "l1.w"]);
        assert_eq!(params.len(), 4);
        assert_eq!(params.get("l1.b").unwrap().item().unwrap(), 2.0);
    }

    #[test]
    fn test_clear_grads() {
        let p = Variable::constant(1.0);
        p.set_grad(Variable::constant(0.5)).unwrap();
        let mut params = Parameters::new();
        params.insert("p", p.clone());
        params.clear_grads();
        assert!(p.grad().is_none());
    }
}
