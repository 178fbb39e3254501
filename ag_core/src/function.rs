//! Function nodes: one applied operation in the computation graph.

use std::cell::{Cell, Ref};
use std::fmt;
use std::rc::Rc;

use ag_tensor::{Shape, Tensor};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::variable::{Variable, WeakVariable};

/// Operation-specific forward/backward pair.
///
/// `forward` computes raw output tensors and may stash whatever state the
/// backward pass needs (shapes, masks, indices). `backward` must be written
/// in terms of differentiable ops on [`Variable`]s, so that running it with
/// backprop enabled records a graph over the gradients.
pub trait Forwarder {
    /// Short operation name, used in graph dumps.
    fn name(&self) -> &'static str;

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>>;

    /// Gradients for each input given the upstream gradient of each output.
    /// `ys` holds the outputs; missing outputs are replaced by zeros.
    fn backward(&self, xs: &[Variable], ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>>;
}

struct FunctionInner {
    forwarder: Box<dyn Forwarder>,
    inputs: Vec<Variable>,
    outputs: Vec<WeakVariable>,
    output_shapes: Vec<Shape>,
    generation: usize,
    cut: Cell<bool>,
}

/// Reference-counted handle to a recorded operation.
///
/// A function owns its inputs and refers to its outputs weakly, so the graph
/// is released once no user-held variable reaches it.
#[derive(Clone)]
pub struct Function(Rc<FunctionInner>);

impl Function {
    /// Run `forwarder` on `inputs`. When backprop is enabled the resulting
    /// function is recorded as the creator of every output.
    pub fn apply<F>(forwarder: F, inputs: &[Variable]) -> Result<Vec<Variable>>
    where
        F: Forwarder + 'static,
    {
        let mut forwarder: Box<dyn Forwarder> = Box::new(forwarder);
        let ys = {
            let datas: Vec<Ref<'_, Tensor>> = inputs.iter().map(Variable::data).collect();
            let refs: Vec<&Tensor> = datas.iter().map(|d| &**d).collect();
            forwarder.forward(&refs)?
        };
        let outputs: Vec<Variable> = ys.into_iter().map(Variable::from).collect();

        if !Config::enable_backprop() {
            return Ok(outputs);
        }

        let generation = inputs.iter().map(Variable::generation).max().unwrap_or(0);
        let func = Function(Rc::new(FunctionInner {
            forwarder,
            inputs: inputs.to_vec(),
            outputs: outputs.iter().map(Variable::downgrade).collect(),
            output_shapes: outputs.iter().map(Variable::shape).collect(),
            generation,
            cut: Cell::new(false),
        }));
        for y in &outputs {
            y.set_creator(&func);
        }
        Ok(outputs)
    }

    /// [`apply`](Function::apply) for single-output operations.
    pub fn apply_one<F>(forwarder: F, inputs: &[Variable]) -> Result<Variable>
    where
        F: Forwarder + 'static,
    {
        let name = forwarder.name();
        let mut outputs = Function::apply(forwarder, inputs)?;
        if outputs.len() != 1 {
            return Err(Error::Arity {
                op: name,
                expected: 1,
                got: outputs.len(),
            });
        }
        Ok(outputs.remove(0))
    }

    pub fn name(&self) -> &'static str {
        self.0.forwarder.name()
    }

    pub fn inputs(&self) -> &[Variable] {
        &self.0.inputs
    }

    /// Outputs still alive; freed outputs are `None`.
    pub fn outputs(&self) -> Vec<Option<Variable>> {
        self.0.outputs.iter().map(WeakVariable::upgrade).collect()
    }

    pub fn generation(&self) -> usize {
        self.0.generation
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub(crate) fn mark_cut(&self) {
        self.0.cut.set(true);
    }

    /// Run the forwarder's backward with the outputs' current gradients.
    pub(crate) fn backward_step(&self) -> Result<Vec<Variable>> {
        if self.0.cut.get() {
            return Err(Error::State(format!(
                "{} was detached by unchain_backward and cannot be differentiated",
                self.name()
            )));
        }

        let mut ys = Vec::with_capacity(self.0.outputs.len());
        let mut gys = Vec::with_capacity(self.0.outputs.len());
        for (weak, shape) in self.0.outputs.iter().zip(&self.0.output_shapes) {
            let zeros = || Variable::new(Tensor::<f64>::zeros(shape.clone()));
            match weak.upgrade() {
                Some(y) => {
                    gys.push(y.grad().unwrap_or_else(zeros));
                    ys.push(y);
                }
                None => {
                    ys.push(zeros());
                    gys.push(zeros());
                }
            }
        }

        let gxs = self.0.forwarder.backward(&self.0.inputs, &ys, &gys)?;
        if gxs.len() != self.0.inputs.len() {
            return Err(Error::Arity {
                op: self.name(),
                expected: self.0.inputs.len(),
                got: gxs.len(),
            });
        }
        Ok(gxs)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("generation", &self.0.generation)
            .field("inputs", &self.0.inputs.len())
            .field("outputs", &self.0.outputs.len())
            .finish()
    }
}
