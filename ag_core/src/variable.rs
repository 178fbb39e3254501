//! Graph nodes holding data and gradients.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ag_tensor::{Shape, Tensor, TensorError};

use crate::backward::{self, BackwardOptions};
use crate::error::Result;
use crate::function::Function;

pub(crate) struct VariableInner {
    pub(crate) data: Tensor,
    pub(crate) grad: Option<Variable>,
    pub(crate) creator: Option<Function>,
    pub(crate) generation: usize,
    pub(crate) name: Option<String>,
}

/// A node of the computation graph: one tensor, its gradient slot and the
/// function that created it.
///
/// `Variable` is a reference-counted handle; cloning is O(1) and clones share
/// the same node. The gradient is itself a `Variable`, so a backward pass run
/// with `create_graph` produces gradients that can be differentiated again.
#[derive(Clone)]
pub struct Variable(pub(crate) Rc<RefCell<VariableInner>>);

/// Non-owning link from a function to its outputs.
#[derive(Clone)]
pub(crate) struct WeakVariable(Weak<RefCell<VariableInner>>);

impl WeakVariable {
    pub(crate) fn upgrade(&self) -> Option<Variable> {
        self.0.upgrade().map(Variable)
    }
}

impl Variable {
    /// Leaf variable over a scalar, a vector or a tensor.
    pub fn new(data: impl Into<Tensor>) -> Self {
        Variable(Rc::new(RefCell::new(VariableInner {
            data: data.into(),
            grad: None,
            creator: None,
            generation: 0,
            name: None,
        })))
    }

    /// Two-dimensional leaf from equally long rows.
    pub fn new_of(rows: &[Vec<f64>]) -> Result<Self> {
        Ok(Variable::new(Tensor::from_rows(rows)?))
    }

    /// Scalar leaf.
    pub fn constant(c: f64) -> Self {
        Variable::new(Tensor::scalar(c))
    }

    /// Builder-style name assignment.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn name(&self) -> Option<String> {
        self.0.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.0.borrow_mut().name = Some(name.into());
    }

    // === Data ===

    pub fn data(&self) -> Ref<'_, Tensor> {
        Ref::map(self.0.borrow(), |v| &v.data)
    }

    /// Replace the data tensor in place, keeping graph links.
    pub fn set_data(&self, data: Tensor) {
        self.0.borrow_mut().data = data;
    }

    pub fn shape(&self) -> Shape {
        self.0.borrow().data.shape().clone()
    }

    pub fn dims(&self) -> Vec<usize> {
        self.0.borrow().data.dims().to_vec()
    }

    pub fn num_dims(&self) -> usize {
        self.0.borrow().data.ndim()
    }

    pub fn size(&self) -> usize {
        self.0.borrow().data.numel()
    }

    pub fn at(&self, coord: &[usize]) -> Result<f64> {
        Ok(self.0.borrow().data.at(coord)?)
    }

    pub fn item(&self) -> Result<f64> {
        Ok(self.0.borrow().data.item()?)
    }

    // === Gradient ===

    pub fn grad(&self) -> Option<Variable> {
        self.0.borrow().grad.clone()
    }

    /// Set the gradient; it must have the same shape as the data.
    pub fn set_grad(&self, grad: Variable) -> Result<()> {
        let (expected, got) = (self.shape(), grad.shape());
        if expected != got {
            return Err(TensorError::ShapeMismatch {
                op: "set_grad",
                lhs: expected,
                rhs: got,
            }
            .into());
        }
        self.0.borrow_mut().grad = Some(grad);
        Ok(())
    }

    /// Reset the gradient slot.
    pub fn cleargrad(&self) {
        self.0.borrow_mut().grad = None;
    }

    // === Graph links ===

    pub fn creator(&self) -> Option<Function> {
        self.0.borrow().creator.clone()
    }

    pub(crate) fn set_creator(&self, func: &Function) {
        let mut inner = self.0.borrow_mut();
        inner.generation = func.generation() + 1;
        inner.creator = Some(func.clone());
    }

    pub fn generation(&self) -> usize {
        self.0.borrow().generation
    }

    pub fn is_leaf(&self) -> bool {
        self.0.borrow().creator.is_none()
    }

    /// Drop the creator link, turning this variable into a leaf.
    pub fn unchain(&self) {
        self.0.borrow_mut().creator = None;
    }

    /// Cut every creator link below this variable. The variable's own creator
    /// is kept but marked, so backward through it is refused afterwards.
    ///
    /// The mark is on the function, not the variable: other live outputs of
    /// a multi-output creator (the pieces of a `split`) refuse backward too.
    /// Call [`unchain`](Variable::unchain) on a sibling to keep using it as a
    /// root.
    pub fn unchain_backward(&self) {
        let Some(root) = self.creator() else {
            return;
        };
        let mut stack = vec![root];
        while let Some(func) = stack.pop() {
            func.mark_cut();
            for x in func.inputs() {
                if let Some(creator) = x.creator() {
                    stack.push(creator);
                    x.unchain();
                }
            }
        }
    }

    /// Reverse-mode accumulation from this variable. See [`BackwardOptions`].
    pub fn backward(&self, opts: BackwardOptions) -> Result<()> {
        backward::run(self, opts)
    }

    /// Stable identity of the underlying node.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakVariable {
        WeakVariable(Rc::downgrade(&self.0))
    }
}

impl From<Tensor> for Variable {
    fn from(data: Tensor) -> Self {
        Variable::new(data)
    }
}

impl From<f64> for Variable {
    fn from(c: f64) -> Self {
        Variable::constant(c)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Variable")
            .field("name", &inner.name)
            .field("shape", inner.data.shape())
            .field("generation", &inner.generation)
            .field("has_grad", &inner.grad.is_some())
            .finish()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable({})", self.0.borrow().data)
    }
}
