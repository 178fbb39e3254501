//! Reverse-mode accumulation over the creator graph.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use tracing::{debug, trace};

use ag_tensor::TensorError;

use crate::config::{using_config, Flag};
use crate::error::Result;
use crate::function::Function;
use crate::ops;
use crate::variable::Variable;

/// Options for [`Variable::backward`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackwardOptions {
    /// Keep gradients of intermediate variables instead of clearing them
    /// once their creator has been processed.
    pub retain_grad: bool,
    /// Record a graph while computing gradients, enabling higher-order
    /// derivatives.
    pub create_graph: bool,
}

impl BackwardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain_grad(mut self, retain: bool) -> Self {
        self.retain_grad = retain;
        self
    }

    pub fn create_graph(mut self, create: bool) -> Self {
        self.create_graph = create;
        self
    }
}

/// Heap entry: highest generation first, insertion order breaks ties.
struct Pending {
    generation: usize,
    seq: usize,
    func: Function,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.generation
            .cmp(&other.generation)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Functions waiting to be visited, highest generation first, each at most once.
pub(crate) struct ReadySet {
    heap: BinaryHeap<Pending>,
    seen: HashSet<usize>,
    seq: usize,
}

impl ReadySet {
    pub(crate) fn new() -> Self {
        ReadySet {
            heap: BinaryHeap::new(),
            seen: HashSet::new(),
            seq: 0,
        }
    }

    pub(crate) fn push(&mut self, func: Function) {
        if self.seen.insert(func.id()) {
            self.heap.push(Pending {
                generation: func.generation(),
                seq: self.seq,
                func,
            });
            self.seq += 1;
        }
    }

    pub(crate) fn pop(&mut self) -> Option<Function> {
        self.heap.pop().map(|p| p.func)
    }
}

pub(crate) fn run(root: &Variable, opts: BackwardOptions) -> Result<()> {
    if root.grad().is_none() {
        let ones = root.data().ones_like();
        root.set_grad(Variable::new(ones))?;
    }
    let Some(creator) = root.creator() else {
        return Ok(());
    };
    debug!(shape = %root.shape(), ?opts, "backward");

    let mut ready = ReadySet::new();
    ready.push(creator);
    let mut processed = 0usize;

    while let Some(func) = ready.pop() {
        trace!(op = func.name(), generation = func.generation(), "backward step");
        {
            let _mode = using_config(Flag::EnableBackprop, opts.create_graph);
            let gxs = func.backward_step()?;
            for (x, gx) in func.inputs().iter().zip(gxs) {
                if gx.shape() != x.shape() {
                    return Err(TensorError::ShapeMismatch {
                        op: func.name(),
                        lhs: x.shape(),
                        rhs: gx.shape(),
                    }
                    .into());
                }
                let grad = match x.grad() {
                    None => gx,
                    Some(prev) => ops::add(&prev, &gx)?,
                };
                x.set_grad(grad)?;
                if let Some(c) = x.creator() {
                    ready.push(c);
                }
            }
        }

        if !opts.retain_grad {
            for y in func.outputs().into_iter().flatten() {
                if !y.ptr_eq(root) {
                    y.cleargrad();
                }
            }
        }
        processed += 1;
    }

    debug!(functions = processed, "backward done");
    Ok(())
}
