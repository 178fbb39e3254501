//! Sequential mini-batches for truncated backpropagation through time.

use ag_core::{Error, Result, Tensor};

/// Iterates a sequence of `(input, target)` pairs as `batch_size` parallel
/// streams.
///
/// The sequence is cut into `batch_size` equal strides of `len / batch_size`;
/// step `k` yields position `k` of every stride (wrapping at the end), so
/// consecutive batches continue each stream. One pass has
/// `ceil(len / batch_size)` steps. Each batch is a pair of `[batch_size, 1]`
/// tensors.
#[derive(Debug, Clone)]
pub struct SeqBatches {
    inputs: Vec<f64>,
    targets: Vec<f64>,
    batch_size: usize,
    iteration: usize,
}

impl SeqBatches {
    pub fn new(inputs: Vec<f64>, targets: Vec<f64>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::config("batch size must be positive"));
        }
        if inputs.len() != targets.len() {
            return Err(Error::config(format!(
                "inputs and targets differ in length: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.len() < batch_size {
            return Err(Error::config(format!(
                "sequence of length {} is shorter than batch size {batch_size}",
                inputs.len()
            )));
        }
        Ok(SeqBatches {
            inputs,
            targets,
            batch_size,
            iteration: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Steps per pass over the sequence.
    pub fn max_iter(&self) -> usize {
        self.inputs.len().div_ceil(self.batch_size)
    }

    /// Start a new pass.
    pub fn reset(&mut self) {
        self.iteration = 0;
    }

    fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let n = self.inputs.len();
        let jump = n / self.batch_size;
        (0..self.batch_size).map(move |i| (i * jump + self.iteration) % n)
    }
}

impl Iterator for SeqBatches {
    type Item = (Tensor, Tensor);

    fn next(&mut self) -> Option<Self::Item> {
        if self.iteration >= self.max_iter() {
            return None;
        }
        let (xs, ts): (Vec<f64>, Vec<f64>) = self
            .offsets()
            .map(|k| (self.inputs[k], self.targets[k]))
            .unzip();
        self.iteration += 1;
        let b = self.batch_size;
        // lengths match b by construction
        let x = Tensor::new([b, 1], xs).ok()?;
        let t = Tensor::new([b, 1], ts).ok()?;
        Some((x, t))
    }
}
