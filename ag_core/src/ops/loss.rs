//! Softmax, losses, dropout and accuracy.

use ag_tensor::{RandomSource, Tensor, DEFAULT_ATOL, DEFAULT_RTOL};

use super::{constant, inputs, mul, scalar, sub, sum, sum_to};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

/// Numerically stable softmax of a tensor along `axis`.
fn softmax_tensor(x: &Tensor, axis: isize) -> Result<Tensor> {
    let m = x.max(&[axis], true)?;
    let e = x.sub(&m)?.exp();
    let s = e.sum(&[axis], true)?;
    Ok(e.div(&s)?)
}

#[derive(Debug)]
pub struct Softmax {
    axis: isize,
}

impl Forwarder for Softmax {
    fn name(&self) -> &'static str {
        "Softmax"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Softmax", xs)?;
        Ok(vec![softmax_tensor(x, self.axis)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let y = softmax(&xs[0], self.axis)?;
        let gx = mul(&y, &gys[0])?;
        let sumdx = sum(&gx, &[self.axis], true)?;
        Ok(vec![sub(&gx, &mul(&y, &sumdx)?)?])
    }
}

/// Mean negative log-likelihood of integer labels under `softmax(x)` over
/// axis 1. `x` is `[N, C]`, labels are `[N]`.
#[derive(Debug)]
pub struct SoftmaxCrossEntropy {
    labels: Tensor<i64>,
}

impl SoftmaxCrossEntropy {
    fn check(&self, x: &Tensor) -> Result<(usize, usize)> {
        if x.ndim() != 2 {
            return Err(ag_tensor::TensorError::Rank {
                op: "softmax_cross_entropy",
                expected: "2".into(),
                got: x.ndim(),
            }
            .into());
        }
        if self.labels.ndim() != 1 {
            return Err(ag_tensor::TensorError::Rank {
                op: "softmax_cross_entropy labels",
                expected: "1".into(),
                got: self.labels.ndim(),
            }
            .into());
        }
        let (n, c) = (x.dims()[0], x.dims()[1]);
        if self.labels.numel() != n {
            return Err(Error::config(format!(
                "softmax_cross_entropy: {} labels for a batch of {n}",
                self.labels.numel()
            )));
        }
        Ok((n, c))
    }
}

impl Forwarder for SoftmaxCrossEntropy {
    fn name(&self) -> &'static str {
        "SoftmaxCrossEntropy"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("SoftmaxCrossEntropy", xs)?;
        let (n, c) = self.check(x)?;

        // log softmax via log-sum-exp
        let m = x.max(&[1], true)?;
        let lse = x.sub(&m)?.exp().sum(&[1], true)?.log().add(&m)?;
        let log_p = x.sub(&lse)?;

        let mut total = 0.0;
        for (row, &label) in self.labels.as_slice().iter().enumerate() {
            if label < 0 || label as usize >= c {
                return Err(Error::config(format!("label {label} outside 0..{c}")));
            }
            total += log_p.at(&[row, label as usize])?;
        }
        Ok(vec![Tensor::scalar(-total / n as f64)])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let x = &xs[0];
        let (n, c) = (x.dims()[0], x.dims()[1]);
        let y = softmax(x, 1)?;
        let onehot = constant(Tensor::one_hot(&self.labels, c)?);
        let gy = mul(&gys[0], &scalar(1.0 / n as f64))?;
        Ok(vec![mul(&sub(&y, &onehot)?, &gy)?])
    }
}

/// `sum((x0 - x1)^2) / N` where `N` is the leading dimension.
#[derive(Debug, Default)]
pub struct MeanSquaredError;

fn leading_dim(t: &Tensor) -> usize {
    t.dims().first().copied().unwrap_or(1).max(1)
}

impl Forwarder for MeanSquaredError {
    fn name(&self) -> &'static str {
        "MeanSquaredError"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x0, x1] = inputs("MeanSquaredError", xs)?;
        let diff = x0.sub(x1)?;
        let n = leading_dim(&diff) as f64;
        let total: f64 = diff.as_slice().iter().map(|d| d * d).sum();
        Ok(vec![Tensor::scalar(total / n)])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (x0, x1) = (&xs[0], &xs[1]);
        let diff = sub(x0, x1)?;
        let n = leading_dim(&diff.data()) as f64;
        let gx = mul(&mul(&diff, &gys[0])?, &scalar(2.0 / n))?;
        let gx0 = sum_to(&gx, x0.shape())?;
        let gx1 = sum_to(&super::neg(&gx)?, x1.shape())?;
        Ok(vec![gx0, gx1])
    }
}

/// Multiplies by a fixed inverted-dropout mask sampled at construction.
#[derive(Debug)]
pub struct Dropout {
    mask: Tensor,
}

impl Forwarder for Dropout {
    fn name(&self) -> &'static str {
        "Dropout"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Dropout", xs)?;
        Ok(vec![x.mul(&self.mask)?])
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![mul(&gys[0], &constant(self.mask.clone()))?])
    }
}

pub fn softmax(x: &Variable, axis: isize) -> Result<Variable> {
    Function::apply_one(Softmax { axis }, &[x.clone()])
}

pub fn softmax_cross_entropy(x: &Variable, labels: &Tensor<i64>) -> Result<Variable> {
    let op = SoftmaxCrossEntropy {
        labels: labels.clone(),
    };
    Function::apply_one(op, &[x.clone()])
}

pub fn mean_squared_error(x0: &Variable, x1: &Variable) -> Result<Variable> {
    Function::apply_one(MeanSquaredError, &[x0.clone(), x1.clone()])
}

/// Inverted dropout: in training mode each element is kept with probability
/// `1 - ratio` and scaled by `1 / (1 - ratio)`; otherwise `x` is returned as is.
pub fn dropout(x: &Variable, ratio: f64, src: &mut dyn RandomSource) -> Result<Variable> {
    if !(0.0..1.0).contains(&ratio) {
        return Err(Error::config(format!("dropout ratio {ratio} outside [0, 1)")));
    }
    if !Config::train() {
        return Ok(x.clone());
    }
    let scale = 1.0 / (1.0 - ratio);
    let mask = Tensor::rand(x.shape(), src).map(|u| if u > ratio { scale } else { 0.0 });
    Function::apply_one(Dropout { mask }, &[x.clone()])
}

/// Fraction of rows whose argmax over axis 1 equals the label. Not
/// differentiable; the result is a fresh leaf.
pub fn accuracy(y: &Variable, labels: &Tensor<i64>) -> Result<Variable> {
    let pred = y.data().argmax(1)?.reshape(labels.shape())?;
    let hits = pred
        .to_f64()
        .is_close(&labels.to_f64(), DEFAULT_ATOL, DEFAULT_RTOL)?;
    Ok(Variable::new(hits.mean(&[], false)?))
}
