//! Reductions and their broadcasting duals.

use ag_tensor::{Shape, Tensor, DEFAULT_ATOL, DEFAULT_RTOL};

use super::{constant, inputs, mul, reshape, scalar, sub};
use crate::error::Result;
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

/// Reshape an upstream gradient of a reduction back to the keep-dims layout
/// and broadcast it over the input.
fn expand_grad(gy: &Variable, x_shape: &Shape, axes: &[usize]) -> Result<Variable> {
    let g = reshape(gy, x_shape.keepdims(axes))?;
    broadcast_to(&g, x_shape.clone())
}

fn as_isize(axes: &[usize]) -> Vec<isize> {
    axes.iter().map(|&a| a as isize).collect()
}

/// Sum over `axes` (empty means every axis).
#[derive(Debug)]
pub struct Sum {
    axes: Vec<isize>,
    keepdims: bool,
    reduced: Vec<usize>,
}

impl Forwarder for Sum {
    fn name(&self) -> &'static str {
        "Sum"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Sum", xs)?;
        self.reduced = x.shape().normalize_axes(&self.axes)?;
        Ok(vec![x.sum(&self.axes, self.keepdims)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![expand_grad(&gys[0], &xs[0].shape(), &self.reduced)?])
    }
}

/// Sum the broadcast axes away so the result has `shape`.
#[derive(Debug)]
pub struct SumTo {
    shape: Shape,
}

impl Forwarder for SumTo {
    fn name(&self) -> &'static str {
        "SumTo"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("SumTo", xs)?;
        Ok(vec![x.sum_to(self.shape.clone())?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![broadcast_to(&gys[0], xs[0].shape())?])
    }
}

/// Replicate size-1 axes up to `shape`.
#[derive(Debug)]
pub struct BroadcastTo {
    shape: Shape,
}

impl Forwarder for BroadcastTo {
    fn name(&self) -> &'static str {
        "BroadcastTo"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("BroadcastTo", xs)?;
        Ok(vec![x.broadcast_to(self.shape.clone())?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![sum_to(&gys[0], xs[0].shape())?])
    }
}

#[derive(Debug)]
pub struct Mean {
    axes: Vec<isize>,
    keepdims: bool,
    reduced: Vec<usize>,
    count: usize,
}

impl Forwarder for Mean {
    fn name(&self) -> &'static str {
        "Mean"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Mean", xs)?;
        self.reduced = x.shape().normalize_axes(&self.axes)?;
        self.count = x.reduced_count(&self.axes)?;
        Ok(vec![x.mean(&self.axes, self.keepdims)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let g = expand_grad(&gys[0], &xs[0].shape(), &self.reduced)?;
        Ok(vec![mul(&g, &scalar(1.0 / self.count as f64))?])
    }
}

/// Population variance over `axes`.
#[derive(Debug)]
pub struct Variance {
    axes: Vec<isize>,
    keepdims: bool,
    reduced: Vec<usize>,
    count: usize,
}

impl Forwarder for Variance {
    fn name(&self) -> &'static str {
        "Variance"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Variance", xs)?;
        self.reduced = x.shape().normalize_axes(&self.axes)?;
        self.count = x.reduced_count(&self.axes)?;
        Ok(vec![x.variance(&self.axes, self.keepdims)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let x = &xs[0];
        let g = expand_grad(&gys[0], &x.shape(), &self.reduced)?;
        // d var / dx = 2 (x - mean) / n
        let centered = sub(x, &mean(x, &as_isize(&self.reduced), true)?)?;
        let local = mul(&centered, &scalar(2.0 / self.count as f64))?;
        Ok(vec![mul(&g, &local)?])
    }
}

/// Shared forward/backward for max and min: the gradient flows to every
/// element equal to the extremum.
#[derive(Debug)]
struct Extremum {
    axes: Vec<isize>,
    keepdims: bool,
    reduced: Vec<usize>,
}

impl Extremum {
    fn backward(&self, x: &Variable, y: &Variable, gy: &Variable) -> Result<Vec<Variable>> {
        let x_shape = x.shape();
        let keep = x_shape.keepdims(&self.reduced);
        let mask = {
            let y_keep = y.data().reshape(keep)?;
            x.data().is_close(&y_keep, DEFAULT_ATOL, DEFAULT_RTOL)?
        };
        let g = expand_grad(gy, &x_shape, &self.reduced)?;
        Ok(vec![mul(&g, &constant(mask))?])
    }
}

#[derive(Debug)]
pub struct Max(Extremum);

impl Forwarder for Max {
    fn name(&self) -> &'static str {
        "Max"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Max", xs)?;
        self.0.reduced = x.shape().normalize_axes(&self.0.axes)?;
        Ok(vec![x.max(&self.0.axes, self.0.keepdims)?])
    }

    fn backward(&self, xs: &[Variable], ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        self.0.backward(&xs[0], &ys[0], &gys[0])
    }
}

#[derive(Debug)]
pub struct Min(Extremum);

impl Forwarder for Min {
    fn name(&self) -> &'static str {
        "Min"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Min", xs)?;
        self.0.reduced = x.shape().normalize_axes(&self.0.axes)?;
        Ok(vec![x.min(&self.0.axes, self.0.keepdims)?])
    }

    fn backward(&self, xs: &[Variable], ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        self.0.backward(&xs[0], &ys[0], &gys[0])
    }
}

pub fn sum(x: &Variable, axes: &[isize], keepdims: bool) -> Result<Variable> {
    let op = Sum {
        axes: axes.to_vec(),
        keepdims,
        reduced: Vec::new(),
    };
    Function::apply_one(op, &[x.clone()])
}

/// Reduce `x` to `shape`; a no-op when the shapes already agree.
pub fn sum_to(x: &Variable, shape: impl Into<Shape>) -> Result<Variable> {
    let shape = shape.into();
    if x.shape() == shape {
        return Ok(x.clone());
    }
    Function::apply_one(SumTo { shape }, &[x.clone()])
}

/// Broadcast `x` to `shape`; a no-op when the shapes already agree.
pub fn broadcast_to(x: &Variable, shape: impl Into<Shape>) -> Result<Variable> {
    let shape = shape.into();
    if x.shape() == shape {
        return Ok(x.clone());
    }
    Function::apply_one(BroadcastTo { shape }, &[x.clone()])
}

pub fn mean(x: &Variable, axes: &[isize], keepdims: bool) -> Result<Variable> {
    let op = Mean {
        axes: axes.to_vec(),
        keepdims,
        reduced: Vec::new(),
        count: 0,
    };
    Function::apply_one(op, &[x.clone()])
}

pub fn variance(x: &Variable, axes: &[isize], keepdims: bool) -> Result<Variable> {
    let op = Variance {
        axes: axes.to_vec(),
        keepdims,
        reduced: Vec::new(),
        count: 0,
    };
    Function::apply_one(op, &[x.clone()])
}

fn extremum(axes: &[isize], keepdims: bool) -> Extremum {
    Extremum {
        axes: axes.to_vec(),
        keepdims,
        reduced: Vec::new(),
    }
}

pub fn max(x: &Variable, axes: &[isize], keepdims: bool) -> Result<Variable> {
    Function::apply_one(Max(extremum(axes, keepdims)), &[x.clone()])
}

pub fn min(x: &Variable, axes: &[isize], keepdims: bool) -> Result<Variable> {
    Function::apply_one(Min(extremum(axes, keepdims)), &[x.clone()])
}
