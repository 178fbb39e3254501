//! Elementwise transcendental functions and activations.

use ag_tensor::Tensor;

use super::{constant, inputs, mul, scalar, square, sub};
use crate::error::{Error, Result};
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

#[derive(Debug, Default)]
pub struct Exp;

impl Forwarder for Exp {
    fn name(&self) -> &'static str {
        "Exp"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Exp", xs)?;
        Ok(vec![x.exp()])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![mul(&gys[0], &exp(&xs[0])?)?])
    }
}

#[derive(Debug, Default)]
pub struct Log;

impl Forwarder for Log {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Log", xs)?;
        Ok(vec![x.log()])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![super::div(&gys[0], &xs[0])?])
    }
}

#[derive(Debug, Default)]
pub struct Sin;

impl Forwarder for Sin {
    fn name(&self) -> &'static str {
        "Sin"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Sin", xs)?;
        Ok(vec![x.sin()])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![mul(&gys[0], &cos(&xs[0])?)?])
    }
}

#[derive(Debug, Default)]
pub struct Cos;

impl Forwarder for Cos {
    fn name(&self) -> &'static str {
        "Cos"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Cos", xs)?;
        Ok(vec![x.cos()])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let local = super::neg(&sin(&xs[0])?)?;
        Ok(vec![mul(&gys[0], &local)?])
    }
}

#[derive(Debug, Default)]
pub struct Tanh;

impl Forwarder for Tanh {
    fn name(&self) -> &'static str {
        "Tanh"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Tanh", xs)?;
        Ok(vec![x.tanh()])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        // 1 - tanh(x)^2; the output node must not enter the gradient graph
        let local = sub(&scalar(1.0), &square(&tanh(&xs[0])?)?)?;
        Ok(vec![mul(&gys[0], &local)?])
    }
}

/// Logistic sigmoid, evaluated as `0.5 + 0.5 * tanh(0.5 * x)` for stability.
#[derive(Debug, Default)]
pub struct Sigmoid;

impl Forwarder for Sigmoid {
    fn name(&self) -> &'static str {
        "Sigmoid"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Sigmoid", xs)?;
        Ok(vec![x.map(|v| 0.5 + 0.5 * (0.5 * v).tanh())])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let y = sigmoid(&xs[0])?;
        let local = mul(&y, &sub(&scalar(1.0), &y)?)?;
        Ok(vec![mul(&gys[0], &local)?])
    }
}

#[derive(Debug, Default)]
pub struct ReLU;

impl Forwarder for ReLU {
    fn name(&self) -> &'static str {
        "ReLU"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("ReLU", xs)?;
        Ok(vec![x.maximum_c(0.0)])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let mask = constant(xs[0].data().gt_c(0.0));
        Ok(vec![mul(&gys[0], &mask)?])
    }
}

/// Clamp into `[lo, hi]`; the gradient passes only where the input was
/// inside the range.
#[derive(Debug)]
pub struct Clip {
    pub lo: f64,
    pub hi: f64,
}

impl Forwarder for Clip {
    fn name(&self) -> &'static str {
        "Clip"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Clip", xs)?;
        Ok(vec![x.clip(self.lo, self.hi)])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (lo, hi) = (self.lo, self.hi);
        let mask = constant(xs[0].data().map(|v| if v >= lo && v <= hi { 1.0 } else { 0.0 }));
        Ok(vec![mul(&gys[0], &mask)?])
    }
}

pub fn exp(x: &Variable) -> Result<Variable> {
    Function::apply_one(Exp, &[x.clone()])
}

pub fn log(x: &Variable) -> Result<Variable> {
    Function::apply_one(Log, &[x.clone()])
}

pub fn sin(x: &Variable) -> Result<Variable> {
    Function::apply_one(Sin, &[x.clone()])
}

pub fn cos(x: &Variable) -> Result<Variable> {
    Function::apply_one(Cos, &[x.clone()])
}

pub fn tanh(x: &Variable) -> Result<Variable> {
    Function::apply_one(Tanh, &[x.clone()])
}

pub fn sigmoid(x: &Variable) -> Result<Variable> {
    Function::apply_one(Sigmoid, &[x.clone()])
}

pub fn relu(x: &Variable) -> Result<Variable> {
    Function::apply_one(ReLU, &[x.clone()])
}

pub fn clip(x: &Variable, lo: f64, hi: f64) -> Result<Variable> {
    if lo > hi {
        return Err(Error::config(format!("clip bounds reversed: {lo} > {hi}")));
    }
    Function::apply_one(Clip { lo, hi }, &[x.clone()])
}
