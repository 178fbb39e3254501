//! Arithmetic with broadcasting: neg, add, sub, mul, div, pow.

use ag_tensor::Tensor;

use super::{inputs, scalar, sum_to};
use crate::error::Result;
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

#[derive(Debug, Default)]
pub struct Neg;

impl Forwarder for Neg {
    fn name(&self) -> &'static str {
        "Neg"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Neg", xs)?;
        Ok(vec![x.neg()])
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![neg(&gys[0])?])
    }
}

#[derive(Debug, Default)]
pub struct Add;

impl Forwarder for Add {
    fn name(&self) -> &'static str {
        "Add"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x0, x1] = inputs("Add", xs)?;
        Ok(vec![x0.add(x1)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let gy = &gys[0];
        Ok(vec![sum_to(gy, xs[0].shape())?, sum_to(gy, xs[1].shape())?])
    }
}

#[derive(Debug, Default)]
pub struct Sub;

impl Forwarder for Sub {
    fn name(&self) -> &'static str {
        "Sub"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x0, x1] = inputs("Sub", xs)?;
        Ok(vec![x0.sub(x1)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let gy = &gys[0];
        let gx1 = neg(&sum_to(gy, xs[1].shape())?)?;
        Ok(vec![sum_to(gy, xs[0].shape())?, gx1])
    }
}

#[derive(Debug, Default)]
pub struct Mul;

impl Forwarder for Mul {
    fn name(&self) -> &'static str {
        "Mul"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x0, x1] = inputs("Mul", xs)?;
        Ok(vec![x0.mul(x1)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (x0, x1, gy) = (&xs[0], &xs[1], &gys[0]);
        Ok(vec![
            sum_to(&mul(gy, x1)?, x0.shape())?,
            sum_to(&mul(gy, x0)?, x1.shape())?,
        ])
    }
}

#[derive(Debug, Default)]
pub struct Div;

impl Forwarder for Div {
    fn name(&self) -> &'static str {
        "Div"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x0, x1] = inputs("Div", xs)?;
        Ok(vec![x0.div(x1)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (x0, x1, gy) = (&xs[0], &xs[1], &gys[0]);
        // d(x0/x1)/dx1 = -x0 / x1^2
        let local = neg(&div(x0, &square(x1)?)?)?;
        Ok(vec![
            sum_to(&div(gy, x1)?, x0.shape())?,
            sum_to(&mul(gy, &local)?, x1.shape())?,
        ])
    }
}

/// `x^c` for a constant exponent.
#[derive(Debug)]
pub struct Pow {
    pub c: f64,
}

impl Forwarder for Pow {
    fn name(&self) -> &'static str {
        "Pow"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Pow", xs)?;
        Ok(vec![x.pow(self.c)])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let local = mul(&pow(&xs[0], self.c - 1.0)?, &scalar(self.c))?;
        Ok(vec![mul(&gys[0], &local)?])
    }
}

pub fn neg(x: &Variable) -> Result<Variable> {
    Function::apply_one(Neg, &[x.clone()])
}

pub fn add(x0: &Variable, x1: &Variable) -> Result<Variable> {
    Function::apply_one(Add, &[x0.clone(), x1.clone()])
}

pub fn sub(x0: &Variable, x1: &Variable) -> Result<Variable> {
    Function::apply_one(Sub, &[x0.clone(), x1.clone()])
}

pub fn mul(x0: &Variable, x1: &Variable) -> Result<Variable> {
    Function::apply_one(Mul, &[x0.clone(), x1.clone()])
}

pub fn div(x0: &Variable, x1: &Variable) -> Result<Variable> {
    Function::apply_one(Div, &[x0.clone(), x1.clone()])
}

pub fn pow(x: &Variable, c: f64) -> Result<Variable> {
    Function::apply_one(Pow { c }, &[x.clone()])
}

pub fn square(x: &Variable) -> Result<Variable> {
    pow(x, 2.0)
}
