//! The differentiable operation library.
//!
//! Every op is a [`Forwarder`](crate::Forwarder) plus a free function that
//! applies it. Backward passes are expressed with these same functions, so
//! gradients computed under `create_graph` are themselves differentiable.

mod arith;
mod linalg;
mod loss;
mod math;
mod reduce;
mod shape;

pub use arith::{add, div, mul, neg, pow, square, sub, Add, Div, Mul, Neg, Pow, Sub};
pub use linalg::{linear, matmul, MatMul, Linear};
pub use loss::{
    accuracy, dropout, mean_squared_error, softmax, softmax_cross_entropy, Dropout,
    MeanSquaredError, Softmax, SoftmaxCrossEntropy,
};
pub use math::{clip, cos, exp, log, relu, sigmoid, sin, tanh, Clip, Cos, Exp, Log, ReLU, Sigmoid, Sin, Tanh};
pub use reduce::{
    broadcast_to, max, mean, min, sum, sum_to, variance, BroadcastTo, Max, Mean, Min, Sum, SumTo,
    Variance,
};
pub use shape::{
    concat, get_item, reshape, split, transpose, Concat, GetItem, GetItemGrad, Reshape, Split,
    Transpose,
};

use ag_tensor::{Shape, Tensor};

use crate::error::{Error, Result};
use crate::variable::Variable;

/// Destructure forward inputs into a fixed-size array.
pub(crate) fn inputs<'a, const N: usize>(op: &'static str, xs: &[&'a Tensor]) -> Result<[&'a Tensor; N]> {
    <[&Tensor; N]>::try_from(xs).map_err(|_| Error::Arity {
        op,
        expected: N,
        got: xs.len(),
    })
}

/// Scalar constant leaf used inside backward formulas.
pub(crate) fn scalar(c: f64) -> Variable {
    Variable::constant(c)
}

/// Constant (non-differentiable) leaf over a mask or other saved tensor.
pub(crate) fn constant(t: Tensor) -> Variable {
    Variable::new(t)
}

impl Variable {
    pub fn neg(&self) -> Result<Variable> {
        neg(self)
    }

    pub fn add(&self, other: &Variable) -> Result<Variable> {
        add(self, other)
    }

    pub fn sub(&self, other: &Variable) -> Result<Variable> {
        sub(self, other)
    }

    pub fn mul(&self, other: &Variable) -> Result<Variable> {
        mul(self, other)
    }

    pub fn div(&self, other: &Variable) -> Result<Variable> {
        div(self, other)
    }

    pub fn pow(&self, c: f64) -> Result<Variable> {
        pow(self, c)
    }

    pub fn square(&self) -> Result<Variable> {
        square(self)
    }

    pub fn exp(&self) -> Result<Variable> {
        exp(self)
    }

    pub fn log(&self) -> Result<Variable> {
        log(self)
    }

    pub fn sin(&self) -> Result<Variable> {
        sin(self)
    }

    pub fn cos(&self) -> Result<Variable> {
        cos(self)
    }

    pub fn tanh(&self) -> Result<Variable> {
        tanh(self)
    }

    pub fn sum(&self, axes: &[isize], keepdims: bool) -> Result<Variable> {
        sum(self, axes, keepdims)
    }

    pub fn mean(&self, axes: &[isize], keepdims: bool) -> Result<Variable> {
        mean(self, axes, keepdims)
    }

    /// Same data viewed with a different shape.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Variable> {
        reshape(self, shape)
    }

    pub fn transpose(&self, axes: &[isize]) -> Result<Variable> {
        transpose(self, axes)
    }

    /// Reverse all axes.
    pub fn t(&self) -> Result<Variable> {
        transpose(self, &[])
    }

    pub fn matmul(&self, w: &Variable) -> Result<Variable> {
        matmul(self, w)
    }

    pub fn get_item(&self, indices: &[usize], axis: isize) -> Result<Variable> {
        get_item(self, indices, axis)
    }
}
