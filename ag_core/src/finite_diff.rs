//! Finite difference utilities for gradient verification.
//!
//! Compares reverse-mode gradients against central differences.

use ag_tensor::Tensor;
use tracing::debug;

use crate::backward::BackwardOptions;
use crate::config::no_grad;
use crate::error::{Error, Result};
use crate::ops;
use crate::variable::Variable;

/// Absolute tolerance used by [`gradient_check`] callers by default.
pub const GRAD_ATOL: f64 = 1e-4;
/// Relative tolerance used by [`gradient_check`] callers by default.
pub const GRAD_RTOL: f64 = 1e-3;

/// Step size for central differences.
pub const DEFAULT_EPS: f64 = 1e-4;

/// Sum of the outputs of `f` at `x`, without recording a graph.
fn eval_sum<F>(f: &F, x: Tensor) -> Result<f64>
where
    F: Fn(&Variable) -> Result<Variable>,
{
    let _guard = no_grad();
    let y = f(&Variable::new(x))?;
    let total = y.data().as_slice().iter().sum();
    Ok(total)
}

/// Gradient of `sum(f(x))` by central differences.
///
/// # Example
/// ```
/// use ag_core::finite_diff::numerical_grad;
/// use ag_core::{ops, Variable};
/// use ag_tensor::Tensor;
///
/// // d/dx sum(x^2) = 2x
/// let g = numerical_grad(|x: &Variable| ops::square(x), &Tensor::from_vec(vec![3.0, 4.0]), 1e-6).unwrap();
/// assert!((g.as_slice()[0] - 6.0).abs() < 1e-5);
/// assert!((g.as_slice()[1] - 8.0).abs() < 1e-5);
/// ```
pub fn numerical_grad<F>(f: F, x: &Tensor, eps: f64) -> Result<Tensor>
where
    F: Fn(&Variable) -> Result<Variable>,
{
    let mut grad = Vec::with_capacity(x.numel());
    let mut perturbed = x.clone();
    for i in 0..x.numel() {
        let coord = x.unravel(i)?;
        let orig = x.as_slice()[i];

        perturbed.set(&coord, orig + eps)?;
        let f_plus = eval_sum(&f, perturbed.clone())?;
        perturbed.set(&coord, orig - eps)?;
        let f_minus = eval_sum(&f, perturbed.clone())?;
        perturbed.set(&coord, orig)?;

        grad.push((f_plus - f_minus) / (2.0 * eps));
    }
    Ok(Tensor::new(x.shape(), grad)?)
}

/// Largest absolute elementwise difference between two gradients.
pub fn max_grad_error(a: &Tensor, b: &Tensor) -> f64 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(p, q)| (p - q).abs())
        .fold(0.0, f64::max)
}

/// Backprop gradient of `sum(f(x))`.
pub fn backprop_grad<F>(f: F, x: &Tensor) -> Result<Tensor>
where
    F: Fn(&Variable) -> Result<Variable>,
{
    let xv = Variable::new(x.clone());
    let y = ops::sum(&f(&xv)?, &[], false)?;
    y.backward(BackwardOptions::default())?;
    let grad = xv
        .grad()
        .ok_or_else(|| Error::State("input received no gradient".into()))?;
    let g = grad.data().clone();
    Ok(g)
}

/// True when the backprop gradient of `sum(f(x))` matches central
/// differences within `atol + rtol * |numerical|` elementwise.
pub fn gradient_check<F>(f: F, x: &Tensor, atol: f64, rtol: f64) -> Result<bool>
where
    F: Fn(&Variable) -> Result<Variable>,
{
    let analytic = backprop_grad(&f, x)?;
    let numeric = numerical_grad(&f, x, DEFAULT_EPS)?;
    let ok = analytic.is_close_all(&numeric, atol, rtol);
    debug!(
        shape = %x.shape(),
        max_error = max_grad_error(&analytic, &numeric),
        ok,
        "gradient check"
    );
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numerical_grad_transcendental() {
        // d/dx sin(x) exp(x) = (cos x + sin x) exp x
        let f = |x: &Variable| ops::mul(&ops::sin(x)?, &ops::exp(x)?);
        let g = numerical_grad(f, &Tensor::scalar(1.0), 1e-6).unwrap();
        let expected = (1.0_f64.cos() + 1.0_f64.sin()) * 1.0_f64.exp();
        assert!((g.item().unwrap() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_gradient_check_passes_for_correct_op() {
        let x = Tensor::new([2, 2], vec![0.1, -0.4, 0.7, 1.3]).unwrap();
        assert!(gradient_check(|v: &Variable| ops::tanh(v), &x, GRAD_ATOL, GRAD_RTOL).unwrap());
    }

    #[test]
    fn test_gradient_check_detects_wrong_gradient() {
        // Clip passes gradient 1 inside the range, but the function below is
        // flat there, so analytic and numerical disagree.
        let x = Tensor::from_vec(vec![0.5]);
        let wrong = |v: &Variable| {
            let flat = Variable::new(v.data().clone());
            ops::add(&ops::clip(v, 0.0, 1.0)?, &ops::neg(&flat)?)
        };
        assert!(!gradient_check(wrong, &x, GRAD_ATOL, GRAD_RTOL).unwrap());
    }

    #[test]
    fn test_max_grad_error() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0]);
        let b = Tensor::from_vec(vec![1.1, 2.0, 2.8]);
        assert!((max_grad_error(&a, &b) - 0.2).abs() < 1e-10);
    }
}
