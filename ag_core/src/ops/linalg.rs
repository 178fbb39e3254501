//! Matrix products.

use ag_tensor::Tensor;

use super::{sum_to, transpose};
use crate::error::{Error, Result};
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

/// Swap the last two axes of a variable.
fn mt(x: &Variable) -> Result<Variable> {
    let n = x.num_dims();
    if n < 2 {
        return Err(ag_tensor::TensorError::Rank {
            op: "matmul",
            expected: ">= 2".into(),
            got: n,
        }
        .into());
    }
    let mut axes: Vec<isize> = (0..n as isize).collect();
    axes.swap(n - 2, n - 1);
    transpose(x, &axes)
}

/// Batched matrix product; leading axes broadcast.
#[derive(Debug, Default)]
pub struct MatMul;

impl Forwarder for MatMul {
    fn name(&self) -> &'static str {
        "MatMul"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x, w] = super::inputs("MatMul", xs)?;
        Ok(vec![x.matmul(w)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (x, w, gy) = (&xs[0], &xs[1], &gys[0]);
        let gx = matmul(gy, &mt(w)?)?;
        let gw = matmul(&mt(x)?, gy)?;
        Ok(vec![sum_to(&gx, x.shape())?, sum_to(&gw, w.shape())?])
    }
}

/// Affine map `x @ w + b` as a single graph node.
#[derive(Debug, Default)]
pub struct Linear;

impl Forwarder for Linear {
    fn name(&self) -> &'static str {
        "Linear"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        match xs {
            [x, w] => Ok(vec![x.matmul(w)?]),
            [x, w, b] => Ok(vec![x.matmul(w)?.add(b)?]),
            _ => Err(Error::Arity {
                op: "Linear",
                expected: 3,
                got: xs.len(),
            }),
        }
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let (x, w, gy) = (&xs[0], &xs[1], &gys[0]);
        let gx = sum_to(&matmul(gy, &mt(w)?)?, x.shape())?;
        let gw = sum_to(&matmul(&mt(x)?, gy)?, w.shape())?;
        let mut gxs = vec![gx, gw];
        if let Some(b) = xs.get(2) {
            gxs.push(sum_to(gy, b.shape())?);
        }
        Ok(gxs)
    }
}

pub fn matmul(x: &Variable, w: &Variable) -> Result<Variable> {
    Function::apply_one(MatMul, &[x.clone(), w.clone()])
}

pub fn linear(x: &Variable, w: &Variable, b: Option<&Variable>) -> Result<Variable> {
    let mut args = vec![x.clone(), w.clone()];
    args.extend(b.cloned());
    Function::apply_one(Linear, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{add, sum};
    use crate::BackwardOptions;

    fn seq(dims: &[usize], start: f64) -> Variable {
        let n: usize = dims.iter().product();
        Variable::new(Tensor::new(dims, (0..n).map(|v| start + v as f64).collect()).unwrap())
    }

    #[test]
    fn test_matmul_values() {
        let a = Variable::new_of(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let b = Variable::new_of(&[vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap();
        let c = matmul(&a, &b).unwrap();
        assert_eq!(c.data().as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_grad_shapes() {
        let x = seq(&[2, 3], 0.0);
        let w = seq(&[3, 4], 1.0);
        let y = matmul(&x, &w).unwrap();
        assert_eq!(y.dims(), vec![2, 4]);
        sum(&y, &[], false).unwrap().backward(BackwardOptions::default()).unwrap();
        assert_eq!(x.grad().unwrap().dims(), vec![2, 3]);
        assert_eq!(w.grad().unwrap().dims(), vec![3, 4]);
        // gx[i, k] = sum_j w[k, j]
        assert_eq!(x.grad().unwrap().at(&[0, 0]).unwrap(), 1.0 + 2.0 + 3.0 + 4.0);
        // gw[k, j] = sum_i x[i, k]
        assert_eq!(w.grad().unwrap().at(&[1, 0]).unwrap(), 1.0 + 4.0);
    }

    #[test]
    fn test_batched_matmul_sums_broadcast_grad() {
        let x = seq(&[2, 3, 4], 0.0);
        let w = seq(&[4, 5], 0.0);
        let y = matmul(&x, &w).unwrap();
        assert_eq!(y.dims(), vec![2, 3, 5]);
        sum(&y, &[], false).unwrap().backward(BackwardOptions::default()).unwrap();
        assert_eq!(w.grad().unwrap().dims(), vec![4, 5]);
    }

    #[test]
    fn test_matmul_inner_mismatch() {
        let x = seq(&[2, 3], 0.0);
        let w = seq(&[2, 3], 0.0);
        assert!(matmul(&x, &w).is_err());
    }

    #[test]
    fn test_linear_matches_matmul_plus_bias() {
        let x = seq(&[2, 3], 0.0);
        let w = seq(&[3, 2], 0.5);
        let b = Variable::new(vec![0.1, -0.2]);
        let y = linear(&x, &w, Some(&b)).unwrap();
        let expected = add(&matmul(&x, &w).unwrap(), &b).unwrap();
        assert_eq!(y.data().as_slice(), expected.data().as_slice());

        sum(&y, &[], false).unwrap().backward(BackwardOptions::default()).unwrap();
        assert_eq!(b.grad().unwrap().data().as_slice(), &[2.0, 2.0]);
        assert_eq!(w.grad().unwrap().dims(), vec![3, 2]);
    }

    #[test]
    fn test_linear_without_bias() {
        let x = seq(&[1, 2], 1.0);
        let w = seq(&[2, 1], 1.0);
        let y = linear(&x, &w, None).unwrap();
        assert_eq!(y.item().unwrap(), 1.0 * 1.0 + 2.0 * 2.0);
    }
}
