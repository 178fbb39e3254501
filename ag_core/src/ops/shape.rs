//! Shape manipulation: reshape, transpose, concat, split and indexing.

use ag_tensor::{Shape, Tensor};

use super::inputs;
use crate::error::{Error, Result};
use crate::function::{Forwarder, Function};
use crate::variable::Variable;

#[derive(Debug)]
pub struct Reshape {
    shape: Shape,
}

impl Forwarder for Reshape {
    fn name(&self) -> &'static str {
        "Reshape"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Reshape", xs)?;
        Ok(vec![x.reshape(self.shape.clone())?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![reshape(&gys[0], xs[0].shape())?])
    }
}

/// Axis permutation. An empty `axes` reverses every axis.
#[derive(Debug)]
pub struct Transpose {
    axes: Vec<isize>,
    perm: Vec<usize>,
}

impl Forwarder for Transpose {
    fn name(&self) -> &'static str {
        "Transpose"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Transpose", xs)?;
        let y = x.transpose(&self.axes)?;
        self.perm = if self.axes.is_empty() {
            (0..x.ndim()).rev().collect()
        } else {
            x.shape().normalize_axes(&self.axes)?
        };
        Ok(vec![y])
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let mut inverse = vec![0isize; self.perm.len()];
        for (i, &p) in self.perm.iter().enumerate() {
            inverse[p] = i as isize;
        }
        Ok(vec![transpose(&gys[0], &inverse)?])
    }
}

/// Join inputs along `axis`.
#[derive(Debug)]
pub struct Concat {
    axis: isize,
    sizes: Vec<usize>,
}

impl Forwarder for Concat {
    fn name(&self) -> &'static str {
        "Concat"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let y = Tensor::concat(xs, self.axis)?;
        let axis = y.shape().normalize_axis(self.axis)?;
        self.sizes = xs.iter().map(|x| x.dims()[axis]).collect();
        Ok(vec![y])
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        split(&gys[0], &self.sizes, self.axis)
    }
}

/// Cut the input along `axis` into consecutive pieces of `sizes`.
#[derive(Debug)]
pub struct Split {
    sizes: Vec<usize>,
    axis: isize,
}

impl Forwarder for Split {
    fn name(&self) -> &'static str {
        "Split"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("Split", xs)?;
        Ok(x.split(&self.sizes, self.axis)?)
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![concat(gys, self.axis)?])
    }
}

/// Select the slices at `indices` along `axis`.
#[derive(Debug)]
pub struct GetItem {
    indices: Vec<usize>,
    axis: isize,
}

impl Forwarder for GetItem {
    fn name(&self) -> &'static str {
        "GetItem"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [x] = inputs("GetItem", xs)?;
        Ok(vec![x.take(&self.indices, self.axis)?])
    }

    fn backward(&self, xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        let op = GetItemGrad {
            indices: self.indices.clone(),
            axis: self.axis,
            in_shape: xs[0].shape(),
        };
        Ok(vec![Function::apply_one(op, &[gys[0].clone()])?])
    }
}

/// Scatter-add of a slice gradient into zeros of the source shape.
#[derive(Debug)]
pub struct GetItemGrad {
    indices: Vec<usize>,
    axis: isize,
    in_shape: Shape,
}

impl Forwarder for GetItemGrad {
    fn name(&self) -> &'static str {
        "GetItemGrad"
    }

    fn forward(&mut self, xs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let [gy] = inputs("GetItemGrad", xs)?;
        let mut gx = Tensor::zeros(self.in_shape.clone());
        gx.scatter_add(gy, &self.indices, self.axis)?;
        Ok(vec![gx])
    }

    fn backward(&self, _xs: &[Variable], _ys: &[Variable], gys: &[Variable]) -> Result<Vec<Variable>> {
        Ok(vec![get_item(&gys[0], &self.indices, self.axis)?])
    }
}

/// View `x` with a new shape of the same size; a no-op when unchanged.
pub fn reshape(x: &Variable, shape: impl Into<Shape>) -> Result<Variable> {
    let shape = shape.into();
    if x.shape() == shape {
        return Ok(x.clone());
    }
    Function::apply_one(Reshape { shape }, &[x.clone()])
}

pub fn transpose(x: &Variable, axes: &[isize]) -> Result<Variable> {
    let op = Transpose {
        axes: axes.to_vec(),
        perm: Vec::new(),
    };
    Function::apply_one(op, &[x.clone()])
}

pub fn concat(xs: &[Variable], axis: isize) -> Result<Variable> {
    if xs.is_empty() {
        return Err(Error::config("concat needs at least one input"));
    }
    let op = Concat {
        axis,
        sizes: Vec::new(),
    };
    Function::apply_one(op, xs)
}

pub fn split(x: &Variable, sizes: &[usize], axis: isize) -> Result<Vec<Variable>> {
    let op = Split {
        sizes: sizes.to_vec(),
        axis,
    };
    Function::apply(op, &[x.clone()])
}

pub fn get_item(x: &Variable, indices: &[usize], axis: isize) -> Result<Variable> {
    let op = GetItem {
        indices: indices.to_vec(),
        axis,
    };
    Function::apply_one(op, &[x.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{mul, sum};
    use crate::BackwardOptions;

    fn arange(dims: &[usize]) -> Variable {
        let n: usize = dims.iter().product();
        Variable::new(Tensor::new(dims, (0..n).map(|v| v as f64).collect()).unwrap())
    }

    fn grad_vec(x: &Variable) -> Vec<f64> {
        x.grad().unwrap().data().as_slice().to_vec()
    }

    #[test]
    fn test_reshape_keeps_data() {
        let x = arange(&[2, 3]);
        let y = reshape(&x, [3, 2]).unwrap();
        assert_eq!(y.dims(), vec![3, 2]);
        assert_eq!(y.data().as_slice(), x.data().as_slice());
        y.backward(BackwardOptions::default()).unwrap();
        assert_eq!(x.grad().unwrap().dims(), vec![2, 3]);
        assert!(reshape(&x, [4]).is_err());
    }

    #[test]
    fn test_transpose_grad_inverse_permutation() {
        let x = arange(&[2, 3, 4]);
        let y = transpose(&x, &[1, 2, 0]).unwrap();
        assert_eq!(y.dims(), vec![3, 4, 2]);
        let w = arange(&[3, 4, 2]);
        sum(&mul(&y, &w).unwrap(), &[], false)
            .unwrap()
            .backward(BackwardOptions::default())
            .unwrap();
        let g = x.grad().unwrap();
        assert_eq!(g.dims(), vec![2, 3, 4]);
        // gx[i, j, k] = w[j, k, i]
        assert_eq!(g.at(&[1, 2, 3]).unwrap(), w.at(&[2, 3, 1]).unwrap());
    }

    #[test]
    fn test_t_reverses_axes() {
        let x = arange(&[2, 3]);
        let y = x.t().unwrap();
        assert_eq!(y.dims(), vec![3, 2]);
        assert_eq!(y.at(&[2, 1]).unwrap(), 5.0);
    }

    #[test]
    fn test_concat_split_grads() {
        let a = arange(&[2, 2]);
        let b = arange(&[2, 1]);
        let c = concat(&[a.clone(), b.clone()], 1).unwrap();
        assert_eq!(c.dims(), vec![2, 3]);
        let w = Variable::new(Tensor::new([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap());
        sum(&mul(&c, &w).unwrap(), &[], false)
            .unwrap()
            .backward(BackwardOptions::default())
            .unwrap();
        assert_eq!(grad_vec(&a), vec![1.0, 2.0, 4.0, 5.0]);
        assert_eq!(grad_vec(&b), vec![3.0, 6.0]);
        assert!(concat(&[], 0).is_err());
    }

    #[test]
    fn test_split_unused_piece_gets_zeros() {
        let x = arange(&[5]);
        let parts = split(&x, &[2, 3], 0).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].data().as_slice(), &[2.0, 3.0, 4.0]);
        sum(&parts[0], &[], false)
            .unwrap()
            .backward(BackwardOptions::default())
            .unwrap();
        assert_eq!(grad_vec(&x), vec![1.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(split(&x, &[2, 2], 0).is_err());
    }

    #[test]
    fn test_get_item_scatters_repeated_indices() {
        let x = arange(&[3, 2]);
        let y = get_item(&x, &[0, 2, 0], 0).unwrap();
        assert_eq!(y.dims(), vec![3, 2]);
        assert_eq!(y.data().as_slice(), &[0.0, 1.0, 4.0, 5.0, 0.0, 1.0]);
        y.backward(BackwardOptions::default()).unwrap();
        assert_eq!(grad_vec(&x), vec![2.0, 2.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_get_item_along_last_axis() {
        let x = arange(&[2, 3]);
        let y = x.get_item(&[2], -1).unwrap();
        assert_eq!(y.data().as_slice(), &[2.0, 5.0]);
        y.backward(BackwardOptions::default()).unwrap();
        assert_eq!(grad_vec(&x), vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(x.get_item(&[3], 1).is_err());
    }
}
