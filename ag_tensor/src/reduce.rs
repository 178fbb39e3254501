//! Reductions along axis sets.

use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::shape::{Coords, Shape};
use crate::tensor::Tensor;

impl<T: Element> Tensor<T> {
    /// Reduction over `axes` (empty = all axes).
    fn reduce<F>(&self, axes: &[isize], keepdims: bool, init: T, op: F) -> Result<Self>
    where
        F: Fn(T, T) -> T,
    {
        let reduce_axes = self.shape().normalize_axes(axes)?;
        let out_shape = reduced_shape(self.shape(), &reduce_axes, keepdims);
        let out_strides = self.shape().keepdims(&reduce_axes).contiguous_strides();

        let mut data = vec![init; out_shape.numel()];
        for (flat, coord) in Coords::new(self.shape()).enumerate() {
            // Reduced axes collapse to index 0 in the keep-dims layout
            let out_flat: usize = coord
                .iter()
                .enumerate()
                .filter(|(i, _)| !reduce_axes.contains(i))
                .map(|(i, &c)| c * out_strides.0[i])
                .sum();
            data[out_flat] = op(data[out_flat], self.as_slice()[flat]);
        }
        Ok(Tensor::from_parts(out_shape, data))
    }

    pub fn sum(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        self.reduce(axes, keepdims, T::ZERO, |acc, v| acc + v)
    }

    pub fn max(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        self.reduce(axes, keepdims, T::MIN, |acc, v| if v > acc { v } else { acc })
    }

    pub fn min(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        self.reduce(axes, keepdims, T::MAX, |acc, v| if v < acc { v } else { acc })
    }

    /// Index of the largest element along `axis`; ties resolve to the first.
    pub fn argmax(&self, axis: isize) -> Result<Tensor<i64>> {
        self.arg_reduce(axis, |v, best| v > best)
    }

    /// Index of the smallest element along `axis`; ties resolve to the first.
    pub fn argmin(&self, axis: isize) -> Result<Tensor<i64>> {
        self.arg_reduce(axis, |v, best| v < best)
    }

    fn arg_reduce<F>(&self, axis: isize, better: F) -> Result<Tensor<i64>>
    where
        F: Fn(T, T) -> bool,
    {
        let axis = self.shape().normalize_axis(axis)?;
        let dims = self.dims();
        let n = dims[axis];
        if n == 0 {
            return Err(TensorError::Invalid(format!(
                "cannot take arg-extremum along empty axis {axis}"
            )));
        }
        let outer: usize = dims[..axis].iter().product();
        let inner: usize = dims[axis + 1..].iter().product();
        let data = self.as_slice();

        let mut out = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            for i in 0..inner {
                let base = o * n * inner + i;
                let mut best = 0usize;
                for k in 1..n {
                    if better(data[base + k * inner], data[base + best * inner]) {
                        best = k;
                    }
                }
                out.push(best as i64);
            }
        }
        let out_shape = reduced_shape(self.shape(), &[axis], false);
        Ok(Tensor::from_parts(out_shape, out))
    }

    /// Number of elements folded together when reducing `axes`.
    pub fn reduced_count(&self, axes: &[isize]) -> Result<usize> {
        let axes = self.shape().normalize_axes(axes)?;
        Ok(axes.iter().map(|&a| self.dims()[a]).product())
    }
}

impl Tensor<f64> {
    pub fn mean(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        let count = self.reduced_count(axes)? as f64;
        Ok(self.sum(axes, keepdims)?.div_c(count))
    }

    /// Population variance `mean((x - mean(x))^2)`.
    pub fn variance(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        let mu = self.mean(axes, true)?;
        let centered = self.sub(&mu)?;
        centered.mul(&centered)?.mean(axes, keepdims)
    }

    pub fn std(&self, axes: &[isize], keepdims: bool) -> Result<Self> {
        Ok(self.variance(axes, keepdims)?.sqrt())
    }
}

fn reduced_shape(shape: &Shape, axes: &[usize], keepdims: bool) -> Shape {
    if keepdims {
        return shape.keepdims(axes);
    }
    Shape::new(
        shape
            .dims()
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, &d)| d)
            .collect(),
    )
}
