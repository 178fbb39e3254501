//! Shape manipulation: reshape, permutation, broadcasting, joining and gathering.

use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::shape::{normalize_axis, Coords, Shape};
use crate::tensor::Tensor;

/// Split `dims` around `axis` into (outer, axis size, inner) element counts.
fn split_at_axis(dims: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = dims[..axis].iter().product();
    let inner = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

impl<T: Element> Tensor<T> {
    /// Size-preserving reshape.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if shape.numel() != self.numel() {
            return Err(TensorError::ReshapeSize {
                from: self.shape().clone(),
                to: shape,
            });
        }
        Ok(Tensor::from_parts(shape, self.as_slice().to_vec()))
    }

    pub fn flatten(&self) -> Self {
        Tensor::from_vec(self.as_slice().to_vec())
    }

    /// Drop size-1 axes. With no axes given, every size-1 axis is dropped;
    /// naming a non-singleton axis is an error.
    pub fn squeeze(&self, axes: &[isize]) -> Result<Self> {
        let dims = self.dims();
        let drop: Vec<usize> = if axes.is_empty() {
            (0..dims.len()).filter(|&i| dims[i] == 1).collect()
        } else {
            let axes = self.shape().normalize_axes(axes)?;
            if let Some(&a) = axes.iter().find(|&&a| dims[a] != 1) {
                return Err(TensorError::NotSingleton { axis: a, dim: dims[a] });
            }
            axes
        };
        let kept: Vec<usize> = (0..dims.len())
            .filter(|i| !drop.contains(i))
            .map(|i| dims[i])
            .collect();
        self.reshape(kept)
    }

    /// Insert a size-1 axis at `axis` (may equal the rank to append).
    pub fn expand(&self, axis: isize) -> Result<Self> {
        let axis = normalize_axis(axis, self.ndim() + 1)?;
        let mut dims = self.dims().to_vec();
        dims.insert(axis, 1);
        self.reshape(dims)
    }

    /// Permute axes; with no axes given the order is reversed.
    pub fn transpose(&self, axes: &[isize]) -> Result<Self> {
        let ndim = self.ndim();
        let perm: Vec<usize> = if axes.is_empty() {
            (0..ndim).rev().collect()
        } else {
            if axes.len() != ndim {
                return Err(TensorError::Rank {
                    op: "transpose",
                    expected: format!("{ndim} axes"),
                    got: axes.len(),
                });
            }
            self.shape().normalize_axes(axes)?
        };
        if ndim < 2 {
            return Ok(self.clone());
        }

        let new_shape = Shape::new(perm.iter().map(|&i| self.dims()[i]).collect());
        let src_strides = self.strides();
        let data = Coords::new(&new_shape)
            .map(|out| {
                let src: usize = out
                    .iter()
                    .zip(perm.iter())
                    .map(|(&c, &p)| c * src_strides.0[p])
                    .sum();
                self.as_slice()[src]
            })
            .collect();
        Ok(Tensor::from_parts(new_shape, data))
    }

    /// Swap the last two axes.
    pub fn transpose_last2(&self) -> Result<Self> {
        let ndim = self.ndim();
        if ndim < 2 {
            return Err(TensorError::Rank {
                op: "transpose_last2",
                expected: ">= 2".into(),
                got: ndim,
            });
        }
        let mut axes: Vec<isize> = (0..ndim as isize).collect();
        axes.swap(ndim - 2, ndim - 1);
        self.transpose(&axes)
    }

    /// Reverse element order along `axes` (empty = all axes).
    pub fn flip(&self, axes: &[isize]) -> Result<Self> {
        let axes = self.shape().normalize_axes(axes)?;
        let dims = self.dims();
        let strides = self.strides();
        let data = Coords::new(self.shape())
            .map(|out| {
                let src: usize = out
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| {
                        let c = if axes.contains(&i) { dims[i] - 1 - c } else { c };
                        c * strides.0[i]
                    })
                    .sum();
                self.as_slice()[src]
            })
            .collect();
        Ok(Tensor::from_parts(self.shape().clone(), data))
    }

    /// Repeat the whole tensor `n` times along `axis`.
    pub fn tile(&self, n: usize, axis: isize) -> Result<Self> {
        let copies: Vec<&Self> = std::iter::repeat(self).take(n).collect();
        if copies.is_empty() {
            let axis = self.shape().normalize_axis(axis)?;
            let mut dims = self.dims().to_vec();
            dims[axis] = 0;
            return Ok(Tensor::zeros(dims));
        }
        Self::concat(&copies, axis)
    }

    /// Zero everything above the `k`-th diagonal of the last two axes.
    pub fn tril(&self, k: isize) -> Result<Self> {
        let ndim = self.ndim();
        if ndim < 2 {
            return Err(TensorError::Rank {
                op: "tril",
                expected: ">= 2".into(),
                got: ndim,
            });
        }
        let data = Coords::new(self.shape())
            .zip(self.as_slice().iter())
            .map(|(c, &v)| {
                let (row, col) = (c[ndim - 2] as isize, c[ndim - 1] as isize);
                if col - row <= k {
                    v
                } else {
                    T::ZERO
                }
            })
            .collect();
        Ok(Tensor::from_parts(self.shape().clone(), data))
    }

    /// Join tensors along `axis`. All other dimensions must agree.
    pub fn concat(tensors: &[&Self], axis: isize) -> Result<Self> {
        let first = tensors
            .first()
            .ok_or_else(|| TensorError::Invalid("concat of an empty tensor list".into()))?;
        let axis = first.shape().normalize_axis(axis)?;

        let mut out_dims = first.dims().to_vec();
        out_dims[axis] = 0;
        for t in tensors {
            let compatible = t.ndim() == first.ndim()
                && t
                    .dims()
                    .iter()
                    .zip(first.dims())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(TensorError::ShapeMismatch {
                    op: "concat",
                    lhs: first.shape().clone(),
                    rhs: t.shape().clone(),
                });
            }
            out_dims[axis] += t.dims()[axis];
        }

        let (outer, _, inner) = split_at_axis(&out_dims, axis);
        let mut data = Vec::with_capacity(out_dims.iter().product());
        for o in 0..outer {
            for t in tensors {
                let block = t.dims()[axis] * inner;
                data.extend_from_slice(&t.as_slice()[o * block..(o + 1) * block]);
            }
        }
        Ok(Tensor::from_parts(Shape::new(out_dims), data))
    }

    /// Slice into consecutive pieces of the given sizes along `axis`.
    /// The sizes must add up to the axis length.
    pub fn split(&self, sizes: &[usize], axis: isize) -> Result<Vec<Self>> {
        let axis = self.shape().normalize_axis(axis)?;
        let dims = self.dims();
        if sizes.iter().sum::<usize>() != dims[axis] {
            return Err(TensorError::SplitSize {
                dim: dims[axis],
                sizes: sizes.to_vec(),
            });
        }
        let (outer, n, inner) = split_at_axis(dims, axis);

        let mut pieces = Vec::with_capacity(sizes.len());
        let mut offset = 0;
        for &size in sizes {
            let mut piece_dims = dims.to_vec();
            piece_dims[axis] = size;
            let mut data = Vec::with_capacity(outer * size * inner);
            for o in 0..outer {
                let start = (o * n + offset) * inner;
                data.extend_from_slice(&self.as_slice()[start..start + size * inner]);
            }
            pieces.push(Tensor::from_parts(Shape::new(piece_dims), data));
            offset += size;
        }
        Ok(pieces)
    }

    /// Split into `n` equal pieces along `axis`.
    pub fn chunk(&self, n: usize, axis: isize) -> Result<Vec<Self>> {
        let a = self.shape().normalize_axis(axis)?;
        let dim = self.dims()[a];
        if n == 0 || dim % n != 0 {
            return Err(TensorError::SplitSize {
                dim,
                sizes: vec![n],
            });
        }
        self.split(&vec![dim / n; n], axis)
    }

    /// Gather the slices at `indices` along `axis`.
    pub fn take(&self, indices: &[usize], axis: isize) -> Result<Self> {
        let axis = self.shape().normalize_axis(axis)?;
        let (outer, n, inner) = split_at_axis(self.dims(), axis);
        self.check_indices(indices, axis, n)?;

        let mut data = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &idx in indices {
                let start = (o * n + idx) * inner;
                data.extend_from_slice(&self.as_slice()[start..start + inner]);
            }
        }
        let mut dims = self.dims().to_vec();
        dims[axis] = indices.len();
        Ok(Tensor::from_parts(Shape::new(dims), data))
    }

    /// In-place `self[.., indices[i], ..] += src[.., i, ..]` along `axis`.
    /// Repeated indices accumulate.
    pub fn scatter_add(&mut self, src: &Self, indices: &[usize], axis: isize) -> Result<()> {
        let axis = self.shape().normalize_axis(axis)?;
        let (outer, n, inner) = split_at_axis(self.dims(), axis);
        self.check_indices(indices, axis, n)?;

        let mut expected = self.dims().to_vec();
        expected[axis] = indices.len();
        if src.dims() != expected.as_slice() {
            return Err(TensorError::ShapeMismatch {
                op: "scatter_add",
                lhs: Shape::new(expected),
                rhs: src.shape().clone(),
            });
        }

        let src_data = src.as_slice();
        let dst = self.data_mut();
        for o in 0..outer {
            for (i, &idx) in indices.iter().enumerate() {
                let from = (o * indices.len() + i) * inner;
                let to = (o * n + idx) * inner;
                for k in 0..inner {
                    dst[to + k] = dst[to + k] + src_data[from + k];
                }
            }
        }
        Ok(())
    }

    fn check_indices(&self, indices: &[usize], axis: usize, n: usize) -> Result<()> {
        match indices.iter().find(|&&i| i >= n) {
            Some(&bad) => {
                let mut index = vec![0; self.ndim()];
                index[axis] = bad;
                Err(TensorError::IndexOutOfRange {
                    index,
                    shape: self.shape().clone(),
                })
            }
            None => Ok(()),
        }
    }

    // === Broadcasting ===

    /// Broadcast two tensors against each other. Both are padded with
    /// leading 1s to the same rank, then size-1 axes are replicated to match.
    /// The trailing `keep_last` axes are left untouched (matmul uses 2).
    pub fn broadcast(v: &Self, w: &Self, keep_last: usize) -> Result<(Self, Self)> {
        let mismatch = || TensorError::ShapeMismatch {
            op: "broadcast",
            lhs: v.shape().clone(),
            rhs: w.shape().clone(),
        };
        if v.ndim() < keep_last || w.ndim() < keep_last {
            return Err(mismatch());
        }
        let ndim = v.ndim().max(w.ndim());
        let vp = v.shape().padded(ndim);
        let wp = w.shape().padded(ndim);

        let mut v_target = vp.dims().to_vec();
        let mut w_target = wp.dims().to_vec();
        for i in 0..ndim - keep_last {
            let (a, b) = (vp.dim(i), wp.dim(i));
            if a == b {
                continue;
            } else if a == 1 {
                v_target[i] = b;
            } else if b == 1 {
                w_target[i] = a;
            } else {
                return Err(mismatch());
            }
        }
        Ok((
            v.broadcast_to(Shape::new(v_target))?,
            w.broadcast_to(Shape::new(w_target))?,
        ))
    }

    /// Expand size-1 (or missing leading) axes to `shape`. Never reduces.
    pub fn broadcast_to(&self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if self.shape() == &shape {
            return Ok(self.clone());
        }
        let mismatch = || TensorError::ShapeMismatch {
            op: "broadcast_to",
            lhs: self.shape().clone(),
            rhs: shape.clone(),
        };
        if self.ndim() > shape.ndim() {
            return Err(mismatch());
        }
        let padded = self.shape().padded(shape.ndim());
        if padded
            .dims()
            .iter()
            .zip(shape.dims())
            .any(|(&a, &b)| a != b && a != 1)
        {
            return Err(mismatch());
        }

        let src_strides = padded.contiguous_strides();
        let data = Coords::new(&shape)
            .map(|out| {
                let src: usize = out
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| if padded.dim(i) == 1 { 0 } else { c * src_strides.0[i] })
                    .sum();
                self.as_slice()[src]
            })
            .collect();
        Ok(Tensor::from_parts(shape, data))
    }

    /// Sum along the axes that broadcasting to `self.shape()` would have
    /// expanded from `shape`, yielding a tensor of `shape`.
    pub fn sum_to(&self, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if self.shape() == &shape {
            return Ok(self.clone());
        }
        if shape.ndim() > self.ndim() || shape.broadcast_with(self.shape()).as_ref() != Some(self.shape()) {
            return Err(TensorError::ShapeMismatch {
                op: "sum_to",
                lhs: self.shape().clone(),
                rhs: shape,
            });
        }
        let axes: Vec<isize> = shape
            .reduction_axes_from(self.shape())
            .into_iter()
            .map(|a| a as isize)
            .collect();
        if axes.is_empty() {
            return self.reshape(shape);
        }
        self.sum(&axes, false)?.reshape(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(shape: &[usize]) -> Tensor {
        let n: usize = shape.iter().product();
        Tensor::new(shape, (0..n).map(|v| v as f64).collect()).unwrap()
    }

    #[test]
    fn test_reshape_and_flatten() {
        let t = arange(&[2, 3]);
        assert_eq!(t.reshape([3, 2]).unwrap().dims(), &[3, 2]);
        assert!(matches!(t.reshape([4]), Err(TensorError::ReshapeSize { .. })));
        assert_eq!(t.flatten().dims(), &[6]);
    }

    #[test]
    fn test_squeeze_expand() {
        let t = arange(&[1, 3, 1]);
        assert_eq!(t.squeeze(&[]).unwrap().dims(), &[3]);
        assert_eq!(t.squeeze(&[-1]).unwrap().dims(), &[1, 3]);
        assert!(matches!(t.squeeze(&[1]), Err(TensorError::NotSingleton { axis: 1, dim: 3 })));
        assert_eq!(t.expand(0).unwrap().dims(), &[1, 1, 3, 1]);
        assert_eq!(arange(&[2]).expand(1).unwrap().dims(), &[2, 1]);
    }

    #[test]
    fn test_transpose() {
        let t = arange(&[2, 3]);
        let tt = t.transpose(&[]).unwrap();
        assert_eq!(tt.dims(), &[3, 2]);
        assert_eq!(tt.as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);

        let c = arange(&[2, 3, 4]);
        let p = c.transpose(&[1, 2, 0]).unwrap();
        assert_eq!(p.dims(), &[3, 4, 2]);
        assert_eq!(p.at(&[2, 1, 1]).unwrap(), c.at(&[1, 2, 1]).unwrap());
        assert!(c.transpose(&[0, 0, 1]).is_err());
        assert!(c.transpose(&[0, 1]).is_err());
    }

    #[test]
    fn test_flip_tile_tril() {
        let t = arange(&[2, 2]);
        assert_eq!(t.flip(&[1]).unwrap().as_slice(), &[1.0, 0.0, 3.0, 2.0]);
        assert_eq!(t.flip(&[]).unwrap().as_slice(), &[3.0, 2.0, 1.0, 0.0]);
        let tiled = t.tile(2, 1).unwrap();
        assert_eq!(tiled.dims(), &[2, 4]);
        assert_eq!(tiled.as_slice(), &[0.0, 1.0, 0.0, 1.0, 2.0, 3.0, 2.0, 3.0]);
        let ones = Tensor::<f64>::ones([3, 3]);
        assert_eq!(
            ones.tril(0).unwrap().as_slice(),
            &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0]
        );
        assert_eq!(ones.tril(-1).unwrap().sum(&[], false).unwrap().item().unwrap(), 3.0);
    }

    #[test]
    fn test_concat_split() {
        let a = arange(&[2, 2]);
        let b = arange(&[2, 1]);
        let c = Tensor::concat(&[&a, &b], 1).unwrap();
        assert_eq!(c.dims(), &[2, 3]);
        assert_eq!(c.as_slice(), &[0.0, 1.0, 0.0, 2.0, 3.0, 1.0]);

        let parts = c.split(&[2, 1], 1).unwrap();
        assert!(parts[0].equal_all(&a));
        assert!(parts[1].equal_all(&b));
        assert!(matches!(c.split(&[2, 2], 1), Err(TensorError::SplitSize { .. })));
        assert!(c.chunk(2, 1).is_err());
        assert_eq!(c.chunk(3, 1).unwrap().len(), 3);
        assert!(Tensor::<f64>::concat(&[], 0).is_err());
        assert!(Tensor::concat(&[&a, &arange(&[3, 1])], 1).is_err());
    }

    #[test]
    fn test_take_and_scatter_add() {
        let t = arange(&[3, 2]);
        let g = t.take(&[2, 0, 2], 0).unwrap();
        assert_eq!(g.as_slice(), &[4.0, 5.0, 0.0, 1.0, 4.0, 5.0]);
        let cols = t.take(&[1], 1).unwrap();
        assert_eq!(cols.as_slice(), &[1.0, 3.0, 5.0]);
        assert!(t.take(&[3], 0).is_err());

        let mut acc = Tensor::<f64>::zeros([3, 2]);
        acc.scatter_add(&Tensor::ones([3, 2]), &[2, 0, 2], 0).unwrap();
        assert_eq!(acc.as_slice(), &[1.0, 1.0, 0.0, 0.0, 2.0, 2.0]);

        let mut bad = Tensor::<f64>::zeros([3, 2]);
        assert!(bad.scatter_add(&Tensor::ones([2, 2]), &[0], 0).is_err());
    }

    #[test]
    fn test_broadcast_pair() {
        let v = arange(&[3, 1]);
        let w = arange(&[4]);
        let (a, b) = Tensor::broadcast(&v, &w, 0).unwrap();
        assert_eq!(a.dims(), &[3, 4]);
        assert_eq!(b.dims(), &[3, 4]);

        let x = arange(&[2, 3, 4]);
        let m = arange(&[4, 5]);
        let (xb, mb) = Tensor::broadcast(&x, &m, 2).unwrap();
        assert_eq!(xb.dims(), &[2, 3, 4]);
        assert_eq!(mb.dims(), &[2, 4, 5]);
    }

    #[test]
    fn test_broadcast_to_and_sum_to() {
        let v = Tensor::from_vec(vec![1.0, 2.0]);
        let b = v.broadcast_to([3, 2]).unwrap();
        assert_eq!(b.as_slice(), &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        assert!(b.broadcast_to([2]).is_err());
        assert!(v.broadcast_to([3, 3]).is_err());

        let s = b.sum_to([2]).unwrap();
        assert_eq!(s.as_slice(), &[3.0, 6.0]);
        let k = b.sum_to([1, 2]).unwrap();
        assert_eq!(k.dims(), &[1, 2]);
        let all = b.sum_to(Shape::scalar()).unwrap();
        assert_eq!(all.item().unwrap(), 9.0);
        assert!(b.sum_to([4]).is_err());
    }
}
