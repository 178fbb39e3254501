//! Shape, stride and axis utilities.

use std::fmt;

use crate::error::{Result, TensorError};

/// A tensor shape. The empty shape is a scalar.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    pub fn scalar() -> Self {
        Shape(vec![])
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Get dimension at index.
    pub fn dim(&self, idx: usize) -> usize {
        self.0[idx]
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Total number of elements. A scalar holds one element.
    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Row-major strides: the last axis has stride 1.
    pub fn contiguous_strides(&self) -> Strides {
        let ndim = self.0.len();
        let mut strides = vec![1usize; ndim];
        for i in (0..ndim.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        Strides(strides)
    }

    /// Broadcast result of two shapes, aligning trailing axes.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let lhs = self.padded(ndim);
        let rhs = other.padded(ndim);

        let mut result = Vec::with_capacity(ndim);
        for (&d1, &d2) in lhs.0.iter().zip(rhs.0.iter()) {
            if d1 == d2 || d2 == 1 {
                result.push(d1);
            } else if d1 == 1 {
                result.push(d2);
            } else {
                return None;
            }
        }
        Some(Shape(result))
    }

    /// Left-pad with 1s up to `ndim` dimensions.
    pub fn padded(&self, ndim: usize) -> Shape {
        let mut dims = vec![1usize; ndim.saturating_sub(self.ndim())];
        dims.extend_from_slice(&self.0);
        Shape(dims)
    }

    /// Axes that were broadcast when going from `self` to `broadcast_shape`:
    /// leading axes `self` lacks, plus axes where `self` has size 1.
    pub fn reduction_axes_from(&self, broadcast_shape: &Shape) -> Vec<usize> {
        let offset = broadcast_shape.ndim().saturating_sub(self.ndim());
        let mut axes: Vec<usize> = (0..offset).collect();
        for i in 0..self.ndim() {
            if self.0[i] == 1 && broadcast_shape.0[offset + i] != 1 {
                axes.push(offset + i);
            }
        }
        axes
    }

    /// Normalise a possibly negative axis against this rank.
    pub fn normalize_axis(&self, axis: isize) -> Result<usize> {
        normalize_axis(axis, self.ndim())
    }

    /// Normalise an axis list. An empty list means every axis.
    pub fn normalize_axes(&self, axes: &[isize]) -> Result<Vec<usize>> {
        if axes.is_empty() {
            return Ok((0..self.ndim()).collect());
        }
        let mut seen = vec![false; self.ndim()];
        let mut out = Vec::with_capacity(axes.len());
        for &axis in axes {
            let a = self.normalize_axis(axis)?;
            if seen[a] {
                return Err(TensorError::DuplicateAxis { axis: a });
            }
            seen[a] = true;
            out.push(a);
        }
        Ok(out)
    }

    /// Shape with the given axes kept as size 1.
    pub fn keepdims(&self, axes: &[usize]) -> Shape {
        Shape(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &d)| if axes.contains(&i) { 1 } else { d })
                .collect(),
        )
    }

    /// Flat row-major index of a coordinate, with bounds checks.
    pub fn ravel(&self, coord: &[usize]) -> Result<usize> {
        if coord.len() != self.ndim() {
            return Err(TensorError::CoordLength {
                got: coord.len(),
                ndim: self.ndim(),
            });
        }
        if coord.iter().zip(self.0.iter()).any(|(&c, &d)| c >= d) {
            return Err(TensorError::IndexOutOfRange {
                index: coord.to_vec(),
                shape: self.clone(),
            });
        }
        Ok(self.contiguous_strides().index(coord))
    }

    /// Coordinate of a flat row-major index.
    pub fn unravel(&self, index: usize) -> Result<Vec<usize>> {
        if index >= self.numel() {
            return Err(TensorError::IndexOutOfRange {
                index: vec![index],
                shape: self.clone(),
            });
        }
        let mut coord = vec![0usize; self.ndim()];
        let mut remaining = index;
        for i in (0..self.ndim()).rev() {
            coord[i] = remaining % self.0[i];
            remaining /= self.0[i];
        }
        Ok(coord)
    }
}

pub(crate) fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    let a = if axis < 0 { axis + n } else { axis };
    if a < 0 || a >= n {
        return Err(TensorError::AxisOutOfRange { axis, ndim });
    }
    Ok(a as usize)
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Shape(v)
    }
}

impl From<&[usize]> for Shape {
    fn from(s: &[usize]) -> Self {
        Shape(s.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(s: [usize; N]) -> Self {
        Shape(s.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(s: &Shape) -> Self {
        s.clone()
    }
}

/// Tensor strides (step size in each dimension).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Strides(pub Vec<usize>);

impl Strides {
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Flat index of an in-range coordinate.
    pub fn index(&self, indices: &[usize]) -> usize {
        debug_assert_eq!(self.0.len(), indices.len());
        self.0.iter().zip(indices.iter()).map(|(s, i)| s * i).sum()
    }
}

/// Odometer over every coordinate of a shape in row-major order.
pub struct Coords<'a> {
    shape: &'a Shape,
    current: Vec<usize>,
    done: bool,
}

impl<'a> Coords<'a> {
    pub fn new(shape: &'a Shape) -> Self {
        Coords {
            shape,
            current: vec![0; shape.ndim()],
            done: shape.numel() == 0,
        }
    }
}

impl Iterator for Coords<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.current.clone();

        // Increment rightmost first
        let mut i = self.shape.ndim();
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            self.current[i] += 1;
            if self.current[i] < self.shape.dim(i) {
                break;
            }
            self.current[i] = 0;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.dim(1), 3);
        assert_eq!(s.numel(), 24);
        assert!(!s.is_scalar());
        assert_eq!(Shape::scalar().numel(), 1);
    }

    #[test]
    fn test_contiguous_strides() {
        assert_eq!(Shape::from([2, 3, 4]).contiguous_strides().0, vec![12, 4, 1]);
        assert_eq!(Shape::from([5]).contiguous_strides().0, vec![1]);
        assert!(Shape::scalar().contiguous_strides().0.is_empty());
    }

    #[test]
    fn test_broadcast_with() {
        let a = Shape::from([1, 4]);
        let b = Shape::from([3, 1]);
        assert_eq!(a.broadcast_with(&b), Some(Shape::from([3, 4])));
        assert_eq!(
            Shape::from([3, 4]).broadcast_with(&Shape::from([2, 3, 4])),
            Some(Shape::from([2, 3, 4]))
        );
        assert_eq!(Shape::from([2, 3]).broadcast_with(&Shape::from([2, 4])), None);
        assert_eq!(Shape::scalar().broadcast_with(&Shape::from([2])), Some(Shape::from([2])));
    }

    #[test]
    fn test_reduction_axes() {
        assert_eq!(Shape::from([1, 4]).reduction_axes_from(&Shape::from([3, 4])), vec![0]);
        assert_eq!(Shape::from([4]).reduction_axes_from(&Shape::from([2, 3, 4])), vec![0, 1]);
    }

    #[test]
    fn test_normalize_axes() {
        let s = Shape::from([2, 3, 4]);
        assert_eq!(s.normalize_axis(-1).unwrap(), 2);
        assert_eq!(s.normalize_axes(&[]).unwrap(), vec![0, 1, 2]);
        assert!(matches!(s.normalize_axis(3), Err(TensorError::AxisOutOfRange { .. })));
        assert!(matches!(
            s.normalize_axes(&[0, -3]),
            Err(TensorError::DuplicateAxis { axis: 0 })
        ));
    }

    #[test]
    fn test_ravel_unravel() {
        let s = Shape::from([2, 3, 4]);
        assert_eq!(s.ravel(&[1, 2, 3]).unwrap(), 12 + 8 + 3);
        assert_eq!(s.unravel(23).unwrap(), vec![1, 2, 3]);
        assert!(matches!(s.ravel(&[1, 2]), Err(TensorError::CoordLength { got: 2, ndim: 3 })));
        assert!(matches!(s.ravel(&[2, 0, 0]), Err(TensorError::IndexOutOfRange { .. })));
        assert!(s.unravel(24).is_err());
    }

    #[test]
    fn test_coords_order() {
        let s = Shape::from([2, 2]);
        let all: Vec<_> = Coords::new(&s).collect();
        assert_eq!(all, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(Coords::new(&Shape::scalar()).count(), 1);
        assert_eq!(Coords::new(&Shape::from([0, 3])).count(), 0);
    }
}
