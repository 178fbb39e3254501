//! Dense row-major tensor storage, construction, indexing and elementwise math.

use std::fmt;

use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::random::RandomSource;
use crate::shape::{Shape, Strides};

/// An n-dimensional array owning a flat row-major buffer.
///
/// Every operation returns a fresh tensor; only [`set`](Tensor::set),
/// [`add_at`](Tensor::add_at) and [`scatter_add`](Tensor::scatter_add) mutate
/// in place.
#[derive(Clone, PartialEq)]
pub struct Tensor<T: Element = f64> {
    shape: Shape,
    strides: Strides,
    data: Vec<T>,
}

impl<T: Element> Tensor<T> {
    /// Create a tensor, checking that `data` fills `shape` exactly.
    pub fn new(shape: impl Into<Shape>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                len: data.len(),
                shape,
            });
        }
        Ok(Self::from_parts(shape, data))
    }

    /// Unchecked constructor for kernels that size their buffers themselves.
    pub(crate) fn from_parts(shape: Shape, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), shape.numel());
        let strides = shape.contiguous_strides();
        Tensor {
            shape,
            strides,
            data,
        }
    }

    pub fn scalar(value: T) -> Self {
        Self::from_parts(Shape::scalar(), vec![value])
    }

    /// One-dimensional tensor over `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self::from_parts(Shape::new(vec![data.len()]), data)
    }

    /// Two-dimensional tensor from equally long rows.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(TensorError::Invalid(format!(
                "ragged rows: expected {cols} columns, found a row of {}",
                bad.len()
            )));
        }
        let data = rows.iter().flatten().copied().collect();
        Ok(Self::from_parts(Shape::new(vec![rows.len(), cols]), data))
    }

    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        let data = vec![value; shape.numel()];
        Self::from_parts(shape, data)
    }

    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::ZERO)
    }

    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::ONE)
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape.clone())
    }

    pub fn ones_like(&self) -> Self {
        Self::ones(self.shape.clone())
    }

    // === Accessors ===

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// The single value of a one-element tensor.
    pub fn item(&self) -> Result<T> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(TensorError::Invalid(format!(
                "item() requires exactly one element, tensor has shape {}",
                self.shape
            ))),
        }
    }

    // === Indexing ===

    pub fn ravel(&self, coord: &[usize]) -> Result<usize> {
        self.shape.ravel(coord)
    }

    pub fn unravel(&self, index: usize) -> Result<Vec<usize>> {
        self.shape.unravel(index)
    }

    pub fn at(&self, coord: &[usize]) -> Result<T> {
        Ok(self.data[self.ravel(coord)?])
    }

    pub fn set(&mut self, coord: &[usize], value: T) -> Result<()> {
        let i = self.ravel(coord)?;
        self.data[i] = value;
        Ok(())
    }

    /// `self[coord] += value`
    pub fn add_at(&mut self, coord: &[usize], value: T) -> Result<()> {
        let i = self.ravel(coord)?;
        self.data[i] = self.data[i] + value;
        Ok(())
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    // === Elementwise ===

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Self::from_parts(self.shape.clone(), self.data.iter().map(|&v| f(v)).collect())
    }

    /// Binary operation with broadcasting.
    pub fn zip_with<F>(&self, other: &Self, op: &'static str, f: F) -> Result<Self>
    where
        F: Fn(T, T) -> T,
    {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect();
            return Ok(Self::from_parts(self.shape.clone(), data));
        }
        let (a, b) = Self::broadcast(self, other, 0).map_err(|_| TensorError::ShapeMismatch {
            op,
            lhs: self.shape.clone(),
            rhs: other.shape.clone(),
        })?;
        let data = a.data.iter().zip(b.data.iter()).map(|(&x, &y)| f(x, y)).collect();
        Ok(Self::from_parts(a.shape, data))
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    pub fn neg(&self) -> Self {
        self.map(|v| -v)
    }

    pub fn add_c(&self, c: T) -> Self {
        self.map(|v| v + c)
    }

    pub fn sub_c(&self, c: T) -> Self {
        self.map(|v| v - c)
    }

    pub fn mul_c(&self, c: T) -> Self {
        self.map(|v| v * c)
    }

    pub fn div_c(&self, c: T) -> Self {
        self.map(|v| v / c)
    }

    /// `max(v, c)` elementwise.
    pub fn maximum_c(&self, c: T) -> Self {
        self.map(|v| if v > c { v } else { c })
    }

    // === Masks (1 where the predicate holds, else 0) ===

    pub fn gt_c(&self, c: T) -> Self {
        self.map(|v| if v > c { T::ONE } else { T::ZERO })
    }

    pub fn ge_c(&self, c: T) -> Self {
        self.map(|v| if v >= c { T::ONE } else { T::ZERO })
    }

    pub fn lt_c(&self, c: T) -> Self {
        self.map(|v| if v < c { T::ONE } else { T::ZERO })
    }

    pub fn le_c(&self, c: T) -> Self {
        self.map(|v| if v <= c { T::ONE } else { T::ZERO })
    }

    /// Elementwise equality mask.
    pub fn equal(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "equal", |a, b| if a == b { T::ONE } else { T::ZERO })
    }

    /// True when shapes and every element match.
    pub fn equal_all(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }

    // === Conversion ===

    pub fn to_f64(&self) -> Tensor<f64> {
        self.cast()
    }

    pub fn cast<U: Element>(&self) -> Tensor<U> {
        Tensor::from_parts(
            self.shape.clone(),
            self.data.iter().map(|v| U::from_f64(v.to_f64())).collect(),
        )
    }
}

impl Tensor<f64> {
    /// Uniform `[0, 1)` samples.
    pub fn rand(shape: impl Into<Shape>, src: &mut dyn RandomSource) -> Self {
        let shape = shape.into();
        let data = (0..shape.numel()).map(|_| src.uniform()).collect();
        Self::from_parts(shape, data)
    }

    /// Standard-normal samples.
    pub fn randn(shape: impl Into<Shape>, src: &mut dyn RandomSource) -> Self {
        let shape = shape.into();
        let data = (0..shape.numel()).map(|_| src.normal()).collect();
        Self::from_parts(shape, data)
    }

    /// `n` evenly spaced values over `[start, stop]`.
    pub fn linspace(start: f64, stop: f64, n: usize) -> Self {
        let step = if n > 1 {
            (stop - start) / (n - 1) as f64
        } else {
            0.0
        };
        Self::from_vec((0..n).map(|i| start + step * i as f64).collect())
    }

    /// One-hot rows for integer labels: shape `labels.shape + [classes]`.
    pub fn one_hot(labels: &Tensor<i64>, classes: usize) -> Result<Self> {
        let mut dims = labels.dims().to_vec();
        dims.push(classes);
        let mut out = vec![0.0; labels.numel() * classes];
        for (row, &label) in labels.as_slice().iter().enumerate() {
            if label < 0 || label as usize >= classes {
                return Err(TensorError::IndexOutOfRange {
                    index: vec![label.max(0) as usize],
                    shape: Shape::new(vec![classes]),
                });
            }
            out[row * classes + label as usize] = 1.0;
        }
        Ok(Self::from_parts(Shape::new(dims), out))
    }

    pub fn pow(&self, p: f64) -> Self {
        self.map(|v| v.powf(p))
    }

    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    pub fn log(&self) -> Self {
        self.map(f64::ln)
    }

    pub fn sin(&self) -> Self {
        self.map(f64::sin)
    }

    pub fn cos(&self) -> Self {
        self.map(f64::cos)
    }

    pub fn tanh(&self) -> Self {
        self.map(f64::tanh)
    }

    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn clip(&self, lo: f64, hi: f64) -> Self {
        self.map(|v| v.clamp(lo, hi))
    }

    /// Mask of `|a - b| < atol + rtol * |b|`, broadcasting.
    pub fn is_close(&self, other: &Self, atol: f64, rtol: f64) -> Result<Self> {
        self.zip_with(other, "is_close", |a, b| {
            if close(a, b, atol, rtol) {
                1.0
            } else {
                0.0
            }
        })
    }

    /// True when shapes match and every element is close.
    pub fn is_close_all(&self, other: &Self, atol: f64, rtol: f64) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(&a, &b)| close(a, b, atol, rtol))
    }
}

/// Default absolute tolerance for [`Tensor::is_close`].
pub const DEFAULT_ATOL: f64 = 1e-8;
/// Default relative tolerance for [`Tensor::is_close`].
pub const DEFAULT_RTOL: f64 = 1e-5;

fn close(a: f64, b: f64, atol: f64, rtol: f64) -> bool {
    a == b || (a - b).abs() < atol + rtol * b.abs()
}

impl<T: Element> From<T> for Tensor<T> {
    fn from(value: T) -> Self {
        Tensor::scalar(value)
    }
}

impl<T: Element> From<Vec<T>> for Tensor<T> {
    fn from(data: Vec<T>) -> Self {
        Tensor::from_vec(data)
    }
}

impl<T: Element> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Element> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shape.is_scalar() {
            return write!(f, "{}", self.data[0]);
        }
        write_nested(f, self.dims(), &self.data)
    }
}

fn write_nested<T: Element>(f: &mut fmt::Formatter<'_>, dims: &[usize], data: &[T]) -> fmt::Result {
    write!(f, "[")?;
    match dims {
        [] => {}
        [_] => {
            for (i, v) in data.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{v}")?;
            }
        }
        [n, rest @ ..] => {
            let chunk: usize = rest.iter().product();
            for i in 0..*n {
                if i > 0 {
                    write!(f, " ")?;
                }
                write_nested(f, rest, &data[i * chunk..(i + 1) * chunk])?;
            }
        }
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::StdRandom;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_checks_length() {
        assert!(Tensor::new([2, 3], vec![0.0; 6]).is_ok());
        assert!(matches!(
            Tensor::new([2, 3], vec![0.0; 5]),
            Err(TensorError::DataLength { len: 5, .. })
        ));
    }

    #[test]
    fn test_strides_follow_shape() {
        let t = Tensor::<f64>::zeros([2, 3, 4]);
        assert_eq!(t.strides().as_slice(), &[12, 4, 1]);
        assert_eq!(t.numel(), 24);
    }

    #[test]
    fn test_at_set_add_at() {
        let mut t = Tensor::<i64>::zeros([2, 2]);
        t.set(&[1, 0], 5).unwrap();
        t.add_at(&[1, 0], 2).unwrap();
        assert_eq!(t.at(&[1, 0]).unwrap(), 7);
        assert_eq!(t.as_slice(), &[0, 0, 7, 0]);
        assert!(t.at(&[2, 0]).is_err());
        assert!(t.set(&[0], 1).is_err());
    }

    #[test]
    fn test_broadcast_binary_ops() {
        let a = Tensor::new([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = Tensor::from_vec(vec![10.0, 20.0, 30.0]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.as_slice(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let col = Tensor::new([2, 1], vec![1.0, 2.0]).unwrap();
        let d = a.mul(&col).unwrap();
        assert_eq!(d.as_slice(), &[1.0, 2.0, 3.0, 8.0, 10.0, 12.0]);

        let bad = Tensor::from_vec(vec![1.0, 2.0]);
        assert!(matches!(a.sub(&bad), Err(TensorError::ShapeMismatch { op: "sub", .. })));
    }

    #[test]
    fn test_scalar_constants() {
        let t = Tensor::from_vec(vec![1.0, -2.0]);
        assert_eq!(t.add_c(1.0).as_slice(), &[2.0, -1.0]);
        assert_eq!(t.mul_c(3.0).as_slice(), &[3.0, -6.0]);
        assert_eq!(t.sub_c(1.0).as_slice(), &[0.0, -3.0]);
        assert_eq!(t.maximum_c(0.0).as_slice(), &[1.0, 0.0]);
        assert_eq!(t.pow(2.0).as_slice(), &[1.0, 4.0]);
    }

    #[test]
    fn test_is_close() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0]);
        let b = Tensor::from_vec(vec![1.0 + 1e-9, 2.1, 3.0]);
        let mask = a.is_close(&b, DEFAULT_ATOL, DEFAULT_RTOL).unwrap();
        assert_eq!(mask.as_slice(), &[1.0, 0.0, 1.0]);
        assert!(!a.is_close_all(&b, DEFAULT_ATOL, DEFAULT_RTOL));
        assert!(a.is_close_all(&a, DEFAULT_ATOL, DEFAULT_RTOL));
        assert!(a.equal_all(&a.clone()));
    }

    #[test]
    fn test_one_hot() {
        let labels = Tensor::<i64>::from_vec(vec![2, 0]);
        let oh = Tensor::one_hot(&labels, 3).unwrap();
        assert_eq!(oh.dims(), &[2, 3]);
        assert_eq!(oh.as_slice(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(Tensor::one_hot(&Tensor::<i64>::from_vec(vec![3]), 3).is_err());
    }

    #[test]
    fn test_rand_shapes() {
        let mut src = StdRandom::seeded(0);
        let r = Tensor::rand([3, 4], &mut src);
        assert_eq!(r.dims(), &[3, 4]);
        assert!(r.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
        let n = Tensor::randn([2], &mut src);
        assert_eq!(n.numel(), 2);
    }

    #[test]
    fn test_linspace() {
        let t = Tensor::linspace(0.0, 1.0, 5);
        assert_abs_diff_eq!(t.as_slice()[1], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(t.as_slice()[4], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_display() {
        let t = Tensor::new([2, 2], vec![1i64, 2, 3, 4]).unwrap();
        assert_eq!(t.to_string(), "[[1 2] [3 4]]");
        assert_eq!(Tensor::scalar(5i64).to_string(), "5");
    }

    #[test]
    fn test_item() {
        assert_eq!(Tensor::scalar(3.0).item().unwrap(), 3.0);
        assert_eq!(Tensor::new([1, 1], vec![2.0]).unwrap().item().unwrap(), 2.0);
        assert!(Tensor::from_vec(vec![1.0, 2.0]).item().is_err());
    }

    #[test]
    fn test_from_rows() {
        let t = Tensor::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(t.dims(), &[2, 2]);
        assert!(Tensor::from_rows(&[vec![1.0], vec![3.0, 4.0]]).is_err());
    }
}
