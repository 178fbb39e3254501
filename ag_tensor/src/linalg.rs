//! Batched matrix multiplication.

use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

impl<T: Element> Tensor<T> {
    /// Batched matrix product `(..., M, K) @ (..., K, N) -> (..., M, N)`.
    ///
    /// Batch axes broadcast against each other; the last two axes of both
    /// operands are matrices.
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        for t in [self, other] {
            if t.ndim() < 2 {
                return Err(TensorError::Rank {
                    op: "matmul",
                    expected: ">= 2".into(),
                    got: t.ndim(),
                });
            }
        }
        let (a, b) = Tensor::broadcast(self, other, 2).map_err(|_| TensorError::MatMul {
            lhs: self.shape().clone(),
            rhs: other.shape().clone(),
        })?;

        let ndim = a.ndim();
        let (m, k) = (a.dims()[ndim - 2], a.dims()[ndim - 1]);
        let (k2, n) = (b.dims()[ndim - 2], b.dims()[ndim - 1]);
        if k != k2 {
            return Err(TensorError::MatMul {
                lhs: self.shape().clone(),
                rhs: other.shape().clone(),
            });
        }

        let batch: usize = a.dims()[..ndim - 2].iter().product();
        let (ad, bd) = (a.as_slice(), b.as_slice());
        let mut data = vec![T::ZERO; batch * m * n];
        for bi in 0..batch {
            let (a_off, b_off, o_off) = (bi * m * k, bi * k * n, bi * m * n);
            for i in 0..m {
                for l in 0..k {
                    let av = ad[a_off + i * k + l];
                    let row = &bd[b_off + l * n..b_off + (l + 1) * n];
                    let out = &mut data[o_off + i * n..o_off + (i + 1) * n];
                    for (o, &bv) in out.iter_mut().zip(row) {
                        *o = *o + av * bv;
                    }
                }
            }
        }

        let mut out_dims = a.dims()[..ndim - 2].to_vec();
        out_dims.push(m);
        out_dims.push(n);
        Ok(Tensor::from_parts(Shape::new(out_dims), data))
    }
}
