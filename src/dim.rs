//! The `Dim` tensor-shape value type.
//!
//! `Dim` is the native value that crosses the boundary by value: it is
//! built here, promoted into an owning handle by the FFI layer, and
//! destroyed by the receiver.

use std::fmt;

/// Maximum number of dimensions a `Dim` can hold
pub const MAX_TENSOR_DIM: usize = 7;

/// Failures raised by `Dim` operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DimError {
    /// More dimensions than `MAX_TENSOR_DIM`
    #[error("Out of bounds exception in Dim::Dim() with initializer_list of size {0}")]
    TooManyDimensions(usize),

    /// Index past the last dimension
    #[error("Out of bounds exception in Dim::{op}({index}) for node of size {dim}")]
    OutOfBounds {
        /// Operation name
        op: &'static str,
        /// Offending index
        index: usize,
        /// Rendered shape
        dim: String,
    },

    /// Zero-sized dimension
    #[error("Attempt to set dimension size to zero in Dim::{op}({index}) for node of size {dim}")]
    ZeroSize {
        /// Operation name
        op: &'static str,
        /// Offending index
        index: usize,
        /// Rendered shape
        dim: String,
    },

    /// Batch size of zero
    #[error("Batch size must be positive in Dim::{0}")]
    ZeroBatch(&'static str),

    /// Transpose of a shape with more than two dimensions
    #[error("Cannot transpose Dim object with more than 2 dimensions, but got {0}")]
    TransposeRank(String),

    /// Element count does not fit in `u32`
    #[error("Size overflow in Dim::{op}() for node of size {dim}")]
    SizeOverflow {
        /// Operation name
        op: &'static str,
        /// Rendered shape
        dim: String,
    },
}

/// Result type for `Dim` operations
pub type DimResult<T> = std::result::Result<T, DimError>;

/// Shape of a (possibly minibatched) tensor
#[derive(Debug, Clone, Copy)]
pub struct Dim {
    d: [u32; MAX_TENSOR_DIM],
    nd: usize,
    bd: u32,
}

impl Default for Dim {
    fn default() -> Self {
        Self {
            d: [0; MAX_TENSOR_DIM],
            nd: 0,
            bd: 1,
        }
    }
}

impl Dim {
    /// Shape with the given dimensions and a batch of one
    pub fn new(dims: &[u32]) -> DimResult<Self> {
        Self::with_batch(dims, 1)
    }

    /// Shape with the given dimensions and batch size
    pub fn with_batch(dims: &[u32], batch: u32) -> DimResult<Self> {
        if dims.len() > MAX_TENSOR_DIM {
            return Err(DimError::TooManyDimensions(dims.len()));
        }
        if batch == 0 {
            return Err(DimError::ZeroBatch("Dim"));
        }
        let mut d = [0; MAX_TENSOR_DIM];
        d[..dims.len()].copy_from_slice(dims);
        Ok(Self {
            d,
            nd: dims.len(),
            bd: batch,
        })
    }

    /// Dimensions, excluding the batch
    pub fn dims(&self) -> &[u32] {
        &self.d[..self.nd]
    }

    /// Number of dimensions
    pub fn ndims(&self) -> usize {
        self.nd
    }

    /// Number of elements in one batch element
    pub fn batch_size(&self) -> DimResult<u32> {
        self.dims()
            .iter()
            .try_fold(1u32, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| self.overflow("batch_size"))
    }

    /// Total number of elements including the batch
    pub fn size(&self) -> DimResult<u32> {
        self.batch_size()?
            .checked_mul(self.bd)
            .ok_or_else(|| self.overflow("size"))
    }

    /// Sum of all dimensions
    pub fn sum_dims(&self) -> DimResult<u32> {
        self.dims()
            .iter()
            .try_fold(0u32, |acc, &d| acc.checked_add(d))
            .ok_or_else(|| self.overflow("sum_dims"))
    }

    fn overflow(&self, op: &'static str) -> DimError {
        DimError::SizeOverflow {
            op,
            dim: self.to_string(),
        }
    }

    /// Batch size
    pub fn batch_elems(&self) -> u32 {
        self.bd
    }

    /// Size of the first dimension
    pub fn rows(&self) -> u32 {
        self.get(0)
    }

    /// Size of the second dimension, 1 for vectors
    pub fn cols(&self) -> u32 {
        self.get(1)
    }

    /// Size of dimension `i`; dimensions past the last one have size 1
    pub fn get(&self, i: usize) -> u32 {
        if i < self.nd {
            self.d[i]
        } else {
            1
        }
    }

    /// Set the size of dimension `i`, growing the shape with ones if needed
    pub fn set(&mut self, i: usize, s: u32) -> DimResult<()> {
        if i >= self.nd && s != 1 {
            return Err(DimError::OutOfBounds {
                op: "set",
                index: i,
                dim: self.to_string(),
            });
        }
        if s == 0 {
            return Err(DimError::ZeroSize {
                op: "set",
                index: i,
                dim: self.to_string(),
            });
        }
        if i < self.nd {
            self.d[i] = s;
        }
        Ok(())
    }

    /// Set the batch size
    pub fn set_batch_elems(&mut self, batch: u32) -> DimResult<()> {
        if batch == 0 {
            return Err(DimError::ZeroBatch("set_batch_elems"));
        }
        self.bd = batch;
        Ok(())
    }

    /// Change the number of dimensions; new dimensions have size 1
    pub fn resize(&mut self, nd: usize) -> DimResult<()> {
        if nd > MAX_TENSOR_DIM {
            return Err(DimError::OutOfBounds {
                op: "resize",
                index: nd,
                dim: self.to_string(),
            });
        }
        while self.nd < nd {
            self.d[self.nd] = 1;
            self.nd += 1;
        }
        self.nd = nd;
        Ok(())
    }

    /// Remove dimension `i`. Removing the only dimension leaves a size-1 shape.
    pub fn delete_dim(&mut self, i: usize) -> DimResult<()> {
        if i >= self.nd {
            return Err(DimError::OutOfBounds {
                op: "delete_dim",
                index: i,
                dim: self.to_string(),
            });
        }
        if i == self.nd - 1 {
            if self.nd == 1 {
                self.d[0] = 1;
            } else {
                self.nd -= 1;
            }
        } else {
            self.d.copy_within(i + 1..self.nd, i);
            self.nd -= 1;
        }
        Ok(())
    }

    /// Copy with trailing size-1 dimensions removed (keeps at least one)
    pub fn truncate(&self) -> Self {
        let mut r = *self;
        let mut m = 1;
        for i in 1..self.nd {
            if self.d[i] > 1 {
                m = i + 1;
            }
        }
        r.nd = m.min(self.nd);
        r
    }

    /// Copy with a batch size of one
    pub fn single_batch(&self) -> Self {
        let mut r = *self;
        r.bd = 1;
        r
    }

    /// Transposed shape; vectors become row vectors
    pub fn transpose(&self) -> DimResult<Self> {
        match self.nd {
            0 | 1 => Self::with_batch(&[1, self.rows()], self.bd),
            2 => Self::with_batch(&[self.d[1], self.d[0]], self.bd),
            _ => Err(DimError::TransposeRank(self.to_string())),
        }
    }
}

impl PartialEq for Dim {
    fn eq(&self, other: &Self) -> bool {
        self.bd == other.bd && self.dims() == other.dims()
    }
}

impl Eq for Dim {}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, d) in self.dims().iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", d)?;
        }
        if self.bd != 1 {
            write!(f, "X{}", self.bd)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let d = Dim::with_batch(&[2, 3, 4], 5).unwrap();
        assert_eq!(d.ndims(), 3);
        assert_eq!(d.batch_size(), Ok(24));
        assert_eq!(d.size(), Ok(120));
        assert_eq!(d.sum_dims(), Ok(9));
        assert_eq!(d.rows(), 2);
        assert_eq!(d.cols(), 3);
        assert_eq!(d.get(6), 1);
    }

    #[test]
    fn test_size_overflow_is_an_error() {
        let d = Dim::new(&[65536, 65536]).unwrap();
        assert!(matches!(d.batch_size(), Err(DimError::SizeOverflow { op: "batch_size", .. })));
        assert!(matches!(d.size(), Err(DimError::SizeOverflow { .. })));

        let batched = Dim::with_batch(&[65536], 65536).unwrap();
        assert_eq!(batched.batch_size(), Ok(65536));
        assert!(matches!(batched.size(), Err(DimError::SizeOverflow { op: "size", .. })));

        let wide = Dim::new(&[u32::MAX, 1]).unwrap();
        assert!(matches!(wide.sum_dims(), Err(DimError::SizeOverflow { op: "sum_dims", .. })));
        assert_eq!(wide.size(), Ok(u32::MAX));
    }

    #[test]
    fn test_too_many_dimensions() {
        let err = Dim::new(&[1; MAX_TENSOR_DIM + 1]).unwrap_err();
        assert_eq!(err, DimError::TooManyDimensions(8));
        assert!(Dim::with_batch(&[2], 0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Dim::new(&[2, 3]).unwrap().to_string(), "{2,3}");
        assert_eq!(Dim::with_batch(&[4], 10).unwrap().to_string(), "{4X10}");
        assert_eq!(Dim::default().to_string(), "{}");
    }

    #[test]
    fn test_set() {
        let mut d = Dim::new(&[2, 3]).unwrap();
        d.set(1, 7).unwrap();
        assert_eq!(d.dims(), &[2, 7]);

        assert!(matches!(d.set(4, 2), Err(DimError::OutOfBounds { index: 4, .. })));
        assert!(matches!(d.set(0, 0), Err(DimError::ZeroSize { .. })));
        d.set(4, 1).unwrap();
        assert_eq!(d.dims(), &[2, 7]);
    }

    #[test]
    fn test_resize_and_truncate() {
        let mut d = Dim::new(&[3]).unwrap();
        d.resize(3).unwrap();
        assert_eq!(d.dims(), &[3, 1, 1]);
        assert_eq!(d.truncate().dims(), &[3]);

        let d = Dim::new(&[3, 1, 4, 1]).unwrap();
        assert_eq!(d.truncate().dims(), &[3, 1, 4]);

        let mut empty = Dim::default();
        assert!(empty.resize(MAX_TENSOR_DIM + 1).is_err());
        assert_eq!(empty.ndims(), 0);
    }

    #[test]
    fn test_delete_dim() {
        let mut d = Dim::new(&[2, 3, 4]).unwrap();
        d.delete_dim(1).unwrap();
        assert_eq!(d.dims(), &[2, 4]);
        d.delete_dim(1).unwrap();
        assert_eq!(d.dims(), &[2]);
        d.delete_dim(0).unwrap();
        assert_eq!(d.dims(), &[1]);
        assert!(d.delete_dim(3).is_err());
    }

    #[test]
    fn test_transpose() {
        let d = Dim::with_batch(&[2, 3], 4).unwrap();
        assert_eq!(d.transpose().unwrap(), Dim::with_batch(&[3, 2], 4).unwrap());
        assert_eq!(Dim::new(&[5]).unwrap().transpose().unwrap().dims(), &[1, 5]);

        let err = Dim::new(&[1, 2, 3]).unwrap().transpose().unwrap_err();
        assert!(err.to_string().contains("{1,2,3}"));
    }

    #[test]
    fn test_equality_ignores_unused_slots() {
        let mut a = Dim::new(&[2, 3, 9]).unwrap();
        a.resize(2).unwrap();
        let b = Dim::new(&[2, 3]).unwrap();
        assert_eq!(a, b);
        assert_ne!(b, b.transpose().unwrap());
        assert_ne!(b, Dim::with_batch(&[2, 3], 2).unwrap());
    }

    #[test]
    fn test_single_batch() {
        let d = Dim::with_batch(&[2], 8).unwrap();
        assert_eq!(d.single_batch().batch_elems(), 1);
        assert_eq!(d.single_batch().dims(), d.dims());
    }
}
