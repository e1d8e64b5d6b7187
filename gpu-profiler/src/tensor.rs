//! Matrix shapes, fill values and the conformability rule

use crate::error::{GpuError, GpuResult};
use serde::{Deserialize, Serialize};

/// Shape of one `C = A x B` call: A is m x k, B is k x n, C is m x n
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatmulShape {
    m: usize,
    k: usize,
    n: usize,
}

impl MatmulShape {
    pub fn new(m: usize, k: usize, n: usize) -> GpuResult<Self> {
        for (name, value) in [("m", m), ("k", k), ("n", n)] {
            if value == 0 {
                return Err(GpuError::InvalidDimension { name });
            }
        }
        Ok(Self { m, k, n })
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn a_dims(&self) -> (usize, usize) {
        (self.m, self.k)
    }

    pub fn b_dims(&self) -> (usize, usize) {
        (self.k, self.n)
    }

    pub fn c_dims(&self) -> (usize, usize) {
        (self.m, self.n)
    }

    pub fn as_tuple(&self) -> (usize, usize, usize) {
        (self.m, self.k, self.n)
    }

    /// Bytes needed for A, B and C together (f32 elements)
    pub fn footprint_bytes(&self) -> u64 {
        let elements = self.m * self.k + self.k * self.n + self.m * self.n;
        (elements * std::mem::size_of::<f32>()) as u64
    }
}

/// Constant fill values for the two inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub a: f32,
    pub b: f32,
}

impl Fill {
    pub fn new(a: f32, b: f32) -> Self {
        Self { a, b }
    }

    /// Value every element of C takes when A and B are constant
    pub fn expected(&self, k: usize) -> f32 {
        k as f32 * self.a * self.b
    }
}

impl Default for Fill {
    fn default() -> Self {
        Self { a: 1.0, b: 2.0 }
    }
}

/// Check the rows x cols of A, B and C against `A(m,k) x B(k,n) = C(m,n)`
pub fn check_conformable(
    a: (usize, usize),
    b: (usize, usize),
    c: (usize, usize),
) -> GpuResult<()> {
    let nonzero = [a.0, a.1, b.0, b.1, c.0, c.1].iter().all(|&d| d > 0);
    if nonzero && a.1 == b.0 && c.0 == a.0 && c.1 == b.1 {
        Ok(())
    } else {
        Err(GpuError::ShapeMismatch { a, b, c })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_rejects_zero_dimension() {
        assert!(matches!(
            MatmulShape::new(0, 4, 4),
            Err(GpuError::InvalidDimension { name: "m" })
        ));
        assert!(matches!(
            MatmulShape::new(4, 0, 4),
            Err(GpuError::InvalidDimension { name: "k" })
        ));
        assert!(matches!(
            MatmulShape::new(4, 4, 0),
            Err(GpuError::InvalidDimension { name: "n" })
        ));
    }

    #[test]
    fn test_shape_dims() {
        let shape = MatmulShape::new(2, 3, 5).unwrap();
        assert_eq!(shape.a_dims(), (2, 3));
        assert_eq!(shape.b_dims(), (3, 5));
        assert_eq!(shape.c_dims(), (2, 5));
        assert_eq!(shape.footprint_bytes(), (6 + 15 + 10) * 4);
        assert!(check_conformable(shape.a_dims(), shape.b_dims(), shape.c_dims()).is_ok());
    }

    #[test]
    fn test_conformability() {
        assert!(check_conformable((2, 3), (4, 5), (2, 5)).is_err());
        assert!(check_conformable((2, 3), (3, 5), (5, 2)).is_err());
        assert!(check_conformable((2, 3), (3, 5), (2, 4)).is_err());
        assert!(check_conformable((0, 0), (0, 0), (0, 0)).is_err());
    }

    #[test]
    fn test_expected_value() {
        assert_eq!(Fill::default().expected(512), 1024.0);
        assert_eq!(Fill::new(0.5, 3.0).expected(4), 6.0);
    }
}
