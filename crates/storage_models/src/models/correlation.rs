//! Factor correlation with Cholesky decomposition.
//!
//! Given `n` independent standard normals `Z`, correlated normals are
//! generated as
//!
//! ```text
//! W = L * Z,    C = L * L^T
//! ```
//!
//! where `L` is the lower triangular Cholesky factor of the correlation
//! matrix `C`. Positive semi-definite matrices are accepted: a pivot that
//! vanishes within tolerance (e.g. two perfectly correlated factors) yields a
//! zero column in `L`.
//!
//! ## Usage
//!
//! ```
//! use storage_models::models::correlation::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::new(&[
//!     1.0, 0.64,
//!     0.64, 1.0,
//! ], 2).unwrap();
//!
//! let cholesky = corr.cholesky().unwrap();
//! let mut w = [0.0; 2];
//! cholesky.transform_into(&[0.5, 0.8], &mut w);
//! assert_eq!(w[0], 0.5);
//! ```

use storage_core::types::ConfigurationError;

/// Absolute tolerance for unit diagonal, symmetry and vanishing pivots.
const CORRELATION_TOLERANCE: f64 = 1e-10;

/// Error types for correlation operations.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelationError {
    /// Matrix is not positive semi-definite
    NotPositiveSemiDefinite {
        /// Row at which the factorisation failed
        index: usize,
    },
    /// Matrix dimensions are invalid
    InvalidDimensions {
        /// Expected number of elements
        expected: usize,
        /// Number of elements supplied
        got: usize,
    },
    /// Diagonal elements are not 1.0
    InvalidDiagonal {
        /// Diagonal index
        index: usize,
        /// Value found
        value: f64,
    },
    /// Matrix is not symmetric
    NotSymmetric {
        /// Row
        i: usize,
        /// Column
        j: usize,
    },
    /// Correlation value out of range [-1, 1] or not finite
    OutOfRange {
        /// Row
        i: usize,
        /// Column
        j: usize,
        /// Value found
        value: f64,
    },
}

impl std::fmt::Display for CorrelationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationError::NotPositiveSemiDefinite { index } => {
                write!(
                    f,
                    "Correlation matrix is not positive semi-definite (Cholesky failed at row {})",
                    index
                )
            }
            CorrelationError::InvalidDimensions { expected, got } => {
                write!(
                    f,
                    "Invalid matrix dimensions: expected {} elements, got {}",
                    expected, got
                )
            }
            CorrelationError::InvalidDiagonal { index, value } => {
                write!(
                    f,
                    "Diagonal element at index {} is {}, expected 1.0",
                    index, value
                )
            }
            CorrelationError::NotSymmetric { i, j } => {
                write!(f, "Matrix is not symmetric at ({}, {})", i, j)
            }
            CorrelationError::OutOfRange { i, j, value } => {
                write!(
                    f,
                    "Correlation at ({}, {}) is {}, must be in [-1, 1]",
                    i, j, value
                )
            }
        }
    }
}

impl std::error::Error for CorrelationError {}

impl From<CorrelationError> for ConfigurationError {
    fn from(err: CorrelationError) -> Self {
        ConfigurationError::Correlation(err.to_string())
    }
}

/// Validated correlation matrix.
///
/// A correlation matrix must be square and symmetric with unit diagonal,
/// off-diagonal elements in [-1, 1] and positive semi-definite. The last
/// condition is checked by [`cholesky`](Self::cholesky).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CorrelationMatrix {
    /// Matrix elements in row-major order
    data: Vec<f64>,
    /// Matrix dimension (n x n)
    dim: usize,
}

impl CorrelationMatrix {
    /// Create a correlation matrix from a row-major flat array.
    ///
    /// # Errors
    ///
    /// - `InvalidDimensions` unless `data.len() == dim * dim`
    /// - `InvalidDiagonal` for a diagonal element other than 1.0
    /// - `NotSymmetric` / `OutOfRange` for bad off-diagonal elements
    pub fn new(data: &[f64], dim: usize) -> Result<Self, CorrelationError> {
        let expected = dim * dim;
        if data.len() != expected || dim == 0 {
            return Err(CorrelationError::InvalidDimensions {
                expected,
                got: data.len(),
            });
        }

        for i in 0..dim {
            let diag = data[i * dim + i];
            if !((diag - 1.0).abs() <= CORRELATION_TOLERANCE) {
                return Err(CorrelationError::InvalidDiagonal {
                    index: i,
                    value: diag,
                });
            }
        }

        for i in 0..dim {
            for j in (i + 1)..dim {
                let val_ij = data[i * dim + j];
                let val_ji = data[j * dim + i];
                if !(-1.0..=1.0).contains(&val_ij) {
                    return Err(CorrelationError::OutOfRange {
                        i,
                        j,
                        value: val_ij,
                    });
                }
                if !((val_ij - val_ji).abs() <= CORRELATION_TOLERANCE) {
                    return Err(CorrelationError::NotSymmetric { i, j });
                }
            }
        }

        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Create from nested rows, e.g. `&[[1.0, 0.3], [0.3, 1.0]]`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, CorrelationError> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(CorrelationError::InvalidDimensions {
                    expected: dim * dim,
                    got: dim * row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(&data, dim)
    }

    /// Identity correlation matrix (uncorrelated factors).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Cholesky decomposition `C = L * L^T` tolerant of zero pivots.
    ///
    /// # Errors
    ///
    /// `CorrelationError::NotPositiveSemiDefinite` if a pivot is negative
    /// beyond tolerance, or a zero pivot leaves a non-zero residual in its
    /// column.
    pub fn cholesky(&self) -> Result<CholeskyFactor, CorrelationError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for j in 0..n {
            let sum: f64 = (0..j).map(|k| lower[j * n + k] * lower[j * n + k]).sum();
            let pivot = self.get(j, j) - sum;
            if pivot < -CORRELATION_TOLERANCE {
                return Err(CorrelationError::NotPositiveSemiDefinite { index: j });
            }
            let l_jj = if pivot <= CORRELATION_TOLERANCE {
                0.0
            } else {
                pivot.sqrt()
            };
            lower[j * n + j] = l_jj;

            for i in (j + 1)..n {
                let sum: f64 = (0..j).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                let residual = self.get(i, j) - sum;
                if l_jj == 0.0 {
                    if residual.abs() > 1e-8 {
                        return Err(CorrelationError::NotPositiveSemiDefinite { index: j });
                    }
                    lower[i * n + j] = 0.0;
                } else {
                    lower[i * n + j] = residual / l_jj;
                }
            }
        }

        Ok(CholeskyFactor { data: lower, dim: n })
    }
}

/// Lower triangular Cholesky factor of a correlation matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    data: Vec<f64>,
    dim: usize,
}

impl CholeskyFactor {
    /// Matrix dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j); zero above the diagonal.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j > i {
            0.0
        } else {
            self.data[i * self.dim + j]
        }
    }

    /// Writes `W = L * Z` into `w` without allocating.
    ///
    /// # Panics
    ///
    /// Panics if `z` or `w` is shorter than `dim()`.
    pub fn transform_into(&self, z: &[f64], w: &mut [f64]) {
        let n = self.dim;
        for i in 0..n {
            let row = &self.data[i * n..i * n + i + 1];
            w[i] = row.iter().zip(&z[..=i]).map(|(l, z)| l * z).sum();
        }
    }

    /// Returns `W = L * Z`.
    pub fn transform(&self, z: &[f64]) -> Vec<f64> {
        let mut w = vec![0.0; self.dim];
        self.transform_into(z, &mut w);
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Validation Tests
    // ========================================

    #[test]
    fn test_invalid_dimensions() {
        let result = CorrelationMatrix::new(&[1.0, 0.5, 0.5], 2);
        assert!(matches!(
            result,
            Err(CorrelationError::InvalidDimensions { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_invalid_diagonal() {
        let result = CorrelationMatrix::new(&[1.0, 0.5, 0.5, 0.9], 2);
        assert!(matches!(
            result,
            Err(CorrelationError::InvalidDiagonal { index: 1, .. })
        ));
    }

    #[test]
    fn test_not_symmetric() {
        let result = CorrelationMatrix::new(&[1.0, 0.5, 0.4, 1.0], 2);
        assert!(matches!(
            result,
            Err(CorrelationError::NotSymmetric { i: 0, j: 1 })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let result = CorrelationMatrix::new(&[1.0, 1.5, 1.5, 1.0], 2);
        assert!(matches!(result, Err(CorrelationError::OutOfRange { .. })));
    }

    #[test]
    fn test_nan_rejected() {
        let result = CorrelationMatrix::new(&[1.0, f64::NAN, f64::NAN, 1.0], 2);
        assert!(result.is_err());
    }

    // ========================================
    // Cholesky Tests
    // ========================================

    #[test]
    fn test_cholesky_two_by_two() {
        let rho = 0.64;
        let corr = CorrelationMatrix::from_rows(&[[1.0, rho], [rho, 1.0]]).unwrap();
        let l = corr.cholesky().unwrap();
        assert_relative_eq!(l.get(0, 0), 1.0);
        assert_relative_eq!(l.get(1, 0), rho);
        assert_relative_eq!(l.get(1, 1), (1.0 - rho * rho).sqrt());
        assert_eq!(l.get(0, 1), 0.0);
    }

    #[test]
    fn test_cholesky_reconstructs_matrix() {
        let corr = CorrelationMatrix::from_rows(&[
            [1.0, 0.3, -0.2],
            [0.3, 1.0, 0.5],
            [-0.2, 0.5, 1.0],
        ])
        .unwrap();
        let l = corr.cholesky().unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let c: f64 = (0..3).map(|k| l.get(i, k) * l.get(j, k)).sum();
                assert_relative_eq!(c, corr.get(i, j), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_cholesky_accepts_semi_definite() {
        let corr = CorrelationMatrix::from_rows(&[[1.0, 1.0], [1.0, 1.0]]).unwrap();
        let l = corr.cholesky().unwrap();
        let w = l.transform(&[0.7, -3.0]);
        assert_relative_eq!(w[0], 0.7);
        assert_relative_eq!(w[1], 0.7);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let corr = CorrelationMatrix::from_rows(&[
            [1.0, 0.9, -0.9],
            [0.9, 1.0, 0.9],
            [-0.9, 0.9, 1.0],
        ])
        .unwrap();
        let err = corr.cholesky().unwrap_err();
        assert!(matches!(err, CorrelationError::NotPositiveSemiDefinite { .. }));

        let config: ConfigurationError = err.into();
        assert!(config.to_string().contains("not positive semi-definite"));
    }

    #[test]
    fn test_identity_transform() {
        let l = CorrelationMatrix::identity(3).cholesky().unwrap();
        assert_eq!(l.transform(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }
}
