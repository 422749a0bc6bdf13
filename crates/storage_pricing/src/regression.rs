//! Least-squares regression of continuation values.
//!
//! One design matrix per decision date is solved for every inventory grid
//! point at once. Columns are scaled to unit root-mean-square before an SVD
//! solve with a relative singular-value cutoff, so powers of the spot price
//! and factor values of very different magnitude stay well conditioned.
//! Directions below the cutoff are dropped by the pseudo-inverse.

use nalgebra::DMatrix;

use crate::mc::WarningKind;

#[derive(Clone, Debug)]
enum Fit {
    /// Continuation equals the cross-sectional mean of the targets.
    Mean(Vec<f64>),
    /// `continuation[g] = sum_j (x[columns[j]] / scales[j]) * coefficients[(j, g)]`.
    Linear {
        columns: Vec<usize>,
        scales: Vec<f64>,
        coefficients: DMatrix<f64>,
    },
}

/// Regression of one decision date.
#[derive(Clone, Debug)]
pub struct Regression {
    fit: Fit,
}

/// Fitted regression together with diagnostics.
#[derive(Clone, Debug)]
pub struct RegressionOutcome {
    /// The fit.
    pub regression: Regression,
    /// Numerical rank of the scaled design matrix (zero for a mean fit
    /// without dispersion).
    pub rank: usize,
    /// Recoverable problem encountered, if any.
    pub warning: Option<WarningKind>,
}

impl Regression {
    /// Fit that predicts `means` regardless of the regressors.
    pub fn mean(means: Vec<f64>) -> Self {
        Self {
            fit: Fit::Mean(means),
        }
    }

    /// Whether the fit ignores the regressors.
    pub fn is_mean(&self) -> bool {
        matches!(self.fit, Fit::Mean(_))
    }

    /// Predicted continuation values for one row of basis values.
    pub fn predict_into(&self, basis_row: &[f64], out: &mut [f64]) {
        match &self.fit {
            Fit::Mean(means) => out.copy_from_slice(means),
            Fit::Linear {
                columns,
                scales,
                coefficients,
            } => {
                for (g, slot) in out.iter_mut().enumerate() {
                    let beta = coefficients.column(g);
                    *slot = columns
                        .iter()
                        .zip(scales)
                        .zip(beta.iter())
                        .map(|((&c, &scale), b)| basis_row[c] / scale * b)
                        .sum();
                }
            }
        }
    }
}

/// Regresses `targets` (`rows x outputs`, row major) on `design`
/// (`rows x basis`, row major).
///
/// Regressors without any dispersion give the target means without a
/// warning. A rank-deficient design is solved by the pseudo-inverse and
/// reported as [`WarningKind::RankDeficient`]; a failed or non-finite solve
/// falls back to the means with [`WarningKind::MeanFallback`].
pub fn fit(
    design: &[f64],
    targets: &[f64],
    rows: usize,
    basis: usize,
    outputs: usize,
    tol: f64,
) -> RegressionOutcome {
    let means = column_means(targets, rows, outputs);
    let mean_outcome = |rank, warning| RegressionOutcome {
        regression: Regression::mean(means.clone()),
        rank,
        warning,
    };

    if design.iter().any(|x| !x.is_finite()) {
        return mean_outcome(0, Some(WarningKind::MeanFallback));
    }

    // Scale each column to unit RMS and skip columns that are identically zero.
    let mut columns = Vec::with_capacity(basis);
    let mut scales = Vec::with_capacity(basis);
    let mut dispersed = false;
    for k in 0..basis {
        let column = (0..rows).map(|r| design[r * basis + k]);
        let (mut lo, mut hi, mut sq) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for x in column {
            lo = lo.min(x);
            hi = hi.max(x);
            sq += x * x;
        }
        let rms = (sq / rows as f64).sqrt();
        if rms == 0.0 {
            continue;
        }
        if hi - lo > tol * (1.0 + lo.abs().max(hi.abs())) {
            dispersed = true;
        }
        columns.push(k);
        scales.push(rms);
    }

    if !dispersed || columns.is_empty() {
        return mean_outcome(0, None);
    }

    let x = DMatrix::from_fn(rows, columns.len(), |r, j| {
        design[r * basis + columns[j]] / scales[j]
    });
    let y = DMatrix::from_row_slice(rows, outputs, targets);

    let svd = x.svd(true, true);
    let sigma_max = svd.singular_values.max();
    let eps = tol * sigma_max;
    let rank = svd.rank(eps);

    let coefficients = match svd.solve(&y, eps) {
        Ok(beta) if beta.iter().all(|b| b.is_finite()) => beta,
        _ => return mean_outcome(rank, Some(WarningKind::MeanFallback)),
    };

    let warning = (rank < columns.len()).then_some(WarningKind::RankDeficient);
    RegressionOutcome {
        regression: Regression {
            fit: Fit::Linear {
                columns,
                scales,
                coefficients,
            },
        },
        rank,
        warning,
    }
}

fn column_means(values: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut means = vec![0.0; cols];
    for row in values.chunks_exact(cols.max(1)).take(rows) {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    let n = rows.max(1) as f64;
    means.iter_mut().for_each(|m| *m /= n);
    means
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_linear_fit() {
        // y0 = 2 + 3x, y1 = -1 + 0.5 x^2 with basis [1, x, x^2]
        let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.37 - 2.0).collect();
        let design: Vec<f64> = xs.iter().flat_map(|x| [1.0, *x, x * x]).collect();
        let targets: Vec<f64> = xs
            .iter()
            .flat_map(|x| [2.0 + 3.0 * x, -1.0 + 0.5 * x * x])
            .collect();

        let outcome = fit(&design, &targets, xs.len(), 3, 2, 1e-10);
        assert_eq!(outcome.rank, 3);
        assert!(outcome.warning.is_none());
        assert!(!outcome.regression.is_mean());

        let mut out = [0.0; 2];
        outcome.regression.predict_into(&[1.0, 1.5, 2.25], &mut out);
        assert_relative_eq!(out[0], 6.5, epsilon = 1e-9);
        assert_relative_eq!(out[1], 0.125, epsilon = 1e-9);
    }

    #[test]
    fn test_badly_scaled_columns() {
        // Spot powers span many orders of magnitude.
        let xs: Vec<f64> = (0..50).map(|i| 10.0 + i as f64 * 0.2).collect();
        let design: Vec<f64> = xs.iter().flat_map(|x| [1.0, *x, x * x, x * x * x]).collect();
        let targets: Vec<f64> = xs.iter().map(|x| 0.01 * x * x * x - x).collect();

        let outcome = fit(&design, &targets, xs.len(), 4, 1, 1e-12);
        assert_eq!(outcome.rank, 4);
        let mut out = [0.0];
        outcome.regression.predict_into(&[1.0, 12.0, 144.0, 1728.0], &mut out);
        assert_relative_eq!(out[0], 0.01 * 1728.0 - 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_no_dispersion_uses_mean_silently() {
        let design = vec![1.0, 15.0, 1.0, 15.0, 1.0, 15.0];
        let targets = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let outcome = fit(&design, &targets, 3, 2, 2, 1e-10);
        assert!(outcome.regression.is_mean());
        assert!(outcome.warning.is_none());

        let mut out = [0.0; 2];
        outcome.regression.predict_into(&[1.0, 99.0], &mut out);
        assert_eq!(out, [2.0, 20.0]);
    }

    #[test]
    fn test_collinear_columns_warn() {
        // Second column is twice the third.
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let design: Vec<f64> = xs.iter().flat_map(|x| [1.0, 2.0 * x, *x]).collect();
        let targets: Vec<f64> = xs.iter().map(|x| 1.0 + x).collect();

        let outcome = fit(&design, &targets, xs.len(), 3, 1, 1e-10);
        assert_eq!(outcome.rank, 2);
        assert_eq!(outcome.warning, Some(WarningKind::RankDeficient));

        let mut out = [0.0];
        outcome.regression.predict_into(&[1.0, 8.0, 4.0], &mut out);
        assert_relative_eq!(out[0], 5.0, epsilon = 1e-8);
    }

    #[test]
    fn test_fewer_rows_than_basis_functions() {
        let design = vec![1.0, 1.0, 1.0, 1.0, 2.0, 4.0];
        let targets = vec![3.0, 5.0];
        let outcome = fit(&design, &targets, 2, 3, 1, 1e-10);
        assert_eq!(outcome.warning, Some(WarningKind::RankDeficient));

        // Pseudo-inverse still interpolates the samples.
        let mut out = [0.0];
        outcome.regression.predict_into(&[1.0, 2.0, 4.0], &mut out);
        assert_relative_eq!(out[0], 5.0, epsilon = 1e-8);
    }

    #[test]
    fn test_non_finite_design_falls_back() {
        let design = vec![1.0, f64::INFINITY, 1.0, 2.0];
        let targets = vec![4.0, 6.0];
        let outcome = fit(&design, &targets, 2, 2, 1, 1e-10);
        assert!(outcome.regression.is_mean());
        assert_eq!(outcome.warning, Some(WarningKind::MeanFallback));
        let mut out = [0.0];
        outcome.regression.predict_into(&[1.0, 0.0], &mut out);
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_zero_columns_are_skipped() {
        let xs: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let design: Vec<f64> = xs.iter().flat_map(|x| [1.0, 0.0, *x]).collect();
        let targets: Vec<f64> = xs.iter().map(|x| 2.0 * x).collect();
        let outcome = fit(&design, &targets, xs.len(), 3, 1, 1e-10);
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.rank, 2);
    }
}
