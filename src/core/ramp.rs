use crate::core::mask::ValidityMask;
use crate::types::{InsarError, InsarResult, ScalarField};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// Minimum number of valid pixels required for a stable ramp fit
pub const MIN_PIXELS_FOR_FIT: usize = 1000;

/// Ramp estimation parameters
#[derive(Debug, Clone)]
pub struct RampParams {
    /// Polynomial degree of the trend surface (1 = planar, 2 = quadratic)
    pub degree: usize,
}

impl Default for RampParams {
    fn default() -> Self {
        Self { degree: 2 }
    }
}

/// Result of a ramp fit: the corrected field plus fit diagnostics.
#[derive(Debug, Clone)]
pub struct RampFit {
    /// Input field with the fitted ramp subtracted everywhere
    pub corrected: ScalarField,
    /// The fitted trend surface evaluated over the full grid
    pub ramp: ScalarField,
    /// Coefficients in basis order [1, x, y] or [1, x, y, xy, x^2, y^2]
    pub coefficients: Vec<f64>,
    /// Sum of squared residuals over the fitted (valid) subset
    pub residual_sum_squares: f64,
    /// Number of pixels used in the fit
    pub valid_count: usize,
}

/// Fit diagnostics in a sink-friendly shape (everything but the rasters).
#[derive(Debug, Clone, Serialize)]
pub struct RampFitReport {
    pub degree: usize,
    pub coefficients: Vec<f64>,
    pub residual_sum_squares: f64,
    pub valid_count: usize,
}

impl RampFit {
    pub fn report(&self, degree: usize) -> RampFitReport {
        RampFitReport {
            degree,
            coefficients: self.coefficients.clone(),
            residual_sum_squares: self.residual_sum_squares,
            valid_count: self.valid_count,
        }
    }
}

/// Normalized pixel coordinates along one axis: zero mean, unit standard
/// deviation, with the divisor floored at 1.0 so a degenerate single-row or
/// single-column grid cannot blow up the solve.
///
/// Normalization keeps the least-squares system well conditioned at typical
/// interferogram sizes (thousands of pixels per axis).
pub fn normalized_axis(n: usize) -> Vec<f64> {
    let mean = (0..n).map(|i| i as f64).sum::<f64>() / (n.max(1) as f64);
    let var = (0..n).map(|i| (i as f64 - mean).powi(2)).sum::<f64>() / (n.max(1) as f64);
    let std = var.sqrt().max(1.0);
    (0..n).map(|i| (i as f64 - mean) / std).collect()
}

/// Number of basis functions for a supported degree.
fn basis_size(degree: usize) -> InsarResult<usize> {
    match degree {
        1 => Ok(3),
        2 => Ok(6),
        d => Err(InsarError::UnsupportedDegree(d)),
    }
}

/// Evaluate the polynomial basis at normalized (x, y).
fn eval_basis(x: f64, y: f64, degree: usize, out: &mut [f64]) {
    out[0] = 1.0;
    out[1] = x;
    out[2] = y;
    if degree == 2 {
        out[3] = x * y;
        out[4] = x * x;
        out[5] = y * y;
    }
}

/// Estimates and removes a smooth large-scale trend ("ramp") from a scalar
/// field, typically residual orbital or atmospheric bias in unwrapped phase.
///
/// The surface is fit by ordinary least squares over the masked subset only,
/// then evaluated and subtracted over the whole grid, since the trend is
/// assumed global. No regularization is applied.
#[derive(Debug, Clone)]
pub struct RampEstimator {
    params: RampParams,
}

impl RampEstimator {
    pub fn new(params: RampParams) -> Self {
        Self { params }
    }

    pub fn degree(&self) -> usize {
        self.params.degree
    }

    /// Fit the trend surface to `field` over `mask` and subtract it.
    ///
    /// The supplied mask is narrowed by finiteness so the NaN sentinel can
    /// never enter the solve. Fails with `UnsupportedDegree` before any
    /// computation, with `ShapeMismatch` if mask and field disagree, and
    /// with `InsufficientValidPixels` below [`MIN_PIXELS_FOR_FIT`].
    pub fn fit(&self, field: &ScalarField, mask: &ValidityMask) -> InsarResult<RampFit> {
        let degree = self.params.degree;
        let n_coeffs = basis_size(degree)?;

        if mask.dim() != field.dim() {
            return Err(InsarError::ShapeMismatch {
                expected: field.dim(),
                actual: mask.dim(),
            });
        }

        let mask = mask.and(&ValidityMask::finite(field))?;
        let valid_count = mask.count_valid();
        log::info!("Valid pixels for degree-{} ramp fit: {}", degree, valid_count);
        if valid_count < MIN_PIXELS_FOR_FIT {
            return Err(InsarError::InsufficientValidPixels {
                required: MIN_PIXELS_FOR_FIT,
                actual: valid_count,
            });
        }

        let (rows, cols) = field.dim();
        let xs = normalized_axis(cols);
        let ys = normalized_axis(rows);

        // Normal equations G^T G m = G^T z, accumulated over valid pixels
        // only, so the dense n x k design matrix is never materialized.
        let mut gtg = DMatrix::<f64>::zeros(n_coeffs, n_coeffs);
        let mut gtz = DVector::<f64>::zeros(n_coeffs);
        let mut basis = vec![0.0f64; n_coeffs];

        for (r, c) in mask.valid_indices() {
            eval_basis(xs[c], ys[r], degree, &mut basis);
            let z = field[[r, c]] as f64;
            for i in 0..n_coeffs {
                for j in 0..n_coeffs {
                    gtg[(i, j)] += basis[i] * basis[j];
                }
                gtz[i] += basis[i] * z;
            }
        }

        let coeffs = gtg.lu().solve(&gtz).ok_or_else(|| {
            InsarError::Processing("ramp fit normal equations are singular".to_string())
        })?;
        let coefficients: Vec<f64> = coeffs.iter().copied().collect();
        log::info!("Ramp coefficients: {:?}", coefficients);

        // Evaluate the fitted surface densely; the correction applies to
        // every pixel, including those excluded from the fit.
        let mut ramp = ScalarField::zeros((rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                eval_basis(xs[c], ys[r], degree, &mut basis);
                let trend: f64 = basis
                    .iter()
                    .zip(coefficients.iter())
                    .map(|(b, m)| b * m)
                    .sum();
                ramp[[r, c]] = trend as f32;
            }
        }

        let mut residual_sum_squares = 0.0f64;
        for (r, c) in mask.valid_indices() {
            let res = field[[r, c]] as f64 - ramp[[r, c]] as f64;
            residual_sum_squares += res * res;
        }
        log::info!("Ramp fit residual sum of squares: {:.6e}", residual_sum_squares);

        let corrected = field - &ramp;

        Ok(RampFit {
            corrected,
            ramp,
            coefficients,
            residual_sum_squares,
            valid_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Field built from a polynomial in normalized coordinates.
    fn polynomial_field(rows: usize, cols: usize, coeffs: &[f64], degree: usize) -> ScalarField {
        let xs = normalized_axis(cols);
        let ys = normalized_axis(rows);
        let mut basis = vec![0.0f64; coeffs.len()];
        let mut field = ScalarField::zeros((rows, cols));
        for r in 0..rows {
            for c in 0..cols {
                eval_basis(xs[c], ys[r], degree, &mut basis);
                let v: f64 = basis.iter().zip(coeffs.iter()).map(|(b, m)| b * m).sum();
                field[[r, c]] = v as f32;
            }
        }
        field
    }

    #[test]
    fn test_normalized_axis_zero_mean() {
        let xs = normalized_axis(100);
        let mean: f64 = xs.iter().sum::<f64>() / 100.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_axis_degenerate() {
        // single column: std floors at 1.0 instead of dividing by zero
        let xs = normalized_axis(1);
        assert_eq!(xs, vec![0.0]);
    }

    #[test]
    fn test_degree1_exact_recovery() {
        let coeffs = [1.0, 2.0, 3.0];
        let field = polynomial_field(50, 50, &coeffs, 1);
        let mask = ValidityMask::all_valid((50, 50));
        let estimator = RampEstimator::new(RampParams { degree: 1 });
        let fit = estimator.fit(&field, &mask).unwrap();

        for (got, want) in fit.coefficients.iter().zip(coeffs.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-4);
        }
        assert!(fit.residual_sum_squares < 1e-4);
        for v in fit.corrected.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_degree2_exact_recovery() {
        let coeffs = [0.5, -1.0, 2.0, 0.3, -0.7, 1.1];
        let field = polynomial_field(60, 40, &coeffs, 2);
        let mask = ValidityMask::all_valid((60, 40));
        let estimator = RampEstimator::new(RampParams { degree: 2 });
        let fit = estimator.fit(&field, &mask).unwrap();

        for (got, want) in fit.coefficients.iter().zip(coeffs.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-3);
        }
        for v in fit.corrected.iter() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_degree2_residual_not_worse_than_degree1() {
        // structured data that neither basis reproduces exactly
        let mut field = ScalarField::zeros((64, 64));
        for r in 0..64 {
            for c in 0..64 {
                field[[r, c]] =
                    (r as f32 * 0.1).sin() + 0.02 * (c as f32) + 0.001 * (r as f32 * c as f32);
            }
        }
        let mask = ValidityMask::all_valid((64, 64));
        let rss1 = RampEstimator::new(RampParams { degree: 1 })
            .fit(&field, &mask)
            .unwrap()
            .residual_sum_squares;
        let rss2 = RampEstimator::new(RampParams { degree: 2 })
            .fit(&field, &mask)
            .unwrap()
            .residual_sum_squares;
        assert!(rss2 <= rss1 + 1e-9);
    }

    #[test]
    fn test_insufficient_pixels() {
        // 31*31 = 961 < 1000
        let field = ScalarField::zeros((31, 31));
        let mask = ValidityMask::all_valid((31, 31));
        for degree in [1, 2] {
            let err = RampEstimator::new(RampParams { degree })
                .fit(&field, &mask)
                .unwrap_err();
            assert!(matches!(err, InsarError::InsufficientValidPixels { .. }));
        }
    }

    #[test]
    fn test_unsupported_degree() {
        let field = ScalarField::zeros((40, 40));
        let mask = ValidityMask::all_valid((40, 40));
        for degree in [0, 3, 7] {
            let err = RampEstimator::new(RampParams { degree })
                .fit(&field, &mask)
                .unwrap_err();
            assert!(matches!(err, InsarError::UnsupportedDegree(_)));
        }
    }

    #[test]
    fn test_correction_applied_outside_fit_subset() {
        let coeffs = [1.0, 2.0, 3.0];
        let mut field = polynomial_field(50, 50, &coeffs, 1);
        // poke holes in the fit subset; the correction must still cover them
        field[[0, 0]] = f32::NAN;
        let mask = ValidityMask::finite(&field);
        let fit = RampEstimator::new(RampParams { degree: 1 })
            .fit(&field, &mask)
            .unwrap();
        // excluded pixel still gets a ramp value and stays NaN in corrected
        assert!(fit.ramp[[0, 0]].is_finite());
        assert!(fit.corrected[[0, 0]].is_nan());
        assert!(fit.corrected[[10, 10]].abs() < 1e-3);
    }
}
