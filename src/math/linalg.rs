//! Symmetric matrix helpers built on nalgebra
//!
//! Covariance matrices produced by the empirical estimator are symmetric
//! positive semi-definite. Eigenvalues that drift slightly negative through
//! round-off are clamped to zero before logs and square roots.

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};

/// Log-determinant of a symmetric positive semi-definite matrix
///
/// Returns `-inf` for singular matrices rather than failing.
pub fn log_det_psd(matrix: &DMatrix<f64>) -> f64 {
    if matrix.nrows() == 0 {
        return 0.0;
    }
    if let Some(cholesky) = Cholesky::new(matrix.clone()) {
        return 2.0 * cholesky.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    }
    SymmetricEigen::new(matrix.clone())
        .eigenvalues
        .iter()
        .map(|&lambda| lambda.max(0.0).ln())
        .sum()
}

/// Apply a scalar function to the eigenvalues of a symmetric matrix
pub fn map_eigenvalues(matrix: &DMatrix<f64>, f: impl Fn(f64) -> f64) -> DMatrix<f64> {
    let eigen = SymmetricEigen::new(matrix.clone());
    let mapped = DVector::from_iterator(
        eigen.eigenvalues.len(),
        eigen.eigenvalues.iter().map(|&lambda| f(lambda)),
    );
    &eigen.eigenvectors * DMatrix::from_diagonal(&mapped) * eigen.eigenvectors.transpose()
}

/// Principal square root of a symmetric positive semi-definite matrix
pub fn sqrt_psd(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    map_eigenvalues(matrix, |lambda| lambda.max(0.0).sqrt())
}

/// Inverse square root of a symmetric positive definite matrix
pub fn inv_sqrt_spd(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    map_eigenvalues(matrix, |lambda| 1.0 / lambda.max(f64::MIN_POSITIVE).sqrt())
}

/// Floor the eigenvalues of a symmetric matrix at `ridge · scale`
///
/// `scale` is the mean diagonal magnitude (at least 1), so the floor stays
/// meaningful for covariances of 16-bit data. Well-conditioned input is
/// returned unchanged; near-singular input, including variances that are
/// only round-off noise, is lifted to the same floor as an exactly singular
/// one.
pub fn regularized(matrix: &DMatrix<f64>, ridge: f64) -> DMatrix<f64> {
    let dimension = matrix.nrows();
    if dimension == 0 {
        return matrix.clone();
    }
    let floor = ridge * (matrix.trace().abs() / dimension as f64).max(1.0);
    let eigen = SymmetricEigen::new(matrix.clone());
    if eigen.eigenvalues.iter().all(|&lambda| lambda >= floor) {
        return matrix.clone();
    }
    map_eigenvalues(matrix, |lambda| lambda.max(floor))
}

/// Inverse of a symmetric positive definite matrix via Cholesky
///
/// Falls back to a ridge-regularised inverse for singular input, so callers
/// always receive a finite matrix.
pub fn spd_inverse(matrix: &DMatrix<f64>, ridge: f64) -> DMatrix<f64> {
    let stable = regularized(matrix, ridge);
    Cholesky::new(stable.clone()).map_or_else(
        || map_eigenvalues(&stable, |lambda| 1.0 / lambda.max(ridge)),
        |cholesky| cholesky.inverse(),
    )
}

/// Quadratic form xᵀ A x
pub fn quadratic_form(matrix: &DMatrix<f64>, vector: &DVector<f64>) -> f64 {
    vector.dot(&(matrix * vector))
}
