//! Dense complex linear algebra for the interpolation operator
//!
//! Thin layer over `nalgebra` so the rest of the crate can stay in terms of
//! `Vec<Complex>` waveform vectors.

use nalgebra::DMatrix;

use crate::types::{Complex, RoqError, RoqResult};

/// Dense complex matrix
pub type CMatrix = DMatrix<Complex>;

/// Relative cutoff for small singular values (NumPy's `pinv` default)
pub const PINV_RCOND: f64 = 1e-15;

/// Moore–Penrose pseudo-inverse.
///
/// Singular values below `rcond * σ_max` are treated as zero, so a
/// rank-deficient system yields its minimum-norm least-squares inverse rather
/// than blowing up.
pub fn pinv(m: &CMatrix, rcond: f64) -> RoqResult<CMatrix> {
    if m.nrows() == 0 || m.ncols() == 0 {
        return Ok(CMatrix::zeros(m.ncols(), m.nrows()));
    }
    if m.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(RoqError::Numerical(format!(
            "non-finite entry in {}x{} matrix",
            m.nrows(),
            m.ncols()
        )));
    }
    let svd = m
        .clone()
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or_else(|| RoqError::Numerical(format!("SVD of {}x{} matrix did not converge", m.nrows(), m.ncols())))?;
    let sigma_max = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let cutoff = (rcond * sigma_max).max(f64::MIN_POSITIVE);
    svd.pseudo_inverse(cutoff)
        .map_err(|e| RoqError::Numerical(e.to_string()))
}

/// Matrix whose entry `(i, j)` is `columns[j][rows[i]]`.
///
/// With `columns` a set of basis vectors and `rows` a set of node indices
/// this is the interpolation matrix `V` of the empirical interpolant.
pub fn gather(columns: &[Vec<Complex>], rows: &[usize]) -> CMatrix {
    CMatrix::from_fn(rows.len(), columns.len(), |i, j| columns[j][rows[i]])
}

/// `Σ_j c_j · vectors[j]`.
pub fn combine(vectors: &[Vec<Complex>], coefficients: &[Complex], len: usize) -> Vec<Complex> {
    let mut out = vec![Complex::new(0.0, 0.0); len];
    for (v, c) in vectors.iter().zip(coefficients) {
        for (o, x) in out.iter_mut().zip(v) {
            *o += x * c;
        }
    }
    out
}

/// `m · v` for a column vector given as a slice.
pub fn mat_vec(m: &CMatrix, v: &[Complex]) -> RoqResult<Vec<Complex>> {
    if m.ncols() != v.len() {
        return Err(RoqError::LengthMismatch {
            expected: m.ncols(),
            actual: v.len(),
        });
    }
    Ok((0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)] * v[j]).sum())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(re, im)
    }

    #[test]
    fn test_pinv_of_invertible_is_inverse() {
        let m = CMatrix::from_row_slice(2, 2, &[c(2.0, 0.0), c(1.0, 1.0), c(0.0, -1.0), c(3.0, 0.0)]);
        let inv = pinv(&m, PINV_RCOND).unwrap();
        let id = &m * &inv;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(id[(i, j)].re, expected, epsilon = 1e-12);
                assert_relative_eq!(id[(i, j)].im, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_pinv_rank_deficient_is_finite() {
        // Two identical rows: rank 1
        let m = CMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(2.0, 0.0), c(1.0, 0.0), c(2.0, 0.0)]);
        let p = pinv(&m, PINV_RCOND).unwrap();
        assert!(p.iter().all(|z| z.re.is_finite() && z.im.is_finite()));
        // Penrose condition: M P M = M
        let mpm = &m * &p * &m;
        for (a, b) in mpm.iter().zip(m.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_pinv_shape_for_rectangular() {
        let m = CMatrix::from_fn(3, 2, |i, j| c((i + 2 * j) as f64, 0.5));
        let p = pinv(&m, PINV_RCOND).unwrap();
        assert_eq!(p.shape(), (2, 3));
    }

    #[test]
    fn test_pinv_rejects_nan() {
        let m = CMatrix::from_element(2, 2, c(f64::NAN, 0.0));
        assert!(matches!(pinv(&m, PINV_RCOND), Err(RoqError::Numerical(_))));
    }

    #[test]
    fn test_gather_and_combine() {
        let cols = vec![
            vec![c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0)],
            vec![c(0.0, 1.0), c(0.0, 2.0), c(0.0, 3.0)],
        ];
        let v = gather(&cols, &[2, 0]);
        assert_eq!(v.shape(), (2, 2));
        assert_eq!(v[(0, 0)], c(3.0, 0.0));
        assert_eq!(v[(1, 1)], c(0.0, 1.0));

        let sum = combine(&cols, &[c(1.0, 0.0), c(0.0, 1.0)], 3);
        assert_eq!(sum[1], c(2.0 - 2.0, 0.0));
    }

    #[test]
    fn test_mat_vec_checks_length() {
        let m = CMatrix::identity(2, 2);
        assert!(mat_vec(&m, &[c(1.0, 0.0)]).is_err());
        let out = mat_vec(&m, &[c(1.0, 0.0), c(0.0, 2.0)]).unwrap();
        assert_eq!(out, vec![c(1.0, 0.0), c(0.0, 2.0)]);
    }
}
