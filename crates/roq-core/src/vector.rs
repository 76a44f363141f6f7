//! Inner products, projections and Gram–Schmidt on waveform vectors
//!
//! All products use the complex inner product `⟨u, v⟩ = Σ conj(u_i) · v_i`.
//!
//! ## Example
//!
//! ```rust
//! use roq_core::types::Complex;
//! use roq_core::vector::{gram_schmidt, vdot};
//!
//! let e0 = vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)];
//! let v = vec![Complex::new(3.0, 0.0), Complex::new(0.0, 4.0)];
//! let (e1, modulus) = gram_schmidt(&[e0.clone()], &v).unwrap();
//! assert!((modulus - 4.0).abs() < 1e-12);
//! assert!(vdot(&e0, &e1).norm() < 1e-12);
//! ```

use crate::types::{Complex, RoqError, RoqResult};

/// Absolute norm below which a vector cannot be normalized
pub const DEGENERATE_NORM: f64 = 1e-300;

/// Residual-to-input norm ratio below which a vector counts as already spanned
pub const DEGENERATE_RELATIVE: f64 = 1e-13;

/// Complex inner product `Σ conj(a_i) · b_i`.
#[inline]
pub fn vdot(a: &[Complex], b: &[Complex]) -> Complex {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x.conj() * y).sum()
}

/// Euclidean norm `sqrt(⟨v, v⟩)`.
#[inline]
pub fn norm(v: &[Complex]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// Remove from `v`, in place, its component along each basis vector in turn.
///
/// The component along `u` is `u · ⟨u, v⟩ / ⟨u, u⟩`, conjugating the basis
/// vector, so the residual is orthogonal to `u` for complex data too.
///
/// Each projection is taken against the running residual (modified
/// Gram–Schmidt), which agrees with the classical form for an orthonormal
/// basis and loses less orthogonality in floating point.
pub fn project_out(basis: &[Vec<Complex>], v: &mut [Complex]) {
    for u in basis {
        let scale = vdot(u, v) / vdot(u, u);
        for (x, b) in v.iter_mut().zip(u) {
            *x -= b * scale;
        }
    }
}

/// Norm of the part of `v` not spanned by `basis`.
pub fn residual_modulus(basis: &[Vec<Complex>], v: &[Complex]) -> f64 {
    let mut residual = v.to_vec();
    project_out(basis, &mut residual);
    norm(&residual)
}

/// Scale `v` to unit norm in place, returning the original norm.
pub fn normalize(v: &mut [Complex]) -> RoqResult<f64> {
    let n = norm(v);
    if !n.is_finite() || n <= DEGENERATE_NORM {
        return Err(RoqError::DegenerateProjection { norm: n });
    }
    for x in v.iter_mut() {
        *x /= n;
    }
    Ok(n)
}

/// Orthonormalize `v` against `basis`.
///
/// Returns the new unit vector and the residual modulus before
/// normalization. Fails with [`RoqError::DegenerateProjection`] when `v`
/// is (numerically) inside the span of `basis`.
pub fn gram_schmidt(basis: &[Vec<Complex>], v: &[Complex]) -> RoqResult<(Vec<Complex>, f64)> {
    let input_norm = norm(v);
    let mut residual = v.to_vec();
    project_out(basis, &mut residual);
    let remaining = norm(&residual);
    if remaining <= DEGENERATE_RELATIVE * input_norm {
        return Err(RoqError::DegenerateProjection { norm: remaining });
    }
    let modulus = normalize(&mut residual)?;
    Ok((residual, modulus))
}

/// Real part of the overlap between the unit-normalized forms of two vectors.
pub fn overlap(a: &[Complex], b: &[Complex]) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    vdot(a, b).re / (na * nb)
}

/// Index of the largest-magnitude element (first occurrence on ties).
pub fn argmax_abs(data: &[Complex]) -> Option<usize> {
    if data.is_empty() {
        return None;
    }
    let mut best_idx = 0;
    let mut best_mag2 = data[0].norm_sqr();
    for (i, z) in data.iter().enumerate().skip(1) {
        let m2 = z.norm_sqr();
        if m2 > best_mag2 {
            best_mag2 = m2;
            best_idx = i;
        }
    }
    Some(best_idx)
}

/// Index and value of the maximum of a real slice (first occurrence on ties).
///
/// NaN entries are never selected.
pub fn argmax_f64(data: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in data.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}

/// Largest pairwise `|⟨u_i, u_j⟩|` (i ≠ j) and largest `| ‖u_i‖ − 1 |`.
pub fn orthonormality_defect(basis: &[Vec<Complex>]) -> (f64, f64) {
    let mut max_cross = 0.0_f64;
    let mut max_norm_err = 0.0_f64;
    for (i, u) in basis.iter().enumerate() {
        max_norm_err = max_norm_err.max((norm(u) - 1.0).abs());
        for w in &basis[i + 1..] {
            max_cross = max_cross.max(vdot(u, w).norm());
        }
    }
    (max_cross, max_norm_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(re, im)
    }

    #[test]
    fn test_vdot_conjugates_first_argument() {
        let a = vec![c(0.0, 1.0)];
        let b = vec![c(0.0, 1.0)];
        assert_relative_eq!(vdot(&a, &b).re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(vdot(&a, &b).im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_out_leaves_orthogonal_residual() {
        let u = vec![c(0.0, 2.0), c(1.0, 0.0)];
        let mut v = vec![c(3.0, 1.0), c(5.0, -2.0)];
        project_out(&[u.clone()], &mut v);
        assert_relative_eq!(vdot(&u, &v).norm(), 0.0, epsilon = 1e-12);

        // Coefficient is ⟨u, v⟩ = Σ conj(u)·v; the unconjugated form would
        // leave a component along u
        let u = vec![c(0.0, 1.0)];
        let mut v = vec![c(1.0, 0.0)];
        project_out(&[u], &mut v);
        assert_relative_eq!(v[0].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gram_schmidt_builds_orthonormal_set() {
        let vs = vec![
            vec![c(1.0, 0.5), c(2.0, 0.0), c(0.0, -1.0), c(0.3, 0.3)],
            vec![c(0.0, 1.0), c(1.0, 1.0), c(2.0, 0.0), c(-1.0, 0.0)],
            vec![c(1.0, 0.0), c(0.0, 0.0), c(1.0, 1.0), c(0.0, 2.0)],
        ];
        let mut basis: Vec<Vec<Complex>> = Vec::new();
        for v in &vs {
            let (e, modulus) = gram_schmidt(&basis, v).unwrap();
            assert!(modulus > 0.0);
            basis.push(e);
        }
        let (cross, norm_err) = orthonormality_defect(&basis);
        assert!(cross < 1e-12);
        assert!(norm_err < 1e-12);
    }

    #[test]
    fn test_gram_schmidt_rejects_dependent_vector() {
        let e0 = vec![c(1.0, 0.0), c(0.0, 0.0)];
        let dependent = vec![c(2.0, 0.0), c(0.0, 0.0)];
        let err = gram_schmidt(&[e0], &dependent).unwrap_err();
        assert!(matches!(err, RoqError::DegenerateProjection { .. }));
    }

    #[test]
    fn test_residual_modulus() {
        let e0 = vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)];
        let v = vec![c(7.0, 0.0), c(0.0, 3.0), c(4.0, 0.0)];
        assert_relative_eq!(residual_modulus(&[e0], &v), 5.0, epsilon = 1e-12);
        assert_relative_eq!(residual_modulus(&[], &v), norm(&v), epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_is_scale_invariant() {
        let a = vec![c(1.0, 2.0), c(3.0, -1.0)];
        let b: Vec<Complex> = a.iter().map(|x| x * 4.5).collect();
        assert_relative_eq!(overlap(&a, &b), 1.0, epsilon = 1e-12);
        let neg: Vec<Complex> = a.iter().map(|x| -x).collect();
        assert_relative_eq!(overlap(&a, &neg), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_argmax_abs_first_occurrence() {
        let data = vec![c(1.0, 0.0), c(0.0, 3.0), c(-3.0, 0.0), c(1.0, 1.0)];
        assert_eq!(argmax_abs(&data), Some(1));
        assert_eq!(argmax_abs(&[]), None);
    }

    #[test]
    fn test_argmax_f64_skips_nan() {
        assert_eq!(argmax_f64(&[1.0, f64::NAN, 7.0, 7.0, 2.0]), Some((2, 7.0)));
        assert_eq!(argmax_f64(&[f64::NAN]), None);
    }
}
