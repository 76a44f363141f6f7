//! Empirical interpolation (EIM) node selection
//!
//! Given an ordered basis `e_0, e_1, …`, EIM picks one frequency bin per
//! basis vector such that any vector in the span can be rebuilt from its
//! values at those bins alone:
//!
//! ```text
//!   node_0 = argmax |e_0|
//!   for k = 1..ndim:
//!       c     = pinv(V_k) · e_k[nodes]       V_k[i][j] = e_j[node_i], j < k
//!       r     = Σ_j c_j e_j − e_k
//!       node  = argmax |r|
//! ```
//!
//! Nodes live in a sorted set. A bin selected twice (possible when the
//! basis is numerically degenerate) is collapsed, so the realized dimension
//! can be smaller than requested; read it back from
//! [`EmpiricalInterpolant::ndim`].

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::linalg::{self, CMatrix, PINV_RCOND};
use crate::types::{Complex, RoqError, RoqResult, WaveformVector};
use crate::vector::argmax_abs;

/// Selected nodes and the inverse interpolation matrix
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalInterpolant {
    requested: usize,
    nodes: Vec<usize>,
    /// `pinv(V)` with `V[i][j] = basis_j[node_i]`, shape `ndim × ndim`
    inverse_v: CMatrix,
}

impl EmpiricalInterpolant {
    /// Select nodes for the first `ndim` vectors of `basis`.
    pub fn build(basis: &[WaveformVector], ndim: usize) -> RoqResult<Self> {
        if basis.len() < 2 || ndim < 2 || ndim > basis.len() {
            return Err(RoqError::InsufficientBasis {
                available: basis.len(),
                requested: ndim,
            });
        }
        let len = basis[0].len();
        if let Some(bad) = basis.iter().find(|v| v.len() != len) {
            return Err(RoqError::LengthMismatch {
                expected: len,
                actual: bad.len(),
            });
        }
        let first = argmax_abs(&basis[0]).ok_or(RoqError::LengthMismatch {
            expected: 1,
            actual: 0,
        })?;

        let mut nodes = BTreeSet::from([first]);
        for k in 1..ndim {
            let chosen: Vec<usize> = nodes.iter().copied().collect();
            let v = linalg::gather(&basis[..k], &chosen);
            let inv = linalg::pinv(&v, PINV_RCOND)?;
            let at_nodes: Vec<Complex> = chosen.iter().map(|&n| basis[k][n]).collect();
            let coefficients = linalg::mat_vec(&inv, &at_nodes)?;
            let mut residual = linalg::combine(&basis[..k], &coefficients, len);
            for (r, e) in residual.iter_mut().zip(&basis[k]) {
                *r -= e;
            }
            // residual is non-empty: len >= 1 was checked above
            let node = argmax_abs(&residual).unwrap_or(0);
            if !nodes.insert(node) {
                warn!(step = k, node, "duplicate empirical node collapsed");
            }
        }

        let nodes: Vec<usize> = nodes.into_iter().collect();
        let realized = nodes.len();
        if realized < ndim {
            debug!(requested = ndim, realized, "empirical interpolant has fewer nodes than requested");
        }
        let v = linalg::gather(&basis[..realized], &nodes);
        let inverse_v = linalg::pinv(&v, PINV_RCOND)?;
        Ok(Self {
            requested: ndim,
            nodes,
            inverse_v,
        })
    }

    /// Dimension asked for at build time
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Realized dimension: the number of distinct nodes
    pub fn ndim(&self) -> usize {
        self.nodes.len()
    }

    /// Node bin indices, strictly increasing
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn inverse_v(&self) -> &CMatrix {
        &self.inverse_v
    }

    /// Values of `h` at the nodes.
    pub fn sample(&self, h: &[Complex]) -> RoqResult<Vec<Complex>> {
        match self.nodes.last() {
            Some(&last) if last >= h.len() => Err(RoqError::LengthMismatch {
                expected: last + 1,
                actual: h.len(),
            }),
            _ => Ok(self.nodes.iter().map(|&n| h[n]).collect()),
        }
    }

    /// Basis coefficients for a vector known only at the nodes.
    pub fn coefficients(&self, values: &[Complex]) -> RoqResult<Vec<Complex>> {
        linalg::mat_vec(&self.inverse_v, values)
    }

    /// Rebuild a full-length vector from its node values.
    pub fn reconstruct(&self, basis: &[WaveformVector], values: &[Complex]) -> RoqResult<WaveformVector> {
        let used = self.used_basis(basis)?;
        let coefficients = self.coefficients(values)?;
        Ok(linalg::combine(used, &coefficients, used[0].len()))
    }

    /// Interpolate `h` through its node values.
    pub fn interpolate(&self, basis: &[WaveformVector], h: &[Complex]) -> RoqResult<WaveformVector> {
        self.reconstruct(basis, &self.sample(h)?)
    }

    /// The reduced operator `B`, one row per node (`ndim × N`).
    ///
    /// Row `i` is `Σ_j inverse_v[j][i] · basis_j`, so that
    /// `ĥ[f] = Σ_i B[i][f] · h[node_i]`.
    pub fn operator(&self, basis: &[WaveformVector]) -> RoqResult<CMatrix> {
        let used = self.used_basis(basis)?;
        let len = used[0].len();
        let ndim = self.ndim();
        Ok(CMatrix::from_fn(ndim, len, |i, f| {
            (0..ndim).map(|j| self.inverse_v[(j, i)] * used[j][f]).sum()
        }))
    }

    fn used_basis<'b>(&self, basis: &'b [WaveformVector]) -> RoqResult<&'b [WaveformVector]> {
        if basis.len() < self.ndim() || self.ndim() == 0 {
            return Err(RoqError::InsufficientBasis {
                available: basis.len(),
                requested: self.ndim(),
            });
        }
        Ok(&basis[..self.ndim()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{gram_schmidt, norm, normalize};
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(re, im)
    }

    fn unit(i: usize, n: usize) -> Vec<Complex> {
        (0..n).map(|j| if i == j { c(1.0, 0.0) } else { c(0.0, 0.0) }).collect()
    }

    /// Orthonormal basis from a family of damped chirps
    fn chirp_basis(count: usize, len: usize) -> Vec<WaveformVector> {
        let mut basis: Vec<WaveformVector> = Vec::new();
        for k in 0..count {
            let v: Vec<Complex> = (0..len)
                .map(|i| {
                    let x = i as f64 / len as f64;
                    Complex::from_polar((-x * (1.0 + k as f64 * 0.3)).exp(), 6.0 * x * (1.0 + 0.1 * k as f64))
                })
                .collect();
            if basis.is_empty() {
                let mut v = v;
                normalize(&mut v).unwrap();
                basis.push(v);
            } else {
                basis.push(gram_schmidt(&basis, &v).unwrap().0);
            }
        }
        basis
    }

    #[test]
    fn test_toy_unit_basis() {
        let basis = vec![unit(0, 4), unit(1, 4)];
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        assert_eq!(eim.nodes(), &[0, 1]);
        assert_eq!(eim.ndim(), 2);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(eim.inverse_v()[(i, j)].re, expected, epsilon = 1e-12);
            }
        }
        let h = vec![c(2.0, -1.0), c(0.5, 3.0), c(0.0, 0.0), c(0.0, 0.0)];
        let rebuilt = eim.interpolate(&basis, &h).unwrap();
        for (a, b) in rebuilt.iter().zip(&h) {
            assert_relative_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_insufficient_basis() {
        let basis = vec![unit(0, 4)];
        assert!(matches!(
            EmpiricalInterpolant::build(&basis, 1),
            Err(RoqError::InsufficientBasis { available: 1, .. })
        ));
        let basis = vec![unit(0, 4), unit(1, 4)];
        assert!(matches!(
            EmpiricalInterpolant::build(&basis, 3),
            Err(RoqError::InsufficientBasis { available: 2, requested: 3 })
        ));
    }

    #[test]
    fn test_build_is_idempotent() {
        let basis = chirp_basis(6, 64);
        let a = EmpiricalInterpolant::build(&basis, 6).unwrap();
        let b = EmpiricalInterpolant::build(&basis, 6).unwrap();
        assert_eq!(a, b);
        assert!(a.nodes().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_basis_vectors_reproduce_exactly() {
        let basis = chirp_basis(5, 48);
        let eim = EmpiricalInterpolant::build(&basis, 5).unwrap();
        assert_eq!(eim.ndim(), 5);
        for e in &basis {
            let rebuilt = eim.interpolate(&basis, e).unwrap();
            let err: Vec<Complex> = rebuilt.iter().zip(e).map(|(a, b)| a - b).collect();
            assert!(norm(&err) < 1e-9, "reconstruction error {}", norm(&err));
        }
    }

    #[test]
    fn test_operator_matches_reconstruct() {
        let basis = chirp_basis(4, 32);
        let eim = EmpiricalInterpolant::build(&basis, 4).unwrap();
        let b = eim.operator(&basis).unwrap();
        assert_eq!(b.shape(), (4, 32));

        let h: Vec<Complex> = basis[1].iter().zip(&basis[3]).map(|(x, y)| x * 2.0 - y).collect();
        let values = eim.sample(&h).unwrap();
        let via_b: Vec<Complex> = (0..32).map(|f| (0..4).map(|i| b[(i, f)] * values[i]).sum()).collect();
        let direct = eim.reconstruct(&basis, &values).unwrap();
        for (x, y) in via_b.iter().zip(&direct) {
            assert_relative_eq!((x - y).norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_duplicate_node_is_collapsed() {
        let basis = vec![unit(0, 3), unit(0, 3)];
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        assert_eq!(eim.requested(), 2);
        assert_eq!(eim.ndim(), 1);
        assert_eq!(eim.nodes(), &[0]);
    }

    #[test]
    fn test_sample_checks_length() {
        let basis = vec![unit(0, 4), unit(3, 4)];
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        assert_eq!(eim.nodes(), &[0, 3]);
        assert!(eim.sample(&[c(1.0, 0.0); 2]).is_err());
    }
}
