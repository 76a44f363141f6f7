//! Statistical certification of a surrogate
//!
//! Fresh random points, never the training candidates, are evaluated
//! through the oracle and through the surrogate. The per-point surrogate
//! error is
//!
//! ```text
//!   err = (1 − Re⟨ĥ/‖ĥ‖, h/‖h‖⟩) · Δf
//! ```
//!
//! and a surrogate passes when no point exceeds the tolerance. The `Δf`
//! factor is part of what "tolerance" means for persisted bases and must
//! stay.

use tracing::{debug, info, warn};

use crate::eim::EmpiricalInterpolant;
use crate::oracle::EvaluationContext;
use crate::operator::RoqOperator;
use crate::parallel::CandidatePool;
use crate::params::ParameterSpace;
use crate::sampler::ParameterSampler;
use crate::types::{Complex, Flavor, RoqError, RoqResult, WaveformVector};
use crate::vector::overlap;

/// Default number of held-out points per certification
pub const DEFAULT_TEST_SAMPLES: usize = 1000;

/// Default redraw budget, as a multiple of the sample count
pub const DEFAULT_RETRY_FACTOR: usize = 4;

/// Anything that rebuilds a full-grid vector from itself
pub trait Surrogate: Sync {
    /// Number of nodes / basis vectors used
    fn ndim(&self) -> usize;

    fn approximate(&self, h: &[Complex]) -> RoqResult<WaveformVector>;
}

/// An interpolant paired with the basis it was built from
pub struct InterpolatedBasis<'a> {
    pub interpolant: &'a EmpiricalInterpolant,
    pub basis: &'a [WaveformVector],
}

impl Surrogate for InterpolatedBasis<'_> {
    fn ndim(&self) -> usize {
        self.interpolant.ndim()
    }

    fn approximate(&self, h: &[Complex]) -> RoqResult<WaveformVector> {
        self.interpolant.interpolate(self.basis, h)
    }
}

impl Surrogate for RoqOperator {
    fn ndim(&self) -> usize {
        self.nnodes()
    }

    fn approximate(&self, h: &[Complex]) -> RoqResult<WaveformVector> {
        self.reconstruct(h)
    }
}

/// `(1 − overlap(h, ĥ)) · Δf`
pub fn surrogate_error(h: &[Complex], approx: &[Complex], delta_f: f64) -> f64 {
    (1.0 - overlap(h, approx)) * delta_f
}

/// Per-sample errors from one certification pass
#[derive(Debug, Clone, PartialEq)]
pub struct Certification {
    /// Realized surrogate dimension
    pub dimension: usize,
    pub tolerance: f64,
    pub errors: Vec<f64>,
    /// Samples with error above the tolerance (NaN counts as above)
    pub violations: usize,
    /// Samples the oracle rejected and that were redrawn
    pub skipped: usize,
}

impl Certification {
    pub fn passed(&self) -> bool {
        self.violations == 0 && !self.errors.is_empty()
    }

    pub fn max_error(&self) -> f64 {
        self.errors.iter().cloned().fold(0.0, f64::max)
    }

    pub fn mean_error(&self) -> f64 {
        if self.errors.is_empty() {
            return 0.0;
        }
        self.errors.iter().sum::<f64>() / self.errors.len() as f64
    }
}

/// Certifies surrogates of one flavor against fresh samples
pub struct SurrogateValidator<'a> {
    ctx: &'a EvaluationContext<'a>,
    space: &'a ParameterSpace,
    pool: &'a CandidatePool,
    flavor: Flavor,
    samples: usize,
    retry_factor: usize,
}

impl<'a> SurrogateValidator<'a> {
    pub fn new(ctx: &'a EvaluationContext<'a>, space: &'a ParameterSpace, flavor: Flavor, pool: &'a CandidatePool) -> Self {
        Self {
            ctx,
            space,
            pool,
            flavor,
            samples: DEFAULT_TEST_SAMPLES,
            retry_factor: DEFAULT_RETRY_FACTOR,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_retry_factor(mut self, retry_factor: usize) -> Self {
        self.retry_factor = retry_factor.max(1);
        self
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Surrogate errors for `samples` fresh points.
    ///
    /// Points the oracle rejects are redrawn until the budget of
    /// `samples * retry_factor` draws is spent. Returns the errors and the
    /// number of rejected draws, or [`RoqError::InsufficientSamples`] when
    /// the budget ran out first.
    pub fn errors(&self, sampler: &mut ParameterSampler, surrogate: &dyn Surrogate) -> RoqResult<(Vec<f64>, usize)> {
        let delta_f = self.ctx.grid.delta_f;
        let budget = self.samples.saturating_mul(self.retry_factor);
        let mut errors = Vec::with_capacity(self.samples);
        let mut drawn = 0;
        let mut skipped = 0;

        while errors.len() < self.samples && drawn < budget {
            let want = (self.samples - errors.len()).min(budget - drawn);
            let points = sampler.sample_points(want, self.space);
            drawn += want;
            let results = self.pool.map(&points, |point| -> RoqResult<f64> {
                let h = self.ctx.waveform(point, self.flavor)?;
                let approx = surrogate.approximate(&h)?;
                Ok(surrogate_error(&h, &approx, delta_f))
            });
            for (point, result) in points.iter().zip(results) {
                match result {
                    Ok(err) => errors.push(err),
                    Err(e) if e.is_candidate_local() => {
                        debug!(error = %e, ?point, "redrawing certification sample");
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if errors.len() < self.samples {
            warn!(
                flavor = %self.flavor,
                wanted = self.samples,
                got = errors.len(),
                drawn,
                "certification sample budget exhausted"
            );
            return Err(RoqError::InsufficientSamples {
                flavor: self.flavor,
                dimension: surrogate.ndim(),
                evaluated: errors.len(),
                requested: self.samples,
                region: self.space.to_string(),
            });
        }
        Ok((errors, skipped))
    }

    /// Pass/fail against `tolerance` over fresh samples.
    pub fn certify(
        &self,
        sampler: &mut ParameterSampler,
        surrogate: &dyn Surrogate,
        tolerance: f64,
    ) -> RoqResult<Certification> {
        let (errors, skipped) = self.errors(sampler, surrogate)?;
        let violations = errors.iter().filter(|&&e| e.is_nan() || e > tolerance).count();
        let cert = Certification {
            dimension: surrogate.ndim(),
            tolerance,
            errors,
            violations,
            skipped,
        };
        info!(
            flavor = %self.flavor,
            dimension = cert.dimension,
            violations,
            max_error = cert.max_error(),
            tolerance,
            "certification pass"
        );
        Ok(cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::{ChirpOracle, LowRankOracle};
    use crate::oracle::ModelConfig;
    use crate::params::{ExtensionKind, ParameterRanges};
    use crate::types::FrequencyGrid;
    use approx::assert_relative_eq;

    fn unit(i: usize, n: usize) -> Vec<Complex> {
        (0..n)
            .map(|j| if i == j { Complex::new(1.0, 0.0) } else { Complex::new(0.0, 0.0) })
            .collect()
    }

    fn default_space() -> ParameterSpace {
        ParameterSpace::from_ranges(&ParameterRanges::default(), ExtensionKind::None).unwrap()
    }

    #[test]
    fn test_surrogate_error_metric() {
        let h = vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)];
        assert_relative_eq!(surrogate_error(&h, &h, 0.25), 0.0, epsilon = 1e-15);
        let orthogonal = vec![Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)];
        assert_relative_eq!(surrogate_error(&h, &orthogonal, 0.25), 0.25, epsilon = 1e-15);
        // Scale-invariant
        let scaled: Vec<Complex> = h.iter().map(|z| z * 7.0).collect();
        assert_relative_eq!(surrogate_error(&h, &scaled, 1.0), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_perfect_basis_passes() {
        let oracle = LowRankOracle { rank: 2 };
        let grid = FrequencyGrid::new(1.0, 5.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let space = default_space();
        let pool = CandidatePool::new(true, 2).unwrap();
        let basis = vec![unit(0, 4), unit(1, 4)];
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        let surrogate = InterpolatedBasis {
            interpolant: &eim,
            basis: &basis,
        };

        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(50);
        let cert = validator
            .certify(&mut ParameterSampler::with_seed(11), &surrogate, 1.0)
            .unwrap();
        assert!(cert.passed());
        assert_eq!(cert.violations, 0);
        assert_eq!(cert.errors.len(), 50);
        assert_eq!(cert.dimension, 2);
        assert!(cert.max_error() < 1e-12);
    }

    #[test]
    fn test_poor_basis_fails() {
        let oracle = ChirpOracle;
        let grid = FrequencyGrid::new(20.0, 40.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let space = default_space();
        let pool = CandidatePool::sequential();
        let basis = vec![unit(0, 20), unit(1, 20)];
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        let surrogate = InterpolatedBasis {
            interpolant: &eim,
            basis: &basis,
        };
        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(10);
        let cert = validator
            .certify(&mut ParameterSampler::with_seed(5), &surrogate, 1e-6)
            .unwrap();
        assert!(!cert.passed());
        assert_eq!(cert.violations, 10);
    }

    #[test]
    fn test_rejected_samples_are_redrawn() {
        let oracle = ChirpOracle;
        let grid = FrequencyGrid::new(20.0, 24.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        // Half of the spin range is rejected by the oracle
        let mut ranges = ParameterRanges::default();
        ranges.spin1.magnitude = [0.8, 1.0];
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let basis: Vec<_> = (0..4).map(|i| unit(i, 4)).collect();
        let eim = EmpiricalInterpolant::build(&basis, 4).unwrap();
        let surrogate = InterpolatedBasis {
            interpolant: &eim,
            basis: &basis,
        };
        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool)
            .with_samples(20)
            .with_retry_factor(10);
        let cert = validator
            .certify(&mut ParameterSampler::with_seed(2), &surrogate, 1.0)
            .unwrap();
        assert_eq!(cert.errors.len(), 20);
        assert!(cert.skipped > 0);
        assert!(cert.passed());
    }

    #[test]
    fn test_all_rejected_is_an_error() {
        let oracle = ChirpOracle;
        let ctx = EvaluationContext::new(&oracle, FrequencyGrid::new(20.0, 24.0, 1.0), 1.0, ModelConfig::default());
        let mut ranges = ParameterRanges::default();
        ranges.spin1.magnitude = [0.95, 0.99];
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let basis: Vec<_> = (0..2).map(|i| unit(i, 4)).collect();
        let eim = EmpiricalInterpolant::build(&basis, 2).unwrap();
        let surrogate = InterpolatedBasis {
            interpolant: &eim,
            basis: &basis,
        };
        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(5);
        assert!(matches!(
            validator.certify(&mut ParameterSampler::with_seed(2), &surrogate, 1.0),
            Err(RoqError::InsufficientSamples { evaluated: 0, requested: 5, .. })
        ));
    }

    #[test]
    fn test_short_sample_count_never_certifies() {
        let oracle = ChirpOracle;
        let ctx = EvaluationContext::new(&oracle, FrequencyGrid::new(20.0, 24.0, 1.0), 1.0, ModelConfig::default());
        // Almost every draw lands above the oracle's spin limit
        let mut ranges = ParameterRanges::default();
        ranges.spin1.magnitude = [0.897, 1.0];
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let basis: Vec<_> = (0..4).map(|i| unit(i, 4)).collect();
        let eim = EmpiricalInterpolant::build(&basis, 4).unwrap();
        let surrogate = InterpolatedBasis {
            interpolant: &eim,
            basis: &basis,
        };
        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool)
            .with_samples(100)
            .with_retry_factor(1);
        match validator.certify(&mut ParameterSampler::with_seed(7), &surrogate, 1.0) {
            Err(RoqError::InsufficientSamples {
                flavor,
                dimension,
                evaluated,
                requested,
                region,
            }) => {
                assert_eq!(flavor, Flavor::Linear);
                assert_eq!(dimension, 4);
                assert!(evaluated < requested);
                assert_eq!(requested, 100);
                assert!(region.contains("s1_mag [0.897, 1]"));
            }
            other => panic!("unexpected: {:?}", other.map(|c| c.errors.len())),
        }
    }
}
