//! Tolerance-driven dimension search
//!
//! Dimensions are scanned in increasing order, `low, low + step, …` with
//! `high` excluded. At each one the leading basis vectors get a fresh
//! empirical interpolant and a certification pass; the first dimension that
//! passes wins. Error is not assumed to be monotonic in the dimension.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::basis::Basis;
use crate::cancel::CancelToken;
use crate::eim::EmpiricalInterpolant;
use crate::io::artifact;
use crate::operator::RoqOperator;
use crate::sampler::ParameterSampler;
use crate::types::{FrequencyGrid, RoqError, RoqResult};
use crate::validate::{Certification, InterpolatedBasis, SurrogateValidator};

/// Scanned dimensions: `low..high` by `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub low: usize,
    /// Exclusive
    pub high: usize,
    pub step: usize,
}

impl DimensionRange {
    pub fn new(low: usize, high: usize, step: usize) -> RoqResult<Self> {
        let range = Self { low, high, step };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> RoqResult<()> {
        if self.low < 2 {
            return Err(RoqError::Config(format!(
                "dimension search must start at 2 or more, got {}",
                self.low
            )));
        }
        if self.step == 0 {
            return Err(RoqError::Config("dimension step must be positive".to_string()));
        }
        if self.high <= self.low {
            return Err(RoqError::Config(format!(
                "empty dimension range {}..{}",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// The scanned dimensions, ascending
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        (self.low..self.high).step_by(self.step.max(1))
    }
}

/// One scanned dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanStep {
    pub requested: usize,
    pub realized: usize,
    pub violations: usize,
    pub max_error: f64,
}

/// The accepted surrogate
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub requested: usize,
    pub interpolant: EmpiricalInterpolant,
    pub operator: RoqOperator,
    pub certification: Certification,
    pub scanned: Vec<ScanStep>,
}

/// Linear scan over basis dimension for one flavor
pub struct RoqSearch<'a> {
    validator: &'a SurrogateValidator<'a>,
    range: DimensionRange,
    tolerance: f64,
    output: Option<PathBuf>,
}

impl<'a> RoqSearch<'a> {
    pub fn new(validator: &'a SurrogateValidator<'a>, range: DimensionRange, tolerance: f64) -> Self {
        Self {
            validator,
            range,
            tolerance,
            output: None,
        }
    }

    /// Persist the accepted operator into `dir`.
    pub fn with_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    pub fn range(&self) -> DimensionRange {
        self.range
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn unachievable(&self, basis: &Basis) -> RoqError {
        RoqError::ToleranceUnachievable {
            flavor: basis.flavor(),
            tolerance: self.tolerance,
            low: self.range.low,
            high: self.range.high,
            step: self.range.step,
        }
    }

    /// Scan the range and return the first certified surrogate.
    ///
    /// Dimensions larger than the basis cannot be interpolated and are not
    /// scanned. Exhausting the range fails with
    /// [`RoqError::ToleranceUnachievable`].
    pub fn run(
        &self,
        basis: &Basis,
        grid: &FrequencyGrid,
        sampler: &mut ParameterSampler,
        cancel: &CancelToken,
    ) -> RoqResult<SearchOutcome> {
        self.range.validate()?;
        if self.range.iter().any(|d| d > basis.len()) {
            warn!(
                flavor = %basis.flavor(),
                basis_size = basis.len(),
                low = self.range.low,
                high = self.range.high,
                "dimension range exceeds the basis; larger dimensions are skipped"
            );
        }

        let mut scanned = Vec::new();
        for requested in self.range.iter().take_while(|&d| d <= basis.len()) {
            if cancel.is_cancelled() {
                return Err(RoqError::SearchCancelled {
                    flavor: basis.flavor(),
                    dimension: requested,
                });
            }
            let interpolant = EmpiricalInterpolant::build(basis.vectors(), requested)?;
            let surrogate = InterpolatedBasis {
                interpolant: &interpolant,
                basis: basis.vectors(),
            };
            let certification = self.validator.certify(sampler, &surrogate, self.tolerance)?;
            scanned.push(ScanStep {
                requested,
                realized: interpolant.ndim(),
                violations: certification.violations,
                max_error: certification.max_error(),
            });
            info!(
                flavor = %basis.flavor(),
                requested,
                realized = interpolant.ndim(),
                violations = certification.violations,
                mean_error = certification.mean_error(),
                tolerance = self.tolerance,
                "scanned dimension"
            );

            if certification.passed() {
                let operator = RoqOperator::from_interpolant(&interpolant, basis, grid)?;
                if let Some(dir) = &self.output {
                    artifact::save_operator(dir, &operator)?;
                }
                info!(
                    flavor = %basis.flavor(),
                    dimension = interpolant.ndim(),
                    "surrogate certified"
                );
                return Ok(SearchOutcome {
                    requested,
                    interpolant,
                    operator,
                    certification,
                    scanned,
                });
            }
        }
        Err(self.unachievable(basis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisBuilder;
    use crate::oracle::testing::{ChirpOracle, LowRankOracle};
    use crate::oracle::{EvaluationContext, ModelConfig};
    use crate::parallel::CandidatePool;
    use crate::params::{ExtensionKind, ParameterRanges, ParameterSpace};
    use crate::types::Flavor;

    #[test]
    fn test_range_iteration_excludes_high() {
        let range = DimensionRange::new(2, 8, 3).unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![2, 5]);
        assert!(DimensionRange::new(1, 8, 1).is_err());
        assert!(DimensionRange::new(2, 8, 0).is_err());
        assert!(DimensionRange::new(4, 4, 1).is_err());
    }

    #[test]
    fn test_first_passing_dimension_is_accepted() {
        let oracle = LowRankOracle { rank: 3 };
        let grid = FrequencyGrid::new(1.0, 9.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let space = ParameterSpace::from_ranges(&ParameterRanges::default(), ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let mut builder = BasisBuilder::new(&ctx, &space, Flavor::Linear, &pool, ParameterSampler::with_seed(1), 16);
        let basis = builder.build(2, &CancelToken::new(), None).unwrap().clone();
        assert_eq!(basis.len(), 3);

        let dir = tempfile::tempdir().unwrap();
        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(30);
        let search = RoqSearch::new(&validator, DimensionRange::new(2, 6, 1).unwrap(), 1e-10).with_output(dir.path());
        let outcome = search
            .run(&basis, &grid, &mut ParameterSampler::with_seed(2), &CancelToken::new())
            .unwrap();

        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.operator.nnodes(), 3);
        assert_eq!(outcome.scanned.len(), 2);
        assert!(outcome.scanned[0].violations > 0);
        let saved = artifact::load_operator(dir.path(), Flavor::Linear).unwrap();
        assert_eq!(saved.nodes, outcome.operator.nodes);
    }

    #[test]
    fn test_insufficient_rank_is_unachievable() {
        let oracle = ChirpOracle;
        let grid = FrequencyGrid::new(20.0, 60.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let ranges = ParameterRanges {
            chirp_mass: [1.0, 3.0],
            ..Default::default()
        };
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let mut builder = BasisBuilder::new(&ctx, &space, Flavor::Linear, &pool, ParameterSampler::with_seed(4), 20);
        let basis = builder.build(3, &CancelToken::new(), None).unwrap().clone();

        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(20);
        let search = RoqSearch::new(&validator, DimensionRange::new(2, 4, 1).unwrap(), 1e-14);
        match search.run(&basis, &grid, &mut ParameterSampler::with_seed(5), &CancelToken::new()) {
            Err(RoqError::ToleranceUnachievable { flavor, low, high, .. }) => {
                assert_eq!(flavor, Flavor::Linear);
                assert_eq!((low, high), (2, 4));
            }
            other => panic!("expected ToleranceUnachievable, got {:?}", other.map(|o| o.requested)),
        }
    }

    #[test]
    fn test_range_beyond_basis_is_unachievable() {
        let oracle = LowRankOracle { rank: 2 };
        let grid = FrequencyGrid::new(1.0, 5.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let space = ParameterSpace::from_ranges(&ParameterRanges::default(), ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let mut builder = BasisBuilder::new(&ctx, &space, Flavor::Linear, &pool, ParameterSampler::with_seed(1), 8);
        let basis = builder.build(1, &CancelToken::new(), None).unwrap().clone();

        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(5);
        let search = RoqSearch::new(&validator, DimensionRange::new(3, 6, 1).unwrap(), 1.0);
        assert!(matches!(
            search.run(&basis, &grid, &mut ParameterSampler::with_seed(1), &CancelToken::new()),
            Err(RoqError::ToleranceUnachievable { .. })
        ));
    }

    #[test]
    fn test_cancel_names_the_dimension() {
        let oracle = LowRankOracle { rank: 3 };
        let grid = FrequencyGrid::new(1.0, 9.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let space = ParameterSpace::from_ranges(&ParameterRanges::default(), ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let mut builder = BasisBuilder::new(&ctx, &space, Flavor::Linear, &pool, ParameterSampler::with_seed(1), 16);
        let basis = builder.build(2, &CancelToken::new(), None).unwrap().clone();

        let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(5);
        let search = RoqSearch::new(&validator, DimensionRange::new(2, 4, 1).unwrap(), 1e-10);
        let cancel = CancelToken::new();
        cancel.cancel();
        match search.run(&basis, &grid, &mut ParameterSampler::with_seed(2), &cancel) {
            Err(RoqError::SearchCancelled { flavor, dimension }) => {
                assert_eq!(flavor, Flavor::Linear);
                assert_eq!(dimension, 2);
            }
            other => panic!("unexpected: {:?}", other.map(|o| o.requested)),
        }
    }

    #[test]
    fn test_mean_error_does_not_grow_with_dimension() {
        let oracle = ChirpOracle;
        let grid = FrequencyGrid::new(20.0, 60.0, 1.0);
        let ctx = EvaluationContext::new(&oracle, grid, 1.0, ModelConfig::default());
        let ranges = ParameterRanges {
            chirp_mass: [1.0, 1.4],
            ..Default::default()
        };
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::None).unwrap();
        let pool = CandidatePool::sequential();
        let dims = [2usize, 3, 4, 5];
        let seeds = 10u64;

        let mut means = vec![0.0; dims.len()];
        for seed in 0..seeds {
            let mut builder =
                BasisBuilder::new(&ctx, &space, Flavor::Linear, &pool, ParameterSampler::with_seed(seed), 30);
            let basis = builder.build(4, &CancelToken::new(), None).unwrap().clone();
            assert_eq!(basis.len(), 5);

            let validator = SurrogateValidator::new(&ctx, &space, Flavor::Linear, &pool).with_samples(40);
            let mut sampler = ParameterSampler::with_seed(1000 + seed);
            for (k, &ndim) in dims.iter().enumerate() {
                let interpolant = EmpiricalInterpolant::build(basis.vectors(), ndim).unwrap();
                let surrogate = InterpolatedBasis {
                    interpolant: &interpolant,
                    basis: basis.vectors(),
                };
                let cert = validator.certify(&mut sampler, &surrogate, 1.0).unwrap();
                means[k] += cert.mean_error() / seeds as f64;
            }
        }

        for pair in means.windows(2) {
            assert!(pair[1] <= pair[0] * 1.05, "mean errors by dimension: {:?}", means);
        }
        assert!(means[dims.len() - 1] < means[0]);
    }
}
