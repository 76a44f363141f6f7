//! End-to-end build driver
//!
//! ```text
//!   RoqConfig ──► ParameterSpace ──► BasisBuilder (linear) ──► RoqSearch ──► B_linear
//!                                └─► BasisBuilder (quadratic) ─► RoqSearch ──► B_quadratic
//! ```
//!
//! Both flavors share one oracle, one worker pool and one checkpoint
//! writer. The writer is drained before the run reports success.

use std::path::Path;
use tracing::{info, warn};

use crate::analysis::error_distribution;
use crate::basis::{Basis, BasisBuilder};
use crate::cancel::CancelToken;
use crate::config::{RoqConfig, SearchSection};
use crate::io::artifact::{FlavorSummary, Manifest};
use crate::io::checkpoint::{self, BasisFiles, CheckpointWriter};
use crate::oracle::{EvaluationContext, WaveformOracle};
use crate::parallel::CandidatePool;
use crate::params::ParameterSpace;
use crate::sampler::ParameterSampler;
use crate::search::{RoqSearch, SearchOutcome};
use crate::types::{Flavor, RoqError, RoqResult};
use crate::validate::SurrogateValidator;

/// Result for one flavor
#[derive(Debug, Clone)]
pub struct FlavorReport {
    pub basis: Basis,
    pub outcome: SearchOutcome,
    /// Errors over `certification.final_samples` fresh points, if requested
    pub distribution: Option<Vec<f64>>,
}

impl FlavorReport {
    fn summary(&self, tolerance: f64) -> FlavorSummary {
        FlavorSummary {
            basis_size: self.basis.len(),
            requested_dimension: self.outcome.requested,
            dimension: self.outcome.operator.nnodes(),
            tolerance,
            max_error: self.outcome.certification.max_error(),
            test_samples: self.outcome.certification.errors.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub linear: FlavorReport,
    pub quadratic: Option<FlavorReport>,
    pub manifest: Manifest,
}

/// Independent sampler streams per stage, reproducible from one seed
#[derive(Debug, Clone, Copy)]
enum Stage {
    Greedy(Flavor),
    Certify(Flavor),
    Distribution(Flavor),
}

impl Stage {
    fn offset(&self) -> u64 {
        let flavor = |f: &Flavor| match f {
            Flavor::Linear => 0,
            Flavor::Quadratic => 1,
        };
        match self {
            Stage::Greedy(f) => flavor(f),
            Stage::Certify(f) => 2 + flavor(f),
            Stage::Distribution(f) => 4 + flavor(f),
        }
    }

    fn sampler(&self, seed: Option<u64>) -> ParameterSampler {
        ParameterSampler::from_seed(seed.map(|s| s.wrapping_add(self.offset())))
    }
}

pub struct RoqPipeline<'a> {
    config: &'a RoqConfig,
    oracle: &'a dyn WaveformOracle,
    cancel: CancelToken,
}

impl<'a> RoqPipeline<'a> {
    pub fn new(config: &'a RoqConfig, oracle: &'a dyn WaveformOracle) -> Self {
        Self {
            config,
            oracle,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Build, certify and persist every configured flavor.
    pub fn run(&self) -> RoqResult<PipelineReport> {
        let config = self.config;
        config.validate()?;
        if self.oracle.name() != config.waveform.approximant {
            warn!(
                oracle = self.oracle.name(),
                configured = %config.waveform.approximant,
                "oracle name differs from the configured approximant"
            );
        }

        let grid = config.waveform.grid();
        let space = ParameterSpace::from_ranges(&config.ranges, self.oracle.extension_kind())?;
        let ctx = EvaluationContext::new(self.oracle, grid, config.waveform.distance, config.waveform.model());
        let pool = CandidatePool::new(config.greedy.parallel, config.greedy.workers)?;
        let dir = config.output.directory.as_path();
        std::fs::create_dir_all(dir)
            .map_err(|e| RoqError::Io(format!("failed to create {}: {}", dir.display(), e)))?;

        info!(
            approximant = %config.waveform.approximant,
            parameters = space.dimension(),
            bins = grid.len(),
            workers = pool.workers(),
            output = %dir.display(),
            "starting ROQ build"
        );
        let (m_min, m_max) = space.mass_range();
        info!(m_min, m_max, "component mass range");

        let writer = if config.output.checkpoint {
            Some(CheckpointWriter::start(dir)?)
        } else {
            None
        };

        let mut manifest = Manifest::new(&config.waveform.approximant, space.kind(), grid, config.waveform.distance);

        let linear = self.build_flavor(Flavor::Linear, &config.linear, &ctx, &space, &pool, dir, writer.as_ref())?;
        manifest.set(Flavor::Linear, linear.summary(config.linear.tolerance));

        let quadratic = if config.output.quadratic {
            let report =
                self.build_flavor(Flavor::Quadratic, &config.quadratic, &ctx, &space, &pool, dir, writer.as_ref())?;
            manifest.set(Flavor::Quadratic, report.summary(config.quadratic.tolerance));
            Some(report)
        } else {
            None
        };

        if let Some(writer) = writer {
            let written = writer.finish()?;
            info!(written, "checkpoints flushed");
        }
        manifest.save(dir)?;
        info!(
            linear = linear.outcome.operator.nnodes(),
            quadratic = quadratic.as_ref().map(|q| q.outcome.operator.nnodes()),
            "ROQ build complete"
        );

        Ok(PipelineReport {
            linear,
            quadratic,
            manifest,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_flavor(
        &self,
        flavor: Flavor,
        search: &SearchSection,
        ctx: &EvaluationContext<'_>,
        space: &ParameterSpace,
        pool: &CandidatePool,
        dir: &Path,
        writer: Option<&CheckpointWriter>,
    ) -> RoqResult<FlavorReport> {
        let config = self.config;
        let seed = config.greedy.seed;
        let rounds = match flavor {
            Flavor::Linear => config.greedy.linear_rounds,
            Flavor::Quadratic => config.greedy.quadratic_rounds,
        };

        let mut builder = BasisBuilder::new(
            ctx,
            space,
            flavor,
            pool,
            Stage::Greedy(flavor).sampler(seed),
            config.greedy.candidates,
        );
        if config.output.resume && BasisFiles::new(dir, flavor).exist() {
            builder.resume(checkpoint::load_basis(dir, flavor, space.kind())?)?;
        }
        let done = builder.basis().len().saturating_sub(1);
        let remaining = rounds.saturating_sub(done);
        builder.build(remaining, &self.cancel, writer)?;
        let basis = builder.into_basis();

        // The final state may not have been queued if growth stopped early
        match writer {
            Some(w) => w.submit(&basis),
            None => checkpoint::save_basis(dir, &basis)?,
        }

        let validator = SurrogateValidator::new(ctx, space, flavor, pool)
            .with_samples(config.certification.test_samples)
            .with_retry_factor(config.certification.retry_factor);
        let outcome = RoqSearch::new(&validator, search.range(), search.tolerance)
            .with_output(dir)
            .run(&basis, &ctx.grid, &mut Stage::Certify(flavor).sampler(seed), &self.cancel)?;

        let distribution = if config.certification.final_samples > 0 {
            let final_validator = SurrogateValidator::new(ctx, space, flavor, pool)
                .with_samples(config.certification.final_samples)
                .with_retry_factor(config.certification.retry_factor);
            let errors = error_distribution(
                &final_validator,
                &mut Stage::Distribution(flavor).sampler(seed),
                &outcome.operator,
            )?;
            let above = errors.iter().filter(|&&e| e > search.tolerance).count();
            info!(%flavor, samples = errors.len(), above_tolerance = above, "final error distribution");
            Some(errors)
        } else {
            None
        };

        Ok(FlavorReport {
            basis,
            outcome,
            distribution,
        })
    }
}
