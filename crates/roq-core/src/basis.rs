//! Greedy reduced-basis construction
//!
//! The builder owns one growing [`Basis`] per flavor. Each round it draws a
//! fresh set of candidate points, scores every candidate by the norm of its
//! residual against the current span, and appends the orthonormalized
//! residual of the worst-represented candidate.
//!
//! ```text
//!  sample ──► evaluate + project (parallel) ──► argmax ──► Gram–Schmidt ──► push
//!     ▲                                                                    │
//!     └──────────────────────────── next round ◄───────────────────────────┘
//! ```
//!
//! Candidate evaluation never touches the basis mutably; only the calling
//! thread appends, once per round.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::io::checkpoint::CheckpointWriter;
use crate::oracle::EvaluationContext;
use crate::parallel::CandidatePool;
use crate::params::{ParameterPoint, ParameterSpace};
use crate::sampler::ParameterSampler;
use crate::types::{Flavor, RoqError, RoqResult, WaveformVector};
use crate::vector::{self, gram_schmidt, residual_modulus};

/// Where a basis vector came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasisRecord {
    pub point: ParameterPoint,
    /// Residual norm before normalization
    pub modulus: f64,
}

/// Ordered orthonormal vectors plus their provenance.
///
/// Appending is the only mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Basis {
    flavor: Flavor,
    vectors: Vec<WaveformVector>,
    metadata: Vec<BasisRecord>,
}

impl Basis {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            vectors: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Reassemble a basis from persisted parts.
    ///
    /// Vectors must all have the same length and there must be one record
    /// per vector. Orthonormality is not re-checked.
    pub fn from_parts(flavor: Flavor, vectors: Vec<WaveformVector>, metadata: Vec<BasisRecord>) -> RoqResult<Self> {
        if vectors.len() != metadata.len() {
            return Err(RoqError::Format(format!(
                "{} basis has {} vectors but {} metadata records",
                flavor,
                vectors.len(),
                metadata.len()
            )));
        }
        if let Some(first) = vectors.first() {
            if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
                return Err(RoqError::LengthMismatch {
                    expected: first.len(),
                    actual: bad.len(),
                });
            }
        }
        Ok(Self {
            flavor,
            vectors,
            metadata,
        })
    }

    pub(crate) fn push(&mut self, vector: WaveformVector, record: BasisRecord) {
        self.vectors.push(vector);
        self.metadata.push(record);
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vectors(&self) -> &[WaveformVector] {
        &self.vectors
    }

    pub fn metadata(&self) -> &[BasisRecord] {
        &self.metadata
    }

    /// Samples per vector, if any vector exists.
    pub fn vector_len(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }

    /// The first `ndim` vectors (all of them when `ndim` exceeds the size).
    pub fn leading(&self, ndim: usize) -> &[WaveformVector] {
        &self.vectors[..ndim.min(self.vectors.len())]
    }

    /// Largest cross inner product and largest unit-norm deviation.
    pub fn orthonormality_defect(&self) -> (f64, f64) {
        vector::orthonormality_defect(&self.vectors)
    }
}

/// Outcome of one greedy round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSummary {
    /// Index of the appended vector
    pub index: usize,
    pub point: ParameterPoint,
    pub modulus: f64,
    /// Candidates dropped for candidate-local errors
    pub skipped: usize,
}

/// Greedy builder for one flavor
pub struct BasisBuilder<'a> {
    ctx: &'a EvaluationContext<'a>,
    space: &'a ParameterSpace,
    pool: &'a CandidatePool,
    sampler: ParameterSampler,
    candidates_per_round: usize,
    basis: Basis,
}

impl<'a> BasisBuilder<'a> {
    pub fn new(
        ctx: &'a EvaluationContext<'a>,
        space: &'a ParameterSpace,
        flavor: Flavor,
        pool: &'a CandidatePool,
        sampler: ParameterSampler,
        candidates_per_round: usize,
    ) -> Self {
        Self {
            ctx,
            space,
            pool,
            sampler,
            candidates_per_round,
            basis: Basis::new(flavor),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.basis.flavor
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn into_basis(self) -> Basis {
        self.basis
    }

    /// Start from the normalized waveform of the low corner of the box.
    ///
    /// No-op when the basis already has vectors.
    pub fn seed(&mut self) -> RoqResult<()> {
        if !self.basis.is_empty() {
            return Ok(());
        }
        let point = self.space.corner();
        let mut v = self.ctx.waveform(&point, self.flavor())?;
        let modulus = vector::normalize(&mut v)?;
        debug!(flavor = %self.flavor(), modulus, "seeded basis from parameter corner");
        self.basis.push(v, BasisRecord { point, modulus });
        Ok(())
    }

    /// Continue from a previously persisted basis.
    pub fn resume(&mut self, basis: Basis) -> RoqResult<()> {
        if basis.flavor() != self.flavor() {
            return Err(RoqError::Config(format!(
                "cannot resume a {} build from a {} checkpoint",
                self.flavor(),
                basis.flavor()
            )));
        }
        if let Some(len) = basis.vector_len() {
            if len != self.ctx.grid.len() {
                return Err(RoqError::LengthMismatch {
                    expected: self.ctx.grid.len(),
                    actual: len,
                });
            }
        }
        if let Some(record) = basis.metadata().iter().find(|r| r.point.kind() != self.space.kind()) {
            return Err(RoqError::DimensionMismatch {
                expected: self.space.dimension(),
                actual: record.point.kind().dimension(),
            });
        }
        info!(flavor = %self.flavor(), vectors = basis.len(), "resuming from checkpoint");
        self.basis = basis;
        Ok(())
    }

    /// Append the worst-represented of `candidates` to the basis.
    ///
    /// Candidates the oracle rejects are skipped. If the winner turns out to
    /// be numerically inside the span, the next-best candidate is tried.
    /// When every scored candidate is inside the span the round fails with
    /// [`RoqError::FamilySpanned`].
    pub fn grow_once(&mut self, candidates: &[ParameterPoint]) -> RoqResult<RoundSummary> {
        let index = self.basis.len();
        let flavor = self.flavor();
        let ctx = self.ctx;
        let current = self.basis.vectors();

        let scores = self.pool.map(candidates, |point| {
            ctx.waveform(point, flavor).map(|v| residual_modulus(current, &v))
        });

        // Rejected candidates carry NaN, which argmax never selects
        let mut moduli = Vec::with_capacity(candidates.len());
        let mut skipped = 0;
        for score in scores {
            match score {
                Ok(modulus) if modulus.is_finite() => moduli.push(modulus),
                Ok(modulus) => {
                    warn!(round = index, modulus, "dropping candidate with non-finite residual");
                    skipped += 1;
                    moduli.push(f64::NAN);
                }
                Err(e) if e.is_candidate_local() => {
                    warn!(round = index, error = %e, "skipping candidate");
                    skipped += 1;
                    moduli.push(f64::NAN);
                }
                Err(e) => return Err(e),
            }
        }
        let scored = candidates.len() - skipped;
        debug!(round = index, scored, skipped, "candidate batch scored");

        let mut degenerate = 0;
        while let Some((i, _)) = vector::argmax_f64(&moduli) {
            moduli[i] = f64::NAN;
            let point = candidates[i];
            let v = self.ctx.waveform(&point, flavor)?;
            match gram_schmidt(self.basis.vectors(), &v) {
                Ok((unit, modulus)) => {
                    self.basis.push(unit, BasisRecord { point, modulus });
                    return Ok(RoundSummary {
                        index,
                        point,
                        modulus,
                        skipped,
                    });
                }
                Err(e @ RoqError::DegenerateProjection { .. }) => {
                    debug!(round = index, error = %e, "winner is degenerate, trying next candidate");
                    degenerate += 1;
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if scored > 0 && degenerate == scored {
            return Err(RoqError::FamilySpanned {
                round: index,
                size: self.basis.len(),
            });
        }
        Err(RoqError::NoViableCandidate {
            round: index,
            attempted: candidates.len(),
            region: self.space.to_string(),
        })
    }

    /// One round over a freshly drawn candidate set.
    pub fn round(&mut self) -> RoqResult<RoundSummary> {
        let candidates = self.sampler.sample_points(self.candidates_per_round, self.space);
        self.grow_once(&candidates)
    }

    /// Seed if needed, then run `rounds` greedy rounds.
    ///
    /// Cancellation is observed before each round. When a checkpoint writer
    /// is given, the basis is queued for writing after every round.
    pub fn build(
        &mut self,
        rounds: usize,
        cancel: &CancelToken,
        checkpoint: Option<&CheckpointWriter>,
    ) -> RoqResult<&Basis> {
        self.seed()?;
        for r in 0..rounds {
            if cancel.is_cancelled() {
                return Err(RoqError::Cancelled { round: r });
            }
            let summary = match self.round() {
                Ok(summary) => summary,
                Err(RoqError::FamilySpanned { round, size }) => {
                    info!(
                        flavor = %self.flavor(),
                        round,
                        size,
                        "basis spans every candidate, stopping early"
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            info!(
                flavor = %self.flavor(),
                round = r + 1,
                of = rounds,
                size = self.basis.len(),
                modulus = summary.modulus,
                skipped = summary.skipped,
                "greedy round complete"
            );
            if let Some(writer) = checkpoint {
                writer.submit(&self.basis);
            }
        }
        Ok(&self.basis)
    }
}
