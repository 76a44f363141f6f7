//! Core types for reduced-order quadrature construction
//!
//! This module defines the fundamental types shared by every stage of the
//! basis pipeline, in particular the complex frequency-domain samples that
//! make up a waveform vector and the crate-wide error type.
//!
//! ## Frequency-Domain Waveforms
//!
//! A waveform is a complex strain amplitude sampled on a uniform frequency
//! grid `[f_min, f_max)` with spacing `delta_f`:
//!
//! ```text
//!   |h(f)|
//!     ^
//!     |*
//!     | **
//!     |   ***
//!     |      *****
//!     |           **********
//!     +-----------------------------> f
//!   f_min                        f_max
//! ```
//!
//! Two flavors are built from the same oracle output: the *linear* flavor is
//! the raw plus-polarization strain, the *quadratic* flavor is `|h|²`, which is
//! what quadratic-in-strain inner products need.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A frequency-domain waveform sampled on the working grid
pub type WaveformVector = Vec<Complex>;

/// Result type for basis construction operations
pub type RoqResult<T> = Result<T, RoqError>;

/// Errors that can occur while building or certifying a reduced basis
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoqError {
    #[error("Unsupported physics for model {model}: {reason}")]
    UnsupportedPhysics { model: String, reason: String },

    #[error("Insufficient basis: empirical interpolation needs at least 2 vectors and {requested} were requested, but only {available} are available")]
    InsufficientBasis { available: usize, requested: usize },

    #[error(
        "Could not certify a {flavor} basis within tolerance {tolerance:e} for dimensions {low}..{high} (step {step}). \
         Try increasing the allowed basis size or relaxing the tolerance"
    )]
    ToleranceUnachievable {
        flavor: Flavor,
        tolerance: f64,
        low: usize,
        high: usize,
        step: usize,
    },

    #[error("Degenerate projection: residual norm {norm:e} is too small to normalize")]
    DegenerateProjection { norm: f64 },

    #[error("Round {round}: no viable candidate among {attempted} sampled points in {region}")]
    NoViableCandidate {
        round: usize,
        attempted: usize,
        region: String,
    },

    #[error(
        "Only {evaluated} of {requested} certification samples could be evaluated for the {flavor} surrogate \
         of dimension {dimension} in {region}"
    )]
    InsufficientSamples {
        flavor: Flavor,
        dimension: usize,
        evaluated: usize,
        requested: usize,
        region: String,
    },

    #[error("Round {round}: every candidate already lies in the span of the {size} basis vectors")]
    FamilySpanned { round: usize, size: usize },

    #[error("Waveform length mismatch: expected {expected} bins, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Parameter dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Waveform oracle failed: {0}")]
    Oracle(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed array file: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build cancelled before round {round}")]
    Cancelled { round: usize },

    #[error("Search for the {flavor} surrogate cancelled before dimension {dimension}")]
    SearchCancelled { flavor: Flavor, dimension: usize },
}

impl RoqError {
    /// Whether this error only disqualifies a single candidate point.
    ///
    /// Candidate-local errors are skipped during a greedy round or a
    /// certification pass; anything else aborts the build.
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            RoqError::UnsupportedPhysics { .. } | RoqError::DegenerateProjection { .. }
        )
    }
}

impl From<std::io::Error> for RoqError {
    fn from(e: std::io::Error) -> Self {
        RoqError::Io(e.to_string())
    }
}

/// Which vector family a basis is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Raw plus-polarization strain
    Linear,
    /// Element-wise squared modulus `|h|²`
    Quadratic,
}

impl Flavor {
    /// Map an oracle output into this flavor's vector space.
    pub fn apply(&self, hp: WaveformVector) -> WaveformVector {
        match self {
            Flavor::Linear => hp,
            Flavor::Quadratic => hp
                .into_iter()
                .map(|h| Complex::new(h.norm_sqr(), 0.0))
                .collect(),
        }
    }

    /// Prefix used for persisted artifacts.
    pub fn label(&self) -> &'static str {
        match self {
            Flavor::Linear => "linear",
            Flavor::Quadratic => "quadratic",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Uniform frequency grid `[f_min, f_max)` with spacing `delta_f`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyGrid {
    /// Lower frequency bound in Hz (inclusive)
    pub f_min: f64,
    /// Upper frequency bound in Hz (exclusive)
    pub f_max: f64,
    /// Bin spacing in Hz
    pub delta_f: f64,
}

impl FrequencyGrid {
    pub fn new(f_min: f64, f_max: f64, delta_f: f64) -> Self {
        Self { f_min, f_max, delta_f }
    }

    /// Index of the first bin in a full `[0, f_max)` spectrum
    pub fn start_bin(&self) -> usize {
        (self.f_min / self.delta_f).round() as usize
    }

    /// Index one past the last bin in a full `[0, f_max)` spectrum
    pub fn end_bin(&self) -> usize {
        self.start_bin() + self.len()
    }

    /// Number of frequency bins, `(f_max − f_min) / Δf` to the nearest bin.
    ///
    /// Rounding absorbs steps like 0.1 that are not exact in binary, so the
    /// last frequency stays below `f_max`.
    pub fn len(&self) -> usize {
        let bins = ((self.f_max - self.f_min) / self.delta_f).round();
        if bins.is_finite() && bins > 0.0 {
            bins as usize
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frequency of bin `i` in Hz
    #[inline]
    pub fn frequency(&self, i: usize) -> f64 {
        self.f_min + i as f64 * self.delta_f
    }

    /// All bin frequencies in ascending order
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.frequency(i)).collect()
    }

    /// Check that a vector has one sample per bin.
    pub fn check_len(&self, v: &[Complex]) -> RoqResult<()> {
        if v.len() != self.len() {
            return Err(RoqError::LengthMismatch {
                expected: self.len(),
                actual: v.len(),
            });
        }
        Ok(())
    }
}
