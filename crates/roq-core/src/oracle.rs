//! The waveform model seam
//!
//! The basis builder never computes physics itself: it asks a
//! [`WaveformOracle`] for the frequency-domain plus polarization at a
//! parameter point. Oracles are shared read-only across the worker pool, so
//! every per-call knob travels in an immutable [`ModelConfig`] rather than in
//! mutable global state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::params::{ExtensionKind, ParameterPoint};
use crate::types::{Flavor, FrequencyGrid, RoqResult, WaveformVector};

/// Spin treatment requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinMode {
    /// Spins ignored
    Nonspinning,
    /// Only the components along the orbital angular momentum
    #[default]
    Aligned,
    /// Full three-dimensional spins
    Precessing,
}

/// Immutable per-call model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model (approximant) name, resolved by the model factory
    pub approximant: String,
    pub spin_mode: SpinMode,
    /// Reference frequency in Hz (0 selects the model default)
    pub f_ref: f64,
    /// Free-form model-specific numeric flags
    pub flags: BTreeMap<String, f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            approximant: "TaylorF2".to_string(),
            spin_mode: SpinMode::Aligned,
            f_ref: 0.0,
            flags: BTreeMap::new(),
        }
    }
}

impl ModelConfig {
    pub fn new(approximant: impl Into<String>) -> Self {
        Self {
            approximant: approximant.into(),
            ..Default::default()
        }
    }

    pub fn with_spin_mode(mut self, spin_mode: SpinMode) -> Self {
        self.spin_mode = spin_mode;
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: f64) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    pub fn flag(&self, name: &str) -> Option<f64> {
        self.flags.get(name).copied()
    }
}

/// A frequency-domain waveform generator.
///
/// Implementations must be deterministic for fixed inputs and must return
/// exactly `grid.len()` samples. Physics the model cannot represent is
/// reported as [`RoqError::UnsupportedPhysics`](crate::types::RoqError::UnsupportedPhysics).
pub trait WaveformOracle: Send + Sync {
    /// Model name for logs and error messages
    fn name(&self) -> &str;

    /// Which extension coordinates the model consumes
    fn extension_kind(&self) -> ExtensionKind;

    /// Plus polarization at `point`, for a source at `distance` Mpc.
    fn evaluate(
        &self,
        point: &ParameterPoint,
        distance: f64,
        grid: &FrequencyGrid,
        config: &ModelConfig,
    ) -> RoqResult<WaveformVector>;
}

impl<T: WaveformOracle + ?Sized> WaveformOracle for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn extension_kind(&self) -> ExtensionKind {
        (**self).extension_kind()
    }

    fn evaluate(
        &self,
        point: &ParameterPoint,
        distance: f64,
        grid: &FrequencyGrid,
        config: &ModelConfig,
    ) -> RoqResult<WaveformVector> {
        (**self).evaluate(point, distance, grid, config)
    }
}

/// Everything needed to turn a parameter point into a basis-space vector
pub struct EvaluationContext<'a> {
    pub oracle: &'a dyn WaveformOracle,
    pub grid: FrequencyGrid,
    /// Luminosity distance in Mpc
    pub distance: f64,
    pub model: ModelConfig,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(oracle: &'a dyn WaveformOracle, grid: FrequencyGrid, distance: f64, model: ModelConfig) -> Self {
        Self {
            oracle,
            grid,
            distance,
            model,
        }
    }

    /// Evaluate the oracle, check the length, and map into `flavor`.
    pub fn waveform(&self, point: &ParameterPoint, flavor: Flavor) -> RoqResult<WaveformVector> {
        let hp = self
            .oracle
            .evaluate(point, self.distance, &self.grid, &self.model)?;
        self.grid.check_len(&hp)?;
        Ok(flavor.apply(hp))
    }
}
