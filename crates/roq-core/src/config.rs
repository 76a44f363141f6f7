//! # Configuration System
//!
//! YAML configuration for a basis-building run:
//!
//! - Waveform model and frequency grid
//! - Parameter ranges
//! - Greedy search sizing and parallelism
//! - Linear and quadratic dimension searches
//! - Certification sampling, output and logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `ROQ_CONFIG` environment variable
//! 2. `./roq.yaml` (current directory)
//! 3. `~/.config/roq/config.yaml` (user config)
//! 4. `/etc/roq/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! waveform:
//!   approximant: "TaylorF2"
//!   f_min: 20.0
//!   f_max: 1024.0
//!   delta_f: 0.25
//!
//! ranges:
//!   chirp_mass: [1.0, 1.4]
//!   mass_ratio: [1.0, 2.0]
//!
//! greedy:
//!   candidates: 100
//!   linear_rounds: 80
//!
//! linear:
//!   ndim_low: 40
//!   ndim_high: 80
//!   ndim_step: 2
//!   tolerance: 1.0e-8
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::observe::LogConfig;
use crate::oracle::{ModelConfig, SpinMode};
use crate::params::ParameterRanges;
use crate::search::DimensionRange;
use crate::types::{FrequencyGrid, RoqError};
use crate::validate::{DEFAULT_RETRY_FACTOR, DEFAULT_TEST_SAMPLES};

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "ROQ_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for RoqError {
    fn from(e: ConfigError) -> Self {
        RoqError::Config(e.to_string())
    }
}

/// Waveform model and frequency grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformSection {
    /// Model name resolved by the model factory
    pub approximant: String,
    pub spin_mode: SpinMode,
    /// Reference frequency in Hz (0 = model default)
    pub f_ref: f64,
    /// Luminosity distance in Mpc
    pub distance: f64,
    /// Lower frequency bound in Hz
    pub f_min: f64,
    /// Upper frequency bound in Hz (exclusive)
    pub f_max: f64,
    /// Frequency resolution in Hz
    pub delta_f: f64,
    /// Model-specific numeric flags
    pub flags: BTreeMap<String, f64>,
}

impl Default for WaveformSection {
    fn default() -> Self {
        Self {
            approximant: "TaylorF2".to_string(),
            spin_mode: SpinMode::Aligned,
            f_ref: 0.0,
            distance: 10.0,
            f_min: 20.0,
            f_max: 1024.0,
            delta_f: 0.25,
            flags: BTreeMap::new(),
        }
    }
}

impl WaveformSection {
    pub fn grid(&self) -> FrequencyGrid {
        FrequencyGrid::new(self.f_min, self.f_max, self.delta_f)
    }

    /// Immutable per-call model configuration
    pub fn model(&self) -> ModelConfig {
        ModelConfig {
            approximant: self.approximant.clone(),
            spin_mode: self.spin_mode,
            f_ref: self.f_ref,
            flags: self.flags.clone(),
        }
    }
}

/// Greedy basis construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedySection {
    /// Candidate points drawn per round
    pub candidates: usize,
    /// Rounds for the linear basis (vectors added after the seed)
    pub linear_rounds: usize,
    /// Rounds for the quadratic basis
    pub quadratic_rounds: usize,
    /// Evaluate candidates on a worker pool
    pub parallel: bool,
    /// Worker threads (0 = one per core)
    pub workers: usize,
    /// RNG seed (None = from entropy)
    pub seed: Option<u64>,
}

impl Default for GreedySection {
    fn default() -> Self {
        Self {
            candidates: 100,
            linear_rounds: 80,
            quadratic_rounds: 80,
            parallel: true,
            workers: 0,
            seed: None,
        }
    }
}

/// Dimension search for one flavor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub ndim_low: usize,
    /// Exclusive upper bound
    pub ndim_high: usize,
    pub ndim_step: usize,
    pub tolerance: f64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            ndim_low: 40,
            ndim_high: 80,
            ndim_step: 2,
            tolerance: 1e-8,
        }
    }
}

impl SearchSection {
    pub fn range(&self) -> DimensionRange {
        DimensionRange {
            low: self.ndim_low,
            high: self.ndim_high,
            step: self.ndim_step,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        self.range()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("{}: {}", name, e)))?;
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(ConfigError::ValidationError(format!("{}.tolerance must be positive", name)));
        }
        Ok(())
    }
}

/// Held-out sampling used to certify a surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationSection {
    /// Samples per certification pass
    pub test_samples: usize,
    /// Draw budget for rejected samples, as a multiple of `test_samples`
    pub retry_factor: usize,
    /// Samples for the final error distribution (0 = skip)
    pub final_samples: usize,
}

impl Default for CertificationSection {
    fn default() -> Self {
        Self {
            test_samples: DEFAULT_TEST_SAMPLES,
            retry_factor: DEFAULT_RETRY_FACTOR,
            final_samples: 0,
        }
    }
}

/// Where artifacts and checkpoints go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub directory: PathBuf,
    /// Write the basis after every greedy round
    pub checkpoint: bool,
    /// Continue from checkpoint files in `directory` if present
    pub resume: bool,
    /// Build the quadratic basis and operator too
    pub quadratic: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./roq-output"),
            checkpoint: true,
            resume: false,
            quadratic: true,
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoqConfig {
    /// Configuration version
    pub version: String,
    pub waveform: WaveformSection,
    pub ranges: ParameterRanges,
    pub greedy: GreedySection,
    pub linear: SearchSection,
    pub quadratic: SearchSection,
    pub certification: CertificationSection,
    pub output: OutputSection,
    pub logging: LogConfig,
}

impl Default for RoqConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            waveform: WaveformSection::default(),
            ranges: ParameterRanges::default(),
            greedy: GreedySection::default(),
            linear: SearchSection::default(),
            quadratic: SearchSection {
                ndim_low: 10,
                ndim_high: 40,
                ndim_step: 1,
                tolerance: 1e-5,
            },
            certification: CertificationSection::default(),
            output: OutputSection::default(),
            logging: LogConfig::default(),
        }
    }
}

impl RoqConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points to {}",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Configuration search paths after the environment variable.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./roq.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "roq") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/roq/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.waveform;
        if w.delta_f.is_nan() || w.delta_f <= 0.0 {
            return Err(ConfigError::ValidationError("waveform.delta_f must be positive".to_string()));
        }
        if w.f_min.is_nan() || w.f_min < 0.0 || w.f_max.is_nan() || w.f_max <= w.f_min {
            return Err(ConfigError::ValidationError(format!(
                "waveform band [{}, {}) is empty",
                w.f_min, w.f_max
            )));
        }
        if w.grid().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "waveform band [{}, {}) holds no bins of width {}",
                w.f_min, w.f_max, w.delta_f
            )));
        }
        if w.distance.is_nan() || w.distance <= 0.0 {
            return Err(ConfigError::ValidationError("waveform.distance must be positive".to_string()));
        }

        let r = &self.ranges;
        let named = [
            ("chirp_mass", r.chirp_mass),
            ("mass_ratio", r.mass_ratio),
            ("spin1.magnitude", r.spin1.magnitude),
            ("spin1.theta", r.spin1.theta),
            ("spin1.phi", r.spin1.phi),
            ("spin2.magnitude", r.spin2.magnitude),
            ("spin2.theta", r.spin2.theta),
            ("spin2.phi", r.spin2.phi),
            ("inclination", r.inclination),
            ("phi_ref", r.phi_ref),
            ("eccentricity", r.eccentricity),
            ("lambda1", r.lambda1),
            ("lambda2", r.lambda2),
        ];
        for (name, [lo, hi]) in named {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(ConfigError::ValidationError(format!(
                    "ranges.{} is inverted: [{}, {}]",
                    name, lo, hi
                )));
            }
        }
        if r.chirp_mass[0] <= 0.0 || r.mass_ratio[0] <= 0.0 {
            return Err(ConfigError::ValidationError(
                "chirp mass and mass ratio must be positive".to_string(),
            ));
        }

        if self.greedy.candidates == 0 {
            return Err(ConfigError::ValidationError("greedy.candidates must be > 0".to_string()));
        }
        self.linear.validate("linear")?;
        if self.output.quadratic {
            self.quadratic.validate("quadratic")?;
        }
        if self.certification.test_samples == 0 {
            return Err(ConfigError::ValidationError(
                "certification.test_samples must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            greedy: GreedySection {
                seed: Some(42),
                ..Default::default()
            },
            certification: CertificationSection {
                final_samples: 10_000,
                ..Default::default()
            },
            ..Default::default()
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}
