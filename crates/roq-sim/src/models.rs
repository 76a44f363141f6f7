//! Model lookup by approximant name

use serde::{Deserialize, Serialize};
use tracing::debug;

use roq_core::oracle::{ModelConfig, WaveformOracle};
use roq_core::params::ExtensionKind;
use roq_core::types::{RoqError, RoqResult};

use crate::taylorf2::{TaylorF2, Variant};

/// Approximants this crate can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Approximant {
    TaylorF2,
    TaylorF2Ecc,
    TaylorF2Tidal,
}

impl Approximant {
    /// Parse a name, ignoring case, `-` and `_`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().replace(['-', '_'], "").as_str() {
            "TAYLORF2" => Some(Approximant::TaylorF2),
            "TAYLORF2ECC" => Some(Approximant::TaylorF2Ecc),
            "TAYLORF2TIDAL" | "TAYLORF2NRTIDAL" => Some(Approximant::TaylorF2Tidal),
            _ => None,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Approximant::TaylorF2 => Variant::PointParticle,
            Approximant::TaylorF2Ecc => Variant::Eccentric,
            Approximant::TaylorF2Tidal => Variant::Tidal,
        }
    }

    /// Number of parameter coordinates the model consumes
    pub fn dimension(&self) -> usize {
        self.variant().extension_kind().dimension()
    }

    pub fn extension_kind(&self) -> ExtensionKind {
        self.variant().extension_kind()
    }
}

pub struct ModelFactory;

impl ModelFactory {
    /// All approximant names
    pub fn list() -> Vec<&'static str> {
        vec!["TaylorF2", "TaylorF2Ecc", "TaylorF2Tidal"]
    }

    /// Create the oracle named by `config.approximant`.
    pub fn create(config: &ModelConfig) -> RoqResult<Box<dyn WaveformOracle>> {
        let approximant = Approximant::from_name(&config.approximant).ok_or_else(|| {
            RoqError::Config(format!(
                "unknown approximant '{}' (available: {})",
                config.approximant,
                Self::list().join(", ")
            ))
        })?;
        debug!(
            approximant = ?approximant,
            parameters = approximant.dimension(),
            spin_mode = ?config.spin_mode,
            "creating waveform model"
        );
        Ok(Box::new(TaylorF2::new(approximant.variant())))
    }
}
