//! # Reduced-Order Quadrature Basis Builder
//!
//! This crate builds the compact representations used to accelerate
//! gravitational-wave likelihood evaluation. Given a waveform model and a
//! parameter region it produces, for the waveform `h` (linear) and its
//! squared magnitude `|h|²` (quadratic):
//!
//! - **Reduced basis**: orthonormal vectors picked greedily from sampled
//!   waveforms, each the worst-represented candidate of its round
//! - **Empirical interpolant**: frequency nodes and the matrix that rebuilds
//!   a waveform from its values at those nodes
//! - **Certified operator**: the smallest scanned dimension whose surrogate
//!   error stays under tolerance on held-out samples
//!
//! ## Flow
//!
//! ```text
//! sample ──► WaveformOracle ──► BasisBuilder ──► Basis
//!                                                  │
//!            ParameterSampler ─► SurrogateValidator ◄── EmpiricalInterpolant(ndim)
//!                                                  │
//!                                 RoqSearch ──► RoqOperator ──► B_{flavor}.npy
//! ```
//!
//! Waveform models are supplied through [`WaveformOracle`]; this crate
//! knows nothing about the physics beyond the parameter layout.
//!
//! ## Example
//!
//! ```rust,no_run
//! use roq_core::prelude::*;
//!
//! fn run(oracle: &dyn WaveformOracle) -> RoqResult<()> {
//!     let config = RoqConfig::load()?;
//!     roq_core::observe::init_logging(&config.logging)?;
//!
//!     let report = RoqPipeline::new(&config, oracle).run()?;
//!     println!("linear operator: {} nodes", report.linear.outcome.operator.nnodes());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod basis;
pub mod cancel;
pub mod config;
pub mod eim;
pub mod io;
pub mod linalg;
pub mod observe;
pub mod operator;
pub mod oracle;
pub mod parallel;
pub mod params;
pub mod pipeline;
pub mod sampler;
pub mod search;
pub mod types;
pub mod validate;
pub mod vector;

pub use basis::{Basis, BasisBuilder, BasisRecord};
pub use cancel::CancelToken;
pub use config::RoqConfig;
pub use eim::EmpiricalInterpolant;
pub use operator::RoqOperator;
pub use oracle::{EvaluationContext, ModelConfig, SpinMode, WaveformOracle};
pub use parallel::CandidatePool;
pub use params::{ExtensionKind, ParameterPoint, ParameterRanges, ParameterSpace};
pub use pipeline::{PipelineReport, RoqPipeline};
pub use sampler::ParameterSampler;
pub use search::{DimensionRange, RoqSearch, SearchOutcome};
pub use types::{Complex, Flavor, FrequencyGrid, RoqError, RoqResult, WaveformVector};
pub use validate::{Certification, SurrogateValidator};

pub mod prelude {
    pub use crate::basis::{Basis, BasisBuilder};
    pub use crate::config::RoqConfig;
    pub use crate::oracle::{EvaluationContext, ModelConfig, WaveformOracle};
    pub use crate::params::{ExtensionKind, ParameterPoint, ParameterSpace};
    pub use crate::pipeline::RoqPipeline;
    pub use crate::types::{Complex, Flavor, FrequencyGrid, RoqError, RoqResult};
}
