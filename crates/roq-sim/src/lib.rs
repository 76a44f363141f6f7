//! # Synthetic Waveform Models
//!
//! Frequency-domain inspiral models implementing
//! [`WaveformOracle`](roq_core::oracle::WaveformOracle), so the basis
//! builder can run end to end without an external simulation library.
//!
//! | Approximant     | Parameters | Extra physics              |
//! |-----------------|------------|----------------------------|
//! | `TaylorF2`      | 10         | aligned spin-orbit         |
//! | `TaylorF2Ecc`   | 11         | leading-order eccentricity |
//! | `TaylorF2Tidal` | 12         | leading-order tides        |
//!
//! ```rust,no_run
//! use roq_core::prelude::*;
//! use roq_sim::ModelFactory;
//!
//! # fn main() -> RoqResult<()> {
//! let config = RoqConfig::load()?;
//! let oracle = ModelFactory::create(&config.waveform.model())?;
//! let _report = RoqPipeline::new(&config, oracle.as_ref()).run()?;
//! # Ok(())
//! # }
//! ```

pub mod models;
pub mod taylorf2;

pub use models::{Approximant, ModelFactory};
pub use taylorf2::{Binary, TaylorF2, Variant};
