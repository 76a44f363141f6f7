//! # Observability
//!
//! Basis builds run for hours, so progress is reported through `tracing`
//! events: one `info` event per greedy round and per scanned dimension,
//! `debug` for candidate batches, `warn` for skipped candidates and
//! collapsed interpolation nodes.
//!
//! ```rust,ignore
//! use roq_core::observe::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
