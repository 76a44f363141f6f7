//! Persistence for bases, operators and run metadata.
//!
//! Arrays are stored as NumPy `.npy` files so downstream likelihood codes
//! can load them without this crate:
//!
//! | File                              | Shape         | Content                       |
//! |-----------------------------------|---------------|-------------------------------|
//! | `{flavor}bases.npy`               | `(n, N)`      | orthonormal basis vectors     |
//! | `{flavor}basiswaveformparams.npy` | `(n, D)`      | parameters that produced them |
//! | `{flavor}basismoduli.npy`         | `(n,)`        | residual modulus at pick      |
//! | `B_{flavor}.npy`                  | `(nnodes, N)` | interpolation operator        |
//! | `fnodes_{flavor}.npy`             | `(nnodes,)`   | node frequencies in Hz        |
//! | `emp_nodes_{flavor}.npy`          | `(nnodes,)`   | node bin indices              |
//!
//! `manifest.json` records what produced the directory.

pub mod artifact;
pub mod checkpoint;
pub mod npy;

pub use artifact::{load_operator, save_operator, FlavorSummary, Manifest, OperatorFiles, MANIFEST_FILE};
pub use checkpoint::{load_basis, save_basis, BasisFiles, CheckpointWriter};
