//! Basis checkpoints
//!
//! After every greedy round the basis is queued to a background writer
//! thread, so rounds never wait on the disk. Three files per flavor:
//!
//! | File                              | Shape          | Dtype  |
//! |-----------------------------------|----------------|--------|
//! | `{flavor}bases.npy`               | (n, N)         | `<c16` |
//! | `{flavor}basiswaveformparams.npy` | (n, dim)       | `<f8`  |
//! | `{flavor}basismoduli.npy`         | (n,)           | `<f8`  |

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::basis::{Basis, BasisRecord};
use crate::io::npy;
use crate::params::{ExtensionKind, ParameterPoint};
use crate::types::{Flavor, RoqError, RoqResult};

/// Paths of one flavor's checkpoint files inside `dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisFiles {
    pub vectors: PathBuf,
    pub params: PathBuf,
    pub moduli: PathBuf,
}

impl BasisFiles {
    pub fn new(dir: &Path, flavor: Flavor) -> Self {
        let label = flavor.label();
        Self {
            vectors: dir.join(format!("{}bases.npy", label)),
            params: dir.join(format!("{}basiswaveformparams.npy", label)),
            moduli: dir.join(format!("{}basismoduli.npy", label)),
        }
    }

    pub fn exist(&self) -> bool {
        self.vectors.exists() && self.params.exists() && self.moduli.exists()
    }
}

/// Write a basis and its metadata to `dir`.
pub fn save_basis(dir: &Path, basis: &Basis) -> RoqResult<()> {
    let files = BasisFiles::new(dir, basis.flavor());
    npy::save_rows(&files.vectors, basis.vectors())?;

    let dim = basis.metadata().first().map_or(0, |r| r.point.kind().dimension());
    let params: Vec<f64> = basis.metadata().iter().flat_map(|r| r.point.to_vec()).collect();
    npy::save_f64(&files.params, &[basis.len(), dim], &params)?;

    let moduli: Vec<f64> = basis.metadata().iter().map(|r| r.modulus).collect();
    npy::save_f64(&files.moduli, &[basis.len()], &moduli)?;
    Ok(())
}

/// Read back a basis written by [`save_basis`].
pub fn load_basis(dir: &Path, flavor: Flavor, kind: ExtensionKind) -> RoqResult<Basis> {
    let files = BasisFiles::new(dir, flavor);
    let vectors = npy::load_rows(&files.vectors)?;

    let (shape, params) = npy::load_f64(&files.params)?;
    let rows = match shape.as_slice() {
        [n, d] if *d == kind.dimension() => *n,
        [0, _] => 0,
        [_, d] => {
            return Err(RoqError::DimensionMismatch {
                expected: kind.dimension(),
                actual: *d,
            })
        }
        other => {
            return Err(RoqError::Format(format!(
                "{}: expected a 2-D parameter array, found shape {:?}",
                files.params.display(),
                other
            )))
        }
    };
    let (_, moduli) = npy::load_f64(&files.moduli)?;
    if moduli.len() != rows {
        return Err(RoqError::Format(format!(
            "{} rows of parameters but {} moduli",
            rows,
            moduli.len()
        )));
    }

    let metadata = params
        .chunks_exact(kind.dimension())
        .zip(moduli)
        .map(|(row, modulus)| {
            Ok(BasisRecord {
                point: ParameterPoint::from_slice(kind, row)?,
                modulus,
            })
        })
        .collect::<RoqResult<Vec<_>>>()?;
    Basis::from_parts(flavor, vectors, metadata)
}

/// Background checkpoint writer.
///
/// [`submit`](Self::submit) never blocks on I/O. Write errors are held
/// until [`finish`](Self::finish), which waits for every queued snapshot and
/// returns the first failure.
pub struct CheckpointWriter {
    dir: PathBuf,
    tx: Option<Sender<Basis>>,
    handle: Option<JoinHandle<RoqResult<usize>>>,
}

impl CheckpointWriter {
    /// Spawn a writer for `dir`, creating the directory if needed.
    pub fn start(dir: &Path) -> RoqResult<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| RoqError::Io(format!("failed to create {}: {}", dir.display(), e)))?;
        let (tx, rx) = mpsc::channel::<Basis>();
        let target = dir.to_path_buf();

        let handle = thread::Builder::new()
            .name("roq-checkpoint".to_string())
            .spawn(move || {
                let mut written = 0;
                let mut first_error = None;
                for basis in rx {
                    match save_basis(&target, &basis) {
                        Ok(()) => {
                            written += 1;
                            tracing::debug!(flavor = %basis.flavor(), size = basis.len(), "checkpoint written");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "checkpoint write failed");
                            first_error.get_or_insert(e);
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(written),
                }
            })
            .map_err(|e| RoqError::Io(format!("failed to spawn checkpoint thread: {}", e)))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue a snapshot of `basis` for writing.
    pub fn submit(&self, basis: &Basis) {
        let Some(tx) = &self.tx else { return };
        if tx.send(basis.clone()).is_err() {
            tracing::warn!("checkpoint thread has exited; snapshot dropped");
        }
    }

    /// Wait for queued writes and return how many succeeded.
    pub fn finish(mut self) -> RoqResult<usize> {
        self.join()
    }

    fn join(&mut self) -> RoqResult<usize> {
        drop(self.tx.take());
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RoqError::Io("checkpoint thread panicked".to_string()))?,
            None => Ok(0),
        }
    }
}

impl Drop for CheckpointWriter {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            tracing::warn!(error = %e, "checkpoint writer dropped with a failed write");
        }
    }
}
