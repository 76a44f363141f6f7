//! Final ROQ artifacts
//!
//! Per flavor, the accepted operator is written as
//!
//! - `B_{flavor}.npy`: `<c16`, shape `(nnodes, N)`, basis-major
//! - `fnodes_{flavor}.npy`: `<f8`, node frequencies in ascending order
//! - `emp_nodes_{flavor}.npy`: `<i8`, node bin indices
//!
//! A `manifest.json` next to them records how the run was configured and
//! what each search realized.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::io::npy;
use crate::linalg::CMatrix;
use crate::operator::RoqOperator;
use crate::params::ExtensionKind;
use crate::types::{Flavor, FrequencyGrid, RoqError, RoqResult};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Paths of one flavor's operator files inside `dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorFiles {
    pub matrix: PathBuf,
    pub frequencies: PathBuf,
    pub nodes: PathBuf,
}

impl OperatorFiles {
    pub fn new(dir: &Path, flavor: Flavor) -> Self {
        let label = flavor.label();
        Self {
            matrix: dir.join(format!("B_{}.npy", label)),
            frequencies: dir.join(format!("fnodes_{}.npy", label)),
            nodes: dir.join(format!("emp_nodes_{}.npy", label)),
        }
    }
}

pub fn save_operator(dir: &Path, operator: &RoqOperator) -> RoqResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| RoqError::Io(format!("failed to create {}: {}", dir.display(), e)))?;
    let files = OperatorFiles::new(dir, operator.flavor);

    // nalgebra is column-major; write row by row
    let (rows, cols) = operator.matrix.shape();
    let flat: Vec<_> = (0..rows)
        .flat_map(|i| (0..cols).map(move |j| (i, j)))
        .map(|(i, j)| operator.matrix[(i, j)])
        .collect();
    npy::save_complex(&files.matrix, &[rows, cols], &flat)?;
    npy::save_f64(&files.frequencies, &[operator.nnodes()], &operator.node_frequencies)?;
    let nodes: Vec<i64> = operator.nodes.iter().map(|&n| n as i64).collect();
    npy::save_i64(&files.nodes, &[nodes.len()], &nodes)?;
    tracing::info!(
        flavor = %operator.flavor,
        nodes = operator.nnodes(),
        path = %files.matrix.display(),
        "ROQ operator saved"
    );
    Ok(())
}

pub fn load_operator(dir: &Path, flavor: Flavor) -> RoqResult<RoqOperator> {
    let files = OperatorFiles::new(dir, flavor);
    let (shape, flat) = npy::load_complex(&files.matrix)?;
    let (rows, cols) = match shape.as_slice() {
        [r, c] => (*r, *c),
        other => {
            return Err(RoqError::Format(format!(
                "{}: expected a 2-D operator, found shape {:?}",
                files.matrix.display(),
                other
            )))
        }
    };
    let matrix = CMatrix::from_row_slice(rows, cols, &flat);
    let (_, node_frequencies) = npy::load_f64(&files.frequencies)?;
    let (_, raw_nodes) = npy::load_i64(&files.nodes)?;
    let nodes = raw_nodes
        .into_iter()
        .map(|n| usize::try_from(n).map_err(|_| RoqError::Format(format!("negative node index {}", n))))
        .collect::<RoqResult<Vec<_>>>()?;
    RoqOperator::from_parts(flavor, matrix, nodes, node_frequencies)
}

/// What one flavor's search realized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorSummary {
    pub basis_size: usize,
    /// Dimension scanned when certification passed
    pub requested_dimension: usize,
    /// Node count after duplicate collapsing
    pub dimension: usize,
    pub tolerance: f64,
    pub max_error: f64,
    pub test_samples: usize,
}

/// Run description written next to the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub created: String,
    pub approximant: String,
    pub parameters: ExtensionKind,
    pub grid: FrequencyGrid,
    pub distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear: Option<FlavorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadratic: Option<FlavorSummary>,
}

impl Manifest {
    pub fn new(approximant: &str, parameters: ExtensionKind, grid: FrequencyGrid, distance: f64) -> Self {
        Self {
            created: Utc::now().to_rfc3339(),
            approximant: approximant.to_string(),
            parameters,
            grid,
            distance,
            linear: None,
            quadratic: None,
        }
    }

    pub fn set(&mut self, flavor: Flavor, summary: FlavorSummary) {
        match flavor {
            Flavor::Linear => self.linear = Some(summary),
            Flavor::Quadratic => self.quadratic = Some(summary),
        }
    }

    pub fn get(&self, flavor: Flavor) -> Option<&FlavorSummary> {
        match flavor {
            Flavor::Linear => self.linear.as_ref(),
            Flavor::Quadratic => self.quadratic.as_ref(),
        }
    }

    pub fn save(&self, dir: &Path) -> RoqResult<()> {
        let path = dir.join(MANIFEST_FILE);
        let file = File::create(&path)
            .map_err(|e| RoqError::Io(format!("failed to create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| RoqError::Format(format!("failed to write manifest: {}", e)))?;
        writer
            .flush()
            .map_err(|e| RoqError::Io(format!("failed to write {}: {}", path.display(), e)))
    }

    pub fn load(dir: &Path) -> RoqResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let file = File::open(&path)
            .map_err(|e| RoqError::Io(format!("failed to open {}: {}", path.display(), e)))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RoqError::Format(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complex;

    fn sample_operator() -> RoqOperator {
        let matrix = CMatrix::from_fn(2, 5, |i, j| Complex::new(i as f64, j as f64));
        RoqOperator::from_parts(Flavor::Quadratic, matrix, vec![1, 4], vec![21.0, 24.0]).unwrap()
    }

    #[test]
    fn test_operator_roundtrip_keeps_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let op = sample_operator();
        save_operator(dir.path(), &op).unwrap();
        let files = OperatorFiles::new(dir.path(), Flavor::Quadratic);
        assert!(files.matrix.ends_with("B_quadratic.npy"));
        assert!(files.frequencies.exists());

        // Row-major on disk: second element is (0, 1)
        let (shape, flat) = npy::load_complex(&files.matrix).unwrap();
        assert_eq!(shape, vec![2, 5]);
        assert_eq!(flat[1], Complex::new(0.0, 1.0));

        let back = load_operator(dir.path(), Flavor::Quadratic).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_missing_operator_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_operator(dir.path(), Flavor::Linear), Err(RoqError::Io(_))));
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new("TaylorF2", ExtensionKind::Tidal, FrequencyGrid::new(20.0, 1024.0, 0.25), 10.0);
        manifest.set(
            Flavor::Linear,
            FlavorSummary {
                basis_size: 80,
                requested_dimension: 40,
                dimension: 39,
                tolerance: 1e-8,
                max_error: 3e-9,
                test_samples: 1000,
            },
        );
        manifest.save(dir.path()).unwrap();
        let text = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(!text.contains("quadratic"));

        let back = Manifest::load(dir.path()).unwrap();
        assert_eq!(back, manifest);
        assert_eq!(back.get(Flavor::Linear).unwrap().dimension, 39);
        assert!(back.get(Flavor::Quadratic).is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_manifest_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join(MANIFEST_FILE)).unwrap();
        let manifest = Manifest::new("TaylorF2", ExtensionKind::None, FrequencyGrid::new(20.0, 40.0, 0.5), 100.0);
        assert!(matches!(manifest.save(dir.path()), Err(RoqError::Io(_))));
    }
}
