//! The reduced-order quadrature operator
//!
//! This is what downstream likelihood code consumes: a dense matrix with
//! one row per empirical node (basis-major, `nnodes × N`) plus the node
//! bins and their frequencies in ascending order. A waveform known only at
//! the nodes is expanded to the full grid as
//!
//! ```text
//!   ĥ[f] = Σ_i B[i][f] · h[node_i]
//! ```

use crate::basis::Basis;
use crate::eim::EmpiricalInterpolant;
use crate::linalg::CMatrix;
use crate::types::{Complex, Flavor, FrequencyGrid, RoqError, RoqResult, WaveformVector};

#[derive(Debug, Clone, PartialEq)]
pub struct RoqOperator {
    pub flavor: Flavor,
    /// `B`, shape `nnodes × N`
    pub matrix: CMatrix,
    /// Node bin indices, ascending
    pub nodes: Vec<usize>,
    /// Frequency of each node in Hz
    pub node_frequencies: Vec<f64>,
}

impl RoqOperator {
    /// `B = (basisᵀ · inverse_V)ᵀ` for the interpolant's realized dimension.
    pub fn from_interpolant(interpolant: &EmpiricalInterpolant, basis: &Basis, grid: &FrequencyGrid) -> RoqResult<Self> {
        let matrix = interpolant.operator(basis.vectors())?;
        if matrix.ncols() != grid.len() {
            return Err(RoqError::LengthMismatch {
                expected: grid.len(),
                actual: matrix.ncols(),
            });
        }
        let nodes = interpolant.nodes().to_vec();
        let node_frequencies = nodes.iter().map(|&n| grid.frequency(n)).collect();
        Ok(Self {
            flavor: basis.flavor(),
            matrix,
            nodes,
            node_frequencies,
        })
    }

    /// Assemble from persisted arrays, checking their shapes agree.
    pub fn from_parts(flavor: Flavor, matrix: CMatrix, nodes: Vec<usize>, node_frequencies: Vec<f64>) -> RoqResult<Self> {
        if matrix.nrows() != nodes.len() || node_frequencies.len() != nodes.len() {
            return Err(RoqError::Format(format!(
                "{} operator has {} rows for {} nodes and {} node frequencies",
                flavor,
                matrix.nrows(),
                nodes.len(),
                node_frequencies.len()
            )));
        }
        if !nodes.windows(2).all(|w| w[0] < w[1]) {
            return Err(RoqError::Format(format!("{} nodes are not strictly increasing", flavor)));
        }
        if nodes.last().is_some_and(|&n| n >= matrix.ncols()) {
            return Err(RoqError::Format(format!(
                "{} node index beyond {} frequency bins",
                flavor,
                matrix.ncols()
            )));
        }
        Ok(Self {
            flavor,
            matrix,
            nodes,
            node_frequencies,
        })
    }

    pub fn nnodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of frequency bins reconstructed
    pub fn len(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Expand values at the nodes to the full grid.
    pub fn expand(&self, values: &[Complex]) -> RoqResult<WaveformVector> {
        if values.len() != self.nnodes() {
            return Err(RoqError::LengthMismatch {
                expected: self.nnodes(),
                actual: values.len(),
            });
        }
        Ok((0..self.len())
            .map(|f| values.iter().enumerate().map(|(i, v)| self.matrix[(i, f)] * v).sum())
            .collect())
    }

    /// Reconstruct a full-grid vector from its own node values.
    pub fn reconstruct(&self, h: &[Complex]) -> RoqResult<WaveformVector> {
        if h.len() != self.len() {
            return Err(RoqError::LengthMismatch {
                expected: self.len(),
                actual: h.len(),
            });
        }
        let values: Vec<Complex> = self.nodes.iter().map(|&n| h[n]).collect();
        self.expand(&values)
    }
}
