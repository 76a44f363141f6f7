//! NumPy `.npy` array files
//!
//! Persisted bases and operators are plain dense arrays, written with
//! `ndarray-npy` so they load directly with `numpy.load`.
//!
//! # Supported Types
//!
//! | Dtype      | Descr  | Bytes/Element | Used for                         |
//! |------------|--------|---------------|----------------------------------|
//! | Complex128 | `<c16` | 16            | basis vectors, ROQ operator      |
//! | Float64    | `<f8`  | 8             | parameter rows, moduli, nodes f  |
//! | Int64      | `<i8`  | 8             | node indices                     |
//!
//! Loading views the file bytes before copying anything out, so a header
//! that claims more elements than the file holds is a
//! [`RoqError::Format`], never an allocation.
//!
//! # Example
//!
//! ```rust,no_run
//! use roq_core::io::npy;
//! use std::path::Path;
//!
//! let path = Path::new("moduli.npy");
//! npy::save_f64(path, &[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
//! let (shape, data) = npy::load_f64(path).unwrap();
//! assert_eq!(shape, vec![2, 2]);
//! assert_eq!(data[3], 4.0);
//! ```

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use ndarray_npy::{ViewElement, ViewNpyExt, WritableElement, WriteNpyExt};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::{Complex, RoqError, RoqResult};

fn save_array<T>(path: &Path, shape: &[usize], data: &[T]) -> RoqResult<()>
where
    T: WritableElement + Clone,
{
    let array = ArrayD::from_shape_vec(IxDyn(shape), data.to_vec()).map_err(|_| {
        RoqError::Format(format!(
            "{}: shape {:?} does not hold {} elements",
            path.display(),
            shape,
            data.len()
        ))
    })?;
    let file = File::create(path)
        .map_err(|e| RoqError::Io(format!("failed to create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    array
        .write_npy(&mut writer)
        .map_err(|e| RoqError::Io(format!("failed to write {}: {}", path.display(), e)))?;
    writer
        .flush()
        .map_err(|e| RoqError::Io(format!("failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

/// Decode a whole `.npy` buffer, checking the header against its length.
fn decode<T>(bytes: &[u8], origin: &Path) -> RoqResult<(Vec<usize>, Vec<T>)>
where
    T: ViewElement + Copy,
{
    let view = ArrayViewD::<T>::view_npy(bytes)
        .map_err(|e| RoqError::Format(format!("{}: {}", origin.display(), e)))?;
    Ok((view.shape().to_vec(), view.iter().copied().collect()))
}

fn load_array<T>(path: &Path) -> RoqResult<(Vec<usize>, Vec<T>)>
where
    T: ViewElement + Copy,
{
    let bytes =
        fs::read(path).map_err(|e| RoqError::Io(format!("failed to open {}: {}", path.display(), e)))?;
    decode(&bytes, path)
}

/// Save a list of equal-length complex rows as a 2-D array.
pub fn save_rows(path: &Path, rows: &[Vec<Complex>]) -> RoqResult<()> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(RoqError::LengthMismatch {
            expected: width,
            actual: bad.len(),
        });
    }
    let flat: Vec<Complex> = rows.iter().flatten().copied().collect();
    save_array(path, &[rows.len(), width], &flat)
}

/// Load a 2-D complex array as a list of rows.
pub fn load_rows(path: &Path) -> RoqResult<Vec<Vec<Complex>>> {
    let (shape, data) = load_complex(path)?;
    match shape.as_slice() {
        [_, width] if *width > 0 => Ok(data.chunks_exact(*width).map(<[Complex]>::to_vec).collect()),
        [_, _] => Ok(Vec::new()),
        other => Err(RoqError::Format(format!(
            "{}: expected a 2-D array, found shape {:?}",
            path.display(),
            other
        ))),
    }
}

/// Save a real array.
pub fn save_f64(path: &Path, shape: &[usize], data: &[f64]) -> RoqResult<()> {
    save_array(path, shape, data)
}

/// Load a real array as its shape and row-major data.
pub fn load_f64(path: &Path) -> RoqResult<(Vec<usize>, Vec<f64>)> {
    load_array(path)
}

/// Save an integer array.
pub fn save_i64(path: &Path, shape: &[usize], data: &[i64]) -> RoqResult<()> {
    save_array(path, shape, data)
}

pub fn load_i64(path: &Path) -> RoqResult<(Vec<usize>, Vec<i64>)> {
    load_array(path)
}

/// Save a complex array of arbitrary shape.
pub fn save_complex(path: &Path, shape: &[usize], data: &[Complex]) -> RoqResult<()> {
    save_array(path, shape, data)
}

pub fn load_complex(path: &Path) -> RoqResult<(Vec<usize>, Vec<Complex>)> {
    load_array(path)
}
