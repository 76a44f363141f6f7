//! Parameter points and the rectangular region they are drawn from
//!
//! A [`ParameterPoint`] describes one compact binary: chirp mass, mass ratio,
//! two spins in spherical form, inclination, reference phase and an optional
//! physics extension. The extension is a tagged variant rather than extra
//! positional coordinates, so the dimensionality of a run is a property of
//! its [`ExtensionKind`]:
//!
//! | Kind           | Dimension | Extra coordinates      |
//! |----------------|-----------|------------------------|
//! | `None`         | 10        | none                   |
//! | `Eccentricity` | 11        | `e`                    |
//! | `Tidal`        | 12        | `lambda1`, `lambda2`   |
//!
//! The flat layout used for sampling and persistence is
//! `[Mc, q, s1_mag, s1_theta, s1_phi, s2_mag, s2_theta, s2_phi, iota, phi_ref, ext...]`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{RoqError, RoqResult};

/// Number of coordinates shared by every parameter point
pub const BASE_DIMENSION: usize = 10;

/// Spin vector given as magnitude, polar angle and azimuthal angle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SphericalSpin {
    pub magnitude: f64,
    /// Polar angle from the orbital angular momentum (rad)
    pub theta: f64,
    /// Azimuthal angle (rad)
    pub phi: f64,
}

impl SphericalSpin {
    pub fn new(magnitude: f64, theta: f64, phi: f64) -> Self {
        Self { magnitude, theta, phi }
    }

    /// Cartesian components `[x, y, z]`
    pub fn to_cartesian(&self) -> [f64; 3] {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let (sin_p, cos_p) = self.phi.sin_cos();
        [
            self.magnitude * sin_t * cos_p,
            self.magnitude * sin_t * sin_p,
            self.magnitude * cos_t,
        ]
    }
}

/// Which optional physics a run carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    #[default]
    None,
    Eccentricity,
    Tidal,
}

impl ExtensionKind {
    /// Total number of coordinates for points of this kind
    pub fn dimension(&self) -> usize {
        match self {
            ExtensionKind::None => BASE_DIMENSION,
            ExtensionKind::Eccentricity => BASE_DIMENSION + 1,
            ExtensionKind::Tidal => BASE_DIMENSION + 2,
        }
    }

    /// Short coordinate labels in flat-layout order
    pub fn labels(&self) -> &'static [&'static str] {
        const LABELS: [&str; BASE_DIMENSION + 2] = [
            "Mc", "q", "s1_mag", "s1_theta", "s1_phi", "s2_mag", "s2_theta", "s2_phi", "iota", "phiRef",
            "lambda1", "lambda2",
        ];
        const ECC_LABELS: [&str; BASE_DIMENSION + 1] = [
            "Mc", "q", "s1_mag", "s1_theta", "s1_phi", "s2_mag", "s2_theta", "s2_phi", "iota", "phiRef", "e",
        ];
        match self {
            ExtensionKind::None => &LABELS[..BASE_DIMENSION],
            ExtensionKind::Eccentricity => &ECC_LABELS,
            ExtensionKind::Tidal => &LABELS,
        }
    }

    /// Human-readable list of coordinate names
    pub fn describe(&self) -> &'static str {
        match self {
            ExtensionKind::None => "Mc, q, s1(mag, theta, phi), s2(mag, theta, phi), iota, phiRef",
            ExtensionKind::Eccentricity => {
                "Mc, q, s1(mag, theta, phi), s2(mag, theta, phi), iota, phiRef, eccentricity"
            }
            ExtensionKind::Tidal => {
                "Mc, q, s1(mag, theta, phi), s2(mag, theta, phi), iota, phiRef, lambda1, lambda2"
            }
        }
    }
}

/// Optional physics carried by a parameter point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Extension {
    #[default]
    None,
    Eccentricity(f64),
    Tidal { lambda1: f64, lambda2: f64 },
}

impl Extension {
    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::None => ExtensionKind::None,
            Extension::Eccentricity(_) => ExtensionKind::Eccentricity,
            Extension::Tidal { .. } => ExtensionKind::Tidal,
        }
    }

    /// Eccentricity, zero when not carried
    pub fn eccentricity(&self) -> f64 {
        match self {
            Extension::Eccentricity(e) => *e,
            _ => 0.0,
        }
    }

    /// Tidal deformabilities `(lambda1, lambda2)`, zero when not carried
    pub fn tidal(&self) -> (f64, f64) {
        match self {
            Extension::Tidal { lambda1, lambda2 } => (*lambda1, *lambda2),
            _ => (0.0, 0.0),
        }
    }
}

/// One point of the waveform parameter space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterPoint {
    /// Chirp mass in solar masses
    pub chirp_mass: f64,
    /// Mass ratio `m1 / m2`
    pub mass_ratio: f64,
    pub spin1: SphericalSpin,
    pub spin2: SphericalSpin,
    /// Inclination (rad)
    pub inclination: f64,
    /// Reference phase (rad)
    pub phi_ref: f64,
    pub extension: Extension,
}

impl ParameterPoint {
    /// Build a point from its flat coordinate layout.
    pub fn from_slice(kind: ExtensionKind, values: &[f64]) -> RoqResult<Self> {
        if values.len() != kind.dimension() {
            return Err(RoqError::DimensionMismatch {
                expected: kind.dimension(),
                actual: values.len(),
            });
        }
        Ok(Self::from_checked(kind, values))
    }

    /// `values` must already have `kind.dimension()` entries.
    fn from_checked(kind: ExtensionKind, values: &[f64]) -> Self {
        let extension = match kind {
            ExtensionKind::None => Extension::None,
            ExtensionKind::Eccentricity => Extension::Eccentricity(values[10]),
            ExtensionKind::Tidal => Extension::Tidal {
                lambda1: values[10],
                lambda2: values[11],
            },
        };
        Self {
            chirp_mass: values[0],
            mass_ratio: values[1],
            spin1: SphericalSpin::new(values[2], values[3], values[4]),
            spin2: SphericalSpin::new(values[5], values[6], values[7]),
            inclination: values[8],
            phi_ref: values[9],
            extension,
        }
    }

    /// Flat coordinate layout, the inverse of [`ParameterPoint::from_slice`].
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = vec![
            self.chirp_mass,
            self.mass_ratio,
            self.spin1.magnitude,
            self.spin1.theta,
            self.spin1.phi,
            self.spin2.magnitude,
            self.spin2.theta,
            self.spin2.phi,
            self.inclination,
            self.phi_ref,
        ];
        match self.extension {
            Extension::None => {}
            Extension::Eccentricity(e) => v.push(e),
            Extension::Tidal { lambda1, lambda2 } => {
                v.push(lambda1);
                v.push(lambda2);
            }
        }
        v
    }

    pub fn kind(&self) -> ExtensionKind {
        self.extension.kind()
    }

    /// Same binary with the heavier body first (`q >= 1`).
    ///
    /// Spins and tidal deformabilities follow their bodies when swapped.
    /// Chirp mass is symmetric in the two masses and is left unchanged.
    pub fn normalized(&self) -> Self {
        if self.mass_ratio >= 1.0 || self.mass_ratio <= 0.0 {
            return *self;
        }
        let extension = match self.extension {
            Extension::Tidal { lambda1, lambda2 } => Extension::Tidal {
                lambda1: lambda2,
                lambda2: lambda1,
            },
            other => other,
        };
        Self {
            mass_ratio: 1.0 / self.mass_ratio,
            spin1: self.spin2,
            spin2: self.spin1,
            extension,
            ..*self
        }
    }

    /// Component masses `(m1, m2)` in solar masses.
    pub fn component_masses(&self) -> (f64, f64) {
        component_masses(self.chirp_mass, self.mass_ratio)
    }
}

/// Component masses from chirp mass and mass ratio `q = m1 / m2`.
pub fn component_masses(chirp_mass: f64, mass_ratio: f64) -> (f64, f64) {
    let m2 = chirp_mass * mass_ratio.powf(-0.6) * (1.0 + mass_ratio).powf(0.2);
    (m2 * mass_ratio, m2)
}

/// Closed interval bounds for one spin box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinRange {
    pub magnitude: [f64; 2],
    pub theta: [f64; 2],
    pub phi: [f64; 2],
}

impl Default for SpinRange {
    fn default() -> Self {
        Self {
            magnitude: [0.0, 0.0],
            theta: [0.0, 0.0],
            phi: [0.0, 0.0],
        }
    }
}

/// Per-coordinate bounds of the target region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRanges {
    pub chirp_mass: [f64; 2],
    pub mass_ratio: [f64; 2],
    pub spin1: SpinRange,
    pub spin2: SpinRange,
    pub inclination: [f64; 2],
    pub phi_ref: [f64; 2],
    pub eccentricity: [f64; 2],
    pub lambda1: [f64; 2],
    pub lambda2: [f64; 2],
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            chirp_mass: [1.0, 1.4],
            mass_ratio: [1.0, 2.0],
            spin1: SpinRange::default(),
            spin2: SpinRange::default(),
            inclination: [0.0, std::f64::consts::PI],
            phi_ref: [0.0, 2.0 * std::f64::consts::PI],
            eccentricity: [0.0, 0.0],
            lambda1: [0.0, 1000.0],
            lambda2: [0.0, 1000.0],
        }
    }
}

/// Rectangular parameter region of fixed dimensionality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    kind: ExtensionKind,
    low: Vec<f64>,
    high: Vec<f64>,
}

impl ParameterSpace {
    /// Build from explicit flat bounds.
    pub fn new(kind: ExtensionKind, low: Vec<f64>, high: Vec<f64>) -> RoqResult<Self> {
        for bound in [&low, &high] {
            if bound.len() != kind.dimension() {
                return Err(RoqError::DimensionMismatch {
                    expected: kind.dimension(),
                    actual: bound.len(),
                });
            }
        }
        if let Some(i) = low.iter().zip(&high).position(|(l, h)| l > h || !l.is_finite() || !h.is_finite()) {
            return Err(RoqError::Config(format!(
                "parameter {} has bounds [{}, {}]",
                i, low[i], high[i]
            )));
        }
        Ok(Self { kind, low, high })
    }

    /// Build from per-coordinate ranges, keeping only the coordinates `kind` uses.
    pub fn from_ranges(ranges: &ParameterRanges, kind: ExtensionKind) -> RoqResult<Self> {
        let mut bounds = vec![
            ranges.chirp_mass,
            ranges.mass_ratio,
            ranges.spin1.magnitude,
            ranges.spin1.theta,
            ranges.spin1.phi,
            ranges.spin2.magnitude,
            ranges.spin2.theta,
            ranges.spin2.phi,
            ranges.inclination,
            ranges.phi_ref,
        ];
        match kind {
            ExtensionKind::None => {}
            ExtensionKind::Eccentricity => bounds.push(ranges.eccentricity),
            ExtensionKind::Tidal => {
                bounds.push(ranges.lambda1);
                bounds.push(ranges.lambda2);
            }
        }
        let low = bounds.iter().map(|b| b[0]).collect();
        let high = bounds.iter().map(|b| b[1]).collect();
        Self::new(kind, low, high)
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    pub fn dimension(&self) -> usize {
        self.kind.dimension()
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Low corner of the box, used to seed the first basis vector.
    pub fn corner(&self) -> ParameterPoint {
        ParameterPoint::from_checked(self.kind, &self.low)
    }

    /// Whether a point lies inside the box (inclusive).
    pub fn contains(&self, point: &ParameterPoint) -> bool {
        let v = point.to_vec();
        v.len() == self.low.len()
            && v.iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(x, (l, h))| l <= x && x <= h)
    }

    /// Smallest and largest component mass reachable inside the box.
    pub fn mass_range(&self) -> (f64, f64) {
        let (mc_low, mc_high) = (self.low[0], self.high[0]);
        let q_high = self.high[1];
        let (_, m_min) = component_masses(mc_low, q_high);
        let (m_max, _) = component_masses(mc_high, q_high);
        (m_min, m_max)
    }
}

impl fmt::Display for ParameterSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.kind.labels().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} [{}, {}]", label, self.low[i], self.high[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn tidal_point() -> ParameterPoint {
        ParameterPoint::from_slice(
            ExtensionKind::Tidal,
            &[1.2, 0.5, 0.1, 0.0, 0.0, 0.2, PI, 0.0, 0.3, 1.0, 100.0, 400.0],
        )
        .unwrap()
    }

    #[test]
    fn test_dimension_per_kind() {
        assert_eq!(ExtensionKind::None.dimension(), 10);
        assert_eq!(ExtensionKind::Eccentricity.dimension(), 11);
        assert_eq!(ExtensionKind::Tidal.dimension(), 12);
    }

    #[test]
    fn test_flat_layout_roundtrip() {
        let p = tidal_point();
        assert_eq!(p.kind(), ExtensionKind::Tidal);
        let back = ParameterPoint::from_slice(ExtensionKind::Tidal, &p.to_vec()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = ParameterPoint::from_slice(ExtensionKind::Eccentricity, &[0.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            RoqError::DimensionMismatch { expected: 11, actual: 10 }
        ));
    }

    #[test]
    fn test_spherical_to_cartesian() {
        let s = SphericalSpin::new(0.5, PI / 2.0, PI / 2.0);
        let [x, y, z] = s.to_cartesian();
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(z, 0.0, epsilon = 1e-12);

        let aligned = SphericalSpin::new(0.3, 0.0, 1.0).to_cartesian();
        assert_relative_eq!(aligned[2], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_component_masses_equal_mass() {
        // Mc = m * 2^-0.2 for equal masses
        let (m1, m2) = component_masses(1.0, 1.0);
        assert_relative_eq!(m1, m2, epsilon = 1e-12);
        assert_relative_eq!(m1, 2f64.powf(0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_component_masses_preserve_chirp_mass() {
        let (m1, m2) = component_masses(1.3, 1.7);
        let mc = (m1 * m2).powf(0.6) / (m1 + m2).powf(0.2);
        assert_relative_eq!(mc, 1.3, epsilon = 1e-12);
        assert_relative_eq!(m1 / m2, 1.7, epsilon = 1e-12);
    }

    #[test]
    fn test_normalized_swaps_bodies() {
        let p = tidal_point().normalized();
        assert_relative_eq!(p.mass_ratio, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.spin1.magnitude, 0.2, epsilon = 1e-12);
        assert_relative_eq!(p.spin2.magnitude, 0.1, epsilon = 1e-12);
        assert_eq!(p.extension.tidal(), (400.0, 100.0));
        assert_relative_eq!(p.chirp_mass, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn test_space_from_ranges() {
        let ranges = ParameterRanges::default();
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::Eccentricity).unwrap();
        assert_eq!(space.dimension(), 11);
        assert_eq!(space.low()[0], 1.0);
        assert_eq!(space.high()[1], 2.0);
        let corner = space.corner();
        assert_eq!(corner.extension, Extension::Eccentricity(0.0));
        assert!(space.contains(&corner));
    }

    #[test]
    fn test_space_rejects_inverted_bounds() {
        let mut ranges = ParameterRanges::default();
        ranges.chirp_mass = [2.0, 1.0];
        assert!(ParameterSpace::from_ranges(&ranges, ExtensionKind::None).is_err());
    }

    #[test]
    fn test_mass_range() {
        let space = ParameterSpace::from_ranges(&ParameterRanges::default(), ExtensionKind::None).unwrap();
        let (m_min, m_max) = space.mass_range();
        assert!(m_min > 0.0);
        assert!(m_max > m_min);
        assert_relative_eq!(m_min, component_masses(1.0, 2.0).1, epsilon = 1e-12);
        assert_relative_eq!(m_max, component_masses(1.4, 2.0).0, epsilon = 1e-12);
    }

    #[test]
    fn test_space_display_names_bounds() {
        let ranges = ParameterRanges {
            chirp_mass: [1.2, 1.4],
            ..Default::default()
        };
        let space = ParameterSpace::from_ranges(&ranges, ExtensionKind::Eccentricity).unwrap();
        let text = space.to_string();
        assert!(text.starts_with("Mc [1.2, 1.4], q ["));
        assert!(text.contains(", e ["));
        assert_eq!(text.matches('[').count(), 11);
        assert_eq!(ExtensionKind::Tidal.labels().len(), 12);
    }
}
