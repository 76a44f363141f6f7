//! Stationary-phase inspiral waveforms
//!
//! ```text
//! h̃₊(f) = A f^{-7/6} (1 + b₂ v²) (1 + cos²ι)/2 · exp(-iΨ(f))
//!
//! Ψ(f) = -2φ_ref - π/4 + 3/(128 η v⁵) [1 + a₂ v² + a₃ v³] + ΔΨ_ecc + ΔΨ_tidal
//! v    = (π M f)^{1/3}
//! ```
//!
//! Amplitude through 1PN, phase through 1.5PN with aligned spin-orbit
//! coupling. The eccentric
//! variant adds the leading `e₀²` correction, the tidal variant the leading
//! `Λ̃ v¹⁰` term. Bins at or above the innermost stable circular orbit are
//! zero.

use std::f64::consts::PI;

use roq_core::oracle::{ModelConfig, SpinMode, WaveformOracle};
use roq_core::params::{ExtensionKind, ParameterPoint};
use roq_core::types::{Complex, FrequencyGrid, RoqError, RoqResult, WaveformVector};

/// Solar mass in seconds (G M☉ / c³)
pub const MTSUN_SI: f64 = 4.925_491_025_543_576e-6;
/// Megaparsec in light-seconds
pub const MPC_SECONDS: f64 = 1.029_271_251_025_263e14;

/// Largest in-plane spin or unsupported eccentricity treated as zero
pub const PHYSICS_TOLERANCE: f64 = 1e-6;

/// Flag selecting the highest phase term, in half-PN units (0, 2 or 3)
pub const PHASE_ORDER_FLAG: &str = "phase_order";
/// Flag selecting the highest amplitude term, in half-PN units (0 or 2)
pub const AMPLITUDE_ORDER_FLAG: &str = "amplitude_order";

/// Which corrections a [`TaylorF2`] oracle applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    PointParticle,
    Eccentric,
    Tidal,
}

impl Variant {
    pub fn extension_kind(&self) -> ExtensionKind {
        match self {
            Variant::PointParticle => ExtensionKind::None,
            Variant::Eccentric => ExtensionKind::Eccentricity,
            Variant::Tidal => ExtensionKind::Tidal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Variant::PointParticle => "TaylorF2",
            Variant::Eccentric => "TaylorF2Ecc",
            Variant::Tidal => "TaylorF2Tidal",
        }
    }
}

/// Binary in the units the phasing formulas want
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binary {
    /// Total mass in seconds
    pub total_mass: f64,
    /// Chirp mass in seconds
    pub chirp_mass: f64,
    /// Symmetric mass ratio
    pub eta: f64,
    /// `m1 / M`
    pub x1: f64,
    /// `m2 / M`
    pub x2: f64,
    /// Aligned spin components
    pub chi1: f64,
    pub chi2: f64,
}

impl Binary {
    /// Physical binary at `point`; `point` must already have `q >= 1`.
    pub fn from_point(point: &ParameterPoint, spin_mode: SpinMode) -> Self {
        let (m1, m2) = point.component_masses();
        let total = m1 + m2;
        let (chi1, chi2) = match spin_mode {
            SpinMode::Nonspinning => (0.0, 0.0),
            _ => (point.spin1.to_cartesian()[2], point.spin2.to_cartesian()[2]),
        };
        Self {
            total_mass: total * MTSUN_SI,
            chirp_mass: point.chirp_mass * MTSUN_SI,
            eta: m1 * m2 / (total * total),
            x1: m1 / total,
            x2: m2 / total,
            chi1,
            chi2,
        }
    }

    /// Gravitational-wave frequency at the innermost stable circular orbit
    pub fn f_isco(&self) -> f64 {
        1.0 / (6.0_f64.powf(1.5) * PI * self.total_mass)
    }

    /// 1.5PN spin-orbit coefficient
    pub fn beta(&self) -> f64 {
        let term = |x: f64, chi: f64| (113.0 / 12.0 * x * x + 25.0 / 4.0 * self.eta) * chi;
        term(self.x1, self.chi1) + term(self.x2, self.chi2)
    }

    /// Binary tidal deformability `Λ̃`
    pub fn lambda_tilde(&self, lambda1: f64, lambda2: f64) -> f64 {
        let (x1, x2) = (self.x1, self.x2);
        16.0 / 13.0 * ((x1 + 12.0 * x2) * x1.powi(4) * lambda1 + (x2 + 12.0 * x1) * x2.powi(4) * lambda2)
    }
}

/// Frequency-domain inspiral oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaylorF2 {
    variant: Variant,
}

impl TaylorF2 {
    pub fn new(variant: Variant) -> Self {
        Self { variant }
    }

    pub fn point_particle() -> Self {
        Self::new(Variant::PointParticle)
    }

    pub fn eccentric() -> Self {
        Self::new(Variant::Eccentric)
    }

    pub fn tidal() -> Self {
        Self::new(Variant::Tidal)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    fn unsupported(&self, reason: String) -> RoqError {
        RoqError::UnsupportedPhysics {
            model: self.variant.name().to_string(),
            reason,
        }
    }

    /// Reject what the stationary-phase family cannot represent.
    fn check(&self, point: &ParameterPoint, spin_mode: SpinMode) -> RoqResult<()> {
        if spin_mode != SpinMode::Nonspinning {
            for (body, spin) in [(1, point.spin1), (2, point.spin2)] {
                if spin.magnitude > 1.0 {
                    return Err(self.unsupported(format!(
                        "spin{} magnitude {} exceeds the Kerr bound",
                        body, spin.magnitude
                    )));
                }
                let [sx, sy, _] = spin.to_cartesian();
                let in_plane = sx.hypot(sy);
                if in_plane > PHYSICS_TOLERANCE {
                    return Err(self.unsupported(format!(
                        "precessing spin{} (in-plane component {:.3e})",
                        body, in_plane
                    )));
                }
            }
        }
        let e0 = point.extension.eccentricity();
        match self.variant {
            Variant::Eccentric if !(0.0..1.0).contains(&e0) => {
                Err(self.unsupported(format!("eccentricity {} outside [0, 1)", e0)))
            }
            Variant::Eccentric => Ok(()),
            _ if e0 > PHYSICS_TOLERANCE => Err(self.unsupported(format!("eccentricity {}", e0))),
            _ => Ok(()),
        }
    }

    fn order(config: &ModelConfig, flag: &str, default: u32) -> u32 {
        match config.flag(flag) {
            Some(order) if order >= 0.0 => order as u32,
            _ => default,
        }
    }
}

impl WaveformOracle for TaylorF2 {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn extension_kind(&self) -> ExtensionKind {
        self.variant.extension_kind()
    }

    fn evaluate(
        &self,
        point: &ParameterPoint,
        distance: f64,
        grid: &FrequencyGrid,
        config: &ModelConfig,
    ) -> RoqResult<WaveformVector> {
        if distance <= 0.0 {
            return Err(RoqError::Oracle(format!("non-positive distance {} Mpc", distance)));
        }
        let point = point.normalized();
        self.check(&point, config.spin_mode)?;

        let binary = Binary::from_point(&point, config.spin_mode);
        let phase_order = Self::order(config, PHASE_ORDER_FLAG, 3);
        let eta = binary.eta;
        let a2 = if phase_order >= 2 { 3715.0 / 756.0 + 55.0 / 9.0 * eta } else { 0.0 };
        let a3 = if phase_order >= 3 { 4.0 * binary.beta() - 16.0 * PI } else { 0.0 };
        let b2 = if Self::order(config, AMPLITUDE_ORDER_FLAG, 2) >= 2 {
            (1804.0 * eta - 969.0) / 672.0
        } else {
            0.0
        };

        let e0 = point.extension.eccentricity();
        let f_ecc = if config.f_ref > 0.0 { config.f_ref } else { grid.f_min };
        let v0 = (PI * binary.total_mass * f_ecc).cbrt();
        let (lambda1, lambda2) = point.extension.tidal();
        let lambda_tilde = binary.lambda_tilde(lambda1, lambda2);

        let cos_i = point.inclination.cos();
        let amp0 = (5.0 / 24.0_f64).sqrt() * PI.powf(-2.0 / 3.0) * binary.chirp_mass.powf(5.0 / 6.0)
            / (distance * MPC_SECONDS)
            * 0.5
            * (1.0 + cos_i * cos_i);
        let f_isco = binary.f_isco();

        Ok((0..grid.len())
            .map(|i| {
                let f = grid.frequency(i);
                if f <= 0.0 || f >= f_isco {
                    return Complex::new(0.0, 0.0);
                }
                let v = (PI * binary.total_mass * f).cbrt();
                let v2 = v * v;
                let newtonian = 3.0 / (128.0 * eta * v2 * v2 * v);
                let mut series = 1.0 + a2 * v2 + a3 * v2 * v;
                if e0 > 0.0 && v0 > 0.0 {
                    series -= 2355.0 / 1462.0 * e0 * e0 * (v / v0).powf(-19.0 / 3.0);
                }
                if lambda_tilde > 0.0 {
                    series -= 39.0 / 2.0 * lambda_tilde * v2.powi(5);
                }
                let psi = -2.0 * point.phi_ref - PI / 4.0 + newtonian * series;
                Complex::from_polar(amp0 * f.powf(-7.0 / 6.0) * (1.0 + b2 * v2), -psi)
            })
            .collect())
    }
}
