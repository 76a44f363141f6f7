//! Diagnostics on a finished operator
//!
//! Both functions work from a persisted [`RoqOperator`] alone, so they can
//! be run long after the basis that produced it is gone.

use crate::oracle::EvaluationContext;
use crate::operator::RoqOperator;
use crate::params::ParameterPoint;
use crate::sampler::ParameterSampler;
use crate::types::{Complex, RoqError, RoqResult};
use crate::validate::SurrogateValidator;
use crate::vector::norm;

/// Surrogate errors of `operator` over the validator's sample count.
///
/// The same metric as certification, on fresh points.
pub fn error_distribution(
    validator: &SurrogateValidator<'_>,
    sampler: &mut ParameterSampler,
    operator: &RoqOperator,
) -> RoqResult<Vec<f64>> {
    let (errors, skipped) = validator.errors(sampler, operator)?;
    if skipped > 0 {
        tracing::debug!(skipped, "oracle rejected some distribution samples");
    }
    Ok(errors)
}

/// Fractional representation error at one point
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationError {
    /// Bin frequencies in Hz
    pub frequencies: Vec<f64>,
    /// `(ĥ − h) / ‖h‖` per bin
    pub error: Vec<Complex>,
}

impl RepresentationError {
    /// Largest `|error|` over the band
    pub fn max_abs(&self) -> f64 {
        self.error.iter().map(|z| z.norm()).fold(0.0, f64::max)
    }
}

/// `(B · h[nodes] − h) / ‖h‖` at `point`, in the operator's flavor.
pub fn representation_error(
    ctx: &EvaluationContext<'_>,
    operator: &RoqOperator,
    point: &ParameterPoint,
) -> RoqResult<RepresentationError> {
    let h = ctx.waveform(point, operator.flavor)?;
    let approx = operator.reconstruct(&h)?;
    let scale = norm(&h);
    if scale == 0.0 {
        return Err(RoqError::Numerical(format!(
            "zero waveform at {:?}; fractional error undefined",
            point
        )));
    }
    let error = approx.iter().zip(&h).map(|(a, b)| (a - b) / scale).collect();
    Ok(RepresentationError {
        frequencies: ctx.grid.frequencies(),
        error,
    })
}
