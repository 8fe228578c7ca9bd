pub mod iteration;
pub mod model;

pub use iteration::{solve_corrections, solve_first_order, solve_linear, CorrectionOutcome};
pub use model::{PhaseReference, RegionMagnet, RegionModel};

use crate::domain::{CorrError, CorrResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Forward model applied to a simulated error vector.
    #[default]
    Synthetic,
    /// Uniform `sin(φs − Δ0)` observable.
    Reference,
}

impl TargetKind {
    /// Reference targets drive the first-order analysis only; synthetic
    /// targets are refined through the cross terms.
    pub const fn refines(self) -> bool {
        matches!(self, Self::Synthetic)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::Reference => "reference",
        }
    }
}

/// Solver input for one region: the target observable and, for synthetic
/// targets, the errors it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTarget {
    pub kind: TargetKind,
    pub values: Vec<f64>,
    pub simulated_errors: Option<Vec<f64>>,
}

impl RegionTarget {
    pub fn build(
        model: &RegionModel,
        kind: TargetKind,
        error_values: &[f64],
        default_error: f64,
    ) -> CorrResult<Self> {
        match kind {
            TargetKind::Reference => Ok(Self {
                kind,
                values: model.reference_target(),
                simulated_errors: None,
            }),
            TargetKind::Synthetic => {
                let errors = expand_errors(error_values, model.dimension(), default_error)?;
                let values = model.forward(&errors)?;
                Ok(Self {
                    kind,
                    values,
                    simulated_errors: Some(errors),
                })
            }
        }
    }
}

/// No values means `default_error` everywhere, one value is broadcast, and
/// otherwise there must be exactly one value per magnet.
pub fn expand_errors(values: &[f64], dimension: usize, default_error: f64) -> CorrResult<Vec<f64>> {
    let errors = match values {
        [] => vec![default_error; dimension],
        [single] => vec![*single; dimension],
        many if many.len() == dimension => many.to_vec(),
        many => {
            return Err(CorrError::input_validation(
                "INPUT.SIMULATED_ERRORS",
                format!(
                    "expected 1 or {dimension} simulated error values, got {}",
                    many.len()
                ),
            ));
        }
    };

    if let Some(value) = errors.iter().find(|value| !value.is_finite()) {
        return Err(CorrError::input_validation(
            "INPUT.SIMULATED_ERRORS",
            format!("simulated error value {value} is not finite"),
        ));
    }
    Ok(errors)
}
