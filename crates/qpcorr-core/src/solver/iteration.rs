use super::model::RegionModel;
use crate::config::SolverSettings;
use crate::domain::{CorrError, CorrResult};
use crate::numerics::{lu_factorize, mat_vec, max_abs_difference, LuDecomposition, LuError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionOutcome {
    /// `D⁻¹ target`, the first-order estimate.
    pub first_order: Vec<f64>,
    pub estimate: Vec<f64>,
    pub iterations: usize,
    /// Max-norm change of the last refinement; infinite if none ran.
    pub last_delta: f64,
    /// Max-norm of `forward(estimate) - target`.
    pub residual: f64,
    pub converged: bool,
}

/// First-order solve `D x = target`.
pub fn solve_linear(model: &RegionModel, target: &[f64]) -> CorrResult<Vec<f64>> {
    model.check_length(target)?;
    let lu = factorize(model)?;
    back_substitute(&lu, target)
}

/// First-order outcome without refinement; the residual is measured against
/// the linear model `D x`.
pub fn solve_first_order(model: &RegionModel, target: &[f64]) -> CorrResult<CorrectionOutcome> {
    let first_order = solve_linear(model, target)?;
    ensure_finite(&first_order, 0)?;
    let linear = mat_vec(model.linear_matrix(), &first_order);
    let residual = max_abs_difference(&linear, target).unwrap_or(f64::INFINITY);

    Ok(CorrectionOutcome {
        estimate: first_order.clone(),
        first_order,
        iterations: 0,
        last_delta: 0.0,
        residual,
        converged: true,
    })
}

/// Fixed-point refinement of the first-order estimate,
/// `x_{k+1} = D⁻¹ (target − cross(x_k))`, until successive iterates differ by
/// less than `settings.threshold` in max-norm or the iteration cap is hit.
pub fn solve_corrections(
    model: &RegionModel,
    target: &[f64],
    settings: SolverSettings,
) -> CorrResult<CorrectionOutcome> {
    model.check_length(target)?;
    let lu = factorize(model)?;
    let first_order = back_substitute(&lu, target)?;
    ensure_finite(&first_order, 0)?;

    let mut estimate = first_order.clone();
    let mut last_delta = f64::INFINITY;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        let cross = model.cross_term_unchecked(&estimate);
        let rhs = target
            .iter()
            .zip(&cross)
            .map(|(target, cross)| target - cross)
            .collect::<Vec<_>>();
        let next = back_substitute(&lu, &rhs)?;
        iterations += 1;
        ensure_finite(&next, iterations)?;

        last_delta = max_abs_difference(&next, &estimate).unwrap_or(f64::INFINITY);
        estimate = next;
        tracing::debug!(iteration = iterations, delta = last_delta, "refined correction estimate");

        if last_delta < settings.threshold {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            iterations,
            last_delta,
            threshold = settings.threshold,
            "correction iteration stopped at the iteration cap without converging"
        );
    }

    let forward = model.forward(&estimate)?;
    let residual = max_abs_difference(&forward, target).unwrap_or(f64::INFINITY);

    Ok(CorrectionOutcome {
        first_order,
        estimate,
        iterations,
        last_delta,
        residual,
        converged,
    })
}

fn factorize(model: &RegionModel) -> CorrResult<LuDecomposition> {
    lu_factorize(model.linear_matrix()).map_err(|source| match source {
        LuError::SingularMatrix { .. } | LuError::IllConditionedMatrix { .. } => {
            CorrError::computation(
                "RUN.SINGULAR_SYSTEM",
                format!(
                    "linear system over {} magnets cannot be solved: {source}",
                    model.dimension()
                ),
            )
        }
        other => CorrError::internal("RUN.LINEAR_SOLVE", other.to_string()),
    })
}

fn back_substitute(lu: &LuDecomposition, rhs: &[f64]) -> CorrResult<Vec<f64>> {
    lu.solve(rhs)
        .map_err(|source| CorrError::internal("RUN.LINEAR_SOLVE", source.to_string()))
}

fn ensure_finite(values: &[f64], iteration: usize) -> CorrResult<()> {
    match values.iter().position(|value| !value.is_finite()) {
        Some(index) => Err(CorrError::computation(
            "RUN.DIVERGED",
            format!(
                "correction estimate became non-finite at entry {index} after {iteration} iterations"
            ),
        )),
        None => Ok(()),
    }
}
