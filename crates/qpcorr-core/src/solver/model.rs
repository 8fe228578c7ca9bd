use crate::config::PhaseUnit;
use crate::domain::{CorrError, CorrResult, Plane};
use crate::numerics::{diagonal_matrix, mat_vec, DenseMatrix};
use crate::selection::IpSelection;
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMagnet {
    pub name: String,
    pub offset: isize,
    pub beta: f64,
    /// Phase advance in radians.
    pub phase: f64,
}

/// Phases entering the linear basis: Δ0 at the interaction point and the
/// lattice phase φs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseReference {
    pub ip_phase: f64,
    pub lattice_phase: f64,
}

impl Default for PhaseReference {
    fn default() -> Self {
        Self {
            ip_phase: 0.0,
            lattice_phase: FRAC_PI_2,
        }
    }
}

impl PhaseReference {
    /// Linear-term weight of a magnet at phase `mu`. With Δ0 = 0 and φs = π/2
    /// this is `sin μ cos μ`.
    pub fn basis_weight(&self, mu: f64) -> f64 {
        let (sin_mu, cos_mu) = mu.sin_cos();
        let (sin_d, cos_d) = self.ip_phase.sin_cos();
        let (sin_p, cos_p) = self.lattice_phase.sin_cos();

        sin_mu * cos_mu * (cos_d * sin_p + sin_d * cos_p)
            - sin_mu * sin_mu * cos_d * cos_p
            - cos_mu * cos_mu * sin_d * sin_p
    }

    /// Uniform observable `sin(φs − Δ0)` used for the first-order correction.
    pub fn reference_observable(&self) -> f64 {
        (self.lattice_phase - self.ip_phase).sin()
    }
}

/// Perturbative model of one interaction region in one plane:
/// `observable = D·err + (D·err) ⊙ (C·err)`, where `D = diag(β_i w_i)` and `C`
/// is strictly lower triangular with `C_ij = β_j sin 2(μ_i − μ_j)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionModel {
    magnets: Vec<RegionMagnet>,
    reference: PhaseReference,
    linear: DenseMatrix,
    coupling: DenseMatrix,
}

impl RegionModel {
    /// `magnets` must already be ordered along the beam.
    pub fn new(magnets: Vec<RegionMagnet>, reference: PhaseReference) -> CorrResult<Self> {
        if magnets.is_empty() {
            return Err(CorrError::input_validation(
                "INPUT.REGION_EMPTY",
                "error-correction region has no magnets",
            ));
        }
        if let Some(magnet) = magnets
            .iter()
            .find(|magnet| !(magnet.beta.is_finite() && magnet.phase.is_finite()))
        {
            return Err(CorrError::input_validation(
                "INPUT.REGION_OPTICS",
                format!(
                    "magnet '{}' has non-finite optics (beta {}, phase {})",
                    magnet.name, magnet.beta, magnet.phase
                ),
            ));
        }

        let diagonal = magnets
            .iter()
            .map(|magnet| magnet.beta * reference.basis_weight(magnet.phase))
            .collect::<Vec<_>>();
        let linear = diagonal_matrix(&diagonal);

        let dimension = magnets.len();
        let coupling = DenseMatrix::from_fn(dimension, dimension, |row, col| {
            if col < row {
                magnets[col].beta * (2.0 * (magnets[row].phase - magnets[col].phase)).sin()
            } else {
                0.0
            }
        });

        Ok(Self {
            magnets,
            reference,
            linear,
            coupling,
        })
    }

    pub fn from_selection(
        selection: &IpSelection,
        plane: Plane,
        phase_unit: PhaseUnit,
        reference: PhaseReference,
    ) -> CorrResult<Self> {
        let magnets = selection
            .region(plane)
            .into_iter()
            .map(|magnet| RegionMagnet {
                name: magnet.element.name.clone(),
                offset: magnet.offset,
                beta: magnet.element.beta(plane),
                phase: phase_unit.to_radians(magnet.element.phase(plane)),
            })
            .collect();
        Self::new(magnets, reference)
    }

    pub fn dimension(&self) -> usize {
        self.magnets.len()
    }

    pub fn magnets(&self) -> &[RegionMagnet] {
        &self.magnets
    }

    pub fn reference(&self) -> PhaseReference {
        self.reference
    }

    pub fn linear_matrix(&self) -> &DenseMatrix {
        &self.linear
    }

    pub fn coupling_matrix(&self) -> &DenseMatrix {
        &self.coupling
    }

    pub fn reference_target(&self) -> Vec<f64> {
        vec![self.reference.reference_observable(); self.dimension()]
    }

    pub fn cross_term(&self, errors: &[f64]) -> CorrResult<Vec<f64>> {
        self.check_length(errors)?;
        Ok(self.cross_term_unchecked(errors))
    }

    pub fn forward(&self, errors: &[f64]) -> CorrResult<Vec<f64>> {
        self.check_length(errors)?;
        let linear = mat_vec(&self.linear, errors);
        let cross = self.cross_term_unchecked(errors);
        Ok(linear.iter().zip(&cross).map(|(lhs, rhs)| lhs + rhs).collect())
    }

    pub(super) fn cross_term_unchecked(&self, errors: &[f64]) -> Vec<f64> {
        let linear = mat_vec(&self.linear, errors);
        let coupled = mat_vec(&self.coupling, errors);
        linear
            .iter()
            .zip(&coupled)
            .map(|(lhs, rhs)| lhs * rhs)
            .collect()
    }

    pub(super) fn check_length(&self, values: &[f64]) -> CorrResult<()> {
        if values.len() != self.dimension() {
            return Err(CorrError::input_validation(
                "INPUT.REGION_DIMENSION",
                format!(
                    "vector has {} entries but the region has {} magnets",
                    values.len(),
                    self.dimension()
                ),
            ));
        }
        Ok(())
    }
}
