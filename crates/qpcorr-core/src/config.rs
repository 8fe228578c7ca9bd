//! Analysis configuration loaded from JSON.
//!
//! Every field has a default, so an empty object (or no file at all) yields the
//! settings the selection and correction scripts were run with.

use crate::domain::{CorrError, ElementKeyword, Plane};
use crate::parser::{DEFAULT_LENGTH_PARAMETER, DEFAULT_STRENGTH_PARAMETER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_SELECTED: usize = 8;
pub const DEFAULT_THRESHOLD: f64 = 8.0e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_SIMULATED_ERROR: f64 = 3.0e-6;
pub const DEFAULT_KL_SCALE: f64 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseUnit {
    /// Phase advances are used as read.
    #[default]
    Radians,
    /// Phase advances are tunes (units of 2π), as MAD-X writes MUX/MUY.
    Tune,
}

impl PhaseUnit {
    pub fn to_radians(self, phase: f64) -> f64 {
        match self {
            Self::Radians => phase,
            Self::Tune => phase * TAU,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct ReferencePhase {
    #[serde(default)]
    pub horizontal: f64,
    #[serde(default)]
    pub vertical: f64,
}

impl ReferencePhase {
    pub fn for_plane(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.horizontal,
            Plane::Vertical => self.vertical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverSettings {
    pub threshold: f64,
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub keywords: Vec<String>,
    pub ip_prefix: String,
    pub window: usize,
    pub selected: usize,
    pub phase_unit: PhaseUnit,
    pub kl_scale: f64,
    pub lattice_phase: f64,
    pub reference_phases: BTreeMap<String, ReferencePhase>,
    pub solver: SolverSettings,
    pub simulated_error: f64,
    pub optics_glob: String,
    pub strength_parameter: String,
    pub length_parameter: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["MARKER".to_string(), "QUADRUPOLE".to_string()],
            ip_prefix: "IP.".to_string(),
            window: DEFAULT_WINDOW,
            selected: DEFAULT_SELECTED,
            phase_unit: PhaseUnit::Radians,
            kl_scale: DEFAULT_KL_SCALE,
            lattice_phase: FRAC_PI_2,
            reference_phases: BTreeMap::new(),
            solver: SolverSettings::default(),
            simulated_error: DEFAULT_SIMULATED_ERROR,
            optics_glob: "*.tfs".to_string(),
            strength_parameter: DEFAULT_STRENGTH_PARAMETER.to_string(),
            length_parameter: DEFAULT_LENGTH_PARAMETER.to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn element_keywords(&self) -> Vec<ElementKeyword> {
        self.keywords
            .iter()
            .map(|keyword| ElementKeyword::from_keyword(keyword))
            .collect()
    }

    /// Reference phase Δ0 of an interaction point; zero when not configured.
    pub fn reference_phase(&self, ip_name: &str, plane: Plane) -> f64 {
        self.reference_phases
            .get(ip_name)
            .map_or(0.0, |phase| phase.for_plane(plane))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::Invalid(
                "window must search at least one quadrupole per side".to_string(),
            ));
        }
        if self.selected == 0 || self.selected % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "selected must be a positive even number, got {}",
                self.selected
            )));
        }
        if !(self.solver.threshold.is_finite() && self.solver.threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "solver threshold must be positive, got {}",
                self.solver.threshold
            )));
        }
        if self.ip_prefix.is_empty() {
            return Err(ConfigError::Invalid("ipPrefix must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read analysis config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse analysis config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid analysis config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CorrError {
    fn from(error: ConfigError) -> Self {
        match &error {
            ConfigError::Read { .. } => CorrError::io_system("IO.CONFIG_READ", error.to_string()),
            ConfigError::Parse { .. } => {
                CorrError::input_validation("INPUT.CONFIG_PARSE", error.to_string())
            }
            ConfigError::Invalid(_) => {
                CorrError::input_validation("INPUT.CONFIG_INVALID", error.to_string())
            }
        }
    }
}

pub fn load_analysis_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AnalysisConfig =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}
