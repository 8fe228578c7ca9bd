use super::CliError;
use super::commands::{AnalysisFlags, ConfigFlags};
use anyhow::Context;
use qpcorr_core::config::{load_analysis_config, AnalysisConfig};
use qpcorr_core::domain::CorrError;
use qpcorr_core::lattice::StrengthTable;
use qpcorr_core::pipeline::load_strengths;
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries only the report.
pub(super) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn base_config(flags: &ConfigFlags) -> Result<AnalysisConfig, CliError> {
    match &flags.config {
        Some(path) => {
            let config = load_analysis_config(path).map_err(CorrError::from)?;
            tracing::debug!(path = %path.display(), "loaded analysis config");
            Ok(config)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

pub(super) fn load_config(flags: &AnalysisFlags) -> Result<AnalysisConfig, CliError> {
    let mut config = base_config(&flags.config)?;

    if let Some(window) = flags.window {
        config.window = window;
    }
    if let Some(selected) = flags.selected {
        config.selected = selected;
    }
    if let Some(phase_unit) = flags.phase_unit {
        config.phase_unit = phase_unit.into();
    }

    validated(config)
}

pub(super) fn validated(config: AnalysisConfig) -> Result<AnalysisConfig, CliError> {
    config.validate().map_err(CorrError::from)?;
    Ok(config)
}

pub(super) fn strengths_for(flags: &ConfigFlags, sequence: &Path) -> Result<StrengthTable, CliError> {
    let config = base_config(flags)?;
    let table = load_strengths(sequence, &config)?;
    if table.is_empty() {
        tracing::warn!(path = %sequence.display(), "sequence file defines no quadrupole strengths");
    }
    Ok(table)
}

pub(super) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{rendered}");
    Ok(())
}
