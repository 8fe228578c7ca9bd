use super::CliError;
use super::helpers::{load_config, print_json, strengths_for, validated};
use qpcorr_core::config::PhaseUnit;
use qpcorr_core::pipeline::{run_analysis, AnalysisRequest, OpticsSource, SolveRequest};
use qpcorr_core::report::{render_human_summary, render_strengths};
use qpcorr_core::solver::TargetKind;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(clap::Args)]
pub(super) struct ConfigFlags {
    /// JSON analysis configuration; flags below override its values
    #[arg(long)]
    pub(super) config: Option<PathBuf>,

    /// Print the report as JSON instead of the console summary
    #[arg(long)]
    pub(super) json: bool,
}

#[derive(clap::Args)]
pub(super) struct AnalysisFlags {
    #[command(flatten)]
    pub(super) config: ConfigFlags,

    /// TFS optics table
    #[arg(long, conflicts_with = "data_dir")]
    pub(super) twiss: Option<PathBuf>,

    /// Directory holding optics tables matching the configured glob [default: data]
    #[arg(long)]
    pub(super) data_dir: Option<PathBuf>,

    /// 1-based index of the optics table in --data-dir, in name order
    #[arg(long, default_value_t = 1)]
    pub(super) file_index: usize,

    /// MAD-X sequence file with quadrupole strengths
    #[arg(long)]
    pub(super) sequence: Option<PathBuf>,

    /// Interaction point number; repeat for several, omit for all
    #[arg(long = "ip", value_name = "N")]
    pub(super) interaction_points: Vec<u32>,

    /// Quadrupoles searched on each side of an interaction point
    #[arg(long)]
    pub(super) window: Option<usize>,

    /// Quadrupoles selected on each side (even)
    #[arg(long)]
    pub(super) selected: Option<usize>,

    /// Unit of the MUX/MUY columns
    #[arg(long, value_enum)]
    pub(super) phase_unit: Option<PhaseUnitArg>,
}

impl AnalysisFlags {
    fn optics_source(&self) -> OpticsSource {
        match &self.twiss {
            Some(path) => OpticsSource::File(path.clone()),
            None => OpticsSource::DataDirectory {
                directory: self
                    .data_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
                file_index: self.file_index,
            },
        }
    }

    fn request(&self, solve: Option<SolveRequest>) -> AnalysisRequest {
        AnalysisRequest {
            optics: self.optics_source(),
            sequence: self.sequence.clone(),
            interaction_points: self.interaction_points.clone(),
            solve,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(super) enum PhaseUnitArg {
    Radians,
    Tune,
}

impl From<PhaseUnitArg> for PhaseUnit {
    fn from(value: PhaseUnitArg) -> Self {
        match value {
            PhaseUnitArg::Radians => PhaseUnit::Radians,
            PhaseUnitArg::Tune => PhaseUnit::Tune,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(super) enum TargetArg {
    Synthetic,
    Reference,
}

impl From<TargetArg> for TargetKind {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Synthetic => TargetKind::Synthetic,
            TargetArg::Reference => TargetKind::Reference,
        }
    }
}

#[derive(clap::Args)]
pub(super) struct SelectArgs {
    #[command(flatten)]
    pub(super) analysis: AnalysisFlags,
}

#[derive(clap::Args)]
pub(super) struct SolveArgs {
    #[command(flatten)]
    pub(super) analysis: AnalysisFlags,

    /// Observable the corrections are solved against
    #[arg(long, value_enum, default_value = "synthetic")]
    pub(super) target: TargetArg,

    /// Simulated error; one value for all magnets or one per magnet
    #[arg(long = "error", value_name = "V", allow_negative_numbers = true)]
    pub(super) errors: Vec<f64>,

    /// Convergence threshold on the max-norm change between iterates
    #[arg(long)]
    pub(super) threshold: Option<f64>,

    /// Iteration cap before giving up on convergence
    #[arg(long)]
    pub(super) max_iterations: Option<usize>,
}

#[derive(clap::Args)]
pub(super) struct StrengthsArgs {
    #[command(flatten)]
    pub(super) config: ConfigFlags,

    /// MAD-X sequence file with quadrupole strengths
    #[arg(long)]
    pub(super) sequence: PathBuf,
}

pub(super) fn run_select_command(args: SelectArgs) -> Result<i32, CliError> {
    let config = load_config(&args.analysis)?;
    let report = run_analysis(&config, &args.analysis.request(None))?;

    if args.analysis.config.json {
        print_json(&report)?;
    } else {
        println!("{}", render_human_summary(&report));
    }
    Ok(0)
}

pub(super) fn run_solve_command(args: SolveArgs) -> Result<i32, CliError> {
    let mut config = load_config(&args.analysis)?;
    if let Some(threshold) = args.threshold {
        config.solver.threshold = threshold;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.solver.max_iterations = max_iterations;
    }
    let config = validated(config)?;
    let solve = SolveRequest {
        target: args.target.into(),
        errors: args.errors.clone(),
    };
    let report = run_analysis(&config, &args.analysis.request(Some(solve)))?;

    if args.analysis.config.json {
        print_json(&report)?;
    } else {
        println!("{}", render_human_summary(&report));
    }

    if report.converged() { Ok(0) } else { Ok(1) }
}

pub(super) fn run_strengths_command(args: StrengthsArgs) -> Result<i32, CliError> {
    let table = strengths_for(&args.config, &args.sequence)?;

    if args.config.json {
        print_json(table.records())?;
    } else {
        println!("{}", render_strengths(&table));
    }
    Ok(0)
}
