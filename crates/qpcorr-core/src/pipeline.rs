use crate::config::AnalysisConfig;
use crate::domain::{CorrError, CorrResult, Plane};
use crate::lattice::{OpticsTable, StrengthTable};
use crate::parser::{parse_sequence_strengths, parse_tfs, read_input_source};
use crate::report::{AnalysisReport, IpReport, PlaneSolution};
use crate::selection::{select_all, IpSelection, QuadrupoleSelector, SelectionSettings};
use crate::solver::{
    solve_corrections, solve_first_order, PhaseReference, RegionModel, RegionTarget, TargetKind,
};
use globset::Glob;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum OpticsSource {
    File(PathBuf),
    /// The `file_index`-th (1-based) file in `directory` matching the
    /// configured optics glob, in name order.
    DataDirectory { directory: PathBuf, file_index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    pub target: TargetKind,
    /// Simulated errors for synthetic targets; see [`crate::solver::expand_errors`].
    pub errors: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub optics: OpticsSource,
    pub sequence: Option<PathBuf>,
    /// Empty selects every interaction point in the table.
    pub interaction_points: Vec<u32>,
    pub solve: Option<SolveRequest>,
}

pub fn discover_optics_files(directory: &Path, pattern: &str) -> CorrResult<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .map_err(|source| {
            CorrError::input_validation(
                "INPUT.OPTICS_GLOB",
                format!("invalid optics file pattern '{pattern}': {source}"),
            )
        })?
        .compile_matcher();

    let entries = fs::read_dir(directory).map_err(|source| {
        CorrError::io_system(
            "IO.DATA_DIR_READ",
            format!(
                "failed to list data directory '{}': {source}",
                directory.display()
            ),
        )
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            CorrError::io_system(
                "IO.DATA_DIR_READ",
                format!(
                    "failed to read entry in '{}': {source}",
                    directory.display()
                ),
            )
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.is_match(Path::new(name)));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn resolve_optics_path(source: &OpticsSource, pattern: &str) -> CorrResult<PathBuf> {
    match source {
        OpticsSource::File(path) => Ok(path.clone()),
        OpticsSource::DataDirectory {
            directory,
            file_index,
        } => {
            let files = discover_optics_files(directory, pattern)?;
            file_index
                .checked_sub(1)
                .and_then(|index| files.get(index))
                .cloned()
                .ok_or_else(|| {
                    CorrError::input_validation(
                        "INPUT.OPTICS_FILE_INDEX",
                        format!(
                            "file index {file_index} is out of range: '{}' has {} files matching '{pattern}'",
                            directory.display(),
                            files.len()
                        ),
                    )
                })
        }
    }
}

pub fn load_optics(path: &Path) -> CorrResult<OpticsTable> {
    let source = read_input_source(path, "optics table")?;
    let table = parse_tfs(&source)?;
    OpticsTable::from_tfs(&table)
}

pub fn load_strengths(path: &Path, config: &AnalysisConfig) -> CorrResult<StrengthTable> {
    let source = read_input_source(path, "sequence file")?;
    parse_sequence_strengths(
        &source,
        &config.strength_parameter,
        &config.length_parameter,
    )
}

/// Solves both planes of one interaction region.
pub fn solve_selection(
    selection: &IpSelection,
    config: &AnalysisConfig,
    request: &SolveRequest,
) -> CorrResult<Vec<PlaneSolution>> {
    Plane::ALL
        .into_iter()
        .map(|plane| {
            let reference = PhaseReference {
                ip_phase: config.reference_phase(selection.ip.name(), plane),
                lattice_phase: config.lattice_phase,
            };
            let model = RegionModel::from_selection(selection, plane, config.phase_unit, reference)?;
            let target = RegionTarget::build(
                &model,
                request.target,
                &request.errors,
                config.simulated_error,
            )?;
            let outcome = if target.kind.refines() {
                solve_corrections(&model, &target.values, config.solver)?
            } else {
                solve_first_order(&model, &target.values)?
            };

            tracing::info!(
                ip = selection.ip.name(),
                plane = %plane,
                iterations = outcome.iterations,
                converged = outcome.converged,
                "solved correction region"
            );

            Ok(PlaneSolution {
                plane,
                target_kind: target.kind,
                ip_phase: reference.ip_phase,
                lattice_phase: reference.lattice_phase,
                magnets: model.magnets().to_vec(),
                target: target.values,
                simulated_errors: target.simulated_errors,
                outcome,
            })
        })
        .collect()
}

pub fn run_analysis(
    config: &AnalysisConfig,
    request: &AnalysisRequest,
) -> CorrResult<AnalysisReport> {
    config.validate()?;

    let optics_path = resolve_optics_path(&request.optics, &config.optics_glob)?;
    let optics = load_optics(&optics_path)?;
    let tables = optics.keyword_tables(&config.element_keywords());
    for (keyword, rows) in tables.tables() {
        tracing::debug!(keyword = %keyword, rows = rows.len(), "partitioned optics rows");
    }
    let quadrupole_count = tables.quadrupoles()?.len();
    tracing::info!(
        path = %optics_path.display(),
        elements = optics.len(),
        quadrupoles = quadrupole_count,
        "loaded optics table"
    );

    let strengths = request
        .sequence
        .as_deref()
        .map(|path| load_strengths(path, config))
        .transpose()?;
    if let Some(strengths) = &strengths {
        tracing::info!(records = strengths.records().len(), "loaded sequence strengths");
    }

    let settings = SelectionSettings::new(config.window, config.selected)?;
    let mut selector = QuadrupoleSelector::new(&tables, settings)?;
    if let Some(strengths) = &strengths {
        selector = selector.with_strengths(strengths, config.kl_scale);
    }
    let selections = select_all(
        &selector,
        &tables,
        &config.ip_prefix,
        &request.interaction_points,
    )?;

    let interaction_points = selections
        .into_iter()
        .map(|selection| {
            let solutions = match &request.solve {
                Some(solve) => solve_selection(&selection, config, solve)?,
                None => Vec::new(),
            };
            Ok(IpReport {
                selection,
                solutions,
            })
        })
        .collect::<CorrResult<Vec<_>>>()?;

    Ok(AnalysisReport {
        optics_path: optics_path.display().to_string(),
        sequence_path: request
            .sequence
            .as_ref()
            .map(|path| path.display().to_string()),
        element_count: optics.len(),
        quadrupole_count,
        window: config.window,
        selected: config.selected,
        phase_unit: config.phase_unit,
        interaction_points,
    })
}
