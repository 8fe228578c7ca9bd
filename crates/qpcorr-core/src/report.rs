use crate::config::PhaseUnit;
use crate::domain::{Plane, Side};
use crate::lattice::StrengthTable;
use crate::selection::{IpSelection, SelectedMagnet};
use crate::solver::{CorrectionOutcome, RegionMagnet, TargetKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub optics_path: String,
    pub sequence_path: Option<String>,
    pub element_count: usize,
    pub quadrupole_count: usize,
    pub window: usize,
    pub selected: usize,
    pub phase_unit: PhaseUnit,
    pub interaction_points: Vec<IpReport>,
}

impl AnalysisReport {
    /// True when every solved plane converged; vacuously true without solves.
    pub fn converged(&self) -> bool {
        self.interaction_points
            .iter()
            .flat_map(|ip| &ip.solutions)
            .all(|solution| solution.outcome.converged)
    }

    pub fn solution_count(&self) -> usize {
        self.interaction_points
            .iter()
            .map(|ip| ip.solutions.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpReport {
    pub selection: IpSelection,
    pub solutions: Vec<PlaneSolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaneSolution {
    pub plane: Plane,
    pub target_kind: TargetKind,
    pub ip_phase: f64,
    pub lattice_phase: f64,
    pub magnets: Vec<RegionMagnet>,
    pub target: Vec<f64>,
    pub simulated_errors: Option<Vec<f64>>,
    pub outcome: CorrectionOutcome,
}

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!("{value:>width$.precision$}")
}

pub fn format_scientific_f64(value: f64, width: usize, precision: usize) -> String {
    format!("{value:>width$.precision$e}")
}

pub fn render_selection(selection: &IpSelection) -> String {
    let ip = &selection.ip;
    let mut lines = vec![format!(
        "{} (row {}, s = {})",
        ip.name(),
        ip.element.row,
        format_fixed_f64(ip.element.s, 0, 4)
    )];
    lines.push(format!(
        "  {:<5} {:<5} {:>6}  {:<16} {:>12} {:>14}",
        "side", "plane", "offset", "name", "beta", "kl"
    ));

    for side in [Side::Left, Side::Right] {
        for plane in Plane::ALL {
            for magnet in selection.subset(side, plane) {
                lines.push(render_selected_magnet(side, plane, magnet));
            }
        }
    }
    lines.join("\n")
}

fn render_selected_magnet(side: Side, plane: Plane, magnet: &SelectedMagnet) -> String {
    let kl = magnet
        .kl
        .map(|kl| format_scientific_f64(kl, 14, 6))
        .unwrap_or_else(|| format!("{:>14}", "-"));
    format!(
        "  {:<5} {:<5} {:>6}  {:<16} {} {}",
        side.to_string(),
        plane.to_string(),
        magnet.offset,
        magnet.element.name,
        format_fixed_f64(magnet.element.beta(plane), 12, 4),
        kl
    )
}

pub fn render_solution(ip_name: &str, solution: &PlaneSolution) -> String {
    let outcome = &solution.outcome;
    let status = if outcome.converged {
        format!("converged after {} iterations", outcome.iterations)
    } else {
        format!("NOT converged after {} iterations", outcome.iterations)
    };
    let mut lines = vec![format!(
        "Solution {ip_name} {} ({} target): {status}, last delta {}, residual {}",
        solution.plane,
        solution.target_kind.as_str(),
        format_scientific_f64(outcome.last_delta, 0, 3),
        format_scientific_f64(outcome.residual, 0, 3),
    )];
    lines.push(format!(
        "  {:>6}  {:<16} {:>12} {:>10} {:>14} {:>14} {:>14}",
        "offset", "name", "beta", "phase", "target", "first order", "estimate"
    ));

    for (index, magnet) in solution.magnets.iter().enumerate() {
        let mut line = format!(
            "  {:>6}  {:<16} {} {} {} {} {}",
            magnet.offset,
            magnet.name,
            format_fixed_f64(magnet.beta, 12, 4),
            format_fixed_f64(magnet.phase, 10, 6),
            format_scientific_f64(solution.target[index], 14, 6),
            format_scientific_f64(outcome.first_order[index], 14, 6),
            format_scientific_f64(outcome.estimate[index], 14, 6),
        );
        if let Some(errors) = &solution.simulated_errors {
            line.push_str(&format!(" (simulated {})", format_scientific_f64(errors[index], 0, 3)));
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn render_human_summary(report: &AnalysisReport) -> String {
    let mut lines = vec![format!(
        "Optics: {} ({} elements, {} quadrupoles)",
        report.optics_path, report.element_count, report.quadrupole_count
    )];
    if let Some(sequence) = &report.sequence_path {
        lines.push(format!("Strengths: {sequence}"));
    }
    lines.push(format!(
        "Selection: window {}, {} per side ({} per plane)",
        report.window,
        report.selected,
        report.selected / 2
    ));

    for ip in &report.interaction_points {
        lines.push(String::new());
        lines.push(render_selection(&ip.selection));
        for solution in &ip.solutions {
            lines.push(render_solution(ip.selection.ip.name(), solution));
        }
    }

    if report.solution_count() > 0 {
        lines.push(String::new());
        let status = if report.converged() { "CONVERGED" } else { "NOT CONVERGED" };
        lines.push(format!(
            "Correction status: {status} ({} plane solutions)",
            report.solution_count()
        ));
    }
    lines.join("\n")
}

pub fn render_strengths(table: &StrengthTable) -> String {
    let mut lines = vec![format!(
        "{:<16} {:>14} {:>10} {:>14}",
        "name", "k1", "length", "kl"
    )];
    lines.extend(table.records().iter().map(|record| {
        format!(
            "{:<16} {} {} {}",
            record.name,
            format_scientific_f64(record.k1, 14, 6),
            format_fixed_f64(record.length, 10, 4),
            format_scientific_f64(record.kl, 14, 6)
        )
    }));
    lines.join("\n")
}
