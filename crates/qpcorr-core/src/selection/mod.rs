//! Quadrupole selection around interaction points.
//!
//! For each IP, `window` quadrupoles are searched on each side and the
//! `selected / 2` with the largest beta function are kept per plane. A magnet
//! name is claimed at most once per IP across the four subsets, in the order
//! left/X, left/Y, right/X, right/Y.

mod ranking;
mod window;

use crate::domain::{CorrError, CorrResult, InteractionPoint, LatticeElement, Plane, Side};
use crate::lattice::{KeywordTables, StrengthTable};
use ranking::pick_unclaimed;
use serde::Serialize;
use std::collections::BTreeSet;
use window::{side_window, WindowCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSettings {
    pub window: usize,
    pub selected: usize,
}

impl SelectionSettings {
    pub fn new(window: usize, selected: usize) -> CorrResult<Self> {
        if window == 0 {
            return Err(CorrError::input_validation(
                "INPUT.SELECTION_SETTINGS",
                "selection window must contain at least one quadrupole",
            ));
        }
        if selected == 0 || selected % 2 != 0 {
            return Err(CorrError::input_validation(
                "INPUT.SELECTION_SETTINGS",
                format!(
                    "number of selected quadrupoles must be a positive even number, got {}",
                    selected
                ),
            ));
        }
        Ok(Self { window, selected })
    }

    pub fn per_plane(&self) -> usize {
        self.selected / 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedMagnet {
    pub element: LatticeElement,
    pub offset: isize,
    pub kl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpSelection {
    pub ip: InteractionPoint,
    pub left_x: Vec<SelectedMagnet>,
    pub left_y: Vec<SelectedMagnet>,
    pub right_x: Vec<SelectedMagnet>,
    pub right_y: Vec<SelectedMagnet>,
}

impl IpSelection {
    pub fn subset(&self, side: Side, plane: Plane) -> &[SelectedMagnet] {
        match (side, plane) {
            (Side::Left, Plane::Horizontal) => &self.left_x,
            (Side::Left, Plane::Vertical) => &self.left_y,
            (Side::Right, Plane::Horizontal) => &self.right_x,
            (Side::Right, Plane::Vertical) => &self.right_y,
        }
    }

    /// Both sides of one plane ordered along the beam: far left to near left,
    /// then near right to far right.
    pub fn region(&self, plane: Plane) -> Vec<&SelectedMagnet> {
        let mut magnets: Vec<&SelectedMagnet> = self
            .subset(Side::Left, plane)
            .iter()
            .chain(self.subset(Side::Right, plane))
            .collect();
        magnets.sort_by_key(|magnet| magnet.offset);
        magnets
    }

    pub fn magnets(&self) -> impl Iterator<Item = &SelectedMagnet> {
        self.left_x
            .iter()
            .chain(&self.left_y)
            .chain(&self.right_x)
            .chain(&self.right_y)
    }
}

#[derive(Debug, Clone)]
pub struct QuadrupoleSelector<'a> {
    quadrupoles: Vec<LatticeElement>,
    settings: SelectionSettings,
    strengths: Option<(&'a StrengthTable, f64)>,
}

impl<'a> QuadrupoleSelector<'a> {
    pub fn new(tables: &KeywordTables, settings: SelectionSettings) -> CorrResult<Self> {
        let quadrupoles = tables.quadrupoles()?.to_vec();
        if quadrupoles.is_empty() {
            return Err(CorrError::input_validation(
                "INPUT.SELECTION_NO_QUADRUPOLES",
                "optics table contains no QUADRUPOLE rows",
            ));
        }

        Ok(Self {
            quadrupoles,
            settings,
            strengths: None,
        })
    }

    /// Attaches integrated strengths, scaled by `kl_scale`, to every pick.
    pub fn with_strengths(mut self, strengths: &'a StrengthTable, kl_scale: f64) -> Self {
        self.strengths = Some((strengths, kl_scale));
        self
    }

    pub fn settings(&self) -> SelectionSettings {
        self.settings
    }

    pub fn select(&self, ip: &InteractionPoint) -> CorrResult<IpSelection> {
        let mut claimed = BTreeSet::new();
        let left = side_window(
            &self.quadrupoles,
            ip.element.row,
            Side::Left,
            self.settings.window,
        );
        let right = side_window(
            &self.quadrupoles,
            ip.element.row,
            Side::Right,
            self.settings.window,
        );

        let left_x = self.pick(ip, &left, Side::Left, Plane::Horizontal, &mut claimed)?;
        let left_y = self.pick(ip, &left, Side::Left, Plane::Vertical, &mut claimed)?;
        let right_x = self.pick(ip, &right, Side::Right, Plane::Horizontal, &mut claimed)?;
        let right_y = self.pick(ip, &right, Side::Right, Plane::Vertical, &mut claimed)?;

        tracing::debug!(
            ip = ip.name(),
            window = self.settings.window,
            claimed = claimed.len(),
            "selected quadrupoles"
        );

        Ok(IpSelection {
            ip: ip.clone(),
            left_x,
            left_y,
            right_x,
            right_y,
        })
    }

    fn pick(
        &self,
        ip: &InteractionPoint,
        candidates: &[WindowCandidate<'_>],
        side: Side,
        plane: Plane,
        claimed: &mut BTreeSet<String>,
    ) -> CorrResult<Vec<SelectedMagnet>> {
        let count = self.settings.per_plane();
        let picks = pick_unclaimed(candidates, plane, count, claimed).map_err(|shortage| {
            CorrError::input_validation(
                "INPUT.SELECTION_WINDOW",
                format!(
                    "{} {} side: only {} of {} {} candidates are available in a window of {} quadrupoles",
                    ip.name(),
                    side,
                    shortage.found,
                    count,
                    plane.beta_column(),
                    self.settings.window
                ),
            )
        })?;

        Ok(picks
            .into_iter()
            .map(|pick| SelectedMagnet {
                element: pick.element.clone(),
                offset: pick.offset,
                kl: self.kl_for(&pick.element.name),
            })
            .collect())
    }

    fn kl_for(&self, name: &str) -> Option<f64> {
        let (strengths, scale) = self.strengths?;
        let kl = strengths.kl_for(name, scale);
        if kl.is_none() {
            tracing::warn!(magnet = name, "no sequence strength found for selected quadrupole");
        }
        kl
    }
}

/// Selects quadrupoles for the requested IP numbers, or for every IP in the
/// table when `numbers` is empty.
pub fn select_all(
    selector: &QuadrupoleSelector<'_>,
    tables: &KeywordTables,
    ip_prefix: &str,
    numbers: &[u32],
) -> CorrResult<Vec<IpSelection>> {
    let points = if numbers.is_empty() {
        tables.interaction_points(ip_prefix)?
    } else {
        numbers
            .iter()
            .map(|number| tables.interaction_point(ip_prefix, *number))
            .collect::<CorrResult<Vec<_>>>()?
    };

    if points.is_empty() {
        return Err(CorrError::input_validation(
            "INPUT.IP_LOOKUP",
            format!("optics table has no markers named '{}<n>'", ip_prefix),
        ));
    }

    points.iter().map(|point| selector.select(point)).collect()
}
