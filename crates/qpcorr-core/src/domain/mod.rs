pub mod errors;

pub use errors::{CorrError, CorrResult, ErrorCategory, ParserResult};

use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKeyword {
    Marker,
    Quadrupole,
    Other(String),
}

impl ElementKeyword {
    pub fn from_keyword(keyword: &str) -> Self {
        let normalized = keyword.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "MARKER" => Self::Marker,
            "QUADRUPOLE" => Self::Quadrupole,
            _ => Self::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Marker => "MARKER",
            Self::Quadrupole => "QUADRUPOLE",
            Self::Other(keyword) => keyword,
        }
    }
}

impl Display for ElementKeyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementKeyword {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    Horizontal,
    Vertical,
}

impl Plane {
    pub const ALL: [Plane; 2] = [Plane::Horizontal, Plane::Vertical];

    pub const fn beta_column(self) -> &'static str {
        match self {
            Self::Horizontal => "BETX",
            Self::Vertical => "BETY",
        }
    }

    pub const fn phase_column(self) -> &'static str {
        match self {
            Self::Horizontal => "MUX",
            Self::Vertical => "MUY",
        }
    }
}

impl Display for Plane {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => f.write_str("X"),
            Self::Vertical => f.write_str("Y"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// One row of the optics table, reduced to the columns the analysis needs.
///
/// `row` is the index in the full position-ordered table, which is what side
/// assignment compares against. Names are not unique across repeated cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatticeElement {
    pub row: usize,
    pub name: String,
    pub keyword: ElementKeyword,
    pub s: f64,
    pub mux: f64,
    pub muy: f64,
    pub betx: f64,
    pub bety: f64,
}

impl LatticeElement {
    pub fn beta(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.betx,
            Plane::Vertical => self.bety,
        }
    }

    pub fn phase(&self, plane: Plane) -> f64 {
        match plane {
            Plane::Horizontal => self.mux,
            Plane::Vertical => self.muy,
        }
    }

    /// Name up to the first `.`, which is how repeated cells share a magnet family.
    pub fn base_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnetStrength {
    pub name: String,
    pub k1: f64,
    pub length: f64,
    pub kl: f64,
}

impl MagnetStrength {
    pub fn new(name: impl Into<String>, k1: f64, length: f64) -> Self {
        Self {
            name: name.into(),
            k1,
            length,
            kl: k1 * length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionPoint {
    pub number: u32,
    pub element: LatticeElement,
}

impl InteractionPoint {
    pub fn name(&self) -> &str {
        &self.element.name
    }
}

#[cfg(test)]
mod tests {
    use super::{ElementKeyword, LatticeElement, MagnetStrength, Plane};

    #[test]
    fn keyword_parsing_is_case_insensitive() {
        assert_eq!(ElementKeyword::from_keyword("marker"), ElementKeyword::Marker);
        assert_eq!(
            ElementKeyword::from_keyword(" Quadrupole "),
            ElementKeyword::Quadrupole
        );
        assert_eq!(
            ElementKeyword::from_keyword("sbend"),
            ElementKeyword::Other("SBEND".to_string())
        );
    }

    #[test]
    fn plane_accessors_pick_matching_columns() {
        let element = LatticeElement {
            row: 3,
            name: "QC1L1.2".to_string(),
            keyword: ElementKeyword::Quadrupole,
            s: 12.5,
            mux: 0.25,
            muy: 0.75,
            betx: 100.0,
            bety: 2000.0,
        };

        assert_eq!(element.beta(Plane::Horizontal), 100.0);
        assert_eq!(element.beta(Plane::Vertical), 2000.0);
        assert_eq!(element.phase(Plane::Vertical), 0.75);
        assert_eq!(element.base_name(), "QC1L1");
    }

    #[test]
    fn strength_derives_kl_product() {
        let strength = MagnetStrength::new("QC1L1", -0.125, 2.0);
        assert_eq!(strength.kl, -0.25);
    }
}
