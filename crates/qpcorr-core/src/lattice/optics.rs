use crate::domain::{
    CorrError, CorrResult, ElementKeyword, InteractionPoint, LatticeElement, ParserResult,
};
use crate::parser::TfsTable;
use std::collections::BTreeMap;

pub const REQUIRED_OPTICS_COLUMNS: [&str; 7] =
    ["NAME", "KEYWORD", "S", "MUX", "MUY", "BETX", "BETY"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpticsTable {
    elements: Vec<LatticeElement>,
}

impl OpticsTable {
    pub fn new(elements: Vec<LatticeElement>) -> Self {
        Self { elements }
    }

    pub fn from_tfs(table: &TfsTable) -> ParserResult<Self> {
        let [name, keyword, s, mux, muy, betx, bety] = REQUIRED_OPTICS_COLUMNS;
        let name = table.require_column(name)?;
        let keyword = table.require_column(keyword)?;
        let s = table.require_column(s)?;
        let mux = table.require_column(mux)?;
        let muy = table.require_column(muy)?;
        let betx = table.require_column(betx)?;
        let bety = table.require_column(bety)?;

        let mut elements = Vec::with_capacity(table.rows.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            elements.push(LatticeElement {
                row: row_index,
                name: table.text(row, name).to_string(),
                keyword: ElementKeyword::from_keyword(table.text(row, keyword)),
                s: table.number(row, s)?,
                mux: table.number(row, mux)?,
                muy: table.number(row, muy)?,
                betx: table.number(row, betx)?,
                bety: table.number(row, bety)?,
            });
        }

        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[LatticeElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Splits the table into one position-ordered sub-table per requested keyword.
    /// Keywords without rows map to an empty table.
    pub fn partition(
        &self,
        keywords: &[ElementKeyword],
    ) -> BTreeMap<ElementKeyword, Vec<LatticeElement>> {
        let mut tables: BTreeMap<ElementKeyword, Vec<LatticeElement>> = keywords
            .iter()
            .cloned()
            .map(|keyword| (keyword, Vec::new()))
            .collect();

        for element in &self.elements {
            if let Some(rows) = tables.get_mut(&element.keyword) {
                rows.push(element.clone());
            }
        }

        tables
    }

    /// Partition over `keywords`, the only view the selector and IP lookup use.
    pub fn keyword_tables(&self, keywords: &[ElementKeyword]) -> KeywordTables {
        KeywordTables {
            tables: self.partition(keywords),
        }
    }
}

/// Optics rows grouped by element keyword. Only keywords that were requested
/// at partition time are present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeywordTables {
    tables: BTreeMap<ElementKeyword, Vec<LatticeElement>>,
}

impl KeywordTables {
    pub fn tables(&self) -> &BTreeMap<ElementKeyword, Vec<LatticeElement>> {
        &self.tables
    }

    pub fn rows(&self, keyword: &ElementKeyword) -> CorrResult<&[LatticeElement]> {
        self.tables
            .get(keyword)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                CorrError::input_validation(
                    "INPUT.KEYWORD_TABLE",
                    format!(
                        "keyword {} is not among the partitioned keywords ({})",
                        keyword,
                        self.tables
                            .keys()
                            .map(ElementKeyword::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })
    }

    pub fn quadrupoles(&self) -> CorrResult<&[LatticeElement]> {
        self.rows(&ElementKeyword::Quadrupole)
    }

    /// Markers named `<prefix><digits>`, in table order.
    pub fn interaction_points(&self, prefix: &str) -> CorrResult<Vec<InteractionPoint>> {
        Ok(self
            .rows(&ElementKeyword::Marker)?
            .iter()
            .filter_map(|element| {
                interaction_point_number(&element.name, prefix).map(|number| InteractionPoint {
                    number,
                    element: element.clone(),
                })
            })
            .collect())
    }

    pub fn interaction_point(&self, prefix: &str, number: u32) -> CorrResult<InteractionPoint> {
        self.interaction_points(prefix)?
            .into_iter()
            .find(|point| point.number == number)
            .ok_or_else(|| {
                CorrError::input_validation(
                    "INPUT.IP_LOOKUP",
                    format!("optics table has no marker named '{}{}'", prefix, number),
                )
            })
    }
}

fn interaction_point_number(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::OpticsTable;
    use crate::domain::{ElementKeyword, ErrorCategory};
    use crate::parser::parse_tfs;

    const OPTICS_FIXTURE: &str = r#"@ NAME %05s "TWISS"
* NAME      KEYWORD       S     MUX    MUY    BETX    BETY
$ %s        %s            %le   %le    %le    %le     %le
"IP.1"      "MARKER"      0.0   0.0    0.0    0.15    0.0008
"QC1L1.1"   "QUADRUPOLE"  2.2   0.24   0.249  80.0    2900.0
"DRIFT_0"   "DRIFT"       3.0   0.245  0.249  90.0    3100.0
"IP.1.MID"  "MARKER"      5.0   0.25   0.25   100.0   100.0
"QC2L1.1"   "QUADRUPOLE"  6.0   0.26   0.251  600.0   50.0
"IP.2"      "MARKER"      9.0   0.5    0.5    0.15    0.0008
"#;

    fn table() -> OpticsTable {
        OpticsTable::from_tfs(&parse_tfs(OPTICS_FIXTURE).expect("tfs parses"))
            .expect("optics columns present")
    }

    #[test]
    fn projects_required_columns_with_row_indices() {
        let table = table();
        assert_eq!(table.len(), 6);

        let quad = &table.elements()[1];
        assert_eq!(quad.row, 1);
        assert_eq!(quad.name, "QC1L1.1");
        assert_eq!(quad.keyword, ElementKeyword::Quadrupole);
        assert_eq!(quad.s, 2.2);
        assert_eq!(quad.betx, 80.0);
        assert_eq!(quad.bety, 2900.0);
    }

    #[test]
    fn partition_maps_each_keyword_to_its_rows() {
        let tables = table().partition(&[ElementKeyword::Marker, ElementKeyword::Quadrupole]);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[&ElementKeyword::Marker].len(), 3);
        let quads = &tables[&ElementKeyword::Quadrupole];
        assert_eq!(
            quads.iter().map(|element| element.name.as_str()).collect::<Vec<_>>(),
            ["QC1L1.1", "QC2L1.1"]
        );
    }

    #[test]
    fn interaction_points_match_prefix_and_digits_only() {
        let tables = table().keyword_tables(&[ElementKeyword::Marker, ElementKeyword::Quadrupole]);
        let points = tables.interaction_points("IP.").expect("markers are partitioned");
        assert_eq!(
            points.iter().map(|point| point.number).collect::<Vec<_>>(),
            [1, 2]
        );
        assert_eq!(points[1].element.row, 5);

        let error = tables
            .interaction_point("IP.", 3)
            .expect_err("IP.3 is absent");
        assert_eq!(error.category(), ErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.IP_LOOKUP");
    }

    #[test]
    fn keyword_tables_only_expose_requested_keywords() {
        let tables = table().keyword_tables(&[ElementKeyword::Quadrupole]);

        assert_eq!(tables.quadrupoles().expect("quadrupoles").len(), 2);
        let error = tables
            .interaction_points("IP.")
            .expect_err("markers were not partitioned");
        assert_eq!(error.placeholder(), "INPUT.KEYWORD_TABLE");

        let drifts = table().keyword_tables(&[ElementKeyword::from_keyword("DRIFT")]);
        assert_eq!(
            drifts.rows(&ElementKeyword::from_keyword("drift")).expect("drifts").len(),
            1
        );
        assert_eq!(
            drifts.quadrupoles().expect_err("no quadrupoles").placeholder(),
            "INPUT.KEYWORD_TABLE"
        );
    }

    #[test]
    fn missing_optics_column_is_rejected() {
        let source = "* NAME KEYWORD S\n\"IP.1\" \"MARKER\" 0.0\n";
        let error = OpticsTable::from_tfs(&parse_tfs(source).expect("tfs parses"))
            .expect_err("MUX is missing");
        assert_eq!(error.placeholder(), "INPUT.TFS_MISSING_COLUMN");
    }
}
