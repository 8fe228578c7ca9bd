use crate::domain::{CorrError, MagnetStrength, ParserResult};
use crate::lattice::StrengthTable;
use std::collections::BTreeMap;

pub const DEFAULT_STRENGTH_PARAMETER: &str = "K1";
pub const DEFAULT_LENGTH_PARAMETER: &str = "L";

/// Quadrupole definitions start with the parameter followed by the magnet name,
/// and every quadrupole name starts with `Q`.
const QUADRUPOLE_NAME_PREFIX: char = 'Q';

/// Extracts `<param><name> = <value>;` assignments for the strength and length
/// parameters and joins them into `k1 * l` products.
pub fn parse_sequence_strengths(
    source: &str,
    strength_parameter: &str,
    length_parameter: &str,
) -> ParserResult<StrengthTable> {
    let strengths = collect_parameter_values(source, strength_parameter)?;
    let lengths = collect_parameter_values(source, length_parameter)?;

    let mut length_lookup = BTreeMap::new();
    for (name, value, source_line) in &lengths {
        length_lookup.insert(name.to_ascii_uppercase(), (*value, *source_line));
    }

    let mut records = Vec::with_capacity(strengths.len());
    for (name, k1, source_line) in strengths {
        let Some((length, _)) = length_lookup.remove(&name.to_ascii_uppercase()) else {
            return Err(CorrError::input_validation(
                "INPUT.SEQUENCE_UNPAIRED",
                format!(
                    "quadrupole '{}' defines {} at line {} but no {}",
                    name, strength_parameter, source_line, length_parameter
                ),
            ));
        };
        records.push(MagnetStrength::new(name, k1, length));
    }

    if let Some((name, (_, source_line))) = length_lookup.into_iter().next() {
        return Err(CorrError::input_validation(
            "INPUT.SEQUENCE_UNPAIRED",
            format!(
                "quadrupole '{}' defines {} at line {} but no {}",
                name, length_parameter, source_line, strength_parameter
            ),
        ));
    }

    Ok(StrengthTable::new(records))
}

fn collect_parameter_values(
    source: &str,
    parameter: &str,
) -> ParserResult<Vec<(String, f64, usize)>> {
    let mut prefix = parameter.to_string();
    prefix.push(QUADRUPOLE_NAME_PREFIX);

    let mut values = Vec::new();
    let mut first_seen = BTreeMap::new();
    for (index, line) in source.lines().enumerate() {
        if !line.starts_with(&prefix) {
            continue;
        }
        let source_line = index + 1;
        let (name, value) = parse_assignment(&line[parameter.len()..], source_line)?;
        if let Some(first_line) = first_seen.insert(name.to_ascii_uppercase(), source_line) {
            return Err(CorrError::input_validation(
                "INPUT.SEQUENCE_DUPLICATE",
                format!(
                    "quadrupole '{}' assigns {} at line {} and again at line {}",
                    name, parameter, first_line, source_line
                ),
            ));
        }
        values.push((name, value, source_line));
    }

    Ok(values)
}

fn parse_assignment(assignment: &str, source_line: usize) -> ParserResult<(String, f64)> {
    let shape_error = || {
        CorrError::input_validation(
            "INPUT.SEQUENCE_LINE",
            format!(
                "line {} does not match '<name> = <value>;': '{}'",
                source_line,
                assignment.trim()
            ),
        )
    };

    let (name, value) = assignment.split_once('=').ok_or_else(shape_error)?;
    let name = name.trim().trim_end_matches(':').trim();
    let value = value.trim().strip_suffix(';').ok_or_else(shape_error)?.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(shape_error());
    }

    let value = value.parse::<f64>().map_err(|_| {
        CorrError::input_validation(
            "INPUT.SEQUENCE_VALUE",
            format!(
                "line {} assigns non-numeric value '{}' to '{}'",
                source_line, value, name
            ),
        )
    })?;

    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::{parse_sequence_strengths, DEFAULT_LENGTH_PARAMETER, DEFAULT_STRENGTH_PARAMETER};

    const SEQUENCE_FIXTURE: &str = "! FCC-ee quadrupole settings
K1QC1L1 = -0.1265;
K1QC2L1 = 0.0815;
LQC1L1 = 1.2;
LQC2L1 = 1.25;
K1SF1 = 0.4;
QC1L1: QUADRUPOLE, L := LQC1L1, K1 := K1QC1L1;
";

    #[test]
    fn pairs_strength_and_length_by_name() {
        let table = parse_sequence_strengths(
            SEQUENCE_FIXTURE,
            DEFAULT_STRENGTH_PARAMETER,
            DEFAULT_LENGTH_PARAMETER,
        )
        .expect("fixture should parse");

        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "QC1L1");
        assert_eq!(records[0].k1, -0.1265);
        assert_eq!(records[0].length, 1.2);
        assert!((records[0].kl - (-0.1265 * 1.2)).abs() < 1.0e-15);
        assert_eq!(records[1].name, "QC2L1");
    }

    #[test]
    fn deferred_assignment_is_accepted() {
        let source = "K1QF4 := 0.25;\nLQF4 := 2.0;\n";
        let table = parse_sequence_strengths(source, "K1", "L").expect("should parse");
        assert_eq!(table.records()[0].kl, 0.5);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let source = "K1QC1L1 = -0.1265;\nK1QC2L1 -0.2;\n";
        let error = parse_sequence_strengths(source, "K1", "L").expect_err("missing '='");
        assert_eq!(error.placeholder(), "INPUT.SEQUENCE_LINE");
        assert!(error.message().contains("line 2"));

        let missing_semicolon = "K1QC1L1 = -0.1265\n";
        let error =
            parse_sequence_strengths(missing_semicolon, "K1", "L").expect_err("missing ';'");
        assert_eq!(error.placeholder(), "INPUT.SEQUENCE_LINE");
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let error = parse_sequence_strengths("K1QC1L1 = kqc1;\nLQC1L1 = 1.0;\n", "K1", "L")
            .expect_err("value is a symbol");
        assert_eq!(error.placeholder(), "INPUT.SEQUENCE_VALUE");
    }

    #[test]
    fn repeated_assignment_reports_both_lines() {
        let source = "K1QC1L1 = -0.1;\nLQC1L1 = 1.0;\nLQC1l1 = 2.0;\n";
        let error = parse_sequence_strengths(source, "K1", "L").expect_err("length repeated");
        assert_eq!(error.placeholder(), "INPUT.SEQUENCE_DUPLICATE");
        assert!(error.message().contains("line 2"), "{}", error.message());
        assert!(error.message().contains("line 3"), "{}", error.message());

        let source = "K1QC1L1 = -0.1;\nK1QC1L1 = -0.2;\nLQC1L1 = 1.0;\n";
        let error = parse_sequence_strengths(source, "K1", "L").expect_err("strength repeated");
        assert_eq!(error.placeholder(), "INPUT.SEQUENCE_DUPLICATE");
        assert!(error.message().contains("K1 at line 1 and again at line 2"));
    }

    #[test]
    fn unpaired_parameters_are_rejected() {
        let strength_only = parse_sequence_strengths("K1QC1L1 = -0.1;\n", "K1", "L")
            .expect_err("length missing");
        assert_eq!(strength_only.placeholder(), "INPUT.SEQUENCE_UNPAIRED");

        let length_only = parse_sequence_strengths("LQC1L1 = 1.0;\n", "K1", "L")
            .expect_err("strength missing");
        assert_eq!(length_only.placeholder(), "INPUT.SEQUENCE_UNPAIRED");
    }
}
