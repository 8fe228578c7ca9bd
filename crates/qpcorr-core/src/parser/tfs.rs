//! Reader for the column-oriented TFS tables written by MAD-X `twiss`.
//!
//! Only the structure is interpreted here; typed access to the physics
//! columns happens in [`crate::lattice::OpticsTable`].

use crate::domain::{CorrError, ParserResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfsHeader {
    pub name: String,
    pub format: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TfsRow {
    pub source_line: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TfsTable {
    pub headers: Vec<TfsHeader>,
    pub columns: Vec<String>,
    pub formats: Vec<String>,
    pub rows: Vec<TfsRow>,
}

impl TfsTable {
    pub fn header(&self, name: &str) -> Option<&TfsHeader> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn require_column(&self, name: &str) -> ParserResult<usize> {
        self.column_index(name).ok_or_else(|| {
            CorrError::input_validation(
                "INPUT.TFS_MISSING_COLUMN",
                format!(
                    "TFS table is missing required column '{}' (found: {})",
                    name,
                    self.columns.join(", ")
                ),
            )
        })
    }

    pub fn text<'a>(&self, row: &'a TfsRow, column: usize) -> &'a str {
        row.fields[column].as_str()
    }

    pub fn number(&self, row: &TfsRow, column: usize) -> ParserResult<f64> {
        let raw = row.fields[column].as_str();
        raw.parse::<f64>().map_err(|_| {
            CorrError::input_validation(
                "INPUT.TFS_NUMBER",
                format!(
                    "column '{}' at line {} holds non-numeric value '{}'",
                    self.columns[column], row.source_line, raw
                ),
            )
        })
    }
}

pub fn parse_tfs(source: &str) -> ParserResult<TfsTable> {
    let mut table = TfsTable::default();
    let mut saw_columns = false;

    for (index, line) in source.lines().enumerate() {
        let source_line = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('@') {
            table.headers.push(parse_header(rest, source_line)?);
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('*') {
            if saw_columns {
                return Err(CorrError::input_validation(
                    "INPUT.TFS_COLUMNS",
                    format!("duplicate column line at line {}", source_line),
                ));
            }
            table.columns = split_tfs_fields(rest, source_line)?;
            if table.columns.is_empty() {
                return Err(CorrError::input_validation(
                    "INPUT.TFS_COLUMNS",
                    format!("column line at line {} names no columns", source_line),
                ));
            }
            saw_columns = true;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('$') {
            let formats = split_tfs_fields(rest, source_line)?;
            if !saw_columns || formats.len() != table.columns.len() {
                return Err(CorrError::input_validation(
                    "INPUT.TFS_FORMATS",
                    format!(
                        "format line at line {} has {} entries for {} columns",
                        source_line,
                        formats.len(),
                        table.columns.len()
                    ),
                ));
            }
            table.formats = formats;
            continue;
        }

        if !saw_columns {
            return Err(CorrError::input_validation(
                "INPUT.TFS_ROW",
                format!("data row at line {} precedes the column line", source_line),
            ));
        }

        let fields = split_tfs_fields(trimmed, source_line)?;
        if fields.len() != table.columns.len() {
            return Err(CorrError::input_validation(
                "INPUT.TFS_ROW",
                format!(
                    "row at line {} has {} fields, expected {}",
                    source_line,
                    fields.len(),
                    table.columns.len()
                ),
            ));
        }
        table.rows.push(TfsRow {
            source_line,
            fields,
        });
    }

    if !saw_columns {
        return Err(CorrError::input_validation(
            "INPUT.TFS_COLUMNS",
            "TFS source has no column line",
        ));
    }

    Ok(table)
}

fn parse_header(rest: &str, source_line: usize) -> ParserResult<TfsHeader> {
    let mut fields = split_tfs_fields(rest, source_line)?.into_iter();
    let (Some(name), Some(format)) = (fields.next(), fields.next()) else {
        return Err(CorrError::input_validation(
            "INPUT.TFS_HEADER",
            format!(
                "header at line {} needs a name and a format",
                source_line
            ),
        ));
    };

    Ok(TfsHeader {
        name,
        format,
        value: fields.collect::<Vec<_>>().join(" "),
    })
}

fn split_tfs_fields(line: &str, source_line: usize) -> ParserResult<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut field = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '"' {
                    closed = true;
                    break;
                }
                field.push(ch);
            }
            if !closed {
                return Err(CorrError::input_validation(
                    "INPUT.TFS_QUOTE",
                    format!("unterminated quoted field at line {}", source_line),
                ));
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace()) {
                field.push(ch);
            }
        }
        fields.push(field);
    }

    Ok(fields)
}
