//! DNA (digital name assignment) table.
//!
//! The `DNA` command prints one row per digital bank: eight quoted point
//! names, most significant bit first, followed by a quoted row checksum.
//! Unused points are named `*`.

use crate::error::ParseError;

const BLOCK: &str = "DNA";
const FIELDS_PER_ROW: usize = 9;

/// Name of an unassigned point.
pub const PLACEHOLDER: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnaRow {
    pub names: Vec<String>,
    pub checksum: String,
}

/// Digital point names, one row per bank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnaDefinition {
    pub rows: Vec<DnaRow>,
}

impl DnaDefinition {
    /// Assigned point names in bank order.
    pub fn point_names(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|row| row.names.iter())
            .map(String::as_str)
            .filter(|name| *name != PLACEHOLDER)
    }
}

/// Parse a `DNA` response.
///
/// Lines before the first comma-separated row (the command echo) are
/// skipped; the table ends at the first line without a comma.
pub fn parse_dna(raw: &[u8]) -> Result<DnaDefinition, ParseError> {
    let text = String::from_utf8_lossy(raw).to_uppercase();
    let mut rows = Vec::new();

    for line in text.split('\n') {
        let line = line.trim();
        if !line.contains(',') {
            if rows.is_empty() {
                continue;
            }
            break;
        }

        let fields: Vec<String> = line
            .split(',')
            .map(|f| f.trim().trim_matches('"').trim().to_string())
            .collect();
        if fields.len() != FIELDS_PER_ROW {
            return Err(ParseError::InvalidField {
                block: BLOCK,
                field: "row",
                detail: format!("expected {FIELDS_PER_ROW} fields, found {}: {line}", fields.len()),
            });
        }

        let mut names = fields;
        let checksum = names.pop().unwrap_or_default();
        rows.push(DnaRow { names, checksum });
    }

    if rows.is_empty() {
        return Err(ParseError::MissingField {
            block: BLOCK,
            field: "rows",
        });
    }
    Ok(DnaDefinition { rows })
}
