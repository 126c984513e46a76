//! Test cell tag parsing.
//!
//! A tagged cell is a code cell whose first source line starts with a fixed
//! marker. Two tag styles exist:
//!
//! ```text
//! ### TEST CASE -- q1        delimited: ID follows the delimiter
//! ### TEST CASE q1           prefixed:  ID is whatever follows the marker
//! ```
//!
//! The delimited style identifies whole cells for restoration. The prefixed
//! style identifies case blocks for compilation; there the lines after the
//! tag line form the cell's code body, and a tag line with no body is
//! malformed.

use cellguard_shared::{
    Cell, CellGuardError, CellType, DEFAULT_ID_DELIMITER, DEFAULT_TEST_PREFIX, Result,
};

/// How the ID is separated from the marker on a tag line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStyle {
    /// `<prefix> ... <delimiter> <id>`
    Delimited { delimiter: String },
    /// `<prefix><id>`, followed by at least one body line.
    Prefixed,
}

/// A successfully parsed tagged cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Trimmed test/case ID.
    pub id: String,
    /// Everything after the tag line's `\n`. Empty for delimited tags on
    /// single-line cells.
    pub body: &'a str,
}

/// Classifies cells and parses their tag lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParser {
    prefix: String,
    style: TagStyle,
}

impl TagParser {
    /// Parser for `<prefix> -- <id>` style tags.
    pub fn delimited(prefix: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            style: TagStyle::Delimited {
                delimiter: delimiter.into(),
            },
        }
    }

    /// Parser for `<prefix><id>` style tags.
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            style: TagStyle::Prefixed,
        }
    }

    /// Whether `cell` is a code cell whose first line starts with the prefix.
    pub fn is_tagged(&self, cell: &Cell) -> bool {
        cell.cell_type == CellType::Code && cell.first_line().starts_with(&self.prefix)
    }

    /// Parse a cell's tag.
    ///
    /// Returns `Ok(None)` for untagged cells and [`CellGuardError::MalformedTag`]
    /// for tagged cells whose tag line has no delimiter (or, for prefixed
    /// tags, whose source has no body line). An ID that trims to nothing is
    /// still an ID: `""` is a valid key.
    pub fn parse<'a>(&self, cell: &'a Cell) -> Result<Option<Tag<'a>>> {
        if !self.is_tagged(cell) {
            return Ok(None);
        }

        let first_line = cell.first_line();
        let body = cell.source.split_once('\n').map(|(_, rest)| rest);

        let id = match &self.style {
            TagStyle::Delimited { delimiter } => {
                let after = first_line.split(delimiter.as_str()).nth(1).ok_or_else(|| {
                    CellGuardError::malformed_tag(
                        first_line,
                        format!("missing `{delimiter}` before the test ID"),
                    )
                })?;
                after.trim()
            }
            TagStyle::Prefixed => {
                if body.is_none() {
                    return Err(CellGuardError::malformed_tag(
                        first_line,
                        "tagged cell has no code after the tag line",
                    ));
                }
                let after = &first_line[self.prefix.len()..];
                after.split(self.prefix.as_str()).next().unwrap_or(after).trim()
            }
        };

        Ok(Some(Tag {
            id: id.to_string(),
            body: body.unwrap_or(""),
        }))
    }
}

impl Default for TagParser {
    fn default() -> Self {
        Self::delimited(DEFAULT_TEST_PREFIX, DEFAULT_ID_DELIMITER)
    }
}
