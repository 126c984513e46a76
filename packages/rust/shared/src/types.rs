//! Core domain types: the in-memory notebook model.
//!
//! Only the fields cellguard reads are typed. Everything else a notebook
//! carries (outputs, metadata, attachments, cell ids) is kept verbatim in
//! `extra` so it survives a load/write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default marker that starts the first line of a test cell.
pub const DEFAULT_TEST_PREFIX: &str = "### TEST CASE";

/// Default separator between the marker and the test ID in reconcile mode.
pub const DEFAULT_ID_DELIMITER: &str = "--";

/// Notebook format major version written for freshly built notebooks.
pub const NBFORMAT_MAJOR: u32 = 4;

/// Notebook format minor version written for freshly built notebooks.
pub const NBFORMAT_MINOR: u32 = 5;

// ---------------------------------------------------------------------------
// CellType
// ---------------------------------------------------------------------------

/// The kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell kind; only [`CellType::Code`] cells can be test cells.
    pub cell_type: CellType,
    /// Full source text. The first line carries any tag metadata.
    #[serde(with = "multiline")]
    pub source: String,
    /// Every other cell field, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// Build a cell with no extra fields.
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Self {
            cell_type,
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// Build a code cell.
    pub fn code(source: impl Into<String>) -> Self {
        Self::new(CellType::Code, source)
    }

    /// Build a markdown cell.
    pub fn markdown(source: impl Into<String>) -> Self {
        Self::new(CellType::Markdown, source)
    }

    /// The first line of the source, without its line terminator.
    pub fn first_line(&self) -> &str {
        self.source.lines().next().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// An nbformat v4 notebook document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Ordered cells. Position is the only cell identity.
    pub cells: Vec<Cell>,
    /// Notebook-level metadata (kernel spec, language info, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_nbformat")]
    pub nbformat: u32,
    #[serde(default = "default_nbformat_minor")]
    pub nbformat_minor: u32,
    /// Unknown top-level fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notebook {
    /// Build a notebook from cells with empty metadata.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            metadata: Map::new(),
            nbformat: NBFORMAT_MAJOR,
            nbformat_minor: NBFORMAT_MINOR,
            extra: Map::new(),
        }
    }
}

fn default_nbformat() -> u32 {
    NBFORMAT_MAJOR
}
fn default_nbformat_minor() -> u32 {
    NBFORMAT_MINOR
}

// ---------------------------------------------------------------------------
// DuplicatePolicy
// ---------------------------------------------------------------------------

/// What to do when two test cells in one notebook share an ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// The later cell in document order replaces the earlier index entry.
    #[default]
    LastWriteWins,
    /// Fail with [`CellGuardError::DuplicateTestCell`](crate::CellGuardError).
    Reject,
}

// ---------------------------------------------------------------------------
// Multiline text (nbformat stores source as a string or a list of lines)
// ---------------------------------------------------------------------------

mod multiline {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MultilineText {
        Single(String),
        Lines(Vec<String>),
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<String, D::Error> {
        Ok(match MultilineText::deserialize(deserializer)? {
            MultilineText::Single(text) => text,
            MultilineText::Lines(lines) => lines.concat(),
        })
    }

    /// Lines keep their terminators, matching what nbformat writes.
    pub(super) fn serialize<S: Serializer>(text: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(text.split_inclusive('\n'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_accepts_string_and_lines() {
        let as_string: Cell =
            serde_json::from_str(r#"{"cell_type":"code","source":"a\nb","metadata":{}}"#)
                .expect("deserialize string source");
        let as_lines: Cell =
            serde_json::from_str(r#"{"cell_type":"code","source":["a\n","b"],"metadata":{}}"#)
                .expect("deserialize list source");
        assert_eq!(as_string.source, "a\nb");
        assert_eq!(as_lines.source, "a\nb");
    }

    #[test]
    fn source_serializes_as_lines() {
        let cell = Cell::code("x = 1\ny = 2\n");
        let json = serde_json::to_value(&cell).expect("serialize");
        assert_eq!(json["source"], serde_json::json!(["x = 1\n", "y = 2\n"]));

        let empty = serde_json::to_value(Cell::code("")).expect("serialize");
        assert_eq!(empty["source"], serde_json::json!([]));
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = r#"{
            "cell_type": "code",
            "execution_count": 3,
            "id": "abc123",
            "metadata": {"tags": ["graded"]},
            "outputs": [],
            "source": ["print(1)"]
        }"#;
        let cell: Cell = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(cell.extra["execution_count"], 3);
        assert_eq!(cell.extra["id"], "abc123");

        let back = serde_json::to_value(&cell).expect("serialize");
        assert_eq!(back["metadata"]["tags"][0], "graded");
        assert_eq!(back["cell_type"], "code");
    }

    #[test]
    fn notebook_defaults_format_version() {
        let nb: Notebook = serde_json::from_str(r#"{"cells": []}"#).expect("deserialize");
        assert_eq!(nb.nbformat, NBFORMAT_MAJOR);
        assert!(nb.metadata.is_empty());
    }

    #[test]
    fn first_line_strips_terminator() {
        assert_eq!(Cell::code("### TEST CASE -- q1\r\nassert x").first_line(), "### TEST CASE -- q1");
        assert_eq!(Cell::code("").first_line(), "");
    }

    #[test]
    fn duplicate_policy_kebab_case() {
        let policy: DuplicatePolicy =
            serde_json::from_str("\"last-write-wins\"").expect("deserialize");
        assert_eq!(policy, DuplicatePolicy::LastWriteWins);
        assert_eq!(
            serde_json::to_string(&DuplicatePolicy::Reject).expect("serialize"),
            "\"reject\""
        );
    }
}
