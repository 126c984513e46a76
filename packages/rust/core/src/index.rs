//! ID indexes built over a notebook's cells.
//!
//! [`TestCellIndex`] maps each test ID to the full source of the cell that
//! carries it; it drives restoration. [`CaseBlocks`] maps each case ID to the
//! ordered code bodies of every cell tagged with it; it drives compilation.
//! Both iterate in the order IDs were first seen.

use indexmap::IndexMap;
use indexmap::map::Entry;

use cellguard_shared::{CellGuardError, DuplicatePolicy, Notebook, Result};

use crate::tag::TagParser;

// ---------------------------------------------------------------------------
// TestCellIndex
// ---------------------------------------------------------------------------

/// Test ID → full cell source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCellIndex {
    entries: IndexMap<String, String>,
}

impl TestCellIndex {
    /// Scan `notebook` once in document order.
    ///
    /// With [`DuplicatePolicy::LastWriteWins`] a repeated ID keeps its first
    /// position in iteration order but takes the later cell's source.
    pub fn build(
        notebook: &Notebook,
        parser: &TagParser,
        duplicates: DuplicatePolicy,
    ) -> Result<Self> {
        let mut entries = IndexMap::new();

        for cell in &notebook.cells {
            let Some(tag) = parser.parse(cell)? else {
                continue;
            };

            match entries.entry(tag.id) {
                Entry::Vacant(slot) => {
                    slot.insert(cell.source.clone());
                }
                Entry::Occupied(mut slot) => match duplicates {
                    DuplicatePolicy::LastWriteWins => {
                        slot.insert(cell.source.clone());
                    }
                    DuplicatePolicy::Reject => {
                        return Err(CellGuardError::DuplicateTestCell {
                            id: slot.key().clone(),
                        });
                    }
                },
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// IDs in first-seen order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CaseBlocks
// ---------------------------------------------------------------------------

/// Case ID → code bodies of every cell tagged with it, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseBlocks {
    blocks: IndexMap<String, Vec<String>>,
}

impl CaseBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the body of every tagged cell in `notebook`.
    pub fn extract(notebook: &Notebook, parser: &TagParser) -> Result<Self> {
        let mut blocks = Self::new();

        for cell in &notebook.cells {
            if let Some(tag) = parser.parse(cell)? {
                blocks.add_block(tag.id, tag.body);
            }
        }

        Ok(blocks)
    }

    /// Append a code fragment to `case`, registering the case on first use.
    pub fn add_block(&mut self, case: impl Into<String>, code: impl Into<String>) {
        self.blocks.entry(case.into()).or_default().push(code.into());
    }

    /// Case IDs in first-seen order.
    pub fn cases(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    /// The fragments recorded for `case`, if any.
    pub fn fragments(&self, case: &str) -> Option<&[String]> {
        self.blocks.get(case).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellguard_shared::Cell;

    fn notebook() -> Notebook {
        Notebook::new(vec![
            Cell::markdown("### TEST CASE -- not-a-test"),
            Cell::code("### TEST CASE -- q2\nassert b()"),
            Cell::code("def a():\n    return 1"),
            Cell::code("### TEST CASE -- q1\nassert a() == 1"),
        ])
    }

    #[test]
    fn index_keeps_first_seen_order() {
        let index =
            TestCellIndex::build(&notebook(), &TagParser::default(), DuplicatePolicy::default())
                .unwrap();
        assert_eq!(index.ids().collect::<Vec<_>>(), vec!["q2", "q1"]);
        assert_eq!(index.get("q1"), Some("### TEST CASE -- q1\nassert a() == 1"));
        assert!(!index.contains("not-a-test"));
    }

    #[test]
    fn index_last_write_wins() {
        let mut nb = notebook();
        nb.cells.push(Cell::code("### TEST CASE -- q2\nassert b() == 2"));
        let index =
            TestCellIndex::build(&nb, &TagParser::default(), DuplicatePolicy::LastWriteWins)
                .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("q2"), Some("### TEST CASE -- q2\nassert b() == 2"));
        assert_eq!(index.ids().next(), Some("q2"));
    }

    #[test]
    fn index_rejects_duplicates_when_asked() {
        let mut nb = notebook();
        nb.cells.push(Cell::code("### TEST CASE -- q1\nassert True"));
        let err = TestCellIndex::build(&nb, &TagParser::default(), DuplicatePolicy::Reject)
            .unwrap_err();
        match err {
            CellGuardError::DuplicateTestCell { id } => assert_eq!(id, "q1"),
            other => panic!("expected DuplicateTestCell, got {other:?}"),
        }
    }

    #[test]
    fn index_propagates_malformed_tags() {
        let nb = Notebook::new(vec![Cell::code("### TEST CASE q1\nassert True")]);
        let err = TestCellIndex::build(&nb, &TagParser::default(), DuplicatePolicy::default())
            .unwrap_err();
        assert!(matches!(err, CellGuardError::MalformedTag { .. }));
    }

    #[test]
    fn case_blocks_group_repeated_ids() {
        let nb = Notebook::new(vec![
            Cell::code("# CASE: x\nfoo"),
            Cell::code("# CASE: y\nbaz"),
            Cell::markdown("# CASE: x\nnot code"),
            Cell::code("# CASE: x\nbar"),
        ]);
        let blocks = CaseBlocks::extract(&nb, &TagParser::prefixed("# CASE:")).unwrap();
        assert_eq!(blocks.cases().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(blocks.fragments("x").unwrap(), ["foo", "bar"]);
        assert_eq!(blocks.fragments("z"), None);
    }

    #[test]
    fn add_block_registers_case_once() {
        let mut blocks = CaseBlocks::new();
        blocks.add_block("a", "1");
        blocks.add_block("b", "2");
        blocks.add_block("a", "3");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks.cases().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
