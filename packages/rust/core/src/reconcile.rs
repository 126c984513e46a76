//! Test cell restoration.
//!
//! Every test cell in the reference notebook must still exist (by ID) in the
//! student notebook. When that holds, each student test cell's source is
//! overwritten with the reference source for its ID. Nothing is written
//! unless the whole check passes.

use cellguard_shared::{CellGuardError, DuplicatePolicy, Notebook, ReconcileConfig, Result};

use crate::index::TestCellIndex;
use crate::tag::TagParser;

/// Restores student test cells from a reference notebook.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    parser: TagParser,
    duplicates: DuplicatePolicy,
}

/// What a successful reconcile did, by test ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// IDs whose student cell differed from the reference and was overwritten.
    pub restored: Vec<String>,
    /// IDs whose student cell already matched the reference.
    pub unchanged: Vec<String>,
    /// IDs found only in the student notebook; their cells were left alone.
    pub student_only: Vec<String>,
}

impl ReconcileReport {
    /// Whether the student notebook came out identical to how it went in.
    pub fn is_clean(&self) -> bool {
        self.restored.is_empty()
    }
}

impl From<&ReconcileConfig> for Reconciler {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            parser: TagParser::delimited(&config.prefix, &config.delimiter),
            duplicates: config.duplicates,
        }
    }
}

impl Reconciler {
    pub fn new(parser: TagParser, duplicates: DuplicatePolicy) -> Self {
        Self { parser, duplicates }
    }

    /// Overwrite `student`'s test cells with their `reference` counterparts.
    ///
    /// Fails with [`CellGuardError::MissingTestCell`] naming the first
    /// reference ID (in reference order) that the student notebook lacks. On
    /// any error `student` is left untouched.
    pub fn reconcile(
        &self,
        student: &mut Notebook,
        reference: &Notebook,
    ) -> Result<ReconcileReport> {
        let student_index = TestCellIndex::build(student, &self.parser, self.duplicates)?;
        let reference_index = TestCellIndex::build(reference, &self.parser, self.duplicates)?;

        if let Some(missing) = reference_index.ids().find(|id| !student_index.contains(id)) {
            return Err(CellGuardError::MissingTestCell {
                id: missing.to_string(),
            });
        }

        let mut report = ReconcileReport {
            student_only: student_index
                .ids()
                .filter(|id| !reference_index.contains(id))
                .map(str::to_string)
                .collect(),
            ..ReconcileReport::default()
        };

        for cell in &mut student.cells {
            // Every tagged cell parsed cleanly while building the index.
            let Some(id) = self.parser.parse(cell)?.map(|tag| tag.id) else {
                continue;
            };
            let Some(reference_source) = reference_index.get(&id) else {
                continue;
            };

            if cell.source == reference_source {
                report.unchanged.push(id);
            } else {
                cell.source = reference_source.to_string();
                report.restored.push(id);
            }
        }

        Ok(report)
    }
}

/// Reconcile with the default `### TEST CASE -- <id>` convention.
pub fn reconcile(student: &mut Notebook, reference: &Notebook) -> Result<ReconcileReport> {
    Reconciler::default().reconcile(student, reference)
}
