//! Batch restoration: one reference notebook, many student notebooks.
//!
//! The reference is loaded once. Each student is reconciled and written
//! independently, so one student's missing test cell doesn't stop the rest.
//! Each output path is written at most once per batch: a later student whose
//! output would land on an earlier student's restored notebook fails instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use cellguard_notebook::{read_notebook, write_notebook};
use cellguard_shared::{CellGuardError, Notebook, Result};

use crate::reconcile::{ReconcileReport, Reconciler};

/// Configuration for [`reconcile_batch`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// The reference (release) notebook.
    pub reference: PathBuf,
    /// Student notebooks to restore.
    pub students: Vec<PathBuf>,
    /// Output directory; `None` overwrites each student notebook in place.
    pub out_dir: Option<PathBuf>,
    /// Tag convention and duplicate handling.
    pub reconciler: Reconciler,
}

/// Outcome for a single student notebook.
#[derive(Debug)]
pub struct StudentOutcome {
    /// The student notebook that was processed.
    pub student: PathBuf,
    /// Where the restored notebook went, or why it failed.
    pub result: std::result::Result<(PathBuf, ReconcileReport), CellGuardError>,
}

/// Result of [`reconcile_batch`].
#[derive(Debug)]
pub struct BatchResult {
    /// One entry per input, in input order.
    pub outcomes: Vec<StudentOutcome>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a student notebook is processed.
    fn student_started(&self, path: &Path, current: usize, total: usize);
    /// Called after a student notebook is processed, successfully or not.
    fn student_finished(&self, outcome: &StudentOutcome);
    /// Called when the batch completes.
    fn done(&self, result: &BatchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn student_started(&self, _path: &Path, _current: usize, _total: usize) {}
    fn student_finished(&self, _outcome: &StudentOutcome) {}
    fn done(&self, _result: &BatchResult) {}
}

/// Reconcile every student notebook against one reference.
///
/// Fails only if the reference itself cannot be loaded; per-student
/// failures are recorded in the returned outcomes.
#[instrument(skip_all, fields(reference = %config.reference.display(), students = config.students.len()))]
pub fn reconcile_batch(
    config: &BatchConfig,
    progress: &dyn ProgressReporter,
) -> Result<BatchResult> {
    let start = Instant::now();
    let reference = read_notebook(&config.reference)?;

    if let Some(dir) = &config.out_dir {
        std::fs::create_dir_all(dir).map_err(|e| CellGuardError::io(dir, e))?;
    }

    let total = config.students.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut written: HashMap<PathBuf, PathBuf> = HashMap::new();

    for (i, student) in config.students.iter().enumerate() {
        progress.student_started(student, i + 1, total);

        let result = output_path(student, config.out_dir.as_deref()).and_then(|output| {
            if let Some(owner) = written.get(&output) {
                return Err(CellGuardError::validation(format!(
                    "output '{}' already holds the restored notebook of '{}'",
                    output.display(),
                    owner.display()
                )));
            }
            let report = reconcile_one(student, &reference, &output, &config.reconciler)?;
            written.insert(output.clone(), student.clone());
            Ok((output, report))
        });

        if let Err(e) = &result {
            warn!(student = %student.display(), error = %e, "student notebook not restored");
        }

        let outcome = StudentOutcome {
            student: student.clone(),
            result,
        };
        progress.student_finished(&outcome);
        outcomes.push(outcome);
    }

    let result = BatchResult {
        outcomes,
        elapsed: start.elapsed(),
    };

    info!(
        succeeded = result.succeeded(),
        failed = result.failed(),
        "batch reconcile complete"
    );
    progress.done(&result);

    Ok(result)
}

fn reconcile_one(
    student: &Path,
    reference: &Notebook,
    output: &Path,
    reconciler: &Reconciler,
) -> Result<ReconcileReport> {
    let mut nb = read_notebook(student)?;
    let report = reconciler.reconcile(&mut nb, reference)?;
    write_notebook(output, &nb)?;
    Ok(report)
}

/// Where a student's restored notebook is written.
fn output_path(student: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    let Some(dir) = out_dir else {
        return Ok(student.to_path_buf());
    };
    let name = student.file_name().ok_or_else(|| {
        CellGuardError::validation(format!("'{}' has no file name", student.display()))
    })?;
    Ok(dir.join(name))
}
