//! File-level workflows: load notebook(s) → reconcile/compile → write output.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use cellguard_notebook::{read_notebook, write_notebook, write_text};
use cellguard_shared::Result;

use crate::compile::BlockTransform;
use crate::index::CaseBlocks;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::tag::TagParser;

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Configuration for [`reconcile_files`].
#[derive(Debug, Clone)]
pub struct ReconcileFilesConfig {
    /// The student's working notebook.
    pub student: PathBuf,
    /// The reference (release) notebook holding the authoritative test cells.
    pub reference: PathBuf,
    /// Where to write the restored notebook.
    pub output: PathBuf,
    /// Tag convention and duplicate handling.
    pub reconciler: Reconciler,
}

/// Result of [`reconcile_files`].
#[derive(Debug)]
pub struct ReconcileFilesResult {
    /// Path the restored notebook was written to.
    pub output: PathBuf,
    /// Per-ID outcome.
    pub report: ReconcileReport,
    /// Total cells in the written notebook.
    pub cell_count: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Restore the student's test cells from the reference and write the result.
///
/// Nothing is written if reconciliation fails.
#[instrument(skip_all, fields(student = %config.student.display(), reference = %config.reference.display()))]
pub fn reconcile_files(config: &ReconcileFilesConfig) -> Result<ReconcileFilesResult> {
    let start = Instant::now();

    let mut student = read_notebook(&config.student)?;
    let reference = read_notebook(&config.reference)?;

    let report = config.reconciler.reconcile(&mut student, &reference)?;
    debug!(
        restored = report.restored.len(),
        unchanged = report.unchanged.len(),
        student_only = report.student_only.len(),
        "reconciled test cells"
    );

    write_notebook(&config.output, &student)?;

    info!(
        output = %config.output.display(),
        restored = report.restored.len(),
        "wrote restored notebook"
    );

    Ok(ReconcileFilesResult {
        output: config.output.clone(),
        report,
        cell_count: student.cells.len(),
        elapsed: start.elapsed(),
    })
}

// ---------------------------------------------------------------------------
// Compile
// ---------------------------------------------------------------------------

/// Configuration for [`compile_file`].
#[derive(Debug, Clone)]
pub struct CompileFileConfig {
    /// Notebook to extract case cells from.
    pub notebook: PathBuf,
    /// Marker that starts a case cell's first line.
    pub prefix: String,
    /// Cases to emit, in order. Empty means all, in first-seen order.
    pub cases: Vec<String>,
    /// Transform applied to each case block.
    pub transform: BlockTransform,
    /// Output file; `None` returns the text without writing.
    pub output: Option<PathBuf>,
}

/// Result of [`compile_file`].
#[derive(Debug)]
pub struct CompileFileResult {
    /// The compiled text.
    pub text: String,
    /// Cases emitted, in output order.
    pub cases: Vec<String>,
    /// Path written to, if any.
    pub output: Option<PathBuf>,
}

/// Extract and compile case blocks from a notebook file.
#[instrument(skip_all, fields(notebook = %config.notebook.display(), prefix = %config.prefix))]
pub fn compile_file(config: &CompileFileConfig) -> Result<CompileFileResult> {
    let notebook = read_notebook(&config.notebook)?;
    let blocks = CaseBlocks::extract(&notebook, &TagParser::prefixed(&config.prefix))?;

    let cases: Vec<String> = if config.cases.is_empty() {
        blocks.cases().map(str::to_string).collect()
    } else {
        config.cases.clone()
    };

    let transform = config.transform;
    let text = blocks.compile(&cases, |block| transform.apply(block))?;
    debug!(cases = cases.len(), bytes = text.len(), %transform, "compiled case blocks");

    if let Some(path) = &config.output {
        write_text(path, &text)?;
        info!(output = %path.display(), "wrote compiled cases");
    }

    Ok(CompileFileResult {
        text,
        cases,
        output: config.output.clone(),
    })
}

/// Case IDs in a notebook with their fragment counts, in first-seen order.
#[instrument(skip_all, fields(notebook = %notebook.display()))]
pub fn list_cases(notebook: &Path, prefix: &str) -> Result<Vec<(String, usize)>> {
    let nb = read_notebook(notebook)?;
    let blocks = CaseBlocks::extract(&nb, &TagParser::prefixed(prefix))?;

    Ok(blocks
        .cases()
        .map(|case| {
            let count = blocks.fragments(case).map_or(0, <[String]>::len);
            (case.to_string(), count)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellguard_notebook::to_json;
    use cellguard_shared::{Cell, CellGuardError, Notebook};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cellguard-pipeline-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn save(path: &Path, nb: &Notebook) {
        std::fs::write(path, to_json(nb).unwrap()).unwrap();
    }

    fn student_nb() -> Notebook {
        Notebook::new(vec![
            Cell::code("def f():\n    return 41"),
            Cell::code("### TEST CASE -- q1\nassert True"),
        ])
    }

    fn reference_nb(ids: &[&str]) -> Notebook {
        Notebook::new(
            ids.iter()
                .map(|id| Cell::code(format!("### TEST CASE -- {id}\nassert f() == 42")))
                .collect(),
        )
    }

    #[test]
    fn reconcile_files_writes_restored_notebook() {
        let tmp = temp_dir();
        let student = tmp.join("student.ipynb");
        let reference = tmp.join("reference.ipynb");
        let output = tmp.join("out").join("restored.ipynb");
        save(&student, &student_nb());
        save(&reference, &reference_nb(&["q1"]));

        let result = reconcile_files(&ReconcileFilesConfig {
            student: student.clone(),
            reference,
            output: output.clone(),
            reconciler: Reconciler::default(),
        })
        .unwrap();

        assert_eq!(result.report.restored, vec!["q1"]);
        assert_eq!(result.cell_count, 2);
        let written = cellguard_notebook::read_notebook(&output).unwrap();
        assert_eq!(written.cells[1].source, "### TEST CASE -- q1\nassert f() == 42");
        assert_eq!(written.cells[0], student_nb().cells[0]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn reconcile_files_writes_nothing_on_failure() {
        let tmp = temp_dir();
        let student = tmp.join("student.ipynb");
        let reference = tmp.join("reference.ipynb");
        save(&student, &student_nb());
        save(&reference, &reference_nb(&["q1", "q2"]));
        let original = std::fs::read_to_string(&student).unwrap();

        let err = reconcile_files(&ReconcileFilesConfig {
            student: student.clone(),
            reference,
            output: student.clone(),
            reconciler: Reconciler::default(),
        })
        .unwrap_err();

        assert!(matches!(err, CellGuardError::MissingTestCell { ref id } if id == "q2"));
        assert_eq!(std::fs::read_to_string(&student).unwrap(), original);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    fn cases_nb() -> Notebook {
        Notebook::new(vec![
            Cell::code("# CASE: setup\nimport math"),
            Cell::markdown("Some instructions"),
            Cell::code("# CASE: area\nassert math.isclose(area(1), math.pi)"),
            Cell::code("# CASE: setup\nfrom hw import area"),
        ])
    }

    #[test]
    fn compile_file_writes_script() {
        let tmp = temp_dir();
        let path = tmp.join("cases.ipynb");
        let output = tmp.join("tests.py");
        save(&path, &cases_nb());

        let result = compile_file(&CompileFileConfig {
            notebook: path,
            prefix: "# CASE:".into(),
            cases: vec![],
            transform: BlockTransform::LineTerminated,
            output: Some(output.clone()),
        })
        .unwrap();

        assert_eq!(result.cases, vec!["setup", "area"]);
        let expected = "import math\nfrom hw import area\nassert math.isclose(area(1), math.pi)\n";
        assert_eq!(result.text, expected);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn compile_file_unknown_case_writes_nothing() {
        let tmp = temp_dir();
        let path = tmp.join("cases.ipynb");
        let output = tmp.join("tests.py");
        save(&path, &cases_nb());

        let err = compile_file(&CompileFileConfig {
            notebook: path,
            prefix: "# CASE:".into(),
            cases: vec!["area".into(), "volume".into()],
            transform: BlockTransform::Identity,
            output: Some(output.clone()),
        })
        .unwrap_err();

        assert!(matches!(err, CellGuardError::UnknownCase { .. }));
        assert!(!output.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn list_cases_counts_fragments() {
        let tmp = temp_dir();
        let path = tmp.join("cases.ipynb");
        save(&path, &cases_nb());

        let cases = list_cases(&path, "# CASE:").unwrap();
        assert_eq!(cases, vec![("setup".to_string(), 2), ("area".to_string(), 1)]);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
