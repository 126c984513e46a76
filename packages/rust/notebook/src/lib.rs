//! Notebook persistence: reading `.ipynb` files into [`Notebook`] values and
//! writing them (or compiled scripts) back to disk.
//!
//! Output uses nbformat's on-disk layout: one-space indentation, keys sorted
//! at every level, and a trailing newline. Files are written to a temp sibling and renamed into
//! place so a failed write never leaves a truncated notebook behind.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, instrument};

use cellguard_shared::{CellGuardError, NBFORMAT_MAJOR, Notebook, Result};

/// Parse notebook JSON text.
pub fn parse_notebook(json: &str) -> Result<Notebook> {
    let notebook: Notebook = serde_json::from_str(json)
        .map_err(|e| CellGuardError::parse(format!("invalid notebook JSON: {e}")))?;

    if notebook.nbformat != NBFORMAT_MAJOR {
        return Err(CellGuardError::validation(format!(
            "unsupported nbformat {} (expected {NBFORMAT_MAJOR})",
            notebook.nbformat
        )));
    }

    Ok(notebook)
}

/// Read and parse a notebook from disk.
#[instrument(fields(path = %path.display()))]
pub fn read_notebook(path: &Path) -> Result<Notebook> {
    let content = std::fs::read_to_string(path).map_err(|e| CellGuardError::io(path, e))?;

    let notebook = parse_notebook(&content).map_err(|e| match e {
        CellGuardError::Parse { message } => {
            CellGuardError::parse(format!("{}: {message}", path.display()))
        }
        other => other,
    })?;

    debug!(cells = notebook.cells.len(), "notebook loaded");
    Ok(notebook)
}

/// Serialize a notebook the way nbformat lays it out on disk.
pub fn to_json(notebook: &Notebook) -> Result<String> {
    // Going through `Value` sorts object keys, typed fields included.
    let value = serde_json::to_value(notebook)
        .map_err(|e| CellGuardError::validation(format!("JSON serialization failed: {e}")))?;

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
    value
        .serialize(&mut ser)
        .map_err(|e| CellGuardError::validation(format!("JSON serialization failed: {e}")))?;

    let mut json = String::from_utf8(buf)
        .map_err(|e| CellGuardError::validation(format!("JSON output is not UTF-8: {e}")))?;
    json.push('\n');
    Ok(json)
}

/// Write a notebook to disk atomically.
#[instrument(skip(notebook), fields(path = %path.display(), cells = notebook.cells.len()))]
pub fn write_notebook(path: &Path, notebook: &Notebook) -> Result<()> {
    let json = to_json(notebook)?;
    write_atomic(path, &json)?;
    debug!("wrote notebook");
    Ok(())
}

/// Write compiled text (e.g. a grading script) to disk atomically.
#[instrument(skip(text), fields(path = %path.display(), bytes = text.len()))]
pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_atomic(path, text)?;
    debug!("wrote text output");
    Ok(())
}

/// Write to a hidden temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CellGuardError::io(parent, e))?;
    }

    let temp = temp_sibling(path);
    std::fs::write(&temp, content).map_err(|e| CellGuardError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| CellGuardError::io(path, e))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cellguard_shared::{Cell, CellType};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cellguard-notebook-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const SAMPLE: &str = r####"{
 "cells": [
  {
   "cell_type": "markdown",
   "id": "intro",
   "metadata": {},
   "source": ["# Project 1\n", "Fill in the functions below."]
  },
  {
   "cell_type": "code",
   "execution_count": null,
   "id": "t1",
   "metadata": {"deletable": false},
   "outputs": [],
   "source": "### TEST CASE -- q1\nassert add(1, 2) == 3"
  }
 ],
 "metadata": {"kernelspec": {"name": "python3"}},
 "nbformat": 4,
 "nbformat_minor": 5
}"####;

    #[test]
    fn parse_sample_notebook() {
        let nb = parse_notebook(SAMPLE).unwrap();
        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.cells[0].cell_type, CellType::Markdown);
        assert_eq!(nb.cells[0].source, "# Project 1\nFill in the functions below.");
        assert_eq!(nb.cells[1].first_line(), "### TEST CASE -- q1");
        assert_eq!(nb.metadata["kernelspec"]["name"], "python3");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse_notebook("{not json").unwrap_err();
        assert!(matches!(err, CellGuardError::Parse { .. }));
    }

    #[test]
    fn parse_rejects_old_format() {
        let err = parse_notebook(r#"{"cells": [], "nbformat": 3}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported nbformat 3"));
    }

    #[test]
    fn to_json_uses_nbformat_layout() {
        let nb = Notebook::new(vec![Cell::code("x = 1\n")]);
        let json = to_json(&nb).unwrap();
        assert!(json.starts_with("{\n \"cells\": [\n  {"));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn to_json_sorts_keys() {
        let nb = parse_notebook(SAMPLE).unwrap();
        let json = to_json(&nb).unwrap();

        let code_cell = &json[json.find("\"cell_type\": \"code\"").unwrap()..];
        let positions: Vec<usize> = ["cell_type", "execution_count", "id", "metadata", "outputs", "source"]
            .iter()
            .map(|key| code_cell.find(&format!("\"{key}\":")).unwrap())
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "cell keys out of order: {positions:?}"
        );

        let positions: Vec<usize> = ["cells", "metadata", "nbformat", "nbformat_minor"]
            .iter()
            .map(|key| json.find(&format!("\n \"{key}\":")).unwrap())
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "top-level keys out of order: {positions:?}"
        );
    }

    #[test]
    fn write_then_read_preserves_cells_and_extras() {
        let tmp = temp_dir();
        let path = tmp.join("student.ipynb");

        let nb = parse_notebook(SAMPLE).unwrap();
        write_notebook(&path, &nb).unwrap();
        let back = read_notebook(&path).unwrap();

        assert_eq!(back, nb);
        assert_eq!(back.cells[1].extra["metadata"]["deletable"], false);
        assert!(!tmp.join(".student.ipynb.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_missing_file_reports_path() {
        let tmp = temp_dir();
        let path = tmp.join("nope.ipynb");
        let err = read_notebook(&path).unwrap_err();
        match err {
            CellGuardError::Io { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Io error, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_invalid_file_names_path() {
        let tmp = temp_dir();
        let path = tmp.join("broken.ipynb");
        std::fs::write(&path, "[]").unwrap();
        let err = read_notebook(&path).unwrap_err();
        assert!(err.to_string().contains("broken.ipynb"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_text_creates_parent_dirs() {
        let tmp = temp_dir();
        let path = tmp.join("out").join("tests.py");
        write_text(&path, "assert True\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "assert True\n");
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
