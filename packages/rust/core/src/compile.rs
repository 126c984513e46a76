//! Case block compilation.
//!
//! Joins each case's fragments with `\n`, runs the joined block through a
//! transform, and concatenates the transformed blocks in case order.

use std::fmt;
use std::str::FromStr;

use cellguard_shared::{CellGuardError, Result};

use crate::index::CaseBlocks;

/// Named block transforms selectable from config or the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockTransform {
    /// Emit the block as-is.
    #[default]
    Identity,
    /// End the block with exactly one newline so blocks don't run together.
    LineTerminated,
    /// Indent every non-empty line by four spaces.
    Indent,
}

impl BlockTransform {
    pub fn apply(self, block: &str) -> String {
        match self {
            Self::Identity => block.to_string(),
            Self::LineTerminated => format!("{}\n", block.trim_end_matches(['\r', '\n'])),
            Self::Indent => block
                .split_inclusive('\n')
                .map(|line| {
                    if line.trim().is_empty() {
                        line.to_string()
                    } else {
                        format!("    {line}")
                    }
                })
                .collect(),
        }
    }
}

impl FromStr for BlockTransform {
    type Err = CellGuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identity" => Ok(Self::Identity),
            "line-terminated" => Ok(Self::LineTerminated),
            "indent" => Ok(Self::Indent),
            other => Err(CellGuardError::config(format!(
                "unknown transform '{other}': expected 'identity', 'line-terminated', or 'indent'"
            ))),
        }
    }
}

impl fmt::Display for BlockTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "identity",
            Self::LineTerminated => "line-terminated",
            Self::Indent => "indent",
        };
        f.write_str(name)
    }
}

impl CaseBlocks {
    /// The fragments of `case` joined with `\n`.
    pub fn block(&self, case: &str) -> Result<String> {
        self.fragments(case)
            .map(|fragments| fragments.join("\n"))
            .ok_or_else(|| CellGuardError::UnknownCase {
                id: case.to_string(),
            })
    }

    /// Compile the requested cases, in the order given.
    ///
    /// An empty `cases` slice means every case in first-seen order. Any
    /// requested case with no tagged cells fails the whole call with
    /// [`CellGuardError::UnknownCase`].
    pub fn compile<S, F>(&self, cases: &[S], transform: F) -> Result<String>
    where
        S: AsRef<str>,
        F: Fn(&str) -> String,
    {
        let order: Vec<&str> = if cases.is_empty() {
            self.cases().collect()
        } else {
            cases.iter().map(|case| case.as_ref()).collect()
        };

        let mut output = String::new();
        for case in order {
            let block = self.block(case)?;
            output.push_str(&transform(&block));
        }
        Ok(output)
    }
}
