//! Test cell indexing, restoration, and case compilation for cellguard.
//!
//! The pure core ([`tag`], [`index`], [`reconcile`], [`compile`]) works on
//! in-memory notebooks and never logs. [`pipeline`] and [`batch`] wrap it
//! with notebook I/O for the CLI.

pub mod batch;
pub mod compile;
pub mod index;
pub mod pipeline;
pub mod reconcile;
pub mod tag;

pub use compile::BlockTransform;
pub use index::{CaseBlocks, TestCellIndex};
pub use reconcile::{ReconcileReport, Reconciler, reconcile};
pub use tag::{Tag, TagParser, TagStyle};
