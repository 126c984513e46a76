//! Shared types, error model, and configuration for cellguard.
//!
//! This crate is the foundation depended on by all other cellguard crates.
//! It provides:
//! - [`CellGuardError`] — the unified error type
//! - The notebook model ([`Notebook`], [`Cell`], [`CellType`]) and [`DuplicatePolicy`]
//! - Configuration ([`AppConfig`], [`ReconcileConfig`], [`CompileConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompileConfig, ReconcileConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_config,
};
pub use error::{CellGuardError, Result};
pub use types::{
    Cell, CellType, DEFAULT_ID_DELIMITER, DEFAULT_TEST_PREFIX, DuplicatePolicy, NBFORMAT_MAJOR,
    NBFORMAT_MINOR, Notebook,
};
