//! cellguard CLI — restore and compile notebook test cells for grading.
//!
//! Restores test cells a student altered or deleted from a reference
//! notebook, and compiles tagged case cells into a single script.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
