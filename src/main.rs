//! # skill-sync CLI
//!
//! Binary entry point for the `skill-sync` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Dispatching to the selected command, or the interactive menu.
//! - Turning errors and partial failures into a non-zero exit status.
//!
//! The reconciliation engine lives in the `skill_sync` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
