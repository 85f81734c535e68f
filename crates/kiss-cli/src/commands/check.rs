//! Implementation of the `kissc check` command.

use anyhow::Result;
use kiss_cli::Compiler;
use std::path::Path;

/// Executes the `check` command.
///
/// # Errors
/// Returns an error if the program does not lower to a valid module.
pub fn execute(input: &Path) -> Result<()> {
    let compiler = Compiler::discover()?;
    compiler.check(input)?;
    Ok(())
}
