//! Implementation of the `kissc build` command.

use anyhow::Result;
use kiss_cli::{Compiler, EmitKind};
use std::path::Path;

/// Executes the `build` command.
///
/// # Errors
/// Returns an error if the program cannot be compiled or the output written.
pub fn execute(input: &Path, output: Option<&Path>, emit: Option<EmitKind>) -> Result<()> {
    let compiler = Compiler::discover()?;
    compiler.build(input, output, emit)?;
    Ok(())
}
