//! Implementation of the `kissc init` command.

use anyhow::{Context, Result};
use kiss_cli::utils::{init_project, print_status};

/// Executes the `init` command in the current directory.
///
/// # Errors
/// Returns an error if kiss.toml already exists or cannot be written.
pub fn execute() -> Result<()> {
    let current_dir = std::env::current_dir().with_context(|| "Failed to get current directory")?;
    let config = init_project(&current_dir)?;

    print_status("Created", &format!("kiss project '{}'", config.package.name));
    println!();
    println!("To get started:");
    println!("  kissc build program.json");

    Ok(())
}
