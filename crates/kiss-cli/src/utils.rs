//! Utility functions shared across the CLI.

use anyhow::{Context, Result};
use colored::Colorize;
use kiss_utils::{CONFIG_FILE, Config};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Path argument that stands for stdin as input and stdout as output.
pub const STDIO_PATH: &str = "-";

/// Installs the global tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Writes a default kiss.toml into `dir`, named after the directory.
///
/// # Errors
/// Returns an error if kiss.toml already exists or cannot be written.
pub fn init_project(dir: &Path) -> Result<Config> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{CONFIG_FILE} already exists in {}", dir.display());
    }

    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("kiss-project");
    let config = Config::new(name);
    config.save(&config_path)?;
    Ok(config)
}

/// Whether `path` is `-`, naming stdin or stdout.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO_PATH
}

/// Reads a program from a file, or from stdin for `-`.
///
/// # Errors
/// Returns an error if the input cannot be read.
pub fn read_input(input: &Path) -> Result<String> {
    if is_stdio(input) {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .with_context(|| "Failed to read program from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

/// Name diagnostics use for `input`.
pub fn display_name(input: &Path) -> String {
    if is_stdio(input) {
        "<stdin>".to_string()
    } else {
        input.display().to_string()
    }
}

/// Prints a status message with colored output.
pub fn print_status(status: &str, message: &str) {
    println!("{:>12} {message}", status.green().bold());
}
