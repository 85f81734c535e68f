//! Compiler driver.
//!
//! Pipeline: JSON AST → lowering → module assembly → backend

use crate::pipeline::{self, Source};
use crate::utils::{display_name, is_stdio, print_status, read_input};
use anyhow::{Context, Result};
use kiss_ir::{IrModule, Memory};
use kiss_utils::{CONFIG_FILE, Config, EmitKind};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Compiler for kiss programs.
#[derive(Debug)]
pub struct Compiler {
    config: Config,
    /// Directory holding kiss.toml; relative output paths resolve against it
    project_root: Option<PathBuf>,
}

impl Compiler {
    /// Creates a compiler with an explicit configuration.
    #[must_use]
    pub fn new(config: Config, project_root: Option<PathBuf>) -> Self {
        Self {
            config,
            project_root,
        }
    }

    /// Uses the nearest kiss.toml above the current directory, or the
    /// defaults when there is none.
    ///
    /// # Errors
    /// Returns an error if a kiss.toml exists but cannot be loaded.
    pub fn discover() -> Result<Self> {
        let current_dir =
            std::env::current_dir().with_context(|| "Failed to get current directory")?;
        Self::discover_from(&current_dir)
    }

    /// Like [`Compiler::discover`], searching upwards from `start`.
    ///
    /// # Errors
    /// Returns an error if a kiss.toml exists but cannot be loaded.
    pub fn discover_from(start: &Path) -> Result<Self> {
        match Config::locate(start) {
            Some(root) => {
                let config = Config::load(root.join(CONFIG_FILE))?;
                tracing::debug!(root = %root.display(), "using project configuration");
                Ok(Self::new(config, Some(root)))
            }
            None => {
                tracing::debug!("no {CONFIG_FILE} found, using defaults");
                Ok(Self::new(Config::new("kiss"), None))
            }
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Memory layout from the `[memory]` section.
    pub fn memory(&self) -> Memory {
        let memory = &self.config.memory;
        Memory::with_limits(
            memory.initial_pages,
            memory.maximum_pages,
            memory.export.clone(),
        )
    }

    /// Checks a program for errors without writing any output.
    ///
    /// # Errors
    /// Returns an error if the program does not lower to a valid module.
    pub fn check(&self, input: &Path) -> Result<IrModule> {
        let start = Instant::now();
        let name = display_name(input);
        print_status("Checking", &name);

        let text = read_input(input)?;
        let module = pipeline::check_pipeline(Source::new(&name, &text), self.memory())?;

        Self::print_finished(start.elapsed());
        Ok(module)
    }

    /// Compiles a program and writes the artifact.
    ///
    /// `emit` overrides the configured output format. Without `output` the
    /// artifact goes to `<out_dir>/<input stem>.<format>`; an output of `-`
    /// sends it to stdout with no status lines. Nothing is written when any
    /// stage fails.
    ///
    /// # Errors
    /// Returns an error if compilation fails or the output cannot be written.
    pub fn build(
        &self,
        input: &Path,
        output: Option<&Path>,
        emit: Option<EmitKind>,
    ) -> Result<PathBuf> {
        if let Some(path) = output {
            if is_stdio(path) {
                self.build_to(input, emit, &mut std::io::stdout().lock())?;
                return Ok(path.to_path_buf());
            }
        }

        let start = Instant::now();
        let kind = emit.unwrap_or(self.config.build.emit);
        let name = display_name(input);
        print_status("Compiling", &format!("{name} ({kind})"));

        let text = read_input(input)?;
        let bytes = pipeline::build_pipeline(Source::new(&name, &text), self.memory(), kind)?;

        let output_path = match output {
            Some(path) => path.to_path_buf(),
            None => self.default_output(input, kind)?,
        };
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        fs::write(&output_path, &bytes)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        print_status("Wrote", &output_path.display().to_string());
        Self::print_finished(start.elapsed());
        Ok(output_path)
    }

    /// Compiles a program and writes the artifact to `out`.
    ///
    /// Prints nothing, so `out` may be stdout.
    ///
    /// # Errors
    /// Returns an error if compilation fails or `out` cannot be written.
    pub fn build_to(
        &self,
        input: &Path,
        emit: Option<EmitKind>,
        out: &mut impl Write,
    ) -> Result<()> {
        let kind = emit.unwrap_or(self.config.build.emit);
        let name = display_name(input);
        let text = read_input(input)?;
        let bytes = pipeline::build_pipeline(Source::new(&name, &text), self.memory(), kind)?;

        out.write_all(&bytes)
            .and_then(|()| out.flush())
            .with_context(|| format!("Failed to write {kind} output"))?;
        tracing::debug!(bytes = bytes.len(), %kind, "wrote artifact to stream");
        Ok(())
    }

    /// Default artifact path for `input`.
    ///
    /// # Errors
    /// Returns an error if the current directory is needed and unavailable.
    pub fn default_output(&self, input: &Path, kind: EmitKind) -> Result<PathBuf> {
        let stem = if is_stdio(input) {
            self.config.package.name.clone()
        } else {
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("out")
                .to_string()
        };

        let base = match &self.project_root {
            Some(root) => root.clone(),
            None => std::env::current_dir().with_context(|| "Failed to get current directory")?,
        };
        Ok(base
            .join(&self.config.build.out_dir)
            .join(format!("{stem}.{}", kind.extension())))
    }

    fn print_finished(duration: Duration) {
        print_status("Finished", &format!("in {:.2}s", duration.as_secs_f64()));
    }
}
