//! Configuration file handling for kiss projects.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "kiss.toml";

/// Represents the kiss.toml configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub package: Package,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
}

/// Linear memory layout of compiled modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub initial_pages: u32,
    pub maximum_pages: u32,
    /// Name the memory is exported under
    pub export: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            initial_pages: 1,
            maximum_pages: 256,
            export: "_mem".to_string(),
        }
    }
}

/// Output format of `kissc build`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitKind {
    /// WebAssembly binary
    #[default]
    Wasm,
    /// WebAssembly text
    Wat,
    /// IR dump
    Ir,
}

impl EmitKind {
    /// File extension of this output.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wasm => "wasm",
            Self::Wat => "wat",
            Self::Ir => "ir",
        }
    }
}

impl fmt::Display for EmitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for EmitKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "wasm" => Ok(Self::Wasm),
            "wat" => Ok(Self::Wat),
            "ir" => Ok(Self::Ir),
            other => Err(format!("unknown output format '{other}' (expected wasm, wat or ir)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub emit: EmitKind,
    /// Directory outputs are written to, relative to the project root
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            emit: EmitKind::default(),
            out_dir: PathBuf::from("target"),
        }
    }
}

impl Config {
    /// Creates a new default configuration with the given project name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            package: Package {
                name: name.into(),
                version: "0.1.0".to_string(),
            },
            memory: MemoryConfig::default(),
            build: BuildConfig::default(),
        }
    }

    /// Loads configuration from a kiss.toml file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// memory limits are inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a kiss.toml file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration")?;

        fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))
    }

    /// Directory of the nearest kiss.toml at or above `start`, without loading it.
    pub fn locate(start: impl Into<PathBuf>) -> Option<PathBuf> {
        let mut dir = start.into();
        loop {
            if dir.join(CONFIG_FILE).is_file() {
                return Some(dir);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let memory = &self.memory;
        if memory.initial_pages > memory.maximum_pages {
            anyhow::bail!(
                "memory.initial_pages ({}) exceeds memory.maximum_pages ({})",
                memory.initial_pages,
                memory.maximum_pages
            );
        }
        if memory.export.is_empty() {
            anyhow::bail!("memory.export must not be empty");
        }
        Ok(())
    }
}
