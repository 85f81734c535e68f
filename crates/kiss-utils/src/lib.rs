//! Project configuration for the kiss toolchain.

mod config;

pub use config::{BuildConfig, CONFIG_FILE, Config, EmitKind, MemoryConfig, Package};
