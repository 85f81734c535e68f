//! Command implementations for the kiss CLI.

pub mod build;
pub mod check;
pub mod init;
