//! Core types and utilities for the kiss compiler.
//!
//! This crate provides the value type table, source spans and the error type
//! shared by every compiler stage.

pub mod error;
pub mod span;
pub mod types;

pub use error::{Error, Result};
pub use span::{Location, Span};
pub use types::ValueType;
