//! The kiss abstract syntax tree.
//!
//! Parsing itself happens outside this workspace: the PEG grammar emits the
//! tree as JSON and this crate decodes it into typed nodes.

pub mod ast;

pub use ast::{
    CallStatement, ConditionalLoop, FunctionBody, FunctionDeclaration, FunctionExport,
    FunctionImport, Identifier, Literal, Node, Operand, OperandKind, Param, Root, SENTINEL_NAME,
    VariableDeclaration,
};

use kiss_core::{Error, Result};
use std::io::Read;

/// Decodes a JSON AST.
///
/// # Errors
/// Returns [`Error::Ast`] if the text is not valid JSON or does not have the
/// shape of a kiss tree.
///
/// # Examples
/// ```
/// let root = kiss_ast::from_json(r#"{ "type": "Root", "functions": [] }"#).unwrap();
/// assert!(root.functions.is_empty());
/// ```
pub fn from_json(source: &str) -> Result<Root> {
    serde_json::from_str(source).map_err(decode_error)
}

/// Decodes a JSON AST from a reader.
///
/// # Errors
/// Returns [`Error::Ast`] on malformed input and [`Error::Io`] if reading fails.
pub fn from_reader(mut reader: impl Read) -> Result<Root> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    from_json(&source)
}

/// Encodes a tree back to pretty-printed JSON.
///
/// # Errors
/// Returns [`Error::Ast`] if serialization fails.
pub fn to_json(root: &Root) -> Result<String> {
    serde_json::to_string_pretty(root).map_err(decode_error)
}

fn decode_error(err: serde_json::Error) -> Error {
    Error::Ast(err.to_string())
}
