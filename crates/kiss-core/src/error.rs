//! Error types and result aliases for the kiss compiler.
//!
//! Every lowering failure is fatal: the first error aborts the compilation
//! and no module reaches the backend.

use crate::{Span, ValueType};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Main error type for the kiss compiler.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid AST input: {0}")]
    #[diagnostic(code(kiss::ast))]
    Ast(String),

    #[error("Malformed node: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(kiss::ast::malformed))]
    MalformedNode {
        expected: String,
        found: String,
        #[label("this node")]
        span: Option<Span>,
    },

    #[error("Unbound identifier '{name}'")]
    #[diagnostic(
        code(kiss::semantic::unbound),
        help("declare it in this function; only locals can receive a call result")
    )]
    UnboundIdentifier {
        name: String,
        #[label("not declared in this function")]
        span: Option<Span>,
    },

    #[error("'{name}' is already declared")]
    #[diagnostic(code(kiss::semantic::duplicate))]
    DuplicateDeclaration {
        name: String,
        #[label("declared again here")]
        span: Option<Span>,
    },

    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    #[diagnostic(code(kiss::semantic::type_mismatch), help("kiss never converts between types"))]
    TypeMismatch {
        context: String,
        expected: ValueType,
        found: ValueType,
        #[label("this is {found}")]
        span: Option<Span>,
    },

    #[error("Loop condition '{name}' must be i32, found {found}")]
    #[diagnostic(code(kiss::lowering::sentinel))]
    InvalidSentinelType {
        name: String,
        found: ValueType,
        #[label("declared here")]
        span: Option<Span>,
    },

    #[error("Function '{function}' has no output variable")]
    #[diagnostic(
        code(kiss::lowering::missing_return),
        help("the target of the last call statement is the returned value")
    )]
    MissingReturn {
        function: String,
        #[label("in this function")]
        span: Option<Span>,
    },

    #[error("Export refers to unknown function '{name}'")]
    #[diagnostic(code(kiss::lowering::unknown_export))]
    UnknownExport {
        name: String,
        #[label("exported here")]
        span: Option<Span>,
    },

    #[error("Call to unknown function '{name}'")]
    #[diagnostic(code(kiss::lowering::unknown_function))]
    UnknownFunction {
        name: String,
        #[label("called here")]
        span: Option<Span>,
    },

    #[error("Function '{function}' takes {expected} argument(s), {found} supplied")]
    #[diagnostic(code(kiss::lowering::arity))]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
        #[label("in this call")]
        span: Option<Span>,
    },

    #[error("Irreducible control flow: {0}")]
    #[diagnostic(code(kiss::lowering::cfg))]
    IrreducibleControlFlow(String),

    #[error("Backend error: {0}")]
    #[diagnostic(code(kiss::backend))]
    Backend(String),
}

impl Error {
    /// Source span attached to this error, if any.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::MalformedNode { span, .. }
            | Self::UnboundIdentifier { span, .. }
            | Self::DuplicateDeclaration { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::InvalidSentinelType { span, .. }
            | Self::MissingReturn { span, .. }
            | Self::UnknownExport { span, .. }
            | Self::UnknownFunction { span, .. }
            | Self::ArityMismatch { span, .. } => *span,
            _ => None,
        }
    }

    /// Builds a [`Error::MalformedNode`] for a node whose tag is wrong.
    pub fn malformed(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MalformedNode {
            expected: expected.into(),
            found: found.into(),
            span: None,
        }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::from(span.start.offset..span.end.offset)
    }
}

/// Result type alias using the kiss Error type.
pub type Result<T> = std::result::Result<T, Error>;
