//! Core AST lowering structure and function registry.

use kiss_core::{Error, Result, Span, ValueType};
use kiss_semantic::{FunctionSignature, FunctionTable};

use crate::Memory;

/// Converts a kiss AST into an [`IrModule`](crate::IrModule).
///
/// One instance can lower several programs; every call to
/// [`AstLowering::lower_program`] starts from an empty function table.
#[derive(Debug, Default)]
pub struct AstLowering {
    /// Signatures of every callable name in the module being lowered
    pub(crate) functions: FunctionTable,
    /// Linear memory attached to every assembled module
    pub(crate) memory: Memory,
}

impl AstLowering {
    /// Creates a lowering with the default memory layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lowering that attaches `memory` to assembled modules.
    #[must_use]
    pub fn with_memory(memory: Memory) -> Self {
        Self {
            functions: FunctionTable::new(),
            memory,
        }
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Registers a callable name.
    pub(crate) fn define_function(
        &mut self,
        name: &str,
        signature: FunctionSignature,
        span: Option<Span>,
    ) -> Result<()> {
        tracing::trace!(name, %signature, kind = ?signature.kind, "registered function");
        self.functions.define(name, signature, span)
    }

    /// Looks a callee up.
    pub(crate) fn lookup_function(
        &self,
        name: &str,
        span: Option<Span>,
    ) -> Result<&FunctionSignature> {
        self.functions
            .lookup(name)
            .ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
                span,
            })
    }
}

/// Rejects `Void` where a storable type is required.
pub(crate) fn require_storable(
    value_type: ValueType,
    what: &str,
    span: Option<Span>,
) -> Result<ValueType> {
    if value_type.is_storable() {
        Ok(value_type)
    } else {
        Err(Error::MalformedNode {
            expected: format!("{what} of type i32, i64 or f64"),
            found: value_type.to_string(),
            span,
        })
    }
}
