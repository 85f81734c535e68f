//! Module-wide table of callable functions.

use kiss_core::{Error, Result, Span, ValueType};
use std::collections::HashMap;
use std::fmt;

/// Where a callable function is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Provided by the host
    Import,
    /// Always-present memory helper
    Builtin,
    /// Declared in the source program
    User,
}

/// Parameter and result types of a callable function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub parameters: Vec<ValueType>,
    pub result: ValueType,
    pub kind: FunctionKind,
}

impl FunctionSignature {
    /// Builds a signature; `Void` entries in `parameters` contribute nothing.
    #[must_use]
    pub fn new(parameters: &[ValueType], result: ValueType, kind: FunctionKind) -> Self {
        Self {
            parameters: parameters
                .iter()
                .copied()
                .filter(|ty| ty.is_storable())
                .collect(),
            result,
            kind,
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "({params}) -> {}", self.result)
    }
}

/// Signatures of every function a call or export may name.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionSignature>,
}

impl FunctionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function.
    ///
    /// # Errors
    /// Returns `DuplicateDeclaration` if the name is already taken.
    pub fn define(
        &mut self,
        name: &str,
        signature: FunctionSignature,
        span: Option<Span>,
    ) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(Error::DuplicateDeclaration {
                name: name.to_string(),
                span,
            });
        }
        self.functions.insert(name.to_string(), signature);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
