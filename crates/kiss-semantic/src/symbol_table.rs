//! Symbol table for tracking the storage slots of one function.

use kiss_core::{Error, Result, Span, ValueType};
use std::collections::HashMap;
use std::fmt;

/// Where a slot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotOrigin {
    Parameter,
    Local,
    /// The reserved loop-condition local, placed after every other local.
    Sentinel,
}

/// A function-local storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Stable index, unique within the function
    pub index: u32,
    /// Declared type
    pub value_type: ValueType,
    /// Parameter, local or sentinel
    pub origin: SlotOrigin,
}

impl Slot {
    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self.origin, SlotOrigin::Parameter)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}:{}", self.index, self.value_type)
    }
}

/// Per-function mapping from identifier to [`Slot`].
///
/// Parameters and locals share one namespace. Slots are handed out in
/// declaration order, so callers declare every parameter before the first
/// local and the sentinel last.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Slot>,
    /// Slot names, indexed by slot index
    names: Vec<String>,
    parameter_count: u32,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the next parameter.
    ///
    /// # Errors
    /// Returns `DuplicateDeclaration` if `name` is already declared.
    pub fn declare_parameter(
        &mut self,
        name: &str,
        value_type: ValueType,
        span: Option<Span>,
    ) -> Result<Slot> {
        let slot = self.declare(name, value_type, SlotOrigin::Parameter, span)?;
        self.parameter_count += 1;
        Ok(slot)
    }

    /// Declares the next local.
    ///
    /// # Errors
    /// Returns `DuplicateDeclaration` if `name` is already declared.
    pub fn declare_local(
        &mut self,
        name: &str,
        value_type: ValueType,
        span: Option<Span>,
    ) -> Result<Slot> {
        self.declare(name, value_type, SlotOrigin::Local, span)
    }

    /// Declares the reserved loop-condition slot.
    ///
    /// # Errors
    /// Returns `DuplicateDeclaration` if `name` is already declared.
    pub fn declare_sentinel(
        &mut self,
        name: &str,
        value_type: ValueType,
        span: Option<Span>,
    ) -> Result<Slot> {
        self.declare(name, value_type, SlotOrigin::Sentinel, span)
    }

    fn declare(
        &mut self,
        name: &str,
        value_type: ValueType,
        origin: SlotOrigin,
        span: Option<Span>,
    ) -> Result<Slot> {
        if self.symbols.contains_key(name) {
            return Err(Error::DuplicateDeclaration {
                name: name.to_string(),
                span,
            });
        }

        let slot = Slot {
            index: self.names.len() as u32,
            value_type,
            origin,
        };
        tracing::trace!(name, %slot, ?origin, "declared slot");

        self.symbols.insert(name.to_string(), slot);
        self.names.push(name.to_string());
        Ok(slot)
    }

    /// Looks a name up.
    ///
    /// # Errors
    /// Returns `UnboundIdentifier` if `name` was never declared.
    pub fn resolve(&self, name: &str, span: Option<Span>) -> Result<Slot> {
        self.lookup(name).ok_or_else(|| Error::UnboundIdentifier {
            name: name.to_string(),
            span,
        })
    }

    /// Looks a name up without failing.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.symbols.get(name).copied()
    }

    /// Name of the slot at `index`.
    #[must_use]
    pub fn name_of(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    /// Slot names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of declared parameters.
    #[must_use]
    pub const fn parameter_count(&self) -> u32 {
        self.parameter_count
    }

    /// Total number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every slot in index order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.names.iter().map(|name| self.symbols[name])
    }

    /// Types of the non-parameter slots in index order.
    #[must_use]
    pub fn local_types(&self) -> Vec<ValueType> {
        self.slots()
            .filter(|slot| !slot.is_parameter())
            .map(|slot| slot.value_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table_basic() {
        let mut table = SymbolTable::new();
        let slot = table.declare_parameter("x", ValueType::I32, None).unwrap();
        assert_eq!(slot.index, 0);
        assert!(slot.is_parameter());

        let found = table.resolve("x", None).unwrap();
        assert_eq!(found, slot);
        assert_eq!(table.name_of(0), Some("x"));
    }

    #[test]
    fn test_indices_follow_declaration_order() {
        let mut table = SymbolTable::new();
        table.declare_parameter("a", ValueType::I32, None).unwrap();
        table.declare_parameter("b", ValueType::F64, None).unwrap();
        let x = table.declare_local("x", ValueType::I64, None).unwrap();
        let s = table.declare_sentinel("_breqz", ValueType::I32, None).unwrap();

        assert_eq!(x.index, 2);
        assert_eq!(s.index, 3);
        assert_eq!(s.origin, SlotOrigin::Sentinel);
        assert_eq!(table.parameter_count(), 2);
        assert_eq!(table.len(), 4);
        assert_eq!(table.local_types(), vec![ValueType::I64, ValueType::I32]);
    }

    #[test]
    fn test_symbol_table_duplicate_error() {
        let mut table = SymbolTable::new();
        table.declare_parameter("x", ValueType::I32, None).unwrap();
        let err = table.declare_local("x", ValueType::I32, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateDeclaration { ref name, .. } if name == "x"));
        // The failed declaration consumed no index.
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_symbol_table_undefined() {
        let table = SymbolTable::new();
        assert!(table.lookup("undefined").is_none());
        assert!(matches!(
            table.resolve("undefined", None),
            Err(Error::UnboundIdentifier { .. })
        ));
    }

    #[test]
    fn test_slot_display() {
        let slot = Slot {
            index: 3,
            value_type: ValueType::F64,
            origin: SlotOrigin::Local,
        };
        assert_eq!(slot.to_string(), "$3:f64");
    }
}
