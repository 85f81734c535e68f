//! Name resolution for kiss programs.
//!
//! Two tables live here: the per-function [`SymbolTable`] that assigns every
//! parameter and local a stable slot index, and the module-wide
//! [`FunctionTable`] that records the signature of every callable function.

mod signatures;
mod symbol_table;

pub use signatures::{FunctionKind, FunctionSignature, FunctionTable};
pub use symbol_table::{Slot, SlotOrigin, SymbolTable};
