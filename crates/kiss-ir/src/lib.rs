//! Kiss intermediate representation.
//!
//! Lowering runs in three steps. Statement lowering turns each function body
//! into a flat list of [`Operation`]s over numbered slots. Control-flow
//! reconstruction turns that list into structured [`IrExpression`]s, going
//! through a [`ControlFlowGraph`] when the body loops. Module assembly adds
//! imports, built-in memory helpers, exports and linear memory.
//!
//! # Example
//!
//! ```rust
//! use kiss_ast::{CallStatement, FunctionBody, FunctionDeclaration, FunctionImport, Operand, Param, Root, VariableDeclaration};
//! use kiss_core::ValueType;
//!
//! let add = FunctionImport::new("add", "js", "add", vec![ValueType::I32, ValueType::I32], ValueType::I32);
//! let sum = FunctionDeclaration::new(
//!     "sum",
//!     vec![Param::new("a", ValueType::I32), Param::new("b", ValueType::I32)],
//!     ValueType::I32,
//!     FunctionBody::new(
//!         vec![VariableDeclaration::new("r", ValueType::I32, None)],
//!         vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("b")])],
//!     ),
//! );
//!
//! let module = kiss_ir::lower(&Root::new(vec![add], vec![sum], vec![])).unwrap();
//! assert_eq!(module.function("sum").unwrap().body.len(), 2);
//! ```

mod builtins;
mod cfg;
mod display;
mod expression;
mod lowering;
mod module;
mod operation;

pub use builtins::{Builtin, builtin_functions};
pub use cfg::{BasicBlock, BlockId, ControlFlowGraph, EXIT_LABEL, Edge, EdgeKind, LOOP_LABEL};
pub use expression::{BranchTest, IrExpression};
pub use lowering::{AstLowering, LoweredBody, lower_initializer, lower_operand, reconstruct};
pub use module::{DataSegment, IrExport, IrFunction, IrImport, IrModule, Memory};
pub use operation::{Constant, Operation, Value};

use kiss_ast::Root;
use kiss_core::Result;

/// Lowers a program with the default memory layout.
///
/// # Errors
/// The first lowering error in the program.
pub fn lower(root: &Root) -> Result<IrModule> {
    AstLowering::new().lower_program(root)
}
