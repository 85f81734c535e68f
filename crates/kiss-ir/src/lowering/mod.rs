//! AST to IR lowering implementation.

mod control_flow;
mod core;
mod expressions;
mod program;
mod statements;

pub use control_flow::reconstruct;
pub use core::AstLowering;
pub use expressions::{lower_initializer, lower_operand};
pub use statements::LoweredBody;
