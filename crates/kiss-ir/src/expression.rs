//! Structured IR expressions.
//!
//! This is the whole vocabulary a backend has to understand: constants, local
//! access, calls, typed loads and stores, return, and the structured control
//! constructs `block`, `loop` and conditional branch.

use kiss_core::ValueType;
use kiss_semantic::Slot;

use crate::Constant;

/// What a conditional branch tests its i32 operand against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTest {
    /// Branch when the operand is zero
    Zero,
    /// Branch when the operand is nonzero
    NonZero,
}

/// A node of a structured function body.
#[derive(Debug, Clone, PartialEq)]
pub enum IrExpression {
    /// Typed constant
    Const(Constant),

    /// Reads a local slot
    LocalGet { index: u32, value_type: ValueType },

    /// Writes a local slot
    LocalSet {
        index: u32,
        value: Box<IrExpression>,
    },

    /// Direct call by function name
    Call {
        function: String,
        arguments: Vec<IrExpression>,
        result_type: ValueType,
    },

    /// Loads a value from linear memory at byte offset 0 of `address`
    Load {
        value_type: ValueType,
        address: Box<IrExpression>,
    },

    /// Stores a value to linear memory at byte offset 0 of `address`
    Store {
        value_type: ValueType,
        address: Box<IrExpression>,
        value: Box<IrExpression>,
    },

    /// Returns from the function
    Return { value: Option<Box<IrExpression>> },

    /// Labelled block; branching to it jumps past its end
    Block {
        label: String,
        body: Vec<IrExpression>,
    },

    /// Labelled loop; branching to it jumps back to its start
    Loop {
        label: String,
        body: Vec<IrExpression>,
    },

    /// Branches to `label` when `condition` passes `test`
    BranchIf {
        label: String,
        condition: Box<IrExpression>,
        test: BranchTest,
    },
}

impl IrExpression {
    /// Reads `slot`.
    #[must_use]
    pub fn local_get(slot: &Slot) -> Self {
        Self::LocalGet {
            index: slot.index,
            value_type: slot.value_type,
        }
    }

    /// Branches to `label` depending on the value of the i32 `slot`.
    #[must_use]
    pub fn branch_on(label: impl Into<String>, slot: &Slot, test: BranchTest) -> Self {
        Self::BranchIf {
            label: label.into(),
            condition: Box::new(Self::local_get(slot)),
            test,
        }
    }

    /// Type of the value this expression leaves behind.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Const(constant) => constant.value_type(),
            Self::LocalGet { value_type, .. } | Self::Load { value_type, .. } => *value_type,
            Self::Call { result_type, .. } => *result_type,
            Self::LocalSet { .. }
            | Self::Store { .. }
            | Self::Return { .. }
            | Self::Block { .. }
            | Self::Loop { .. }
            | Self::BranchIf { .. } => ValueType::Void,
        }
    }

    /// Returns true for block, loop and branch nodes.
    #[must_use]
    pub const fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Self::Block { .. } | Self::Loop { .. } | Self::BranchIf { .. }
        )
    }

    /// Visits this node and every nested node, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a IrExpression)) {
        visit(self);
        match self {
            Self::Const(_) | Self::LocalGet { .. } => {}
            Self::LocalSet { value, .. } => value.walk(visit),
            Self::Call { arguments, .. } => {
                for argument in arguments {
                    argument.walk(visit);
                }
            }
            Self::Load { address, .. } => address.walk(visit),
            Self::Store { address, value, .. } => {
                address.walk(visit);
                value.walk(visit);
            }
            Self::Return { value } => {
                if let Some(value) = value {
                    value.walk(visit);
                }
            }
            Self::Block { body, .. } | Self::Loop { body, .. } => {
                for expr in body {
                    expr.walk(visit);
                }
            }
            Self::BranchIf { condition, .. } => condition.walk(visit),
        }
    }
}
