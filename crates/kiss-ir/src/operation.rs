//! Flat IR operations produced by statement lowering.

use kiss_core::ValueType;
use kiss_semantic::Slot;

use crate::IrExpression;

/// A typed literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    I32(i32),
    I64(i64),
    F64(f64),
}

impl Constant {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F64(_) => ValueType::F64,
        }
    }
}

/// A lowered operand: a slot read or a literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Local(Slot),
    Constant(Constant),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Local(slot) => slot.value_type,
            Self::Constant(constant) => constant.value_type(),
        }
    }

    /// Expression that produces this value.
    #[must_use]
    pub fn to_expression(&self) -> IrExpression {
        match self {
            Self::Local(slot) => IrExpression::local_get(slot),
            Self::Constant(constant) => IrExpression::Const(*constant),
        }
    }
}

/// One step of a function body before control flow is reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Assigns an initializer to a freshly declared local
    Init { slot: Slot, value: Value },

    /// Calls `function` and stores its result in `target`
    Call {
        target: Slot,
        function: String,
        arguments: Vec<Value>,
        result_type: ValueType,
    },

    /// Returns the value held in `slot`
    Return { slot: Slot },
}

impl Operation {
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self, Self::Init { .. })
    }

    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    #[must_use]
    pub const fn is_return(&self) -> bool {
        matches!(self, Self::Return { .. })
    }

    /// Structured form of this operation.
    #[must_use]
    pub fn to_expression(&self) -> IrExpression {
        match self {
            Self::Init { slot, value } => IrExpression::LocalSet {
                index: slot.index,
                value: Box::new(value.to_expression()),
            },
            Self::Call {
                target,
                function,
                arguments,
                result_type,
            } => IrExpression::LocalSet {
                index: target.index,
                value: Box::new(IrExpression::Call {
                    function: function.clone(),
                    arguments: arguments.iter().map(Value::to_expression).collect(),
                    result_type: *result_type,
                }),
            },
            Self::Return { slot } => IrExpression::Return {
                value: Some(Box::new(IrExpression::local_get(slot))),
            },
        }
    }
}
