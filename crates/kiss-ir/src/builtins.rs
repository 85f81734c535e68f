//! Memory helpers every module carries.

use kiss_core::ValueType;
use kiss_semantic::{FunctionKind, FunctionSignature};

use crate::{IrExpression, IrFunction};

/// A built-in linear-memory helper.
///
/// Stores take `(addr: i32, value: T)` and return the stored value; loads
/// take `(addr: i32)` and return the loaded value. Both access byte offset 0
/// of `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    StoreI32,
    StoreF64,
    LoadI32,
    LoadF64,
}

impl Builtin {
    pub const ALL: [Self; 4] = [Self::StoreI32, Self::StoreF64, Self::LoadI32, Self::LoadF64];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StoreI32 => "store_i32",
            Self::StoreF64 => "store_f64",
            Self::LoadI32 => "load_i32",
            Self::LoadF64 => "load_f64",
        }
    }

    /// Type moved to or from memory.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::StoreI32 | Self::LoadI32 => ValueType::I32,
            Self::StoreF64 | Self::LoadF64 => ValueType::F64,
        }
    }

    #[must_use]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::StoreI32 | Self::StoreF64)
    }

    #[must_use]
    pub fn parameters(self) -> Vec<ValueType> {
        if self.is_store() {
            vec![ValueType::I32, self.value_type()]
        } else {
            vec![ValueType::I32]
        }
    }

    #[must_use]
    pub fn signature(self) -> FunctionSignature {
        FunctionSignature::new(&self.parameters(), self.value_type(), FunctionKind::Builtin)
    }

    /// Builds the helper's function definition.
    #[must_use]
    pub fn to_function(self) -> IrFunction {
        let value_type = self.value_type();
        let address = Box::new(IrExpression::LocalGet {
            index: 0,
            value_type: ValueType::I32,
        });

        let (body, slot_names) = if self.is_store() {
            let value = || {
                Box::new(IrExpression::LocalGet {
                    index: 1,
                    value_type,
                })
            };
            (
                vec![
                    IrExpression::Store {
                        value_type,
                        address,
                        value: value(),
                    },
                    IrExpression::Return {
                        value: Some(value()),
                    },
                ],
                vec!["addr".to_string(), "value".to_string()],
            )
        } else {
            (
                vec![IrExpression::Return {
                    value: Some(Box::new(IrExpression::Load {
                        value_type,
                        address,
                    })),
                }],
                vec!["addr".to_string()],
            )
        };

        IrFunction {
            name: self.name().to_string(),
            parameters: self.parameters(),
            locals: Vec::new(),
            result: value_type,
            body,
            slot_names,
            control_flow: None,
            kind: FunctionKind::Builtin,
        }
    }
}

/// Definitions of all four helpers, in index order.
#[must_use]
pub fn builtin_functions() -> Vec<IrFunction> {
    Builtin::ALL.into_iter().map(Builtin::to_function).collect()
}
