//! The value type table.
//!
//! kiss has a closed set of primitive types. Each one maps to a single
//! backend type code, so there is no registry: the enum is the table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type tag carried by every slot, constant and call result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 32-bit integer
    I32,
    /// 64-bit integer
    I64,
    /// 64-bit IEEE float
    F64,
    /// No value
    #[serde(alias = "none")]
    Void,
}

impl ValueType {
    /// Every tag, in backend code order.
    pub const ALL: [ValueType; 4] = [Self::I32, Self::I64, Self::F64, Self::Void];

    /// Backend type code (WebAssembly value type byte; Void is the empty block type).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::I32 => 0x7F,
            Self::I64 => 0x7E,
            Self::F64 => 0x7C,
            Self::Void => 0x40,
        }
    }

    /// Source-level name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::Void => "void",
        }
    }

    /// Returns true if a slot may hold a value of this type.
    #[must_use]
    pub const fn is_storable(self) -> bool {
        !matches!(self, Self::Void)
    }

    /// Size of a stored value in linear memory, in bytes.
    #[must_use]
    pub const fn byte_width(self) -> u32 {
        match self {
            Self::I32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::Void => 0,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
