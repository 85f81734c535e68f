//! Operand lowering.

use kiss_ast::{Operand, OperandKind};
use kiss_core::{Error, Result, ValueType};
use kiss_semantic::{Slot, SymbolTable};

use crate::{Constant, Value};

/// Lowers an operand to a value.
///
/// Identifiers resolve through `symbols`; literals keep the type of their
/// node. A `Void` operand lowers to `None`.
///
/// # Errors
/// `UnboundIdentifier` for an undeclared name, `TypeMismatch` for an i32
/// literal out of range, `MalformedNode` for an unrecognised operand.
pub fn lower_operand(operand: &Operand, symbols: &SymbolTable) -> Result<Option<Value>> {
    let value = match operand.kind()? {
        OperandKind::Reference(name) => Value::Local(symbols.resolve(name, operand.span())?),
        OperandKind::IntConst {
            value,
            value_type: ValueType::I32,
        } => {
            let narrowed = i32::try_from(value).map_err(|_| Error::TypeMismatch {
                context: format!("literal {value}"),
                expected: ValueType::I32,
                found: ValueType::I64,
                span: operand.span(),
            })?;
            Value::Constant(Constant::I32(narrowed))
        }
        OperandKind::IntConst { value, .. } => Value::Constant(Constant::I64(value)),
        OperandKind::FloatConst(value) => Value::Constant(Constant::F64(value)),
        OperandKind::Void => return Ok(None),
    };
    Ok(Some(value))
}

/// Lowers the initializer of the local `name` held in `slot`.
///
/// # Errors
/// `TypeMismatch` if the initializer is `Void` or its type differs from the
/// slot's, plus everything [`lower_operand`] reports.
pub fn lower_initializer(
    name: &str,
    slot: Slot,
    operand: &Operand,
    symbols: &SymbolTable,
) -> Result<Value> {
    let mismatch = |found| Error::TypeMismatch {
        context: format!("initializer of '{name}'"),
        expected: slot.value_type,
        found,
        span: operand.span(),
    };

    let value = lower_operand(operand, symbols)?.ok_or_else(|| mismatch(ValueType::Void))?;
    if value.value_type() != slot.value_type {
        return Err(mismatch(value.value_type()));
    }
    Ok(value)
}
