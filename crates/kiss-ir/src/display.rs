//! Display implementations for the IR, used for `--emit ir` and debugging.

use std::fmt;

use crate::{BranchTest, Constant, IrExpression, IrFunction, IrModule, Operation, Value};

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}:i32"),
            Self::I64(v) => write!(f, "{v}:i64"),
            Self::F64(v) => write!(f, "{v:?}:f64"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(slot) => write!(f, "{slot}"),
            Self::Constant(constant) => write!(f, "{constant}"),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init { slot, value } => write!(f, "init {slot} = {value}"),
            Self::Call {
                target,
                function,
                arguments,
                ..
            } => write!(f, "call {target} = {function}({})", join(arguments)),
            Self::Return { slot } => write!(f, "return {slot}"),
        }
    }
}

impl IrExpression {
    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            Self::Block { label, body } | Self::Loop { label, body } => {
                let keyword = if matches!(self, Self::Block { .. }) {
                    "block"
                } else {
                    "loop"
                };
                writeln!(f, "{pad}{keyword} {label}")?;
                for expr in body {
                    expr.write_indented(f, depth + 1)?;
                }
                writeln!(f, "{pad}end")
            }
            _ => writeln!(f, "{pad}{self}"),
        }
    }
}

impl fmt::Display for IrExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(constant) => write!(f, "{constant}"),
            Self::LocalGet { index, .. } => write!(f, "${index}"),
            Self::LocalSet { index, value } => write!(f, "${index} = {value}"),
            Self::Call {
                function,
                arguments,
                ..
            } => write!(f, "call {function}({})", join(arguments)),
            Self::Load {
                value_type,
                address,
            } => write!(f, "{value_type}.load [{address}]"),
            Self::Store {
                value_type,
                address,
                value,
            } => write!(f, "{value_type}.store [{address}] {value}"),
            Self::Return { value: Some(value) } => write!(f, "return {value}"),
            Self::Return { value: None } => write!(f, "return"),
            Self::BranchIf {
                label,
                condition,
                test,
            } => {
                let op = match test {
                    BranchTest::Zero => "==",
                    BranchTest::NonZero => "!=",
                };
                write!(f, "br_if {label} ({condition} {op} 0)")
            }
            Self::Block { .. } | Self::Loop { .. } => self.write_indented(f, 0),
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("${i}: {ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "fn {}({params}) -> {} {{", self.name, self.result)?;

        if !self.locals.is_empty() {
            let first = self.parameters.len();
            let locals = self
                .locals
                .iter()
                .enumerate()
                .map(|(i, ty)| {
                    let index = first + i;
                    let name = self.slot_names.get(index).map_or("?", String::as_str);
                    format!("${index}: {ty} ({name})")
                })
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "  local {locals}")?;
        }
        for expr in &self.body {
            expr.write_indented(f, 1)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(
                f,
                "import {} = {}.{}({}) -> {}",
                import.name,
                import.module,
                import.base,
                join(&import.parameters),
                import.result
            )?;
        }
        let memory = &self.memory;
        writeln!(
            f,
            "memory {}..{} export \"{}\"",
            memory.initial_pages, memory.maximum_pages, memory.export_name
        )?;
        for segment in &memory.segments {
            writeln!(
                f,
                "data @{} {:?}",
                segment.offset,
                String::from_utf8_lossy(&segment.bytes)
            )?;
        }
        for func in &self.functions {
            write!(f, "\n{func}")?;
        }
        if !self.exports.is_empty() {
            writeln!(f)?;
        }
        for export in &self.exports {
            writeln!(f, "export {} as \"{}\"", export.function, export.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiss_core::ValueType;
    use kiss_semantic::{Slot, SlotOrigin};

    #[test]
    fn test_operation_display() {
        let slot = Slot {
            index: 2,
            value_type: ValueType::I32,
            origin: SlotOrigin::Local,
        };
        let op = Operation::Call {
            target: slot,
            function: "add".to_string(),
            arguments: vec![Value::Constant(Constant::I32(1)), Value::Local(slot)],
            result_type: ValueType::I32,
        };
        assert_eq!(op.to_string(), "call $2:i32 = add(1:i32, $2:i32)");
        assert_eq!(
            Operation::Init {
                slot,
                value: Value::Constant(Constant::F64(2.0))
            }
            .to_string(),
            "init $2:i32 = 2.0:f64"
        );
    }

    #[test]
    fn test_nested_display() {
        let expr = IrExpression::Loop {
            label: "repeat".to_string(),
            body: vec![IrExpression::LocalSet {
                index: 0,
                value: Box::new(IrExpression::Const(Constant::I64(-3))),
            }],
        };
        insta::assert_snapshot!(expr.to_string(), @r"
        loop repeat
          $0 = -3:i64
        end
        ");
    }
}
