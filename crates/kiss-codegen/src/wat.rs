//! WebAssembly text format backend.

use std::fmt::Write;

use kiss_core::{Result, ValueType};
use kiss_ir::{BranchTest, Constant, IrExpression, IrFunction, IrModule};

use crate::ModuleBackend;
use crate::validate::validate;

/// Emits a module as folded WebAssembly text.
#[derive(Debug, Default)]
pub struct WatBackend {
    out: String,
}

impl WatBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn emit_function(&mut self, func: &IrFunction) {
        let mut header = format!("(func {}", symbol(&func.name));
        for (index, ty) in func.parameters.iter().enumerate() {
            let _ = write!(header, " (param {} {ty})", local_name(func, index as u32));
        }
        if let Some(result) = result_type(func.result) {
            let _ = write!(header, " (result {result})");
        }
        self.line(1, &header);

        let first_local = func.parameters.len() as u32;
        for (offset, ty) in func.locals.iter().enumerate() {
            let name = local_name(func, first_local + offset as u32);
            self.line(2, &format!("(local {name} {ty})"));
        }
        for expr in &func.body {
            self.emit_statement(func, expr, 2);
        }
        self.line(1, ")");
    }

    fn emit_statement(&mut self, func: &IrFunction, expr: &IrExpression, depth: usize) {
        match expr {
            IrExpression::Block { label, body } | IrExpression::Loop { label, body } => {
                let keyword = if matches!(expr, IrExpression::Block { .. }) {
                    "block"
                } else {
                    "loop"
                };
                self.line(depth, &format!("({keyword} ${label}"));
                for inner in body {
                    self.emit_statement(func, inner, depth + 1);
                }
                self.line(depth, ")");
            }
            other => {
                let text = fold(func, other);
                self.line(depth, &text);
            }
        }
    }
}

impl ModuleBackend for WatBackend {
    type Artifact = String;

    fn name(&self) -> &str {
        "wat"
    }

    fn emit(&mut self, module: &IrModule) -> Result<String> {
        validate(module)?;
        self.out.clear();
        self.line(0, "(module");

        for import in &module.imports {
            let mut signature = String::new();
            if !import.parameters.is_empty() {
                let params: Vec<&str> = import.parameters.iter().map(|t| t.name()).collect();
                let _ = write!(signature, " (param {})", params.join(" "));
            }
            if let Some(result) = result_type(import.result) {
                let _ = write!(signature, " (result {result})");
            }
            self.line(
                1,
                &format!(
                    "(import {} {} (func {}{signature}))",
                    string(import.module.as_bytes()),
                    string(import.base.as_bytes()),
                    symbol(&import.name)
                ),
            );
        }

        let memory = &module.memory;
        self.line(
            1,
            &format!(
                "(memory (export {}) {} {})",
                string(memory.export_name.as_bytes()),
                memory.initial_pages,
                memory.maximum_pages
            ),
        );
        for segment in &memory.segments {
            self.line(
                1,
                &format!(
                    "(data (i32.const {}) {})",
                    segment.offset,
                    string(&segment.bytes)
                ),
            );
        }

        for func in &module.functions {
            self.emit_function(func);
        }
        for export in &module.exports {
            self.line(
                1,
                &format!(
                    "(export {} (func {}))",
                    string(export.name.as_bytes()),
                    symbol(&export.function)
                ),
            );
        }

        self.line(0, ")");
        tracing::debug!(bytes = self.out.len(), "emitted text module");
        Ok(std::mem::take(&mut self.out))
    }
}

/// Folded form of a non-structured expression.
fn fold(func: &IrFunction, expr: &IrExpression) -> String {
    match expr {
        IrExpression::Const(constant) => match constant {
            Constant::I32(v) => format!("(i32.const {v})"),
            Constant::I64(v) => format!("(i64.const {v})"),
            Constant::F64(v) => format!("(f64.const {})", float(*v)),
        },
        IrExpression::LocalGet { index, .. } => format!("(local.get {})", local_name(func, *index)),
        IrExpression::LocalSet { index, value } => {
            format!("(local.set {} {})", local_name(func, *index), fold(func, value))
        }
        IrExpression::Call {
            function,
            arguments,
            ..
        } => {
            let mut text = format!("(call {}", symbol(function));
            for argument in arguments {
                text.push(' ');
                text.push_str(&fold(func, argument));
            }
            text.push(')');
            text
        }
        IrExpression::Load {
            value_type,
            address,
        } => format!("({value_type}.load {})", fold(func, address)),
        IrExpression::Store {
            value_type,
            address,
            value,
        } => format!(
            "({value_type}.store {} {})",
            fold(func, address),
            fold(func, value)
        ),
        IrExpression::Return { value: Some(value) } => format!("(return {})", fold(func, value)),
        IrExpression::Return { value: None } => "(return)".to_string(),
        IrExpression::BranchIf {
            label,
            condition,
            test,
        } => match test {
            BranchTest::Zero => format!("(br_if ${label} (i32.eqz {}))", fold(func, condition)),
            BranchTest::NonZero => format!("(br_if ${label} {})", fold(func, condition)),
        },
        IrExpression::Block { label, body } | IrExpression::Loop { label, body } => {
            let keyword = if matches!(expr, IrExpression::Block { .. }) {
                "block"
            } else {
                "loop"
            };
            let mut text = format!("({keyword} ${label}");
            for inner in body {
                text.push(' ');
                text.push_str(&fold(func, inner));
            }
            text.push(')');
            text
        }
    }
}

fn result_type(ty: ValueType) -> Option<&'static str> {
    ty.is_storable().then(|| ty.name())
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-./:<=>?@\\^_`|~".contains(c)
}

/// `$name`, or a quoted identifier when `name` has characters WAT ids cannot hold.
fn symbol(name: &str) -> String {
    if !name.is_empty() && name.chars().all(is_id_char) {
        format!("${name}")
    } else {
        format!("${}", string(name.as_bytes()))
    }
}

fn local_name(func: &IrFunction, index: u32) -> String {
    match func.slot_name(index) {
        Some(name) if !name.is_empty() && name.chars().all(is_id_char) => format!("${name}"),
        _ => index.to_string(),
    }
}

/// Quoted WAT string literal.
fn string(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len() + 2);
    text.push('"');
    for &byte in bytes {
        match byte {
            b'"' | b'\\' => {
                text.push('\\');
                text.push(byte as char);
            }
            0x20..=0x7e => text.push(byte as char),
            _ => {
                let _ = write!(text, "\\{byte:02x}");
            }
        }
    }
    text.push('"');
    text
}

fn float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else {
        format!("{value:?}")
    }
}
