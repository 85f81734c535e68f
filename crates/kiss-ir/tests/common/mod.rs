//! Common test utilities for lowering tests.

#![allow(dead_code)]

use std::collections::HashMap;

use kiss_core::Result;
use kiss_ir::{BranchTest, IrExpression, IrFunction, IrModule};

/// Decodes and lowers a JSON program.
pub fn lower_json(source: &str) -> Result<IrModule> {
    let root = kiss_ast::from_json(source)?;
    kiss_ir::lower(&root)
}

pub fn should_pass(source: &str) -> bool {
    lower_json(source).is_ok()
}

pub fn should_fail(source: &str) -> bool {
    lower_json(source).is_err()
}

/// Wraps function declarations in a program that imports `add`, `inc` and `dec`.
pub fn program(functions: &str, exports: &str) -> String {
    format!(
        r#"{{
            "type": "Root",
            "fnImports": [
                {{ "type": "FunctionImport", "id": {{ "type": "Identifier", "name": "add" }},
                   "module": "js", "base": "add", "paramTypes": ["i32", "i32"], "returnType": "i32" }},
                {{ "type": "FunctionImport", "id": {{ "type": "Identifier", "name": "inc" }},
                   "module": "js", "base": "inc", "paramTypes": ["i32"], "returnType": "i32" }},
                {{ "type": "FunctionImport", "id": {{ "type": "Identifier", "name": "dec" }},
                   "module": "js", "base": "dec", "paramTypes": ["i32"], "returnType": "i32" }}
            ],
            "functions": [{functions}],
            "fnExports": [{exports}]
        }}"#
    )
}

enum Flow {
    Next,
    Branch(String),
    Return(i64),
}

/// Runs an integer-only function body, sending calls to `host`.
pub fn run(
    function: &IrFunction,
    arguments: &[i64],
    host: &mut dyn FnMut(&str, &[i64]) -> i64,
) -> Option<i64> {
    let mut locals = arguments.to_vec();
    locals.resize(function.slot_count(), 0);
    match exec(&function.body, &mut locals, host) {
        Flow::Return(value) => Some(value),
        Flow::Next | Flow::Branch(_) => None,
    }
}

fn exec(
    body: &[IrExpression],
    locals: &mut Vec<i64>,
    host: &mut dyn FnMut(&str, &[i64]) -> i64,
) -> Flow {
    for expr in body {
        let flow = match expr {
            IrExpression::Block { label, body } => match exec(body, locals, host) {
                Flow::Branch(target) if &target == label => Flow::Next,
                other => other,
            },
            IrExpression::Loop { label, body } => loop {
                match exec(body, locals, host) {
                    Flow::Branch(target) if &target == label => {}
                    other => break other,
                }
            },
            IrExpression::BranchIf {
                label,
                condition,
                test,
            } => {
                let value = eval(condition, locals, host);
                let taken = match test {
                    BranchTest::Zero => value == 0,
                    BranchTest::NonZero => value != 0,
                };
                if taken {
                    Flow::Branch(label.clone())
                } else {
                    Flow::Next
                }
            }
            IrExpression::Return { value } => {
                Flow::Return(value.as_ref().map_or(0, |v| eval(v, locals, host)))
            }
            other => {
                eval(other, locals, host);
                Flow::Next
            }
        };
        if !matches!(flow, Flow::Next) {
            return flow;
        }
    }
    Flow::Next
}

fn eval(
    expr: &IrExpression,
    locals: &mut Vec<i64>,
    host: &mut dyn FnMut(&str, &[i64]) -> i64,
) -> i64 {
    match expr {
        IrExpression::Const(kiss_ir::Constant::I32(v)) => i64::from(*v),
        IrExpression::Const(kiss_ir::Constant::I64(v)) => *v,
        IrExpression::LocalGet { index, .. } => locals[*index as usize],
        IrExpression::LocalSet { index, value } => {
            let value = eval(value, locals, host);
            locals[*index as usize] = value;
            0
        }
        IrExpression::Call {
            function,
            arguments,
            ..
        } => {
            let values: Vec<i64> = arguments.iter().map(|a| eval(a, locals, host)).collect();
            host(function.as_str(), values.as_slice())
        }
        other => panic!("not supported by the test interpreter: {other}"),
    }
}

/// Host that implements `add`, `inc` and `dec` and counts calls by name.
pub fn counting_host(counts: &mut HashMap<String, usize>) -> impl FnMut(&str, &[i64]) -> i64 + '_ {
    move |name, args| {
        *counts.entry(name.to_string()).or_default() += 1;
        match name {
            "add" => args[0] + args[1],
            "inc" => args[0] + 1,
            "dec" => args[0] - 1,
            other => panic!("unexpected call to {other}"),
        }
    }
}
