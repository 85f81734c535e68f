//! Common test utilities for backend tests.

#![allow(dead_code)]

use kiss_ir::IrModule;

/// `sum(a, b) = add(a, b)` over an imported `add`, exported as `sum`.
pub const SUM_PROGRAM: &str = r#"{
    "type": "Root",
    "fnImports": [
        { "type": "FunctionImport", "id": { "type": "Identifier", "name": "add" },
          "module": "js", "base": "add", "paramTypes": ["i32", "i32"], "returnType": "i32" }
    ],
    "functions": [
        { "type": "FunctionDeclaration",
          "id": { "type": "Identifier", "name": "sum" },
          "params": [
              { "type": "Param", "id": { "type": "Identifier", "name": "a" }, "paramType": "i32" },
              { "type": "Param", "id": { "type": "Identifier", "name": "b" }, "paramType": "i32" }
          ],
          "returnType": "i32",
          "body": { "type": "FunctionBody",
              "variables": [ { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "r" }, "variableType": "i32" } ],
              "calls": [ { "type": "CallStatement", "variable": { "type": "Identifier", "name": "r" },
                           "fn": { "type": "Identifier", "name": "add" },
                           "params": [ { "type": "Identifier", "name": "a" }, { "type": "Identifier", "name": "b" } ] } ] } }
    ],
    "fnExports": [ { "type": "FunctionExport", "id": { "type": "Identifier", "name": "sum" }, "name": "sum" } ]
}"#;

/// Counts `x` up while the sentinel copied from `n` is nonzero.
pub const LOOP_PROGRAM: &str = r#"{
    "type": "Root",
    "fnImports": [
        { "type": "FunctionImport", "id": { "type": "Identifier", "name": "inc" },
          "module": "js", "base": "inc", "paramTypes": ["i32"], "returnType": "i32" },
        { "type": "FunctionImport", "id": { "type": "Identifier", "name": "nop" },
          "module": "js", "base": "nop", "paramTypes": ["void"], "returnType": "void" }
    ],
    "functions": [
        { "type": "FunctionDeclaration",
          "id": { "type": "Identifier", "name": "count" },
          "params": [ { "type": "Param", "id": { "type": "Identifier", "name": "n" }, "paramType": "i32" } ],
          "returnType": "i32",
          "body": { "type": "FunctionBody",
              "variables": [
                  { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "x" }, "variableType": "i32",
                    "iniValue": { "type": "i32", "value": 0 } },
                  { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "_breqz" }, "variableType": "i32",
                    "iniValue": { "type": "Identifier", "name": "n" } },
                  { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "scale" }, "variableType": "f64",
                    "iniValue": { "type": "f64", "value": 0.5 } }
              ],
              "calls": [ { "type": "CallStatement", "variable": { "type": "Identifier", "name": "x" },
                           "fn": { "type": "Identifier", "name": "inc" },
                           "params": [ { "type": "Identifier", "name": "x" } ] } ] } }
    ],
    "fnExports": [
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "count" }, "name": "count" },
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "count" }, "name": "tally" }
    ]
}"#;

/// Decodes and lowers a JSON program that is known to be valid.
pub fn lower(source: &str) -> IrModule {
    let root = kiss_ast::from_json(source).expect("test program decodes");
    kiss_ir::lower(&root).expect("test program lowers")
}

/// Returns true if `needle` occurs in `haystack`.
pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
