//! Common test utilities for driver tests.

#![allow(dead_code)]

use kiss_cli::{Compiler, Config};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// `sum(a, b) = add(a, b)`, exported as `sum`.
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

/// A body that calls a function nobody declared.
pub const UNKNOWN_CALL_PROGRAM: &str = r#"{
    "type": "Root",
    "functions": [
        { "type": "FunctionDeclaration",
          "id": { "type": "Identifier", "name": "main" },
          "params": [],
          "returnType": "i32",
          "body": { "type": "FunctionBody",
              "variables": [ { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "r" }, "variableType": "i32" } ],
              "calls": [ { "type": "CallStatement", "variable": { "type": "Identifier", "name": "r" },
                           "fn": { "type": "Identifier", "name": "missing" }, "params": [] } ] } }
    ]
}"#;

/// A project directory holding `kiss.toml` and one program file.
pub struct Project {
    pub dir: TempDir,
    pub input: PathBuf,
}

impl Project {
    pub fn new(config: &Config, file: &str, program: &str) -> Self {
        let dir = TempDir::new().unwrap();
        config.save(dir.path().join(kiss_utils::CONFIG_FILE)).unwrap();
        let input = dir.path().join(file);
        fs::write(&input, program).unwrap();
        Self { dir, input }
    }

    pub fn compiler(&self) -> Compiler {
        let config = Config::load(self.dir.path().join(kiss_utils::CONFIG_FILE)).unwrap();
        Compiler::new(config, Some(self.dir.path().to_path_buf()))
    }
}
