//! Statement lowering and module assembly tests.

mod common;

use common::{lower_json, program, should_fail, should_pass};
use kiss_ast::{
    CallStatement, FunctionBody, FunctionDeclaration, Operand, Param, Root, VariableDeclaration,
};
use kiss_core::{Error, ValueType};
use kiss_ir::{AstLowering, IrExpression, Memory, Operation, Value};
use kiss_semantic::{FunctionKind, SlotOrigin};

const SUM: &str = r#"{
    "type": "FunctionDeclaration",
    "id": { "type": "Identifier", "name": "sum" },
    "params": [
        { "type": "Param", "id": { "type": "Identifier", "name": "a" }, "paramType": "i32" },
        { "type": "Param", "id": { "type": "Identifier", "name": "b" }, "paramType": "i32" }
    ],
    "returnType": "i32",
    "body": {
        "type": "FunctionBody",
        "variables": [
            { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "r" }, "variableType": "i32" }
        ],
        "calls": [
            { "type": "CallStatement",
              "variable": { "type": "Identifier", "name": "r" },
              "fn": { "type": "Identifier", "name": "add" },
              "params": [ { "type": "Identifier", "name": "a" }, { "type": "Identifier", "name": "b" } ] }
        ]
    }
}"#;

fn function(
    name: &str,
    params: &[&str],
    variables: Vec<VariableDeclaration>,
    calls: Vec<CallStatement>,
) -> FunctionDeclaration {
    FunctionDeclaration::new(
        name,
        params.iter().map(|p| Param::new(*p, ValueType::I32)).collect(),
        ValueType::I32,
        FunctionBody::new(variables, calls),
    )
}

fn local(name: &str, init: Option<Operand>) -> VariableDeclaration {
    VariableDeclaration::new(name, ValueType::I32, init)
}

fn lower_one(func: FunctionDeclaration) -> kiss_core::Result<Vec<Operation>> {
    let imports = vec![kiss_ast::FunctionImport::new(
        "add",
        "js",
        "add",
        vec![ValueType::I32, ValueType::I32],
        ValueType::I32,
    )];
    let mut lowering = AstLowering::new();
    lowering.assemble(&imports, std::slice::from_ref(&func), &[])?;
    Ok(lowering.lower_function_body(&func)?.operations)
}

#[test]
fn test_call_of_import_lowers_to_single_call() {
    let module = lower_json(&program(SUM, "")).unwrap();
    let sum = module.function("sum").unwrap();

    assert_eq!(sum.parameters, vec![ValueType::I32, ValueType::I32]);
    assert_eq!(sum.locals, vec![ValueType::I32]);
    assert_eq!(sum.slot_names, vec!["a", "b", "r"]);
    assert!(!sum.has_loop());

    insta::assert_snapshot!(sum.to_string(), @r"
    fn sum($0: i32, $1: i32) -> i32 {
      local $2: i32 (r)
      $2 = call add($0, $1)
      return $2
    }
    ");
}

#[test]
fn test_operations_are_inits_then_calls_then_return() {
    let func = function(
        "f",
        &["p"],
        vec![
            local("x", Some(Operand::int(ValueType::I32, 1))),
            local("y", None),
            local("z", Some(Operand::identifier("p"))),
        ],
        vec![
            CallStatement::new("y", "add", vec![Operand::identifier("x"), Operand::identifier("p")]),
            CallStatement::new("z", "add", vec![Operand::identifier("y"), Operand::identifier("y")]),
        ],
    );
    let ops = lower_one(func).unwrap();

    let shape: Vec<&str> = ops
        .iter()
        .map(|op| match op {
            Operation::Init { .. } => "init",
            Operation::Call { .. } => "call",
            Operation::Return { .. } => "return",
        })
        .collect();
    assert_eq!(shape, vec!["init", "init", "call", "call", "return"]);

    // The initializers keep declaration order; y has none.
    let init_slots: Vec<u32> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::Init { slot, .. } => Some(slot.index),
            _ => None,
        })
        .collect();
    assert_eq!(init_slots, vec![1, 3]);

    assert!(matches!(ops.last(), Some(Operation::Return { slot }) if slot.index == 3));
}

#[test]
fn test_slots_follow_declaration_order_not_names() {
    let func = function(
        "scrambled",
        &["zeta", "alpha", "mid"],
        vec![local("omega", None), local("beta", None)],
        vec![CallStatement::new(
            "beta",
            "add",
            vec![Operand::identifier("zeta"), Operand::identifier("alpha")],
        )],
    );
    let mut lowering = AstLowering::new();
    let imports = vec![kiss_ast::FunctionImport::new(
        "add",
        "js",
        "add",
        vec![ValueType::I32, ValueType::I32],
        ValueType::I32,
    )];
    lowering
        .assemble(&imports, std::slice::from_ref(&func), &[])
        .unwrap();
    let lowered = lowering.lower_function_body(&func).unwrap();

    let symbols = &lowered.symbols;
    for (index, name) in ["zeta", "alpha", "mid"].iter().enumerate() {
        let slot = symbols.lookup(name).unwrap();
        assert_eq!(slot.index, index as u32);
        assert_eq!(slot.origin, SlotOrigin::Parameter);
    }
    assert_eq!(symbols.lookup("omega").unwrap().index, 3);
    assert_eq!(symbols.lookup("beta").unwrap().index, 4);
    assert_eq!(lowered.return_slot.index, 4);
    assert!(lowered.loop_guard.is_none());
}

#[test]
fn test_missing_return() {
    let func = function("empty", &[], vec![local("x", None)], vec![]);
    let err = lower_one(func).unwrap_err();
    assert!(matches!(err, Error::MissingReturn { ref function, .. } if function == "empty"));
    assert_eq!(err.to_string(), "Function 'empty' has no output variable");
}

#[test]
fn test_duplicate_local() {
    let func = function(
        "dup",
        &[],
        vec![local("x", None), local("x", None)],
        vec![CallStatement::new("x", "add", vec![Operand::int(ValueType::I32, 1), Operand::int(ValueType::I32, 2)])],
    );
    assert!(matches!(
        lower_one(func),
        Err(Error::DuplicateDeclaration { ref name, .. }) if name == "x"
    ));
}

#[test]
fn test_unbound_identifiers() {
    let in_argument = function(
        "f",
        &[],
        vec![local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("q"), Operand::identifier("q")])],
    );
    assert!(matches!(lower_one(in_argument), Err(Error::UnboundIdentifier { ref name, .. }) if name == "q"));

    let as_target = function(
        "g",
        &["a"],
        vec![],
        vec![CallStatement::new("out", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(as_target), Err(Error::UnboundIdentifier { ref name, .. }) if name == "out"));

    let in_initializer = function("h", &[], vec![local("x", Some(Operand::identifier("nope")))], vec![]);
    assert!(matches!(lower_one(in_initializer), Err(Error::UnboundIdentifier { .. })));
}

#[test]
fn test_parameters_cannot_receive_call_results() {
    let func = function(
        "f",
        &["a"],
        vec![],
        vec![CallStatement::new("a", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    assert!(matches!(
        lower_one(func),
        Err(Error::UnboundIdentifier { ref name, .. }) if name == "a"
    ));

    // Parameters stay readable as arguments and initializers.
    let copied = function(
        "g",
        &["a"],
        vec![local("r", Some(Operand::identifier("a")))],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("r"), Operand::identifier("a")])],
    );
    assert!(lower_one(copied).is_ok());
}

#[test]
fn test_call_signature_checks() {
    let unknown = function(
        "f",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "mul", vec![Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(unknown), Err(Error::UnknownFunction { ref name, .. }) if name == "mul"));

    let arity = function(
        "f",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a")])],
    );
    assert!(matches!(
        lower_one(arity),
        Err(Error::ArityMismatch { expected: 2, found: 1, .. })
    ));

    let argument_type = function(
        "f",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new(
            "r",
            "add",
            vec![Operand::identifier("a"), Operand::float(1.0)],
        )],
    );
    assert!(matches!(
        lower_one(argument_type),
        Err(Error::TypeMismatch { expected: ValueType::I32, found: ValueType::F64, .. })
    ));

    let mut result_type = function(
        "f",
        &["a"],
        vec![VariableDeclaration::new("wide", ValueType::I64, None)],
        vec![CallStatement::new("wide", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    result_type.return_type = ValueType::I64;
    assert!(matches!(
        lower_one(result_type),
        Err(Error::TypeMismatch { expected: ValueType::I64, found: ValueType::I32, .. })
    ));
}

#[test]
fn test_void_arguments_are_dropped() {
    let source = program(
        r#"{
            "type": "FunctionDeclaration",
            "id": { "type": "Identifier", "name": "ping" },
            "params": [],
            "returnType": "i32",
            "body": {
                "type": "FunctionBody",
                "variables": [ { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "r" }, "variableType": "i32", "iniValue": { "type": "i32", "value": 4 } } ],
                "calls": [ { "type": "CallStatement", "variable": { "type": "Identifier", "name": "r" }, "fn": { "type": "Identifier", "name": "inc" },
                             "params": [ { "type": "Void" }, { "type": "Identifier", "name": "r" } ] } ]
            }
        }"#,
        "",
    );
    let module = lower_json(&source).unwrap();
    let ping = module.function("ping").unwrap();
    let IrExpression::LocalSet { value, .. } = &ping.body[1] else {
        panic!("expected call, got {}", ping.body[1]);
    };
    assert!(matches!(&**value, IrExpression::Call { arguments, .. } if arguments.len() == 1));
}

#[test]
fn test_return_type_must_match() {
    let mut func = function(
        "f",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    func.return_type = ValueType::F64;
    assert!(matches!(lower_one(func), Err(Error::TypeMismatch { .. })));
}

#[test]
fn test_void_local_is_malformed() {
    let mut func = function(
        "f",
        &["a"],
        vec![
            VariableDeclaration::new("nothing", ValueType::Void, None),
            local("r", None),
        ],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(func.clone()), Err(Error::MalformedNode { .. })));

    func.body.variables.retain(|v| v.id.name != "nothing");
    assert!(lower_one(func.clone()).is_ok());
    func.params.push(Param::new("v", ValueType::Void));
    assert!(matches!(lower_one(func), Err(Error::MalformedNode { .. })));
}

#[test]
fn test_literal_initializers_carry_their_tag() {
    let func = function(
        "f",
        &["a"],
        vec![
            VariableDeclaration::new("big", ValueType::I64, Some(Operand::int(ValueType::I64, 1 << 40))),
            local("r", None),
        ],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    let ops = lower_one(func).unwrap();
    assert!(matches!(
        ops[0],
        Operation::Init { value: Value::Constant(kiss_ir::Constant::I64(v)), .. } if v == 1 << 40
    ));

    let mismatched = function(
        "g",
        &["a"],
        vec![local("x", Some(Operand::int(ValueType::I64, 1))), local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(mismatched), Err(Error::TypeMismatch { .. })));
}

#[test]
fn test_module_layout() {
    let module = lower_json(&program(SUM, "")).unwrap();

    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["store_i32", "store_f64", "load_i32", "load_f64", "sum"]);
    assert_eq!(module.function("load_f64").unwrap().kind, FunctionKind::Builtin);
    assert_eq!(module.user_functions().count(), 1);

    assert_eq!(module.function_index("add"), Some(0));
    assert_eq!(module.function_index("store_i32"), Some(3));
    assert_eq!(module.function_index("sum"), Some(7));

    assert_eq!(module.memory, Memory::default());
}

#[test]
fn test_forward_calls_between_user_functions() {
    let caller = function(
        "caller",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "callee", vec![Operand::identifier("a")])],
    );
    let callee = function(
        "callee",
        &["x"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("x"), Operand::identifier("x")])],
    );
    let imports = vec![kiss_ast::FunctionImport::new(
        "add",
        "js",
        "add",
        vec![ValueType::I32, ValueType::I32],
        ValueType::I32,
    )];
    let module = kiss_ir::lower(&Root::new(imports, vec![caller, callee], vec![])).unwrap();
    assert!(module.function("caller").is_some());
}

#[test]
fn test_user_function_may_not_shadow_builtin_or_import() {
    let builtin = function(
        "load_i32",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "add", vec![Operand::identifier("a"), Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(builtin), Err(Error::DuplicateDeclaration { .. })));

    let import = function(
        "add",
        &["a"],
        vec![local("r", None)],
        vec![CallStatement::new("r", "inc", vec![Operand::identifier("a")])],
    );
    assert!(matches!(lower_one(import), Err(Error::DuplicateDeclaration { .. })));
}

#[test]
fn test_builtins_are_callable() {
    let source = program(
        r#"{
            "type": "FunctionDeclaration",
            "id": { "type": "Identifier", "name": "poke" },
            "params": [ { "type": "Param", "id": { "type": "Identifier", "name": "v" }, "paramType": "f64" } ],
            "returnType": "f64",
            "body": {
                "type": "FunctionBody",
                "variables": [ { "type": "VariableDeclaration", "id": { "type": "Identifier", "name": "out" }, "variableType": "f64" } ],
                "calls": [
                    { "type": "CallStatement", "variable": { "type": "Identifier", "name": "out" }, "fn": { "type": "Identifier", "name": "store_f64" },
                      "params": [ { "type": "i32", "value": 16 }, { "type": "Identifier", "name": "v" } ] },
                    { "type": "CallStatement", "variable": { "type": "Identifier", "name": "out" }, "fn": { "type": "Identifier", "name": "load_f64" },
                      "params": [ { "type": "i32", "value": 16 } ] }
                ]
            }
        }"#,
        "",
    );
    assert!(should_pass(&source));
}

#[test]
fn test_duplicate_exports_are_allowed() {
    let exports = r#"
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "sum" }, "name": "sum" },
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "sum" }, "name": "total" }
    "#;
    let module = lower_json(&program(SUM, exports)).unwrap();
    let exported: Vec<(&str, &str)> = module
        .exports
        .iter()
        .map(|e| (e.function.as_str(), e.name.as_str()))
        .collect();
    assert_eq!(exported, vec![("sum", "sum"), ("sum", "total")]);
}

#[test]
fn test_exports_may_name_imports_and_builtins() {
    let exports = r#"
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "add" }, "name": "plus" },
        { "type": "FunctionExport", "id": { "type": "Identifier", "name": "load_i32" }, "name": "peek" }
    "#;
    assert!(should_pass(&program(SUM, exports)));
}

#[test]
fn test_unknown_export() {
    let exports = r#"{ "type": "FunctionExport", "id": { "type": "Identifier", "name": "nope" }, "name": "x" }"#;
    assert!(matches!(
        lower_json(&program(SUM, exports)),
        Err(Error::UnknownExport { ref name, .. }) if name == "nope"
    ));
}

#[test]
fn test_wrong_node_kind() {
    let source = program(&SUM.replace("\"FunctionDeclaration\"", "\"FunctionImport\""), "");
    assert!(matches!(lower_json(&source), Err(Error::MalformedNode { .. })));
    assert!(should_fail(r#"{ "type": "Program", "functions": [] }"#));
}

#[test]
fn test_custom_memory() {
    let mut lowering = AstLowering::with_memory(Memory::with_limits(2, 8, "heap"));
    let module = lowering.lower_program(&Root::new(vec![], vec![], vec![])).unwrap();
    assert_eq!(module.memory.initial_pages, 2);
    assert_eq!(module.memory.maximum_pages, 8);
    assert_eq!(module.memory.export_name, "heap");
    assert_eq!(module.functions.len(), 4);
}
