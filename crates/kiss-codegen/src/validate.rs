//! Module-level checks shared by every backend.

use std::collections::HashSet;

use kiss_core::{Error, Result, ValueType};
use kiss_ir::{IrExpression, IrFunction, IrModule};

/// Pages addressable by a 32-bit memory.
const MAX_PAGES: u32 = 65536;

fn invalid(message: String) -> Error {
    Error::Backend(message)
}

/// Checks that `module` can be encoded.
///
/// Function and import names must be unique, export names must be distinct
/// and name existing functions, every call must match its callee, every
/// branch must target an enclosing label and every slot access must be in
/// range and well typed.
///
/// # Errors
/// Returns [`Error::Backend`] describing the first problem.
pub fn validate(module: &IrModule) -> Result<()> {
    let mut callables = HashSet::new();
    for name in module
        .imports
        .iter()
        .map(|i| i.name.as_str())
        .chain(module.functions.iter().map(|f| f.name.as_str()))
    {
        if !callables.insert(name) {
            return Err(invalid(format!("function '{name}' is defined twice")));
        }
    }

    if module.memory.maximum_pages > MAX_PAGES {
        return Err(invalid(format!(
            "memory limit of {} pages exceeds {MAX_PAGES}",
            module.memory.maximum_pages
        )));
    }
    if module.memory.initial_pages > module.memory.maximum_pages {
        return Err(invalid(format!(
            "memory starts at {} pages but is limited to {}",
            module.memory.initial_pages, module.memory.maximum_pages
        )));
    }

    let mut export_names = HashSet::from([module.memory.export_name.as_str()]);
    for export in &module.exports {
        if !callables.contains(export.function.as_str()) {
            return Err(invalid(format!(
                "export '{}' refers to unknown function '{}'",
                export.name, export.function
            )));
        }
        if !export_names.insert(export.name.as_str()) {
            return Err(invalid(format!("export name '{}' is used twice", export.name)));
        }
    }

    for function in &module.functions {
        let mut checker = BodyChecker {
            module,
            function,
            labels: Vec::new(),
        };
        for expr in &function.body {
            checker.check(expr)?;
        }
    }
    Ok(())
}

struct BodyChecker<'a> {
    module: &'a IrModule,
    function: &'a IrFunction,
    labels: Vec<&'a str>,
}

impl<'a> BodyChecker<'a> {
    fn fail(&self, message: String) -> Error {
        invalid(format!("in function '{}': {message}", self.function.name))
    }

    fn check_slot(&self, index: u32, value_type: Option<ValueType>) -> Result<ValueType> {
        let declared = self
            .function
            .slot_type(index)
            .ok_or_else(|| self.fail(format!("slot ${index} does not exist")))?;
        if let Some(used) = value_type {
            if used != declared {
                return Err(self.fail(format!(
                    "slot ${index} is {declared} but is read as {used}"
                )));
            }
        }
        Ok(declared)
    }

    fn check(&mut self, expr: &'a IrExpression) -> Result<()> {
        match expr {
            IrExpression::Const(_) => {}
            IrExpression::LocalGet { index, value_type } => {
                self.check_slot(*index, Some(*value_type))?;
            }
            IrExpression::LocalSet { index, value } => {
                let declared = self.check_slot(*index, None)?;
                self.check(value)?;
                if value.value_type() != declared {
                    return Err(self.fail(format!(
                        "slot ${index} is {declared} but is assigned {}",
                        value.value_type()
                    )));
                }
            }
            IrExpression::Call {
                function,
                arguments,
                result_type,
            } => {
                let (parameters, result) = self
                    .module
                    .signature_of(function)
                    .ok_or_else(|| self.fail(format!("call to unknown function '{function}'")))?;
                let found: Vec<ValueType> = arguments.iter().map(IrExpression::value_type).collect();
                if found != parameters || result != *result_type {
                    return Err(self.fail(format!("call to '{function}' does not match its signature")));
                }
                for argument in arguments {
                    self.check(argument)?;
                }
            }
            IrExpression::Load {
                value_type,
                address,
            } => {
                self.check_address(address)?;
                self.check_storable(*value_type)?;
            }
            IrExpression::Store {
                value_type,
                address,
                value,
            } => {
                self.check_address(address)?;
                self.check_storable(*value_type)?;
                self.check(value)?;
                if value.value_type() != *value_type {
                    return Err(self.fail(format!(
                        "{value_type}.store of a {} value",
                        value.value_type()
                    )));
                }
            }
            IrExpression::Return { value } => {
                let found = value.as_ref().map_or(ValueType::Void, |v| v.value_type());
                if let Some(value) = value {
                    self.check(value)?;
                }
                if found != self.function.result {
                    return Err(self.fail(format!(
                        "returns {found}, declared {}",
                        self.function.result
                    )));
                }
            }
            IrExpression::Block { label, body } | IrExpression::Loop { label, body } => {
                self.labels.push(label);
                for inner in body {
                    self.check(inner)?;
                }
                self.labels.pop();
            }
            IrExpression::BranchIf {
                label, condition, ..
            } => {
                if !self.labels.contains(&label.as_str()) {
                    return Err(self.fail(format!("branch to '{label}' outside its block")));
                }
                self.check(condition)?;
                if condition.value_type() != ValueType::I32 {
                    return Err(self.fail(format!(
                        "branch condition is {}, expected i32",
                        condition.value_type()
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_address(&mut self, address: &'a IrExpression) -> Result<()> {
        self.check(address)?;
        if address.value_type() == ValueType::I32 {
            Ok(())
        } else {
            Err(self.fail(format!("memory address is {}", address.value_type())))
        }
    }

    fn check_storable(&self, value_type: ValueType) -> Result<()> {
        if matches!(value_type, ValueType::I32 | ValueType::F64) {
            Ok(())
        } else {
            Err(self.fail(format!("no memory access for {value_type}")))
        }
    }
}
