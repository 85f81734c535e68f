//! Statement lowering: declarations, initializers and call statements.

use kiss_ast::{CallStatement, FunctionDeclaration, Node, SENTINEL_NAME, VariableDeclaration};
use kiss_core::{Error, Result, ValueType};
use kiss_semantic::{Slot, SlotOrigin, SymbolTable};

use super::core::{AstLowering, require_storable};
use super::expressions::{lower_initializer, lower_operand};
use crate::Operation;

/// A function body as an ordered operation list.
#[derive(Debug)]
pub struct LoweredBody {
    /// Inits in declaration order, then calls in source order, then one return
    pub operations: Vec<Operation>,
    pub symbols: SymbolTable,
    /// Target of the last call
    pub return_slot: Slot,
    /// i32 slot that guards the calls as a loop, if the body loops
    pub loop_guard: Option<Slot>,
}

impl AstLowering {
    /// Lowers the body of `function` against the functions registered so far.
    ///
    /// Parameters take slots `0..P` and locals `P..P+L`. When the legacy
    /// sentinel local is the loop guard it is declared after every other
    /// local, whatever its position in the source.
    ///
    /// # Errors
    /// Any declaration, resolution or type error in the body, and
    /// `MissingReturn` when it contains no call statement.
    pub fn lower_function_body(&self, function: &FunctionDeclaration) -> Result<LoweredBody> {
        let body = &function.body;
        body.expect_kind()?;

        let mut symbols = SymbolTable::new();
        for param in &function.params {
            param.expect_kind()?;
            let span = param.id.span();
            let value_type = require_storable(param.param_type, "parameter", span)?;
            symbols.declare_parameter(&param.id.name, value_type, span)?;
        }

        let legacy_loop = body.conditional_loop.is_none()
            && body.variables.iter().any(|v| v.id.name == SENTINEL_NAME);

        let mut sentinel = None;
        for var in &body.variables {
            var.expect_kind()?;
            let span = var.id.span();
            let value_type = require_storable(var.variable_type, "local", span)?;
            if legacy_loop && var.id.name == SENTINEL_NAME && sentinel.is_none() {
                sentinel = Some(var);
                continue;
            }
            symbols.declare_local(&var.id.name, value_type, span)?;
        }
        if let Some(var) = sentinel {
            symbols.declare_sentinel(&var.id.name, var.variable_type, var.id.span())?;
        }

        let mut operations = Vec::new();
        for var in &body.variables {
            if let Some(init) = self.lower_declaration(var, &symbols)? {
                operations.push(init);
            }
        }

        let (calls, loop_guard) = match &body.conditional_loop {
            Some(conditional) => {
                conditional.expect_kind()?;
                if let Some(stray) = body.calls.first() {
                    return Err(Error::MalformedNode {
                        expected: "ConditionalLoop as the only statement list".to_string(),
                        found: stray.node_type.clone(),
                        span: stray.location,
                    });
                }
                let condition = &conditional.condition;
                let guard = symbols.resolve(&condition.name, condition.span())?;
                (
                    &conditional.body,
                    Some((condition.name.as_str(), guard, condition.span())),
                )
            }
            None => {
                let guard = symbols
                    .slots()
                    .find(|slot| slot.origin == SlotOrigin::Sentinel)
                    .map(|slot| (SENTINEL_NAME, slot, sentinel.and_then(|v| v.id.span())));
                (&body.calls, guard)
            }
        };

        if let Some((name, slot, span)) = loop_guard {
            if slot.value_type != ValueType::I32 {
                return Err(Error::InvalidSentinelType {
                    name: name.to_string(),
                    found: slot.value_type,
                    span,
                });
            }
        }

        for call in calls {
            operations.push(self.lower_call(call, &symbols)?);
        }

        let return_slot = operations
            .iter()
            .rev()
            .find_map(|op| match op {
                Operation::Call { target, .. } => Some(*target),
                _ => None,
            })
            .ok_or_else(|| Error::MissingReturn {
                function: function.name().to_string(),
                span: function.id.span(),
            })?;

        if return_slot.value_type != function.return_type {
            return Err(Error::TypeMismatch {
                context: format!("return value of '{}'", function.name()),
                expected: function.return_type,
                found: return_slot.value_type,
                span: function.id.span(),
            });
        }
        operations.push(Operation::Return { slot: return_slot });

        Ok(LoweredBody {
            operations,
            symbols,
            return_slot,
            loop_guard: loop_guard.map(|(_, slot, _)| slot),
        })
    }

    fn lower_declaration(
        &self,
        var: &VariableDeclaration,
        symbols: &SymbolTable,
    ) -> Result<Option<Operation>> {
        let Some(initializer) = &var.ini_value else {
            return Ok(None);
        };
        let slot = symbols.resolve(&var.id.name, var.id.span())?;
        let value = lower_initializer(&var.id.name, slot, initializer, symbols)?;
        let init = Operation::Init { slot, value };
        tracing::trace!(%init, "lowered initializer");
        Ok(Some(init))
    }

    /// Lowers `variable = fn(params...)`, checking it against the callee's signature.
    pub(crate) fn lower_call(
        &self,
        call: &CallStatement,
        symbols: &SymbolTable,
    ) -> Result<Operation> {
        call.expect_kind()?;

        let mut arguments = Vec::with_capacity(call.params.len());
        for operand in &call.params {
            if let Some(value) = lower_operand(operand, symbols)? {
                arguments.push((value, operand.span()));
            }
        }
        let target = resolve_target(call, symbols)?;

        let callee = call.callee.name.as_str();
        let signature = self.lookup_function(callee, call.callee.span())?;
        if signature.parameters.len() != arguments.len() {
            return Err(Error::ArityMismatch {
                function: callee.to_string(),
                expected: signature.parameters.len(),
                found: arguments.len(),
                span: call.location.or(call.callee.span()),
            });
        }
        for (position, ((value, span), expected)) in
            arguments.iter().zip(&signature.parameters).enumerate()
        {
            if value.value_type() != *expected {
                return Err(Error::TypeMismatch {
                    context: format!("argument {} of call to '{callee}'", position + 1),
                    expected: *expected,
                    found: value.value_type(),
                    span: *span,
                });
            }
        }
        if signature.result != target.value_type {
            return Err(Error::TypeMismatch {
                context: format!("result of '{callee}' assigned to '{}'", call.variable.name),
                expected: target.value_type,
                found: signature.result,
                span: call.variable.span(),
            });
        }

        let op = Operation::Call {
            target,
            function: callee.to_string(),
            arguments: arguments.into_iter().map(|(value, _)| value).collect(),
            result_type: target.value_type,
        };
        tracing::trace!(%op, "lowered call");
        Ok(op)
    }
}

/// The local a call assigns to. Parameters are read-only and never a target.
fn resolve_target(call: &CallStatement, symbols: &SymbolTable) -> Result<Slot> {
    let span = call.variable.span();
    let target = symbols.resolve(&call.variable.name, span)?;
    if target.origin == SlotOrigin::Parameter {
        return Err(Error::UnboundIdentifier {
            name: call.variable.name.clone(),
            span,
        });
    }
    Ok(target)
}
