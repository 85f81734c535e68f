//! Control-flow reconstruction for lowered function bodies.

use kiss_core::{Error, Result};
use kiss_semantic::Slot;

use crate::{ControlFlowGraph, IrExpression, Operation};

/// Turns an operation list into a structured body.
///
/// Without a guard the body is the operations in order. With a guard the
/// operations are split into the four-block loop graph, which is verified
/// and rendered; the graph is returned alongside the body.
///
/// # Errors
/// `IrreducibleControlFlow` if the list does not end in its only return or
/// the graph fails verification.
pub fn reconstruct(
    operations: Vec<Operation>,
    guard: Option<Slot>,
) -> Result<(Vec<IrExpression>, Option<ControlFlowGraph>)> {
    let Some(sentinel) = guard else {
        let body = operations.iter().map(Operation::to_expression).collect();
        return Ok((body, None));
    };

    let mut inits = Vec::new();
    let mut calls = Vec::new();
    let mut ret = None;
    for op in operations {
        match op {
            Operation::Init { .. } => inits.push(op),
            Operation::Call { .. } => calls.push(op),
            Operation::Return { .. } if ret.is_none() => ret = Some(op),
            Operation::Return { .. } => {
                return Err(Error::IrreducibleControlFlow(
                    "more than one return in a looping body".to_string(),
                ));
            }
        }
    }
    let ret = ret.ok_or_else(|| {
        Error::IrreducibleControlFlow("looping body has no return".to_string())
    })?;

    tracing::debug!(
        inits = inits.len(),
        calls = calls.len(),
        guard = %sentinel,
        "reconstructing loop"
    );
    let graph = ControlFlowGraph::sentinel_loop(inits, calls, ret, sentinel);
    let body = graph.render()?;
    Ok((body, Some(graph)))
}
