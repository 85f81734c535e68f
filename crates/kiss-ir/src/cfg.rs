//! Control-flow graph of a function body with a conditional loop.
//!
//! The graph is built in one fixed shape: a guarded post-test loop.
//!
//! ```text
//!         +-------------+  if s == 0
//!         | A prologue  |-------------+
//!         +-------------+             |
//!                | always             |
//!         +-------------+             |
//!    +--->| B loop head |             |
//!    |    +-------------+             |
//!    |           | always             v
//!    |    +-------------+  if s == 0 +-------------+
//!    +----| C loop body |----------->| D epilogue  |
//!  always +-------------+            +-------------+
//! ```
//!
//! [`ControlFlowGraph::render`] turns a verified graph back into nested
//! `block`/`loop`/`br_if` expressions; nothing ever needs a goto.

use kiss_core::{Error, Result};
use kiss_semantic::Slot;
use std::collections::HashSet;
use std::fmt;

use crate::{BranchTest, IrExpression, Operation};

/// Label of the block that wraps everything up to the epilogue.
pub const EXIT_LABEL: &str = "exit";

/// Label of the loop rendered at the loop header.
pub const LOOP_LABEL: &str = "repeat";

/// Index of a block in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Straight-line run of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: &'static str,
    pub operations: Vec<Operation>,
}

/// When an edge is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Unconditional,
    /// Taken when the slot holds zero
    IfZero(Slot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub kind: EdgeKind,
}

/// Blocks joined by edges, with one entry and one exit.
///
/// Each block's conditional edges are tried in insertion order before its
/// single unconditional edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFlowGraph {
    blocks: Vec<BasicBlock>,
    edges: Vec<Edge>,
    entry: BlockId,
    exit: BlockId,
}

impl ControlFlowGraph {
    /// Builds the four-block loop graph.
    ///
    /// `inits` run once, `calls` repeat while `sentinel` is nonzero, and
    /// `ret` ends the function. A zero sentinel on entry skips the calls.
    #[must_use]
    pub fn sentinel_loop(
        inits: Vec<Operation>,
        calls: Vec<Operation>,
        ret: Operation,
        sentinel: Slot,
    ) -> Self {
        let mut graph = Self {
            blocks: Vec::with_capacity(4),
            edges: Vec::with_capacity(5),
            entry: BlockId(0),
            exit: BlockId(3),
        };

        let a = graph.add_block("prologue", inits);
        let b = graph.add_block("loop-entry", Vec::new());
        let c = graph.add_block("loop-body", calls);
        let d = graph.add_block("epilogue", vec![ret]);

        graph.add_edge(a, d, EdgeKind::IfZero(sentinel));
        graph.add_edge(a, b, EdgeKind::Unconditional);
        graph.add_edge(b, c, EdgeKind::Unconditional);
        graph.add_edge(c, d, EdgeKind::IfZero(sentinel));
        graph.add_edge(c, b, EdgeKind::Unconditional);

        graph.entry = a;
        graph.exit = d;
        graph
    }

    fn add_block(&mut self, name: &'static str, operations: Vec<Operation>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            name,
            operations,
        });
        id
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        self.edges.push(Edge { from, to, kind });
    }

    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    #[must_use]
    pub const fn exit(&self) -> BlockId {
        self.exit
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    /// Edges leaving `id`, in evaluation order.
    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.from == id)
    }

    fn fallthrough(&self, id: BlockId) -> Option<BlockId> {
        self.successors(id)
            .find(|edge| edge.kind == EdgeKind::Unconditional)
            .map(|edge| edge.to)
    }

    /// Edges that jump back to a block already on the depth-first path.
    #[must_use]
    pub fn back_edges(&self) -> Vec<Edge> {
        let mut back = Vec::new();
        let mut visited = HashSet::new();
        let mut on_path = Vec::new();
        self.find_back_edges(self.entry, &mut visited, &mut on_path, &mut back);
        back
    }

    fn find_back_edges(
        &self,
        id: BlockId,
        visited: &mut HashSet<BlockId>,
        on_path: &mut Vec<BlockId>,
        back: &mut Vec<Edge>,
    ) {
        visited.insert(id);
        on_path.push(id);
        for edge in self.successors(id) {
            if on_path.contains(&edge.to) {
                back.push(*edge);
            } else if !visited.contains(&edge.to) {
                self.find_back_edges(edge.to, visited, on_path, back);
            }
        }
        on_path.pop();
    }

    /// Loop header, if the graph has a loop.
    #[must_use]
    pub fn loop_header(&self) -> Option<BlockId> {
        self.back_edges().first().map(|edge| edge.to)
    }

    /// Returns true if every path from the entry to `id` passes through `dominator`.
    #[must_use]
    pub fn dominates(&self, dominator: BlockId, id: BlockId) -> bool {
        if dominator == id {
            return true;
        }
        // Search from the entry with `dominator` removed; `id` must become unreachable.
        let mut seen = HashSet::from([dominator]);
        let mut stack = vec![self.entry];
        while let Some(current) = stack.pop() {
            if current == id {
                return false;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(self.successors(current).map(|edge| edge.to));
        }
        true
    }

    /// Checks the structural invariants rendering relies on.
    ///
    /// # Errors
    /// Returns `IrreducibleControlFlow` describing the first violation.
    pub fn verify(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::IrreducibleControlFlow(message));

        if self.block(self.entry).is_none() || self.block(self.exit).is_none() {
            return invalid("entry or exit block is missing".to_string());
        }
        if let Some(edge) = self
            .edges
            .iter()
            .find(|edge| self.block(edge.from).is_none() || self.block(edge.to).is_none())
        {
            return invalid(format!("edge {} -> {} leaves the graph", edge.from, edge.to));
        }

        for block in &self.blocks {
            let returns = block.operations.iter().filter(|op| op.is_return()).count();
            if block.id == self.exit {
                if returns != 1 || !block.operations.last().is_some_and(Operation::is_return) {
                    return invalid(format!("exit block {} must end in its only return", block.id));
                }
                if self.successors(block.id).next().is_some() {
                    return invalid(format!("exit block {} has successors", block.id));
                }
            } else {
                if returns != 0 {
                    return invalid(format!("block {} returns before the exit", block.id));
                }
                let unconditional = self
                    .successors(block.id)
                    .filter(|edge| edge.kind == EdgeKind::Unconditional)
                    .count();
                if unconditional != 1 {
                    return invalid(format!(
                        "block {} has {unconditional} unconditional successors",
                        block.id
                    ));
                }
            }
        }

        let reachable = self.reachable_from_entry();
        if let Some(block) = self.blocks.iter().find(|b| !reachable.contains(&b.id)) {
            return invalid(format!("block {} is unreachable", block.id));
        }
        let reaching_exit = self.reaching_exit();
        if let Some(block) = self.blocks.iter().find(|b| !reaching_exit.contains(&b.id)) {
            return invalid(format!("block {} never reaches the exit", block.id));
        }

        let back = self.back_edges();
        let headers: HashSet<BlockId> = back.iter().map(|edge| edge.to).collect();
        if headers.len() > 1 {
            return invalid(format!("{} loop headers, at most one allowed", headers.len()));
        }
        for edge in &back {
            if edge.kind != EdgeKind::Unconditional {
                return invalid(format!("conditional back edge {} -> {}", edge.from, edge.to));
            }
            if !self.dominates(edge.to, edge.from) {
                return invalid(format!(
                    "loop header {} does not dominate {}",
                    edge.to, edge.from
                ));
            }
            let leaves = self
                .successors(edge.from)
                .any(|e| e.to == self.exit && e.kind != EdgeKind::Unconditional);
            if !leaves {
                return invalid(format!("loop latch {} never leaves the loop", edge.from));
            }
        }

        // Forward conditional edges may only skip ahead to the exit.
        for edge in &self.edges {
            if matches!(edge.kind, EdgeKind::IfZero(_)) && edge.to != self.exit {
                return invalid(format!(
                    "conditional edge {} -> {} does not target the exit",
                    edge.from, edge.to
                ));
            }
        }

        Ok(())
    }

    fn reachable_from_entry(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(self.successors(id).map(|edge| edge.to));
            }
        }
        seen
    }

    fn reaching_exit(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.exit];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend(
                    self.edges
                        .iter()
                        .filter(|edge| edge.to == id)
                        .map(|edge| edge.from),
                );
            }
        }
        seen
    }

    /// Renders the graph as structured expressions.
    ///
    /// Blocks are laid out along their unconditional successors. Everything
    /// before the exit is wrapped in a `block` that conditional exits branch
    /// out of; the loop header opens a `loop` that the latch branches back to
    /// while the sentinel is nonzero.
    ///
    /// # Errors
    /// Returns `IrreducibleControlFlow` if the graph fails [`Self::verify`].
    pub fn render(&self) -> Result<Vec<IrExpression>> {
        self.verify()?;

        let header = self.loop_header();
        let latch = self.back_edges().first().map(|edge| edge.from);

        let mut outer = Vec::new();
        let mut in_loop: Option<Vec<IrExpression>> = None;
        let mut exits_used = false;
        let mut current = self.entry;

        while current != self.exit {
            if Some(current) == header && in_loop.is_none() {
                in_loop = Some(Vec::new());
            }
            let body = in_loop.as_mut().unwrap_or(&mut outer);

            let block = &self.blocks[current.0];
            body.extend(block.operations.iter().map(Operation::to_expression));

            let conditions: Vec<Slot> = self
                .successors(current)
                .filter_map(|edge| match edge.kind {
                    EdgeKind::IfZero(slot) => Some(slot),
                    EdgeKind::Unconditional => None,
                })
                .collect();

            if Some(current) == latch {
                // Leave the loop when the sentinel is zero, otherwise go round again.
                let Some(slot) = conditions.first() else {
                    return Err(Error::IrreducibleControlFlow(format!(
                        "loop latch {current} has no exit condition"
                    )));
                };
                body.push(IrExpression::branch_on(LOOP_LABEL, slot, BranchTest::NonZero));
                if let Some(loop_body) = in_loop.take() {
                    outer.push(IrExpression::Loop {
                        label: LOOP_LABEL.to_string(),
                        body: loop_body,
                    });
                }
                current = self.exit;
                continue;
            }

            for slot in &conditions {
                body.push(IrExpression::branch_on(EXIT_LABEL, slot, BranchTest::Zero));
                exits_used = true;
            }

            current = self.fallthrough(current).ok_or_else(|| {
                Error::IrreducibleControlFlow(format!("block {current} has no fallthrough"))
            })?;
        }

        let mut rendered = if exits_used {
            vec![IrExpression::Block {
                label: EXIT_LABEL.to_string(),
                body: outer,
            }]
        } else {
            outer
        };
        rendered.extend(
            self.blocks[self.exit.0]
                .operations
                .iter()
                .map(Operation::to_expression),
        );
        Ok(rendered)
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            let marker = if block.id == self.entry {
                " (entry)"
            } else if block.id == self.exit {
                " (exit)"
            } else {
                ""
            };
            writeln!(f, "{} {}{marker}:", block.id, block.name)?;
            for op in &block.operations {
                writeln!(f, "    {op}")?;
            }
            for edge in self.successors(block.id) {
                match edge.kind {
                    EdgeKind::Unconditional => writeln!(f, "    -> {}", edge.to)?,
                    EdgeKind::IfZero(slot) => {
                        writeln!(f, "    -> {} if ${} == 0", edge.to, slot.index)?;
                    }
                }
            }
        }
        Ok(())
    }
}
