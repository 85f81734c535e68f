//! Abstract Syntax Tree (AST) definitions for kiss.
//!
//! The tree is produced by the external PEG parser as JSON. Every node keeps
//! its `type` tag verbatim; lowering checks it through [`Node::expect_kind`],
//! so a node of the wrong kind surfaces as a `MalformedNode` error instead of
//! a generic decoding failure.

use kiss_core::{Error, Result, Span, ValueType};
use serde::{Deserialize, Serialize};

/// Name of the legacy sentinel local that turns the calls of a function into
/// a conditional loop.
pub const SENTINEL_NAME: &str = "_breqz";

/// Common behaviour of tagged AST nodes.
pub trait Node {
    /// Tag the node must carry.
    const KIND: &'static str;

    /// Tag the node actually carries.
    fn node_type(&self) -> &str;

    /// Source location, when the parser recorded one.
    fn span(&self) -> Option<Span>;

    /// Fails with `MalformedNode` if the node's tag is not [`Node::KIND`].
    fn expect_kind(&self) -> Result<()> {
        if self.node_type() == Self::KIND {
            Ok(())
        } else {
            Err(Error::MalformedNode {
                expected: Self::KIND.to_string(),
                found: self.node_type().to_string(),
                span: self.span(),
            })
        }
    }
}

macro_rules! impl_node {
    ($ty:ty, $kind:literal) => {
        impl Node for $ty {
            const KIND: &'static str = $kind;

            fn node_type(&self) -> &str {
                &self.node_type
            }

            fn span(&self) -> Option<Span> {
                self.location
            }
        }
    };
}

/// A complete kiss compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub fn_imports: Vec<FunctionImport>,
    #[serde(default)]
    pub functions: Vec<FunctionDeclaration>,
    #[serde(default)]
    pub fn_exports: Vec<FunctionExport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl Root {
    #[must_use]
    pub fn new(
        fn_imports: Vec<FunctionImport>,
        functions: Vec<FunctionDeclaration>,
        fn_exports: Vec<FunctionExport>,
    ) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            fn_imports,
            functions,
            fn_exports,
            location: None,
        }
    }
}

impl_node!(Root, "Root");

/// An identifier reference or declaration name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl Identifier {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            name: name.into(),
            location: None,
        }
    }

    /// Attaches a source span.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.location = Some(span);
        self
    }
}

impl_node!(Identifier, "Identifier");

/// A function provided by the host: `import module.base as id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionImport {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: Identifier,
    pub module: String,
    pub base: String,
    #[serde(default)]
    pub param_types: Vec<ValueType>,
    pub return_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl FunctionImport {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        module: impl Into<String>,
        base: impl Into<String>,
        param_types: Vec<ValueType>,
        return_type: ValueType,
    ) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            id: Identifier::new(id),
            module: module.into(),
            base: base.into(),
            param_types,
            return_type,
            location: None,
        }
    }
}

impl_node!(FunctionImport, "FunctionImport");

/// Maps an internal function to an external name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExport {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: Identifier,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl FunctionExport {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            id: Identifier::new(id),
            name: name.into(),
            location: None,
        }
    }
}

impl_node!(FunctionExport, "FunctionExport");

/// Function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: Identifier,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_type: ValueType,
    pub body: FunctionBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl FunctionDeclaration {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: ValueType,
        body: FunctionBody,
    ) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            id: Identifier::new(name),
            params,
            return_type,
            body,
            location: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }
}

impl_node!(FunctionDeclaration, "FunctionDeclaration");

/// Function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: Identifier,
    pub param_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl Param {
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: ValueType) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            id: Identifier::new(name),
            param_type,
            location: None,
        }
    }
}

impl_node!(Param, "Param");

/// Function body: declarations first, then calls, optionally wrapped in a
/// conditional loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionBody {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[serde(default)]
    pub calls: Vec<CallStatement>,
    #[serde(rename = "loop", default, skip_serializing_if = "Option::is_none")]
    pub conditional_loop: Option<ConditionalLoop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl FunctionBody {
    #[must_use]
    pub fn new(variables: Vec<VariableDeclaration>, calls: Vec<CallStatement>) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            variables,
            calls,
            conditional_loop: None,
            location: None,
        }
    }

    /// Builds a body whose calls repeat while `condition` is nonzero.
    #[must_use]
    pub fn looping(variables: Vec<VariableDeclaration>, conditional_loop: ConditionalLoop) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            variables,
            calls: Vec::new(),
            conditional_loop: Some(conditional_loop),
            location: None,
        }
    }
}

impl_node!(FunctionBody, "FunctionBody");

/// Local variable declaration with an optional initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclaration {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: Identifier,
    pub variable_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ini_value: Option<Operand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl VariableDeclaration {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        variable_type: ValueType,
        ini_value: Option<Operand>,
    ) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            id: Identifier::new(name),
            variable_type,
            ini_value,
            location: None,
        }
    }
}

impl_node!(VariableDeclaration, "VariableDeclaration");

/// `variable = fn(params...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStatement {
    #[serde(rename = "type")]
    pub node_type: String,
    pub variable: Identifier,
    #[serde(rename = "fn")]
    pub callee: Identifier,
    #[serde(default)]
    pub params: Vec<Operand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl CallStatement {
    #[must_use]
    pub fn new(variable: impl Into<String>, callee: impl Into<String>, params: Vec<Operand>) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            variable: Identifier::new(variable),
            callee: Identifier::new(callee),
            params,
            location: None,
        }
    }
}

impl_node!(CallStatement, "CallStatement");

/// Repeats `body` while `condition` is nonzero; skipped entirely when the
/// condition is zero on entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalLoop {
    #[serde(rename = "type")]
    pub node_type: String,
    pub condition: Identifier,
    #[serde(default)]
    pub body: Vec<CallStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl ConditionalLoop {
    #[must_use]
    pub fn new(condition: impl Into<String>, body: Vec<CallStatement>) -> Self {
        Self {
            node_type: Self::KIND.to_string(),
            condition: Identifier::new(condition),
            body,
            location: None,
        }
    }
}

impl_node!(ConditionalLoop, "ConditionalLoop");

/// Literal payload of an operand node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Float(f64),
}

/// A call argument or initializer as the parser emits it.
///
/// The parser uses one node shape for every operand kind and discriminates
/// with the `type` tag; [`Operand::kind`] validates and classifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

/// Validated view of an [`Operand`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperandKind<'a> {
    Reference(&'a str),
    IntConst { value: i64, value_type: ValueType },
    FloatConst(f64),
    Void,
}

impl Operand {
    fn bare(node_type: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            name: None,
            value: None,
            location: None,
        }
    }

    #[must_use]
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::bare("Identifier")
        }
    }

    /// Integer literal; `value_type` is `I32` or `I64`.
    #[must_use]
    pub fn int(value_type: ValueType, value: i64) -> Self {
        Self {
            value: Some(Literal::Int(value)),
            ..Self::bare(value_type.name())
        }
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self {
            value: Some(Literal::Float(value)),
            ..Self::bare("f64")
        }
    }

    #[must_use]
    pub fn void() -> Self {
        Self::bare("Void")
    }

    #[must_use]
    pub fn span(&self) -> Option<Span> {
        self.location
    }

    /// Classifies the operand by its tag, checking that the payload fits.
    ///
    /// # Errors
    /// Returns `MalformedNode` for an unknown tag or a missing payload.
    pub fn kind(&self) -> Result<OperandKind<'_>> {
        let malformed = |expected: &str| Error::MalformedNode {
            expected: expected.to_string(),
            found: self.node_type.clone(),
            span: self.location,
        };

        match self.node_type.as_str() {
            "Identifier" => self
                .name
                .as_deref()
                .map(OperandKind::Reference)
                .ok_or_else(|| malformed("Identifier with a name")),
            "i32" | "i64" => match self.value {
                Some(Literal::Int(value)) => Ok(OperandKind::IntConst {
                    value,
                    value_type: if self.node_type == "i32" {
                        ValueType::I32
                    } else {
                        ValueType::I64
                    },
                }),
                _ => Err(malformed("integer literal")),
            },
            "f64" => match self.value {
                Some(Literal::Float(value)) => Ok(OperandKind::FloatConst(value)),
                Some(Literal::Int(value)) => Ok(OperandKind::FloatConst(value as f64)),
                None => Err(malformed("float literal")),
            },
            "Void" => Ok(OperandKind::Void),
            _ => Err(malformed("Identifier, i32, i64, f64 or Void")),
        }
    }
}
