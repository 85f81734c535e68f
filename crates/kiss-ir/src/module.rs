//! IR module structure - the assembled unit handed to a backend.

use kiss_core::ValueType;
use kiss_semantic::FunctionKind;

use crate::{ControlFlowGraph, IrExpression};

/// Assembled module: imports, functions, exports and one linear memory.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    /// Host functions, in declaration order
    pub imports: Vec<IrImport>,
    /// Built-in helpers first, then user functions in source order
    pub functions: Vec<IrFunction>,
    pub exports: Vec<IrExport>,
    pub memory: Memory,
}

impl IrModule {
    /// Finds a defined function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Finds an import by its internal name.
    #[must_use]
    pub fn import(&self, name: &str) -> Option<&IrImport> {
        self.imports.iter().find(|i| i.name == name)
    }

    /// Index in the function index space: imports first, then defined functions.
    #[must_use]
    pub fn function_index(&self, name: &str) -> Option<u32> {
        if let Some(pos) = self.imports.iter().position(|i| i.name == name) {
            return Some(pos as u32);
        }
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|pos| (self.imports.len() + pos) as u32)
    }

    /// Parameter and result types of any callable name.
    #[must_use]
    pub fn signature_of(&self, name: &str) -> Option<(&[ValueType], ValueType)> {
        self.import(name)
            .map(|i| (i.parameters.as_slice(), i.result))
            .or_else(|| {
                self.function(name)
                    .map(|f| (f.parameters.as_slice(), f.result))
            })
    }

    /// User functions, without the built-in helpers.
    pub fn user_functions(&self) -> impl Iterator<Item = &IrFunction> {
        self.functions
            .iter()
            .filter(|f| f.kind == FunctionKind::User)
    }
}

/// A lowered function.
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    /// Parameter types; slot `i` holds parameter `i`
    pub parameters: Vec<ValueType>,
    /// Types of the remaining slots, starting at `parameters.len()`
    pub locals: Vec<ValueType>,
    pub result: ValueType,
    pub body: Vec<IrExpression>,
    /// Source name of every slot, indexed by slot index
    pub slot_names: Vec<String>,
    /// Loop graph the body was rendered from, if the body loops
    pub control_flow: Option<ControlFlowGraph>,
    pub kind: FunctionKind,
}

impl IrFunction {
    /// Total number of slots, parameters included.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.parameters.len() + self.locals.len()
    }

    /// Type of the slot at `index`.
    #[must_use]
    pub fn slot_type(&self, index: u32) -> Option<ValueType> {
        let index = index as usize;
        self.parameters
            .get(index)
            .or_else(|| self.locals.get(index.checked_sub(self.parameters.len())?))
            .copied()
    }

    #[must_use]
    pub fn slot_name(&self, index: u32) -> Option<&str> {
        self.slot_names.get(index as usize).map(String::as_str)
    }

    #[must_use]
    pub fn has_loop(&self) -> bool {
        self.control_flow.is_some()
    }
}

/// A host function the module imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrImport {
    /// Name calls and exports use
    pub name: String,
    pub module: String,
    pub base: String,
    pub parameters: Vec<ValueType>,
    pub result: ValueType,
}

/// Exposes `function` under the external `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrExport {
    pub function: String,
    pub name: String,
}

/// Bytes copied into memory at instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub offset: u32,
    pub bytes: Vec<u8>,
}

/// The module's single linear memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    /// Initial size in 64 KiB pages
    pub initial_pages: u32,
    pub maximum_pages: u32,
    pub export_name: String,
    pub segments: Vec<DataSegment>,
}

impl Memory {
    pub const DEFAULT_INITIAL_PAGES: u32 = 1;
    pub const DEFAULT_MAXIMUM_PAGES: u32 = 256;
    pub const DEFAULT_EXPORT: &'static str = "_mem";

    /// Same memory with a different size and export name.
    #[must_use]
    pub fn with_limits(
        initial_pages: u32,
        maximum_pages: u32,
        export_name: impl Into<String>,
    ) -> Self {
        Self {
            initial_pages,
            maximum_pages,
            export_name: export_name.into(),
            ..Self::default()
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            initial_pages: Self::DEFAULT_INITIAL_PAGES,
            maximum_pages: Self::DEFAULT_MAXIMUM_PAGES,
            export_name: Self::DEFAULT_EXPORT.to_string(),
            segments: vec![DataSegment {
                offset: 10,
                bytes: b"hello, world".to_vec(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, kind: FunctionKind) -> IrFunction {
        IrFunction {
            name: name.to_string(),
            parameters: vec![ValueType::I32, ValueType::F64],
            locals: vec![ValueType::I64],
            result: ValueType::I32,
            body: Vec::new(),
            slot_names: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            control_flow: None,
            kind,
        }
    }

    #[test]
    fn test_default_memory() {
        let memory = Memory::default();
        assert_eq!(memory.initial_pages, 1);
        assert_eq!(memory.maximum_pages, 256);
        assert_eq!(memory.export_name, "_mem");
        assert_eq!(memory.segments[0].offset, 10);
        assert_eq!(memory.segments[0].bytes, b"hello, world");

        let custom = Memory::with_limits(2, 4, "heap");
        assert_eq!(custom.segments, memory.segments);
    }

    #[test]
    fn test_function_index_space() {
        let module = IrModule {
            imports: vec![IrImport {
                name: "log".to_string(),
                module: "env".to_string(),
                base: "log".to_string(),
                parameters: vec![ValueType::I32],
                result: ValueType::Void,
            }],
            functions: vec![
                function("load_i32", FunctionKind::Builtin),
                function("main", FunctionKind::User),
            ],
            exports: Vec::new(),
            memory: Memory::default(),
        };

        assert_eq!(module.function_index("log"), Some(0));
        assert_eq!(module.function_index("load_i32"), Some(1));
        assert_eq!(module.function_index("main"), Some(2));
        assert_eq!(module.function_index("missing"), None);
        assert_eq!(
            module.signature_of("log"),
            Some((&[ValueType::I32][..], ValueType::Void))
        );
        assert_eq!(module.user_functions().count(), 1);
    }

    #[test]
    fn test_slot_lookup() {
        let func = function("f", FunctionKind::User);
        assert_eq!(func.slot_count(), 3);
        assert_eq!(func.slot_type(1), Some(ValueType::F64));
        assert_eq!(func.slot_type(2), Some(ValueType::I64));
        assert_eq!(func.slot_type(3), None);
        assert_eq!(func.slot_name(2), Some("c"));
    }
}
