//! WebAssembly binary backend built on `wasm-encoder`.

use std::collections::HashMap;

use kiss_core::{Error, Result, ValueType};
use kiss_ir::{BranchTest, Constant, IrExpression, IrFunction, IrModule};
use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection,
    Function, FunctionSection, ImportSection, IndirectNameMap, Instruction, MemArg,
    MemorySection, MemoryType, Module, NameMap, NameSection, TypeSection, ValType,
};

use crate::ModuleBackend;
use crate::validate::validate;

/// Emits a module as a WebAssembly binary.
#[derive(Debug)]
pub struct WasmBackend {
    /// Whether to append a `name` custom section
    debug_names: bool,
}

impl Default for WasmBackend {
    fn default() -> Self {
        Self { debug_names: true }
    }
}

impl WasmBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaves out the `name` section with function and local names.
    #[must_use]
    pub fn without_names(mut self) -> Self {
        self.debug_names = false;
        self
    }
}

fn val_type(ty: ValueType) -> Option<ValType> {
    match ty {
        ValueType::I32 => Some(ValType::I32),
        ValueType::I64 => Some(ValType::I64),
        ValueType::F64 => Some(ValType::F64),
        ValueType::Void => None,
    }
}

fn val_types(types: &[ValueType]) -> Vec<ValType> {
    types.iter().copied().filter_map(val_type).collect()
}

/// Function types, each encoded once.
#[derive(Default)]
struct TypeTable {
    section: TypeSection,
    indices: HashMap<(Vec<ValType>, Vec<ValType>), u32>,
}

impl TypeTable {
    fn index_of(&mut self, parameters: &[ValueType], result: ValueType) -> u32 {
        let key = (val_types(parameters), val_type(result).into_iter().collect::<Vec<_>>());
        if let Some(&index) = self.indices.get(&key) {
            return index;
        }
        let index = self.section.len();
        self.section
            .ty()
            .function(key.0.iter().copied(), key.1.iter().copied());
        self.indices.insert(key, index);
        index
    }
}

/// Runs of equal local types, as the code section stores them.
fn compress_locals(locals: &[ValueType]) -> Vec<(u32, ValType)> {
    let mut runs: Vec<(u32, ValType)> = Vec::new();
    for ty in locals.iter().copied().filter_map(val_type) {
        match runs.last_mut() {
            Some((count, last)) if *last == ty => *count += 1,
            _ => runs.push((1, ty)),
        }
    }
    runs
}

fn mem_arg(value_type: ValueType) -> MemArg {
    MemArg {
        offset: 0,
        align: value_type.byte_width().trailing_zeros(),
        memory_index: 0,
    }
}

/// Encodes one function body.
struct BodyEncoder<'a> {
    function: Function,
    indices: &'a HashMap<&'a str, u32>,
    /// Enclosing labels, innermost last
    labels: Vec<&'a str>,
}

impl<'a> BodyEncoder<'a> {
    fn encode(&mut self, expr: &'a IrExpression) -> Result<()> {
        match expr {
            IrExpression::Const(Constant::I32(v)) => {
                self.function.instruction(&Instruction::I32Const(*v));
            }
            IrExpression::Const(Constant::I64(v)) => {
                self.function.instruction(&Instruction::I64Const(*v));
            }
            IrExpression::Const(Constant::F64(v)) => {
                self.function.instruction(&Instruction::F64Const(*v));
            }
            IrExpression::LocalGet { index, .. } => {
                self.function.instruction(&Instruction::LocalGet(*index));
            }
            IrExpression::LocalSet { index, value } => {
                self.encode(value)?;
                self.function.instruction(&Instruction::LocalSet(*index));
            }
            IrExpression::Call {
                function,
                arguments,
                ..
            } => {
                for argument in arguments {
                    self.encode(argument)?;
                }
                let index = self.indices.get(function.as_str()).copied().ok_or_else(|| {
                    Error::Backend(format!("no index for function '{function}'"))
                })?;
                self.function.instruction(&Instruction::Call(index));
            }
            IrExpression::Load {
                value_type,
                address,
            } => {
                self.encode(address)?;
                let instruction = match value_type {
                    ValueType::F64 => Instruction::F64Load(mem_arg(*value_type)),
                    _ => Instruction::I32Load(mem_arg(*value_type)),
                };
                self.function.instruction(&instruction);
            }
            IrExpression::Store {
                value_type,
                address,
                value,
            } => {
                self.encode(address)?;
                self.encode(value)?;
                let instruction = match value_type {
                    ValueType::F64 => Instruction::F64Store(mem_arg(*value_type)),
                    _ => Instruction::I32Store(mem_arg(*value_type)),
                };
                self.function.instruction(&instruction);
            }
            IrExpression::Return { value } => {
                if let Some(value) = value {
                    self.encode(value)?;
                }
                self.function.instruction(&Instruction::Return);
            }
            IrExpression::Block { label, body } | IrExpression::Loop { label, body } => {
                let start = if matches!(expr, IrExpression::Block { .. }) {
                    Instruction::Block(BlockType::Empty)
                } else {
                    Instruction::Loop(BlockType::Empty)
                };
                self.function.instruction(&start);
                self.labels.push(label);
                for inner in body {
                    self.encode(inner)?;
                }
                self.labels.pop();
                self.function.instruction(&Instruction::End);
            }
            IrExpression::BranchIf {
                label,
                condition,
                test,
            } => {
                let depth = self
                    .labels
                    .iter()
                    .rev()
                    .position(|l| *l == label.as_str())
                    .ok_or_else(|| Error::Backend(format!("label '{label}' is not in scope")))?;
                self.encode(condition)?;
                if *test == BranchTest::Zero {
                    self.function.instruction(&Instruction::I32Eqz);
                }
                self.function.instruction(&Instruction::BrIf(depth as u32));
            }
        }
        Ok(())
    }
}

impl WasmBackend {
    fn encode_function<'a>(
        func: &'a IrFunction,
        indices: &'a HashMap<&'a str, u32>,
    ) -> Result<Function> {
        let mut encoder = BodyEncoder {
            function: Function::new(compress_locals(&func.locals)),
            indices,
            labels: Vec::new(),
        };
        for expr in &func.body {
            encoder.encode(expr)?;
        }
        encoder.function.instruction(&Instruction::End);
        Ok(encoder.function)
    }

    fn names(module: &IrModule, indices: &HashMap<&str, u32>) -> NameSection {
        let mut functions = NameMap::new();
        for import in &module.imports {
            functions.append(indices[import.name.as_str()], &import.name);
        }
        let mut locals = IndirectNameMap::new();
        for func in &module.functions {
            let index = indices[func.name.as_str()];
            functions.append(index, &func.name);

            let mut slots = NameMap::new();
            for (slot, name) in func.slot_names.iter().enumerate() {
                slots.append(slot as u32, name);
            }
            locals.append(index, &slots);
        }

        let mut section = NameSection::new();
        section.functions(&functions);
        section.locals(&locals);
        section
    }
}

impl ModuleBackend for WasmBackend {
    type Artifact = Vec<u8>;

    fn name(&self) -> &str {
        "wasm"
    }

    fn emit(&mut self, module: &IrModule) -> Result<Vec<u8>> {
        validate(module)?;

        let indices: HashMap<&str, u32> = module
            .imports
            .iter()
            .map(|i| i.name.as_str())
            .chain(module.functions.iter().map(|f| f.name.as_str()))
            .zip(0u32..)
            .collect();

        let mut types = TypeTable::default();
        let mut imports = ImportSection::new();
        for import in &module.imports {
            let ty = types.index_of(&import.parameters, import.result);
            imports.import(&import.module, &import.base, EntityType::Function(ty));
        }

        let mut functions = FunctionSection::new();
        let mut code = CodeSection::new();
        for func in &module.functions {
            functions.function(types.index_of(&func.parameters, func.result));
            code.function(&Self::encode_function(func, &indices)?);
        }

        let memory = &module.memory;
        let mut memories = MemorySection::new();
        memories.memory(MemoryType {
            minimum: u64::from(memory.initial_pages),
            maximum: Some(u64::from(memory.maximum_pages)),
            memory64: false,
            shared: false,
            page_size_log2: None,
        });

        let mut exports = ExportSection::new();
        exports.export(&memory.export_name, ExportKind::Memory, 0);
        for export in &module.exports {
            exports.export(&export.name, ExportKind::Func, indices[export.function.as_str()]);
        }

        let mut data = DataSection::new();
        for segment in &memory.segments {
            let offset = i32::try_from(segment.offset).map_err(|_| {
                Error::Backend(format!("data offset {} does not fit in i32", segment.offset))
            })?;
            data.active(0, &ConstExpr::i32_const(offset), segment.bytes.iter().copied());
        }

        let mut encoded = Module::new();
        encoded
            .section(&types.section)
            .section(&imports)
            .section(&functions)
            .section(&memories)
            .section(&exports)
            .section(&code)
            .section(&data);
        if self.debug_names {
            encoded.section(&Self::names(module, &indices));
        }

        let bytes = encoded.finish();
        tracing::debug!(bytes = bytes.len(), "emitted binary module");
        Ok(bytes)
    }
}
