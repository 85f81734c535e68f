//! Compilation pipeline stages.
//!
//! Failing stages print the diagnostic as a miette report on stderr and
//! return a short error naming the stage.

use anyhow::Result;
use kiss_ast::Root;
use kiss_ir::{AstLowering, IrModule, Memory};
use kiss_utils::EmitKind;
use miette::NamedSource;

/// A program text together with the name it is reported under.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    pub name: &'a str,
    pub text: &'a str,
}

impl<'a> Source<'a> {
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }

    fn report(&self, err: kiss_core::Error, stage: &str) -> anyhow::Error {
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new(self.name, self.text.to_string()));
        eprintln!("{report:?}");
        anyhow::anyhow!("{stage} failed")
    }
}

/// Decodes the JSON AST.
///
/// # Errors
/// Returns an error if the input is not a well-formed kiss tree.
pub fn decode(source: Source<'_>) -> Result<Root> {
    kiss_ast::from_json(source.text).map_err(|e| source.report(e, "Decoding"))
}

/// Lowers a decoded program into a module with the given memory layout.
///
/// # Errors
/// Returns an error if lowering fails.
pub fn lower(root: &Root, memory: Memory, source: Source<'_>) -> Result<IrModule> {
    AstLowering::with_memory(memory)
        .lower_program(root)
        .map_err(|e| source.report(e, "Lowering"))
}

/// Renders a module in the requested output format.
///
/// # Errors
/// Returns an error if the backend rejects the module.
pub fn emit(module: &IrModule, kind: EmitKind, source: Source<'_>) -> Result<Vec<u8>> {
    let artifact = match kind {
        EmitKind::Wasm => kiss_codegen::emit_wasm(module),
        EmitKind::Wat => kiss_codegen::emit_wat(module).map(String::into_bytes),
        EmitKind::Ir => kiss_codegen::validate(module).map(|()| module.to_string().into_bytes()),
    };
    artifact.map_err(|e| source.report(e, "Code generation"))
}

/// Runs every stage up to backend validation.
///
/// # Errors
/// Returns an error if any stage fails.
pub fn check_pipeline(source: Source<'_>, memory: Memory) -> Result<IrModule> {
    let root = decode(source)?;
    let module = lower(&root, memory, source)?;
    kiss_codegen::validate(&module).map_err(|e| source.report(e, "Validation"))?;
    Ok(module)
}

/// Runs the complete pipeline and returns the output bytes.
///
/// # Errors
/// Returns an error if any stage fails.
pub fn build_pipeline(source: Source<'_>, memory: Memory, kind: EmitKind) -> Result<Vec<u8>> {
    let root = decode(source)?;
    let module = lower(&root, memory, source)?;
    emit(&module, kind, source)
}
