//! Code generation for the kiss language.
//!
//! Backends turn an assembled [`IrModule`] into an artifact through the
//! [`ModuleBackend`] trait. Two are provided: [`WatBackend`] for the
//! WebAssembly text format and [`WasmBackend`] for the binary format.

mod backend;
mod validate;
mod wasm;
mod wat;

pub use backend::ModuleBackend;
pub use validate::validate;
pub use wasm::WasmBackend;
pub use wat::WatBackend;

use kiss_core::Result;
use kiss_ir::IrModule;

/// Renders a module as WebAssembly text.
///
/// # Errors
/// Returns an error if the module fails validation.
pub fn emit_wat(module: &IrModule) -> Result<String> {
    WatBackend::new().emit(module)
}

/// Encodes a module as a WebAssembly binary.
///
/// # Errors
/// Returns an error if the module fails validation.
///
/// # Examples
/// ```
/// use kiss_ast::Root;
///
/// let module = kiss_ir::lower(&Root::new(vec![], vec![], vec![])).unwrap();
/// let bytes = kiss_codegen::emit_wasm(&module).unwrap();
/// assert_eq!(&bytes[..4], b"\0asm");
/// ```
pub fn emit_wasm(module: &IrModule) -> Result<Vec<u8>> {
    WasmBackend::new().emit(module)
}
