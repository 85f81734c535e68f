//! Program and function lowering, and module assembly.

use std::collections::HashSet;

use kiss_ast::{FunctionDeclaration, FunctionExport, FunctionImport, Node, Root};
use kiss_core::{Error, Result};
use kiss_semantic::{FunctionKind, FunctionSignature, FunctionTable};

use super::control_flow::reconstruct;
use super::core::{AstLowering, require_storable};
use crate::builtins::{Builtin, builtin_functions};
use crate::{IrExport, IrFunction, IrImport, IrModule};

impl AstLowering {
    /// Lowers a complete program.
    ///
    /// # Errors
    /// The first error found in any import, function or export.
    pub fn lower_program(&mut self, root: &Root) -> Result<IrModule> {
        root.expect_kind()?;
        self.assemble(&root.fn_imports, &root.functions, &root.fn_exports)
    }

    /// Assembles a module from its parts.
    ///
    /// The first pass registers the signatures of imports, built-ins and user
    /// functions, so calls may name functions declared later in the source.
    /// The second pass lowers the bodies.
    ///
    /// # Errors
    /// `DuplicateDeclaration` when two callable names collide,
    /// `UnknownExport` for an export of an unknown name, and every error
    /// body lowering reports.
    pub fn assemble(
        &mut self,
        imports: &[FunctionImport],
        functions: &[FunctionDeclaration],
        exports: &[FunctionExport],
    ) -> Result<IrModule> {
        self.functions = FunctionTable::new();

        // First pass: register every callable name
        let imports = imports
            .iter()
            .map(|import| self.register_import(import))
            .collect::<Result<Vec<_>>>()?;
        for builtin in Builtin::ALL {
            self.define_function(builtin.name(), builtin.signature(), None)?;
        }
        for function in functions {
            self.register_function(function)?;
        }

        // Second pass: lower bodies
        let mut lowered = builtin_functions();
        for function in functions {
            lowered.push(self.lower_function(function)?);
        }

        let exports = self.lower_exports(exports)?;

        tracing::debug!(
            imports = imports.len(),
            functions = lowered.len(),
            exports = exports.len(),
            "assembled module"
        );
        Ok(IrModule {
            imports,
            functions: lowered,
            exports,
            memory: self.memory.clone(),
        })
    }

    fn register_import(&mut self, import: &FunctionImport) -> Result<IrImport> {
        import.expect_kind()?;
        let signature = FunctionSignature::new(
            &import.param_types,
            import.return_type,
            FunctionKind::Import,
        );
        let lowered = IrImport {
            name: import.id.name.clone(),
            module: import.module.clone(),
            base: import.base.clone(),
            parameters: signature.parameters.clone(),
            result: signature.result,
        };
        self.define_function(&import.id.name, signature, import.id.span())?;
        Ok(lowered)
    }

    fn register_function(&mut self, function: &FunctionDeclaration) -> Result<()> {
        function.expect_kind()?;
        let parameters = function
            .params
            .iter()
            .map(|param| require_storable(param.param_type, "parameter", param.id.span()))
            .collect::<Result<Vec<_>>>()?;
        let signature =
            FunctionSignature::new(&parameters, function.return_type, FunctionKind::User);
        self.define_function(function.name(), signature, function.id.span())
    }

    /// Lowers one user function whose signature is already registered.
    ///
    /// # Errors
    /// Every error statement lowering or control-flow reconstruction reports.
    pub fn lower_function(&self, function: &FunctionDeclaration) -> Result<IrFunction> {
        let lowered = self.lower_function_body(function)?;
        let symbols = lowered.symbols;

        let parameters: Vec<_> = symbols
            .slots()
            .filter(|slot| slot.is_parameter())
            .map(|slot| slot.value_type)
            .collect();
        let locals = symbols.local_types();
        let (body, control_flow) = reconstruct(lowered.operations, lowered.loop_guard)?;

        tracing::debug!(
            function = function.name(),
            parameters = parameters.len(),
            locals = locals.len(),
            looping = control_flow.is_some(),
            returns = %lowered.return_slot,
            "lowered function"
        );

        Ok(IrFunction {
            name: function.name().to_string(),
            parameters,
            locals,
            result: function.return_type,
            body,
            slot_names: symbols.names().to_vec(),
            control_flow,
            kind: FunctionKind::User,
        })
    }

    fn lower_exports(&self, exports: &[FunctionExport]) -> Result<Vec<IrExport>> {
        let mut functions_seen = HashSet::new();
        let mut names_seen = HashSet::new();
        let mut lowered = Vec::with_capacity(exports.len());

        for export in exports {
            export.expect_kind()?;
            let function = export.id.name.as_str();
            if !self.functions.contains(function) {
                return Err(Error::UnknownExport {
                    name: function.to_string(),
                    span: export.id.span(),
                });
            }
            if !functions_seen.insert(function) {
                tracing::warn!(function, name = %export.name, "function exported more than once");
            }
            if !names_seen.insert(export.name.as_str()) {
                tracing::warn!(function, name = %export.name, "export name used more than once");
            }
            lowered.push(IrExport {
                function: function.to_string(),
                name: export.name.clone(),
            });
        }
        Ok(lowered)
    }
}
