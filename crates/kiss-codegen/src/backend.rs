//! The narrow interface between the compiler and an output format.

use kiss_core::Result;
use kiss_ir::IrModule;

/// Turns an assembled module into an artifact.
///
/// Implementations validate the module before encoding it, so an `Ok`
/// artifact is always well formed.
pub trait ModuleBackend {
    /// What [`ModuleBackend::emit`] produces
    type Artifact;

    /// Short name of the output format, e.g. `wat`.
    fn name(&self) -> &str;

    /// Validates and encodes `module`.
    ///
    /// # Errors
    /// Returns [`kiss_core::Error::Backend`] when validation or encoding fails.
    fn emit(&mut self, module: &IrModule) -> Result<Self::Artifact>;
}
