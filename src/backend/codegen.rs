//! Code Generation trait - Backend abstraction

use crate::frontend::ast::Program;
use crate::utils::Result;

/// Code generation backend trait
pub trait CodeGen {
    /// Generate target assembly text from an analyzed program
    fn generate(&mut self, program: &Program) -> Result<String>;

    /// Get the target description (e.g., "mips32-spim")
    fn target(&self) -> &str;

    /// Get the backend name
    fn name(&self) -> &str;
}
