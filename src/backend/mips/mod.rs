//! MIPS Backend - Generate SPIM assembly from the analyzed AST
//!
//! Every intermediate value is spilled to its own stack slot, so the scratch
//! registers `$t0`-`$t3` and `$f0`-`$f4` only live within one operation.
//! The generated module expects the Decaf runtime (`_PrintInt`,
//! `_PrintString`, `_PrintBool`, `_PrintDouble`, `_ReadInteger`,
//! `_ReadLine`) to be linked in.

mod context;
mod emitter;

pub use emitter::MipsCodeGen;
