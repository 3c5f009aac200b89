//! Backend module - Code generation

pub mod codegen;

// MIPS backend, the only target
pub mod mips;

pub use codegen::CodeGen;
pub use mips::MipsCodeGen;
