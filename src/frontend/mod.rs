//! Frontend module - Lexer, Parser, Semantic Analysis, AST printers

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod semantic;
pub mod printer;
