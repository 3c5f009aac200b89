//! Compilation driver
//!
//! Runs scan → parse → analyze → generate and stops at the first stage
//! that reports errors.

use log::debug;
use thiserror::Error;

use crate::backend::{CodeGen, MipsCodeGen};
use crate::feedback::render::render_all;
use crate::feedback::{CompilationStats, Stage};
use crate::frontend::ast::{Decl, Program};
use crate::frontend::lexer::Lexer;
use crate::frontend::parser;
use crate::frontend::semantic;
use crate::frontend::token::Token;
use crate::utils::{Error, Result};

/// Errors from the stage that stopped the pipeline, already rendered
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{rendered}")]
pub struct Failure {
    pub stage: Stage,
    pub errors: Vec<Error>,
    pub rendered: String,
}

/// A successfully compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub program: Program,
    pub assembly: String,
}

/// One source file on its way through the pipeline
pub struct Compilation {
    tokens: Vec<Token>,
    loc: usize,
}

impl Compilation {
    /// Tokenize `source`. Lexical errors stay in the stream until the
    /// parser reaches them.
    pub fn scan(source: &str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        debug!(
            "scanned {} tokens ({} lexical errors)",
            tokens.len(),
            tokens.iter().filter(|token| token.is_error()).count()
        );
        Self {
            tokens,
            loc: source.lines().count(),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn parse(&self) -> Result<Program> {
        let program = parser::parse(self.tokens.clone())?;
        debug!("parsed {} declarations", program.decls.len());
        Ok(program)
    }

    pub fn analyze(&self, program: &Program) -> Vec<Error> {
        let errors = semantic::analyze(program);
        debug!("semantic analysis reported {} errors", errors.len());
        errors
    }

    pub fn generate(&self, program: &Program) -> Result<String> {
        let mut backend = MipsCodeGen::new();
        let assembly = backend.generate(program)?;
        debug!("{} backend emitted {} bytes for {}", backend.name(), assembly.len(), backend.target());
        Ok(assembly)
    }

    /// Parse and analyze
    pub fn check(&self) -> std::result::Result<Program, Failure> {
        let program = self.parse().map_err(|error| self.failure(vec![error]))?;

        let errors = self.analyze(&program);
        if !errors.is_empty() {
            return Err(self.failure(errors));
        }
        Ok(program)
    }

    /// Run every stage
    pub fn compile(&self) -> std::result::Result<Artifact, Failure> {
        let program = self.check()?;
        let assembly = self
            .generate(&program)
            .map_err(|error| self.failure(vec![error]))?;
        Ok(Artifact { program, assembly })
    }

    /// Wrap errors from one stage, rendering them against this source
    pub fn failure(&self, errors: Vec<Error>) -> Failure {
        let stage = errors.first().map(Stage::of).unwrap_or(Stage::Semantic);
        let rendered = render_all(&errors, &self.tokens);
        Failure { stage, errors, rendered }
    }

    pub fn stats(&self, artifact: Option<&Artifact>) -> CompilationStats {
        let mut stats = CompilationStats {
            loc: self.loc,
            token_count: self.tokens.len(),
            ..Default::default()
        };
        if let Some(artifact) = artifact {
            stats.decl_count = artifact.program.decls.len();
            stats.function_count = artifact
                .program
                .decls
                .iter()
                .filter(|decl| matches!(decl, Decl::Fn(_)))
                .count();
            stats.output_bytes = artifact.assembly.len();
        }
        stats
    }
}

/// Compile Decaf source to MIPS assembly
pub fn compile(source: &str) -> std::result::Result<String, Failure> {
    Compilation::scan(source)
        .compile()
        .map(|artifact| artifact.assembly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compiles_print_program() {
        let assembly = compile("void main() { int x; x = 5; Print(x); }").unwrap();
        assert!(assembly.contains("  main:"));
        assert_eq!(assembly.matches("jal _PrintInt").count(), 1);
    }

    #[test]
    fn test_syntax_error_stops_pipeline() {
        let failure = compile("void main() { int x }").unwrap_err();
        assert_eq!(failure.stage, Stage::Syntax);
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(
            failure.rendered,
            "*** Error line 1.\nvoid main() { int x }\n                    ^\n*** syntax error"
        );
    }

    #[test]
    fn test_lexical_error_is_reported_by_parser() {
        let failure = compile("void main() { int x; x = 5 @ 3; }").unwrap_err();
        assert_eq!(failure.stage, Stage::Lexical);
        assert!(failure.rendered.ends_with("*** Unrecognized char: '@'"));
    }

    #[test]
    fn test_semantic_errors_are_all_reported() {
        let source = "void main() { int x; x = \"hello\"; }\nint f() { return; }";
        let failure = compile(source).unwrap_err();
        assert_eq!(failure.stage, Stage::Semantic);
        assert_eq!(failure.errors.len(), 2);
        assert_eq!(failure.rendered.matches("*** Error line").count(), 2);
        assert!(failure.rendered.contains("*** Incompatible return: void given, int expected"));
    }

    #[test]
    fn test_semantic_errors_skip_codegen() {
        // no main either, but analysis fails first
        let failure = compile("int f() { return true; }").unwrap_err();
        assert_eq!(failure.stage, Stage::Semantic);
    }

    #[test]
    fn test_void_values_fail_analysis_not_codegen() {
        for source in [
            "void g() { } void main() { return g(); }",
            "void g() { } void main() { bool b; b = g() == g(); }",
            "void v; void g() { } void main() { v = g(); }",
        ] {
            let failure = compile(source).unwrap_err();
            assert_eq!(failure.stage, Stage::Semantic, "{}", source);
            assert!(failure.rendered.ends_with("*** Expression of type void has no value"));
        }
    }

    #[test]
    fn test_oversized_integer_is_lexical() {
        let failure = compile("void main() { int x; x = 99999999999999999999; Print(x); }").unwrap_err();
        assert_eq!(failure.stage, Stage::Lexical);
        assert!(failure
            .rendered
            .ends_with("*** Integer constant out of range: 99999999999999999999"));
    }

    #[test]
    fn test_missing_main_is_a_link_failure() {
        let failure = compile("int helper(int a) { return a; }").unwrap_err();
        assert_eq!(failure.stage, Stage::Link);
        assert_eq!(failure.errors, vec![Error::MissingMain]);
        assert_eq!(failure.rendered, "*** Error.\n*** Linker: function 'main' not defined");
        assert_eq!(failure.to_string(), failure.rendered);
    }

    #[test]
    fn test_unexpected_eof() {
        let failure = compile("void main() {").unwrap_err();
        assert_eq!(failure.stage, Stage::Syntax);
        assert!(failure.rendered.starts_with("*** Error at EOF\n"));
    }

    #[test]
    fn test_stats() {
        let compilation = Compilation::scan("int g;\nvoid main() {\n  g = 1;\n}\n");
        let artifact = compilation.compile().unwrap();
        let stats = compilation.stats(Some(&artifact));
        assert_eq!(stats.loc, 4);
        assert_eq!(stats.decl_count, 2);
        assert_eq!(stats.function_count, 1);
        assert_eq!(stats.output_bytes, artifact.assembly.len());
        assert_eq!(stats.token_count, compilation.tokens().len());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "int sq(int n) { return n * n; }\nvoid main() { Print(sq(3), \"x\", \"x\"); }";
        assert_eq!(compile(source), compile(source));
    }
}
