//! Structured Feedback Module
//!
//! Turns compiler errors into output for people and for tools:
//! - the classic four-line `*** Error line N.` blocks (see [`render`])
//! - JSON error reports with compilation statistics

pub mod render;

use serde::{Deserialize, Serialize};

use crate::utils::Error;

// ==================== Structured Error Report ====================

/// Pipeline stage an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lexical,
    Syntax,
    Semantic,
    Link,
}

impl Stage {
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Lexical { .. } => Stage::Lexical,
            Error::Syntax { .. } | Error::UnexpectedEof { .. } => Stage::Syntax,
            Error::MissingMain | Error::Codegen { .. } => Stage::Link,
            _ => Stage::Semantic,
        }
    }
}

/// A structured error report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Absent for end-of-input and link errors
    pub location: Option<Location>,

    pub stage: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
}

impl ErrorReport {
    /// Create an error report from a compiler error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let location = error.span().map(|span| Location {
            file: file_name.to_string(),
            line: span.line,
            column: span.start_col,
            end_column: span.end_col,
        });

        Self {
            code: error.code().to_string(),
            severity: Severity::Error,
            message: error.to_string(),
            location,
            stage: Stage::of(error),
        }
    }
}

// ==================== Compilation Feedback ====================

/// Complete compilation feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationFeedback {
    pub success: bool,

    /// Source file
    pub source_file: String,

    /// All errors, in the order they were reported
    pub diagnostics: Vec<ErrorReport>,

    pub stats: CompilationStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Lines of source
    pub loc: usize,

    /// Tokens scanned, including the end marker
    pub token_count: usize,

    /// Top-level declarations parsed
    pub decl_count: usize,

    pub function_count: usize,

    /// Bytes of assembly emitted
    pub output_bytes: usize,
}

impl CompilationFeedback {
    /// Create a successful feedback
    pub fn success(source_file: String, stats: CompilationStats) -> Self {
        Self {
            success: true,
            source_file,
            diagnostics: vec![],
            stats,
        }
    }

    /// Create a failed feedback
    pub fn failure(source_file: String, errors: &[Error], stats: CompilationStats) -> Self {
        let diagnostics = errors
            .iter()
            .map(|error| ErrorReport::from_error(error, &source_file))
            .collect();

        Self {
            success: false,
            source_file,
            diagnostics,
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use crate::utils::Span;

    #[test]
    fn test_report_from_semantic_error() {
        let error = Error::IncompatibleOperands {
            left: Type::Int,
            op: "=".to_string(),
            right: Type::String,
            span: Span::new(1, 24, 24),
        };
        let report = ErrorReport::from_error(&error, "test.decaf");

        assert_eq!(report.code, "E0004");
        assert_eq!(report.stage, Stage::Semantic);
        assert_eq!(report.message, "Incompatible operands: int = string");
        assert_eq!(
            report.location,
            Some(Location {
                file: "test.decaf".to_string(),
                line: 1,
                column: 24,
                end_column: 24,
            })
        );
    }

    #[test]
    fn test_link_error_has_no_location() {
        let report = ErrorReport::from_error(&Error::MissingMain, "a.decaf");
        assert_eq!(report.stage, Stage::Link);
        assert_eq!(report.location, None);
    }

    #[test]
    fn test_feedback_json() {
        let errors = vec![Error::BreakOutsideLoop { span: Span::new(2, 5, 9) }];
        let stats = CompilationStats { loc: 3, token_count: 12, decl_count: 1, function_count: 1, output_bytes: 0 };
        let feedback = CompilationFeedback::failure("loop.decaf".to_string(), &errors, stats);

        let value: serde_json::Value = serde_json::from_str(&feedback.to_json()).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["diagnostics"][0]["code"], "E0007");
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert_eq!(value["diagnostics"][0]["stage"], "semantic");
        assert_eq!(value["diagnostics"][0]["location"]["column"], 5);
        assert_eq!(value["stats"]["token_count"], 12);

        let parsed: CompilationFeedback = serde_json::from_str(&feedback.to_json()).unwrap();
        assert_eq!(parsed, feedback);
    }
}
