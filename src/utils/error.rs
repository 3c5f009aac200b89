//! Error handling for decafc

use crate::types::Type;
use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexical Errors ====================

    /// Carried by an `Error` token and surfaced when the parser reaches it
    #[error("{message}")]
    Lexical { message: String, span: Span },

    // ==================== Parser Errors ====================

    #[error("{message}")]
    Syntax {
        message: String,
        span: Span,
        /// Underline the whole token instead of pointing at its first column
        underline: bool,
    },

    #[error("{message}")]
    UnexpectedEof { message: String },

    // ==================== Semantic Errors ====================

    #[error("Declaration of '{name}' here conflicts with declaration on line {previous_line}")]
    Redeclaration {
        name: String,
        previous_line: usize,
        span: Span,
    },

    #[error("No declaration for Variable '{name}' found")]
    UndeclaredVariable { name: String, span: Span },

    #[error("No declaration for Function '{name}' found")]
    UndeclaredFunction { name: String, span: Span },

    #[error("Incompatible operands: {left} {op} {right}")]
    IncompatibleOperands {
        left: Type,
        op: String,
        right: Type,
        span: Span,
    },

    #[error("Incompatible operand: {op} {ty}")]
    IncompatibleOperand { op: String, ty: Type, span: Span },

    #[error("Incompatible return: {given} given, {expected} expected")]
    IncompatibleReturn {
        given: Type,
        expected: Type,
        span: Span,
    },

    #[error("break is only allowed inside a loop")]
    BreakOutsideLoop { span: Span },

    #[error("continue is only allowed inside a loop")]
    ContinueOutsideLoop { span: Span },

    #[error("Test expression must have boolean type")]
    TestNotBoolean { span: Span },

    #[error("Function '{name}' expects {expected} arguments but {given} given")]
    ArgCountMismatch {
        name: String,
        expected: usize,
        given: usize,
        span: Span,
    },

    #[error("Incompatible argument {index}: {given} given, {expected} expected")]
    ArgTypeMismatch {
        index: usize,
        given: Type,
        expected: Type,
        span: Span,
    },

    #[error("Incompatible argument {index}: {given} given, int/bool/string expected")]
    PrintArgType { index: usize, given: Type, span: Span },

    #[error("Expression of type void has no value")]
    VoidValue { span: Span },

    // ==================== Link Errors ====================

    #[error("Linker: function 'main' not defined")]
    MissingMain,

    // ==================== Code Generation Errors ====================

    /// Raised only for trees that never passed semantic analysis
    #[error("Code generation failed: {message}")]
    Codegen { message: String },
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexical { span, .. } => Some(*span),
            Self::Syntax { span, .. } => Some(*span),
            Self::Redeclaration { span, .. } => Some(*span),
            Self::UndeclaredVariable { span, .. } => Some(*span),
            Self::UndeclaredFunction { span, .. } => Some(*span),
            Self::IncompatibleOperands { span, .. } => Some(*span),
            Self::IncompatibleOperand { span, .. } => Some(*span),
            Self::IncompatibleReturn { span, .. } => Some(*span),
            Self::BreakOutsideLoop { span } => Some(*span),
            Self::ContinueOutsideLoop { span } => Some(*span),
            Self::TestNotBoolean { span } => Some(*span),
            Self::ArgCountMismatch { span, .. } => Some(*span),
            Self::ArgTypeMismatch { span, .. } => Some(*span),
            Self::PrintArgType { span, .. } => Some(*span),
            Self::VoidValue { span } => Some(*span),
            Self::UnexpectedEof { .. } | Self::MissingMain | Self::Codegen { .. } => None,
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lexical { .. } => "L0001",
            Self::Syntax { .. } => "P0001",
            Self::UnexpectedEof { .. } => "P0002",
            Self::Redeclaration { .. } => "E0001",
            Self::UndeclaredVariable { .. } => "E0002",
            Self::UndeclaredFunction { .. } => "E0003",
            Self::IncompatibleOperands { .. } => "E0004",
            Self::IncompatibleOperand { .. } => "E0005",
            Self::IncompatibleReturn { .. } => "E0006",
            Self::BreakOutsideLoop { .. } => "E0007",
            Self::ContinueOutsideLoop { .. } => "E0008",
            Self::TestNotBoolean { .. } => "E0009",
            Self::ArgCountMismatch { .. } => "E0010",
            Self::ArgTypeMismatch { .. } => "E0011",
            Self::PrintArgType { .. } => "E0012",
            Self::VoidValue { .. } => "E0013",
            Self::MissingMain => "K0001",
            Self::Codegen { .. } => "K0002",
        }
    }

    /// Whether the caret line should underline the full span
    pub fn underlines(&self) -> bool {
        match self {
            Self::Syntax { underline, .. } => *underline,
            Self::Lexical { .. } => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::IncompatibleOperands {
            left: Type::Int,
            op: "=".to_string(),
            right: Type::String,
            span: Span::dummy(),
        };
        assert_eq!(err.to_string(), "Incompatible operands: int = string");

        let err = Error::IncompatibleReturn {
            given: Type::Void,
            expected: Type::Int,
            span: Span::dummy(),
        };
        assert_eq!(err.to_string(), "Incompatible return: void given, int expected");

        assert_eq!(
            Error::MissingMain.to_string(),
            "Linker: function 'main' not defined"
        );
    }

    #[test]
    fn test_span_and_code() {
        let span = Span::new(2, 3, 7);
        let err = Error::UndeclaredVariable { name: "x".to_string(), span };
        assert_eq!(err.span(), Some(span));
        assert_eq!(err.code(), "E0002");
        assert!(err.underlines());
        assert_eq!(Error::MissingMain.span(), None);

        let err = Error::VoidValue { span };
        assert_eq!(err.to_string(), "Expression of type void has no value");
        assert_eq!(err.code(), "E0013");
        assert_eq!(err.span(), Some(span));
    }
}
