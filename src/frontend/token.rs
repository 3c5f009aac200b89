//! Token definitions for Decaf

use crate::types::Type;
use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token, exactly as written
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self { kind, lexeme: lexeme.into(), span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, lexeme: String::new(), span }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    /// void
    Void,
    /// int
    Int,
    /// double
    Double,
    /// bool
    Bool,
    /// string
    String,
    /// null
    Null,
    /// for
    For,
    /// while
    While,
    /// if
    If,
    /// else
    Else,
    /// return
    Return,
    /// break
    Break,
    /// continue
    Continue,
    /// Print
    Print,
    /// ReadInteger
    ReadInteger,
    /// ReadLine
    ReadLine,

    // ============ Identifiers and Literals ============
    /// Identifier (variable or function name)
    Ident(String),
    /// Integer literal (decimal or hex)
    IntLit(i32),
    /// Floating-point literal
    DoubleLit(f64),
    /// true / false
    BoolLit(bool),
    /// String literal, without its quotes
    StringLit(String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// !
    Not,
    /// .
    Dot,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ,
    Comma,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of file
    Eof,
    /// Lexical error, carrying its diagnostic message
    Error(String),
}

impl TokenKind {
    /// Try to convert an identifier to a keyword or boolean literal
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "void" => Some(TokenKind::Void),
            "int" => Some(TokenKind::Int),
            "double" => Some(TokenKind::Double),
            "bool" => Some(TokenKind::Bool),
            "string" => Some(TokenKind::String),
            "null" => Some(TokenKind::Null),
            "for" => Some(TokenKind::For),
            "while" => Some(TokenKind::While),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "return" => Some(TokenKind::Return),
            "break" => Some(TokenKind::Break),
            "continue" => Some(TokenKind::Continue),
            "Print" => Some(TokenKind::Print),
            "ReadInteger" => Some(TokenKind::ReadInteger),
            "ReadLine" => Some(TokenKind::ReadLine),
            "true" => Some(TokenKind::BoolLit(true)),
            "false" => Some(TokenKind::BoolLit(false)),
            _ => None,
        }
    }

    /// The declared type named by a type keyword (`void` included)
    pub fn as_type(&self) -> Option<Type> {
        match self {
            TokenKind::Int => Some(Type::Int),
            TokenKind::Double => Some(Type::Double),
            TokenKind::Bool => Some(Type::Bool),
            TokenKind::String => Some(Type::String),
            TokenKind::Void => Some(Type::Void),
            _ => None,
        }
    }

    /// Get the precedence of an arithmetic operator (for precedence climbing)
    /// Returns None if not an arithmetic operator
    pub fn arithmetic_precedence(&self) -> Option<u8> {
        match self {
            TokenKind::Plus | TokenKind::Minus => Some(1),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(2),
            _ => None,
        }
    }

    /// Classic token class name, as printed by the token dump
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Void => "T_Void",
            TokenKind::Int => "T_Int",
            TokenKind::Double => "T_Double",
            TokenKind::Bool => "T_Bool",
            TokenKind::String => "T_String",
            TokenKind::Null => "T_Null",
            TokenKind::For => "T_For",
            TokenKind::While => "T_While",
            TokenKind::If => "T_If",
            TokenKind::Else => "T_Else",
            TokenKind::Return => "T_Return",
            TokenKind::Break => "T_Break",
            TokenKind::Continue => "T_Continue",
            TokenKind::Print => "T_Print",
            TokenKind::ReadInteger => "T_ReadInteger",
            TokenKind::ReadLine => "T_ReadLine",
            TokenKind::Ident(_) => "T_Identifier",
            TokenKind::IntLit(_) => "T_IntConstant",
            TokenKind::DoubleLit(_) => "T_DoubleConstant",
            TokenKind::BoolLit(_) => "T_BoolConstant",
            TokenKind::StringLit(_) => "T_StringConstant",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Eq => "'='",
            TokenKind::EqEq => "T_Equal",
            TokenKind::Ne => "T_NotEqual",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "T_LessEqual",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "T_GreaterEqual",
            TokenKind::AndAnd => "T_And",
            TokenKind::OrOr => "T_Or",
            TokenKind::Not => "'!'",
            TokenKind::Dot => "'.'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "T_EOF",
            TokenKind::Error(_) => "T_Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword_from_str("Print"), Some(TokenKind::Print));
        assert_eq!(TokenKind::keyword_from_str("true"), Some(TokenKind::BoolLit(true)));
        assert_eq!(TokenKind::keyword_from_str("print"), None);
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(TokenKind::Plus.arithmetic_precedence(), Some(1));
        assert_eq!(TokenKind::Percent.arithmetic_precedence(), Some(2));
        assert_eq!(TokenKind::Lt.arithmetic_precedence(), None);
    }
}
