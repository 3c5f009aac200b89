//! Abstract Syntax Tree definitions for Decaf
//!
//! Every node carries the span of its leading token; `line()` is what
//! diagnostics report. The tree is never mutated after parsing.

use std::fmt;

use crate::types::Type;
use crate::utils::Span;

/// A complete program (compilation unit)
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Top-level declarations
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Var(VarDecl),
    Fn(FnDecl),
}

/// An identifier with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Variable declaration (global, formal or local)
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: Type,
    pub span: Span,
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Ident,
    pub return_type: Type,
    pub formals: Vec<VarDecl>,
    pub body: Block,
    pub span: Span,
}

/// A `{ ... }` statement block
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Local variable declaration
    VarDecl(VarDecl),
    /// Nested block
    Block(Block),
    /// Print(args...);
    Print { args: Vec<Expr>, span: Span },
    /// return [expr];
    Return { expr: Option<Expr>, span: Span },
    /// if (test) then [else else_branch]
    If {
        test: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// while (test) body
    While { test: Expr, body: Box<Stmt>, span: Span },
    /// for (init; test; step) body
    For {
        init: Option<Expr>,
        test: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    /// break;
    Break { span: Span },
    /// continue;
    Continue { span: Span },
    /// Expression statement: assignments, calls, and bare `a;`
    Expr(Expr),
}

/// Binary and unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntConstant { value: i32, span: Span },
    DoubleConstant { value: f64, span: Span },
    BoolConstant { value: bool, span: Span },
    /// String literal; `value` excludes the quotes
    StringConstant { value: String, span: Span },
    /// A variable reference
    FieldAccess(Ident),
    /// Function call
    Call { callee: Ident, actuals: Vec<Expr>, span: Span },
    /// `+ - * / %`
    Arithmetic {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
        op_span: Span,
        span: Span,
    },
    /// `< <= > >=`
    Relational {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
        op_span: Span,
        span: Span,
    },
    /// `== !=`
    Equality {
        left: Box<Expr>,
        op: Operator,
        right: Box<Expr>,
        op_span: Span,
        span: Span,
    },
    /// `&& ||`, or unary `!` when `left` is absent
    Logical {
        left: Option<Box<Expr>>,
        op: Operator,
        right: Box<Expr>,
        op_span: Span,
        span: Span,
    },
    ReadInteger { span: Span },
    ReadLine { span: Span },
    /// `target = value`
    Assign {
        target: Ident,
        value: Box<Expr>,
        op_span: Span,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntConstant { span, .. }
            | Expr::DoubleConstant { span, .. }
            | Expr::BoolConstant { span, .. }
            | Expr::StringConstant { span, .. }
            | Expr::Call { span, .. }
            | Expr::Arithmetic { span, .. }
            | Expr::Relational { span, .. }
            | Expr::Equality { span, .. }
            | Expr::Logical { span, .. }
            | Expr::ReadInteger { span }
            | Expr::ReadLine { span }
            | Expr::Assign { span, .. } => *span,
            Expr::FieldAccess(ident) => ident.span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }
}
