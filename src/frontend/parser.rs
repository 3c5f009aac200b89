//! Parser for Decaf
//!
//! Recursive descent parser with precedence climbing for arithmetic.
//! The first error wins: there is no recovery, and a lexical `Error`
//! token aborts parsing with the scanner's message.

use crate::frontend::ast::*;
use crate::frontend::token::{Token, TokenKind};
use crate::types::Type;
use crate::utils::{Error, Result, Span};

const SYNTAX_ERROR: &str = "syntax error";

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    #[cfg(test)]
    pub fn new(mut lexer: crate::frontend::lexer::Lexer) -> Self {
        Self::from_tokens(lexer.tokenize())
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.line, t.span.end_col + 1, t.span.end_col + 1))
                .unwrap_or_else(|| Span::new(1, 1, 1));
            tokens.push(Token::eof(span));
        }
        Self { tokens, pos: 0 }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: TokenKind, message: &str) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Error at the current token
    fn error(&self, message: &str) -> Error {
        Self::error_at(self.current(), message, false)
    }

    fn error_at(token: &Token, message: &str, underline: bool) -> Error {
        match &token.kind {
            TokenKind::Error(lexical) => Error::Lexical {
                message: lexical.clone(),
                span: token.span,
            },
            TokenKind::Eof => Error::UnexpectedEof {
                message: message.to_string(),
            },
            _ => Error::Syntax {
                message: message.to_string(),
                span: token.span,
                underline,
            },
        }
    }

    // ==================== Declarations ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut decls = Vec::new();

        while !self.is_at_end() {
            decls.push(self.parse_decl()?);
        }

        Ok(Program { decls })
    }

    /// Parse a top-level variable or function declaration
    fn parse_decl(&mut self) -> Result<Decl> {
        let start = self.current().span;
        let ty = self.parse_type()?;
        let name = self.parse_ident()?;

        if self.consume(&TokenKind::LParen) {
            let formals = self.parse_formals()?;
            self.expect(TokenKind::RParen, SYNTAX_ERROR)?;

            if !self.check(&TokenKind::LBrace) {
                return Err(self.error(SYNTAX_ERROR));
            }
            let body = self.parse_block()?;

            return Ok(Decl::Fn(FnDecl {
                name,
                return_type: ty,
                formals,
                body,
                span: start,
            }));
        }

        self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
        Ok(Decl::Var(VarDecl { name, ty, span: start }))
    }

    fn parse_formals(&mut self) -> Result<Vec<VarDecl>> {
        let mut formals = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(formals);
        }

        loop {
            formals.push(self.parse_var_decl()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(formals)
    }

    /// `type ident` where the type may not be `void`
    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let start = self.current().span;
        let ty = match self.current_kind().as_type() {
            Some(ty) if ty != Type::Void => ty,
            _ => return Err(self.error(SYNTAX_ERROR)),
        };
        self.advance();
        let name = self.parse_ident()?;
        Ok(VarDecl { name, ty, span: start })
    }

    fn parse_type(&mut self) -> Result<Type> {
        match self.current_kind().as_type() {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None => Err(self.error("Expected type")),
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident {
                    name: name.clone(),
                    span: token.span,
                })
            }
            _ => Err(self.error(SYNTAX_ERROR)),
        }
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LBrace, SYNTAX_ERROR)?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::RBrace, SYNTAX_ERROR)?;
        Ok(Block { stmts, span: start })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            // `else` is only legal right after an if's then-branch
            TokenKind::Else => Err(Self::error_at(self.current(), SYNTAX_ERROR, true)),
            TokenKind::Print => self.parse_print_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Int | TokenKind::Double | TokenKind::Bool | TokenKind::String => {
                let var = self.parse_var_decl()?;
                self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
                Ok(Stmt::VarDecl(var))
            }
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Break => {
                let span = self.advance().span;
                self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
                Ok(Stmt::Break { span })
            }
            TokenKind::Continue => {
                let span = self.advance().span;
                self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
                Ok(Stmt::Continue { span })
            }
            _ => {
                // Assignment, call, or a bare expression such as `a;`
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_print_stmt(&mut self) -> Result<Stmt> {
        let span = self.advance().span;
        self.expect(TokenKind::LParen, SYNTAX_ERROR)?;

        let mut args = vec![self.parse_expr()?];
        while self.consume(&TokenKind::Comma) {
            args.push(self.parse_expr()?);
        }

        self.expect(TokenKind::RParen, SYNTAX_ERROR)?;
        self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
        Ok(Stmt::Print { args, span })
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let span = self.advance().span;

        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };

        self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;
        Ok(Stmt::Return { expr, span })
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt> {
        let span = self.advance().span;
        self.expect(TokenKind::LParen, "syntax error: expected '(' after 'while'")?;
        let test = self.parse_expr()?;
        self.expect(TokenKind::RParen, "syntax error: expected ')'")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { test, body, span })
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt> {
        let span = self.advance().span;
        self.expect(TokenKind::LParen, "syntax error: expected '(' after 'for'")?;

        let init = self.parse_optional_expr(&TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, SYNTAX_ERROR)?;

        let test = self.parse_optional_expr(&TokenKind::Semicolon)?;
        self.expect(TokenKind::Semicolon, "syntax error: expected ';' after test")?;

        let step = self.parse_optional_expr(&TokenKind::RParen)?;
        self.expect(TokenKind::RParen, "syntax error: expected ')' after for clauses")?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For { init, test, step, body, span })
    }

    fn parse_optional_expr(&mut self, terminator: &TokenKind) -> Result<Option<Expr>> {
        if self.check(terminator) {
            Ok(None)
        } else {
            self.parse_expr().map(Some)
        }
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let span = self.advance().span;
        self.expect(TokenKind::LParen, SYNTAX_ERROR)?;
        let test = self.parse_expr()?;
        self.expect(TokenKind::RParen, SYNTAX_ERROR)?;

        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.consume(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };

        Ok(Stmt::If { test, then_branch, else_branch, span })
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> Result<Expr> {
        let is_assignment = matches!(self.current_kind(), TokenKind::Ident(_))
            && matches!(self.peek_kind(), Some(TokenKind::Eq));

        if !is_assignment {
            return self.parse_logical();
        }

        let target = self.parse_ident()?;
        let op_span = self.advance().span;
        let value = self.parse_expr()?;

        Ok(Expr::Assign {
            span: target.span.merge(&value.span()),
            target,
            value: Box::new(value),
            op_span,
        })
    }

    /// `&&` and `||` chain to the right
    fn parse_logical(&mut self) -> Result<Expr> {
        let left = self.parse_equality()?;

        match self.current_operator(&[Operator::And, Operator::Or]) {
            Some(op) => {
                let op_span = self.advance().span;
                let right = self.parse_logical()?;
                Ok(Expr::Logical {
                    span: left.span().merge(&right.span()),
                    left: Some(Box::new(left)),
                    op,
                    right: Box::new(right),
                    op_span,
                })
            }
            None => Ok(left),
        }
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational()?;

        while let Some(op) = self.current_operator(&[Operator::Eq, Operator::Ne]) {
            let op_span = self.advance().span;
            let right = self.parse_relational()?;
            left = Expr::Equality {
                span: left.span().merge(&right.span()),
                left: Box::new(left),
                op,
                right: Box::new(right),
                op_span,
            };
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut left = self.parse_arithmetic(1)?;

        while let Some(op) =
            self.current_operator(&[Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge])
        {
            let op_span = self.advance().span;
            let right = self.parse_arithmetic(1)?;
            left = Expr::Relational {
                span: left.span().merge(&right.span()),
                left: Box::new(left),
                op,
                right: Box::new(right),
                op_span,
            };
        }

        Ok(left)
    }

    /// Precedence climbing over `+ - * / %`
    fn parse_arithmetic(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        while let Some(prec) = self.current_kind().arithmetic_precedence() {
            if prec < min_prec {
                break;
            }

            let op_token = self.advance();
            let op = match Self::token_to_operator(&op_token.kind) {
                Some(op) => op,
                None => return Err(Self::error_at(&op_token, SYNTAX_ERROR, false)),
            };
            let right = self.parse_arithmetic(prec + 1)?;

            left = Expr::Arithmetic {
                span: left.span().merge(&right.span()),
                left: Box::new(left),
                op,
                right: Box::new(right),
                op_span: op_token.span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.current_kind() {
            TokenKind::Not => {
                let op_span = self.advance().span;
                let operand = self.parse_unary()?;
                Ok(Expr::Logical {
                    span: op_span.merge(&operand.span()),
                    left: None,
                    op: Operator::Not,
                    right: Box::new(operand),
                    op_span,
                })
            }
            TokenKind::Minus => {
                // Negation is `0 - e`, with a double zero for double literals
                let op_span = self.advance().span;
                let operand = self.parse_unary()?;
                let zero = match operand {
                    Expr::DoubleConstant { .. } => Expr::DoubleConstant { value: 0.0, span: op_span },
                    _ => Expr::IntConstant { value: 0, span: op_span },
                };
                Ok(Expr::Arithmetic {
                    span: op_span.merge(&operand.span()),
                    left: Box::new(zero),
                    op: Operator::Sub,
                    right: Box::new(operand),
                    op_span,
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let span = token.span;

        match token.kind {
            TokenKind::IntLit(value) => {
                self.advance();
                Ok(Expr::IntConstant { value, span })
            }
            TokenKind::DoubleLit(value) => {
                self.advance();
                Ok(Expr::DoubleConstant { value, span })
            }
            TokenKind::BoolLit(value) => {
                self.advance();
                Ok(Expr::BoolConstant { value, span })
            }
            TokenKind::StringLit(value) => {
                self.advance();
                Ok(Expr::StringConstant { value, span })
            }
            TokenKind::Ident(_) => {
                let ident = self.parse_ident()?;
                if self.consume(&TokenKind::LParen) {
                    self.parse_call(ident)
                } else {
                    Ok(Expr::FieldAccess(ident))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, SYNTAX_ERROR)?;
                Ok(expr)
            }
            TokenKind::ReadInteger => {
                self.advance();
                self.expect(TokenKind::LParen, SYNTAX_ERROR)?;
                self.expect(TokenKind::RParen, SYNTAX_ERROR)?;
                Ok(Expr::ReadInteger { span })
            }
            TokenKind::ReadLine => {
                self.advance();
                self.expect(TokenKind::LParen, SYNTAX_ERROR)?;
                self.expect(TokenKind::RParen, SYNTAX_ERROR)?;
                Ok(Expr::ReadLine { span })
            }
            _ => Err(self.error(SYNTAX_ERROR)),
        }
    }

    /// Parse the actuals of a call; the `(` is already consumed
    fn parse_call(&mut self, callee: Ident) -> Result<Expr> {
        let mut actuals = Vec::new();

        if !self.check(&TokenKind::RParen) {
            loop {
                actuals.push(self.parse_expr()?);
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let end = self.expect(TokenKind::RParen, SYNTAX_ERROR)?.span;

        Ok(Expr::Call {
            span: callee.span.merge(&end),
            callee,
            actuals,
        })
    }

    fn current_operator(&self, allowed: &[Operator]) -> Option<Operator> {
        Self::token_to_operator(self.current_kind()).filter(|op| allowed.contains(op))
    }

    fn token_to_operator(kind: &TokenKind) -> Option<Operator> {
        match kind {
            TokenKind::Plus => Some(Operator::Add),
            TokenKind::Minus => Some(Operator::Sub),
            TokenKind::Star => Some(Operator::Mul),
            TokenKind::Slash => Some(Operator::Div),
            TokenKind::Percent => Some(Operator::Mod),
            TokenKind::Lt => Some(Operator::Lt),
            TokenKind::Le => Some(Operator::Le),
            TokenKind::Gt => Some(Operator::Gt),
            TokenKind::Ge => Some(Operator::Ge),
            TokenKind::EqEq => Some(Operator::Eq),
            TokenKind::Ne => Some(Operator::Ne),
            TokenKind::AndAnd => Some(Operator::And),
            TokenKind::OrOr => Some(Operator::Or),
            TokenKind::Not => Some(Operator::Not),
            _ => None,
        }
    }
}

/// Parse a token stream into a program
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::from_tokens(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    fn parse(source: &str) -> Result<Program> {
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer);
        parser.parse_program()
    }

    /// Parse `source` as the body of `main` and return its first statement
    fn first_stmt(body: &str) -> Stmt {
        let program = parse(&format!("void main() {{ {} }}", body)).unwrap();
        match &program.decls[0] {
            Decl::Fn(func) => func.body.stmts[0].clone(),
            other => panic!("expected a function, got {:?}", other),
        }
    }

    fn first_expr(body: &str) -> Expr {
        match first_stmt(body) {
            Stmt::Expr(expr) => expr,
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    fn assigned_value(body: &str) -> Expr {
        match first_expr(body) {
            Expr::Assign { value, .. } => *value,
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_function() {
        let program = parse("void main() {}").unwrap();
        assert_eq!(program.decls.len(), 1);
        assert!(matches!(&program.decls[0], Decl::Fn(f) if f.name.name == "main" && f.return_type == Type::Void));
    }

    #[test]
    fn test_globals_and_formals() {
        let program = parse("int g;\nint add(int a, double b) { return a; }").unwrap();
        assert_eq!(program.decls.len(), 2);
        assert!(matches!(&program.decls[0], Decl::Var(v) if v.name.name == "g" && v.ty == Type::Int));
        match &program.decls[1] {
            Decl::Fn(func) => {
                assert_eq!(func.formals.len(), 2);
                assert_eq!(func.formals[1].ty, Type::Double);
                assert_eq!(func.span.line, 2);
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        match assigned_value("x = 1 + 2 * 3;") {
            Expr::Arithmetic { left, op: Operator::Add, right, .. } => {
                assert!(matches!(*left, Expr::IntConstant { value: 1, .. }));
                assert!(matches!(*right, Expr::Arithmetic { op: Operator::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        match assigned_value("x = a - b - c;") {
            Expr::Arithmetic { left, op: Operator::Sub, right, .. } => {
                assert!(matches!(*left, Expr::Arithmetic { op: Operator::Sub, .. }));
                assert!(matches!(*right, Expr::FieldAccess(ref id) if id.name == "c"));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_comparison_layers() {
        // (((a < b) == c) && d)
        match assigned_value("x = a < b == c && d;") {
            Expr::Logical { left: Some(left), op: Operator::And, .. } => match *left {
                Expr::Equality { left, op: Operator::Eq, .. } => {
                    assert!(matches!(*left, Expr::Relational { op: Operator::Lt, .. }));
                }
                other => panic!("unexpected tree {:?}", other),
            },
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_unary_operators() {
        match assigned_value("x = -y;") {
            Expr::Arithmetic { left, op: Operator::Sub, .. } => {
                assert!(matches!(*left, Expr::IntConstant { value: 0, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }

        match assigned_value("x = -2.5;") {
            Expr::Arithmetic { left, .. } => {
                assert!(matches!(*left, Expr::DoubleConstant { .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }

        match assigned_value("x = !a && b;") {
            Expr::Logical { left: Some(left), op: Operator::And, .. } => {
                assert!(matches!(*left, Expr::Logical { left: None, op: Operator::Not, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_expression() {
        match assigned_value("x = (1 + 2) * 3;") {
            Expr::Arithmetic { left, op: Operator::Mul, .. } => {
                assert!(matches!(*left, Expr::Arithmetic { op: Operator::Add, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_calls_and_reads() {
        match first_expr("foo(1, x, ReadInteger());") {
            Expr::Call { callee, actuals, .. } => {
                assert_eq!(callee.name, "foo");
                assert_eq!(actuals.len(), 3);
                assert!(matches!(actuals[2], Expr::ReadInteger { .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
        assert!(matches!(assigned_value("s = ReadLine();"), Expr::ReadLine { .. }));
    }

    #[test]
    fn test_bare_expression_statement() {
        assert!(matches!(first_expr("a;"), Expr::FieldAccess(ref id) if id.name == "a"));
    }

    #[test]
    fn test_statements() {
        assert!(matches!(first_stmt("if (a) x = 1; else x = 2;"), Stmt::If { else_branch: Some(_), .. }));
        assert!(matches!(first_stmt("while (a) { break; }"), Stmt::While { .. }));
        assert!(matches!(
            first_stmt("for (;;) continue;"),
            Stmt::For { init: None, test: None, step: None, .. }
        ));
        assert!(matches!(first_stmt("return;"), Stmt::Return { expr: None, .. }));
        assert!(matches!(first_stmt("Print(a, \"b\");"), Stmt::Print { ref args, .. } if args.len() == 2));
    }

    #[test]
    fn test_stray_else_is_underlined() {
        let err = parse("void main() {\n  else x = 1;\n}").unwrap_err();
        assert_eq!(
            err,
            Error::Syntax {
                message: "syntax error".to_string(),
                span: Span::new(2, 3, 6),
                underline: true,
            }
        );
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("void main() { int x; x = 1 }").unwrap_err();
        assert!(matches!(err, Error::Syntax { span, underline: false, .. } if span.start_col == 28));
    }

    #[test]
    fn test_while_message() {
        let err = parse("void main() { while x { } }").unwrap_err();
        assert_eq!(err.to_string(), "syntax error: expected '(' after 'while'");
    }

    #[test]
    fn test_void_formal_rejected() {
        assert!(parse("void f(void x) {}").is_err());
    }

    #[test]
    fn test_lexical_error_aborts() {
        let err = parse("void main() { int x; x = @; }").unwrap_err();
        assert_eq!(
            err,
            Error::Lexical {
                message: "Unrecognized char: '@'".to_string(),
                span: Span::new(1, 26, 26),
            }
        );
    }

    #[test]
    fn test_unexpected_eof() {
        let err = parse("void main() {").unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_top_level_needs_type() {
        let err = parse("main() {}").unwrap_err();
        assert_eq!(err.to_string(), "Expected type");
    }
}
