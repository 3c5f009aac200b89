//! Semantic Analysis for Decaf
//!
//! Performs:
//! - Symbol table management (scopes, definitions)
//! - Name resolution for variables and functions
//! - Type checking of expressions, statements and calls
//!
//! Unlike the parser, the analyzer never stops at the first problem: every
//! error found during the walk is collected and returned.

use std::collections::HashMap;

use crate::frontend::ast::*;
use crate::types::Type;
use crate::utils::{Error, Result, Span};

// ==================== Symbol Table ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Span of the declaring identifier
    pub span: Span,
}

/// Kind of symbol
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Variable { ty: Type },
    Function { return_type: Type, formal_types: Vec<Type> },
}

/// A scope containing symbols
#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

/// Symbol table with nested scopes
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        // Create global scope
        let global = Scope {
            parent: None,
            symbols: HashMap::new(),
        };
        Self {
            scopes: vec![global],
            current: ScopeId(0),
        }
    }

    /// Enter a new scope
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            symbols: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Exit the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, symbol: Symbol) -> Result<()> {
        if let Some(previous) = self.lookup_local(&symbol.name) {
            return Err(Error::Redeclaration {
                name: symbol.name.clone(),
                previous_line: previous.span.line,
                span: symbol.span,
            });
        }
        self.scopes[self.current.0]
            .symbols
            .insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol, searching from current scope upward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(symbol);
            }
            scope_id = self.scopes[id.0].parent;
        }
        None
    }

    /// Look up a symbol only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes[self.current.0].symbols.get(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Semantic Analyzer ====================

/// Semantic analyzer
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    errors: Vec<Error>,
    /// Number of enclosing `while`/`for` bodies
    loop_depth: usize,
    /// Declared return type of the function being checked
    current_return: Type,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            errors: Vec::new(),
            loop_depth: 0,
            current_return: Type::Void,
        }
    }

    /// Analyze a program, returning every error found
    pub fn analyze(&mut self, program: &Program) -> Vec<Error> {
        // Pass 1: Collect all top-level definitions
        for decl in &program.decls {
            self.collect_definition(decl);
        }

        // Pass 2: Check function bodies
        for decl in &program.decls {
            if let Decl::Fn(func) = decl {
                self.check_function(func);
            }
        }

        std::mem::take(&mut self.errors)
    }

    fn report(&mut self, error: Error) {
        self.errors.push(error);
    }

    fn define(&mut self, name: &Ident, kind: SymbolKind) {
        let symbol = Symbol {
            name: name.name.clone(),
            kind,
            span: name.span,
        };
        if let Err(e) = self.symbols.define(symbol) {
            self.report(e);
        }
    }

    /// Collect a top-level definition
    fn collect_definition(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(var) => self.define(&var.name, SymbolKind::Variable { ty: var.ty }),
            Decl::Fn(func) => {
                let kind = SymbolKind::Function {
                    return_type: func.return_type,
                    formal_types: func.formals.iter().map(|f| f.ty).collect(),
                };
                self.define(&func.name, kind);
            }
        }
    }

    /// Type check a function
    fn check_function(&mut self, func: &FnDecl) {
        self.current_return = func.return_type;
        self.loop_depth = 0;

        // Parameters get their own scope, and the body is nested under it
        self.symbols.enter_scope();
        for formal in &func.formals {
            self.define(&formal.name, SymbolKind::Variable { ty: formal.ty });
        }

        self.symbols.enter_scope();
        for stmt in &func.body.stmts {
            self.check_stmt(stmt);
        }
        self.symbols.exit_scope();

        self.symbols.exit_scope();
    }

    // ==================== Statements ====================

    fn check_block(&mut self, block: &Block) {
        self.symbols.enter_scope();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.symbols.exit_scope();
    }

    /// A branch or loop body; a lone statement still gets its own scope
    fn check_body(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.check_block(block),
            _ => {
                self.symbols.enter_scope();
                self.check_stmt(stmt);
                self.symbols.exit_scope();
            }
        }
    }

    fn check_loop_body(&mut self, body: &Stmt) {
        self.loop_depth += 1;
        self.check_body(body);
        self.loop_depth -= 1;
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(var) => self.define(&var.name, SymbolKind::Variable { ty: var.ty }),
            Stmt::Block(block) => self.check_block(block),
            Stmt::Print { args, .. } => {
                for (i, arg) in args.iter().enumerate() {
                    let ty = self.check_expr(arg);
                    if !ty.is_error() && !ty.is_printable() {
                        self.report(Error::PrintArgType {
                            index: i + 1,
                            given: ty,
                            span: arg.span(),
                        });
                    }
                }
            }
            Stmt::Return { expr, span } => {
                let (given, span) = match expr {
                    Some(e) => (self.check_value(e), e.span()),
                    None => (Type::Void, *span),
                };
                if !given.compatible(&self.current_return) {
                    self.report(Error::IncompatibleReturn {
                        given,
                        expected: self.current_return,
                        span,
                    });
                }
            }
            Stmt::If { test, then_branch, else_branch, .. } => {
                self.check_test(test);
                self.check_body(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_body(else_branch);
                }
            }
            Stmt::While { test, body, .. } => {
                self.check_test(test);
                self.check_loop_body(body);
            }
            Stmt::For { init, test, step, body, .. } => {
                if let Some(init) = init {
                    self.check_expr(init);
                }
                if let Some(test) = test {
                    self.check_test(test);
                }
                if let Some(step) = step {
                    self.check_expr(step);
                }
                self.check_loop_body(body);
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    self.report(Error::BreakOutsideLoop { span: *span });
                }
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    self.report(Error::ContinueOutsideLoop { span: *span });
                }
            }
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_test(&mut self, test: &Expr) {
        let ty = self.check_expr(test);
        if !ty.compatible(&Type::Bool) {
            self.report(Error::TestNotBoolean { span: test.span() });
        }
    }

    // ==================== Expressions ====================

    /// Type check an expression. Ill-typed expressions yield `Type::Error`.
    fn check_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::IntConstant { .. } => Type::Int,
            Expr::DoubleConstant { .. } => Type::Double,
            Expr::BoolConstant { .. } => Type::Bool,
            Expr::StringConstant { .. } => Type::String,
            Expr::ReadInteger { .. } => Type::Int,
            Expr::ReadLine { .. } => Type::String,
            Expr::FieldAccess(ident) => self.resolve_variable(ident),
            Expr::Call { callee, actuals, .. } => self.check_call(callee, actuals),
            Expr::Arithmetic { left, op, right, op_span, .. } => {
                let (l, r) = (self.check_expr(left), self.check_expr(right));
                if l.is_error() || r.is_error() {
                    Type::Error
                } else if l == r && l.is_numeric() {
                    l
                } else {
                    self.incompatible_operands(l, *op, r, *op_span);
                    Type::Error
                }
            }
            Expr::Relational { left, op, right, op_span, .. } => {
                let (l, r) = (self.check_value(left), self.check_value(right));
                if !(l.is_error() || r.is_error()) && !(l == r && l.is_numeric()) {
                    self.incompatible_operands(l, *op, r, *op_span);
                }
                Type::Bool
            }
            Expr::Equality { left, op, right, op_span, .. } => {
                let (l, r) = (self.check_value(left), self.check_value(right));
                if !l.compatible(&r) {
                    self.incompatible_operands(l, *op, r, *op_span);
                }
                Type::Bool
            }
            Expr::Logical { left: Some(left), op, right, op_span, .. } => {
                let (l, r) = (self.check_expr(left), self.check_expr(right));
                if !l.compatible(&Type::Bool) || !r.compatible(&Type::Bool) {
                    self.incompatible_operands(l, *op, r, *op_span);
                }
                Type::Bool
            }
            Expr::Logical { left: None, op, right, op_span, .. } => {
                let ty = self.check_expr(right);
                if !ty.compatible(&Type::Bool) {
                    self.report(Error::IncompatibleOperand {
                        op: op.to_string(),
                        ty,
                        span: *op_span,
                    });
                }
                Type::Bool
            }
            Expr::Assign { target, value, op_span, .. } => {
                let target_ty = self.resolve_variable(target);
                let value_ty = self.check_value(value);
                if !target_ty.compatible(&value_ty) {
                    self.report(Error::IncompatibleOperands {
                        left: target_ty,
                        op: "=".to_string(),
                        right: value_ty,
                        span: *op_span,
                    });
                }
                target_ty
            }
        }
    }

    /// Type check an expression whose value is used; a void call or
    /// variable has none
    fn check_value(&mut self, expr: &Expr) -> Type {
        let ty = self.check_expr(expr);
        if ty == Type::Void {
            self.report(Error::VoidValue { span: expr.span() });
            return Type::Error;
        }
        ty
    }

    fn incompatible_operands(&mut self, left: Type, op: Operator, right: Type, span: Span) {
        self.report(Error::IncompatibleOperands {
            left,
            op: op.to_string(),
            right,
            span,
        });
    }

    /// Type of a variable reference; functions are not variables
    fn resolve_variable(&mut self, ident: &Ident) -> Type {
        if let Some(SymbolKind::Variable { ty }) = self.symbols.lookup(&ident.name).map(|s| &s.kind) {
            return *ty;
        }
        self.report(Error::UndeclaredVariable {
            name: ident.name.clone(),
            span: ident.span,
        });
        Type::Error
    }

    fn check_call(&mut self, callee: &Ident, actuals: &[Expr]) -> Type {
        let signature = match self.symbols.lookup(&callee.name).map(|s| &s.kind) {
            Some(SymbolKind::Function { return_type, formal_types }) => {
                Some((*return_type, formal_types.clone()))
            }
            _ => None,
        };

        let given: Vec<Type> = actuals.iter().map(|a| self.check_value(a)).collect();

        let (return_type, formal_types) = match signature {
            Some(signature) => signature,
            None => {
                self.report(Error::UndeclaredFunction {
                    name: callee.name.clone(),
                    span: callee.span,
                });
                return Type::Error;
            }
        };

        if given.len() != formal_types.len() {
            self.report(Error::ArgCountMismatch {
                name: callee.name.clone(),
                expected: formal_types.len(),
                given: given.len(),
                span: callee.span,
            });
            return return_type;
        }

        let pairs = actuals.iter().zip(given).zip(formal_types);
        for (i, ((actual, given), expected)) in pairs.enumerate() {
            if !given.compatible(&expected) {
                self.report(Error::ArgTypeMismatch {
                    index: i + 1,
                    given,
                    expected,
                    span: actual.span(),
                });
            }
        }

        return_type
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyze a parsed program with a fresh analyzer
pub fn analyze(program: &Program) -> Vec<Error> {
    SemanticAnalyzer::new().analyze(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use pretty_assertions::assert_eq;

    fn analyze(source: &str) -> Vec<Error> {
        let lexer = Lexer::new(source);
        let mut parser = Parser::new(lexer);
        let program = parser.parse_program().unwrap();
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.analyze(&program)
    }

    fn messages(source: &str) -> Vec<String> {
        analyze(source).iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_print_int_program() {
        assert!(analyze("void main() { int x; x = 5; Print(x); }").is_empty());
    }

    #[test]
    fn test_assign_string_to_int() {
        let errors = analyze("void main() { int x; x = \"hello\"; }");
        assert_eq!(
            errors,
            vec![Error::IncompatibleOperands {
                left: Type::Int,
                op: "=".to_string(),
                right: Type::String,
                span: Span::new(1, 24, 24),
            }]
        );
    }

    #[test]
    fn test_empty_return_in_int_function() {
        assert_eq!(
            messages("int main() { return; }"),
            vec!["Incompatible return: void given, int expected"]
        );
        assert_eq!(
            messages("int f() { return 1.5; } void main() { }"),
            vec!["Incompatible return: double given, int expected"]
        );
    }

    #[test]
    fn test_void_return_value() {
        let errors = analyze("void g() { }\nvoid main() { return g(); }");
        assert_eq!(errors, vec![Error::VoidValue { span: Span::new(2, 22, 24) }]);
        assert_eq!(
            messages("void g() { } int f() { return g(); } void main() { }"),
            vec!["Expression of type void has no value"]
        );
        assert!(analyze("void g() { } void main() { g(); return; }").is_empty());
    }

    #[test]
    fn test_void_operands() {
        let source = "
            void g() { }
            void main() {
                bool b; int i;
                b = g() == g();
                b = i != g();
                b = g() < i;
            }";
        assert_eq!(
            analyze(source).iter().map(|e| e.code()).collect::<Vec<_>>(),
            vec!["E0013", "E0013", "E0013", "E0013"]
        );
    }

    #[test]
    fn test_void_assignment_value() {
        assert_eq!(
            messages("void v;\nvoid g() { }\nvoid main() { v = g(); }"),
            vec!["Expression of type void has no value"]
        );
        assert_eq!(
            messages("void v; void w; void main() { v = w; }"),
            vec!["Expression of type void has no value"]
        );
        assert_eq!(
            messages("void v; void main() { v = 1; }"),
            vec!["Incompatible operands: void = int"]
        );
    }

    #[test]
    fn test_void_call_argument() {
        let errors = analyze("void g() { } int f(int a) { return a; } void main() { f(g()); }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Error::VoidValue { span } if span.start_col == 57));
    }

    #[test]
    fn test_break_and_continue_need_a_loop() {
        assert_eq!(
            messages("void main() { break; }"),
            vec!["break is only allowed inside a loop"]
        );
        assert_eq!(
            messages("void main() { if (true) continue; }"),
            vec!["continue is only allowed inside a loop"]
        );
        assert!(analyze("void main() { while (true) { for (;;) { break; } continue; } }").is_empty());
        // the depth counter drops back after the loop
        assert_eq!(analyze("void main() { while (true) break; break; }").len(), 1);
    }

    #[test]
    fn test_argument_count() {
        let errors = analyze("int foo(int a, int b) { return a + b; }\nvoid main() { foo(1); }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            Error::ArgCountMismatch { expected: 2, given: 1, span, .. } if span.line == 2
        ));
        assert_eq!(errors[0].to_string(), "Function 'foo' expects 2 arguments but 1 given");
    }

    #[test]
    fn test_argument_types() {
        assert_eq!(
            messages("void foo(int a, int b) { } void main() { foo(1, true); }"),
            vec!["Incompatible argument 2: bool given, int expected"]
        );
    }

    #[test]
    fn test_missing_main_is_not_semantic() {
        assert!(analyze("int g; void helper() { g = 1; }").is_empty());
    }

    #[test]
    fn test_forward_reference() {
        assert!(analyze("void main() { int x; x = later(2); } int later(int n) { return n * 2; }").is_empty());
    }

    #[test]
    fn test_undeclared_names() {
        let errors = analyze("void main() {\n  y = 1;\n}");
        assert_eq!(
            errors,
            vec![Error::UndeclaredVariable {
                name: "y".to_string(),
                span: Span::new(2, 3, 3),
            }]
        );
        assert_eq!(
            messages("void main() { nope(); }"),
            vec!["No declaration for Function 'nope' found"]
        );
    }

    #[test]
    fn test_functions_and_variables_do_not_mix() {
        assert_eq!(
            messages("int f() { return 1; } void main() { int x; x = f; }"),
            vec!["No declaration for Variable 'f' found"]
        );
        assert_eq!(
            messages("int g; void main() { g(); }"),
            vec!["No declaration for Function 'g' found"]
        );
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert_eq!(
            messages("void main() {\n  int x;\n  int x;\n}"),
            vec!["Declaration of 'x' here conflicts with declaration on line 2"]
        );
        assert_eq!(
            messages("int f;\nvoid f() { }\nvoid main() { }"),
            vec!["Declaration of 'f' here conflicts with declaration on line 1"]
        );
        assert_eq!(analyze("void f(int a, int a) { } void main() { }").len(), 1);
    }

    #[test]
    fn test_shadowing_is_allowed() {
        let source = "
            int x;
            void f(int a) { int a; }
            void main() {
                double x;
                while (true) { string x; x = \"s\"; }
                x = 1.5;
            }";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_loop_scope_is_popped() {
        assert_eq!(
            messages("void main() { while (true) { int y; } y = 1; }"),
            vec!["No declaration for Variable 'y' found"]
        );
    }

    #[test]
    fn test_sibling_blocks_reuse_names() {
        assert!(analyze("void main() { { int y; } { int y; } if (true) int z; else int z; }").is_empty());
    }

    #[test]
    fn test_operator_rules() {
        let source = "
            void main() {
                int i; double d; bool b; string s;
                i = i + d;
                b = b + b;
                b = s < s;
                b = i == d;
                b = i && b;
                b = !i;
                b = s == s;
                b = d <= d;
                d = d % d;
            }";
        assert_eq!(
            messages(source),
            vec![
                "Incompatible operands: int + double",
                "Incompatible operands: bool + bool",
                "Incompatible operands: string < string",
                "Incompatible operands: int == double",
                "Incompatible operands: int && bool",
                "Incompatible operand: ! int",
            ]
        );
    }

    #[test]
    fn test_operator_error_points_at_operator() {
        let errors = analyze("void main() { int i; i = i * true; }");
        assert!(matches!(&errors[0], Error::IncompatibleOperands { span, .. } if *span == Span::new(1, 28, 28)));
    }

    #[test]
    fn test_errors_do_not_cascade() {
        assert_eq!(
            messages("void main() { int x; x = y + 1 * 2; }"),
            vec!["No declaration for Variable 'y' found"]
        );
    }

    #[test]
    fn test_print_arguments() {
        assert_eq!(
            messages("void main() { double d; Print(1, d, \"s\", true); }"),
            vec!["Incompatible argument 2: double given, int/bool/string expected"]
        );
        assert_eq!(
            messages("void f() { } void main() { Print(f()); }"),
            vec!["Incompatible argument 1: void given, int/bool/string expected"]
        );
    }

    #[test]
    fn test_tests_must_be_boolean() {
        let errors = analyze("void main() { int x; if (x) x = 1; while (x + 1) { } for (; 1; ) { } }");
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, Error::TestNotBoolean { .. })));
        assert_eq!(errors[1].span(), Some(Span::new(1, 43, 47)));
    }

    #[test]
    fn test_reads() {
        assert!(analyze("void main() { int n; string s; n = ReadInteger(); s = ReadLine(); }").is_empty());
    }

    #[test]
    fn test_errors_in_every_function_are_reported() {
        let source = "
            void a() { int x; x = true; }
            void b() { break; }
            int c() { return \"no\"; }
            void main() { }";
        assert_eq!(analyze(source).len(), 3);
    }

    #[test]
    fn test_symbol_table_scopes() {
        let mut table = SymbolTable::new();
        let var = |name: &str, line| Symbol {
            name: name.to_string(),
            kind: SymbolKind::Variable { ty: Type::Int },
            span: Span::new(line, 1, 1),
        };

        table.define(var("x", 1)).unwrap();
        table.enter_scope();
        table.define(var("x", 2)).unwrap();
        assert_eq!(table.lookup("x").map(|s| s.span.line), Some(2));
        assert!(table.define(var("x", 3)).is_err());
        table.exit_scope();

        assert_eq!(table.lookup("x").map(|s| s.span.line), Some(1));
        assert!(table.lookup_local("y").is_none());
    }
}
