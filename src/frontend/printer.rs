//! AST printers
//!
//! - `dump` renders the indented tree listing, one node per line, each
//!   prefixed with its source line number.
//! - `render` writes canonical, fully parenthesized Decaf source.

use crate::frontend::ast::*;

/// Render the indented tree listing of a program
pub fn dump(program: &Program) -> String {
    let mut tree = TreeDump::default();
    tree.program(program);
    tree.finish()
}

/// Render a program back to canonical source
pub fn render(program: &Program) -> String {
    let mut writer = SourceWriter::default();
    writer.program(program);
    writer.output
}

/// Format a double so that it lexes back as a double literal
fn format_double(value: f64) -> String {
    let text = format!("{:?}", value);
    match text.split_once('e') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{}.0e{}", mantissa, exp),
        _ => text,
    }
}

// ==================== Tree Dump ====================

#[derive(Default)]
struct TreeDump {
    lines: Vec<String>,
}

impl TreeDump {
    fn finish(self) -> String {
        let mut out = String::from("\n");
        out.push_str(&self.lines.join("\n"));
        out
    }

    /// Emit one line. `label` names the role the node plays in its parent.
    fn line(&mut self, line: Option<usize>, level: usize, label: Option<&str>, text: &str) {
        let prefix = match line {
            Some(n) => format!("{:>3}", n),
            None => "   ".to_string(),
        };
        let mut text = match label {
            Some(label) => format!("{} {}", label, text),
            None => text.to_string(),
        };
        if text.ends_with(':') {
            text.push(' ');
        }
        self.lines.push(format!("{}{}{}", prefix, " ".repeat(level * 3), text));
    }

    fn program(&mut self, program: &Program) {
        self.line(None, 0, None, "Program:");
        for decl in &program.decls {
            match decl {
                Decl::Var(var) => self.var_decl(var, 1, None),
                Decl::Fn(func) => self.fn_decl(func, 1),
            }
        }
    }

    fn var_decl(&mut self, var: &VarDecl, level: usize, label: Option<&str>) {
        self.line(Some(var.span.line), level, label, "VarDecl:");
        self.line(None, level + 1, None, &format!("Type: {}", var.ty));
        self.ident(&var.name, level + 1);
    }

    fn ident(&mut self, ident: &Ident, level: usize) {
        self.line(Some(ident.span.line), level, None, &format!("Identifier: {}", ident.name));
    }

    fn fn_decl(&mut self, func: &FnDecl, level: usize) {
        self.line(Some(func.span.line), level, None, "FnDecl:");
        self.line(None, level + 1, Some("(return type)"), &format!("Type: {}", func.return_type));
        self.ident(&func.name, level + 1);
        for formal in &func.formals {
            self.var_decl(formal, level + 1, Some("(formals)"));
        }
        self.block(&func.body, level + 1, Some("(body)"));
    }

    fn block(&mut self, block: &Block, level: usize, label: Option<&str>) {
        self.line(None, level, label, "StmtBlock:");
        for stmt in &block.stmts {
            self.stmt(stmt, level + 1, None);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, level: usize, label: Option<&str>) {
        match stmt {
            Stmt::VarDecl(var) => self.var_decl(var, level, label),
            Stmt::Block(block) => self.block(block, level, label),
            Stmt::Print { args, .. } => {
                self.line(None, level, label, "PrintStmt:");
                for arg in args {
                    self.expr(arg, level + 1, Some("(args)"));
                }
            }
            Stmt::Return { expr, span } => {
                self.line(Some(span.line), level, label, "ReturnStmt:");
                self.optional(expr.as_ref(), level + 1, None);
            }
            Stmt::If { test, then_branch, else_branch, .. } => {
                self.line(None, level, label, "IfStmt:");
                self.expr(test, level + 1, Some("(test)"));
                self.stmt(then_branch, level + 1, Some("(then)"));
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch, level + 1, Some("(else)"));
                }
            }
            Stmt::While { test, body, .. } => {
                self.line(None, level, label, "WhileStmt:");
                self.expr(test, level + 1, Some("(test)"));
                self.stmt(body, level + 1, Some("(body)"));
            }
            Stmt::For { init, test, step, body, .. } => {
                self.line(None, level, label, "ForStmt:");
                self.optional(init.as_ref(), level + 1, Some("(init)"));
                self.optional(test.as_ref(), level + 1, Some("(test)"));
                self.optional(step.as_ref(), level + 1, Some("(step)"));
                self.stmt(body, level + 1, Some("(body)"));
            }
            Stmt::Break { span } => self.line(Some(span.line), level, label, "BreakStmt:"),
            Stmt::Continue { span } => self.line(Some(span.line), level, label, "ContinueStmt:"),
            Stmt::Expr(expr) => self.expr(expr, level, label),
        }
    }

    fn optional(&mut self, expr: Option<&Expr>, level: usize, label: Option<&str>) {
        match expr {
            Some(expr) => self.expr(expr, level, label),
            None => self.line(None, level, label, "Empty:"),
        }
    }

    fn expr(&mut self, expr: &Expr, level: usize, label: Option<&str>) {
        let line = Some(expr.line());
        match expr {
            Expr::IntConstant { value, .. } => {
                self.line(line, level, label, &format!("IntConstant: {}", value))
            }
            Expr::DoubleConstant { value, .. } => {
                self.line(line, level, label, &format!("DoubleConstant: {}", format_double(*value)))
            }
            Expr::BoolConstant { value, .. } => {
                self.line(line, level, label, &format!("BoolConstant: {}", value))
            }
            Expr::StringConstant { value, .. } => {
                self.line(line, level, label, &format!("StringConstant: \"{}\"", value))
            }
            Expr::FieldAccess(ident) => self.field_access(ident, level, label),
            Expr::Call { callee, actuals, .. } => {
                self.line(line, level, label, "Call:");
                self.ident(callee, level + 1);
                for actual in actuals {
                    self.expr(actual, level + 1, Some("(actuals)"));
                }
            }
            Expr::Arithmetic { left, op, right, op_span, .. } => {
                self.line(line, level, label, "ArithmeticExpr:");
                self.expr(left, level + 1, None);
                self.operator(*op, op_span.line, level + 1);
                self.expr(right, level + 1, None);
            }
            Expr::Relational { left, op, right, op_span, .. } => {
                self.line(line, level, label, "RelationalExpr:");
                self.expr(left, level + 1, None);
                self.operator(*op, op_span.line, level + 1);
                self.expr(right, level + 1, None);
            }
            Expr::Equality { left, op, right, op_span, .. } => {
                self.line(line, level, label, "EqualityExpr:");
                self.expr(left, level + 1, None);
                self.operator(*op, op_span.line, level + 1);
                self.expr(right, level + 1, None);
            }
            Expr::Logical { left, op, right, op_span, .. } => {
                self.line(line, level, label, "LogicalExpr:");
                if let Some(left) = left {
                    self.expr(left, level + 1, None);
                }
                self.operator(*op, op_span.line, level + 1);
                self.expr(right, level + 1, None);
            }
            Expr::ReadInteger { .. } => self.line(line, level, label, "ReadIntegerExpr:"),
            Expr::ReadLine { .. } => self.line(line, level, label, "ReadLineExpr:"),
            Expr::Assign { target, value, op_span, .. } => {
                self.line(line, level, label, "AssignExpr:");
                self.field_access(target, level + 1, None);
                self.line(Some(op_span.line), level + 1, None, "Operator: =");
                self.expr(value, level + 1, None);
            }
        }
    }

    fn field_access(&mut self, ident: &Ident, level: usize, label: Option<&str>) {
        self.line(Some(ident.span.line), level, label, "FieldAccess:");
        self.ident(ident, level + 1);
    }

    fn operator(&mut self, op: Operator, line: usize, level: usize) {
        self.line(Some(line), level, None, &format!("Operator: {}", op));
    }
}

// ==================== Source Rendering ====================

#[derive(Default)]
struct SourceWriter {
    output: String,
    indent: usize,
}

impl SourceWriter {
    /// Write indented line
    fn writeln(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn program(&mut self, program: &Program) {
        for decl in &program.decls {
            match decl {
                Decl::Var(var) => self.writeln(&format!("{};", Self::var_decl(var))),
                Decl::Fn(func) => {
                    let formals: Vec<String> = func.formals.iter().map(Self::var_decl).collect();
                    let head = format!(
                        "{} {}({})",
                        func.return_type,
                        func.name.name,
                        formals.join(", ")
                    );
                    self.block(&head, &func.body);
                }
            }
        }
    }

    fn var_decl(var: &VarDecl) -> String {
        format!("{} {}", var.ty, var.name.name)
    }

    /// `head {` ... `}`; an empty head writes a bare block
    fn block(&mut self, head: &str, block: &Block) {
        if head.is_empty() {
            self.writeln("{");
        } else {
            self.writeln(&format!("{} {{", head));
        }
        self.indent += 1;
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.writeln("}");
    }

    /// A branch or loop body under `head`
    fn body(&mut self, head: &str, body: &Stmt) {
        match body {
            Stmt::Block(block) => self.block(head, block),
            _ => {
                self.writeln(head);
                self.indent += 1;
                self.stmt(body);
                self.indent -= 1;
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(var) => self.writeln(&format!("{};", Self::var_decl(var))),
            Stmt::Block(block) => self.block("", block),
            Stmt::Print { args, .. } => {
                let args: Vec<String> = args.iter().map(Self::expr).collect();
                self.writeln(&format!("Print({});", args.join(", ")));
            }
            Stmt::Return { expr: Some(expr), .. } => {
                self.writeln(&format!("return {};", Self::top_expr(expr)))
            }
            Stmt::Return { expr: None, .. } => self.writeln("return;"),
            Stmt::If { test, then_branch, else_branch, .. } => {
                self.body(&format!("if ({})", Self::top_expr(test)), then_branch);
                if let Some(else_branch) = else_branch {
                    self.body("else", else_branch);
                }
            }
            Stmt::While { test, body, .. } => {
                self.body(&format!("while ({})", Self::top_expr(test)), body);
            }
            Stmt::For { init, test, step, body, .. } => {
                let clause = |e: &Option<Expr>| e.as_ref().map(Self::top_expr).unwrap_or_default();
                let head = format!("for ({}; {}; {})", clause(init), clause(test), clause(step));
                self.body(&head, body);
            }
            Stmt::Break { .. } => self.writeln("break;"),
            Stmt::Continue { .. } => self.writeln("continue;"),
            Stmt::Expr(expr) => self.writeln(&format!("{};", Self::top_expr(expr))),
        }
    }

    /// An expression in statement position, where assignment needs no parentheses
    fn top_expr(expr: &Expr) -> String {
        match expr {
            Expr::Assign { target, value, .. } => format!("{} = {}", target.name, Self::top_expr(value)),
            _ => Self::expr(expr),
        }
    }

    fn expr(expr: &Expr) -> String {
        match expr {
            // `-1` would re-parse as `0 - 1`
            Expr::IntConstant { value, .. } if *value < 0 => format!("0x{:X}", *value as u32),
            Expr::IntConstant { value, .. } => value.to_string(),
            Expr::DoubleConstant { value, .. } => format_double(*value),
            Expr::BoolConstant { value, .. } => value.to_string(),
            Expr::StringConstant { value, .. } => format!("\"{}\"", value),
            Expr::FieldAccess(ident) => ident.name.clone(),
            Expr::Call { callee, actuals, .. } => {
                let actuals: Vec<String> = actuals.iter().map(Self::expr).collect();
                format!("{}({})", callee.name, actuals.join(", "))
            }
            Expr::Arithmetic { left, op, right, .. }
            | Expr::Relational { left, op, right, .. }
            | Expr::Equality { left, op, right, .. }
            | Expr::Logical { left: Some(left), op, right, .. } => {
                format!("({} {} {})", Self::expr(left), op, Self::expr(right))
            }
            Expr::Logical { left: None, op, right, .. } => format!("({}{})", op, Self::expr(right)),
            Expr::ReadInteger { .. } => "ReadInteger()".to_string(),
            Expr::ReadLine { .. } => "ReadLine()".to_string(),
            Expr::Assign { .. } => format!("({})", Self::top_expr(expr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        Parser::new(Lexer::new(source)).parse_program().unwrap()
    }

    #[test]
    fn test_dump_format() {
        let source = "int g;\nvoid main() {\n  int x;\n  x = 5 + g;\n  Print(x, \"hi\");\n  return;\n}";
        let expected = [
            "",
            "   Program: ",
            "  1   VarDecl: ",
            "         Type: int",
            "  1      Identifier: g",
            "  2   FnDecl: ",
            "         (return type) Type: void",
            "  2      Identifier: main",
            "         (body) StmtBlock: ",
            "  3         VarDecl: ",
            "               Type: int",
            "  3            Identifier: x",
            "  4         AssignExpr: ",
            "  4            FieldAccess: ",
            "  4               Identifier: x",
            "  4            Operator: =",
            "  4            ArithmeticExpr: ",
            "  4               IntConstant: 5",
            "  4               Operator: +",
            "  4               FieldAccess: ",
            "  4                  Identifier: g",
            "            PrintStmt: ",
            "  5            (args) FieldAccess: ",
            "  5               Identifier: x",
            "  5            (args) StringConstant: \"hi\"",
            "  6         ReturnStmt: ",
            "               Empty: ",
        ]
        .join("\n");
        assert_eq!(dump(&parse(source)), expected);
    }

    #[test]
    fn test_dump_empty_for_clauses() {
        let expected = [
            "",
            "   Program: ",
            "  1   FnDecl: ",
            "         (return type) Type: void",
            "  1      Identifier: main",
            "         (body) StmtBlock: ",
            "            ForStmt: ",
            "               (init) Empty: ",
            "               (test) Empty: ",
            "               (step) Empty: ",
            "  2            (body) BreakStmt: ",
        ]
        .join("\n");
        assert_eq!(dump(&parse("void main() {\n  for (;;) break;\n}")), expected);
    }

    #[test]
    fn test_dump_labels_children() {
        let out = dump(&parse("void f(int a) { if (!a) f(a); else while (true) { } }"));
        assert!(out.contains("  1      (formals) VarDecl: "));
        assert!(out.contains("            IfStmt: "));
        assert!(out.contains("  1            (test) LogicalExpr: "));
        assert!(out.contains("  1            (then) Call: "));
        assert!(out.contains("  1               (actuals) FieldAccess: "));
        assert!(out.contains("               (else) WhileStmt: "));
        assert!(out.contains("                  (body) StmtBlock: "));
    }

    #[test]
    fn test_render_canonical() {
        let program = parse("int g; int add(int a,int b){return a+b*2;} void main(){ if(g<1) g=add(1,2); else {Print(-g);} }");
        let expected = "\
int g;
int add(int a, int b) {
    return (a + (b * 2));
}
void main() {
    if ((g < 1))
        g = add(1, 2);
    else {
        Print((0 - g));
    }
}
";
        assert_eq!(render(&program), expected);
    }

    #[test]
    fn test_render_is_idempotent() {
        let source = "
            string s;
            bool check(double d, bool b) { return d >= 1.5e3 && !b || d == 0.25; }
            void main() {
                int i;
                for (i = 0; i < 10; i = i + 1) {
                    if (i % 2 == 0) continue;
                    while (check(i * 1.0, true)) break;
                }
                { int j; j = i = ReadInteger(); }
                s = ReadLine();
                Print(s, i, -3.5, \"done\");
                for (;;) return;
            }";
        let once = render(&parse(source));
        let twice = render(&parse(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_render_negative_hex_constant() {
        let once = render(&parse("void main() { int i; i = 0xFFFFFFFF + 0x10; }"));
        assert!(once.contains("i = (0xFFFFFFFF + 16);"), "{}", once);
        assert_eq!(render(&parse(&once)), once);
    }

    #[test]
    fn test_format_double() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(0.25), "0.25");
        assert_eq!(format_double(1e20), "1.0e20");
    }
}
