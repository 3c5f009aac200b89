//! MIPS Code Generator
//!
//! Lowers the analyzed AST to SPIM assembly. Each function body is lowered
//! into a buffer first; the prologue is written once the frame size is known.

use std::collections::HashMap;

use log::trace;

use super::context::{Base, FunctionContext, Slot};
use crate::backend::codegen::CodeGen;
use crate::frontend::ast::*;
use crate::types::Type;
use crate::utils::{Error, Result};

const PROLOGUE: [&str; 4] = [
    "\t  subu $sp, $sp, 8  # decrement sp to make space to save ra, fp",
    "\t  sw $fp, 8($sp)    # save fp",
    "\t  sw $ra, 4($sp)    # save ra",
    "\t  addiu $fp, $sp, 8 # set up new fp",
];

const EPILOGUE: [&str; 4] = [
    "\t  move $sp, $fp     # pop callee frame off stack",
    "\t  lw $ra, -4($fp)   # restore saved ra",
    "\t  lw $fp, 0($fp)    # restore saved fp",
    "\t  jr $ra        # return from function",
];

/// MIPS code generator
pub struct MipsCodeGen {
    target: String,
    output: String,
    /// Lowered body of the function being generated
    body: Vec<String>,
    /// Counters run across functions so names stay unique in the module
    temp_counter: usize,
    label_counter: usize,
    string_counter: usize,
    /// Literal text to data label
    string_pool: HashMap<String, String>,
    globals: HashMap<String, Slot>,
    /// Return type of every declared function
    functions: HashMap<String, Type>,
    ctx: FunctionContext,
}

impl MipsCodeGen {
    pub fn new() -> Self {
        Self {
            target: "mips32-spim".to_string(),
            output: String::new(),
            body: Vec::new(),
            temp_counter: 0,
            label_counter: 0,
            string_counter: 0,
            string_pool: HashMap::new(),
            globals: HashMap::new(),
            functions: HashMap::new(),
            ctx: FunctionContext::new(&[]),
        }
    }

    fn reset(&mut self) {
        self.output.clear();
        self.body.clear();
        self.temp_counter = 0;
        self.label_counter = 0;
        self.string_counter = 0;
        self.string_pool.clear();
        self.globals.clear();
        self.functions.clear();
    }

    /// Write a line to the module
    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    /// Append a line to the current function body
    fn emit(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    fn fresh_temp(&mut self, ty: Type) -> Slot {
        let name = format!("_tmp{}", self.temp_counter);
        self.temp_counter += 1;
        self.ctx.temp(&name, ty)
    }

    fn fresh_label(&mut self) -> String {
        let label = format!("_L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    /// `main` keeps its name. Runtime routines and generated labels use a
    /// single `_` before a letter, so user functions take `__`.
    fn function_label(name: &str) -> String {
        if name == "main" {
            name.to_string()
        } else {
            format!("__{}", name)
        }
    }

    fn lookup(&self, ident: &Ident) -> Result<Slot> {
        self.ctx
            .lookup(&ident.name)
            .or_else(|| self.globals.get(&ident.name))
            .cloned()
            .ok_or_else(|| Error::Codegen {
                message: format!("no storage for '{}'", ident.name),
            })
    }

    fn returned(slot: Option<Slot>, callee: &str) -> Result<Slot> {
        slot.ok_or_else(|| Error::Codegen {
            message: format!("'{}' returns no value", callee),
        })
    }

    // ==================== Functions ====================

    fn gen_function(&mut self, func: &FnDecl) -> Result<()> {
        self.ctx = FunctionContext::new(&func.formals);
        self.body.clear();
        let first_temp = self.temp_counter;

        self.ctx.push_scope();
        for stmt in &func.body.stmts {
            self.gen_stmt(stmt)?;
        }
        self.ctx.pop_scope();

        let frame_size = self.ctx.frame_size();
        trace!(
            "{}: frame {} bytes, temps _tmp{}.._tmp{}",
            func.name.name,
            frame_size,
            first_temp,
            self.temp_counter
        );

        self.writeln(&format!("  {}:", Self::function_label(&func.name.name)));
        self.writeln(&format!("    # BeginFunc {}", frame_size));
        for line in PROLOGUE {
            self.writeln(line);
        }
        self.writeln(&format!(
            "\t  subu $sp, $sp, {} # decrement sp to make space for locals/temps",
            frame_size
        ));

        let body = std::mem::take(&mut self.body);
        for line in &body {
            self.writeln(line);
        }

        self.writeln("    # EndFunc");
        self.writeln("    # (below handles reaching end of fn body with no explicit return)");
        for line in EPILOGUE {
            self.writeln(line);
        }
        Ok(())
    }

    // ==================== Statements ====================

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl(var) => {
                self.ctx.declare_local(&var.name.name, var.ty);
            }
            Stmt::Block(block) => {
                self.ctx.push_scope();
                for stmt in &block.stmts {
                    self.gen_stmt(stmt)?;
                }
                self.ctx.pop_scope();
            }
            Stmt::Print { args, .. } => {
                for arg in args {
                    let value = self.gen_expr(arg)?;
                    let routine = match value.ty {
                        Type::Int => "_PrintInt",
                        Type::String => "_PrintString",
                        Type::Bool => "_PrintBool",
                        Type::Double => "_PrintDouble",
                        other => {
                            return Err(Error::Codegen {
                                message: format!("cannot print a value of type {}", other),
                            })
                        }
                    };
                    self.push_param(&value);
                    self.call(routine, Type::Void, 1);
                }
            }
            Stmt::Return { expr, .. } => {
                match expr {
                    Some(expr) => {
                        let value = self.gen_expr(expr)?;
                        self.emit(format!("\t# Return {}", value.name));
                        self.emit(value.fill("$t2"));
                        self.emit("\t  move $v0, $t2\t\t# assign return value into $v0");
                    }
                    None => self.emit("\t# Return"),
                }
                for line in EPILOGUE {
                    self.emit(line);
                }
            }
            Stmt::If { test, then_branch, else_branch, .. } => {
                let cond = self.gen_expr(test)?;
                let else_label = self.fresh_label();
                self.branch_if_zero(&cond, &else_label);
                self.gen_body(then_branch)?;

                match else_branch {
                    Some(else_branch) => {
                        let end_label = self.fresh_label();
                        self.goto(&end_label);
                        self.label(&else_label);
                        self.gen_body(else_branch)?;
                        self.label(&end_label);
                    }
                    None => self.label(&else_label),
                }
            }
            Stmt::While { test, body, .. } => {
                let top = self.fresh_label();
                let bottom = self.fresh_label();

                self.label(&top);
                let cond = self.gen_expr(test)?;
                self.branch_if_zero(&cond, &bottom);
                self.gen_loop_body(body, &bottom, &top)?;
                self.goto(&top);
                self.label(&bottom);
            }
            Stmt::For { init, test, step, body, .. } => {
                if let Some(init) = init {
                    self.gen_effect(init)?;
                }

                let top = self.fresh_label();
                let next = self.fresh_label();
                let bottom = self.fresh_label();

                self.label(&top);
                if let Some(test) = test {
                    let cond = self.gen_expr(test)?;
                    self.branch_if_zero(&cond, &bottom);
                }
                self.gen_loop_body(body, &bottom, &next)?;

                // `continue` lands here so the step still runs
                self.label(&next);
                if let Some(step) = step {
                    self.gen_effect(step)?;
                }
                self.goto(&top);
                self.label(&bottom);
            }
            Stmt::Break { .. } => {
                let target = self.ctx.break_label.clone().ok_or_else(|| Error::Codegen {
                    message: "break outside of a loop".to_string(),
                })?;
                self.emit(format!("\t# Break: jump to {}", target));
                self.emit(format!("\t  b {}\t\t# break jumps to end of loop", target));
            }
            Stmt::Continue { .. } => {
                let target = self.ctx.continue_label.clone().ok_or_else(|| Error::Codegen {
                    message: "continue outside of a loop".to_string(),
                })?;
                self.emit(format!("\t# Continue: jump to {}", target));
                self.emit(format!("\t  b {}\t\t# continue jumps to next iteration", target));
            }
            Stmt::Expr(expr) => self.gen_effect(expr)?,
        }
        Ok(())
    }

    /// A branch body gets its own scope even when it is a lone statement
    fn gen_body(&mut self, stmt: &Stmt) -> Result<()> {
        self.ctx.push_scope();
        let result = self.gen_stmt(stmt);
        self.ctx.pop_scope();
        result
    }

    fn gen_loop_body(&mut self, body: &Stmt, break_to: &str, continue_to: &str) -> Result<()> {
        let saved_break = self.ctx.break_label.replace(break_to.to_string());
        let saved_continue = self.ctx.continue_label.replace(continue_to.to_string());

        let result = self.gen_body(body);

        self.ctx.break_label = saved_break;
        self.ctx.continue_label = saved_continue;
        result
    }

    /// Evaluate an expression for its side effects; void calls are fine here
    fn gen_effect(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Call { callee, actuals, .. } => {
                self.gen_call(callee, actuals)?;
            }
            _ => {
                self.gen_expr(expr)?;
            }
        }
        Ok(())
    }

    fn branch_if_zero(&mut self, cond: &Slot, label: &str) {
        self.emit(format!("\t# IfZ {} Goto {}", cond.name, label));
        self.emit(cond.fill("$t0"));
        self.emit(format!("\t  beqz $t0, {}\t# branch if {} is zero", label, cond.name));
    }

    fn goto(&mut self, label: &str) {
        self.emit(format!("\t# Goto {}", label));
        self.emit(format!("\t  b {}\t\t# unconditional branch", label));
    }

    fn label(&mut self, label: &str) {
        self.emit(format!("  {}:", label));
    }

    // ==================== Expressions ====================

    /// Lower an expression, returning the slot that holds its value
    fn gen_expr(&mut self, expr: &Expr) -> Result<Slot> {
        match expr {
            Expr::IntConstant { value, .. } => Ok(self.load_constant(Type::Int, &value.to_string())),
            Expr::BoolConstant { value, .. } => {
                Ok(self.load_constant(Type::Bool, if *value { "1" } else { "0" }))
            }
            Expr::DoubleConstant { value, .. } => Ok(self.load_double(*value)),
            Expr::StringConstant { value, .. } => Ok(self.load_string(value)),
            Expr::FieldAccess(ident) => self.lookup(ident),
            Expr::Call { callee, actuals, .. } => {
                let slot = self.gen_call(callee, actuals)?;
                Self::returned(slot, &callee.name)
            }
            Expr::Arithmetic { left, op, right, .. }
            | Expr::Relational { left, op, right, .. }
            | Expr::Equality { left, op, right, .. }
            | Expr::Logical { left: Some(left), op, right, .. } => {
                let l = self.gen_expr(left)?;
                let r = self.gen_expr(right)?;
                Ok(self.binary(&l, *op, &r))
            }
            Expr::Logical { left: None, right, .. } => {
                // `!x` is `x == 0`
                let operand = self.gen_expr(right)?;
                let zero = self.load_constant(Type::Int, "0");
                Ok(self.binary(&operand, Operator::Eq, &zero))
            }
            Expr::ReadInteger { .. } => {
                let slot = self.call("_ReadInteger", Type::Int, 0);
                Self::returned(slot, "ReadInteger")
            }
            Expr::ReadLine { .. } => {
                let slot = self.call("_ReadLine", Type::String, 0);
                Self::returned(slot, "ReadLine")
            }
            Expr::Assign { target, value, .. } => {
                let src = self.gen_expr(value)?;
                let dst = self.lookup(target)?;
                self.emit(format!("\t# {} = {}", dst.name, src.name));
                self.emit(src.fill("$t2"));
                self.emit(dst.spill("$t2"));
                Ok(dst)
            }
        }
    }

    fn load_constant(&mut self, ty: Type, value: &str) -> Slot {
        let tmp = self.fresh_temp(ty);
        self.emit(format!("\t# {} = {}", tmp.name, value));
        self.emit(format!("\t  li $t2, {}\t\t# load constant value {} into $t2", value, value));
        self.emit(tmp.spill("$t2"));
        tmp
    }

    fn load_double(&mut self, value: f64) -> Slot {
        let tmp = self.fresh_temp(Type::Double);
        self.emit(format!("\t# {} = {:?}", tmp.name, value));
        self.emit(format!("\t  li.s $f0, {:?}\t\t# load constant value {:?} into $f0", value, value));
        self.emit("\t  mfc1 $t2, $f0\t\t# copy float bits to $t2");
        self.emit(tmp.spill("$t2"));
        tmp
    }

    /// Load the address of a pooled string; the first use emits its data
    fn load_string(&mut self, value: &str) -> Slot {
        let tmp = self.fresh_temp(Type::String);
        self.emit(format!("\t# {} = \"{}\"", tmp.name, value));

        let label = match self.string_pool.get(value) {
            Some(label) => label.clone(),
            None => {
                self.string_counter += 1;
                let label = format!("_string{}", self.string_counter);
                self.string_pool.insert(value.to_string(), label.clone());
                self.emit("\t  .data\t\t\t# create string constant marked with label");
                self.emit(format!("\t  {}: .asciiz \"{}\"", label, value));
                self.emit("\t  .text");
                label
            }
        };

        self.emit(format!("\t  la $t2, {}\t# load label", label));
        self.emit(tmp.spill("$t2"));
        tmp
    }

    fn binary(&mut self, l: &Slot, op: Operator, r: &Slot) -> Slot {
        let result_ty = match op {
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod => l.ty,
            _ => Type::Bool,
        };
        let res = self.fresh_temp(result_ty);

        self.emit(format!("\t# {} = {} {} {}", res.name, l.name, op, r.name));
        self.emit(l.fill("$t0"));
        self.emit(r.fill("$t1"));
        if l.ty == Type::Double {
            self.double_op(op);
        } else {
            self.int_op(op);
        }
        self.emit(res.spill("$t2"));
        res
    }

    /// `$t2 = $t0 op $t1` on words
    fn int_op(&mut self, op: Operator) {
        let instr = match op {
            Operator::Add => "add",
            Operator::Sub => "sub",
            Operator::Mul => "mul",
            Operator::Div => "div",
            Operator::Mod => "rem",
            Operator::Lt => "slt",
            Operator::Eq | Operator::Not => "seq",
            Operator::Ne => "sne",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Gt => {
                self.emit("\t  slt $t2, $t1, $t0");
                return;
            }
            Operator::Le | Operator::Ge => {
                let strict = if op == Operator::Le { "$t0, $t1" } else { "$t1, $t0" };
                self.emit(format!("\t  slt $t2, {}", strict));
                self.emit("\t  seq $t3, $t0, $t1");
                self.emit("\t  or $t2, $t2, $t3");
                return;
            }
        };
        self.emit(format!("\t  {} $t2, $t0, $t1", instr));
    }

    /// `$t2 = $t0 op $t1` on single-precision bit patterns
    fn double_op(&mut self, op: Operator) {
        let arith = match op {
            Operator::Add => "add.s",
            Operator::Sub => "sub.s",
            Operator::Mul => "mul.s",
            Operator::Div => "div.s",
            Operator::Mod => "div.s",
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge | Operator::Eq | Operator::Ne => {
                self.move_to_float();
                self.float_compare(op);
                return;
            }
            Operator::And | Operator::Or | Operator::Not => {
                self.int_op(op);
                return;
            }
        };

        self.move_to_float();
        self.emit(format!("\t  {} $f4, $f0, $f2", arith));
        if op == Operator::Mod {
            // a - trunc(a / b) * b
            self.emit("\t  trunc.w.s $f4, $f4");
            self.emit("\t  cvt.s.w $f4, $f4");
            self.emit("\t  mul.s $f4, $f4, $f2");
            self.emit("\t  sub.s $f4, $f0, $f4");
        }
        self.emit("\t  mfc1 $t2, $f4\t\t# copy result bits to $t2");
    }

    fn move_to_float(&mut self) {
        self.emit("\t  mtc1 $t0, $f0\t\t# move operands to float registers");
        self.emit("\t  mtc1 $t1, $f2");
    }

    fn float_compare(&mut self, op: Operator) {
        let (test, clear_when) = match op {
            Operator::Lt => ("c.lt.s $f0, $f2", "movf"),
            Operator::Gt => ("c.lt.s $f2, $f0", "movf"),
            Operator::Le => ("c.le.s $f0, $f2", "movf"),
            Operator::Ge => ("c.le.s $f2, $f0", "movf"),
            Operator::Ne => ("c.eq.s $f0, $f2", "movt"),
            _ => ("c.eq.s $f0, $f2", "movf"),
        };
        self.emit(format!("\t  {}", test));
        self.emit("\t  li $t2, 1");
        self.emit(format!("\t  {} $t2, $zero\t# zero the result on a failed test", clear_when));
    }

    // ==================== Calls ====================

    fn gen_call(&mut self, callee: &Ident, actuals: &[Expr]) -> Result<Option<Slot>> {
        let return_type = *self.functions.get(&callee.name).ok_or_else(|| Error::Codegen {
            message: format!("call to unknown function '{}'", callee.name),
        })?;

        let args = actuals
            .iter()
            .map(|actual| self.gen_expr(actual))
            .collect::<Result<Vec<_>>>()?;

        // Right to left, so the callee sees its first formal at $fp+4
        for arg in args.iter().rev() {
            self.push_param(arg);
        }

        Ok(self.call(&Self::function_label(&callee.name), return_type, args.len()))
    }

    fn push_param(&mut self, value: &Slot) {
        self.emit(format!("\t# PushParam {}", value.name));
        self.emit("\t  subu $sp, $sp, 4\t# decrement sp to make space for param");
        self.emit(value.fill("$t0"));
        self.emit("\t  sw $t0, 4($sp)\t# copy param value to stack");
    }

    /// Call `label` with `param_count` words already pushed
    fn call(&mut self, label: &str, return_type: Type, param_count: usize) -> Option<Slot> {
        let result = if return_type == Type::Void {
            self.emit(format!("\t# LCall {}", label));
            self.emit(format!("\t  jal {}\t\t# jump to function", label));
            None
        } else {
            let tmp = self.fresh_temp(return_type);
            self.emit(format!("\t# {} = LCall {}", tmp.name, label));
            self.emit(format!("\t  jal {}\t\t# jump to function", label));
            self.emit("\t  move $t2, $v0\t\t# copy function return value from $v0");
            self.emit(tmp.spill("$t2"));
            Some(tmp)
        };

        if param_count > 0 {
            let bytes = param_count * 4;
            self.emit(format!("\t# PopParams {}", bytes));
            self.emit(format!("\t  add $sp, $sp, {}\t# pop params off stack", bytes));
        }
        result
    }
}

impl CodeGen for MipsCodeGen {
    fn generate(&mut self, program: &Program) -> Result<String> {
        let has_main = program
            .decls
            .iter()
            .any(|decl| matches!(decl, Decl::Fn(func) if func.name.name == "main"));
        if !has_main {
            return Err(Error::MissingMain);
        }

        self.reset();

        self.writeln("\t# standard Decaf preamble ");
        self.writeln("\t  .text");
        self.writeln("\t  .align 2");
        self.writeln("\t  .globl main");

        // Globals live at $gp+0, $gp+4, ... in declaration order
        let mut global_offset = 0;
        for decl in &program.decls {
            match decl {
                Decl::Var(var) => {
                    let slot = Slot::new(var.name.name.clone(), Base::Gp, global_offset, var.ty);
                    self.globals.insert(var.name.name.clone(), slot);
                    global_offset += 4;
                }
                Decl::Fn(func) => {
                    self.functions.insert(func.name.name.clone(), func.return_type);
                }
            }
        }

        for decl in &program.decls {
            if let Decl::Fn(func) = decl {
                self.gen_function(func)?;
            }
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn name(&self) -> &str {
        "mips"
    }
}

impl Default for MipsCodeGen {
    fn default() -> Self {
        Self::new()
    }
}
