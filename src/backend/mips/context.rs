//! Storage bookkeeping for one function's stack frame

use std::collections::HashMap;

use crate::frontend::ast::VarDecl;
use crate::types::Type;

/// First free local slot, just below the saved `$fp`/`$ra` pair
const FIRST_LOCAL_OFFSET: i32 = -8;
const WORD: i32 = 4;

/// Base register a slot is addressed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Locals, parameters and temporaries
    Fp,
    /// Global variables
    Gp,
}

impl Base {
    pub fn register(&self) -> &'static str {
        match self {
            Base::Fp => "$fp",
            Base::Gp => "$gp",
        }
    }
}

/// A named 4-byte storage location
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub base: Base,
    pub offset: i32,
    pub ty: Type,
}

impl Slot {
    pub fn new(name: impl Into<String>, base: Base, offset: i32, ty: Type) -> Self {
        Self { name: name.into(), base, offset, ty }
    }

    /// Load this slot into `reg`
    pub fn fill(&self, reg: &str) -> String {
        let base = self.base.register();
        format!(
            "\t  lw {reg}, {off}({base})\t# fill {name} to {reg} from {base}{off:+}",
            reg = reg,
            off = self.offset,
            base = base,
            name = self.name,
        )
    }

    /// Store `reg` into this slot
    pub fn spill(&self, reg: &str) -> String {
        let base = self.base.register();
        format!(
            "\t  sw {reg}, {off}({base})\t# spill {name} from {reg} to {base}{off:+}",
            reg = reg,
            off = self.offset,
            base = base,
            name = self.name,
        )
    }
}

/// Per-function code generation state.
///
/// Created fresh for every function. Names resolve innermost scope first,
/// then fall back to the globals the generator tracks separately.
#[derive(Debug)]
pub struct FunctionContext {
    scopes: Vec<HashMap<String, Slot>>,
    /// Next free frame offset; grows downward
    frame_cursor: i32,
    pub break_label: Option<String>,
    pub continue_label: Option<String>,
}

impl FunctionContext {
    /// Bind the formals at `$fp+4`, `$fp+8`, ... in declaration order
    pub fn new(formals: &[VarDecl]) -> Self {
        let params = formals
            .iter()
            .zip(1..)
            .map(|(formal, i)| {
                let slot = Slot::new(formal.name.name.clone(), Base::Fp, i * WORD, formal.ty);
                (formal.name.name.clone(), slot)
            })
            .collect();

        Self {
            scopes: vec![params],
            frame_cursor: FIRST_LOCAL_OFFSET,
            break_label: None,
            continue_label: None,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        // The parameter scope lives as long as the context
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Reserve the next frame slot
    fn reserve(&mut self, name: &str, ty: Type) -> Slot {
        let slot = Slot::new(name, Base::Fp, self.frame_cursor, ty);
        self.frame_cursor -= WORD;
        slot
    }

    /// Reserve a slot for a declared local and bind it in the current scope
    pub fn declare_local(&mut self, name: &str, ty: Type) -> Slot {
        let slot = self.reserve(name, ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot.clone());
        }
        slot
    }

    /// Reserve an unnamed slot for an intermediate value
    pub fn temp(&mut self, name: &str, ty: Type) -> Slot {
        self.reserve(name, ty)
    }

    pub fn lookup(&self, name: &str) -> Option<&Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bytes of locals and temporaries reserved so far
    pub fn frame_size(&self) -> i32 {
        FIRST_LOCAL_OFFSET - self.frame_cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Ident;
    use crate::utils::Span;

    fn formal(name: &str, ty: Type) -> VarDecl {
        VarDecl {
            name: Ident { name: name.to_string(), span: Span::dummy() },
            ty,
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_parameters_sit_above_fp() {
        let ctx = FunctionContext::new(&[formal("a", Type::Int), formal("b", Type::Bool)]);
        assert_eq!(ctx.lookup("a").map(|s| s.offset), Some(4));
        assert_eq!(ctx.lookup("b").map(|s| s.offset), Some(8));
        assert_eq!(ctx.frame_size(), 0);
    }

    #[test]
    fn test_locals_and_temps_grow_down() {
        let mut ctx = FunctionContext::new(&[]);
        ctx.push_scope();
        let x = ctx.declare_local("x", Type::Int);
        let t = ctx.temp("_tmp0", Type::Int);
        assert_eq!(x.offset, -8);
        assert_eq!(t.offset, -12);
        assert_eq!(ctx.frame_size(), 8);
        assert!(ctx.lookup("_tmp0").is_none());
    }

    #[test]
    fn test_shadowing_and_scope_pop() {
        let mut ctx = FunctionContext::new(&[formal("x", Type::Int)]);
        ctx.push_scope();
        ctx.declare_local("x", Type::Double);
        assert_eq!(ctx.lookup("x").map(|s| s.ty), Some(Type::Double));
        ctx.pop_scope();
        assert_eq!(ctx.lookup("x").map(|s| s.offset), Some(4));
        // popping past the parameters is a no-op
        ctx.pop_scope();
        assert!(ctx.lookup("x").is_some());
    }

    #[test]
    fn test_fill_and_spill_text() {
        let local = Slot::new("x", Base::Fp, -8, Type::Int);
        assert_eq!(local.fill("$t0"), "\t  lw $t0, -8($fp)\t# fill x to $t0 from $fp-8");
        let global = Slot::new("g", Base::Gp, 4, Type::Int);
        assert_eq!(global.spill("$t2"), "\t  sw $t2, 4($gp)\t# spill g from $t2 to $gp+4");
    }
}
