//! Typed-index storage for scopes, variables, functions, and classes.
//!
//! One `Pool` lives for the whole compilation and owns every definition the
//! parser resolves. Back-references (`TypeInfo::Object` to its class, a
//! symbol to its variable) are plain ids that resolve through the pool, so
//! loops in the reference graph only close here.

use viper_core::Name;

use crate::analyze::object_model::ObjectModel;
use crate::analyze::symbol_table::SymbolTable;
use crate::analyze::types::{Signature, TypeInfo};

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Handle to a [`LexicalScope`].
    ScopeId
);
define_id!(
    /// Handle to a [`Variable`].
    VarId
);
define_id!(
    /// Handle to a [`FunctionDef`].
    FuncId
);
define_id!(
    /// Handle to a [`ClassDef`].
    ClassId
);

/// How a variable is stored and addressed by the writer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VarKind {
    /// Ordinary local or module-level variable.
    Regular,
    /// Function parameter; its compiled name is the C parameter name.
    Argument,
    /// Lives in a heap-allocated closure context block at a fixed offset.
    Closure,
    /// Loop it-identifier, alive only for the duration of its loop and
    /// re-declared with a fresh mangled name on each loop entry.
    SemiScoped,
}

/// A resolved variable.
#[derive(Clone, Debug)]
pub struct Variable {
    pub ident: Name,
    pub kind: VarKind,
    /// `Untyped` until the first assignment or annotation fixes it.
    pub type_info: TypeInfo,
    /// Unique mangled name used by the writer.
    pub compiled_name: String,
    /// Byte offset into the closure context block. Only meaningful for
    /// `VarKind::Closure`, assigned after the owning function body lowers.
    pub closure_offset: usize,
    /// Only meaningful for `VarKind::SemiScoped`.
    pub directly_in_scope: bool,
}

/// A resolved function definition. The body statements live on the
/// `Statement::Function` node; everything call sites need is here.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: Name,
    /// Namespaced module-level name of the function object variable.
    pub ns_ident: String,
    pub sig: Signature,
    pub scope: ScopeId,
    pub self_param: Option<Name>,
    pub self_type: TypeInfo,
}

/// A resolved class definition.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: Name,
    /// Namespaced name; also the emitted C struct typedef name.
    pub ns_ident: String,
    pub scope: ScopeId,
    /// Synthesized from the annotated members, in declaration order.
    pub sig: Signature,
    /// Sum of member sizes; filled in by lowering.
    pub nbytes: usize,
    /// The dunder method table.
    pub object_model: [Option<FuncId>; ObjectModel::COUNT],
    /// Lazily created default string representation.
    pub fmtstr_index: Option<usize>,
}

/// Scope kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    /// Function whose locals are captured by nested functions; owns the
    /// closure context block.
    ClosureParent,
    /// Nested function that reads its parent's context block.
    ClosureChild,
}

/// One lexical scope: a kind, its symbol table, and (for function scopes)
/// the owning function for return-type lookup.
#[derive(Debug)]
pub struct LexicalScope {
    pub kind: ScopeKind,
    pub table: SymbolTable,
    pub func: Option<FuncId>,
}

impl LexicalScope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            table: SymbolTable::new(),
            func: None,
        }
    }
}

/// The compilation-wide definition store.
#[derive(Debug, Default)]
pub struct Pool {
    scopes: Vec<LexicalScope>,
    vars: Vec<Variable>,
    funcs: Vec<FunctionDef>,
    classes: Vec<ClassDef>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_scope(&mut self, scope: LexicalScope) -> ScopeId {
        let id = ScopeId::from_raw(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn alloc_var(&mut self, var: Variable) -> VarId {
        let id = VarId::from_raw(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn alloc_func(&mut self, func: FunctionDef) -> FuncId {
        let id = FuncId::from_raw(self.funcs.len() as u32);
        self.funcs.push(func);
        id
    }

    pub fn alloc_class(&mut self, class: ClassDef) -> ClassId {
        let id = ClassId::from_raw(self.classes.len() as u32);
        self.classes.push(class);
        id
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &LexicalScope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut LexicalScope {
        &mut self.scopes[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.index()]
    }

    #[inline]
    pub fn func(&self, id: FuncId) -> &FunctionDef {
        &self.funcs[id.index()]
    }

    #[inline]
    pub fn func_mut(&mut self, id: FuncId) -> &mut FunctionDef {
        &mut self.funcs[id.index()]
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassDef {
        &mut self.classes[id.index()]
    }
}
