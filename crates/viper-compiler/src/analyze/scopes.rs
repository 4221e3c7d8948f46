//! The scope stack and name resolution across it.

use crate::analyze::symbol_table::Symbol;
use crate::pool::{Pool, ScopeId, ScopeKind};

/// Stack of lexical scopes, innermost last. The module scope is pushed once
/// and never popped while compilation runs.
#[derive(Debug, Default)]
pub struct ScopeStack {
    stack: Vec<ScopeId>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: ScopeId) {
        self.stack.push(scope);
    }

    pub fn pop(&mut self) -> Option<ScopeId> {
        self.stack.pop()
    }

    /// The innermost scope.
    ///
    /// # Panics
    /// Panics when the stack is empty; the module scope is pushed before any
    /// lookup happens.
    pub fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack is never empty")
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Walk the stack top-down and return the shallowest binding for `key`
    /// together with the scope that holds it. A binding in an inner scope
    /// shadows any outer one.
    pub fn lookup(&self, pool: &Pool, key: &str) -> Option<(ScopeId, Symbol)> {
        for &scope_id in self.stack.iter().rev() {
            let scope = pool.scope(scope_id);
            if let Some(index) = scope.table.get(key) {
                return Some((scope_id, scope.table.symbol(index).clone()));
            }
        }
        None
    }

    /// Like [`lookup`](Self::lookup), dropping the scope.
    pub fn get(&self, pool: &Pool, key: &str) -> Option<Symbol> {
        self.lookup(pool, key).map(|(_, sym)| sym)
    }

    /// Whether the innermost scope is a class body.
    pub fn in_class_body(&self, pool: &Pool) -> bool {
        pool.scope(self.current()).kind == ScopeKind::Class
    }
}
