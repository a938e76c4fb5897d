//! Scope tree.
//!
//! A scope is an ordered list of `(name, decl)` pairs plus a parent link.
//! Lookup walks the local list first, then the parent chain. Insertion
//! fails when the name already exists in the same scope; cross-scope
//! shadowing is checked later by name resolution.

use crate::ast::{DeclId, ScopeId};
use meddle_base::Symbol;

#[derive(Clone, Debug, Default)]
pub struct ScopeData {
    pub parent: Option<ScopeId>,
    /// Declarations in insertion order.
    pub decls: Vec<(Symbol, DeclId)>,
}

impl ScopeData {
    pub fn child_of(parent: ScopeId) -> Self {
        Self {
            parent: Some(parent),
            decls: Vec::new(),
        }
    }

    /// Looks up a name in this scope only.
    pub fn get(&self, name: Symbol) -> Option<DeclId> {
        self.decls
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| *d)
    }

    /// Inserts a declaration; on a duplicate name returns the existing
    /// declaration as the error.
    pub fn insert(&mut self, name: Symbol, decl: DeclId) -> Result<(), DeclId> {
        if let Some(existing) = self.get(name) {
            return Err(existing);
        }
        self.decls.push((name, decl));
        Ok(())
    }
}
