//! The translation unit: AST, scope tree and type context for one file.

use crate::ast::{
    DeclData, DeclId, ExprData, ExprId, ScopeId, StmtData, StmtId, UnitId,
};
use crate::scope::ScopeData;
use crate::types::TypeContext;
use meddle_base::{FileId, Symbol};
use std::path::PathBuf;

/// Everything produced from one source file.
///
/// Node storage is arena-style: flat `Vec`s indexed by unit-tagged ids.
/// The unit exclusively owns its nodes; other units refer to them by id.
pub struct TranslationUnit {
    pub id: UnitId,
    pub file: FileId,
    /// Unit name: the file stem (`vec` for `vec.mdl`).
    pub name: String,
    /// Canonicalised path, the unit manager's key.
    pub path: PathBuf,

    pub decls: Vec<DeclData>,
    pub exprs: Vec<ExprData>,
    pub stmts: Vec<StmtData>,
    pub scopes: Vec<ScopeData>,
    pub types: TypeContext,

    /// Top-level non-`use` declarations in source order.
    pub items: Vec<DeclId>,
    /// `use` declarations in source order.
    pub uses: Vec<DeclId>,
    /// `$public` declarations in insertion order.
    pub exports: Vec<DeclId>,
    /// Declarations imported from other units.
    pub imports: Vec<DeclId>,

    pub root_scope: ScopeId,
}

impl TranslationUnit {
    pub fn new(id: UnitId, file: FileId, name: String, path: PathBuf) -> Self {
        let mut unit = Self {
            id,
            file,
            name,
            path,
            decls: Vec::new(),
            exprs: Vec::new(),
            stmts: Vec::new(),
            scopes: Vec::new(),
            types: TypeContext::new(id),
            items: Vec::new(),
            uses: Vec::new(),
            exports: Vec::new(),
            imports: Vec::new(),
            root_scope: ScopeId::new(id, 0),
        };
        unit.root_scope = unit.alloc_scope(ScopeData::default());
        unit
    }

    // ---- arenas ----------------------------------------------------------

    pub fn alloc_decl(&mut self, data: DeclData) -> DeclId {
        let id = DeclId::new(self.id, self.decls.len());
        self.decls.push(data);
        id
    }

    pub fn alloc_expr(&mut self, data: ExprData) -> ExprId {
        let id = ExprId::new(self.id, self.exprs.len());
        self.exprs.push(data);
        id
    }

    pub fn alloc_stmt(&mut self, data: StmtData) -> StmtId {
        let id = StmtId::new(self.id, self.stmts.len());
        self.stmts.push(data);
        id
    }

    pub fn alloc_scope(&mut self, data: ScopeData) -> ScopeId {
        let id = ScopeId::new(self.id, self.scopes.len());
        self.scopes.push(data);
        id
    }

    pub fn decl(&self, id: DeclId) -> &DeclData {
        debug_assert_eq!(id.unit, self.id, "foreign decl handle");
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclData {
        debug_assert_eq!(id.unit, self.id, "foreign decl handle");
        &mut self.decls[id.index()]
    }

    pub fn expr(&self, id: ExprId) -> &ExprData {
        debug_assert_eq!(id.unit, self.id, "foreign expr handle");
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprData {
        debug_assert_eq!(id.unit, self.id, "foreign expr handle");
        &mut self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtData {
        debug_assert_eq!(id.unit, self.id, "foreign stmt handle");
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut StmtData {
        debug_assert_eq!(id.unit, self.id, "foreign stmt handle");
        &mut self.stmts[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeData {
        debug_assert_eq!(id.unit, self.id, "foreign scope handle");
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut ScopeData {
        debug_assert_eq!(id.unit, self.id, "foreign scope handle");
        &mut self.scopes[id.index()]
    }

    // ---- scope operations ------------------------------------------------

    /// Looks a name up through the scope chain starting at `scope`.
    pub fn lookup(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.scope(id);
            if let Some(decl) = data.get(name) {
                return Some(decl);
            }
            current = data.parent;
        }
        None
    }

    /// Looks a name up in `scope` only, ignoring parents.
    pub fn lookup_local(&self, scope: ScopeId, name: Symbol) -> Option<DeclId> {
        self.scope(scope).get(name)
    }

    // ---- registration ----------------------------------------------------

    pub fn add_item(&mut self, decl: DeclId) {
        self.items.push(decl);
    }

    pub fn add_use(&mut self, decl: DeclId) {
        self.uses.push(decl);
    }

    /// Exports preserve insertion order for deterministic emission.
    pub fn add_export(&mut self, decl: DeclId) {
        if !self.exports.contains(&decl) {
            self.exports.push(decl);
        }
    }

    pub fn add_import(&mut self, decl: DeclId) {
        if !self.imports.contains(&decl) {
            self.imports.push(decl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeclKind, Runes};
    use meddle_base::{SourceLoc, SourceMap};

    fn unit() -> (TranslationUnit, SourceLoc) {
        let mut sources = SourceMap::new();
        let file = sources.add("t.mdl", "t.mdl", "");
        let unit =
            TranslationUnit::new(UnitId(0), file, "t".into(), "t.mdl".into());
        (unit, SourceLoc::start_of(file))
    }

    #[test]
    fn scope_chain_lookup() {
        let (mut unit, loc) = unit();
        let root = unit.root_scope;
        let inner = unit.alloc_scope(ScopeData::child_of(root));

        let name = Symbol::EMPTY;
        let ty = unit.types.i64_ty();
        let decl = unit.alloc_decl(DeclData {
            name,
            runes: Runes::empty(),
            loc,
            scope: root,
            kind: DeclKind::Var {
                ty: Some(ty),
                init: None,
                mutable: false,
                global: true,
            },
        });
        unit.scope_mut(root).insert(name, decl).unwrap();

        assert_eq!(unit.lookup(inner, name), Some(decl));
        assert_eq!(unit.lookup_local(inner, name), None);
        assert_eq!(unit.lookup_local(root, name), Some(decl));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let (mut unit, loc) = unit();
        let root = unit.root_scope;
        let name = Symbol::EMPTY;
        let ty = unit.types.i64_ty();
        let mk = |unit: &mut TranslationUnit| {
            unit.alloc_decl(DeclData {
                name,
                runes: Runes::empty(),
                loc,
                scope: root,
                kind: DeclKind::Var {
                    ty: Some(ty),
                    init: None,
                    mutable: false,
                    global: true,
                },
            })
        };
        let d1 = mk(&mut unit);
        let d2 = mk(&mut unit);
        unit.scope_mut(root).insert(name, d1).unwrap();
        assert_eq!(unit.scope_mut(root).insert(name, d2), Err(d1));
    }
}
