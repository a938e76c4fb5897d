//! The unit manager: owner of all translation units and the cross-unit
//! type utilities.
//!
//! Ids carry their owning unit, so any declaration, expression or type can
//! be reached through the manager regardless of which unit created it.
//! Type handle identity is per unit; the structural [`UnitManager::types_equal`]
//! predicate is what crosses unit boundaries.

use meddle_base::{Diagnostic, Interner, Result, Session};
use meddle_syntax::ast::{DeclId, ExprId, ScopeId, StmtId, TypeId, UnitId};
use meddle_syntax::{
    DeclData, DeclKind, ExprData, PrimKind, SpecInfo, StmtData,
    TranslationUnit, TypeKind,
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Broad classification used by sema rules and lowering.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeClass {
    SInt,
    UInt,
    Float,
    Pointer,
    Aggregate,
    Void,
    Other,
}

pub struct UnitManager {
    units: Vec<TranslationUnit>,
    paths: HashMap<PathBuf, UnitId>,
}

impl Default for UnitManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitManager {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            paths: HashMap::new(),
        }
    }

    /// Normalises a path into the key units are stored under. Falls back to
    /// a lexical clean-up when the file does not exist on disk (tests).
    pub fn canonical_key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| lexical_clean(path))
    }

    /// Creates a unit for a registered source file. Duplicate paths are
    /// fatal.
    pub fn create_unit(
        &mut self,
        sess: &Session,
        file: meddle_base::FileId,
    ) -> Result<UnitId> {
        let source = sess.sources.file(file);
        let key = Self::canonical_key(&source.path);
        if self.paths.contains_key(&key) {
            return Err(Diagnostic::bare(format!(
                "multiple files with same path: {}",
                key.display()
            )));
        }
        let id = UnitId(self.units.len() as u32);
        let unit = TranslationUnit::new(
            id,
            file,
            source.stem().to_string(),
            key.clone(),
        );
        self.units.push(unit);
        self.paths.insert(key, id);
        Ok(id)
    }

    pub fn ids(&self) -> Vec<UnitId> {
        (0..self.units.len() as u32).map(UnitId).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn by_path(&self, path: &Path) -> Option<UnitId> {
        self.paths.get(path).copied()
    }

    pub fn unit(&self, id: UnitId) -> &TranslationUnit {
        &self.units[id.0 as usize]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut TranslationUnit {
        &mut self.units[id.0 as usize]
    }

    // ---- node access -----------------------------------------------------

    pub fn decl(&self, id: DeclId) -> &DeclData {
        self.unit(id.unit).decl(id)
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut DeclData {
        self.unit_mut(id.unit).decl_mut(id)
    }

    pub fn expr(&self, id: ExprId) -> &ExprData {
        self.unit(id.unit).expr(id)
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut ExprData {
        self.unit_mut(id.unit).expr_mut(id)
    }

    pub fn stmt(&self, id: StmtId) -> &StmtData {
        self.unit(id.unit).stmt(id)
    }

    pub fn lookup(&self, scope: ScopeId, name: meddle_base::Symbol) -> Option<DeclId> {
        self.unit(scope.unit).lookup(scope, name)
    }

    pub fn type_kind(&self, id: TypeId) -> &TypeKind {
        &self.unit(id.unit).types.get(id).kind
    }

    // ---- type utilities --------------------------------------------------

    /// Follows resolved deferred types to the concrete handle.
    pub fn canon(&self, mut ty: TypeId) -> TypeId {
        loop {
            match self.type_kind(ty) {
                TypeKind::Deferred {
                    resolved: Some(target),
                    ..
                } => ty = *target,
                _ => return ty,
            }
        }
    }

    pub fn prim_of(&self, ty: TypeId) -> Option<PrimKind> {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        self.prim_of(ty) == Some(PrimKind::Void)
    }

    pub fn is_bool(&self, ty: TypeId) -> bool {
        self.prim_of(ty) == Some(PrimKind::Bool)
    }

    /// Enum types classify as their underlying integer.
    pub fn type_class(&self, ty: TypeId) -> TypeClass {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Primitive(kind) => {
                if kind.is_signed_int() {
                    TypeClass::SInt
                } else if kind.is_unsigned_int() {
                    TypeClass::UInt
                } else if kind.is_float() {
                    TypeClass::Float
                } else {
                    TypeClass::Void
                }
            }
            TypeKind::Pointer { .. } => TypeClass::Pointer,
            TypeKind::Array { .. } => TypeClass::Aggregate,
            TypeKind::Struct { .. }
            | TypeKind::TemplateStruct { .. }
            | TypeKind::Dependent { .. } => TypeClass::Aggregate,
            TypeKind::Enum { underlying, .. } => self.type_class(*underlying),
            _ => TypeClass::Other,
        }
    }

    pub fn is_scalar(&self, ty: TypeId) -> bool {
        matches!(
            self.type_class(ty),
            TypeClass::SInt | TypeClass::UInt | TypeClass::Float | TypeClass::Pointer
        )
    }

    pub fn is_integer_class(&self, ty: TypeId) -> bool {
        matches!(self.type_class(ty), TypeClass::SInt | TypeClass::UInt)
    }

    pub fn pointee(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn array_elem(&self, ty: TypeId) -> Option<(TypeId, u64)> {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Array { elem, size } => Some((*elem, *size)),
            _ => None,
        }
    }

    pub fn fn_signature(&self, ty: TypeId) -> Option<(Vec<TypeId>, TypeId)> {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Function { params, ret } => {
                Some((params.clone(), *ret))
            }
            _ => None,
        }
    }

    /// Resolves a struct-like type to its declaration: a plain struct's
    /// decl, or the registered specialisation of a template-struct type.
    pub fn struct_decl_of(&self, ty: TypeId) -> Option<DeclId> {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Struct { decl, .. } => *decl,
            TypeKind::TemplateStruct { template, args } => {
                self.find_specialization(*template, args)
            }
            _ => None,
        }
    }

    /// Looks a specialisation up in a template's spec cache by positional
    /// argument equality.
    pub fn find_specialization(
        &self,
        template: DeclId,
        args: &[TypeId],
    ) -> Option<DeclId> {
        let specs = match &self.decl(template).kind {
            DeclKind::TemplateFunction { specs, .. }
            | DeclKind::TemplateStruct { specs, .. } => specs.clone(),
            _ => return None,
        };
        for spec in specs {
            let spec_args = match &self.decl(spec).kind {
                DeclKind::Function {
                    special: Some(SpecInfo { args, .. }),
                    ..
                }
                | DeclKind::Struct {
                    special: Some(SpecInfo { args, .. }),
                    ..
                } => args.clone(),
                _ => continue,
            };
            if spec_args.len() == args.len()
                && spec_args
                    .iter()
                    .zip(args)
                    .all(|(a, b)| self.types_equal(*a, *b))
            {
                return Some(spec);
            }
        }
        None
    }

    /// Structural type equality, valid across units.
    pub fn types_equal(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.canon(a);
        let b = self.canon(b);
        if a == b {
            return true;
        }
        match (self.type_kind(a), self.type_kind(b)) {
            (TypeKind::Primitive(x), TypeKind::Primitive(y)) => x == y,
            (
                TypeKind::Array { elem: e1, size: s1 },
                TypeKind::Array { elem: e2, size: s2 },
            ) => s1 == s2 && self.types_equal(*e1, *e2),
            (
                TypeKind::Pointer { pointee: p1 },
                TypeKind::Pointer { pointee: p2 },
            ) => self.types_equal(*p1, *p2),
            (
                TypeKind::Function { params: p1, ret: r1 },
                TypeKind::Function { params: p2, ret: r2 },
            ) => {
                p1.len() == p2.len()
                    && p1
                        .iter()
                        .zip(p2)
                        .all(|(x, y)| self.types_equal(*x, *y))
                    && self.types_equal(*r1, *r2)
            }
            (
                TypeKind::Enum { decl: d1, .. },
                TypeKind::Enum { decl: d2, .. },
            ) => d1.is_some() && d1 == d2,
            (
                TypeKind::TemplateParam { owner: o1, index: i1, .. },
                TypeKind::TemplateParam { owner: o2, index: i2, .. },
            ) => o1.is_some() && o1 == o2 && i1 == i2,
            (
                TypeKind::TemplateStruct { template: t1, args: a1 },
                TypeKind::TemplateStruct { template: t2, args: a2 },
            )
            | (
                TypeKind::Dependent { template: t1, args: a1 },
                TypeKind::Dependent { template: t2, args: a2 },
            ) => {
                t1 == t2
                    && a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(a2)
                        .all(|(x, y)| self.types_equal(*x, *y))
            }
            // A template-struct type and the struct type of its registered
            // specialisation denote the same type.
            (TypeKind::Struct { .. }, TypeKind::TemplateStruct { .. })
            | (TypeKind::TemplateStruct { .. }, TypeKind::Struct { .. })
            | (TypeKind::Struct { .. }, TypeKind::Struct { .. }) => {
                match (self.struct_decl_of(a), self.struct_decl_of(b)) {
                    (Some(d1), Some(d2)) => d1 == d2,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// `true` if the type mentions a template parameter anywhere.
    pub fn type_has_params(&self, ty: TypeId) -> bool {
        match self.type_kind(self.canon(ty)) {
            TypeKind::TemplateParam { .. } => true,
            TypeKind::Array { elem, .. } => self.type_has_params(*elem),
            TypeKind::Pointer { pointee } => self.type_has_params(*pointee),
            TypeKind::Function { params, ret } => {
                let params = params.clone();
                let ret = *ret;
                params.iter().any(|p| self.type_has_params(*p))
                    || self.type_has_params(ret)
            }
            TypeKind::TemplateStruct { args, .. }
            | TypeKind::Dependent { args, .. }
            | TypeKind::Deferred { args, .. } => {
                args.clone().iter().any(|a| self.type_has_params(*a))
            }
            _ => false,
        }
    }

    /// Human-readable type spelling for diagnostics and concrete
    /// specialisation names.
    pub fn type_name(&self, ty: TypeId, interner: &Interner) -> String {
        match self.type_kind(self.canon(ty)) {
            TypeKind::Primitive(kind) => kind.name().to_string(),
            TypeKind::Array { elem, size } => {
                format!("{}[{}]", self.type_name(*elem, interner), size)
            }
            TypeKind::Pointer { pointee } => {
                format!("{}*", self.type_name(*pointee, interner))
            }
            TypeKind::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.type_name(*p, interner))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({}) -> {}", params, self.type_name(*ret, interner))
            }
            TypeKind::Enum { name, .. } | TypeKind::Struct { name, .. } => {
                interner.resolve(*name).to_string()
            }
            TypeKind::TemplateParam { name, .. } => {
                interner.resolve(*name).to_string()
            }
            TypeKind::TemplateStruct { template, args }
            | TypeKind::Dependent { template, args } => {
                let base = interner.resolve(self.decl(*template).name);
                let args = args
                    .iter()
                    .map(|a| self.type_name(*a, interner))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{base}<{args}>")
            }
            TypeKind::Deferred { name, .. } => {
                interner.resolve(*name).to_string()
            }
        }
    }

    /// Runs the semantic pipeline over all parsed units: use resolution,
    /// sanitation, shallow and recursive name resolution, then sema.
    pub fn drive(&mut self, sess: &mut Session) -> Result<()> {
        crate::uses::resolve_uses(self, sess)?;
        crate::sanitate::sanitate(self, sess)?;
        crate::nameres::run_shallow(self, sess)?;
        crate::nameres::run_recurse(self, sess)?;
        crate::sema::run(self, sess)?;
        Ok(())
    }
}

/// Lexical `.`/`..` normalisation for paths that do not exist on disk.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_clean_folds_dots() {
        assert_eq!(
            lexical_clean(Path::new("/a/b/../c/./d.mdl")),
            PathBuf::from("/a/c/d.mdl")
        );
    }

    #[test]
    fn lexical_clean_keeps_leading_parents() {
        assert_eq!(
            lexical_clean(Path::new("../x.mdl")),
            PathBuf::from("../x.mdl")
        );
    }
}
