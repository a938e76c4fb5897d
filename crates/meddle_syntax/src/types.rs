//! The per-unit type context.
//!
//! Types are interned: within one context, two structurally identical types
//! are the same [`TypeId`]. Identity is the handle; the structural
//! `compare` predicate (which also works across units) lives on the unit
//! manager, since imported types are foreign handles.
//!
//! Type names the parser cannot resolve become deferred types: a name (plus
//! optional template arguments) and the location that spelled it. After all
//! files are parsed and imports are wired, sanitation binds every deferred
//! type to its concrete target or fails fatally at the original location.

use crate::ast::{DeclId, TypeId, UnitId};
use meddle_base::{intern::kw, SourceLoc, Symbol};
use std::collections::HashMap;

/// Primitive type kinds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PrimKind {
    Void,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl PrimKind {
    pub const ALL: [PrimKind; 13] = [
        PrimKind::Void,
        PrimKind::Bool,
        PrimKind::Char,
        PrimKind::I8,
        PrimKind::I16,
        PrimKind::I32,
        PrimKind::I64,
        PrimKind::U8,
        PrimKind::U16,
        PrimKind::U32,
        PrimKind::U64,
        PrimKind::F32,
        PrimKind::F64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimKind::Void => "void",
            PrimKind::Bool => "bool",
            PrimKind::Char => "char",
            PrimKind::I8 => "i8",
            PrimKind::I16 => "i16",
            PrimKind::I32 => "i32",
            PrimKind::I64 => "i64",
            PrimKind::U8 => "u8",
            PrimKind::U16 => "u16",
            PrimKind::U32 => "u32",
            PrimKind::U64 => "u64",
            PrimKind::F32 => "f32",
            PrimKind::F64 => "f64",
        }
    }

    /// The pre-interned keyword symbol spelling this primitive.
    pub fn symbol(self) -> Symbol {
        match self {
            PrimKind::Void => kw::VOID,
            PrimKind::Bool => kw::BOOL,
            PrimKind::Char => kw::CHAR,
            PrimKind::I8 => kw::I8,
            PrimKind::I16 => kw::I16,
            PrimKind::I32 => kw::I32,
            PrimKind::I64 => kw::I64,
            PrimKind::U8 => kw::U8,
            PrimKind::U16 => kw::U16,
            PrimKind::U32 => kw::U32,
            PrimKind::U64 => kw::U64,
            PrimKind::F32 => kw::F32,
            PrimKind::F64 => kw::F64,
        }
    }

    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            PrimKind::I8 | PrimKind::I16 | PrimKind::I32 | PrimKind::I64
        )
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            PrimKind::Bool
                | PrimKind::Char
                | PrimKind::U8
                | PrimKind::U16
                | PrimKind::U32
                | PrimKind::U64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimKind::F32 | PrimKind::F64)
    }
}

/// A type value. Handles are canonical per context.
#[derive(Clone, Debug)]
pub struct TypeData {
    pub kind: TypeKind,
}

#[derive(Clone, Debug)]
pub enum TypeKind {
    Primitive(PrimKind),
    Array {
        elem: TypeId,
        size: u64,
    },
    Pointer {
        pointee: TypeId,
    },
    Function {
        params: Vec<TypeId>,
        ret: TypeId,
    },
    Enum {
        name: Symbol,
        underlying: TypeId,
        decl: Option<DeclId>,
    },
    Struct {
        name: Symbol,
        decl: Option<DeclId>,
    },
    TemplateParam {
        name: Symbol,
        /// The `TemplateParam` declaration defining this type.
        owner: Option<DeclId>,
        index: u32,
    },
    /// A template struct applied to fully concrete arguments.
    TemplateStruct {
        template: DeclId,
        args: Vec<TypeId>,
    },
    /// A template struct whose arguments still mention template parameters.
    Dependent {
        template: DeclId,
        args: Vec<TypeId>,
    },
    /// A name to be resolved at sanitation time.
    Deferred {
        name: Symbol,
        args: Vec<TypeId>,
        loc: SourceLoc,
        resolved: Option<TypeId>,
    },
}

/// Structural interning key.
#[derive(Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Prim(PrimKind),
    Array(TypeId, u64),
    Ptr(TypeId),
    Fn(Vec<TypeId>, TypeId),
    Spec(DeclId, Vec<TypeId>),
    Dep(DeclId, Vec<TypeId>),
}

/// The interning table for one translation unit.
pub struct TypeContext {
    unit: UnitId,
    types: Vec<TypeData>,
    lookup: HashMap<TypeKey, TypeId>,
    /// Named types: primitives, local structs/enums, imported types
    /// (qualified for aliased imports).
    named: HashMap<Symbol, TypeId>,
    /// Every deferred type created by this unit.
    pub deferred: Vec<TypeId>,
    prims: [TypeId; 13],
}

impl TypeContext {
    pub fn new(unit: UnitId) -> Self {
        let mut ctx = Self {
            unit,
            types: Vec::new(),
            lookup: HashMap::new(),
            named: HashMap::new(),
            deferred: Vec::new(),
            prims: [TypeId::new(unit, 0); 13],
        };
        for (i, kind) in PrimKind::ALL.into_iter().enumerate() {
            let id = ctx.push(TypeKind::Primitive(kind));
            ctx.lookup.insert(TypeKey::Prim(kind), id);
            ctx.named.insert(kind.symbol(), id);
            ctx.prims[i] = id;
        }
        ctx
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId::new(self.unit, self.types.len());
        self.types.push(TypeData { kind });
        id
    }

    /// Returns the type data for a handle owned by this context.
    pub fn get(&self, id: TypeId) -> &TypeData {
        debug_assert_eq!(id.unit, self.unit, "foreign type handle");
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeData {
        debug_assert_eq!(id.unit, self.unit, "foreign type handle");
        &mut self.types[id.index()]
    }

    pub fn prim(&self, kind: PrimKind) -> TypeId {
        let idx = PrimKind::ALL.iter().position(|k| *k == kind).unwrap();
        self.prims[idx]
    }

    pub fn void_ty(&self) -> TypeId {
        self.prim(PrimKind::Void)
    }

    pub fn bool_ty(&self) -> TypeId {
        self.prim(PrimKind::Bool)
    }

    pub fn char_ty(&self) -> TypeId {
        self.prim(PrimKind::Char)
    }

    pub fn i64_ty(&self) -> TypeId {
        self.prim(PrimKind::I64)
    }

    pub fn u64_ty(&self) -> TypeId {
        self.prim(PrimKind::U64)
    }

    pub fn f64_ty(&self) -> TypeId {
        self.prim(PrimKind::F64)
    }

    fn intern(&mut self, key: TypeKey, kind: impl FnOnce() -> TypeKind) -> TypeId {
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.push(kind());
        self.lookup.insert(key, id);
        id
    }

    pub fn intern_array(&mut self, elem: TypeId, size: u64) -> TypeId {
        self.intern(TypeKey::Array(elem, size), || TypeKind::Array {
            elem,
            size,
        })
    }

    pub fn intern_pointer(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKey::Ptr(pointee), || TypeKind::Pointer { pointee })
    }

    pub fn intern_function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeKey::Fn(params.clone(), ret), || TypeKind::Function {
            params,
            ret,
        })
    }

    pub fn intern_spec(&mut self, template: DeclId, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeKey::Spec(template, args.clone()), || {
            TypeKind::TemplateStruct { template, args }
        })
    }

    pub fn intern_dependent(
        &mut self,
        template: DeclId,
        args: Vec<TypeId>,
    ) -> TypeId {
        self.intern(TypeKey::Dep(template, args.clone()), || {
            TypeKind::Dependent { template, args }
        })
    }

    /// Creates a fresh named type (struct, enum). The name must not already
    /// be bound; the caller reports the duplicate.
    pub fn declare_named(
        &mut self,
        name: Symbol,
        kind: TypeKind,
    ) -> Result<TypeId, TypeId> {
        if let Some(&existing) = self.named.get(&name) {
            return Err(existing);
        }
        let id = self.push(kind);
        self.named.insert(name, id);
        Ok(id)
    }

    /// Creates a template-parameter type. Parameter types are scoped through
    /// their declaration, not the name table, so same-named parameters of
    /// different templates stay distinct.
    pub fn make_template_param(
        &mut self,
        name: Symbol,
        index: u32,
    ) -> TypeId {
        self.push(TypeKind::TemplateParam {
            name,
            owner: None,
            index,
        })
    }

    /// Registers an imported (foreign) type under a name in this context.
    pub fn import_named(
        &mut self,
        name: Symbol,
        ty: TypeId,
    ) -> Result<(), TypeId> {
        if let Some(&existing) = self.named.get(&name) {
            if existing == ty {
                return Ok(());
            }
            return Err(existing);
        }
        self.named.insert(name, ty);
        Ok(())
    }

    pub fn named(&self, name: Symbol) -> Option<TypeId> {
        self.named.get(&name).copied()
    }

    /// Creates a fresh deferred type bound to a name. Deferred types are
    /// never interned: each spelling site gets its own node so sanitation
    /// failures point at the right location.
    pub fn defer(
        &mut self,
        name: Symbol,
        args: Vec<TypeId>,
        loc: SourceLoc,
    ) -> TypeId {
        let id = self.push(TypeKind::Deferred {
            name,
            args,
            loc,
            resolved: None,
        });
        self.deferred.push(id);
        id
    }

    /// Ids of every type in this context, for whole-context sweeps.
    pub fn all_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(move |i| TypeId::new(self.unit, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TypeContext {
        TypeContext::new(UnitId(0))
    }

    #[test]
    fn primitives_are_pre_interned() {
        let ctx = ctx();
        assert_eq!(ctx.prim(PrimKind::I64), ctx.i64_ty());
        assert!(matches!(
            ctx.get(ctx.bool_ty()).kind,
            TypeKind::Primitive(PrimKind::Bool)
        ));
    }

    #[test]
    fn arrays_intern_by_element_and_size() {
        let mut ctx = ctx();
        let elem = ctx.i64_ty();
        let a = ctx.intern_array(elem, 4);
        let b = ctx.intern_array(elem, 4);
        let c = ctx.intern_array(elem, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pointers_intern_by_pointee() {
        let mut ctx = ctx();
        let i64_ty = ctx.i64_ty();
        let p1 = ctx.intern_pointer(i64_ty);
        let p2 = ctx.intern_pointer(i64_ty);
        assert_eq!(p1, p2);
        let pp = ctx.intern_pointer(p1);
        assert_ne!(p1, pp);
    }

    #[test]
    fn function_types_intern_by_signature() {
        let mut ctx = ctx();
        let i64_ty = ctx.i64_ty();
        let void = ctx.void_ty();
        let f1 = ctx.intern_function(vec![i64_ty], void);
        let f2 = ctx.intern_function(vec![i64_ty], void);
        let f3 = ctx.intern_function(vec![i64_ty, i64_ty], void);
        assert_eq!(f1, f2);
        assert_ne!(f1, f3);
    }

    #[test]
    fn deferred_types_are_always_fresh() {
        let mut ctx = ctx();
        let loc = meddle_base::SourceLoc {
            file: {
                // A location is only carried, never dereferenced here.
                let mut m = meddle_base::SourceMap::new();
                m.add("t.mdl", "t.mdl", "")
            },
            line: 1,
            col: 1,
        };
        let name = Symbol::EMPTY;
        let d1 = ctx.defer(name, Vec::new(), loc);
        let d2 = ctx.defer(name, Vec::new(), loc);
        assert_ne!(d1, d2);
        assert_eq!(ctx.deferred.len(), 2);
    }

    #[test]
    fn named_duplicate_is_rejected() {
        let mut ctx = ctx();
        let name = PrimKind::I64.symbol();
        // `i64` is taken by the primitive.
        assert!(ctx
            .declare_named(
                name,
                TypeKind::Struct {
                    name,
                    decl: None
                }
            )
            .is_err());
    }
}
