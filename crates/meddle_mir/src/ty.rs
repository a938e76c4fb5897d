//! The MIR type system: a strictly-structured mirror of the source types.
//!
//! Types are interned per [`Segment`](crate::Segment); equality is handle
//! equality. Struct types are registered by name in two steps (shell, then
//! members) so self-referential structs can be built without recursion.

use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TyId(u32);

impl TyId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub enum TyKind {
    I1,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Void,
    Array { elem: TyId, size: u64 },
    Ptr { pointee: TyId },
    Fn { params: Vec<TyId>, ret: TyId },
    Struct { name: String, members: Vec<TyId> },
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum TyKey {
    Prim(u8),
    Array(TyId, u64),
    Ptr(TyId),
    Fn(Vec<TyId>, TyId),
}

pub struct TypePool {
    tys: Vec<TyKind>,
    lookup: HashMap<TyKey, TyId>,
    structs: HashMap<String, TyId>,
    /// Struct types in creation order, for deterministic printing.
    pub struct_order: Vec<TyId>,
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TypePool {
    pub fn new() -> Self {
        let mut pool = Self {
            tys: Vec::new(),
            lookup: HashMap::new(),
            structs: HashMap::new(),
            struct_order: Vec::new(),
        };
        let prims = [
            TyKind::I1,
            TyKind::I8,
            TyKind::I16,
            TyKind::I32,
            TyKind::I64,
            TyKind::F32,
            TyKind::F64,
            TyKind::Void,
        ];
        for (i, kind) in prims.into_iter().enumerate() {
            let id = pool.push(kind);
            pool.lookup.insert(TyKey::Prim(i as u8), id);
        }
        pool
    }

    fn push(&mut self, kind: TyKind) -> TyId {
        let id = TyId(self.tys.len() as u32);
        self.tys.push(kind);
        id
    }

    pub fn kind(&self, id: TyId) -> &TyKind {
        &self.tys[id.index()]
    }

    pub fn i1(&self) -> TyId {
        TyId(0)
    }

    pub fn i8(&self) -> TyId {
        TyId(1)
    }

    pub fn i16(&self) -> TyId {
        TyId(2)
    }

    pub fn i32(&self) -> TyId {
        TyId(3)
    }

    pub fn i64(&self) -> TyId {
        TyId(4)
    }

    pub fn f32(&self) -> TyId {
        TyId(5)
    }

    pub fn f64(&self) -> TyId {
        TyId(6)
    }

    pub fn void(&self) -> TyId {
        TyId(7)
    }

    pub fn array(&mut self, elem: TyId, size: u64) -> TyId {
        let key = TyKey::Array(elem, size);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.push(TyKind::Array { elem, size });
        self.lookup.insert(key, id);
        id
    }

    pub fn ptr(&mut self, pointee: TyId) -> TyId {
        let key = TyKey::Ptr(pointee);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.push(TyKind::Ptr { pointee });
        self.lookup.insert(key, id);
        id
    }

    pub fn func(&mut self, params: Vec<TyId>, ret: TyId) -> TyId {
        let key = TyKey::Fn(params.clone(), ret);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.push(TyKind::Fn { params, ret });
        self.lookup.insert(key, id);
        id
    }

    pub fn struct_get(&self, name: &str) -> Option<TyId> {
        self.structs.get(name).copied()
    }

    /// Registers a struct shell; members are filled in afterwards so
    /// self-referential layouts can be created.
    pub fn struct_create(&mut self, name: &str) -> TyId {
        if let Some(&id) = self.structs.get(name) {
            return id;
        }
        let id = self.push(TyKind::Struct {
            name: name.to_string(),
            members: Vec::new(),
        });
        self.structs.insert(name.to_string(), id);
        self.struct_order.push(id);
        id
    }

    pub fn struct_set_members(&mut self, id: TyId, members: Vec<TyId>) {
        if let TyKind::Struct { members: slot, .. } = &mut self.tys[id.index()]
        {
            *slot = members;
        }
    }

    // ---- predicates ------------------------------------------------------

    pub fn is_integer(&self, id: TyId) -> bool {
        matches!(
            self.kind(id),
            TyKind::I1 | TyKind::I8 | TyKind::I16 | TyKind::I32 | TyKind::I64
        )
    }

    pub fn is_i1(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::I1)
    }

    pub fn is_float(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::F32 | TyKind::F64)
    }

    pub fn is_ptr(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::Ptr { .. })
    }

    pub fn is_void(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::Void)
    }

    pub fn is_array(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::Array { .. })
    }

    pub fn is_struct(&self, id: TyId) -> bool {
        matches!(self.kind(id), TyKind::Struct { .. })
    }

    pub fn is_aggregate(&self, id: TyId) -> bool {
        self.is_array(id) || self.is_struct(id)
    }

    pub fn is_scalar(&self, id: TyId) -> bool {
        self.is_integer(id) || self.is_float(id) || self.is_ptr(id)
    }

    pub fn pointee(&self, id: TyId) -> Option<TyId> {
        match self.kind(id) {
            TyKind::Ptr { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn fn_ret(&self, id: TyId) -> Option<TyId> {
        match self.kind(id) {
            TyKind::Fn { ret, .. } => Some(*ret),
            _ => None,
        }
    }

    pub fn fn_params(&self, id: TyId) -> Option<&[TyId]> {
        match self.kind(id) {
            TyKind::Fn { params, .. } => Some(params),
            _ => None,
        }
    }

    /// The printable spelling (`i64`, `i8[7]`, `i64*`, `Pair`).
    pub fn name(&self, id: TyId) -> String {
        match self.kind(id) {
            TyKind::I1 => "i1".into(),
            TyKind::I8 => "i8".into(),
            TyKind::I16 => "i16".into(),
            TyKind::I32 => "i32".into(),
            TyKind::I64 => "i64".into(),
            TyKind::F32 => "f32".into(),
            TyKind::F64 => "f64".into(),
            TyKind::Void => "void".into(),
            TyKind::Array { elem, size } => {
                format!("{}[{}]", self.name(*elem), size)
            }
            TyKind::Ptr { pointee } => format!("{}*", self.name(*pointee)),
            TyKind::Fn { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.name(*p))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({}) -> {}", params, self.name(*ret))
            }
            TyKind::Struct { name, .. } => name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_fixed() {
        let pool = TypePool::new();
        assert_eq!(pool.name(pool.i64()), "i64");
        assert_eq!(pool.name(pool.void()), "void");
        assert!(pool.is_i1(pool.i1()));
    }

    #[test]
    fn interning_is_canonical() {
        let mut pool = TypePool::new();
        let a = pool.array(pool.i8(), 7);
        let b = pool.array(pool.i8(), 7);
        assert_eq!(a, b);
        assert_eq!(pool.name(a), "i8[7]");

        let p = pool.ptr(a);
        let q = pool.ptr(a);
        assert_eq!(p, q);
        assert_eq!(pool.name(p), "i8[7]*");
    }

    #[test]
    fn struct_shell_then_members() {
        let mut pool = TypePool::new();
        let node = pool.struct_create("Node");
        let node_ptr = pool.ptr(node);
        pool.struct_set_members(node, vec![pool.i64(), node_ptr]);
        match pool.kind(node) {
            TyKind::Struct { members, .. } => {
                assert_eq!(members.len(), 2);
                assert_eq!(members[1], node_ptr);
            }
            _ => panic!("expected a struct type"),
        }
    }

    #[test]
    fn function_types_intern_by_signature() {
        let mut pool = TypePool::new();
        let f1 = pool.func(vec![pool.i64()], pool.void());
        let f2 = pool.func(vec![pool.i64()], pool.void());
        assert_eq!(f1, f2);
    }
}
