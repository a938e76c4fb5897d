//! System V x86-64 data layout.

use crate::ty::{TyId, TyKind, TypePool};

/// Sizes, alignments and field offsets for the fixed target.
pub struct DataLayout<'a> {
    pool: &'a TypePool,
}

impl<'a> DataLayout<'a> {
    pub fn new(pool: &'a TypePool) -> Self {
        Self { pool }
    }

    pub fn pointer_size(&self) -> u64 {
        8
    }

    pub fn size_of(&self, ty: TyId) -> u64 {
        match self.pool.kind(ty) {
            TyKind::I1 | TyKind::I8 => 1,
            TyKind::I16 => 2,
            TyKind::I32 | TyKind::F32 => 4,
            TyKind::I64 | TyKind::F64 => 8,
            TyKind::Void => 0,
            TyKind::Ptr { .. } | TyKind::Fn { .. } => 8,
            TyKind::Array { elem, size } => self.size_of(*elem) * size,
            TyKind::Struct { members, .. } => {
                let mut offset = 0;
                for member in members {
                    let align = self.align_of(*member);
                    offset = round_up(offset, align);
                    offset += self.size_of(*member);
                }
                round_up(offset, self.align_of(ty))
            }
        }
    }

    pub fn align_of(&self, ty: TyId) -> u32 {
        match self.pool.kind(ty) {
            TyKind::I1 | TyKind::I8 => 1,
            TyKind::I16 => 2,
            TyKind::I32 | TyKind::F32 => 4,
            TyKind::I64 | TyKind::F64 => 8,
            TyKind::Void => 1,
            TyKind::Ptr { .. } | TyKind::Fn { .. } => 8,
            TyKind::Array { elem, .. } => self.align_of(*elem),
            TyKind::Struct { members, .. } => members
                .iter()
                .map(|m| self.align_of(*m))
                .max()
                .unwrap_or(1),
        }
    }

    /// Byte offset of a struct member.
    pub fn field_offset(&self, ty: TyId, index: usize) -> u64 {
        let members = match self.pool.kind(ty) {
            TyKind::Struct { members, .. } => members,
            _ => return 0,
        };
        let mut offset = 0;
        for (i, member) in members.iter().enumerate() {
            let align = self.align_of(*member);
            offset = round_up(offset, align);
            if i == index {
                return offset;
            }
            offset += self.size_of(*member);
        }
        offset
    }

    pub fn is_scalar(&self, ty: TyId) -> bool {
        self.pool.is_scalar(ty)
    }
}

fn round_up(value: u64, align: u32) -> u64 {
    let align = align as u64;
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        let pool = TypePool::new();
        let dl = DataLayout::new(&pool);
        assert_eq!(dl.size_of(pool.i1()), 1);
        assert_eq!(dl.size_of(pool.i32()), 4);
        assert_eq!(dl.size_of(pool.f64()), 8);
        assert_eq!(dl.align_of(pool.i64()), 8);
    }

    #[test]
    fn array_layout_follows_element() {
        let mut pool = TypePool::new();
        let arr = pool.array(pool.i8(), 7);
        let dl = DataLayout::new(&pool);
        assert_eq!(dl.size_of(arr), 7);
        assert_eq!(dl.align_of(arr), 1);
    }

    #[test]
    fn struct_layout_pads_and_rounds() {
        let mut pool = TypePool::new();
        let s = pool.struct_create("Mixed");
        pool.struct_set_members(s, vec![pool.i8(), pool.i64(), pool.i16()]);
        let dl = DataLayout::new(&pool);
        assert_eq!(dl.field_offset(s, 0), 0);
        assert_eq!(dl.field_offset(s, 1), 8);
        assert_eq!(dl.field_offset(s, 2), 16);
        assert_eq!(dl.align_of(s), 8);
        assert_eq!(dl.size_of(s), 24);
    }
}
