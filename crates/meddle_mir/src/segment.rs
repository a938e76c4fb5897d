//! The segment: the MIR module produced per translation unit.

use crate::function::{Function, Linkage};
use crate::ty::{TyId, TypePool};
use crate::value::{ConstData, ConstId, ConstKind};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arch {
    X86_64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Os {
    Linux,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Abi {
    SystemV,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Target {
    pub arch: Arch,
    pub os: Os,
    pub abi: Abi,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            arch: Arch::X86_64,
            os: Os::Linux,
            abi: Abi::SystemV,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DataId(pub(crate) u32);

impl DataId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Module-scope data: a named constant with linkage and alignment.
#[derive(Clone, Debug)]
pub struct DataDef {
    pub name: String,
    /// The data's value type is `value`'s type; the data itself is an
    /// address, so its own type is a pointer to it.
    pub ty: TyId,
    pub value: ConstId,
    pub align: u32,
    pub read_only: bool,
    pub linkage: Linkage,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Int(TyId, i64),
    Fp(TyId, u64),
    Nil(TyId),
}

pub struct Segment {
    pub target: Target,
    pub types: TypePool,
    consts: Vec<ConstData>,
    const_lookup: HashMap<ConstKey, ConstId>,
    pub data: Vec<DataDef>,
    data_names: HashMap<String, DataId>,
    data_name_counts: HashMap<String, u32>,
    pub functions: Vec<Function>,
    fn_names: HashMap<String, FuncId>,
}

impl Segment {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            types: TypePool::new(),
            consts: Vec::new(),
            const_lookup: HashMap::new(),
            data: Vec::new(),
            data_names: HashMap::new(),
            data_name_counts: HashMap::new(),
            functions: Vec::new(),
            fn_names: HashMap::new(),
        }
    }

    // ---- constants -------------------------------------------------------

    pub fn const_data(&self, id: ConstId) -> &ConstData {
        &self.consts[id.index()]
    }

    fn push_const(&mut self, data: ConstData) -> ConstId {
        let id = ConstId(self.consts.len() as u32);
        self.consts.push(data);
        id
    }

    pub fn const_int(&mut self, ty: TyId, value: i64) -> ConstId {
        let key = ConstKey::Int(ty, value);
        if let Some(&id) = self.const_lookup.get(&key) {
            return id;
        }
        let id = self.push_const(ConstData {
            ty,
            kind: ConstKind::Int(value),
        });
        self.const_lookup.insert(key, id);
        id
    }

    pub fn const_fp(&mut self, ty: TyId, value: f64) -> ConstId {
        let key = ConstKey::Fp(ty, value.to_bits());
        if let Some(&id) = self.const_lookup.get(&key) {
            return id;
        }
        let id = self.push_const(ConstData {
            ty,
            kind: ConstKind::Fp(value),
        });
        self.const_lookup.insert(key, id);
        id
    }

    pub fn const_nil(&mut self, ty: TyId) -> ConstId {
        let key = ConstKey::Nil(ty);
        if let Some(&id) = self.const_lookup.get(&key) {
            return id;
        }
        let id = self.push_const(ConstData {
            ty,
            kind: ConstKind::Nil,
        });
        self.const_lookup.insert(key, id);
        id
    }

    pub fn const_str(&mut self, ty: TyId, value: String) -> ConstId {
        self.push_const(ConstData {
            ty,
            kind: ConstKind::Str(value),
        })
    }

    pub fn const_aggregate(&mut self, ty: TyId, values: Vec<ConstId>) -> ConstId {
        self.push_const(ConstData {
            ty,
            kind: ConstKind::Aggregate(values),
        })
    }

    // ---- data ------------------------------------------------------------

    /// Adds module data; the base name is disambiguated per segment.
    pub fn add_data(
        &mut self,
        base_name: &str,
        ty: TyId,
        value: ConstId,
        align: u32,
        read_only: bool,
        linkage: Linkage,
    ) -> DataId {
        let name = if base_name.is_empty() {
            format!("data{}", self.data.len())
        } else {
            let count = self
                .data_name_counts
                .entry(base_name.to_string())
                .or_insert(0);
            let name = if *count == 0 {
                base_name.to_string()
            } else {
                format!("{base_name}{count}")
            };
            *count += 1;
            name
        };
        let id = DataId(self.data.len() as u32);
        self.data.push(DataDef {
            name: name.clone(),
            ty,
            value,
            align,
            read_only,
            linkage,
        });
        self.data_names.insert(name, id);
        id
    }

    pub fn data_def(&self, id: DataId) -> &DataDef {
        &self.data[id.index()]
    }

    pub fn get_data(&self, name: &str) -> Option<DataId> {
        self.data_names.get(name).copied()
    }

    // ---- functions -------------------------------------------------------

    pub fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        self.fn_names.insert(function.name.clone(), id);
        self.functions.push(function);
        id
    }

    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.fn_names.get(name).copied()
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len() as u32).map(FuncId)
    }
}
