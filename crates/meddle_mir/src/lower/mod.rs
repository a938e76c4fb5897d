//! AST → MIR lowering.
//!
//! Lowering is a two-pass walk per unit: declare every function shell and
//! struct type, then define bodies. Expressions are visited in an
//! operand-context discipline: `LValue` demands an address, `RValue` a
//! value. A parent may set the current *place* to direct an aggregate
//! initialiser (or a call returning an aggregate) straight into a
//! destination address.

mod binary;
mod expr;
mod stmt;
mod unary;

use crate::builder::Builder;
use crate::function::{ArgAttr, ArgData, BlockId, Function, Linkage};
use crate::inst::CmpKind;
use crate::layout::DataLayout;
use crate::segment::{FuncId, Segment, Target};
use crate::ty::TyId;
use crate::value::{SlotId, Value};
use meddle_base::{Diagnostic, Result, Session, SourceLoc};
use meddle_sema::unitman::UnitManager;
use meddle_syntax::ast::{DeclId, ExprId, TypeId, UnitId};
use meddle_syntax::{DeclKind, PrimKind, Runes, TypeKind};
use std::collections::HashMap;

/// What the parent demands of an expression: an address or a value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueCtx {
    LValue,
    RValue,
}

/// Lowers one resolved, checked translation unit into a fresh segment.
pub fn lower_unit(
    units: &UnitManager,
    sess: &Session,
    unit: UnitId,
) -> Result<Segment> {
    let mut lowering = Lowering {
        units,
        sess,
        unit,
        seg: Segment::new(Target::default()),
        b: Builder::new(crate::segment::FuncId(0)),
        slots: HashMap::new(),
        self_slot: None,
        place: None,
        merge_target: None,
        cond_target: None,
        mangled: HashMap::new(),
    };
    lowering.run()?;
    Ok(lowering.seg)
}

pub(crate) struct Lowering<'a> {
    pub(crate) units: &'a UnitManager,
    pub(crate) sess: &'a Session,
    pub(crate) unit: UnitId,
    pub(crate) seg: Segment,
    pub(crate) b: Builder,
    /// Local slots of the function being defined, by declaration.
    pub(crate) slots: HashMap<DeclId, SlotId>,
    /// The receiver slot inside a method body.
    pub(crate) self_slot: Option<SlotId>,
    /// Destination address for aggregate initialisers.
    pub(crate) place: Option<Value>,
    /// Innermost loop targets for `break` and `continue`.
    pub(crate) merge_target: Option<BlockId>,
    pub(crate) cond_target: Option<BlockId>,
    mangled: HashMap<DeclId, String>,
}

impl<'a> Lowering<'a> {
    fn run(&mut self) -> Result<()> {
        let items = self.units.unit(self.unit).items.clone();

        // Declare: function shells, struct types, module data.
        for item in &items {
            match self.units.decl(*item).kind.clone() {
                DeclKind::Function { .. } => {
                    self.declare_function(*item)?;
                }
                DeclKind::Var { global: true, .. } => {
                    self.declare_global(*item)?;
                }
                DeclKind::Struct { ty, methods, .. } => {
                    self.cgn_type(ty)?;
                    for method in methods {
                        self.declare_function(method)?;
                    }
                }
                _ => {}
            }
        }

        // Define: emit bodies.
        for item in &items {
            match self.units.decl(*item).kind.clone() {
                DeclKind::Function { .. } => {
                    self.define_function(*item)?;
                }
                DeclKind::Struct { methods, .. } => {
                    for method in methods {
                        self.define_function(method)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ---- shared helpers --------------------------------------------------

    pub(crate) fn err(
        &self,
        msg: impl Into<String>,
        loc: SourceLoc,
    ) -> Diagnostic {
        Diagnostic::error(msg, loc)
    }

    /// Mnemonic name when named MIR is enabled, empty otherwise.
    pub(crate) fn n<'x>(&self, name: &'x str) -> &'x str {
        if self.sess.opts.named_mir {
            name
        } else {
            ""
        }
    }

    /// The sema-resolved type of an expression.
    pub(crate) fn ety(&self, expr: ExprId) -> TypeId {
        self.units
            .expr(expr)
            .ty
            .expect("expression typed by sema")
    }

    pub(crate) fn eloc(&self, expr: ExprId) -> SourceLoc {
        self.units.expr(expr).loc
    }

    pub(crate) fn is_aggregate(&self, ty: TypeId) -> bool {
        matches!(
            self.units.type_class(ty),
            meddle_sema::unitman::TypeClass::Aggregate
        )
    }

    pub(crate) fn layout_size(&self, ty: TyId) -> u64 {
        DataLayout::new(&self.seg.types).size_of(ty)
    }

    pub(crate) fn layout_align(&self, ty: TyId) -> u32 {
        DataLayout::new(&self.seg.types).align_of(ty)
    }

    /// Lowers a source type to its MIR mirror.
    pub(crate) fn cgn_type(&mut self, ty: TypeId) -> Result<TyId> {
        let canon = self.units.canon(ty);
        let lowered = match self.units.type_kind(canon).clone() {
            TypeKind::Primitive(kind) => match kind {
                PrimKind::Void => self.seg.types.void(),
                PrimKind::Bool => self.seg.types.i1(),
                PrimKind::Char | PrimKind::I8 | PrimKind::U8 => {
                    self.seg.types.i8()
                }
                PrimKind::I16 | PrimKind::U16 => self.seg.types.i16(),
                PrimKind::I32 | PrimKind::U32 => self.seg.types.i32(),
                PrimKind::I64 | PrimKind::U64 => self.seg.types.i64(),
                PrimKind::F32 => self.seg.types.f32(),
                PrimKind::F64 => self.seg.types.f64(),
            },
            TypeKind::Array { elem, size } => {
                let elem = self.cgn_type(elem)?;
                self.seg.types.array(elem, size)
            }
            TypeKind::Pointer { pointee } => {
                let pointee = self.cgn_type(pointee)?;
                self.seg.types.ptr(pointee)
            }
            TypeKind::Function { params, ret } => {
                let mut lowered = Vec::with_capacity(params.len());
                for param in params {
                    let ty = self.cgn_type(param)?;
                    if self.is_aggregate(param) {
                        lowered.push(self.seg.types.ptr(ty));
                    } else {
                        lowered.push(ty);
                    }
                }
                let ret = if self.is_aggregate(ret) {
                    self.seg.types.void()
                } else {
                    self.cgn_type(ret)?
                };
                self.seg.types.func(lowered, ret)
            }
            TypeKind::Enum { underlying, .. } => self.cgn_type(underlying)?,
            TypeKind::Struct { .. } | TypeKind::TemplateStruct { .. } => {
                let decl = self.units.struct_decl_of(canon).ok_or_else(|| {
                    Diagnostic::bare(
                        "struct type without a declaration reached lowering",
                    )
                })?;
                self.cgn_struct(decl)?
            }
            _ => {
                return Err(Diagnostic::bare(
                    "unresolved type reached lowering",
                ))
            }
        };
        Ok(lowered)
    }

    /// Gets or creates the MIR struct type for a struct declaration,
    /// registering the shell first so self-referential structs terminate.
    fn cgn_struct(&mut self, decl: DeclId) -> Result<TyId> {
        let name = self
            .sess
            .interner
            .resolve(self.units.decl(decl).name)
            .to_string();
        if let Some(existing) = self.seg.types.struct_get(&name) {
            return Ok(existing);
        }
        let id = self.seg.types.struct_create(&name);
        let fields = match &self.units.decl(decl).kind {
            DeclKind::Struct { fields, .. } => fields.clone(),
            _ => Vec::new(),
        };
        let mut members = Vec::with_capacity(fields.len());
        for field in fields {
            let fty = match &self.units.decl(field).kind {
                DeclKind::Field { ty, .. } => *ty,
                _ => continue,
            };
            members.push(self.cgn_type(fty)?);
        }
        self.seg.types.struct_set_members(id, members);
        Ok(id)
    }

    /// Function name mangling: methods and associated functions prefix
    /// their struct, `$no_mangle` keeps the name as written.
    pub(crate) fn mangle(&mut self, decl: DeclId) -> String {
        if let Some(cached) = self.mangled.get(&decl) {
            return cached.clone();
        }
        let data = self.units.decl(decl);
        let base = self.sess.interner.resolve(data.name).to_string();
        let mangled = if data.runes.contains(Runes::NO_MANGLE) {
            base
        } else if let DeclKind::Function {
            parent: Some(parent),
            ..
        } = &data.kind
        {
            let parent_name =
                self.sess.interner.resolve(self.units.decl(*parent).name);
            format!("{parent_name}.{base}")
        } else {
            base
        };
        self.mangled.insert(decl, mangled.clone());
        mangled
    }

    // ---- functions -------------------------------------------------------

    /// Emits the function shell: lowered type, argument list, argument
    /// slots. Functions from other units are declared as external shells on
    /// demand.
    pub(crate) fn declare_function(&mut self, decl: DeclId) -> Result<FuncId> {
        let name = self.mangle(decl);
        if let Some(existing) = self.seg.get_function(&name) {
            return Ok(existing);
        }

        let data = self.units.decl(decl).clone();
        let (fn_ty, params, body, parent) = match &data.kind {
            DeclKind::Function {
                ty,
                params,
                body,
                parent,
                ..
            } => (*ty, params.clone(), *body, *parent),
            _ => {
                return Err(Diagnostic::bare(
                    "declared callee is not a function",
                ))
            }
        };
        let (ast_params, ast_ret) = self
            .units
            .fn_signature(fn_ty)
            .expect("function decl has a function type");

        let is_method = data.is_method();
        let aggregate_ret = self.is_aggregate(ast_ret);
        let has_body = decl.unit == self.unit && body.is_some();

        let mir_fn_ty = self.cgn_type(fn_ty)?;
        let mir_ret = if aggregate_ret {
            self.seg.types.void()
        } else {
            self.cgn_type(ast_ret)?
        };
        let linkage = if data.is_public() || decl.unit != self.unit {
            Linkage::External
        } else {
            Linkage::Internal
        };

        let mut func = Function::new(name, mir_fn_ty, mir_ret, linkage);
        func.has_body = has_body;

        if aggregate_ret {
            let ret_ty = self.cgn_type(ast_ret)?;
            let ptr = self.seg.types.ptr(ret_ty);
            func.args.push(ArgData {
                name: self.n("aret.ptr").to_string(),
                ty: ptr,
                index: 0,
                attrs: ArgAttr::ARET,
                slot: None,
            });
        }

        if is_method {
            let parent = parent.expect("method has a parent struct");
            let struct_ty = match &self.units.decl(parent).kind {
                DeclKind::Struct { ty, .. } => *ty,
                _ => {
                    return Err(Diagnostic::bare(
                        "method parent is not a struct",
                    ))
                }
            };
            let struct_mir = self.cgn_type(struct_ty)?;
            let self_ty = self.seg.types.ptr(struct_mir);
            let slot = if has_body {
                let slot_ty = self.seg.types.ptr(self_ty);
                let align =
                    DataLayout::new(&self.seg.types).align_of(self_ty);
                Some(func.add_slot("self", slot_ty, self_ty, align))
            } else {
                None
            };
            let index = func.args.len() as u32;
            func.args.push(ArgData {
                name: "self".to_string(),
                ty: self_ty,
                index,
                attrs: ArgAttr::empty(),
                slot,
            });
        }

        for param in &params {
            let (pty, pname) = match &self.units.decl(*param).kind {
                DeclKind::Param { ty, .. } => (
                    *ty,
                    self.sess
                        .interner
                        .resolve(self.units.decl(*param).name)
                        .to_string(),
                ),
                _ => continue,
            };
            let lowered = self.cgn_type(pty)?;
            let aggregate = self.is_aggregate(pty);
            let (arg_ty, alloc) = if aggregate {
                (self.seg.types.ptr(lowered), lowered)
            } else {
                (lowered, lowered)
            };
            let slot = if has_body {
                let slot_ty = self.seg.types.ptr(alloc);
                let align = DataLayout::new(&self.seg.types).align_of(alloc);
                Some(func.add_slot(&pname, slot_ty, alloc, align))
            } else {
                None
            };
            let index = func.args.len() as u32;
            func.args.push(ArgData {
                name: pname,
                ty: arg_ty,
                index,
                attrs: if aggregate {
                    ArgAttr::AARG
                } else {
                    ArgAttr::empty()
                },
                slot,
            });
        }

        Ok(self.seg.add_function(func))
    }

    fn define_function(&mut self, decl: DeclId) -> Result<()> {
        let name = self.mangle(decl);
        let fid = self
            .seg
            .get_function(&name)
            .expect("function declared before definition");
        if !self.seg.function(fid).has_body {
            return Ok(());
        }

        let data = self.units.decl(decl).clone();
        let (params, body) = match &data.kind {
            DeclKind::Function { params, body, .. } => {
                (params.clone(), body.expect("has_body implies a body"))
            }
            _ => unreachable!("defined decl is a function"),
        };

        self.b = Builder::new(fid);
        self.slots.clear();
        self.self_slot = None;
        self.merge_target = None;
        self.cond_target = None;

        let entry_name = self.n("entry").to_string();
        let entry = self.b.create_block(&mut self.seg, &entry_name);
        self.b.append_block(&mut self.seg, entry);
        self.b.set_insert(entry);

        // Map source parameters onto their argument slots.
        let offset =
            self.seg.function(fid).args.len() - params.len();
        for (i, param) in params.iter().enumerate() {
            if let Some(slot) = self.seg.function(fid).arg(offset + i).slot {
                self.slots.insert(*param, slot);
            }
        }
        if data.is_method() {
            let self_index = offset - 1;
            self.self_slot = self.seg.function(fid).arg(self_index).slot;
        }

        // Entry block: spill scalar arguments, copy aggregate arguments.
        let arg_count = self.seg.function(fid).args.len();
        for i in 0..arg_count {
            let arg = self.seg.function(fid).arg(i).clone();
            if arg.attrs.contains(ArgAttr::ARET) {
                continue;
            }
            let slot = match arg.slot {
                Some(slot) => slot,
                None => continue,
            };
            let arg_value = Value::Arg(crate::value::ArgId::new(i));
            if arg.attrs.contains(ArgAttr::AARG) {
                let pointee = self
                    .seg
                    .types
                    .pointee(arg.ty)
                    .expect("aarg argument is a pointer");
                let align = self.layout_align(pointee);
                let size = self.layout_size(pointee);
                self.b.build_cpy(
                    &mut self.seg,
                    Value::Slot(slot),
                    align,
                    arg_value,
                    align,
                    size,
                );
            } else {
                self.b
                    .build_store(&mut self.seg, arg_value, Value::Slot(slot));
            }
        }

        self.lower_stmt(body)?;

        // A falling-off tail returns for void functions and is an error
        // otherwise.
        if !self.b.has_terminator(&self.seg) {
            let ret = self.seg.function(fid).ret;
            if self.seg.types.is_void(ret) {
                self.b.build_ret(&mut self.seg, None);
            } else {
                let fname = self.seg.function(fid).name.clone();
                return Err(self.err(
                    format!("function does not return a value: {fname}"),
                    data.loc,
                ));
            }
        }
        Ok(())
    }

    // ---- globals ---------------------------------------------------------

    fn declare_global(&mut self, decl: DeclId) -> Result<()> {
        let data = self.units.decl(decl).clone();
        let (ty, init, mutable) = match &data.kind {
            DeclKind::Var {
                ty: Some(ty),
                init: Some(init),
                mutable,
                ..
            } => (*ty, *init, *mutable),
            _ => {
                return Err(self.err(
                    "global variable must have an initializer",
                    data.loc,
                ))
            }
        };
        let lowered = self.cgn_type(ty)?;
        let value = self.lower_const_init(init)?;
        let align = self.layout_align(lowered);
        let name = self
            .sess
            .interner
            .resolve(data.name)
            .to_string();
        let ptr = self.seg.types.ptr(lowered);
        let linkage = if data.is_public() {
            Linkage::External
        } else {
            Linkage::Internal
        };
        self.seg
            .add_data(&name, ptr, value, align, !mutable, linkage);
        Ok(())
    }

    // ---- conditions ------------------------------------------------------

    /// Synthesises an `i1` from a non-boolean condition by comparing with
    /// the type's zero value. Constants pass through untouched.
    pub(crate) fn inject_cmp(&mut self, value: Value) -> Result<Value> {
        let ty = self.b.value_ty(&self.seg, value);
        if self.seg.types.is_i1(ty) || value.is_constant() {
            return Ok(value);
        }
        if self.seg.types.is_ptr(ty) {
            let nil = self.seg.const_nil(ty);
            let name = self.n("ptr.cmp").to_string();
            return Ok(self.b.build_cmp(
                &mut self.seg,
                CmpKind::PcmpNe,
                value,
                Value::Const(nil),
                &name,
            ));
        }
        if self.seg.types.is_integer(ty) {
            let zero = self.seg.const_int(ty, 0);
            let name = self.n("int.cmp").to_string();
            return Ok(self.b.build_cmp(
                &mut self.seg,
                CmpKind::IcmpNe,
                value,
                Value::Const(zero),
                &name,
            ));
        }
        if self.seg.types.is_float(ty) {
            let zero = self.seg.const_fp(ty, 0.0);
            let name = self.n("fp.cmp").to_string();
            return Ok(self.b.build_cmp(
                &mut self.seg,
                CmpKind::FcmpOne,
                value,
                Value::Const(zero),
                &name,
            ));
        }
        Err(Diagnostic::bare("unsupported conditional value"))
    }
}
