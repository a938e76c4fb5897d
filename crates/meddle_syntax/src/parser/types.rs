//! Type parsing.
//!
//! `type ::= ident ('::' ident)? type-args? ('*' | '[' int ']')*`
//!
//! The base identifier resolves through the current scope (structs, enums,
//! template parameters, template structs), then the context's name table
//! (primitives, imported types). Anything else becomes a deferred type
//! resolved at sanitation.

use super::Parser;
use crate::ast::{DeclId, DeclKind, TypeId};
use crate::token::{LiteralKind, TokenKind};
use crate::types::TypeKind;
use meddle_base::{Result, SourceLoc, Symbol};

enum BaseType {
    Concrete(TypeId),
    Template(DeclId),
    Unknown(Symbol),
}

impl<'a> Parser<'a> {
    pub(crate) fn parse_type(&mut self) -> Result<TypeId> {
        if !self.at(TokenKind::Ident) {
            return Err(self.err("expected type identifier"));
        }
        let loc = self.loc();
        let mut name = self.cur().text;
        self.bump();

        // `Alias::Name` reaches types of a named import.
        if self.at(TokenKind::Path) && self.is_use_name(name) {
            self.bump(); // '::'
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected type identifier"));
            }
            let member = self.cur().text;
            self.bump();
            let spelled = format!(
                "{}::{}",
                self.interner.resolve(name),
                self.interner.resolve(member)
            );
            name = self.interner.intern(&spelled);
        }

        let mut args = Vec::new();
        let mut has_args = false;
        if self.at(TokenKind::Lt) {
            has_args = true;
            self.bump(); // '<'
            while !self.at_close_angle() {
                args.push(self.parse_type()?);
                if self.at_close_angle() {
                    break;
                }
                self.expect(
                    TokenKind::Comma,
                    "expected ',' or '>' in type argument list",
                )?;
            }
            self.eat_close_angle("expected '>' after type arguments")?;
            if args.is_empty() {
                return Err(
                    self.err_at("type argument list cannot be empty", loc)
                );
            }
        }

        let base = self.resolve_base_type(name);
        let mut ty = match base {
            BaseType::Concrete(ty) => {
                if has_args {
                    let spelled = self.interner.resolve(name).to_string();
                    return Err(self.err_at(
                        format!("'{spelled}' is not a template"),
                        loc,
                    ));
                }
                ty
            }
            BaseType::Template(template) => {
                if !has_args {
                    let spelled = self.interner.resolve(name).to_string();
                    return Err(self.err_at(
                        format!("missing template arguments for '{spelled}'"),
                        loc,
                    ));
                }
                if args.iter().any(|a| self.type_has_params(*a)) {
                    self.unit.types.intern_dependent(template, args)
                } else {
                    self.unit.types.intern_spec(template, args)
                }
            }
            BaseType::Unknown(name) => self.unit.types.defer(name, args, loc),
        };

        ty = self.parse_type_suffixes(ty)?;
        Ok(ty)
    }

    /// Applies trailing `*` and `[N]` to an already-resolved base type.
    pub(crate) fn parse_type_suffixes(
        &mut self,
        mut ty: TypeId,
    ) -> Result<TypeId> {
        loop {
            if self.at(TokenKind::Star) {
                self.bump();
                ty = self.unit.types.intern_pointer(ty);
            } else if self.at(TokenKind::LBrack) {
                self.bump();
                if !self.at_lit(LiteralKind::Int) {
                    return Err(self.err("expected integer literal"));
                }
                let size = self.parse_array_size()?;
                self.bump();
                self.expect(
                    TokenKind::RBrack,
                    "expected ']' after array size",
                )?;
                ty = self.unit.types.intern_array(ty, size);
            } else {
                return Ok(ty);
            }
        }
    }

    fn parse_array_size(&mut self) -> Result<u64> {
        let text = self.interner.resolve(self.cur().text);
        text.parse::<u64>()
            .map_err(|_| self.err("malformed array size"))
    }

    fn is_use_name(&self, name: Symbol) -> bool {
        match self.unit.lookup(self.scope, name) {
            Some(decl) if decl.unit == self.unit.id => {
                matches!(self.unit.decl(decl).kind, DeclKind::Use { .. })
            }
            _ => false,
        }
    }

    fn resolve_base_type(&self, name: Symbol) -> BaseType {
        if let Some(decl) = self.unit.lookup(self.scope, name) {
            if decl.unit == self.unit.id {
                match &self.unit.decl(decl).kind {
                    DeclKind::Struct { ty, .. }
                    | DeclKind::Enum { ty, .. }
                    | DeclKind::TemplateParam { ty, .. } => {
                        return BaseType::Concrete(*ty)
                    }
                    DeclKind::TemplateStruct { .. } => {
                        return BaseType::Template(decl)
                    }
                    _ => {}
                }
            }
        }
        if let Some(ty) = self.unit.types.named(name) {
            return BaseType::Concrete(ty);
        }
        BaseType::Unknown(name)
    }

    /// `true` if the type mentions a template parameter anywhere. Foreign
    /// handles are always concrete at parse time.
    pub(crate) fn type_has_params(&self, ty: TypeId) -> bool {
        if ty.unit != self.unit.id {
            return false;
        }
        match &self.unit.types.get(ty).kind {
            TypeKind::TemplateParam { .. } => true,
            TypeKind::Array { elem, .. } => self.type_has_params(*elem),
            TypeKind::Pointer { pointee } => self.type_has_params(*pointee),
            TypeKind::Function { params, ret } => {
                params.iter().any(|p| self.type_has_params(*p))
                    || self.type_has_params(*ret)
            }
            TypeKind::TemplateStruct { args, .. }
            | TypeKind::Dependent { args, .. }
            | TypeKind::Deferred { args, .. } => {
                args.iter().any(|a| self.type_has_params(*a))
            }
            _ => false,
        }
    }

    /// Shared by `cast<T>` and `sizeof<T>`.
    pub(crate) fn parse_angled_type(
        &mut self,
        what: &str,
        _loc: SourceLoc,
    ) -> Result<TypeId> {
        if !self.at(TokenKind::Lt) {
            return Err(
                self.err(format!("expected '<' after '{what}' keyword"))
            );
        }
        self.bump(); // '<'
        let ty = self.parse_type()?;
        self.eat_close_angle(&format!("expected '>' after '{what}' type"))?;
        Ok(ty)
    }
}
