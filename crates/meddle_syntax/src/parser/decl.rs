//! Declaration parsing.
//!
//! `decl ::= runes? ident template-params? '::' decl-body`
//!
//! The body form decides the declaration kind: `(` starts a function, `{` a
//! struct, `fix`/`mut` a global variable, anything else an enum.

use super::Parser;
use crate::ast::{
    DeclData, DeclId, DeclKind, ExprId, ExprKind, Runes, TypeId,
};
use crate::token::{LiteralKind, TokenKind};
use crate::types::TypeKind;
use meddle_base::{intern::kw, Result, SourceLoc, Symbol};

impl<'a> Parser<'a> {
    pub(crate) fn parse_decl(&mut self) -> Result<()> {
        let runes = self.parse_runes()?;

        if !self.at(TokenKind::Ident) {
            return Err(self.err("expected declaration identifier"));
        }
        if self.at_kw(kw::USE) {
            self.parse_use(runes)?;
            return Ok(());
        }

        let name = self.cur().text;
        let name_loc = self.loc();
        self.bump();

        let tparams = self.parse_template_params(name_loc)?;

        if self.at(TokenKind::Path) {
            self.bump();
        }

        let decl = if self.at(TokenKind::LParen) {
            self.parse_function(name, name_loc, runes, &tparams)?
        } else if self.at(TokenKind::LBrace) {
            self.parse_struct(name, name_loc, runes, &tparams)?
        } else if self.at_kw(kw::FIX) || self.at_kw(kw::MUT) {
            if !tparams.is_empty() {
                return Err(self.err_at(
                    "global variable cannot be made a template",
                    name_loc,
                ));
            }
            self.parse_global_var(name, name_loc, runes)?
        } else {
            if !tparams.is_empty() {
                return Err(
                    self.err_at("enum cannot be made a template", name_loc)
                );
            }
            self.parse_enum(name, name_loc, runes)?
        };

        if self.unit.decl(decl).is_public() {
            self.unit.add_export(decl);
        }
        self.unit.add_item(decl);
        Ok(())
    }

    /// Optional `<T, U>` after a declaration name.
    fn parse_template_params(
        &mut self,
        name_loc: SourceLoc,
    ) -> Result<Vec<(Symbol, SourceLoc)>> {
        let mut params = Vec::new();
        if !self.at(TokenKind::Lt) {
            return Ok(params);
        }
        self.bump(); // '<'

        while !self.at_close_angle() {
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected parameter name"));
            }
            params.push((self.cur().text, self.loc()));
            self.bump();

            if self.at_close_angle() {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' in template parameter list",
            )?;
        }
        if params.is_empty() {
            return Err(self.err_at(
                "template must have at least one parameter",
                name_loc,
            ));
        }
        self.eat_close_angle("expected '>' after template parameters")?;
        Ok(params)
    }

    /// Creates the template-parameter declarations in the current scope and
    /// returns their ids.
    fn declare_template_params(
        &mut self,
        tparams: &[(Symbol, SourceLoc)],
    ) -> Result<Vec<DeclId>> {
        let mut ids = Vec::with_capacity(tparams.len());
        for (i, &(pname, ploc)) in tparams.iter().enumerate() {
            let ty = self.unit.types.make_template_param(pname, i as u32);
            let scope = self.scope;
            let decl = self.unit.alloc_decl(DeclData {
                name: pname,
                runes: Runes::empty(),
                loc: ploc,
                scope,
                kind: DeclKind::TemplateParam {
                    ty,
                    index: i as u32,
                    owner: None,
                },
            });
            if let TypeKind::TemplateParam { owner, .. } =
                &mut self.unit.types.get_mut(ty).kind
            {
                *owner = Some(decl);
            }
            self.declare(pname, decl, ploc)?;
            ids.push(decl);
        }
        Ok(ids)
    }

    pub(crate) fn parse_function(
        &mut self,
        name: Symbol,
        name_loc: SourceLoc,
        runes: Runes,
        tparams: &[(Symbol, SourceLoc)],
    ) -> Result<DeclId> {
        if !self.at(TokenKind::LParen) {
            return Err(self.err("expected function declaration"));
        }
        let fn_scope = self.enter_scope();
        let tparam_decls = self.declare_template_params(tparams)?;
        self.bump(); // '('

        let mut params = Vec::new();
        let mut param_tys = Vec::new();
        while !self.at(TokenKind::RParen) {
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected function parameter name"));
            }
            let pname = self.cur().text;
            let ploc = self.loc();
            self.bump();

            self.expect(TokenKind::Colon, "expected ':' after parameter name")?;
            let pty = self.parse_type()?;
            if pty == self.unit.types.void_ty() {
                return Err(self.err("parameter type cannot be 'void'"));
            }

            let param = self.unit.alloc_decl(DeclData {
                name: pname,
                runes: Runes::empty(),
                loc: ploc,
                scope: fn_scope,
                kind: DeclKind::Param {
                    ty: pty,
                    index: params.len() as u32,
                    parent: None,
                },
            });
            self.declare(pname, param, ploc)?;
            params.push(param);
            param_tys.push(pty);

            if self.at(TokenKind::RParen) {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' in function parameter list",
            )?;
        }
        self.bump(); // ')'

        let ret_ty = if self.at(TokenKind::Ident) {
            self.parse_type()?
        } else if self.at(TokenKind::Arrow) {
            self.bump();
            self.parse_type()?
        } else {
            self.unit.types.void_ty()
        };
        let fn_ty = self.unit.types.intern_function(param_tys, ret_ty);

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_stmt()?)
        } else {
            self.expect(
                TokenKind::Semi,
                "expected ';' after function declaration",
            )?;
            None
        };

        self.exit_scope();

        let outer = self.scope;
        let fn_decl = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope: outer,
            kind: DeclKind::Function {
                ty: fn_ty,
                scope: fn_scope,
                params: params.clone(),
                body,
                parent: None,
                special: None,
            },
        });
        for param in &params {
            if let DeclKind::Param { parent, .. } =
                &mut self.unit.decl_mut(*param).kind
            {
                *parent = Some(fn_decl);
            }
        }

        if tparam_decls.is_empty() {
            self.declare(name, fn_decl, name_loc)?;
            return Ok(fn_decl);
        }

        let template = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope: outer,
            kind: DeclKind::TemplateFunction {
                inner: fn_decl,
                params: tparam_decls.clone(),
                specs: Vec::new(),
            },
        });
        for tp in &tparam_decls {
            if let DeclKind::TemplateParam { owner, .. } =
                &mut self.unit.decl_mut(*tp).kind
            {
                *owner = Some(template);
            }
        }
        self.declare(name, template, name_loc)?;
        Ok(template)
    }

    pub(crate) fn parse_struct(
        &mut self,
        name: Symbol,
        name_loc: SourceLoc,
        runes: Runes,
        tparams: &[(Symbol, SourceLoc)],
    ) -> Result<DeclId> {
        let struct_scope = self.enter_scope();
        let tparam_decls = self.declare_template_params(tparams)?;
        self.bump(); // '{'

        let mut fields: Vec<DeclId> = Vec::new();
        let mut methods: Vec<DeclId> = Vec::new();

        while !self.at(TokenKind::RBrace) {
            let member_runes = self.parse_runes()?;

            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected named declaration"));
            }
            let mname = self.cur().text;
            let mloc = self.loc();
            self.bump();

            if self.at(TokenKind::Lt) {
                return Err(
                    self.err_at("method templates are not supported", mloc)
                );
            }

            if self.at(TokenKind::Colon) {
                self.bump();
                let fty = self.parse_type()?;

                let init = if self.at(TokenKind::Eq) {
                    self.bump();
                    let init = self.parse_expr()?;
                    if !self.is_const_expr(init) {
                        return Err(self.err(
                            "struct field must be initialized with a constant",
                        ));
                    }
                    Some(init)
                } else {
                    None
                };

                let field = self.unit.alloc_decl(DeclData {
                    name: mname,
                    runes: member_runes,
                    loc: mloc,
                    scope: struct_scope,
                    kind: DeclKind::Field {
                        ty: fty,
                        init,
                        index: fields.len() as u32,
                        parent: None,
                    },
                });
                self.declare(mname, field, mloc)?;
                fields.push(field);

                if self.at(TokenKind::RBrace) {
                    break;
                }
                self.expect(
                    TokenKind::Comma,
                    "expected ',' in struct member list",
                )?;
            } else if self.at(TokenKind::Path) {
                self.bump();
                let method =
                    self.parse_function(mname, mloc, member_runes, &[])?;
                methods.push(method);
            } else {
                return Err(self.err("expected field or method declaration"));
            }
        }
        self.bump(); // '}'
        self.exit_scope();

        let ty = match self.unit.types.declare_named(
            name,
            TypeKind::Struct { name, decl: None },
        ) {
            Ok(ty) => ty,
            Err(_) => {
                let spelled = self.interner.resolve(name).to_string();
                return Err(self.err_at(
                    format!("type already exists: {spelled}"),
                    name_loc,
                ));
            }
        };

        let outer = self.scope;
        let struct_decl = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope: outer,
            kind: DeclKind::Struct {
                ty,
                scope: struct_scope,
                fields: fields.clone(),
                methods: methods.clone(),
                special: None,
            },
        });
        if let TypeKind::Struct { decl, .. } =
            &mut self.unit.types.get_mut(ty).kind
        {
            *decl = Some(struct_decl);
        }
        for field in &fields {
            if let DeclKind::Field { parent, .. } =
                &mut self.unit.decl_mut(*field).kind
            {
                *parent = Some(struct_decl);
            }
        }
        for method in &methods {
            if let DeclKind::Function { parent, .. } =
                &mut self.unit.decl_mut(*method).kind
            {
                *parent = Some(struct_decl);
            }
        }

        if tparam_decls.is_empty() {
            self.declare(name, struct_decl, name_loc)?;
            return Ok(struct_decl);
        }

        let template = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope: outer,
            kind: DeclKind::TemplateStruct {
                inner: struct_decl,
                params: tparam_decls.clone(),
                specs: Vec::new(),
            },
        });
        for tp in &tparam_decls {
            if let DeclKind::TemplateParam { owner, .. } =
                &mut self.unit.decl_mut(*tp).kind
            {
                *owner = Some(template);
            }
        }
        self.declare(name, template, name_loc)?;
        Ok(template)
    }

    fn parse_enum(
        &mut self,
        name: Symbol,
        name_loc: SourceLoc,
        runes: Runes,
    ) -> Result<DeclId> {
        let underlying = self.parse_type()?;

        let ty = match self.unit.types.declare_named(
            name,
            TypeKind::Enum {
                name,
                underlying,
                decl: None,
            },
        ) {
            Ok(ty) => ty,
            Err(_) => {
                let spelled = self.interner.resolve(name).to_string();
                return Err(self.err_at(
                    format!("type already exists: {spelled}"),
                    name_loc,
                ));
            }
        };

        self.expect(TokenKind::LBrace, "expected '{' after enum type")?;

        let mut variants = Vec::new();
        let mut next_value: i64 = 0;
        while !self.at(TokenKind::RBrace) {
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected enum variant name"));
            }
            let vname = self.cur().text;
            let vloc = self.loc();
            self.bump();

            let mut value = next_value;
            if self.at(TokenKind::Eq) {
                self.bump();
                if !self.at_lit(LiteralKind::Int) {
                    return Err(
                        self.err("expected integer literal after '='")
                    );
                }
                value = self.parse_int_text()?;
                self.bump();
            }
            next_value = value + 1;

            let mut vrunes = Runes::empty();
            if runes.contains(Runes::PUBLIC) {
                vrunes |= Runes::PUBLIC;
            }

            let scope = self.scope;
            let variant = self.unit.alloc_decl(DeclData {
                name: vname,
                runes: vrunes,
                loc: vloc,
                scope,
                kind: DeclKind::EnumVariant { ty, value },
            });
            self.declare(vname, variant, vloc)?;
            variants.push(variant);

            if self.at(TokenKind::RBrace) {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' or '}' in enum variant list",
            )?;
        }
        self.bump(); // '}'

        if variants.is_empty() {
            return Err(
                self.err_at("enum must have at least one variant", name_loc)
            );
        }

        let scope = self.scope;
        let enum_decl = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope,
            kind: DeclKind::Enum {
                ty,
                underlying,
                variants,
            },
        });
        if let TypeKind::Enum { decl, .. } =
            &mut self.unit.types.get_mut(ty).kind
        {
            *decl = Some(enum_decl);
        }
        self.declare(name, enum_decl, name_loc)?;
        Ok(enum_decl)
    }

    fn parse_global_var(
        &mut self,
        name: Symbol,
        name_loc: SourceLoc,
        runes: Runes,
    ) -> Result<DeclId> {
        let mutable = self.at_kw(kw::MUT);
        self.bump(); // 'fix' or 'mut'

        let ty = self.parse_type()?;

        if !self.at(TokenKind::Eq) {
            return Err(self.err("global variable must have an initializer"));
        }
        self.bump();

        let init = self.parse_expr()?;
        if !self.is_const_expr(init) {
            return Err(
                self.err("global variable must be initialized with a constant")
            );
        }

        self.expect(TokenKind::Semi, "expected ';' after variable")?;

        let scope = self.scope;
        let decl = self.unit.alloc_decl(DeclData {
            name,
            runes,
            loc: name_loc,
            scope,
            kind: DeclKind::Var {
                ty: Some(ty),
                init: Some(init),
                mutable,
                global: true,
            },
        });
        self.declare(name, decl, name_loc)?;
        Ok(decl)
    }

    /// Local variable declaration (`fix`/`mut` in statement position).
    pub(crate) fn parse_var(&mut self, mutable: bool) -> Result<DeclId> {
        let loc = self.loc();
        self.bump(); // 'fix' or 'mut'

        if !self.at(TokenKind::Ident) {
            return Err(self.err("expected variable name"));
        }
        let name = self.cur().text;
        self.bump();

        let mut ty: Option<TypeId> = None;
        if self.at(TokenKind::Colon) {
            self.bump();
            ty = Some(self.parse_type()?);
        }

        let mut init: Option<ExprId> = None;
        if self.at(TokenKind::Eq) {
            self.bump();
            init = Some(self.parse_expr()?);
        } else if !mutable {
            let spelled = self.interner.resolve(name).to_string();
            return Err(self.err(format!(
                "immutable variable must be initialized: {spelled}"
            )));
        } else if ty.is_none() {
            let spelled = self.interner.resolve(name).to_string();
            return Err(self.err(format!(
                "type cannot be inferred without an initializer: {spelled}"
            )));
        }

        self.expect(
            TokenKind::Semi,
            "expected ';' after variable declaration",
        )?;

        let scope = self.scope;
        let decl = self.unit.alloc_decl(DeclData {
            name,
            runes: Runes::empty(),
            loc,
            scope,
            kind: DeclKind::Var {
                ty,
                init,
                mutable,
                global: false,
            },
        });
        self.declare(name, decl, loc)?;
        Ok(decl)
    }

    fn parse_use(&mut self, runes: Runes) -> Result<()> {
        let loc = self.loc();
        self.bump(); // 'use'

        let mut alias: Option<Symbol> = None;
        let mut symbols: Vec<Symbol> = Vec::new();

        if self.at(TokenKind::Ident) {
            alias = Some(self.cur().text);
            self.bump();
            if !self.at(TokenKind::Eq) {
                return Err(self.err("expected '=' after named 'use'"));
            }
            self.bump();
        } else if self.at(TokenKind::LBrace) {
            self.bump();
            while !self.at(TokenKind::RBrace) {
                if !self.at(TokenKind::Ident) {
                    return Err(self.err(
                        "expected identifier in listed use declaration",
                    ));
                }
                symbols.push(self.cur().text);
                self.bump();

                if self.at(TokenKind::RBrace) {
                    break;
                }
                self.expect(
                    TokenKind::Comma,
                    "expected ',' or '}' in listed use declaration",
                )?;
            }
            self.bump(); // '}'
            if !self.at(TokenKind::Eq) {
                return Err(self.err("expected '=' after listed 'use'"));
            }
            self.bump();
        }

        if !self.at_lit(LiteralKind::Str) {
            return Err(self.err("expected string path after 'use'"));
        }
        let path = self.cur().text;
        self.bump();

        self.expect(TokenKind::Semi, "expected ';' after use declaration")?;

        let scope = self.scope;
        let decl = self.unit.alloc_decl(DeclData {
            name: alias.unwrap_or_default(),
            runes,
            loc,
            scope,
            kind: DeclKind::Use {
                path,
                alias,
                symbols,
                target: None,
            },
        });
        if let Some(alias) = alias {
            self.declare(alias, decl, loc)?;
        }
        self.unit.add_use(decl);
        Ok(())
    }

    /// Syntactic constant check for global and field initialisers.
    pub(crate) fn is_const_expr(&self, expr: ExprId) -> bool {
        match &self.unit.expr(expr).kind {
            ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Char(_)
            | ExprKind::Str(_)
            | ExprKind::Nil
            | ExprKind::Sizeof { .. }
            | ExprKind::Spec { .. } => true,
            ExprKind::Paren { expr } | ExprKind::Cast { expr } => {
                self.is_const_expr(*expr)
            }
            ExprKind::Unary { op, expr, .. } => {
                matches!(op, crate::ast::UnOp::Neg | crate::ast::UnOp::BitNot)
                    && self.is_const_expr(*expr)
            }
            ExprKind::ArrayInit { elems } => {
                elems.iter().all(|e| self.is_const_expr(*e))
            }
            ExprKind::StructInit { fields, .. } => {
                fields.iter().all(|(_, e)| self.is_const_expr(*e))
            }
            _ => false,
        }
    }

    /// Parses the current integer-literal token's text.
    pub(crate) fn parse_int_text(&self) -> Result<i64> {
        let text = self.interner.resolve(self.cur().text);
        text.parse::<i64>()
            .map_err(|_| self.err("malformed integer literal"))
    }
}
