//! Expression parsing.
//!
//! Pratt-style precedence climbing over a small set of primaries. The
//! assignment family right-associates; everything else associates left.

use super::Parser;
use crate::ast::{DeclKind, ExprId, ExprKind, TypeId, UnOp};
use crate::token::{LiteralKind, TokenKind};
use meddle_base::{intern::kw, Result, Symbol};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> Result<ExprId> {
        let lhs = self.parse_unary()?;
        self.parse_binary(lhs, 0)
    }

    fn parse_binary(&mut self, mut lhs: ExprId, min_prec: i32) -> Result<ExprId> {
        while let Some(prec) = self.bin_precedence() {
            if prec < min_prec {
                break;
            }
            let op = self.bin_operator().expect("precedence implies operator");
            let loc = self.loc();
            self.bump();

            let mut rhs = self.parse_unary()?;
            while let Some(next) = self.bin_precedence() {
                let climbs = next > prec
                    || (next == prec && op.is_assignment());
                if !climbs {
                    break;
                }
                let next_min = if next > prec { prec + 1 } else { prec };
                rhs = self.parse_binary(rhs, next_min)?;
            }

            lhs = self.mk_expr(loc, ExprKind::Binary { op, lhs, rhs });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprId> {
        if let Some(op) = self.un_operator() {
            let loc = self.loc();
            self.bump();
            let expr = self.parse_unary()?;
            return Ok(self.mk_expr(
                loc,
                ExprKind::Unary {
                    op,
                    expr,
                    postfix: false,
                },
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprId> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.cur().kind {
                TokenKind::Dot => {
                    let loc = self.loc();
                    self.bump();
                    if !self.at(TokenKind::Ident) {
                        return Err(self.err("expected member name after '.'"));
                    }
                    let name = self.cur().text;
                    self.bump();

                    if self.at(TokenKind::LParen) {
                        let args = self.parse_call_args()?;
                        expr = self.mk_expr(
                            loc,
                            ExprKind::MethodCall {
                                base: expr,
                                name,
                                decl: None,
                                args,
                            },
                        );
                    } else {
                        expr = self.mk_expr(
                            loc,
                            ExprKind::Access {
                                base: expr,
                                name,
                                field: None,
                            },
                        );
                    }
                }
                TokenKind::LBrack => {
                    let loc = self.loc();
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(
                        TokenKind::RBrack,
                        "expected ']' after subscript",
                    )?;
                    expr = self.mk_expr(
                        loc,
                        ExprKind::Subscript { base: expr, index },
                    );
                }
                TokenKind::LParen => {
                    let loc = self.loc();
                    if !matches!(
                        self.unit.expr(expr).kind,
                        ExprKind::Ref { .. } | ExprKind::Spec { .. }
                    ) {
                        return Err(
                            self.err("expected function name before '('")
                        );
                    }
                    let args = self.parse_call_args()?;
                    expr = self.mk_expr(
                        loc,
                        ExprKind::Call {
                            callee: expr,
                            targs: Vec::new(),
                            args,
                        },
                    );
                }
                TokenKind::Path => {
                    let loc = self.loc();
                    let (qualifier, qual_decl) = match &self
                        .unit
                        .expr(expr)
                        .kind
                    {
                        ExprKind::Ref { name, decl } => (*name, *decl),
                        _ => {
                            return Err(
                                self.err("'::' requires a named qualifier")
                            )
                        }
                    };
                    self.bump();
                    if !self.at(TokenKind::Ident) {
                        return Err(self.err("expected name after '::'"));
                    }
                    let member = self.cur().text;
                    self.bump();
                    expr = self.mk_expr(
                        loc,
                        ExprKind::Spec {
                            qualifier,
                            qual_decl,
                            member,
                            decl: None,
                        },
                    );
                }
                TokenKind::PlusPlus => {
                    let loc = self.loc();
                    self.bump();
                    expr = self.mk_expr(
                        loc,
                        ExprKind::Unary {
                            op: UnOp::Inc,
                            expr,
                            postfix: true,
                        },
                    );
                }
                TokenKind::MinusMinus => {
                    let loc = self.loc();
                    self.bump();
                    expr = self.mk_expr(
                        loc,
                        ExprKind::Unary {
                            op: UnOp::Dec,
                            expr,
                            postfix: true,
                        },
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<ExprId> {
        if self.at(TokenKind::Ident) {
            return self.parse_ident_expr();
        }
        if self.at(TokenKind::LParen) {
            let loc = self.loc();
            self.bump();
            let inner = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')' after expression")?;
            return Ok(self.mk_expr(loc, ExprKind::Paren { expr: inner }));
        }
        if self.at_lit(LiteralKind::Int) {
            let loc = self.loc();
            let value = self.parse_int_text()?;
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Int(value)));
        }
        if self.at_lit(LiteralKind::Float) {
            let loc = self.loc();
            let text = self.interner.resolve(self.cur().text);
            let value = text
                .parse::<f64>()
                .map_err(|_| self.err("malformed float literal"))?;
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Float(value)));
        }
        if self.at_lit(LiteralKind::Char) {
            let loc = self.loc();
            let text = self.interner.resolve(self.cur().text);
            let value = text.as_bytes().first().copied().unwrap_or(0);
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Char(value)));
        }
        if self.at_lit(LiteralKind::Str) {
            let loc = self.loc();
            let value = self.interner.resolve(self.cur().text).to_string();
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Str(value)));
        }
        if self.at(TokenKind::LBrack) {
            return self.parse_array_init();
        }
        if self.at(TokenKind::Dollar) {
            return self.parse_syscall_expr();
        }
        Err(self.err("expected expression"))
    }

    fn parse_ident_expr(&mut self) -> Result<ExprId> {
        if self.at_kw(kw::CAST) {
            return self.parse_cast();
        }
        if self.at_kw(kw::NIL) {
            let loc = self.loc();
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Nil));
        }
        if self.at_kw(kw::TRUE) || self.at_kw(kw::FALSE) {
            let loc = self.loc();
            let value = self.at_kw(kw::TRUE);
            self.bump();
            return Ok(self.mk_expr(loc, ExprKind::Bool(value)));
        }
        if self.at_kw(kw::SIZEOF) {
            return self.parse_sizeof();
        }

        // Plain reference, call, templated call, or struct initialiser.
        let loc = self.loc();
        let name = self.cur().text;
        let decl = self.unit.lookup(self.scope, name);
        self.bump();

        // `foo<T, …>` is a template application only when the angle list
        // parses cleanly and is followed by `(` or `{`; otherwise `<` is the
        // less-than operator.
        let mut targs: Vec<TypeId> = Vec::new();
        if self.at(TokenKind::Lt) {
            let saved = self.save();
            match self.try_parse_type_args() {
                Ok(args)
                    if self.at(TokenKind::LParen)
                        || self.at(TokenKind::LBrace) =>
                {
                    targs = args;
                }
                _ => self.restore(saved),
            }
        }

        if self.at(TokenKind::LParen) {
            let callee = self.mk_expr(loc, ExprKind::Ref { name, decl });
            let args = self.parse_call_args()?;
            return Ok(self.mk_expr(
                loc,
                ExprKind::Call {
                    callee,
                    targs,
                    args,
                },
            ));
        }

        if self.at(TokenKind::LBrace) && self.is_struct_name(decl) {
            return self.parse_struct_init(name, decl, targs);
        }

        Ok(self.mk_expr(loc, ExprKind::Ref { name, decl }))
    }

    fn is_struct_name(&self, decl: Option<crate::ast::DeclId>) -> bool {
        match decl {
            Some(d) if d.unit == self.unit.id => matches!(
                self.unit.decl(d).kind,
                DeclKind::Struct { .. } | DeclKind::TemplateStruct { .. }
            ),
            _ => false,
        }
    }

    fn try_parse_type_args(&mut self) -> Result<Vec<TypeId>> {
        self.bump(); // '<'
        let mut args = Vec::new();
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
            return Err(self.err("type argument list cannot be empty"));
        }
        Ok(args)
    }

    fn parse_call_args(&mut self) -> Result<Vec<ExprId>> {
        self.bump(); // '('
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if self.at(TokenKind::RParen) {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' or ')' in argument list",
            )?;
        }
        self.bump(); // ')'
        Ok(args)
    }

    fn parse_struct_init(
        &mut self,
        name: Symbol,
        decl: Option<crate::ast::DeclId>,
        targs: Vec<TypeId>,
    ) -> Result<ExprId> {
        let loc = self.loc();
        self.bump(); // '{'

        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected field name in initializer"));
            }
            let fname = self.cur().text;
            self.bump();
            self.expect(TokenKind::Colon, "expected ':' after field name")?;
            let value = self.parse_expr()?;
            fields.push((fname, value));

            if self.at(TokenKind::RBrace) {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' or '}' in struct initializer",
            )?;
        }
        self.bump(); // '}'

        Ok(self.mk_expr(
            loc,
            ExprKind::StructInit {
                name,
                decl,
                targs,
                fields,
            },
        ))
    }

    fn parse_array_init(&mut self) -> Result<ExprId> {
        let loc = self.loc();
        self.bump(); // '['

        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrack) {
            elems.push(self.parse_expr()?);
            if self.at(TokenKind::RBrack) {
                break;
            }
            self.expect(
                TokenKind::Comma,
                "expected ',' or ']' in array initializer",
            )?;
        }
        self.bump(); // ']'

        Ok(self.mk_expr(loc, ExprKind::ArrayInit { elems }))
    }

    fn parse_cast(&mut self) -> Result<ExprId> {
        let loc = self.loc();
        self.bump(); // 'cast'
        let target = self.parse_angled_type("cast", loc)?;
        let operand = self.parse_expr()?;
        let expr = self.mk_expr(loc, ExprKind::Cast { expr: operand });
        self.unit.expr_mut(expr).ty = Some(target);
        Ok(expr)
    }

    fn parse_sizeof(&mut self) -> Result<ExprId> {
        let loc = self.loc();
        self.bump(); // 'sizeof'
        let target = self.parse_angled_type("sizeof", loc)?;
        Ok(self.mk_expr(loc, ExprKind::Sizeof { target }))
    }

    fn parse_syscall_expr(&mut self) -> Result<ExprId> {
        let loc = self.loc();
        self.bump(); // '$'

        if !self.at_kw(kw::SYSCALL) {
            return Err(self.err("unknown rune expression"));
        }
        self.bump();

        self.expect(TokenKind::LParen, "expected '(' after 'syscall'")?;
        if !self.at_lit(LiteralKind::Int) {
            return Err(self.err("expected syscall number literal"));
        }
        let num = self.parse_int_text()?;
        self.bump();

        let mut args = Vec::new();
        while self.at(TokenKind::Comma) {
            self.bump();
            args.push(self.parse_expr()?);
        }
        self.expect(
            TokenKind::RParen,
            "expected ')' after syscall arguments",
        )?;

        Ok(self.mk_expr(loc, ExprKind::Syscall { num, args }))
    }
}
