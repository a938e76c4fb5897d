//! Statement parsing.

use super::Parser;
use crate::ast::{MatchCase, StmtId, StmtKind};
use crate::token::TokenKind;
use meddle_base::{intern::kw, Result};

impl<'a> Parser<'a> {
    pub(crate) fn parse_stmt(&mut self) -> Result<StmtId> {
        if self.at(TokenKind::LBrace) {
            self.parse_compound()
        } else if self.at_kw(kw::BREAK) {
            self.parse_break()
        } else if self.at_kw(kw::CONTINUE) {
            self.parse_continue()
        } else if self.at_kw(kw::FIX) {
            self.parse_decl_stmt(false)
        } else if self.at_kw(kw::MUT) {
            self.parse_decl_stmt(true)
        } else if self.at_kw(kw::IF) {
            self.parse_if()
        } else if self.at_kw(kw::MATCH) {
            self.parse_match()
        } else if self.at_kw(kw::RET) {
            self.parse_ret()
        } else if self.at_kw(kw::UNTIL) {
            self.parse_until()
        } else {
            self.parse_expr_stmt()
        }
    }

    fn parse_break(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'break'
        if !self.at(TokenKind::Semi) {
            return Err(self.err_at("expected ';' after break statement", loc));
        }
        self.bump();
        Ok(self.mk_stmt(loc, StmtKind::Break))
    }

    fn parse_continue(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'continue'
        if !self.at(TokenKind::Semi) {
            return Err(
                self.err_at("expected ';' after continue statement", loc)
            );
        }
        self.bump();
        Ok(self.mk_stmt(loc, StmtKind::Continue))
    }

    fn parse_compound(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        let scope = self.enter_scope();
        self.bump(); // '{'

        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.err("expected '}' to close block"));
            }
            let stmt = self.parse_stmt()?;
            while self.at(TokenKind::Semi) {
                self.bump();
            }
            stmts.push(stmt);
        }
        self.bump(); // '}'
        self.exit_scope();

        Ok(self.mk_stmt(loc, StmtKind::Compound { scope, stmts }))
    }

    fn parse_decl_stmt(&mut self, mutable: bool) -> Result<StmtId> {
        let loc = self.loc();
        let decl = self.parse_var(mutable)?;
        if self.at(TokenKind::Semi) {
            self.bump();
        }
        Ok(self.mk_stmt(loc, StmtKind::DeclStmt { decl }))
    }

    fn parse_expr_stmt(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        let expr = self.parse_expr()?;
        if self.at(TokenKind::Semi) {
            self.bump();
        }
        Ok(self.mk_stmt(loc, StmtKind::ExprStmt { expr }))
    }

    fn parse_if(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'if'

        let cond = self.parse_expr()?;
        let then_body = self.parse_stmt()?;

        let mut else_body = None;
        if self.at_kw(kw::ELSE) {
            self.bump();
            else_body = Some(self.parse_stmt()?);
        }

        Ok(self.mk_stmt(
            loc,
            StmtKind::If {
                cond,
                then_body,
                else_body,
            },
        ))
    }

    fn parse_match(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'match'

        let subject = self.parse_expr()?;

        if !self.at(TokenKind::LBrace) {
            return Err(
                self.err_at("expected '{' after match expression", loc)
            );
        }
        self.bump();

        let mut cases = Vec::new();
        let mut default = None;
        while !self.at(TokenKind::RBrace) {
            if self.at_kw(kw::UNDERSCORE) {
                if default.is_some() {
                    return Err(self.err("duplicate default case"));
                }
                self.bump(); // '_'
                self.expect(
                    TokenKind::Arrow,
                    "expected '->' after default case",
                )?;
                default = Some(self.parse_stmt()?);
            } else {
                let case_loc = self.loc();
                let pattern = self.parse_expr()?;
                self.expect(
                    TokenKind::Arrow,
                    "expected '->' after case expression",
                )?;
                let body = self.parse_stmt()?;
                cases.push(MatchCase {
                    pattern,
                    body,
                    loc: case_loc,
                });
            }

            if self.at(TokenKind::RBrace) {
                break;
            }
            if self.at(TokenKind::Comma) {
                self.bump();
            }
        }
        self.bump(); // '}'

        if cases.is_empty() {
            return Err(self.err_at(
                "match statement must have at least one case",
                loc,
            ));
        }

        Ok(self.mk_stmt(
            loc,
            StmtKind::Match {
                subject,
                cases,
                default,
            },
        ))
    }

    fn parse_ret(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'ret'

        let mut expr = None;
        if !self.at(TokenKind::Semi) {
            expr = Some(self.parse_expr()?);
        }

        if !self.at(TokenKind::Semi) {
            return Err(
                self.err_at("expected ';' after return statement", loc)
            );
        }
        self.bump();
        Ok(self.mk_stmt(loc, StmtKind::Ret { expr }))
    }

    fn parse_until(&mut self) -> Result<StmtId> {
        let loc = self.loc();
        self.bump(); // 'until'

        let cond = self.parse_expr()?;
        let body = self.parse_stmt()?;

        Ok(self.mk_stmt(loc, StmtKind::Until { cond, body }))
    }
}
