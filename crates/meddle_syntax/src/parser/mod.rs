//! Strictly top-down, predictive parser with Pratt-style operator
//! precedence for expressions.
//!
//! The parser binds references to declarations with a best-effort scope
//! lookup and defers type names it cannot resolve; cross-file binding is
//! name resolution's job. All parse errors are fatal at the current token's
//! location; there is no recovery.

mod decl;
mod expr;
mod stmt;
mod types;

use crate::ast::{BinOp, ExprData, ExprId, Runes, ScopeId, StmtData, StmtId, UnOp};
use crate::scope::ScopeData;
use crate::token::{LiteralKind, Token, TokenKind};
use crate::unit::TranslationUnit;
use meddle_base::{Diagnostic, Interner, Result, Session, SourceLoc, Symbol};

/// Parses a token stream into the given translation unit.
pub fn parse_unit(
    sess: &mut Session,
    unit: &mut TranslationUnit,
    toks: &[Token],
) -> Result<()> {
    let Session {
        ref mut interner,
        ref mut warnings,
        ..
    } = *sess;
    let mut parser = Parser {
        toks,
        pos: 0,
        scope: unit.root_scope,
        unit,
        interner,
        warnings,
        pending_gt: false,
    };
    parser.run()
}

pub(crate) struct Parser<'a> {
    toks: &'a [Token],
    pos: usize,
    pub(crate) unit: &'a mut TranslationUnit,
    pub(crate) interner: &'a mut Interner,
    warnings: &'a mut Vec<Diagnostic>,
    pub(crate) scope: ScopeId,
    /// Set when a `>>` token has been half-consumed as the closer of a
    /// nested template argument list.
    pending_gt: bool,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<()> {
        while !self.at(TokenKind::Eof) {
            self.parse_decl()?;
        }
        Ok(())
    }

    // ---- cursor ----------------------------------------------------------

    pub(crate) fn cur(&self) -> &Token {
        &self.toks[self.pos.min(self.toks.len() - 1)]
    }

    pub(crate) fn loc(&self) -> SourceLoc {
        self.cur().loc
    }

    pub(crate) fn bump(&mut self) {
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
    }

    pub(crate) fn save(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, pos: usize) {
        self.pos = pos;
        self.pending_gt = false;
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    pub(crate) fn at_lit(&self, literal: LiteralKind) -> bool {
        self.cur().kind == TokenKind::Literal && self.cur().literal == literal
    }

    pub(crate) fn at_kw(&self, sym: Symbol) -> bool {
        self.cur().kind == TokenKind::Ident && self.cur().text == sym
    }

    pub(crate) fn err(&self, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::error(msg, self.loc())
    }

    pub(crate) fn err_at(
        &self,
        msg: impl Into<String>,
        loc: SourceLoc,
    ) -> Diagnostic {
        Diagnostic::error(msg, loc)
    }

    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        msg: &str,
    ) -> Result<()> {
        if !self.at(kind) {
            return Err(self.err(msg));
        }
        self.bump();
        Ok(())
    }

    /// Consumes a `>`; splits a `>>` into two closers for nested template
    /// argument lists.
    pub(crate) fn eat_close_angle(&mut self, msg: &str) -> Result<()> {
        if self.pending_gt {
            self.pending_gt = false;
            self.bump();
            return Ok(());
        }
        match self.cur().kind {
            TokenKind::Gt => {
                self.bump();
                Ok(())
            }
            TokenKind::Shr => {
                self.pending_gt = true;
                Ok(())
            }
            _ => Err(self.err(msg)),
        }
    }

    pub(crate) fn at_close_angle(&self) -> bool {
        self.pending_gt
            || self.at(TokenKind::Gt)
            || self.at(TokenKind::Shr)
    }

    // ---- scopes ----------------------------------------------------------

    pub(crate) fn enter_scope(&mut self) -> ScopeId {
        let child = self.unit.alloc_scope(ScopeData::child_of(self.scope));
        self.scope = child;
        child
    }

    pub(crate) fn exit_scope(&mut self) {
        let parent = self
            .unit
            .scope(self.scope)
            .parent
            .expect("exited the root scope");
        self.scope = parent;
    }

    /// Inserts into the current scope; duplicate names are fatal.
    pub(crate) fn declare(
        &mut self,
        name: Symbol,
        decl: crate::ast::DeclId,
        loc: SourceLoc,
    ) -> Result<()> {
        let scope = self.scope;
        if self.unit.scope_mut(scope).insert(name, decl).is_err() {
            let spelled = self.interner.resolve(name);
            return Err(
                self.err_at(format!("redeclaration of '{spelled}'"), loc)
            );
        }
        Ok(())
    }

    // ---- node allocation -------------------------------------------------

    pub(crate) fn mk_expr(
        &mut self,
        loc: SourceLoc,
        kind: crate::ast::ExprKind,
    ) -> ExprId {
        self.unit.alloc_expr(ExprData::new(loc, kind))
    }

    pub(crate) fn mk_stmt(
        &mut self,
        loc: SourceLoc,
        kind: crate::ast::StmtKind,
    ) -> StmtId {
        self.unit.alloc_stmt(StmtData { loc, kind })
    }

    // ---- runes -----------------------------------------------------------

    /// Parses `$name` or `$[a, b]` before a declaration. Unknown runes warn
    /// and are ignored.
    pub(crate) fn parse_runes(&mut self) -> Result<Runes> {
        let mut runes = Runes::empty();
        if !self.at(TokenKind::Dollar) {
            return Ok(runes);
        }
        self.bump(); // '$'

        let listed = if self.at(TokenKind::LBrack) {
            self.bump();
            true
        } else {
            false
        };

        loop {
            if !self.at(TokenKind::Ident) {
                return Err(self.err("expected rune identifier"));
            }
            let name = self.cur().text;
            let loc = self.loc();
            match self.interner.resolve(name) {
                "associated" => runes |= Runes::ASSOCIATED,
                "no_mangle" => runes |= Runes::NO_MANGLE,
                "public" => runes |= Runes::PUBLIC,
                other => self.warnings.push(Diagnostic::new(
                    meddle_base::Severity::Warning,
                    format!("unknown rune: {other}"),
                    Some(loc),
                )),
            }
            self.bump();

            if listed {
                if self.at(TokenKind::RBrack) {
                    self.bump();
                    break;
                }
                self.expect(TokenKind::Comma, "expected ']' after rune list")?;
            } else {
                break;
            }
        }
        Ok(runes)
    }

    // ---- operator tables -------------------------------------------------

    /// Precedence for the current token when it is a binary operator.
    pub(crate) fn bin_precedence(&self) -> Option<i32> {
        // A half-consumed `>>` is not an operator.
        if self.pending_gt {
            return None;
        }
        let prec = match self.cur().kind {
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 11,
            TokenKind::Plus | TokenKind::Minus => 10,
            TokenKind::Shl | TokenKind::Shr => 9,
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => 8,
            TokenKind::EqEq | TokenKind::BangEq => 7,
            TokenKind::Amp => 6,
            TokenKind::Caret => 5,
            TokenKind::Pipe => 4,
            TokenKind::AmpAmp => 3,
            TokenKind::PipePipe => 2,
            TokenKind::Eq
            | TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq
            | TokenKind::AmpEq
            | TokenKind::PipeEq
            | TokenKind::CaretEq
            | TokenKind::ShlEq
            | TokenKind::ShrEq => 1,
            _ => return None,
        };
        Some(prec)
    }

    pub(crate) fn bin_operator(&self) -> Option<BinOp> {
        let op = match self.cur().kind {
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Shl => BinOp::Shl,
            TokenKind::Shr => BinOp::Shr,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::BangEq => BinOp::Ne,
            TokenKind::Amp => BinOp::BitAnd,
            TokenKind::Caret => BinOp::BitXor,
            TokenKind::Pipe => BinOp::BitOr,
            TokenKind::AmpAmp => BinOp::LogicAnd,
            TokenKind::PipePipe => BinOp::LogicOr,
            TokenKind::Eq => BinOp::Assign,
            TokenKind::PlusEq => BinOp::AddAssign,
            TokenKind::MinusEq => BinOp::SubAssign,
            TokenKind::StarEq => BinOp::MulAssign,
            TokenKind::SlashEq => BinOp::DivAssign,
            TokenKind::PercentEq => BinOp::ModAssign,
            TokenKind::AmpEq => BinOp::AndAssign,
            TokenKind::PipeEq => BinOp::OrAssign,
            TokenKind::CaretEq => BinOp::XorAssign,
            TokenKind::ShlEq => BinOp::ShlAssign,
            TokenKind::ShrEq => BinOp::ShrAssign,
            _ => return None,
        };
        Some(op)
    }

    pub(crate) fn un_operator(&self) -> Option<UnOp> {
        let op = match self.cur().kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Bang => UnOp::Not,
            TokenKind::PlusPlus => UnOp::Inc,
            TokenKind::MinusMinus => UnOp::Dec,
            TokenKind::Amp => UnOp::AddrOf,
            TokenKind::Star => UnOp::Deref,
            _ => return None,
        };
        Some(op)
    }

}
