//! # meddle-syntax
//!
//! Lexical and syntactic analysis for meddle.
//!
//! [`lexer::lex`] turns a registered source file into a token stream;
//! [`parser::parse_unit`] turns a token stream into a [`TranslationUnit`]:
//! the per-file AST, its scope tree and its interning [`TypeContext`].
//!
//! The parser performs no name resolution. References are pinned to a
//! best-effort scope lookup and type names that cannot be resolved yet
//! become deferred types, bound later once every file has been parsed.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod token;
pub mod types;
pub mod unit;

pub use ast::{
    BinOp, DeclData, DeclId, DeclKind, ExprData, ExprId, ExprKind, MatchCase,
    Runes, ScopeId, SpecInfo, StmtData, StmtId, StmtKind, TypeId, UnOp,
    UnitId,
};
pub use token::{LiteralKind, Token, TokenKind};
pub use types::{PrimKind, TypeContext, TypeData, TypeKind};
pub use unit::TranslationUnit;
