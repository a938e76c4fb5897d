//! The abstract syntax tree.
//!
//! Nodes live in per-unit arenas (`Vec`s inside [`crate::TranslationUnit`])
//! and reference each other through copyable ids. Every id carries the
//! [`UnitId`] that owns it, so declarations and types imported from other
//! units are referenced by the same handles as local ones. Back-edges
//! (decl → scope, ref → decl) are ids, never ownership.

use bitflags::bitflags;
use meddle_base::{SourceLoc, Symbol};

/// Index of a translation unit inside the unit manager.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct UnitId(pub u32);

macro_rules! unit_tagged_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub struct $name {
            pub unit: UnitId,
            pub index: u32,
        }

        impl $name {
            pub fn new(unit: UnitId, index: usize) -> Self {
                Self {
                    unit,
                    index: index as u32,
                }
            }

            pub fn index(self) -> usize {
                self.index as usize
            }
        }
    };
}

unit_tagged_id!(
    /// Handle to a declaration.
    DeclId
);
unit_tagged_id!(
    /// Handle to an interned type.
    TypeId
);
unit_tagged_id!(
    /// Handle to an expression node.
    ExprId
);
unit_tagged_id!(
    /// Handle to a statement node.
    StmtId
);
unit_tagged_id!(
    /// Handle to a scope.
    ScopeId
);

bitflags! {
    /// Declaration attributes (`$name` / `$[a, b]` before a declaration).
    #[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
    pub struct Runes: u32 {
        /// `$associated`: struct-scoped function with no implicit receiver.
        const ASSOCIATED = 1 << 0;
        /// `$no_mangle`: emit the name as written.
        const NO_MANGLE = 1 << 1;
        /// `$public`: exported from the unit.
        const PUBLIC = 1 << 2;
    }
}

/// Binary operator kinds, tagged at parse time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    LogicAnd,
    LogicOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    /// `true` for `=` and the compound assignment family.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinOp::Assign
                | BinOp::AddAssign
                | BinOp::SubAssign
                | BinOp::MulAssign
                | BinOp::DivAssign
                | BinOp::ModAssign
                | BinOp::AndAssign
                | BinOp::OrAssign
                | BinOp::XorAssign
                | BinOp::ShlAssign
                | BinOp::ShrAssign
        )
    }

    /// `true` for `==`, `!=` and the orderings.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LogicAnd | BinOp::LogicOr)
    }

    /// The spelling used in diagnostics.
    pub fn spelling(self) -> &'static str {
        match self {
            BinOp::Assign => "=",
            BinOp::AddAssign => "+=",
            BinOp::SubAssign => "-=",
            BinOp::MulAssign => "*=",
            BinOp::DivAssign => "/=",
            BinOp::ModAssign => "%=",
            BinOp::AndAssign => "&=",
            BinOp::OrAssign => "|=",
            BinOp::XorAssign => "^=",
            BinOp::ShlAssign => "<<=",
            BinOp::ShrAssign => ">>=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::LogicAnd => "&&",
            BinOp::LogicOr => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// Unary operator kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnOp {
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `-`
    Neg,
    /// `&`
    AddrOf,
    /// `*`
    Deref,
    /// `++`
    Inc,
    /// `--`
    Dec,
}

impl UnOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::Neg => "-",
            UnOp::AddrOf => "&",
            UnOp::Deref => "*",
            UnOp::Inc => "++",
            UnOp::Dec => "--",
        }
    }
}

/// Marks a declaration as a monomorphised copy of a template.
#[derive(Clone, Debug)]
pub struct SpecInfo {
    pub template: DeclId,
    pub args: Vec<TypeId>,
}

/// A named entity bound in a scope.
#[derive(Clone, Debug)]
pub struct DeclData {
    pub name: Symbol,
    pub runes: Runes,
    pub loc: SourceLoc,
    /// The scope this declaration was declared into.
    pub scope: ScopeId,
    pub kind: DeclKind,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Function {
        /// The function type (parameter types mirror `params`).
        ty: TypeId,
        /// Scope holding parameters (and template parameters).
        scope: ScopeId,
        params: Vec<DeclId>,
        body: Option<StmtId>,
        /// Owning struct, for methods and associated functions.
        parent: Option<DeclId>,
        /// Present when this function is a template specialisation.
        special: Option<SpecInfo>,
    },
    Var {
        /// `None` until sema infers the type from the initialiser.
        ty: Option<TypeId>,
        init: Option<ExprId>,
        mutable: bool,
        global: bool,
    },
    Param {
        ty: TypeId,
        index: u32,
        parent: Option<DeclId>,
    },
    Field {
        ty: TypeId,
        init: Option<ExprId>,
        index: u32,
        parent: Option<DeclId>,
    },
    EnumVariant {
        /// The enum type.
        ty: TypeId,
        value: i64,
    },
    Enum {
        ty: TypeId,
        underlying: TypeId,
        variants: Vec<DeclId>,
    },
    Struct {
        ty: TypeId,
        scope: ScopeId,
        fields: Vec<DeclId>,
        methods: Vec<DeclId>,
        /// Present when this struct is a template specialisation.
        special: Option<SpecInfo>,
    },
    TemplateParam {
        /// The `TemplateParam` type this declaration defines.
        ty: TypeId,
        index: u32,
        owner: Option<DeclId>,
    },
    TemplateFunction {
        inner: DeclId,
        params: Vec<DeclId>,
        /// Specialisations in instantiation order.
        specs: Vec<DeclId>,
    },
    TemplateStruct {
        inner: DeclId,
        params: Vec<DeclId>,
        specs: Vec<DeclId>,
    },
    Use {
        path: Symbol,
        alias: Option<Symbol>,
        /// Non-empty for `use { A, B } = "path";`.
        symbols: Vec<Symbol>,
        /// The resolved target unit, filled in by use resolution.
        target: Option<UnitId>,
    },
}

impl DeclData {
    pub fn is_public(&self) -> bool {
        self.runes.contains(Runes::PUBLIC)
    }

    /// A method is a struct-scoped function without the `$associated` rune.
    pub fn is_method(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Function {
                parent: Some(_),
                ..
            }
        ) && !self.runes.contains(Runes::ASSOCIATED)
    }
}

/// A statement.
#[derive(Clone, Debug)]
pub struct StmtData {
    pub loc: SourceLoc,
    pub kind: StmtKind,
}

#[derive(Clone, Debug)]
pub struct MatchCase {
    pub pattern: ExprId,
    pub body: StmtId,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Compound {
        scope: ScopeId,
        stmts: Vec<StmtId>,
    },
    If {
        cond: ExprId,
        then_body: StmtId,
        else_body: Option<StmtId>,
    },
    /// Post-test loop: runs the body until the condition becomes true.
    Until {
        cond: ExprId,
        body: StmtId,
    },
    Match {
        subject: ExprId,
        cases: Vec<MatchCase>,
        default: Option<StmtId>,
    },
    Ret {
        expr: Option<ExprId>,
    },
    Break,
    Continue,
    DeclStmt {
        decl: DeclId,
    },
    ExprStmt {
        expr: ExprId,
    },
}

/// An expression. `ty` is `None` until sema resolves it.
#[derive(Clone, Debug)]
pub struct ExprData {
    pub loc: SourceLoc,
    pub ty: Option<TypeId>,
    pub lvalue: bool,
    pub kind: ExprKind,
}

impl ExprData {
    pub fn new(loc: SourceLoc, kind: ExprKind) -> Self {
        Self {
            loc,
            ty: None,
            lvalue: false,
            kind,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(u8),
    Str(String),
    Nil,
    /// A name, pinned to a declaration by the parser's best-effort lookup
    /// or by name resolution.
    Ref {
        name: Symbol,
        decl: Option<DeclId>,
    },
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnOp,
        expr: ExprId,
        postfix: bool,
    },
    /// `cast<T> expr`; the target type lives in `ExprData::ty`.
    Cast {
        expr: ExprId,
    },
    Paren {
        expr: ExprId,
    },
    /// `base.name` field access.
    Access {
        base: ExprId,
        name: Symbol,
        field: Option<DeclId>,
    },
    Subscript {
        base: ExprId,
        index: ExprId,
    },
    /// `callee(args)`; the callee is a `Ref` or `Spec` expression.
    Call {
        callee: ExprId,
        targs: Vec<TypeId>,
        args: Vec<ExprId>,
    },
    /// `base.name(args)` method call.
    MethodCall {
        base: ExprId,
        name: Symbol,
        decl: Option<DeclId>,
        args: Vec<ExprId>,
    },
    /// `Qualifier::member`: an enum variant, a struct-associated function,
    /// or a symbol reached through a named import. Name resolution decides
    /// which by the kind of `qual_decl`.
    Spec {
        qualifier: Symbol,
        qual_decl: Option<DeclId>,
        member: Symbol,
        decl: Option<DeclId>,
    },
    /// `Name { field: expr, … }` struct initialiser.
    StructInit {
        name: Symbol,
        decl: Option<DeclId>,
        targs: Vec<TypeId>,
        fields: Vec<(Symbol, ExprId)>,
    },
    /// `[ e0, e1, … ]` array initialiser.
    ArrayInit {
        elems: Vec<ExprId>,
    },
    Sizeof {
        target: TypeId,
    },
    /// `$syscall(num, args…)`.
    Syscall {
        num: i64,
        args: Vec<ExprId>,
    },
}

impl ExprKind {
    /// Aggregate initialisers write themselves into a destination place.
    pub fn is_aggregate_init(&self) -> bool {
        matches!(self, ExprKind::ArrayInit { .. } | ExprKind::StructInit { .. })
    }
}
