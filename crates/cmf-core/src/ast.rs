//! The syntax tree lowering consumes.
//!
//! The language this front end lowers has no schema of its own in the
//! distilled requirements beyond the node kinds referenced by the
//! lowering rules; this module is that schema, made concrete so a
//! parser (external to this crate) and the CLI driver have a wire
//! format to agree on. It round-trips through `serde_json`.

use serde::{Deserialize, Serialize};

/// A C-minus-f scalar type as written in source: `int` or `float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    Int,
    Float,
}

/// A function's declared return type, which additionally allows `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    Void,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Declaration {
    Var(VarDecl),
    Function(FunctionDecl),
}

/// `type name;` or `type name[length];`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: ScalarType,
    pub name: String,
    pub array_len: Option<u32>,
}

/// A function parameter. `is_array` marks `type name[]` (an array
/// parameter, which lowers to a pointer rather than a scalar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub ty: ScalarType,
    pub name: String,
    pub is_array: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub return_type: ReturnType,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for a declaration with no body (an external function).
    pub body: Option<CompoundStmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundStmt {
    pub locals: Vec<VarDecl>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Compound(CompoundStmt),
    Selection {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Iteration {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    /// An expression evaluated for its side effect and discarded
    /// (an assignment or a call used as a statement).
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn is_relational(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLit(i32),
    FloatLit(f32),
    /// A bare identifier, or an indexed reference `name[index]`.
    Var { name: String, index: Option<Box<Expr>> },
    Assign { target: Box<Expr>, value: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Call { callee: String, args: Vec<Expr> },
}
