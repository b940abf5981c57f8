//! Instruction operand and operator vocabulary.
//!
//! Each [`InstKind`] variant documents the LLVM instruction it lowers to
//! and the typing rule the builder enforces when constructing it.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, FunctionId, InstId};
use crate::type_id::TypeId;

/// A compile-time constant. Constants are values, not instructions --
/// they carry no identity and need no use-list entry of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i32),
    Float(f32),
    /// The zero value of `type_id` (used to initialize aggregates).
    Zero(TypeId),
}

/// A reference to a value usable as an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Const(ConstValue),
    /// The `index`-th argument of the enclosing function.
    Arg(u32),
    Global(crate::id::GlobalId),
    /// The result of another instruction in the same function.
    Inst(InstId),
}

/// Comparison predicate shared by `ICmp` and `FCmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpPred {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

impl std::fmt::Display for CmpPred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Ge => "ge",
            CmpPred::Gt => "gt",
            CmpPred::Le => "le",
            CmpPred::Lt => "lt",
        };
        write!(f, "{s}")
    }
}

/// The operation an instruction performs.
///
/// Operand and result types are not stored redundantly here; they are
/// derived by the builder from the operands at construction time and
/// cached on [`crate::inst::Instruction::result_type`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstKind {
    // -- Integer arithmetic: Int32 x Int32 -> Int32 --
    // LLVM lowering: `add`/`sub`/`mul`/`sdiv` nsw i32.
    IAdd(Operand, Operand),
    ISub(Operand, Operand),
    IMul(Operand, Operand),
    ISDiv(Operand, Operand),

    // -- Float arithmetic: Float x Float -> Float --
    // LLVM lowering: `fadd`/`fsub`/`fmul`/`fdiv` float.
    FAdd(Operand, Operand),
    FSub(Operand, Operand),
    FMul(Operand, Operand),
    FDiv(Operand, Operand),

    // -- Comparisons: T x T -> Int1 --
    // LLVM lowering: `icmp <pred> i32` / `fcmp <pred> float`.
    ICmp(CmpPred, Operand, Operand),
    FCmp(CmpPred, Operand, Operand),

    // -- Conversions --
    /// Int1 -> Int32. LLVM lowering: `zext i1 %v to i32`.
    ZExt(Operand),
    /// Int32 -> Float. LLVM lowering: `sitofp i32 %v to float`.
    SIToFP(Operand),
    /// Float -> Int32. LLVM lowering: `fptosi float %v to i32`.
    FPToSI(Operand),

    // -- Memory --
    /// Allocates one stack slot of `element_type`. Result: `Pointer(element_type)`.
    /// LLVM lowering: `alloca <ty>`.
    Alloca { element_type: TypeId },
    /// Reads through a `Pointer(T)` operand. Result: `T`.
    /// LLVM lowering: `load <ty>, ptr %p`.
    Load(Operand),
    /// Writes `value` through `ptr: Pointer(T)`. Result: `Void`.
    /// LLVM lowering: `store <ty> %value, ptr %p`.
    Store { value: Operand, ptr: Operand },

    // -- Addressing --
    /// Computes an element pointer from `base` walking `indices`.
    /// Result type is derived by the builder from `base`'s pointee and
    /// the index path (see `crate::builder`).
    /// LLVM lowering: `getelementptr <ty>, ptr %base, i32 idx0, ...`.
    GetElementPtr { base: Operand, indices: Vec<Operand> },

    // -- Call --
    /// Calls `callee` with `args`. Result: callee's declared return type.
    /// LLVM lowering: `call <ty> @callee(args...)`.
    Call { callee: FunctionId, args: Vec<Operand> },

    // -- Terminators --
    /// LLVM lowering: `br label %target`.
    Br(BlockId),
    /// LLVM lowering: `br i1 %cond, label %true_target, label %false_target`.
    CondBr { cond: Operand, true_target: BlockId, false_target: BlockId },
    /// LLVM lowering: `ret <ty> %value` or `ret void`.
    Ret(Option<Operand>),
}

impl InstKind {
    /// Terminators end a basic block; every other kind does not.
    pub fn is_terminator(&self) -> bool {
        matches!(self, InstKind::Br(_) | InstKind::CondBr { .. } | InstKind::Ret(_))
    }

    /// Visits every operand slot, in argument order, alongside its
    /// zero-based operand index. Used by the builder to populate
    /// use-lists and by dead-code elimination to walk live operands.
    pub fn operands(&self) -> Vec<(u32, Operand)> {
        let mut out = Vec::new();
        let mut push = |op: Operand| {
            let idx = out.len() as u32;
            out.push((idx, op));
        };
        match self {
            InstKind::IAdd(a, b)
            | InstKind::ISub(a, b)
            | InstKind::IMul(a, b)
            | InstKind::ISDiv(a, b)
            | InstKind::FAdd(a, b)
            | InstKind::FSub(a, b)
            | InstKind::FMul(a, b)
            | InstKind::FDiv(a, b) => {
                push(*a);
                push(*b);
            }
            InstKind::ICmp(_, a, b) | InstKind::FCmp(_, a, b) => {
                push(*a);
                push(*b);
            }
            InstKind::ZExt(a) | InstKind::SIToFP(a) | InstKind::FPToSI(a) => push(*a),
            InstKind::Alloca { .. } => {}
            InstKind::Load(ptr) => push(*ptr),
            InstKind::Store { value, ptr } => {
                push(*value);
                push(*ptr);
            }
            InstKind::GetElementPtr { base, indices } => {
                push(*base);
                for idx in indices {
                    push(*idx);
                }
            }
            InstKind::Call { args, .. } => {
                for a in args {
                    push(*a);
                }
            }
            InstKind::Br(_) => {}
            InstKind::CondBr { cond, .. } => push(*cond),
            InstKind::Ret(value) => {
                if let Some(v) = value {
                    push(*v);
                }
            }
        }
        out
    }
}
