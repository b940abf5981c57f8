//! Numeric coercion rules shared by lowering, effect analysis, and
//! codegen diagnostics.
//!
//! `cmf-core::lower` already inserts the conversions these helpers
//! describe; this module exists so analyses that run *after* lowering
//! (and any future tooling that wants to sanity-check emitted IR) can
//! classify a type or a coercion step without duplicating the table
//! from scratch.

use cmf_core::TypeId;

/// `true` for `Int32` or `Float`: the two types C-minus-f arithmetic
/// operates on.
pub fn is_numeric(ty: TypeId) -> bool {
    ty == TypeId::INT32 || ty == TypeId::FLOAT
}

/// `true` for `Int1` or `Int32`: the IR's two integer types.
pub fn is_integer(ty: TypeId) -> bool {
    ty == TypeId::INT1 || ty == TypeId::INT32
}

pub fn is_float(ty: TypeId) -> bool {
    ty == TypeId::FLOAT
}

/// The single implicit widening step the language defines between two
/// scalar types, or `None` if `from == to` already or no such step
/// exists. Mirrors the three coercion cases named throughout lowering
/// (assignment, return, call argument): `Int32 -> Float` via `SIToFP`,
/// `Float -> Int32` via `FPToSI`, `Int1 -> Int32` via `ZExt`.
pub fn widening_step(from: TypeId, to: TypeId) -> Option<Widen> {
    if from == to {
        return None;
    }
    match (from, to) {
        (TypeId::INT32, TypeId::FLOAT) => Some(Widen::SIToFP),
        (TypeId::FLOAT, TypeId::INT32) => Some(Widen::FPToSI),
        (TypeId::INT1, TypeId::INT32) => Some(Widen::ZExt),
        _ => None,
    }
}

/// Which conversion instruction a [`widening_step`] calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widen {
    SIToFP,
    FPToSI,
    ZExt,
}
