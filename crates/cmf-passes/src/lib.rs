//! Optimization passes over `cmf-core` IR.
//!
//! The only pass today is dead-code elimination; this crate exists
//! separately from `cmf-check` so that a pass which *mutates* the
//! module (unlike `cmf-check`'s read-only analyses) has its own home,
//! matching the Core Specification's separation between analysis and
//! transformation.

pub mod dce;

pub use dce::{run as run_dce, DceReport};
