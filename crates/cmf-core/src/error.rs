//! Structural errors raised by the IR's own builder methods.
//!
//! These are distinct from [`crate::lower::LowerError`]: they signal
//! misuse of the IR API itself (an unknown handle, a duplicate name) and
//! are the kind of thing a correctly-written lowering pass never
//! triggers. They exist so IR-construction code can propagate failures
//! with `?` instead of panicking on every lookup.

use thiserror::Error;

use crate::id::{BlockId, FunctionId, GlobalId, InstId};

/// Errors raised while constructing or mutating a [`crate::module::Module`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A global with this name already exists in the module.
    #[error("duplicate global name: {name}")]
    DuplicateGlobalName { name: String },

    /// A function with this name already exists in the module.
    #[error("duplicate function name: {name}")]
    DuplicateFunctionName { name: String },

    /// No global with this id is registered.
    #[error("global not found: {id}")]
    GlobalNotFound { id: GlobalId },

    /// No function with this id is registered.
    #[error("function not found: {id}")]
    FunctionNotFound { id: FunctionId },

    /// No block with this id exists in the function.
    #[error("block not found: {id}")]
    BlockNotFound { id: BlockId },

    /// No instruction with this id exists in the function.
    #[error("instruction not found: {id}")]
    InstNotFound { id: InstId },

    /// The builder tried to append an instruction after the current
    /// block was already terminated.
    #[error("cannot append to block {id}: already terminated")]
    BlockAlreadyTerminated { id: BlockId },
}
