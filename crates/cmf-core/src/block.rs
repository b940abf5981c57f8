//! Basic blocks: an owning function's straight-line instruction runs.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, FunctionId, InstId};

/// A maximal straight-line run of instructions ending in at most one
/// terminator. `preds`/`succs` are derived from terminators across the
/// function and recomputed by [`crate::function::Function`] after every
/// structural edit -- callers never set them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub function: FunctionId,
    pub insts: Vec<InstId>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId, function: FunctionId) -> Self {
        BasicBlock {
            id,
            function,
            insts: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// A block with no predecessors is unreachable unless it is the
    /// function's entry block (checked by the caller).
    pub fn is_unreachable(&self) -> bool {
        self.preds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_has_no_edges() {
        let b = BasicBlock::new(BlockId(0), FunctionId(0));
        assert!(b.preds.is_empty());
        assert!(b.succs.is_empty());
        assert!(b.insts.is_empty());
        assert!(b.is_unreachable());
    }

    #[test]
    fn block_with_predecessor_is_reachable() {
        let mut b = BasicBlock::new(BlockId(1), FunctionId(0));
        b.preds.push(BlockId(0));
        assert!(!b.is_unreachable());
    }
}
