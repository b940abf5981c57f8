//! The instruction: a single IR operation and, unless its result type is
//! `Void`, the value it defines.

use serde::{Deserialize, Serialize};

use crate::id::{BlockId, InstId};
use crate::ops::InstKind;
use crate::type_id::TypeId;

/// One instruction in a basic block.
///
/// `uses` is this instruction's use-list: every `(user, operand_index)`
/// pair where `user` is another instruction in the same function that
/// references this instruction's result. It is maintained exclusively
/// by [`crate::builder::IrBuilder`] and [`crate::function::Function`]'s
/// removal path -- nothing else may push or remove an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstId,
    pub block: BlockId,
    pub kind: InstKind,
    pub result_type: TypeId,
    pub uses: Vec<(InstId, u32)>,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    /// `true` for instructions whose `result_type` is `Void`: they
    /// define no value and therefore can never appear as an operand.
    pub fn is_void(&self) -> bool {
        self.result_type == TypeId::VOID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{ConstValue, Operand};

    #[test]
    fn void_instruction_has_no_result() {
        let inst = Instruction {
            id: InstId(0),
            block: BlockId(0),
            kind: InstKind::Ret(None),
            result_type: TypeId::VOID,
            uses: Vec::new(),
        };
        assert!(inst.is_void());
        assert!(inst.is_terminator());
    }

    #[test]
    fn arithmetic_instruction_is_not_terminator() {
        let inst = Instruction {
            id: InstId(1),
            block: BlockId(0),
            kind: InstKind::IAdd(Operand::Arg(0), Operand::Const(ConstValue::Int(1))),
            result_type: TypeId::INT32,
            uses: Vec::new(),
        };
        assert!(!inst.is_terminator());
        assert!(!inst.is_void());
    }
}
