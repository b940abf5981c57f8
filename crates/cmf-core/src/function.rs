//! A function: its signature, its blocks, and the instruction arena they
//! share.
//!
//! Blocks and instructions are stored in parallel tombstoned arenas
//! (`Vec<Option<T>>`) indexed by their id's raw value, so removal never
//! renumbers a live handle. `block_order` is the ordered, tombstone-free
//! sequence the rest of the compiler iterates -- its first entry is the
//! entry block.

use serde::{Deserialize, Serialize};

use crate::block::BasicBlock;
use crate::error::CoreError;
use crate::id::{BlockId, FunctionId, InstId};
use crate::inst::Instruction;
use crate::ops::{InstKind, Operand};
use crate::type_id::TypeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    pub ty: TypeId,
    pub param_types: Vec<TypeId>,
    pub return_type: TypeId,
    /// Use-list per parameter: which (instruction, operand-index) pairs
    /// in this function reference argument `i`.
    pub arg_uses: Vec<Vec<(InstId, u32)>>,
    blocks: Vec<Option<BasicBlock>>,
    block_order: Vec<BlockId>,
    insts: Vec<Option<Instruction>>,
    next_block: u32,
    next_inst: u32,
}

impl Function {
    pub fn new(id: FunctionId, name: String, ty: TypeId, param_types: Vec<TypeId>, return_type: TypeId) -> Self {
        let arity = param_types.len();
        Function {
            id,
            name,
            ty,
            param_types,
            return_type,
            arg_uses: vec![Vec::new(); arity],
            blocks: Vec::new(),
            block_order: Vec::new(),
            insts: Vec::new(),
            next_block: 0,
            next_inst: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    /// `true` for a function with no blocks: an external declaration.
    pub fn is_declaration(&self) -> bool {
        self.block_order.is_empty()
    }

    pub fn entry_block(&self) -> Option<BlockId> {
        self.block_order.first().copied()
    }

    pub fn block_order(&self) -> &[BlockId] {
        &self.block_order
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0 as usize).and_then(|b| b.as_ref())
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(id.0 as usize).and_then(|b| b.as_mut())
    }

    pub fn inst(&self, id: InstId) -> Option<&Instruction> {
        self.insts.get(id.0 as usize).and_then(|i| i.as_ref())
    }

    fn inst_mut(&mut self, id: InstId) -> Option<&mut Instruction> {
        self.insts.get_mut(id.0 as usize).and_then(|i| i.as_mut())
    }

    /// Appends a new, unreachable block (the caller links it in by
    /// emitting a terminator elsewhere that branches to it). If this is
    /// the first block in the function, it becomes the entry block.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.push(Some(BasicBlock::new(id, self.id)));
        self.block_order.push(id);
        id
    }

    pub fn is_terminated(&self, block_id: BlockId) -> Result<bool, CoreError> {
        let block = self.block(block_id).ok_or(CoreError::BlockNotFound { id: block_id })?;
        Ok(match block.insts.last() {
            Some(last) => self.inst(*last).map(Instruction::is_terminator).unwrap_or(false),
            None => false,
        })
    }

    /// Appends an instruction to `block_id` and registers it in the
    /// use-lists of every local (instruction- or argument-) operand.
    /// `Global` operands are not tracked here -- the module-level
    /// builder owns that bookkeeping, since globals are shared across
    /// functions. Errors if the block is already terminated.
    pub fn append_inst(&mut self, block_id: BlockId, kind: InstKind, result_type: TypeId) -> Result<InstId, CoreError> {
        if self.is_terminated(block_id)? {
            return Err(CoreError::BlockAlreadyTerminated { id: block_id });
        }
        let id = InstId(self.next_inst);
        self.next_inst += 1;

        for (slot, operand) in kind.operands() {
            self.register_local_use(operand, id, slot);
        }

        let is_term = kind.is_terminator();
        let inst = Instruction { id, block: block_id, kind, result_type, uses: Vec::new() };
        if id.0 as usize == self.insts.len() {
            self.insts.push(Some(inst));
        } else {
            self.insts[id.0 as usize] = Some(inst);
        }
        self.block_mut(block_id).ok_or(CoreError::BlockNotFound { id: block_id })?.insts.push(id);

        if is_term {
            self.recompute_cfg();
        }
        Ok(id)
    }

    fn register_local_use(&mut self, operand: Operand, user: InstId, slot: u32) {
        match operand {
            Operand::Inst(def) => {
                if let Some(def_inst) = self.inst_mut(def) {
                    def_inst.uses.push((user, slot));
                }
            }
            Operand::Arg(i) => {
                if let Some(list) = self.arg_uses.get_mut(i as usize) {
                    list.push((user, slot));
                }
            }
            Operand::Global(_) | Operand::Const(_) => {}
        }
    }

    fn withdraw_local_use(&mut self, operand: Operand, user: InstId, slot: u32) {
        match operand {
            Operand::Inst(def) => {
                if let Some(def_inst) = self.inst_mut(def) {
                    def_inst.uses.retain(|&(u, s)| !(u == user && s == slot));
                }
            }
            Operand::Arg(i) => {
                if let Some(list) = self.arg_uses.get_mut(i as usize) {
                    list.retain(|&(u, s)| !(u == user && s == slot));
                }
            }
            Operand::Global(_) | Operand::Const(_) => {}
        }
    }

    /// Removes a single instruction, withdrawing its uses from every
    /// operand's use-list. Returns the instruction's own operand list so
    /// the caller can withdraw any `Global` uses from the module's
    /// global table, which this function has no access to.
    pub fn remove_inst(&mut self, id: InstId) -> Result<Vec<(u32, Operand)>, CoreError> {
        let inst = self.inst(id).cloned().ok_or(CoreError::InstNotFound { id })?;
        let operands = inst.kind.operands();
        for &(slot, operand) in &operands {
            self.withdraw_local_use(operand, id, slot);
        }
        if let Some(block) = self.block_mut(inst.block) {
            block.insts.retain(|&i| i != id);
        }
        self.insts[id.0 as usize] = None;
        if inst.kind.is_terminator() {
            self.recompute_cfg();
        }
        Ok(operands)
    }

    /// Removes a block and every instruction it still contains. Returns
    /// the aggregated operand list of every removed instruction, for
    /// the caller to withdraw `Global` uses.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Vec<(u32, Operand)>, CoreError> {
        let inst_ids = self.block(id).ok_or(CoreError::BlockNotFound { id })?.insts.clone();
        let mut withdrawn = Vec::new();
        for inst_id in inst_ids {
            withdrawn.extend(self.remove_inst(inst_id)?);
        }
        self.block_order.retain(|&b| b != id);
        self.blocks[id.0 as usize] = None;
        self.recompute_cfg();
        Ok(withdrawn)
    }

    /// Rebuilds every block's derived `preds`/`succs` from its
    /// terminator. O(blocks); this is a teaching compiler, not a
    /// production one, and correctness under frequent mutation matters
    /// more than incremental edge bookkeeping here.
    fn recompute_cfg(&mut self) {
        let ids = self.block_order.clone();
        for &id in &ids {
            if let Some(b) = self.block_mut(id) {
                b.succs.clear();
            }
        }
        for &id in &ids {
            let last = self.block(id).and_then(|b| b.insts.last().copied());
            let succs = match last.and_then(|i| self.inst(i)) {
                Some(inst) => match &inst.kind {
                    InstKind::Br(target) => vec![*target],
                    InstKind::CondBr { true_target, false_target, .. } => vec![*true_target, *false_target],
                    _ => Vec::new(),
                },
                None => Vec::new(),
            };
            // A target may have been removed already (e.g. mid-removal of
            // a block some other block still branches to); a dangling
            // target is not a real successor.
            let succs: Vec<BlockId> = succs.into_iter().filter(|t| self.block(*t).is_some()).collect();
            if let Some(b) = self.block_mut(id) {
                b.succs = succs;
            }
        }
        for &id in &ids {
            if let Some(b) = self.block_mut(id) {
                b.preds.clear();
            }
        }
        for &id in &ids {
            let succs = self.block(id).map(|b| b.succs.clone()).unwrap_or_default();
            for s in succs {
                if let Some(b) = self.block_mut(s) {
                    b.preds.push(id);
                }
            }
        }
    }

    /// Every instruction in the function, defining-order irrelevant,
    /// skipping tombstoned slots. Used by effect analysis and DCE.
    pub fn all_insts(&self) -> impl Iterator<Item = &Instruction> {
        self.insts.iter().filter_map(|i| i.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ConstValue;

    fn new_fn() -> Function {
        Function::new(FunctionId(0), "f".to_string(), TypeId(99), vec![TypeId::INT32], TypeId::INT32)
    }

    #[test]
    fn first_block_is_entry() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let b1 = f.add_block();
        assert_eq!(f.entry_block(), Some(b0));
        assert_ne!(b0, b1);
    }

    #[test]
    fn empty_function_is_declaration() {
        let f = new_fn();
        assert!(f.is_declaration());
    }

    #[test]
    fn append_inst_tracks_argument_use() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let add = f
            .append_inst(b0, InstKind::IAdd(Operand::Arg(0), Operand::Const(ConstValue::Int(1))), TypeId::INT32)
            .unwrap();
        assert_eq!(f.arg_uses[0], vec![(add, 0)]);
    }

    #[test]
    fn append_inst_tracks_instruction_use() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let a = f.append_inst(b0, InstKind::Alloca { element_type: TypeId::INT32 }, TypeId(100)).unwrap();
        let load = f.append_inst(b0, InstKind::Load(Operand::Inst(a)), TypeId::INT32).unwrap();
        assert_eq!(f.inst(a).unwrap().uses, vec![(load, 0)]);
    }

    #[test]
    fn appending_after_terminator_errors() {
        let mut f = new_fn();
        let b0 = f.add_block();
        f.append_inst(b0, InstKind::Ret(None), TypeId::VOID).unwrap();
        let result = f.append_inst(b0, InstKind::Ret(None), TypeId::VOID);
        assert!(matches!(result, Err(CoreError::BlockAlreadyTerminated { .. })));
    }

    #[test]
    fn br_updates_successor_and_predecessor() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let b1 = f.add_block();
        f.append_inst(b0, InstKind::Br(b1), TypeId::VOID).unwrap();
        assert_eq!(f.block(b0).unwrap().succs, vec![b1]);
        assert_eq!(f.block(b1).unwrap().preds, vec![b0]);
    }

    #[test]
    fn cond_br_produces_two_successors() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let b1 = f.add_block();
        let b2 = f.add_block();
        f.append_inst(
            b0,
            InstKind::CondBr { cond: Operand::Arg(0), true_target: b1, false_target: b2 },
            TypeId::VOID,
        )
        .unwrap();
        assert_eq!(f.block(b0).unwrap().succs, vec![b1, b2]);
        assert_eq!(f.block(b1).unwrap().preds, vec![b0]);
        assert_eq!(f.block(b2).unwrap().preds, vec![b0]);
    }

    #[test]
    fn remove_inst_withdraws_use() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let a = f.append_inst(b0, InstKind::Alloca { element_type: TypeId::INT32 }, TypeId(100)).unwrap();
        let load = f.append_inst(b0, InstKind::Load(Operand::Inst(a)), TypeId::INT32).unwrap();
        f.remove_inst(load).unwrap();
        assert!(f.inst(a).unwrap().uses.is_empty());
        assert!(f.inst(load).is_none());
    }

    #[test]
    fn remove_block_removes_all_its_instructions_and_edges() {
        let mut f = new_fn();
        let b0 = f.add_block();
        let b1 = f.add_block();
        f.append_inst(b0, InstKind::Br(b1), TypeId::VOID).unwrap();
        f.append_inst(b1, InstKind::Ret(None), TypeId::VOID).unwrap();
        f.remove_block(b1).unwrap();
        assert!(f.block(b1).is_none());
        assert_eq!(f.block(b0).unwrap().succs, Vec::<BlockId>::new());
        assert!(!f.block_order().contains(&b1));
    }
}
