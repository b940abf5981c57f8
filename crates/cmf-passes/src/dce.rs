//! Dead-code elimination: mark-and-sweep over the IR, driven to a
//! fixed point per function, followed by a module-wide sweep of
//! functions and globals nothing calls or references any more.
//!
//! Four steps, run per function until none of them change anything:
//!
//! 1. **Unreachable-block cleanup** -- a non-entry block with no
//!    predecessors is dead weight; remove it and its instructions.
//! 2. **Mark** -- seed the live set with every critical instruction,
//!    then propagate liveness backward through operand references.
//! 3. **Sweep** -- delete every instruction that never got marked.
//! 4. **Global sweep** -- once every function has reached its own
//!    fixed point, drop functions (other than `main`) nothing calls
//!    and globals nothing references.

use std::collections::{HashMap, HashSet};

use cmf_check::{analyze_purity, pointer_param_allocas, traces_to_pointer_param};
use cmf_core::{FunctionId, GlobalId, InstId, InstKind, Module, Operand};

/// Counts of what a [`run`] call actually removed, for callers (the CLI)
/// that want to report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DceReport {
    pub blocks_removed: usize,
    pub instructions_removed: usize,
    pub functions_removed: usize,
    pub globals_removed: usize,
}

/// Runs dead-code elimination over every function in `module`, then
/// sweeps the module's function and global tables. Purity is computed
/// once up front: it depends only on call structure and direct effects,
/// neither of which DCE changes as it removes dead instructions.
pub fn run(module: &mut Module) -> DceReport {
    let purity = analyze_purity(module);
    let mut report = DceReport::default();

    let fids: Vec<FunctionId> = module.function_order().to_vec();
    for fid in fids {
        if module.function(fid).expect("function_order entry exists").is_declaration() {
            continue;
        }
        loop {
            let blocks = clear_unreachable_blocks(module, fid);
            let live = mark(module, fid, &purity);
            let insts = sweep(module, fid, &live);
            report.blocks_removed += blocks;
            report.instructions_removed += insts;
            if blocks == 0 && insts == 0 {
                break;
            }
        }
    }

    let (dead_fns, dead_globals) = sweep_globally(module);
    report.functions_removed = dead_fns.len();
    report.globals_removed = dead_globals.len();
    report
}

/// Removes every non-entry block of `fid` whose predecessor set is
/// empty. Returns how many were removed.
///
/// Instructions are withdrawn one at a time (rather than delegating the
/// whole block to `Function::remove_block` in one call) so each
/// `Global` operand can be withdrawn from the module's global use-list
/// against the instruction id that actually held it -- `remove_block`
/// only returns the aggregated operand list, without per-instruction
/// ids, which isn't enough to identify a `(function, inst, slot)` entry
/// precisely.
fn clear_unreachable_blocks(module: &mut Module, fid: FunctionId) -> usize {
    let f = module.function(fid).expect("function_order entry exists");
    let entry = f.entry_block();
    let dead: Vec<_> = f
        .block_order()
        .iter()
        .copied()
        .filter(|&b| Some(b) != entry && f.block(b).expect("block_order entry exists").is_unreachable())
        .collect();

    let removed = dead.len();
    for block in dead {
        let inst_ids = module.function(fid).expect("function_order entry exists").block(block).expect("block is in block_order").insts.clone();
        for inst_id in inst_ids {
            let operands = module.function_mut(fid).expect("function_order entry exists").remove_inst(inst_id).expect("id came from the block's own instruction list");
            for (slot, operand) in operands {
                if let Operand::Global(g) = operand {
                    module.remove_global_use(g, fid, inst_id, slot);
                }
            }
        }
        module.function_mut(fid).expect("function_order entry exists").remove_block(block).expect("block is in block_order");
    }
    removed
}

/// `true` iff `inst` must survive DCE regardless of whether anything
/// uses its result.
fn is_critical(f: &cmf_core::Function, purity: &HashMap<FunctionId, bool>, param_allocas: &HashSet<InstId>, inst: &cmf_core::Instruction) -> bool {
    match &inst.kind {
        InstKind::Br(_) | InstKind::CondBr { .. } | InstKind::Ret(_) => true,
        InstKind::Store { ptr, .. } => traces_to_pointer_param(f, *ptr, param_allocas),
        InstKind::Call { callee, .. } => !*purity.get(callee).unwrap_or(&false),
        _ => false,
    }
}

/// Computes the live instruction set for `fid`: every critical
/// instruction, plus everything reachable from one by following
/// operand references within the same function.
fn mark(module: &Module, fid: FunctionId, purity: &HashMap<FunctionId, bool>) -> HashSet<InstId> {
    let f = module.function(fid).expect("function_order entry exists");
    let param_allocas = pointer_param_allocas(module, f);

    let mut live: HashSet<InstId> = HashSet::new();
    let mut worklist: Vec<InstId> = Vec::new();
    for inst in f.all_insts() {
        if is_critical(f, purity, &param_allocas, inst) {
            live.insert(inst.id);
            worklist.push(inst.id);
        }
    }

    while let Some(id) = worklist.pop() {
        let inst = f.inst(id).expect("worklist id is always a live instruction");
        for (_, operand) in inst.kind.operands() {
            if let Operand::Inst(def) = operand {
                if live.insert(def) {
                    worklist.push(def);
                }
            }
        }
    }
    live
}

/// Removes every instruction in `fid` not present in `live`. Returns
/// how many were removed.
fn sweep(module: &mut Module, fid: FunctionId, live: &HashSet<InstId>) -> usize {
    let dead: Vec<InstId> = module
        .function(fid)
        .expect("function_order entry exists")
        .all_insts()
        .map(|i| i.id)
        .filter(|id| !live.contains(id))
        .collect();

    let removed = dead.len();
    for id in dead {
        let operands = module.function_mut(fid).expect("function_order entry exists").remove_inst(id).expect("id came from all_insts");
        for (slot, operand) in operands {
            if let Operand::Global(g) = operand {
                module.remove_global_use(g, fid, id, slot);
            }
        }
    }
    removed
}

/// Every function referenced as a `Call` target anywhere in the
/// module. Unlike globals, functions keep no use-list of their own --
/// this set is recomputed by scanning every function's instructions.
fn called_functions(module: &Module) -> HashSet<FunctionId> {
    let mut called = HashSet::new();
    for &fid in module.function_order() {
        let f = module.function(fid).expect("function_order entry exists");
        for inst in f.all_insts() {
            if let InstKind::Call { callee, .. } = &inst.kind {
                called.insert(*callee);
            }
        }
    }
    called
}

/// Removes functions nothing calls (except `main`, which the linker's
/// entry point always needs) and globals nothing references.
fn sweep_globally(module: &mut Module) -> (Vec<FunctionId>, Vec<GlobalId>) {
    let called = called_functions(module);
    let dead_fns: Vec<FunctionId> = module
        .function_order()
        .iter()
        .copied()
        .filter(|&fid| !called.contains(&fid) && module.function(fid).expect("function_order entry exists").name != "main")
        .collect();
    for &fid in &dead_fns {
        module.remove_function(fid).expect("id came from function_order");
    }

    let dead_globals: Vec<GlobalId> = module
        .global_order()
        .iter()
        .copied()
        .filter(|&gid| module.global(gid).expect("global_order entry exists").uses.is_empty())
        .collect();
    for &gid in &dead_globals {
        module.remove_global(gid).expect("id came from global_order");
    }

    (dead_fns, dead_globals)
}
