//! The IR builder: a stateful cursor over a module.
//!
//! The builder owns the "current insertion point" (a function and a
//! block within it) explicitly, rather than through thread-local or
//! implicit state. Every `create_*` method derives the result type from
//! its operands, appends the instruction to the current block, and
//! registers it in the relevant use-lists, atomically with respect to
//! the rest of the compiler. Calling a `create_*` method with operand
//! types the signature rejects is a programming error and panics --
//! lowering's numeric-promotion step is responsible for never doing
//! that, exactly as typing invariant I2 requires of the IR it produces.

use crate::error::CoreError;
use crate::function::Function;
use crate::id::{BlockId, FunctionId, InstId};
use crate::module::Module;
use crate::ops::{CmpPred, ConstValue, InstKind, Operand};
use crate::type_id::TypeId;

pub struct IrBuilder<'m> {
    module: &'m mut Module,
    current_function: Option<FunctionId>,
    current_block: Option<BlockId>,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        IrBuilder { module, current_function: None, current_block: None }
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        self.module
    }

    pub fn position_at_end(&mut self, function: FunctionId, block: BlockId) {
        self.current_function = Some(function);
        self.current_block = Some(block);
    }

    pub fn current_function_id(&self) -> FunctionId {
        self.current_function.expect("builder used before a position was set")
    }

    pub fn current_block_id(&self) -> BlockId {
        self.current_block.expect("builder used before a position was set")
    }

    fn current_function(&self) -> &Function {
        self.module.function(self.current_function_id()).expect("current function does not exist")
    }

    /// `true` once the current block's last instruction is a terminator.
    pub fn is_current_block_terminated(&self) -> bool {
        self.current_function().is_terminated(self.current_block_id()).expect("current block does not exist")
    }

    /// The type an operand evaluates to, resolved against the current
    /// function and the module's global table. Interns the pointer type
    /// of a `Global` operand on demand, the same way `create_alloca`
    /// interns the pointer type of its allocation.
    pub fn operand_type(&mut self, operand: Operand) -> TypeId {
        match operand {
            Operand::Const(ConstValue::Int(_)) => TypeId::INT32,
            Operand::Const(ConstValue::Float(_)) => TypeId::FLOAT,
            Operand::Const(ConstValue::Zero(t)) => t,
            Operand::Arg(i) => self.current_function().param_types[i as usize],
            Operand::Global(g) => {
                let elem = self.module.global(g).expect("dangling global operand").element_type;
                self.module.types.pointer(elem)
            }
            Operand::Inst(id) => self.current_function().inst(id).expect("dangling instruction operand").result_type,
        }
    }

    fn finish(&mut self, kind: InstKind, result_type: TypeId) -> InstId {
        let func = self.current_function_id();
        let block = self.current_block_id();
        let operands = kind.operands();
        let id = self
            .module
            .function_mut(func)
            .expect("current function does not exist")
            .append_inst(block, kind, result_type)
            .unwrap_or_else(|e| panic!("builder misuse: {e}"));
        for (slot, operand) in operands {
            if let Operand::Global(g) = operand {
                self.module.add_global_use(g, func, id, slot);
            }
        }
        id
    }

    fn expect_type(&mut self, operand: Operand, expected: TypeId, what: &str) {
        let actual = self.operand_type(operand);
        assert_eq!(actual, expected, "{what}: expected type {expected}, got {actual}");
    }

    pub fn create_iadd(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::INT32, "IAdd lhs");
        self.expect_type(rhs, TypeId::INT32, "IAdd rhs");
        self.finish(InstKind::IAdd(lhs, rhs), TypeId::INT32)
    }

    pub fn create_isub(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::INT32, "ISub lhs");
        self.expect_type(rhs, TypeId::INT32, "ISub rhs");
        self.finish(InstKind::ISub(lhs, rhs), TypeId::INT32)
    }

    pub fn create_imul(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::INT32, "IMul lhs");
        self.expect_type(rhs, TypeId::INT32, "IMul rhs");
        self.finish(InstKind::IMul(lhs, rhs), TypeId::INT32)
    }

    pub fn create_isdiv(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::INT32, "ISDiv lhs");
        self.expect_type(rhs, TypeId::INT32, "ISDiv rhs");
        self.finish(InstKind::ISDiv(lhs, rhs), TypeId::INT32)
    }

    pub fn create_fadd(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::FLOAT, "FAdd lhs");
        self.expect_type(rhs, TypeId::FLOAT, "FAdd rhs");
        self.finish(InstKind::FAdd(lhs, rhs), TypeId::FLOAT)
    }

    pub fn create_fsub(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::FLOAT, "FSub lhs");
        self.expect_type(rhs, TypeId::FLOAT, "FSub rhs");
        self.finish(InstKind::FSub(lhs, rhs), TypeId::FLOAT)
    }

    pub fn create_fmul(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::FLOAT, "FMul lhs");
        self.expect_type(rhs, TypeId::FLOAT, "FMul rhs");
        self.finish(InstKind::FMul(lhs, rhs), TypeId::FLOAT)
    }

    pub fn create_fdiv(&mut self, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::FLOAT, "FDiv lhs");
        self.expect_type(rhs, TypeId::FLOAT, "FDiv rhs");
        self.finish(InstKind::FDiv(lhs, rhs), TypeId::FLOAT)
    }

    pub fn create_icmp(&mut self, pred: CmpPred, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::INT32, "ICmp lhs");
        self.expect_type(rhs, TypeId::INT32, "ICmp rhs");
        self.finish(InstKind::ICmp(pred, lhs, rhs), TypeId::INT1)
    }

    pub fn create_fcmp(&mut self, pred: CmpPred, lhs: Operand, rhs: Operand) -> InstId {
        self.expect_type(lhs, TypeId::FLOAT, "FCmp lhs");
        self.expect_type(rhs, TypeId::FLOAT, "FCmp rhs");
        self.finish(InstKind::FCmp(pred, lhs, rhs), TypeId::INT1)
    }

    pub fn create_zext(&mut self, value: Operand) -> InstId {
        self.expect_type(value, TypeId::INT1, "ZExt operand");
        self.finish(InstKind::ZExt(value), TypeId::INT32)
    }

    pub fn create_sitofp(&mut self, value: Operand) -> InstId {
        self.expect_type(value, TypeId::INT32, "SIToFP operand");
        self.finish(InstKind::SIToFP(value), TypeId::FLOAT)
    }

    pub fn create_fptosi(&mut self, value: Operand) -> InstId {
        self.expect_type(value, TypeId::FLOAT, "FPToSI operand");
        self.finish(InstKind::FPToSI(value), TypeId::INT32)
    }

    pub fn create_alloca(&mut self, element_type: TypeId) -> InstId {
        let ptr_type = self.module.types.pointer(element_type);
        self.finish(InstKind::Alloca { element_type }, ptr_type)
    }

    pub fn create_load(&mut self, ptr: Operand) -> InstId {
        let ptr_type = self.operand_type(ptr);
        let elem = self.module.types.pointee(ptr_type).unwrap_or_else(|| panic!("Load operand is not a pointer: {ptr_type}"));
        self.finish(InstKind::Load(ptr), elem)
    }

    pub fn create_store(&mut self, value: Operand, ptr: Operand) -> InstId {
        let ptr_type = self.operand_type(ptr);
        let elem = self.module.types.pointee(ptr_type).unwrap_or_else(|| panic!("Store target is not a pointer: {ptr_type}"));
        self.expect_type(value, elem, "Store value");
        self.finish(InstKind::Store { value, ptr }, TypeId::VOID)
    }

    /// `indices.len() == 2` addresses an element of an `Array(T,N)`
    /// pointee (`[0, idx]`, matching the array-decay and fixed-array
    /// indexing cases of lowering). `indices.len() == 1` addresses
    /// through a plain `Pointer(T)` pointee (the decayed-array-parameter
    /// case, where the pointer was already loaded once).
    pub fn create_gep(&mut self, base: Operand, indices: Vec<Operand>) -> InstId {
        let base_type = self.operand_type(base);
        let pointee = self.module.types.pointee(base_type).unwrap_or_else(|| panic!("GEP base is not a pointer: {base_type}"));
        let result_type = match indices.len() {
            2 => {
                let elem = self
                    .module
                    .types
                    .array_element(pointee)
                    .unwrap_or_else(|| panic!("GEP with 2 indices requires an Array pointee, got {pointee}"));
                self.module.types.pointer(elem)
            }
            1 => self.module.types.pointer(pointee),
            n => panic!("unsupported GEP index count: {n}"),
        };
        self.finish(InstKind::GetElementPtr { base, indices }, result_type)
    }

    pub fn create_call(&mut self, callee: FunctionId, args: Vec<Operand>) -> InstId {
        let (param_types, return_type) = {
            let f = self.module.function(callee).expect("call to unknown function");
            (f.param_types.clone(), f.return_type)
        };
        assert_eq!(args.len(), param_types.len(), "call arity mismatch for function {callee}");
        for (arg, expected) in args.iter().zip(param_types.iter()) {
            self.expect_type(*arg, *expected, "Call argument");
        }
        self.finish(InstKind::Call { callee, args }, return_type)
    }

    pub fn create_br(&mut self, target: BlockId) -> InstId {
        self.finish(InstKind::Br(target), TypeId::VOID)
    }

    pub fn create_cond_br(&mut self, cond: Operand, true_target: BlockId, false_target: BlockId) -> InstId {
        self.expect_type(cond, TypeId::INT1, "CondBr condition");
        self.finish(InstKind::CondBr { cond, true_target, false_target }, TypeId::VOID)
    }

    pub fn create_ret(&mut self, value: Option<Operand>) -> InstId {
        let func = self.current_function();
        match value {
            Some(v) => self.expect_type(v, func.return_type, "Ret value"),
            None => assert_eq!(func.return_type, TypeId::VOID, "Ret with no value in non-void function"),
        }
        self.finish(InstKind::Ret(value), TypeId::VOID)
    }
}

/// Returns a Core error instead of panicking for the one case lowering
/// genuinely needs to recover from at the call site: appending to an
/// already-terminated block is reported through [`CoreError`] rather
/// than through `finish`'s panic, since `append_inst` reports it before
/// the builder's type-derivation logic even runs.
impl<'m> IrBuilder<'m> {
    pub fn try_create_br(&mut self, target: BlockId) -> Result<InstId, CoreError> {
        if self.is_current_block_terminated() {
            return Err(CoreError::BlockAlreadyTerminated { id: self.current_block_id() });
        }
        Ok(self.create_br(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ConstValue;

    fn setup() -> (Module, FunctionId, BlockId) {
        let mut module = Module::new("m");
        let f = module.add_function("f", vec![TypeId::INT32], TypeId::INT32).unwrap();
        let b0 = module.function_mut(f).unwrap().add_block();
        (module, f, b0)
    }

    #[test]
    fn iadd_produces_int32_result() {
        let (mut module, f, b0) = setup();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        let id = b.create_iadd(Operand::Arg(0), Operand::Const(ConstValue::Int(1)));
        assert_eq!(module.function(f).unwrap().inst(id).unwrap().result_type, TypeId::INT32);
    }

    #[test]
    #[should_panic(expected = "expected type")]
    fn iadd_with_float_operand_panics() {
        let mut module = Module::new("m");
        let f = module.add_function("f", vec![TypeId::FLOAT], TypeId::INT32).unwrap();
        let b0 = module.function_mut(f).unwrap().add_block();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        b.create_iadd(Operand::Arg(0), Operand::Const(ConstValue::Int(1)));
    }

    #[test]
    fn alloca_then_load_round_trips_type() {
        let (mut module, f, b0) = setup();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        let a = b.create_alloca(TypeId::INT32);
        let load = b.create_load(Operand::Inst(a));
        assert_eq!(module.function(f).unwrap().inst(load).unwrap().result_type, TypeId::INT32);
    }

    #[test]
    fn store_requires_matching_value_type() {
        let (mut module, f, b0) = setup();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        let a = b.create_alloca(TypeId::INT32);
        let store = b.create_store(Operand::Arg(0), Operand::Inst(a));
        assert_eq!(module.function(f).unwrap().inst(store).unwrap().result_type, TypeId::VOID);
    }

    #[test]
    fn gep_two_indices_into_array() {
        let mut module = Module::new("m");
        let arr = module.types.array(TypeId::INT32, 10);
        let g = module.add_global("a", arr, ConstValue::Zero(arr), true).unwrap();
        let f = module.add_function("main", vec![], TypeId::INT32).unwrap();
        let b0 = module.function_mut(f).unwrap().add_block();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        let gep = b.create_gep(
            Operand::Global(g),
            vec![Operand::Const(ConstValue::Int(0)), Operand::Const(ConstValue::Int(2))],
        );
        let result_type = module.function(f).unwrap().inst(gep).unwrap().result_type;
        assert_eq!(module.types.pointee(result_type), Some(TypeId::INT32));
        assert_eq!(module.global(g).unwrap().uses.len(), 1);
    }

    #[test]
    fn call_checks_arity_and_types() {
        let mut module = Module::new("m");
        let callee = module.add_function("callee", vec![TypeId::INT32], TypeId::FLOAT).unwrap();
        module.function_mut(callee).unwrap().add_block();
        {
            let mut b = IrBuilder::new(&mut module);
            b.position_at_end(callee, BlockId(0));
            b.create_ret(Some(Operand::Const(ConstValue::Float(0.0))));
        }
        let caller = module.add_function("caller", vec![], TypeId::VOID).unwrap();
        let b0 = module.function_mut(caller).unwrap().add_block();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(caller, b0);
        let call = b.create_call(callee, vec![Operand::Const(ConstValue::Int(5))]);
        assert_eq!(module.function(caller).unwrap().inst(call).unwrap().result_type, TypeId::FLOAT);
    }

    #[test]
    #[should_panic(expected = "already terminated")]
    fn appending_after_ret_panics_via_finish() {
        let (mut module, f, b0) = setup();
        let mut b = IrBuilder::new(&mut module);
        b.position_at_end(f, b0);
        b.create_ret(Some(Operand::Arg(0)));
        b.create_br(b0);
    }
}
