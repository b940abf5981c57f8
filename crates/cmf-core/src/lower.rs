//! AST -> IR lowering.
//!
//! A [`Lowerer`] owns the module under construction, a builder cursor
//! (recreated on demand from `current_function`/`current_block`, per
//! the "builder as explicit cursor" design), a scope stack, and the
//! small context record (`pre_entered_scope`) the function-declaration
//! and compound-statement rules share.
//!
//! Every compile-time failure here -- an undeclared identifier, a call
//! to something that isn't a function, a wrong argument count -- is a
//! [`LowerError`] and aborts lowering immediately with no partial
//! module returned, matching the two-class error model: these are
//! bugs in the *input program*, not in the compiler.

use thiserror::Error;

use crate::ast;
use crate::builder::IrBuilder;
use crate::id::{BlockId, FunctionId};
use crate::module::Module;
use crate::ops::{CmpPred, ConstValue, Operand};
use crate::scope::{Binding, ScopeStack};
use crate::type_id::TypeId;

/// A compile-time error in the source program, detected during
/// lowering. Partial modules are never returned alongside one of these.
#[derive(Debug, Error, PartialEq)]
pub enum LowerError {
    #[error("undeclared identifier: {name}")]
    UndeclaredIdentifier { name: String },

    #[error("redeclaration of {name}")]
    Redeclaration { name: String },

    #[error("call to non-function: {name}")]
    CallToNonFunction { name: String },

    #[error("{name} expects {expected} argument(s), got {actual}")]
    ArityMismatch { name: String, expected: usize, actual: usize },

    #[error("left-hand side of assignment is not an lvalue")]
    NotAnLValue,

    #[error("indexed reference to non-array: {name}")]
    IndexOfNonArray { name: String },

    #[error("identifier {name} is a function, not a variable")]
    NotAVariable { name: String },
}

/// Whether a binary/comparison operator pair promoted to the integer or
/// the float arithmetic family (Core Specification §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromotedMode {
    Integer,
    Float,
}

/// Lowers a complete program to a fresh [`Module`].
pub fn lower_program(program: &ast::Program) -> Result<Module, LowerError> {
    let mut lowerer = Lowerer::new();
    lowerer.declare_runtime();
    for decl in &program.declarations {
        lowerer.lower_declaration(decl)?;
    }
    Ok(lowerer.module)
}

struct Lowerer {
    module: Module,
    scope: ScopeStack,
    current_function: Option<FunctionId>,
    current_block: Option<BlockId>,
    pre_entered_scope: bool,
}

impl Lowerer {
    fn new() -> Self {
        let mut scope = ScopeStack::new();
        scope.enter();
        Lowerer {
            module: Module::new("module"),
            scope,
            current_function: None,
            current_block: None,
            pre_entered_scope: false,
        }
    }

    /// Declares the four runtime functions lowering assumes exist
    /// (Core Specification §4.A) as external declarations with no
    /// body, and binds them in the global scope.
    fn declare_runtime(&mut self) {
        let input = self.module.add_function("input", vec![], TypeId::INT32).expect("fresh module");
        self.scope.push("input", Binding::Function(input));

        let output = self.module.add_function("output", vec![TypeId::INT32], TypeId::VOID).expect("fresh module");
        self.scope.push("output", Binding::Function(output));

        let output_float = self.module.add_function("outputFloat", vec![TypeId::FLOAT], TypeId::VOID).expect("fresh module");
        self.scope.push("outputFloat", Binding::Function(output_float));

        let neg_idx_except = self.module.add_function("neg_idx_except", vec![], TypeId::VOID).expect("fresh module");
        self.scope.push("neg_idx_except", Binding::Function(neg_idx_except));
    }

    fn builder(&mut self) -> IrBuilder<'_> {
        let function = self.current_function.expect("builder used outside a function body");
        let block = self.current_block.expect("builder used outside a function body");
        let mut b = IrBuilder::new(&mut self.module);
        b.position_at_end(function, block);
        b
    }

    fn add_block(&mut self) -> BlockId {
        self.module.function_mut(self.current_function.expect("no current function")).expect("current function exists").add_block()
    }

    fn set_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    fn is_terminated(&self) -> bool {
        self.module
            .function(self.current_function.expect("no current function"))
            .expect("current function exists")
            .is_terminated(self.current_block.expect("no current block"))
            .expect("current block exists")
    }

    // -- Top-level declarations --

    fn lower_declaration(&mut self, decl: &ast::Declaration) -> Result<(), LowerError> {
        match decl {
            ast::Declaration::Var(v) => self.lower_global_var_decl(v),
            ast::Declaration::Function(f) => self.lower_function_decl(f),
        }
    }

    fn lower_global_var_decl(&mut self, decl: &ast::VarDecl) -> Result<(), LowerError> {
        let scalar = scalar_type_id(decl.ty);
        let (elem_type, init) = match decl.array_len {
            None => {
                let init = if scalar == TypeId::FLOAT { ConstValue::Float(0.0) } else { ConstValue::Int(0) };
                (scalar, init)
            }
            Some(n) => {
                let arr = self.module.types.array(scalar, n);
                (arr, ConstValue::Zero(arr))
            }
        };
        let id = self
            .module
            .add_global(&decl.name, elem_type, init, true)
            .map_err(|_| LowerError::Redeclaration { name: decl.name.clone() })?;
        self.scope.push(&decl.name, Binding::Global(id));
        Ok(())
    }

    fn param_ir_type(&mut self, param: &ast::Param) -> TypeId {
        let scalar = scalar_type_id(param.ty);
        if param.is_array {
            self.module.types.pointer(scalar)
        } else {
            scalar
        }
    }

    fn lower_function_decl(&mut self, decl: &ast::FunctionDecl) -> Result<(), LowerError> {
        if self.module.find_function(&decl.name).is_some() {
            return Err(LowerError::Redeclaration { name: decl.name.clone() });
        }
        let return_type = return_type_id(decl.return_type);
        let param_types: Vec<TypeId> = decl.params.iter().map(|p| self.param_ir_type(p)).collect();
        let fid = self
            .module
            .add_function(&decl.name, param_types.clone(), return_type)
            .map_err(|_| LowerError::Redeclaration { name: decl.name.clone() })?;
        self.scope.push(&decl.name, Binding::Function(fid));

        let body = match &decl.body {
            Some(body) => body,
            None => return Ok(()), // external declaration
        };

        self.current_function = Some(fid);
        let entry = self.module.function_mut(fid).expect("just created").add_block();
        self.current_block = Some(entry);

        self.scope.enter();
        self.pre_entered_scope = true;
        for (i, param) in decl.params.iter().enumerate() {
            let alloca = self.builder().create_alloca(param_types[i]);
            self.builder().create_store(Operand::Arg(i as u32), Operand::Inst(alloca));
            self.scope.push(&param.name, Binding::Local(Operand::Inst(alloca)));
        }

        self.lower_compound(body)?;

        if !self.is_terminated() {
            let default = match return_type {
                TypeId::VOID => None,
                TypeId::FLOAT => Some(Operand::Const(ConstValue::Float(0.0))),
                _ => Some(Operand::Const(ConstValue::Int(0))),
            };
            self.builder().create_ret(default);
        }

        self.scope.exit();
        self.current_function = None;
        self.current_block = None;
        Ok(())
    }

    // -- Statements --

    fn lower_compound(&mut self, compound: &ast::CompoundStmt) -> Result<(), LowerError> {
        let entered_here = if self.pre_entered_scope {
            self.pre_entered_scope = false;
            false
        } else {
            self.scope.enter();
            true
        };

        for decl in &compound.locals {
            self.lower_local_var_decl(decl)?;
        }
        for stmt in &compound.statements {
            if self.is_terminated() {
                // The rest of this block is unreachable; leaving it
                // unlowered rather than panicking on an append to a
                // terminated block. Unreachable-block cleanup handles
                // wholly unreachable blocks elsewhere in the pipeline,
                // but this is about trailing statements sharing a
                // block with a terminator that already fired.
                break;
            }
            self.lower_stmt(stmt)?;
        }

        if entered_here {
            self.scope.exit();
        }
        Ok(())
    }

    fn lower_local_var_decl(&mut self, decl: &ast::VarDecl) -> Result<(), LowerError> {
        let scalar = scalar_type_id(decl.ty);
        let alloc_type = match decl.array_len {
            None => scalar,
            Some(n) => self.module.types.array(scalar, n),
        };
        let alloca = self.builder().create_alloca(alloc_type);
        self.scope.push(&decl.name, Binding::Local(Operand::Inst(alloca)));
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> Result<(), LowerError> {
        match stmt {
            ast::Stmt::Compound(c) => self.lower_compound(c),
            ast::Stmt::Selection { cond, then_branch, else_branch } => {
                self.lower_selection(cond, then_branch, else_branch.as_deref())
            }
            ast::Stmt::Iteration { cond, body } => self.lower_iteration(cond, body),
            ast::Stmt::Return(e) => self.lower_return(e.as_ref()),
            ast::Stmt::Expr(e) => {
                self.lower_expr_rvalue(e)?;
                Ok(())
            }
        }
    }

    fn lower_selection(&mut self, cond: &ast::Expr, then_branch: &ast::Stmt, else_branch: Option<&ast::Stmt>) -> Result<(), LowerError> {
        let cond_val = self.lower_expr_rvalue(cond)?;
        let cond1 = self.to_int1(cond_val);

        let true_bb = self.add_block();
        let cont_bb = self.add_block();
        let false_bb = else_branch.map(|_| self.add_block());

        self.builder().create_cond_br(cond1, true_bb, false_bb.unwrap_or(cont_bb));

        self.set_block(true_bb);
        self.lower_stmt(then_branch)?;
        if !self.is_terminated() {
            self.builder().create_br(cont_bb);
        }

        if let (Some(else_stmt), Some(false_bb)) = (else_branch, false_bb) {
            self.set_block(false_bb);
            self.lower_stmt(else_stmt)?;
            if !self.is_terminated() {
                self.builder().create_br(cont_bb);
            }
        }

        self.set_block(cont_bb);
        Ok(())
    }

    fn lower_iteration(&mut self, cond: &ast::Expr, body: &ast::Stmt) -> Result<(), LowerError> {
        let cond_bb = self.add_block();
        let body_bb = self.add_block();
        let end_bb = self.add_block();

        self.builder().create_br(cond_bb);

        self.set_block(cond_bb);
        let cond_val = self.lower_expr_rvalue(cond)?;
        let cond1 = self.to_int1(cond_val);
        self.builder().create_cond_br(cond1, body_bb, end_bb);

        self.set_block(body_bb);
        self.lower_stmt(body)?;
        if !self.is_terminated() {
            self.builder().create_br(cond_bb);
        }

        self.set_block(end_bb);
        Ok(())
    }

    fn lower_return(&mut self, expr: Option<&ast::Expr>) -> Result<(), LowerError> {
        match expr {
            None => {
                self.builder().create_ret(None);
            }
            Some(e) => {
                let value = self.lower_expr_rvalue(e)?;
                let value_type = self.builder().operand_type(value);
                let return_type = self.module.function(self.current_function.unwrap()).unwrap().return_type;
                let coerced = self.coerce_scalar(value, value_type, return_type);
                self.builder().create_ret(Some(coerced));
            }
        }
        Ok(())
    }

    /// Condition truthiness conversion shared by selection and
    /// iteration: Int1 used directly, Int32 compared not-equal to
    /// zero, Float compared not-equal to zero with `FCmp` (never
    /// narrowed to an integer first).
    fn to_int1(&mut self, value: Operand) -> Operand {
        let ty = self.builder().operand_type(value);
        if ty == TypeId::INT1 {
            return value;
        }
        if ty == TypeId::FLOAT {
            let cmp = self.builder().create_fcmp(CmpPred::Ne, value, Operand::Const(ConstValue::Float(0.0)));
            return Operand::Inst(cmp);
        }
        let cmp = self.builder().create_icmp(CmpPred::Ne, value, Operand::Const(ConstValue::Int(0)));
        Operand::Inst(cmp)
    }

    // -- Expressions --

    fn lower_expr_rvalue(&mut self, expr: &ast::Expr) -> Result<Operand, LowerError> {
        match expr {
            ast::Expr::IntLit(v) => Ok(Operand::Const(ConstValue::Int(*v))),
            ast::Expr::FloatLit(v) => Ok(Operand::Const(ConstValue::Float(*v))),
            ast::Expr::Var { name, index } => self.lower_var_ref(name, index.as_deref(), false),
            ast::Expr::Assign { target, value } => self.lower_assign(target, value),
            ast::Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            ast::Expr::Unary { op, operand } => self.lower_unary(*op, operand),
            ast::Expr::Call { callee, args } => self.lower_call(callee, args),
        }
    }

    fn lower_expr_lvalue(&mut self, expr: &ast::Expr) -> Result<Operand, LowerError> {
        match expr {
            ast::Expr::Var { name, index } => self.lower_var_ref(name, index.as_deref(), true),
            _ => Err(LowerError::NotAnLValue),
        }
    }

    /// Resolves `name` to its storage pointer and the element type `E`
    /// that pointer's pointee is (Core Specification §4.B "Variable
    /// reference").
    fn base_and_element(&mut self, name: &str) -> Result<(Operand, TypeId), LowerError> {
        let binding = self.scope.find(name).ok_or_else(|| LowerError::UndeclaredIdentifier { name: name.to_string() })?;
        match binding {
            Binding::Global(g) => {
                let elem = self.module.global(g).expect("binding refers to live global").element_type;
                Ok((Operand::Global(g), elem))
            }
            Binding::Local(ptr) => {
                let ptr_type = self.builder().operand_type(ptr);
                let elem = self.module.types.pointee(ptr_type).expect("local binding is always a pointer");
                Ok((ptr, elem))
            }
            Binding::Function(_) => Err(LowerError::NotAVariable { name: name.to_string() }),
        }
    }

    fn lower_var_ref(&mut self, name: &str, index: Option<&ast::Expr>, want_lvalue: bool) -> Result<Operand, LowerError> {
        let (base, elem_type) = self.base_and_element(name)?;
        match index {
            None => {
                if want_lvalue {
                    return Ok(base);
                }
                if self.module.types.array_element(elem_type).is_some() {
                    let gep = self.builder().create_gep(base, vec![zero(), zero()]);
                    Ok(Operand::Inst(gep))
                } else {
                    let load = self.builder().create_load(base);
                    Ok(Operand::Inst(load))
                }
            }
            Some(index_expr) => {
                let idx = self.lower_expr_rvalue(index_expr)?;
                let idx_type = self.builder().operand_type(idx);
                let idx32 = match idx_type {
                    TypeId::FLOAT => Operand::Inst(self.builder().create_fptosi(idx)),
                    TypeId::INT1 => Operand::Inst(self.builder().create_zext(idx)),
                    _ => idx,
                };

                let ok_bb = self.add_block();
                let fail_bb = self.add_block();
                let in_bounds = self.builder().create_icmp(CmpPred::Ge, idx32, zero());
                self.builder().create_cond_br(Operand::Inst(in_bounds), ok_bb, fail_bb);

                self.set_block(fail_bb);
                let guard_fn = match self.scope.find("neg_idx_except") {
                    Some(Binding::Function(f)) => f,
                    _ => unreachable!("neg_idx_except is always bound by declare_runtime"),
                };
                self.builder().create_call(guard_fn, vec![]);
                self.builder().create_br(ok_bb);

                self.set_block(ok_bb);
                let ptr = if let Some(_inner) = self.module.types.pointee(elem_type) {
                    // E is itself a pointer: a decayed array parameter.
                    let loaded = self.builder().create_load(base);
                    self.builder().create_gep(Operand::Inst(loaded), vec![idx32])
                } else if self.module.types.array_element(elem_type).is_some() {
                    self.builder().create_gep(base, vec![zero(), idx32])
                } else {
                    return Err(LowerError::IndexOfNonArray { name: name.to_string() });
                };

                if want_lvalue {
                    Ok(Operand::Inst(ptr))
                } else {
                    let load = self.builder().create_load(Operand::Inst(ptr));
                    Ok(Operand::Inst(load))
                }
            }
        }
    }

    fn lower_assign(&mut self, target: &ast::Expr, value: &ast::Expr) -> Result<Operand, LowerError> {
        let rhs = self.lower_expr_rvalue(value)?;
        let addr = self.lower_expr_lvalue(target)?;
        let addr_type = self.builder().operand_type(addr);
        let elem_type = self.module.types.pointee(addr_type).expect("lvalue is always a pointer");
        let rhs_type = self.builder().operand_type(rhs);
        let coerced = self.coerce_scalar(rhs, rhs_type, elem_type);
        self.builder().create_store(coerced, addr);
        Ok(coerced)
    }

    /// The three-case scalar coercion shared by assignment, return, and
    /// call-argument lowering: `Int32 -> Float` via `SIToFP`,
    /// `Float -> Int32` via `FPToSI`, `Int1 -> Int32` via `ZExt`. Any
    /// other mismatch (there is none reachable from a well-typed
    /// C-minus-f program) passes the value through unchanged.
    fn coerce_scalar(&mut self, value: Operand, from: TypeId, to: TypeId) -> Operand {
        if from == to {
            return value;
        }
        if from == TypeId::INT32 && to == TypeId::FLOAT {
            return Operand::Inst(self.builder().create_sitofp(value));
        }
        if from == TypeId::FLOAT && to == TypeId::INT32 {
            return Operand::Inst(self.builder().create_fptosi(value));
        }
        if from == TypeId::INT1 && to == TypeId::INT32 {
            return Operand::Inst(self.builder().create_zext(value));
        }
        value
    }

    /// Numeric promotion (Core Specification §4.B). Mutates nothing in
    /// place -- Rust values are immutable -- but returns the (possibly
    /// widened) pair the caller should use instead of its inputs,
    /// which is the same effect the spec's "mutates the operand
    /// references" describes.
    fn promote(&mut self, l: Operand, r: Operand) -> (Operand, Operand, PromotedMode) {
        let lt = self.builder().operand_type(l);
        let rt = self.builder().operand_type(r);

        if lt == rt {
            if lt == TypeId::INT1 {
                let l2 = Operand::Inst(self.builder().create_zext(l));
                let r2 = Operand::Inst(self.builder().create_zext(r));
                return (l2, r2, PromotedMode::Integer);
            }
            let mode = if lt == TypeId::FLOAT { PromotedMode::Float } else { PromotedMode::Integer };
            return (l, r, mode);
        }

        if lt == TypeId::FLOAT || rt == TypeId::FLOAT {
            let l2 = self.widen_to_float(l, lt);
            let r2 = self.widen_to_float(r, rt);
            return (l2, r2, PromotedMode::Float);
        }

        let l2 = self.widen_int1_to_int32(l, lt);
        let r2 = self.widen_int1_to_int32(r, rt);
        (l2, r2, PromotedMode::Integer)
    }

    fn widen_to_float(&mut self, value: Operand, ty: TypeId) -> Operand {
        if ty == TypeId::FLOAT {
            return value;
        }
        let as_int32 = if ty == TypeId::INT1 { Operand::Inst(self.builder().create_zext(value)) } else { value };
        Operand::Inst(self.builder().create_sitofp(as_int32))
    }

    fn widen_int1_to_int32(&mut self, value: Operand, ty: TypeId) -> Operand {
        if ty == TypeId::INT1 {
            Operand::Inst(self.builder().create_zext(value))
        } else {
            value
        }
    }

    fn lower_binary(&mut self, op: ast::BinOp, lhs: &ast::Expr, rhs: &ast::Expr) -> Result<Operand, LowerError> {
        let l = self.lower_expr_rvalue(lhs)?;
        let r = self.lower_expr_rvalue(rhs)?;
        let (l, r, mode) = self.promote(l, r);

        if op.is_relational() {
            let pred = relational_pred(op);
            let id = match mode {
                PromotedMode::Integer => self.builder().create_icmp(pred, l, r),
                PromotedMode::Float => self.builder().create_fcmp(pred, l, r),
            };
            return Ok(Operand::Inst(id));
        }

        let id = match (op, mode) {
            (ast::BinOp::Add, PromotedMode::Integer) => self.builder().create_iadd(l, r),
            (ast::BinOp::Add, PromotedMode::Float) => self.builder().create_fadd(l, r),
            (ast::BinOp::Sub, PromotedMode::Integer) => self.builder().create_isub(l, r),
            (ast::BinOp::Sub, PromotedMode::Float) => self.builder().create_fsub(l, r),
            (ast::BinOp::Mul, PromotedMode::Integer) => self.builder().create_imul(l, r),
            (ast::BinOp::Mul, PromotedMode::Float) => self.builder().create_fmul(l, r),
            (ast::BinOp::Div, PromotedMode::Integer) => self.builder().create_isdiv(l, r),
            (ast::BinOp::Div, PromotedMode::Float) => self.builder().create_fdiv(l, r),
            _ => unreachable!("relational ops handled above"),
        };
        Ok(Operand::Inst(id))
    }

    fn lower_unary(&mut self, op: ast::UnaryOp, operand: &ast::Expr) -> Result<Operand, LowerError> {
        let ast::UnaryOp::Neg = op;
        let v = self.lower_expr_rvalue(operand)?;
        let (zero, v, mode) = self.promote(Operand::Const(ConstValue::Int(0)), v);
        let id = match mode {
            PromotedMode::Integer => self.builder().create_isub(zero, v),
            PromotedMode::Float => self.builder().create_fsub(zero, v),
        };
        Ok(Operand::Inst(id))
    }

    fn lower_call(&mut self, callee: &str, args: &[ast::Expr]) -> Result<Operand, LowerError> {
        let binding = self.scope.find(callee).ok_or_else(|| LowerError::UndeclaredIdentifier { name: callee.to_string() })?;
        let fid = match binding {
            Binding::Function(f) => f,
            _ => return Err(LowerError::CallToNonFunction { name: callee.to_string() }),
        };
        let (param_types, _) = {
            let f = self.module.function(fid).expect("binding refers to live function");
            (f.param_types.clone(), f.return_type)
        };
        if args.len() != param_types.len() {
            return Err(LowerError::ArityMismatch { name: callee.to_string(), expected: param_types.len(), actual: args.len() });
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (arg_expr, expected) in args.iter().zip(param_types.iter()) {
            let value = self.lower_expr_rvalue(arg_expr)?;
            let value_type = self.builder().operand_type(value);
            let is_pointer = self.module.types.pointee(value_type).is_some();
            let coerced = if is_pointer || value_type == *expected {
                value
            } else if value_type == TypeId::INT32 && *expected == TypeId::FLOAT {
                Operand::Inst(self.builder().create_sitofp(value))
            } else if value_type == TypeId::INT1 {
                Operand::Inst(self.builder().create_zext(value))
            } else if value_type == TypeId::FLOAT && *expected == TypeId::INT32 {
                Operand::Inst(self.builder().create_fptosi(value))
            } else {
                value
            };
            lowered.push(coerced);
        }

        let id = self.builder().create_call(fid, lowered);
        Ok(Operand::Inst(id))
    }
}

fn zero() -> Operand {
    Operand::Const(ConstValue::Int(0))
}

fn scalar_type_id(ty: ast::ScalarType) -> TypeId {
    match ty {
        ast::ScalarType::Int => TypeId::INT32,
        ast::ScalarType::Float => TypeId::FLOAT,
    }
}

fn return_type_id(ty: ast::ReturnType) -> TypeId {
    match ty {
        ast::ReturnType::Void => TypeId::VOID,
        ast::ReturnType::Int => TypeId::INT32,
        ast::ReturnType::Float => TypeId::FLOAT,
    }
}

fn relational_pred(op: ast::BinOp) -> CmpPred {
    match op {
        ast::BinOp::Lt => CmpPred::Lt,
        ast::BinOp::Le => CmpPred::Le,
        ast::BinOp::Gt => CmpPred::Gt,
        ast::BinOp::Ge => CmpPred::Ge,
        ast::BinOp::Eq => CmpPred::Eq,
        ast::BinOp::Ne => CmpPred::Ne,
        _ => unreachable!("relational_pred called on a non-relational operator"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::InstKind;

    fn func(name: &str, return_type: ast::ReturnType, params: Vec<ast::Param>, body: ast::CompoundStmt) -> ast::Declaration {
        ast::Declaration::Function(ast::FunctionDecl { return_type, name: name.to_string(), params, body: Some(body) })
    }

    fn compound(statements: Vec<ast::Stmt>) -> ast::CompoundStmt {
        ast::CompoundStmt { locals: vec![], statements }
    }

    #[test]
    fn minimal_main_returns_zero() {
        let program = ast::Program {
            declarations: vec![func("main", ast::ReturnType::Int, vec![], compound(vec![ast::Stmt::Return(Some(ast::Expr::IntLit(0)))]))],
        };
        let module = lower_program(&program).unwrap();
        let main = module.function(module.find_function("main").unwrap()).unwrap();
        let entry = main.entry_block().unwrap();
        let insts: Vec<_> = main.block(entry).unwrap().insts.iter().map(|id| &main.inst(*id).unwrap().kind).collect();
        assert_eq!(insts.len(), 1);
        assert!(matches!(insts[0], InstKind::Ret(Some(Operand::Const(ConstValue::Int(0))))));
    }

    #[test]
    fn missing_return_gets_default_value() {
        let program = ast::Program {
            declarations: vec![func("f", ast::ReturnType::Int, vec![], compound(vec![]))],
        };
        let module = lower_program(&program).unwrap();
        let f = module.function(module.find_function("f").unwrap()).unwrap();
        let entry = f.entry_block().unwrap();
        let last = f.block(entry).unwrap().insts.last().copied().unwrap();
        assert!(matches!(f.inst(last).unwrap().kind, InstKind::Ret(Some(Operand::Const(ConstValue::Int(0))))));
    }

    #[test]
    fn global_store_is_reachable_through_function() {
        let program = ast::Program {
            declarations: vec![
                ast::Declaration::Var(ast::VarDecl { ty: ast::ScalarType::Int, name: "x".to_string(), array_len: None }),
                func(
                    "f",
                    ast::ReturnType::Void,
                    vec![],
                    compound(vec![ast::Stmt::Expr(ast::Expr::Assign {
                        target: Box::new(ast::Expr::Var { name: "x".to_string(), index: None }),
                        value: Box::new(ast::Expr::IntLit(1)),
                    })]),
                ),
            ],
        };
        let module = lower_program(&program).unwrap();
        let g = module.find_global("x").unwrap();
        assert_eq!(module.global(g).unwrap().uses.len(), 1);
    }

    #[test]
    fn undeclared_identifier_is_an_error() {
        let program = ast::Program {
            declarations: vec![func(
                "f",
                ast::ReturnType::Int,
                vec![],
                compound(vec![ast::Stmt::Return(Some(ast::Expr::Var { name: "nope".to_string(), index: None }))]),
            )],
        };
        let err = lower_program(&program).unwrap_err();
        assert_eq!(err, LowerError::UndeclaredIdentifier { name: "nope".to_string() });
    }

    #[test]
    fn call_arity_mismatch_is_an_error() {
        let program = ast::Program {
            declarations: vec![
                func("g", ast::ReturnType::Int, vec![ast::Param { ty: ast::ScalarType::Int, name: "a".to_string(), is_array: false }], compound(vec![ast::Stmt::Return(Some(ast::Expr::IntLit(0)))])),
                func(
                    "f",
                    ast::ReturnType::Int,
                    vec![],
                    compound(vec![ast::Stmt::Return(Some(ast::Expr::Call { callee: "g".to_string(), args: vec![] }))]),
                ),
            ],
        };
        let err = lower_program(&program).unwrap_err();
        assert_eq!(err, LowerError::ArityMismatch { name: "g".to_string(), expected: 1, actual: 0 });
    }

    #[test]
    fn array_param_indexing_loads_pointer_then_geps() {
        let program = ast::Program {
            declarations: vec![func(
                "f",
                ast::ReturnType::Int,
                vec![ast::Param { ty: ast::ScalarType::Int, name: "a".to_string(), is_array: true }],
                compound(vec![ast::Stmt::Return(Some(ast::Expr::Var {
                    name: "a".to_string(),
                    index: Some(Box::new(ast::Expr::IntLit(0))),
                }))]),
            )],
        };
        let module = lower_program(&program).unwrap();
        let f = module.function(module.find_function("f").unwrap()).unwrap();
        let has_load_then_gep = f.all_insts().any(|i| matches!(&i.kind, InstKind::GetElementPtr { base: Operand::Inst(_), indices } if indices.len() == 1));
        assert!(has_load_then_gep);
    }

    #[test]
    fn fixed_array_indexing_geps_with_zero_and_index() {
        let program = ast::Program {
            declarations: vec![
                ast::Declaration::Var(ast::VarDecl { ty: ast::ScalarType::Int, name: "a".to_string(), array_len: Some(10) }),
                func(
                    "main",
                    ast::ReturnType::Int,
                    vec![],
                    compound(vec![ast::Stmt::Return(Some(ast::Expr::Var {
                        name: "a".to_string(),
                        index: Some(Box::new(ast::Expr::IntLit(2))),
                    }))]),
                ),
            ],
        };
        let module = lower_program(&program).unwrap();
        let main = module.function(module.find_function("main").unwrap()).unwrap();
        let has_array_gep = main.all_insts().any(|i| matches!(&i.kind, InstKind::GetElementPtr { base: Operand::Global(_), indices } if indices.len() == 2));
        assert!(has_array_gep);
    }

    #[test]
    fn negative_index_guard_calls_runtime_function() {
        let program = ast::Program {
            declarations: vec![
                ast::Declaration::Var(ast::VarDecl { ty: ast::ScalarType::Int, name: "a".to_string(), array_len: Some(10) }),
                func(
                    "main",
                    ast::ReturnType::Int,
                    vec![],
                    compound(vec![ast::Stmt::Return(Some(ast::Expr::Var {
                        name: "a".to_string(),
                        index: Some(Box::new(ast::Expr::IntLit(0))),
                    }))]),
                ),
            ],
        };
        let module = lower_program(&program).unwrap();
        let guard = module.find_function("neg_idx_except").unwrap();
        let main = module.function(module.find_function("main").unwrap()).unwrap();
        let calls_guard = main.all_insts().any(|i| matches!(&i.kind, InstKind::Call { callee, .. } if *callee == guard));
        assert!(calls_guard);
    }

    #[test]
    fn float_return_from_int_expression_coerces() {
        let program = ast::Program {
            declarations: vec![func(
                "f",
                ast::ReturnType::Float,
                vec![ast::Param { ty: ast::ScalarType::Int, name: "a".to_string(), is_array: false }],
                compound(vec![ast::Stmt::Return(Some(ast::Expr::Binary {
                    op: ast::BinOp::Add,
                    lhs: Box::new(ast::Expr::Var { name: "a".to_string(), index: None }),
                    rhs: Box::new(ast::Expr::IntLit(1)),
                }))]),
            )],
        };
        let module = lower_program(&program).unwrap();
        let f = module.function(module.find_function("f").unwrap()).unwrap();
        let has_sitofp = f.all_insts().any(|i| matches!(i.kind, InstKind::SIToFP(_)));
        assert!(has_sitofp);
    }

    #[test]
    fn unused_pure_call_is_still_emitted_for_dce_to_remove() {
        let program = ast::Program {
            declarations: vec![
                func(
                    "pure",
                    ast::ReturnType::Int,
                    vec![ast::Param { ty: ast::ScalarType::Int, name: "x".to_string(), is_array: false }],
                    compound(vec![ast::Stmt::Return(Some(ast::Expr::Binary {
                        op: ast::BinOp::Add,
                        lhs: Box::new(ast::Expr::Var { name: "x".to_string(), index: None }),
                        rhs: Box::new(ast::Expr::IntLit(1)),
                    }))]),
                ),
                func(
                    "main",
                    ast::ReturnType::Int,
                    vec![],
                    compound(vec![
                        ast::Stmt::Expr(ast::Expr::Call { callee: "pure".to_string(), args: vec![ast::Expr::IntLit(1)] }),
                        ast::Stmt::Return(Some(ast::Expr::IntLit(0))),
                    ]),
                ),
            ],
        };
        let module = lower_program(&program).unwrap();
        let main = module.function(module.find_function("main").unwrap()).unwrap();
        assert!(main.all_insts().any(|i| matches!(i.kind, InstKind::Call { .. })));
    }

    fn promotable_operand() -> impl proptest::strategy::Strategy<Value = ast::Expr> {
        use proptest::prelude::*;
        prop_oneof![
            Just(ast::Expr::IntLit(3)),
            Just(ast::Expr::FloatLit(3.0)),
            // An Int1-typed operand: the result of a relational comparison.
            Just(ast::Expr::Binary { op: ast::BinOp::Lt, lhs: Box::new(ast::Expr::IntLit(1)), rhs: Box::new(ast::Expr::IntLit(2)) }),
        ]
    }

    proptest::proptest! {
        /// Every pairing across the promotion lattice's three input kinds
        /// (Int32, Float, Int1) lowers without the builder's internal
        /// type assertions firing, for every arithmetic operator.
        #[test]
        fn promotion_lattice_never_violates_builder_typing(lhs in promotable_operand(), rhs in promotable_operand(), op in proptest::sample::select(vec![ast::BinOp::Add, ast::BinOp::Sub, ast::BinOp::Mul, ast::BinOp::Div])) {
            let program = ast::Program {
                declarations: vec![func(
                    "f",
                    ast::ReturnType::Float,
                    vec![],
                    compound(vec![ast::Stmt::Return(Some(ast::Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }))]),
                )],
            };
            proptest::prop_assert!(lower_program(&program).is_ok());
        }
    }
}
