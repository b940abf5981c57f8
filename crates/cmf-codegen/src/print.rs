//! Textual emission of a [`Module`] in the LLVM assembly dialect.
//!
//! Emission order follows the Core Specification's External Interfaces
//! section exactly: globals in declaration order, then functions in
//! declaration order, each function's blocks in insertion order, each
//! block's instructions in insertion order. Nothing here mutates the
//! module or re-derives anything DCE or lowering is responsible for --
//! this is a pure, total function of a well-formed module.

use std::fmt::Write as _;

use cmf_core::{CmpPred, ConstValue, Function, FunctionId, InstKind, Module, Operand, TypeId};

use crate::types::type_name;

/// Renders `module` as LLVM assembly dialect text.
pub fn emit_module(module: &Module) -> String {
    let mut out = String::new();
    for &gid in module.global_order() {
        let g = module.global(gid).expect("global_order entry exists");
        let ty = type_name(&module.types, g.element_type);
        writeln!(out, "@{} = global {ty} {}", g.name, const_str(&module.types, g.init)).unwrap();
    }
    if !module.global_order().is_empty() && !module.function_order().is_empty() {
        out.push('\n');
    }
    for (i, &fid) in module.function_order().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        emit_function(&mut out, module, fid);
    }
    out
}

fn const_str(registry: &cmf_core::TypeRegistry, value: ConstValue) -> String {
    match value {
        ConstValue::Int(n) => n.to_string(),
        ConstValue::Float(f) => format_float(f),
        ConstValue::Zero(t) => {
            if registry.array_element(t).is_some() {
                "zeroinitializer".to_string()
            } else if registry.is_float(t) {
                "0.0".to_string()
            } else {
                "0".to_string()
            }
        }
    }
}

fn format_float(f: f32) -> String {
    format!("{f:.6}")
}

fn emit_function(out: &mut String, module: &Module, fid: FunctionId) {
    let f = module.function(fid).expect("function_order entry exists");
    let ret = type_name(&module.types, f.return_type);

    if f.is_declaration() {
        let param_list = f.param_types.iter().map(|t| type_name(&module.types, *t)).collect::<Vec<_>>().join(", ");
        writeln!(out, "declare {ret} @{}({param_list})", f.name).unwrap();
        return;
    }

    let named_params = f.param_types.iter().enumerate().map(|(i, t)| format!("{} %arg{i}", type_name(&module.types, *t))).collect::<Vec<_>>().join(", ");
    writeln!(out, "define {ret} @{}({named_params}) {{", f.name).unwrap();
    for &bid in f.block_order() {
        let block = f.block(bid).expect("block_order entry exists");
        writeln!(out, "bb{}:", bid.0).unwrap();
        for &iid in &block.insts {
            let inst = f.inst(iid).expect("block's own instruction list");
            writeln!(out, "  {}", emit_inst(module, f, iid, &inst.kind)).unwrap();
        }
    }
    writeln!(out, "}}").unwrap();
}

/// A typed reference to an operand's value, as printed inline:
/// `<type> <value>`, e.g. `i32 %t3` or `float 1.000000`.
fn typed_operand(module: &Module, f: &Function, operand: Operand) -> String {
    format!("{} {}", operand_type_name(module, f, operand), operand_value(module, operand))
}

fn operand_type_name(module: &Module, f: &Function, operand: Operand) -> String {
    match operand {
        Operand::Const(ConstValue::Int(_)) => type_name(&module.types, TypeId::INT32),
        Operand::Const(ConstValue::Float(_)) => type_name(&module.types, TypeId::FLOAT),
        Operand::Const(ConstValue::Zero(t)) => type_name(&module.types, t),
        Operand::Arg(i) => type_name(&module.types, f.param_types[i as usize]),
        Operand::Global(g) => {
            let elem = module.global(g).expect("dangling global operand").element_type;
            format!("{}*", type_name(&module.types, elem))
        }
        Operand::Inst(id) => type_name(&module.types, f.inst(id).expect("dangling instruction operand").result_type),
    }
}

fn operand_value(module: &Module, operand: Operand) -> String {
    match operand {
        Operand::Const(ConstValue::Int(n)) => n.to_string(),
        Operand::Const(ConstValue::Float(fv)) => format_float(fv),
        Operand::Const(ConstValue::Zero(_)) => "zeroinitializer".to_string(),
        Operand::Arg(i) => format!("%arg{i}"),
        Operand::Global(g) => format!("@{}", module.global(g).expect("dangling global operand").name),
        Operand::Inst(id) => format!("%t{}", id.0),
    }
}

fn icmp_pred(pred: CmpPred) -> &'static str {
    match pred {
        CmpPred::Eq => "eq",
        CmpPred::Ne => "ne",
        CmpPred::Ge => "sge",
        CmpPred::Gt => "sgt",
        CmpPred::Le => "sle",
        CmpPred::Lt => "slt",
    }
}

fn fcmp_pred(pred: CmpPred) -> &'static str {
    match pred {
        CmpPred::Eq => "oeq",
        CmpPred::Ne => "one",
        CmpPred::Ge => "oge",
        CmpPred::Gt => "ogt",
        CmpPred::Le => "ole",
        CmpPred::Lt => "olt",
    }
}

fn emit_inst(module: &Module, f: &Function, id: cmf_core::InstId, kind: &InstKind) -> String {
    let result_type = f.inst(id).expect("instruction exists").result_type;
    let dest = format!("%t{}", id.0);

    match kind {
        InstKind::IAdd(a, b) => format!("{dest} = add nsw i32 {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::ISub(a, b) => format!("{dest} = sub nsw i32 {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::IMul(a, b) => format!("{dest} = mul nsw i32 {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::ISDiv(a, b) => format!("{dest} = sdiv i32 {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::FAdd(a, b) => format!("{dest} = fadd float {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::FSub(a, b) => format!("{dest} = fsub float {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::FMul(a, b) => format!("{dest} = fmul float {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::FDiv(a, b) => format!("{dest} = fdiv float {}, {}", operand_value(module, *a), operand_value(module, *b)),
        InstKind::ICmp(pred, a, b) => format!("{dest} = icmp {} i32 {}, {}", icmp_pred(*pred), operand_value(module, *a), operand_value(module, *b)),
        InstKind::FCmp(pred, a, b) => format!("{dest} = fcmp {} float {}, {}", fcmp_pred(*pred), operand_value(module, *a), operand_value(module, *b)),
        InstKind::ZExt(v) => format!("{dest} = zext i1 {} to i32", operand_value(module, *v)),
        InstKind::SIToFP(v) => format!("{dest} = sitofp i32 {} to float", operand_value(module, *v)),
        InstKind::FPToSI(v) => format!("{dest} = fptosi float {} to i32", operand_value(module, *v)),
        InstKind::Alloca { element_type } => format!("{dest} = alloca {}", type_name(&module.types, *element_type)),
        InstKind::Load(ptr) => format!("{dest} = load {}, {}", type_name(&module.types, result_type), typed_operand(module, f, *ptr)),
        InstKind::Store { value, ptr } => format!("store {}, {}", typed_operand(module, f, *value), typed_operand(module, f, *ptr)),
        InstKind::GetElementPtr { base, indices } => {
            let pointee = match *base {
                Operand::Global(g) => module.global(g).expect("dangling global operand").element_type,
                other => module.types.pointee(operand_scalar_type(module, f, other)).expect("GEP base is a pointer"),
            };
            let idx_list = indices.iter().map(|i| typed_operand(module, f, *i)).collect::<Vec<_>>().join(", ");
            format!("{dest} = getelementptr {}, {}, {idx_list}", type_name(&module.types, pointee), typed_operand(module, f, *base))
        }
        InstKind::Call { callee, args } => {
            let callee_fn = module.function(*callee).expect("dangling call target");
            let arg_list = args.iter().map(|a| typed_operand(module, f, *a)).collect::<Vec<_>>().join(", ");
            if callee_fn.return_type == TypeId::VOID {
                format!("call void @{}({arg_list})", callee_fn.name)
            } else {
                format!("{dest} = call {} @{}({arg_list})", type_name(&module.types, callee_fn.return_type), callee_fn.name)
            }
        }
        InstKind::Br(target) => format!("br label %bb{}", target.0),
        InstKind::CondBr { cond, true_target, false_target } => {
            format!("br {}, label %bb{}, label %bb{}", typed_operand(module, f, *cond), true_target.0, false_target.0)
        }
        InstKind::Ret(None) => "ret void".to_string(),
        InstKind::Ret(Some(v)) => format!("ret {}", typed_operand(module, f, *v)),
    }
}

/// The type id a non-global operand evaluates to -- used only by the
/// `GetElementPtr` arm above, which handles a `Global` base separately
/// (a global's pointee is read straight off its declaration, since a
/// global operand has no interned pointer `TypeId` of its own).
fn operand_scalar_type(module: &Module, f: &Function, operand: Operand) -> TypeId {
    match operand {
        Operand::Const(ConstValue::Int(_)) => TypeId::INT32,
        Operand::Const(ConstValue::Float(_)) => TypeId::FLOAT,
        Operand::Const(ConstValue::Zero(t)) => t,
        Operand::Arg(i) => f.param_types[i as usize],
        Operand::Global(_) => unreachable!("callers resolve a Global base's pointee directly, without calling this function"),
        Operand::Inst(id) => f.inst(id).expect("dangling instruction operand").result_type,
    }
}
