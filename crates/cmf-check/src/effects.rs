//! Function-purity (effect) analysis.
//!
//! A function is *pure* iff it stores to nothing observable outside
//! itself (no global, no pointer-typed argument) and every function it
//! calls, transitively, is also pure. The four runtime functions are
//! impure by declaration, and since they are the only functions the
//! front end ever emits as bodiless declarations, "is a declaration"
//! doubles as that fixed classification here.
//!
//! Recursion is handled by least-fixed-point iteration: every
//! non-declaration function starts out assumed pure, and a function
//! is downgraded to impure whenever a direct effect or an impure
//! callee is found, repeating until a full pass makes no change.

use std::collections::{HashMap, HashSet};

use cmf_core::{Function, FunctionId, InstId, InstKind, Module, Operand};

pub fn analyze_purity(module: &Module) -> HashMap<FunctionId, bool> {
    let mut purity: HashMap<FunctionId, bool> = module
        .function_order()
        .iter()
        .map(|&fid| (fid, !module.function(fid).expect("function_order entry exists").is_declaration()))
        .collect();

    let direct_effects: HashMap<FunctionId, bool> = module
        .function_order()
        .iter()
        .map(|&fid| (fid, has_direct_effect(module, module.function(fid).expect("function_order entry exists"))))
        .collect();

    loop {
        let mut changed = false;
        for &fid in module.function_order() {
            let f = module.function(fid).expect("function_order entry exists");
            if f.is_declaration() {
                continue; // fixed impure, never revisited
            }
            let pure = !direct_effects[&fid] && callees_of(f).all(|callee| *purity.get(&callee).unwrap_or(&false));
            if purity[&fid] != pure {
                purity.insert(fid, pure);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    purity
}

fn callees_of(f: &Function) -> impl Iterator<Item = FunctionId> + '_ {
    f.all_insts().filter_map(|i| match &i.kind {
        InstKind::Call { callee, .. } => Some(*callee),
        _ => None,
    })
}

/// A `Store` is a direct effect iff its target is a global or a
/// pointer-typed argument -- memory observable to the function's
/// caller. A store to a local `Alloca` is not, by itself; the Core
/// Specification leaves that store's liveness to DCE's load-induced
/// marking, not to this analysis.
///
/// Every parameter, scalar or array, is copied into its own `Alloca`
/// at function entry (Core Specification §4.B "Function declaration"
/// step 5), so a write that is semantically "through a pointer
/// parameter" never appears as a literal `Store { ptr: Arg(_), .. }`
/// -- it appears as a store through the pointer value that was
/// `Load`ed back out of that parameter's alloca, possibly offset by a
/// `GetElementPtr`. [`pointer_param_allocas`] identifies which allocas
/// hold an incoming pointer-typed argument; [`traces_to_pointer_param`]
/// follows a store's address back through any `GetElementPtr`/`Load`
/// chain to see whether it lands on one of them.
fn has_direct_effect(module: &Module, f: &Function) -> bool {
    let param_allocas = pointer_param_allocas(module, f);
    f.all_insts().any(|i| match &i.kind {
        InstKind::Store { ptr, .. } => traces_to_pointer_param(f, *ptr, &param_allocas),
        _ => false,
    })
}

/// Identifies which of `f`'s allocas hold an incoming pointer-typed
/// argument, and whether a given address (an instruction operand)
/// traces back to one of them through any `GetElementPtr`/`Load`
/// chain. Exposed for `cmf-passes`'s dead-code elimination, whose
/// mark-phase criticality rule for `Store` needs the same provenance
/// reasoning this module uses for direct effects: a store through an
/// array parameter's address is never literally `Store { ptr: Arg(_),
/// .. } }` once parameters are copied into allocas at function entry.
pub fn pointer_param_allocas(module: &Module, f: &Function) -> HashSet<InstId> {
    let mut allocas = HashSet::new();
    for i in f.all_insts() {
        if let InstKind::Store { value: Operand::Arg(idx), ptr: Operand::Inst(alloca_id) } = &i.kind {
            if module.types.pointee(f.param_types[*idx as usize]).is_some() {
                allocas.insert(*alloca_id);
            }
        }
    }
    allocas
}

/// Despite the name, an address that bottoms out at a bare global (e.g.
/// a `GetElementPtr` into a global array) also counts here -- a global
/// is observable outside the function by construction, same as a
/// pointer parameter, so both sides of a `GetElementPtr`/`Load` chain's
/// base case are critical for the same externally-observable-memory
/// reason.
pub fn traces_to_pointer_param(f: &Function, ptr: Operand, param_allocas: &HashSet<InstId>) -> bool {
    let id = match ptr {
        Operand::Global(_) => return true,
        Operand::Inst(id) => id,
        _ => return false,
    };
    match &f.inst(id).expect("operand refers to a live instruction in the same function").kind {
        InstKind::GetElementPtr { base, .. } => traces_to_pointer_param(f, *base, param_allocas),
        InstKind::Load(Operand::Inst(alloca_id)) => param_allocas.contains(alloca_id),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmf_core::ast;
    use cmf_core::lower_program;

    fn prog(declarations: Vec<ast::Declaration>) -> ast::Program {
        ast::Program { declarations }
    }

    fn func(name: &str, return_type: ast::ReturnType, params: Vec<ast::Param>, statements: Vec<ast::Stmt>) -> ast::Declaration {
        ast::Declaration::Function(ast::FunctionDecl {
            return_type,
            name: name.to_string(),
            params,
            body: Some(ast::CompoundStmt { locals: vec![], statements }),
        })
    }

    #[test]
    fn runtime_functions_are_impure() {
        let module = lower_program(&prog(vec![func("main", ast::ReturnType::Int, vec![], vec![ast::Stmt::Return(Some(ast::Expr::IntLit(0)))])])).unwrap();
        let purity = analyze_purity(&module);
        for name in ["input", "output", "outputFloat", "neg_idx_except"] {
            let id = module.find_function(name).unwrap();
            assert_eq!(purity[&id], false, "{name} should be impure");
        }
    }

    #[test]
    fn arithmetic_only_function_is_pure() {
        let module = lower_program(&prog(vec![func(
            "add1",
            ast::ReturnType::Int,
            vec![ast::Param { ty: ast::ScalarType::Int, name: "x".to_string(), is_array: false }],
            vec![ast::Stmt::Return(Some(ast::Expr::Binary {
                op: ast::BinOp::Add,
                lhs: Box::new(ast::Expr::Var { name: "x".to_string(), index: None }),
                rhs: Box::new(ast::Expr::IntLit(1)),
            }))],
        )]))
        .unwrap();
        let purity = analyze_purity(&module);
        let id = module.find_function("add1").unwrap();
        assert!(purity[&id]);
    }

    #[test]
    fn store_to_global_makes_a_function_impure() {
        let module = lower_program(&prog(vec![
            ast::Declaration::Var(ast::VarDecl { ty: ast::ScalarType::Int, name: "x".to_string(), array_len: None }),
            func(
                "setx",
                ast::ReturnType::Void,
                vec![],
                vec![ast::Stmt::Expr(ast::Expr::Assign {
                    target: Box::new(ast::Expr::Var { name: "x".to_string(), index: None }),
                    value: Box::new(ast::Expr::IntLit(1)),
                })],
            ),
        ]))
        .unwrap();
        let purity = analyze_purity(&module);
        let id = module.find_function("setx").unwrap();
        assert!(!purity[&id]);
    }

    #[test]
    fn store_to_local_alloca_stays_pure() {
        let module = lower_program(&prog(vec![func(
            "f",
            ast::ReturnType::Int,
            vec![],
            vec![ast::Stmt::Return(Some(ast::Expr::IntLit(0)))],
        )]))
        .unwrap();
        let purity = analyze_purity(&module);
        assert!(purity[&module.find_function("f").unwrap()]);
    }

    #[test]
    fn calling_an_impure_function_is_contagious() {
        let module = lower_program(&prog(vec![func(
            "greet",
            ast::ReturnType::Void,
            vec![],
            vec![ast::Stmt::Expr(ast::Expr::Call { callee: "output".to_string(), args: vec![ast::Expr::IntLit(1)] })],
        )]))
        .unwrap();
        let purity = analyze_purity(&module);
        assert!(!purity[&module.find_function("greet").unwrap()]);
    }

    #[test]
    fn mutual_recursion_converges_to_pure() {
        let module = lower_program(&prog(vec![
            ast::Declaration::Function(ast::FunctionDecl {
                return_type: ast::ReturnType::Int,
                name: "even".to_string(),
                params: vec![ast::Param { ty: ast::ScalarType::Int, name: "n".to_string(), is_array: false }],
                body: Some(ast::CompoundStmt {
                    locals: vec![],
                    statements: vec![ast::Stmt::Return(Some(ast::Expr::Call {
                        callee: "odd".to_string(),
                        args: vec![ast::Expr::Var { name: "n".to_string(), index: None }],
                    }))],
                }),
            }),
            ast::Declaration::Function(ast::FunctionDecl {
                return_type: ast::ReturnType::Int,
                name: "odd".to_string(),
                params: vec![ast::Param { ty: ast::ScalarType::Int, name: "n".to_string(), is_array: false }],
                body: Some(ast::CompoundStmt {
                    locals: vec![],
                    statements: vec![ast::Stmt::Return(Some(ast::Expr::Call {
                        callee: "even".to_string(),
                        args: vec![ast::Expr::Var { name: "n".to_string(), index: None }],
                    }))],
                }),
            }),
        ]))
        .unwrap();
        let purity = analyze_purity(&module);
        assert!(purity[&module.find_function("even").unwrap()]);
        assert!(purity[&module.find_function("odd").unwrap()]);
    }

    #[test]
    fn store_to_global_array_element_makes_a_function_impure() {
        let module = lower_program(&prog(vec![
            ast::Declaration::Var(ast::VarDecl { ty: ast::ScalarType::Int, name: "a".to_string(), array_len: Some(10) }),
            func(
                "setelem",
                ast::ReturnType::Void,
                vec![],
                vec![ast::Stmt::Expr(ast::Expr::Assign {
                    target: Box::new(ast::Expr::Var { name: "a".to_string(), index: Some(Box::new(ast::Expr::IntLit(2))) }),
                    value: Box::new(ast::Expr::IntLit(3)),
                })],
            ),
        ]))
        .unwrap();
        let purity = analyze_purity(&module);
        assert!(!purity[&module.find_function("setelem").unwrap()]);
    }

    #[test]
    fn array_parameter_store_makes_a_function_impure() {
        let module = lower_program(&prog(vec![func(
            "zero_first",
            ast::ReturnType::Void,
            vec![ast::Param { ty: ast::ScalarType::Int, name: "a".to_string(), is_array: true }],
            vec![ast::Stmt::Expr(ast::Expr::Assign {
                target: Box::new(ast::Expr::Var { name: "a".to_string(), index: Some(Box::new(ast::Expr::IntLit(0))) }),
                value: Box::new(ast::Expr::IntLit(0)),
            })],
        )]))
        .unwrap();
        let purity = analyze_purity(&module);
        assert!(!purity[&module.find_function("zero_first").unwrap()]);
    }
}
