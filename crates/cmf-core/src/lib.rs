//! IR model, builder, and AST-lowering for the C-minus-f front end.
//!
//! This crate has no dependency on LLVM or any other backend: it owns
//! the in-memory SSA IR (types, instructions, basic blocks, functions,
//! modules), the cursor-style builder that constructs it, and the
//! lowering pass that turns a parsed syntax tree into it. Type
//! checking / effect analysis lives in `cmf-check`; optimization
//! passes live in `cmf-passes`; textual emission lives in `cmf-codegen`.

pub mod ast;
pub mod block;
pub mod builder;
pub mod error;
pub mod function;
pub mod global;
pub mod id;
pub mod inst;
pub mod lower;
pub mod module;
pub mod ops;
pub mod scope;
pub mod type_id;

pub use block::BasicBlock;
pub use builder::IrBuilder;
pub use error::CoreError;
pub use function::Function;
pub use global::GlobalVariable;
pub use id::{BlockId, FunctionId, GlobalId, InstId};
pub use inst::Instruction;
pub use lower::{lower_program, LowerError};
pub use module::Module;
pub use ops::{CmpPred, ConstValue, InstKind, Operand};
pub use scope::{Binding, ScopeStack};
pub use type_id::{Type, TypeId, TypeRegistry};
