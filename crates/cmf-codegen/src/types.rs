//! Mapping from interned [`TypeId`]s to the LLVM assembly dialect's
//! textual type syntax.
//!
//! Pointers print as typed pointers (`i32*`, not an opaque `ptr`) and
//! arrays print as `[N x T]`, matching the dialect the Core
//! Specification names in its External Interfaces section.

use cmf_core::{Type, TypeId, TypeRegistry};

pub fn type_name(registry: &TypeRegistry, id: TypeId) -> String {
    match registry.get(id) {
        Type::Void => "void".to_string(),
        Type::Int1 => "i1".to_string(),
        Type::Int32 => "i32".to_string(),
        Type::Float => "float".to_string(),
        Type::Pointer { element } => format!("{}*", type_name(registry, *element)),
        Type::Array { element, length } => format!("[{length} x {}]", type_name(registry, *element)),
        Type::Function { return_type, params } => {
            let params = params.iter().map(|p| type_name(registry, *p)).collect::<Vec<_>>().join(", ");
            format!("{} ({params})", type_name(registry, *return_type))
        }
    }
}
