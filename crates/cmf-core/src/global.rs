//! Module-level global variables.

use serde::{Deserialize, Serialize};

use crate::id::{FunctionId, GlobalId, InstId};
use crate::ops::ConstValue;
use crate::type_id::TypeId;

/// A global variable. Its IR value type, as seen by users, is always
/// `Pointer(element_type)` -- referencing a global always yields its
/// address, never its stored value, mirroring how a local's `Alloca`
/// result is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub id: GlobalId,
    pub name: String,
    pub element_type: TypeId,
    pub init: ConstValue,
    pub mutable: bool,
    /// Use-list entries from every function, since a global can be
    /// referenced across function boundaries.
    pub uses: Vec<(FunctionId, InstId, u32)>,
}

impl GlobalVariable {
    pub fn new(id: GlobalId, name: String, element_type: TypeId, init: ConstValue, mutable: bool) -> Self {
        GlobalVariable { id, name, element_type, init, mutable, uses: Vec::new() }
    }
}
