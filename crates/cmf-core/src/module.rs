//! The module: the IR's root. Owns the type table, every global
//! variable, and every function; destroying it destroys everything
//! transitively.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::function::Function;
use crate::global::GlobalVariable;
use crate::id::{FunctionId, GlobalId, InstId};
use crate::ops::ConstValue;
use crate::type_id::{TypeId, TypeRegistry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub types: TypeRegistry,
    functions: Vec<Option<Function>>,
    function_order: Vec<FunctionId>,
    function_names: HashMap<String, FunctionId>,
    globals: Vec<Option<GlobalVariable>>,
    global_order: Vec<GlobalId>,
    global_names: HashMap<String, GlobalId>,
    next_function: u32,
    next_global: u32,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            types: TypeRegistry::new(),
            functions: Vec::new(),
            function_order: Vec::new(),
            function_names: HashMap::new(),
            globals: Vec::new(),
            global_order: Vec::new(),
            global_names: HashMap::new(),
            next_function: 0,
            next_global: 0,
        }
    }

    // -- Globals --

    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        element_type: TypeId,
        init: ConstValue,
        mutable: bool,
    ) -> Result<GlobalId, CoreError> {
        let name = name.into();
        if self.global_names.contains_key(&name) {
            return Err(CoreError::DuplicateGlobalName { name });
        }
        let id = GlobalId(self.next_global);
        self.next_global += 1;
        self.global_names.insert(name.clone(), id);
        self.global_order.push(id);
        let idx = id.0 as usize;
        if idx == self.globals.len() {
            self.globals.push(Some(GlobalVariable::new(id, name, element_type, init, mutable)));
        } else {
            self.globals[idx] = Some(GlobalVariable::new(id, name, element_type, init, mutable));
        }
        Ok(id)
    }

    pub fn global(&self, id: GlobalId) -> Option<&GlobalVariable> {
        self.globals.get(id.0 as usize).and_then(|g| g.as_ref())
    }

    pub fn global_mut(&mut self, id: GlobalId) -> Option<&mut GlobalVariable> {
        self.globals.get_mut(id.0 as usize).and_then(|g| g.as_mut())
    }

    pub fn find_global(&self, name: &str) -> Option<GlobalId> {
        self.global_names.get(name).copied()
    }

    pub fn global_order(&self) -> &[GlobalId] {
        &self.global_order
    }

    /// Registers a use of a global from inside some function's
    /// instruction. Called by the builder whenever an operand is
    /// `Operand::Global`, which the function-local bookkeeping in
    /// [`crate::function::Function`] deliberately ignores.
    pub fn add_global_use(&mut self, global: GlobalId, function: FunctionId, inst: InstId, slot: u32) {
        if let Some(g) = self.global_mut(global) {
            g.uses.push((function, inst, slot));
        }
    }

    pub fn remove_global_use(&mut self, global: GlobalId, function: FunctionId, inst: InstId, slot: u32) {
        if let Some(g) = self.global_mut(global) {
            g.uses.retain(|&(f, i, s)| !(f == function && i == inst && s == slot));
        }
    }

    /// Removes a global that no longer has any uses. Callers (the
    /// global-sweep step of dead-code elimination) are responsible for
    /// checking `uses.is_empty()` first.
    pub fn remove_global(&mut self, id: GlobalId) -> Result<(), CoreError> {
        let g = self.globals.get(id.0 as usize).and_then(|g| g.as_ref()).ok_or(CoreError::GlobalNotFound { id })?;
        self.global_names.remove(&g.name);
        self.global_order.retain(|&gid| gid != id);
        self.globals[id.0 as usize] = None;
        Ok(())
    }

    // -- Functions --

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        param_types: Vec<TypeId>,
        return_type: TypeId,
    ) -> Result<FunctionId, CoreError> {
        let name = name.into();
        if self.function_names.contains_key(&name) {
            return Err(CoreError::DuplicateFunctionName { name });
        }
        let id = FunctionId(self.next_function);
        self.next_function += 1;
        let ty = self.types.function(return_type, param_types.clone());
        self.function_names.insert(name.clone(), id);
        self.function_order.push(id);
        let idx = id.0 as usize;
        let func = Function::new(id, name, ty, param_types, return_type);
        if idx == self.functions.len() {
            self.functions.push(Some(func));
        } else {
            self.functions[idx] = Some(func);
        }
        Ok(id)
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.0 as usize).and_then(|f| f.as_ref())
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Option<&mut Function> {
        self.functions.get_mut(id.0 as usize).and_then(|f| f.as_mut())
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied()
    }

    pub fn function_order(&self) -> &[FunctionId] {
        &self.function_order
    }

    /// Removes a function that is unreferenced and not `main`. Callers
    /// (global sweep) check that precondition first.
    pub fn remove_function(&mut self, id: FunctionId) -> Result<(), CoreError> {
        let f = self.functions.get(id.0 as usize).and_then(|f| f.as_ref()).ok_or(CoreError::FunctionNotFound { id })?;
        self.function_names.remove(&f.name);
        self.function_order.retain(|&fid| fid != id);
        self.functions[id.0 as usize] = None;
        Ok(())
    }
}
