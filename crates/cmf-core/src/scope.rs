//! Lexically nested name bindings used while lowering a syntax tree.

use std::collections::HashMap;

use crate::ops::Operand;

/// A binding a name can resolve to: the address of a global, the
/// address of a local (an `Alloca` result), or a function to call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding {
    Global(crate::id::GlobalId),
    Local(Operand),
    Function(crate::id::FunctionId),
}

/// A stack of scopes, searched top-down on lookup.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, Binding>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { scopes: Vec::new() }
    }

    pub fn enter(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        self.scopes.pop().expect("exit called with no open scope");
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Installs `name -> binding` in the innermost open scope, shadowing
    /// any outer binding of the same name.
    pub fn push(&mut self, name: impl Into<String>, binding: Binding) {
        self.scopes
            .last_mut()
            .expect("push called with no open scope")
            .insert(name.into(), binding);
    }

    /// Searches from the innermost scope outward.
    pub fn find(&self, name: &str) -> Option<Binding> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }
}
