//! Interned value types.
//!
//! [`Type`] enumerates the value types C-minus-f's IR can carry.
//! [`TypeId`] is the interned handle to one; comparing two `TypeId`s is
//! always comparing identity, never structure -- the whole point of the
//! registry is to make that comparison cheap and correct.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value type in the IR.
///
/// `Pointer`, `Array`, and `Function` are structural: two occurrences
/// with the same shape intern to the same [`TypeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int1,
    Int32,
    Float,
    Pointer { element: TypeId },
    Array { element: TypeId, length: u32 },
    Function { return_type: TypeId, params: Vec<TypeId> },
}

/// Interned handle to a [`Type`]. Equality is identity, not structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const INT1: TypeId = TypeId(1);
    pub const INT32: TypeId = TypeId(2);
    pub const FLOAT: TypeId = TypeId(3);
}

const BUILTIN_COUNT: u32 = 4;

/// Canonicalization table mapping [`Type`] shapes to stable [`TypeId`]s.
///
/// The four scalar builtins are pre-registered at construction so
/// `TypeId::VOID`, `TypeId::INT1`, `TypeId::INT32`, and `TypeId::FLOAT`
/// are always valid without a lookup.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<Type>,
    index: HashMap<Type, TypeId>,
}

// `index` maps `Type` (a structured enum) to `TypeId`, which JSON cannot
// represent as an object key, so it's excluded from the wire format and
// rebuilt from `types` on deserialize -- the same derivation `new` does.
impl Serialize for TypeRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.types.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypeRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let types = Vec::<Type>::deserialize(deserializer)?;
        let mut index = HashMap::new();
        for (i, ty) in types.iter().enumerate() {
            index.insert(ty.clone(), TypeId(i as u32));
        }
        Ok(TypeRegistry { types, index })
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let types = vec![Type::Void, Type::Int1, Type::Int32, Type::Float];
        let mut index = HashMap::new();
        for (i, ty) in types.iter().enumerate() {
            index.insert(ty.clone(), TypeId(i as u32));
        }
        debug_assert_eq!(types.len() as u32, BUILTIN_COUNT);
        TypeRegistry { types, index }
    }

    /// Interns `ty`, returning its existing handle if an equal shape was
    /// already registered, or allocating a fresh one.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.index.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.index.insert(ty, id);
        id
    }

    /// Interns `Pointer { element }`.
    pub fn pointer(&mut self, element: TypeId) -> TypeId {
        self.intern(Type::Pointer { element })
    }

    /// Interns `Array { element, length }`.
    pub fn array(&mut self, element: TypeId, length: u32) -> TypeId {
        self.intern(Type::Array { element, length })
    }

    /// Interns `Function { return_type, params }`.
    pub fn function(&mut self, return_type: TypeId, params: Vec<TypeId>) -> TypeId {
        self.intern(Type::Function { return_type, params })
    }

    /// Looks up the shape behind a handle.
    ///
    /// Panics if `id` did not come from this registry: an unknown
    /// `TypeId` reaching a lookup is an internal invariant violation,
    /// not a recoverable condition.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        id == TypeId::INT32 || id == TypeId::FLOAT
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        id == TypeId::INT1 || id == TypeId::INT32
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        id == TypeId::FLOAT
    }

    /// Returns the pointee type if `id` is a `Pointer`, else `None`.
    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            Type::Pointer { element } => Some(*element),
            _ => None,
        }
    }

    /// Returns the element type if `id` is an `Array`, else `None`.
    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            Type::Array { element, .. } => Some(*element),
            _ => None,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
