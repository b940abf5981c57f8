//! Opaque handle types used throughout the IR.
//!
//! `BlockId` and `InstId` are scoped to the function that owns them;
//! `FunctionId` and `GlobalId` are scoped to the module. None of these
//! carry a lifetime -- they are plain indices into the owning entity's
//! storage, stable across removal (a removed slot is tombstoned, not
//! reused).

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(FunctionId, "Identity of a function within a module.");
id_type!(GlobalId, "Identity of a global variable within a module.");
id_type!(BlockId, "Identity of a basic block within a function.");
id_type!(InstId, "Identity of an instruction within a function.");
