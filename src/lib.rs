// Sat Oct 17 2026 - Alex

pub mod config;
pub mod layout;
pub mod registry;
pub mod script;
pub mod utils;

pub use config::{Abi, TargetConfig};
pub use layout::{LayoutError, LayoutFinalizer, LayoutValidator, SerializableLayout, StructLayout};
pub use registry::{TypeIndex, TypeKind, TypeRegistry};
pub use script::{Script, ScriptError, ScriptReport};
