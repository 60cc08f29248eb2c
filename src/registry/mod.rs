// Fri Oct 16 2026 - Alex

pub mod record;
pub mod arena;

pub use record::{TypeIndex, TypeKind, TypeRecord};
pub use arena::TypeRegistry;
