// Sat Oct 17 2026 - Alex

pub mod error;
pub mod model;
pub mod runner;

pub use error::ScriptError;
pub use model::{BaseEntry, FunctionEntry, MemberEntry, Script, StaticEntry, TypeEntry};
pub use runner::{ScriptReport, TypeOutcome};
