// Fri Oct 16 2026 - Alex

use thiserror::Error;

/// Semantic errors a layout can fail with. Pipeline defects (bad type
/// indices, unfinalized bases, double finalization) are panics instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("'{class}::{function}' overrides '{base}::{function}', which is declared final")]
    FinalOverride {
        class: String,
        function: String,
        base: String,
    },
    #[error("'{class}' cannot derive from '{base}', which is declared final")]
    FinalBase { class: String, base: String },
    #[error("'{base}' is specified more than once as a direct base of '{class}'")]
    AmbiguousBase { class: String, base: String },
    #[error("'{class}::{function}' is marked override but does not override any base class member")]
    OverrideWithoutBase { class: String, function: String },
    #[error("union '{class}' cannot have base classes")]
    UnionWithBase { class: String },
    #[error("union '{class}' cannot have virtual function '{function}'")]
    VirtualInUnion { class: String, function: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FinalOverride,
    FinalBase,
    AmbiguousBase,
    OverrideWithoutBase,
    UnionWithBase,
    VirtualInUnion,
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FinalOverride { .. } => ErrorKind::FinalOverride,
            Self::FinalBase { .. } => ErrorKind::FinalBase,
            Self::AmbiguousBase { .. } => ErrorKind::AmbiguousBase,
            Self::OverrideWithoutBase { .. } => ErrorKind::OverrideWithoutBase,
            Self::UnionWithBase { .. } => ErrorKind::UnionWithBase,
            Self::VirtualInUnion { .. } => ErrorKind::VirtualInUnion,
        }
    }

    /// The class whose finalization failed.
    pub fn class(&self) -> &str {
        match self {
            Self::FinalOverride { class, .. }
            | Self::FinalBase { class, .. }
            | Self::AmbiguousBase { class, .. }
            | Self::OverrideWithoutBase { class, .. }
            | Self::UnionWithBase { class }
            | Self::VirtualInUnion { class, .. } => class,
        }
    }
}
