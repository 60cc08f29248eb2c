// Fri Oct 16 2026 - Alex

use crate::layout::{StructKind, StructLayout};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle into the [`TypeRegistry`](super::TypeRegistry) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeIndex(u32);

impl TypeIndex {
    pub fn new(value: usize) -> Self {
        Self(u32::try_from(value).expect("type registry exhausted"))
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Builtin,
    Enum,
    Struct,
    Class,
    Union,
}

impl TypeKind {
    pub fn is_record(self) -> bool {
        matches!(self, Self::Struct | Self::Class | Self::Union)
    }

    pub fn struct_kind(self) -> Option<StructKind> {
        match self {
            Self::Struct => Some(StructKind::Struct),
            Self::Class => Some(StructKind::Class),
            Self::Union => Some(StructKind::Union),
            Self::Builtin | Self::Enum => None,
        }
    }
}

/// Identity of one declared type. Records are never removed, so a
/// `TypeIndex` handed out once stays valid for the registry's lifetime.
#[derive(Debug, Clone)]
pub struct TypeRecord {
    pub name: String,
    pub kind: TypeKind,
    pub index: TypeIndex,
    pub size_in_bits: u64,
    pub alignment: usize,
    pub(crate) layout: Option<StructLayout>,
}

impl TypeRecord {
    pub fn size(&self) -> usize {
        (self.size_in_bits / 8) as usize
    }

    pub fn layout(&self) -> Option<&StructLayout> {
        self.layout.as_ref()
    }

    /// Whether the size of this type is known, i.e. it is a builtin or a
    /// record whose layout has been successfully finalized.
    pub fn is_complete(&self) -> bool {
        match &self.layout {
            Some(layout) => layout.is_finalized(),
            None => !self.kind.is_record(),
        }
    }
}

impl fmt::Display for TypeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {} [size: {}, align: {}]", self.kind, self.name, self.index, self.size(), self.alignment)
    }
}
