// Sat Oct 17 2026 - Alex

use crate::layout::{AccessSpecifier, FunctionKind, StructKind};
use crate::script::ScriptError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A declaration script: types in dependency order, each described the way
/// a parser would report it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub types: Vec<TypeEntry>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: StructKind,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub alignas: Option<usize>,
    #[serde(default)]
    pub pack: Option<usize>,
    #[serde(default)]
    pub bases: Vec<BaseEntry>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub statics: Vec<StaticEntry>,
}

fn default_kind() -> StructKind {
    StructKind::Struct
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseEntry {
    pub name: String,
    /// Defaults to the access implied by the derived type's kind.
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    #[serde(default)]
    pub bits: Option<u32>,
    #[serde(default)]
    pub array: Vec<usize>,
    #[serde(default)]
    pub pointer: usize,
    #[serde(default)]
    pub reference: bool,
    #[serde(default)]
    pub init: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    /// Optional for constructors and destructors, which take the class name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_function_kind")]
    pub kind: FunctionKind,
    #[serde(default, rename = "returns")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default, rename = "pure")]
    pub is_pure: bool,
    #[serde(default, rename = "override")]
    pub is_override: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default, rename = "const")]
    pub is_const: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

fn default_function_kind() -> FunctionKind {
    FunctionKind::Method
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub access: Option<AccessSpecifier>,
    #[serde(default)]
    pub init: Option<String>,
}
