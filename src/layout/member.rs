// Fri Oct 16 2026 - Alex

use crate::registry::TypeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// C++ access specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

impl AccessSpecifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }

    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl fmt::Display for AccessSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data member as handed over by the parser: everything is already
/// resolved to numbers, only the placement is left to compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub name: String,
    pub type_name: String,
    pub type_index: TypeIndex,
    pub size: usize,
    pub alignment: usize,
    pub access: AccessSpecifier,
    pub default_init: Option<String>,
    pub is_reference: bool,
    pub is_array: bool,
    pub array_dims: Vec<usize>,
    pub pointer_depth: usize,
    pub bitfield_width: Option<u32>,
}

impl MemberDecl {
    pub fn new(name: &str, type_name: &str, type_index: TypeIndex, size: usize, alignment: usize) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_index,
            size,
            alignment,
            access: AccessSpecifier::Public,
            default_init: None,
            is_reference: false,
            is_array: false,
            array_dims: Vec::new(),
            pointer_depth: 0,
            bitfield_width: None,
        }
    }

    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_default_init(mut self, init: &str) -> Self {
        self.default_init = Some(init.to_string());
        self
    }

    pub fn with_reference(mut self) -> Self {
        self.is_reference = true;
        self
    }

    /// `size` stays the caller's responsibility: it must already be the
    /// size of the whole array.
    pub fn with_array(mut self, dims: Vec<usize>) -> Self {
        self.is_array = !dims.is_empty();
        self.array_dims = dims;
        self
    }

    pub fn with_pointer_depth(mut self, depth: usize) -> Self {
        self.pointer_depth = depth;
        self
    }

    pub fn with_bitfield(mut self, width: u32) -> Self {
        self.bitfield_width = Some(width);
        self
    }

    pub fn is_bitfield(&self) -> bool {
        self.bitfield_width.is_some()
    }
}

/// Where a bitfield ended up: the storage unit it shares and its bit range
/// within that unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitfieldPlacement {
    pub unit_offset: usize,
    pub unit_size: usize,
    pub bit_offset: u32,
    pub width: u32,
}

impl BitfieldPlacement {
    pub fn is_barrier(&self) -> bool {
        self.width == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMember {
    pub decl: MemberDecl,
    pub offset: usize,
    pub bitfield: Option<BitfieldPlacement>,
}

impl DataMember {
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn size(&self) -> usize {
        self.decl.size
    }

    pub fn access(&self) -> AccessSpecifier {
        self.decl.access
    }

    pub fn is_bitfield(&self) -> bool {
        self.bitfield.is_some()
    }

    pub fn end_offset(&self) -> usize {
        match &self.bitfield {
            Some(bits) => bits.unit_offset + bits.unit_size,
            None => self.offset + self.decl.size,
        }
    }
}

impl fmt::Display for DataMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stars = "*".repeat(self.decl.pointer_depth);
        let reference = if self.decl.is_reference { "&" } else { "" };
        write!(f, "{} {}{}{} {}", self.decl.access, self.decl.type_name, stars, reference, self.decl.name)?;
        for dim in &self.decl.array_dims {
            write!(f, "[{}]", dim)?;
        }
        write!(f, " @ 0x{:X}", self.offset)?;
        if let Some(ref bits) = self.bitfield {
            write!(f, " : {} bits at {}", bits.width, bits.bit_offset)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMember {
    pub name: String,
    pub type_name: String,
    pub type_index: TypeIndex,
    pub size: usize,
    pub alignment: usize,
    pub access: AccessSpecifier,
    pub initializer: Option<String>,
}

impl StaticMember {
    pub fn new(name: &str, type_name: &str, type_index: TypeIndex, size: usize, alignment: usize) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_index,
            size,
            alignment,
            access: AccessSpecifier::Public,
            initializer: None,
        }
    }

    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_initializer(mut self, init: &str) -> Self {
        self.initializer = Some(init.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Method,
    Constructor,
    Destructor,
    Operator,
}

/// A member function declaration. Only the signature matters to layout:
/// it decides overriding and vtable slot placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFunction {
    pub name: String,
    pub kind: FunctionKind,
    pub return_type: String,
    pub parameters: Vec<String>,
    pub access: AccessSpecifier,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_const: bool,
    pub is_static: bool,
}

impl MemberFunction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FunctionKind::Method,
            return_type: "void".to_string(),
            parameters: Vec::new(),
            access: AccessSpecifier::Public,
            is_virtual: false,
            is_pure: false,
            is_override: false,
            is_final: false,
            is_const: false,
            is_static: false,
        }
    }

    pub fn constructor(class: &str) -> Self {
        Self {
            kind: FunctionKind::Constructor,
            return_type: String::new(),
            ..Self::new(class)
        }
    }

    pub fn destructor(class: &str) -> Self {
        Self {
            kind: FunctionKind::Destructor,
            return_type: String::new(),
            ..Self::new(&format!("~{}", class))
        }
    }

    /// `symbol` is the bare operator token, e.g. `"=="` or `"()"`.
    pub fn operator(symbol: &str) -> Self {
        Self {
            kind: FunctionKind::Operator,
            ..Self::new(&format!("operator{}", symbol))
        }
    }

    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_signature(mut self, return_type: &str, params: Vec<&str>) -> Self {
        self.return_type = return_type.to_string();
        self.parameters = params.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_access(mut self, access: AccessSpecifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Pure implies virtual.
    pub fn with_pure(mut self) -> Self {
        self.is_virtual = true;
        self.is_pure = true;
        self
    }

    pub fn with_override(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn with_final(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Key under which overriding is decided: name, parameter types and
    /// cv-qualification. All destructors share one key.
    pub fn signature_key(&self) -> String {
        if self.kind == FunctionKind::Destructor {
            return "~".to_string();
        }
        let cv = if self.is_const { " const" } else { "" };
        format!("{}({}){}", self.name, self.parameters.join(","), cv)
    }

    /// Constructors and static functions never take part in dispatch.
    pub fn can_be_virtual(&self) -> bool {
        self.kind != FunctionKind::Constructor && !self.is_static
    }
}

impl fmt::Display for MemberFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_virtual {
            write!(f, "virtual ")?;
        }
        if !self.return_type.is_empty() {
            write!(f, "{} ", self.return_type)?;
        }
        write!(f, "{}({})", self.name, self.parameters.join(", "))?;
        if self.is_const {
            write!(f, " const")?;
        }
        if self.is_override {
            write!(f, " override")?;
        }
        if self.is_final {
            write!(f, " final")?;
        }
        if self.is_pure {
            write!(f, " = 0")?;
        }
        Ok(())
    }
}

/// Represents a base class with offset information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClassSpecifier {
    pub name: String,
    pub type_index: TypeIndex,
    pub access: AccessSpecifier,
    pub is_virtual: bool,
    /// Unknown until the base-class layout engine has run.
    pub offset: Option<usize>,
    /// Bytes the subobject occupies; zero for an empty base.
    pub size: usize,
}

impl BaseClassSpecifier {
    pub fn new(name: &str, type_index: TypeIndex, access: AccessSpecifier, is_virtual: bool) -> Self {
        Self {
            name: name.to_string(),
            type_index,
            access,
            is_virtual,
            offset: None,
            size: 0,
        }
    }
}

impl fmt::Display for BaseClassSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let virtual_kw = if self.is_virtual { "virtual " } else { "" };
        write!(f, "{}{} {}", virtual_kw, self.access, self.name)?;
        if let Some(offset) = self.offset {
            write!(f, " @ 0x{:X}", offset)?;
        }
        Ok(())
    }
}

/// One shared virtual-base subobject of a complete object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualBase {
    pub name: String,
    pub type_index: TypeIndex,
    pub offset: usize,
    pub size: usize,
}
