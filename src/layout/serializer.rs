// Sat Oct 17 2026 - Alex

use crate::layout::rtti::{ItaniumTypeInfo, MsvcRtti, RttiDescriptors};
use crate::layout::{AccessSpecifier, StructKind, StructLayout, VTableSlot, VirtualBase};
use crate::registry::TypeIndex;
use serde::{Deserialize, Serialize};

/// Frozen shape of one type as handed to the mangler and code generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableLayout {
    pub name: String,
    pub kind: StructKind,
    pub size: usize,
    pub alignment: usize,
    pub data_size: usize,
    pub non_virtual_size: usize,
    pub has_vptr: bool,
    pub is_abstract: bool,
    pub members: Vec<SerializableMember>,
    pub bases: Vec<SerializableBase>,
    pub virtual_bases: Vec<VirtualBase>,
    pub vtable: Vec<SerializableSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtti: Option<SerializableRtti>,
    pub padding: Vec<(usize, usize)>,
    /// Empty on success.
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableMember {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub offset: usize,
    pub size: usize,
    pub access: AccessSpecifier,
    /// `(storage_unit_offset, bit_offset, width)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitfield: Option<(usize, u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableBase {
    pub name: String,
    pub type_index: TypeIndex,
    pub access: AccessSpecifier,
    pub is_virtual: bool,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableSlot {
    pub index: usize,
    pub name: String,
    pub owner: TypeIndex,
    pub is_pure: bool,
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableRtti {
    pub itanium_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itanium_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vmi_flags: Option<u32>,
    /// `(base type, offset_flags)` per direct base of a VMI class.
    pub itanium_bases: Vec<(TypeIndex, i64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msvc: Option<SerializableMsvc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableMsvc {
    pub type_descriptor: String,
    pub locator_signature: u32,
    pub hierarchy_attributes: u32,
    pub base_class_array: Vec<SerializableBaseDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableBaseDescriptor {
    pub type_descriptor: String,
    pub num_contained_bases: u32,
    pub mdisp: i32,
    pub pdisp: i32,
    pub vdisp: i32,
    pub attributes: u32,
}

impl SerializableLayout {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&StructLayout> for SerializableLayout {
    fn from(layout: &StructLayout) -> Self {
        Self {
            name: layout.name().to_string(),
            kind: layout.kind(),
            size: layout.total_size(),
            alignment: layout.alignment(),
            data_size: layout.data_size(),
            non_virtual_size: layout.non_virtual_size(),
            has_vptr: layout.has_own_vptr(),
            is_abstract: layout.is_abstract(),
            members: layout
                .members()
                .iter()
                .map(|m| SerializableMember {
                    name: m.name().to_string(),
                    type_name: m.decl.type_name.clone(),
                    offset: m.offset,
                    size: m.size(),
                    access: m.access(),
                    bitfield: m.bitfield.map(|b| (b.unit_offset, b.bit_offset, b.width)),
                })
                .collect(),
            bases: layout
                .bases()
                .iter()
                .map(|b| SerializableBase {
                    name: b.name.clone(),
                    type_index: b.type_index,
                    access: b.access,
                    is_virtual: b.is_virtual,
                    offset: b.offset,
                })
                .collect(),
            virtual_bases: layout.virtual_bases().to_vec(),
            vtable: layout.vtable().slots.iter().enumerate().map(slot).collect(),
            rtti: layout.rtti().map(SerializableRtti::from),
            padding: if layout.is_finalized() && !layout.is_union() {
                layout.padding()
            } else {
                Vec::new()
            },
            error: layout.finalization_error_message(),
        }
    }
}

fn slot((index, slot): (usize, &VTableSlot)) -> SerializableSlot {
    SerializableSlot {
        index,
        name: slot.name.clone(),
        owner: slot.function.owner,
        is_pure: slot.is_pure,
        is_final: slot.is_final,
    }
}

impl From<&RttiDescriptors> for SerializableRtti {
    fn from(rtti: &RttiDescriptors) -> Self {
        let (vmi_flags, itanium_bases) = match &rtti.itanium {
            ItaniumTypeInfo::VmiClass(vmi) => (
                Some(vmi.flags.bits()),
                vmi.bases.iter().map(|b| (b.base_type, b.offset_flags)).collect(),
            ),
            ItaniumTypeInfo::SiClass(si) => (None, vec![(si.base_type, 0)]),
            _ => (None, Vec::new()),
        };
        Self {
            itanium_kind: rtti.itanium.kind_name().to_string(),
            itanium_symbol: rtti.itanium.class().map(|c| c.symbol()),
            vmi_flags,
            itanium_bases,
            msvc: rtti.msvc.as_ref().map(SerializableMsvc::from),
        }
    }
}

impl From<&MsvcRtti> for SerializableMsvc {
    fn from(rtti: &MsvcRtti) -> Self {
        Self {
            type_descriptor: rtti.type_descriptor.decorated_name.clone(),
            locator_signature: rtti.locator.signature,
            hierarchy_attributes: rtti.hierarchy.attributes.bits(),
            base_class_array: rtti
                .hierarchy
                .base_class_array
                .iter()
                .map(|bcd| SerializableBaseDescriptor {
                    type_descriptor: bcd.type_descriptor.decorated_name.clone(),
                    num_contained_bases: bcd.num_contained_bases,
                    mdisp: bcd.displacement.mdisp,
                    pdisp: bcd.displacement.pdisp,
                    vdisp: bcd.displacement.vdisp,
                    attributes: bcd.attributes.bits(),
                })
                .collect(),
        }
    }
}
