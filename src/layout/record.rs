// Fri Oct 16 2026 - Alex

use crate::layout::builder::MemberBuilder;
use crate::layout::{
    AccessSpecifier, Alignment, BaseClassSpecifier, DataMember, FunctionKind, LayoutError, MemberDecl,
    MemberFunction, RttiDescriptors, SecondaryVTable, StaticMember, VTable, VirtualBase,
};
use crate::registry::{TypeIndex, TypeRegistry};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructKind {
    Struct,
    Class,
    Union,
}

impl StructKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Class => "class",
            Self::Union => "union",
        }
    }

    /// Access of members and bases declared without a specifier.
    pub fn default_access(self) -> AccessSpecifier {
        match self {
            Self::Class => AccessSpecifier::Private,
            Self::Struct | Self::Union => AccessSpecifier::Public,
        }
    }
}

/// Progress of a layout through finalization. Transitions only move
/// forward; `Finalized` and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayoutState {
    Unfinalized,
    BasesPlaced,
    VTableBuilt,
    RttiBuilt,
    VptrShifted,
    Padded,
    Finalized,
    Errored,
}

/// Layout of one struct, class or union: filled by ordered append calls,
/// then frozen by [`LayoutFinalizer`](crate::layout::LayoutFinalizer).
#[derive(Debug, Clone)]
pub struct StructLayout {
    pub(crate) name: String,
    pub(crate) index: TypeIndex,
    pub(crate) kind: StructKind,
    pub(crate) members: Vec<DataMember>,
    pub(crate) static_members: Vec<StaticMember>,
    pub(crate) functions: Vec<MemberFunction>,
    pub(crate) bases: Vec<BaseClassSpecifier>,
    pub(crate) virtual_bases: Vec<VirtualBase>,
    pub(crate) vtable: VTable,
    pub(crate) secondary_vtables: Vec<SecondaryVTable>,
    pub(crate) rtti: Option<RttiDescriptors>,
    pub(crate) total_size: usize,
    pub(crate) alignment: usize,
    pub(crate) data_size: usize,
    pub(crate) non_virtual_size: usize,
    pub(crate) non_virtual_alignment: usize,
    pub(crate) custom_alignment: Option<Alignment>,
    pub(crate) pack_alignment: Option<Alignment>,
    pub(crate) builder: MemberBuilder,
    pub(crate) primary_base: Option<usize>,
    pub(crate) vptr_size: usize,
    pub(crate) has_vtable: bool,
    pub(crate) is_final: bool,
    pub(crate) is_abstract: bool,
    pub(crate) is_empty: bool,
    pub(crate) state: LayoutState,
    pub(crate) error: Option<LayoutError>,
}

impl StructLayout {
    pub fn new(name: &str, index: TypeIndex, kind: StructKind) -> Self {
        Self {
            name: name.to_string(),
            index,
            kind,
            members: Vec::new(),
            static_members: Vec::new(),
            functions: Vec::new(),
            bases: Vec::new(),
            virtual_bases: Vec::new(),
            vtable: VTable::default(),
            secondary_vtables: Vec::new(),
            rtti: None,
            total_size: 0,
            alignment: 1,
            data_size: 0,
            non_virtual_size: 0,
            non_virtual_alignment: 1,
            custom_alignment: None,
            pack_alignment: None,
            builder: MemberBuilder::new(kind == StructKind::Union, None),
            primary_base: None,
            vptr_size: 0,
            has_vtable: false,
            is_final: false,
            is_abstract: false,
            is_empty: false,
            state: LayoutState::Unfinalized,
            error: None,
        }
    }

    fn assert_mutable(&self) {
        assert!(
            self.state == LayoutState::Unfinalized,
            "layout of {} mutated after finalization",
            self.name
        );
    }

    pub fn add_base_class(&mut self, name: &str, type_index: TypeIndex, access: AccessSpecifier, is_virtual: bool) {
        self.assert_mutable();
        self.bases.push(BaseClassSpecifier::new(name, type_index, access, is_virtual));
    }

    /// Appends one data member and places it immediately. Members of a class
    /// with bases are placed again after the bases during finalization.
    pub fn add_member(&mut self, decl: MemberDecl) {
        self.assert_mutable();
        let placement = self.builder.place(&decl);
        self.members.push(DataMember {
            decl,
            offset: placement.offset,
            bitfield: placement.bitfield,
        });
        self.total_size = self.builder.size();
        self.alignment = self.builder.alignment();
    }

    pub fn add_static_member(&mut self, member: StaticMember) {
        self.assert_mutable();
        self.static_members.push(member);
    }

    pub fn add_member_function(&mut self, function: MemberFunction) {
        self.assert_mutable();
        self.functions.push(function);
    }

    pub fn add_constructor(&mut self, function: MemberFunction) {
        self.add_member_function(function.with_kind(FunctionKind::Constructor));
    }

    pub fn add_destructor(&mut self, function: MemberFunction) {
        self.add_member_function(function.with_kind(FunctionKind::Destructor));
    }

    pub fn add_operator_overload(&mut self, function: MemberFunction) {
        self.add_member_function(function.with_kind(FunctionKind::Operator));
    }

    pub fn set_final(&mut self) {
        self.assert_mutable();
        self.is_final = true;
    }

    /// `alignas(n)`.
    pub fn set_custom_alignment(&mut self, alignment: usize) {
        self.assert_mutable();
        self.custom_alignment = Some(Alignment::new(alignment));
    }

    /// `#pragma pack(n)` in effect for this record. Must be set before any
    /// member is added.
    pub fn set_pack_alignment(&mut self, pack: usize) {
        self.assert_mutable();
        self.pack_alignment = Some(Alignment::new(pack));
        self.builder.set_pack(Some(pack));
    }

    pub(crate) fn pack(&self) -> Option<usize> {
        self.pack_alignment.map(|a| a.as_usize())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> TypeIndex {
        self.index
    }

    pub fn kind(&self) -> StructKind {
        self.kind
    }

    pub fn is_union(&self) -> bool {
        self.kind == StructKind::Union
    }

    pub fn members(&self) -> &[DataMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&DataMember> {
        self.members.iter().find(|m| m.name() == name)
    }

    pub fn static_members(&self) -> &[StaticMember] {
        &self.static_members
    }

    pub fn functions(&self) -> &[MemberFunction] {
        &self.functions
    }

    pub fn bases(&self) -> &[BaseClassSpecifier] {
        &self.bases
    }

    pub fn primary_base(&self) -> Option<&BaseClassSpecifier> {
        self.primary_base.map(|i| &self.bases[i])
    }

    pub fn virtual_bases(&self) -> &[VirtualBase] {
        &self.virtual_bases
    }

    pub fn virtual_base_offset(&self, type_index: TypeIndex) -> Option<usize> {
        self.virtual_bases
            .iter()
            .find(|vb| vb.type_index == type_index)
            .map(|vb| vb.offset)
    }

    pub fn vtable(&self) -> &VTable {
        &self.vtable
    }

    pub fn secondary_vtables(&self) -> &[SecondaryVTable] {
        &self.secondary_vtables
    }

    pub fn rtti(&self) -> Option<&RttiDescriptors> {
        self.rtti.as_ref()
    }

    pub fn has_vtable(&self) -> bool {
        self.has_vtable
    }

    /// Dynamic classes carry a vptr, either their own or their primary
    /// base's.
    pub fn is_dynamic(&self) -> bool {
        self.has_vtable || !self.virtual_bases.is_empty()
    }

    /// Whether a vptr was inserted at offset 0 for this class itself.
    pub fn has_own_vptr(&self) -> bool {
        self.vptr_size > 0
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// End of the non-virtual part before tail padding.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    /// Bytes a non-virtual base subobject of this type occupies.
    pub fn non_virtual_size(&self) -> usize {
        self.non_virtual_size
    }

    pub fn non_virtual_alignment(&self) -> usize {
        self.non_virtual_alignment
    }

    pub fn custom_alignment(&self) -> Option<usize> {
        self.custom_alignment.map(|a| a.as_usize())
    }

    pub fn pack_alignment(&self) -> Option<usize> {
        self.pack()
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// No data, no vptr and only empty bases: occupies no bytes as a base.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == LayoutState::Finalized
    }

    /// True once finalization has started, successfully or not.
    pub fn is_frozen(&self) -> bool {
        self.state != LayoutState::Unfinalized
    }

    pub fn finalization_error(&self) -> Option<&LayoutError> {
        self.error.as_ref()
    }

    /// Empty on success.
    pub fn finalization_error_message(&self) -> String {
        self.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
    }

    /// Offset of the base subobject reached by walking `path` (a chain of
    /// base type indices starting at a direct base of this class). Virtual
    /// steps resolve to this complete object's single shared subobject.
    pub fn resolve_base_path(&self, registry: &TypeRegistry, path: &[TypeIndex]) -> Option<usize> {
        let mut offset = 0;
        let mut current = self;
        for ty in path {
            let specifier = current.bases.iter().find(|b| b.type_index == *ty)?;
            offset = if specifier.is_virtual {
                self.virtual_base_offset(*ty)?
            } else {
                offset + specifier.offset?
            };
            current = registry.layout(*ty)?;
        }
        Some(offset)
    }

    /// Moves every subobject and member up by `shift` bytes to make room
    /// for a vptr at offset 0.
    pub(crate) fn apply_vptr_shift(&mut self, shift: usize, pointer_size: usize, pointer_alignment: usize) {
        for base in &mut self.bases {
            base.offset = base.offset.map(|o| o + shift);
        }
        for vbase in &mut self.virtual_bases {
            vbase.offset += shift;
        }
        for member in &mut self.members {
            member.offset += shift;
            if let Some(bits) = member.bitfield.as_mut() {
                bits.unit_offset += shift;
            }
        }
        for secondary in &mut self.secondary_vtables {
            secondary.offset += shift;
        }
        self.vptr_size = pointer_size;
        self.data_size += shift;
        self.total_size += shift;
        self.alignment = self.alignment.max(pointer_alignment);
        self.non_virtual_alignment = self.non_virtual_alignment.max(pointer_alignment);
    }

    /// Unoccupied byte ranges `(offset, size)` of a finalized layout,
    /// including tail padding.
    pub fn padding(&self) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        if self.vptr_size > 0 {
            ranges.push((0, self.vptr_size));
        }
        for base in self.bases.iter().filter(|b| !b.is_virtual) {
            if let Some(offset) = base.offset {
                ranges.push((offset, base_size(self, base.type_index, false)));
            }
        }
        for vbase in &self.virtual_bases {
            ranges.push((vbase.offset, base_size(self, vbase.type_index, true)));
        }
        for member in &self.members {
            match &member.bitfield {
                Some(bits) if bits.is_barrier() => {}
                Some(bits) => ranges.push((bits.unit_offset, bits.unit_size)),
                None => ranges.push((member.offset, member.size())),
            }
        }
        ranges.retain(|(_, size)| *size > 0);
        ranges.sort();

        let mut holes = Vec::new();
        let mut cursor = 0;
        for (offset, size) in ranges {
            if offset > cursor {
                holes.push((cursor, offset - cursor));
            }
            cursor = cursor.max(offset + size);
        }
        if cursor < self.total_size {
            holes.push((cursor, self.total_size - cursor));
        }
        holes
    }

    pub fn total_padding(&self) -> usize {
        self.padding().iter().map(|(_, size)| size).sum()
    }
}

/// Subobject sizes are recorded on the specifiers by the base layout engine.
fn base_size(layout: &StructLayout, type_index: TypeIndex, is_virtual: bool) -> usize {
    if is_virtual {
        layout
            .virtual_bases
            .iter()
            .find(|vb| vb.type_index == type_index)
            .map(|vb| vb.size)
            .unwrap_or(0)
    } else {
        layout
            .bases
            .iter()
            .find(|b| b.type_index == type_index && !b.is_virtual)
            .map(|b| b.size)
            .unwrap_or(0)
    }
}

impl fmt::Display for StructLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.name)?;
        if self.is_final {
            write!(f, " final")?;
        }
        if !self.bases.is_empty() {
            write!(f, " : {}", self.bases.iter().join(", "))?;
        }
        writeln!(f, " {{")?;
        writeln!(f, "  // Size: 0x{:X} ({} bytes)", self.total_size, self.total_size)?;
        writeln!(f, "  // Alignment: {}", self.alignment)?;
        if self.is_abstract {
            writeln!(f, "  // Abstract: yes")?;
        }
        if self.has_own_vptr() {
            writeln!(f, "  // vptr @ offset 0x0")?;
        }

        if !self.virtual_bases.is_empty() {
            writeln!(f, "  // Virtual bases:")?;
            for vbase in &self.virtual_bases {
                writeln!(f, "  //   {} @ 0x{:X}", vbase.name, vbase.offset)?;
            }
        }

        if !self.vtable.slots.is_empty() {
            writeln!(f, "  // Virtual methods:")?;
            for (index, slot) in self.vtable.slots.iter().enumerate() {
                writeln!(f, "  //   [{}] {}", index, slot)?;
            }
        }

        for member in &self.members {
            writeln!(f, "  {}", member)?;
        }

        let padding = self.padding();
        if self.is_finalized() && !padding.is_empty() {
            writeln!(f, "  // Padding ({} bytes total):", self.total_padding())?;
            for (offset, size) in &padding {
                writeln!(f, "  //   0x{:X} - 0x{:X} ({} bytes)", offset, offset + size, size)?;
            }
        }

        if let Some(err) = &self.error {
            writeln!(f, "  // Error: {}", err)?;
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_member_places_immediately() {
        let mut layout = StructLayout::new("S", TypeIndex::new(20), StructKind::Struct);
        layout.add_member(MemberDecl::new("c", "char", TypeIndex::new(1), 1, 1));
        layout.add_member(MemberDecl::new("i", "int", TypeIndex::new(6), 4, 4));
        assert_eq!(layout.member("c").unwrap().offset, 0);
        assert_eq!(layout.member("i").unwrap().offset, 4);
        assert_eq!(layout.total_size(), 8);
        assert_eq!(layout.alignment(), 4);
        assert!(!layout.is_frozen());
    }

    #[test]
    fn test_pack_applies_to_later_members() {
        let mut layout = StructLayout::new("P", TypeIndex::new(20), StructKind::Struct);
        layout.set_pack_alignment(1);
        layout.add_member(MemberDecl::new("c", "char", TypeIndex::new(1), 1, 1));
        layout.add_member(MemberDecl::new("i", "int", TypeIndex::new(6), 4, 4));
        assert_eq!(layout.member("i").unwrap().offset, 1);
        assert_eq!(layout.pack_alignment(), Some(1));
    }

    #[test]
    fn test_default_access() {
        assert_eq!(StructKind::Class.default_access(), AccessSpecifier::Private);
        assert_eq!(StructKind::Union.default_access(), AccessSpecifier::Public);
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_custom_alignment_must_be_power_of_two() {
        let mut layout = StructLayout::new("S", TypeIndex::new(20), StructKind::Struct);
        layout.set_custom_alignment(12);
    }
}
