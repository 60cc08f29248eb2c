// Sat Oct 17 2026 - Alex

use crate::layout::rtti::mangle::msvc_type_descriptor_name;
use crate::layout::StructLayout;
use crate::registry::{TypeIndex, TypeRegistry};
use bitflags::bitflags;
use std::collections::{HashMap, HashSet};
use std::fmt;

bitflags! {
    /// `_RTTIBaseClassDescriptor::attributes`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BcdAttributes: u32 {
        const NOTVISIBLE = 0x01;
        const AMBIGUOUS = 0x02;
        const PRIVORPROTBASE = 0x04;
        const PRIVORPROTINCOMPOBJ = 0x08;
        const VBOFCONTOBJ = 0x10;
        const NONPOLYMORPHIC = 0x20;
        const HASPCHD = 0x40;
    }
}

bitflags! {
    /// `_RTTIClassHierarchyDescriptor::attributes`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChdAttributes: u32 {
        const MULTINH = 0x01;
        const VIRTINH = 0x02;
        const AMBIGUOUS = 0x04;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_index: TypeIndex,
    pub decorated_name: String,
}

impl TypeDescriptor {
    pub fn of(layout: &StructLayout) -> Self {
        Self {
            type_index: layout.index(),
            decorated_name: msvc_type_descriptor_name(layout.name(), layout.kind()),
        }
    }
}

/// `PMD`: how to reach a base subobject from the complete object.
/// `pdisp` is -1 unless the path crosses a virtual base, in which case it
/// locates the vbptr and `vdisp` the entry of that virtual base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmdDisplacement {
    pub mdisp: i32,
    pub pdisp: i32,
    pub vdisp: i32,
}

impl PmdDisplacement {
    pub fn direct(mdisp: usize) -> Self {
        Self {
            mdisp: mdisp as i32,
            pdisp: -1,
            vdisp: 0,
        }
    }

    pub fn through_virtual(&self) -> bool {
        self.pdisp >= 0
    }
}

impl fmt::Display for PmdDisplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}, {}}}", self.mdisp, self.pdisp, self.vdisp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClassDescriptor {
    pub type_descriptor: TypeDescriptor,
    /// Entries following this one in the base class array that belong to
    /// this subobject.
    pub num_contained_bases: u32,
    pub displacement: PmdDisplacement,
    pub attributes: BcdAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHierarchyDescriptor {
    pub signature: u32,
    pub attributes: ChdAttributes,
    /// The class itself first, then every base subobject in pre-order.
    /// Virtual bases are listed once.
    pub base_class_array: Vec<BaseClassDescriptor>,
}

impl ClassHierarchyDescriptor {
    pub fn num_base_classes(&self) -> usize {
        self.base_class_array.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteObjectLocator {
    /// 1 on 64-bit targets, where the locator holds image-relative offsets.
    pub signature: u32,
    /// Offset of the vfptr within the complete object.
    pub offset: u32,
    pub cd_offset: u32,
    pub type_descriptor: TypeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcRtti {
    pub type_descriptor: TypeDescriptor,
    pub hierarchy: ClassHierarchyDescriptor,
    pub locator: CompleteObjectLocator,
}

struct Walker<'a> {
    registry: &'a TypeRegistry,
    complete: &'a StructLayout,
    vptr_shift: usize,
    entries: Vec<BaseClassDescriptor>,
    seen_virtual: HashSet<TypeIndex>,
    multiple: bool,
}

impl<'a> Walker<'a> {
    /// Offset of a direct base of `node`, final coordinates when `node` is
    /// the class being finalized.
    fn base_offset(&self, node: &StructLayout, offset: Option<usize>) -> usize {
        let offset = offset.unwrap_or(0);
        if node.index() == self.complete.index() {
            offset + self.vptr_shift
        } else {
            offset
        }
    }

    fn virtual_offset(&self, type_index: TypeIndex) -> usize {
        self.complete.virtual_base_offset(type_index).unwrap_or(0) + self.vptr_shift
    }

    /// `at` is the absolute offset of `node` in the complete object.
    fn visit(&mut self, node: &StructLayout, at: usize, pmd: PmdDisplacement, attributes: BcdAttributes, visible: bool) {
        let slot = self.entries.len();
        self.entries.push(BaseClassDescriptor {
            type_descriptor: TypeDescriptor::of(node),
            num_contained_bases: 0,
            displacement: pmd,
            attributes,
        });
        if node.bases().len() > 1 {
            self.multiple = true;
        }
        let is_complete = node.index() == self.complete.index();

        for base in node.bases() {
            let registry = self.registry;
            let base_layout = registry.finalized_layout(base.type_index);
            let child_visible = visible && base.access.is_public();

            let mut child_attributes = BcdAttributes::HASPCHD;
            if !base.access.is_public() {
                child_attributes |= BcdAttributes::PRIVORPROTBASE;
            }
            if !child_visible {
                child_attributes |= BcdAttributes::NOTVISIBLE | BcdAttributes::PRIVORPROTINCOMPOBJ;
            }
            if !base_layout.has_vtable() {
                child_attributes |= BcdAttributes::NONPOLYMORPHIC;
            }

            if base.is_virtual {
                if !self.seen_virtual.insert(base.type_index) {
                    continue;
                }
                if !is_complete {
                    child_attributes |= BcdAttributes::VBOFCONTOBJ;
                }
                let ordinal = node
                    .virtual_bases()
                    .iter()
                    .position(|vb| vb.type_index == base.type_index)
                    .unwrap_or(0);
                let child_pmd = PmdDisplacement {
                    mdisp: 0,
                    pdisp: at as i32,
                    vdisp: (4 * (1 + ordinal)) as i32,
                };
                let child_at = self.virtual_offset(base.type_index);
                self.visit(base_layout, child_at, child_pmd, child_attributes, child_visible);
            } else {
                let offset = self.base_offset(node, base.offset);
                let child_pmd = PmdDisplacement {
                    mdisp: pmd.mdisp + offset as i32,
                    ..pmd
                };
                if pmd.through_virtual() {
                    child_attributes |= BcdAttributes::VBOFCONTOBJ;
                }
                self.visit(base_layout, at + offset, child_pmd, child_attributes, child_visible);
            }
        }

        self.entries[slot].num_contained_bases = (self.entries.len() - slot - 1) as u32;
    }
}

/// Builds the descriptor chain for a polymorphic class; `None` otherwise.
pub(crate) fn build(registry: &TypeRegistry, layout: &StructLayout, vptr_shift: usize, pointer_size: usize) -> Option<MsvcRtti> {
    if !layout.has_vtable() {
        return None;
    }

    let mut walker = Walker {
        registry,
        complete: layout,
        vptr_shift,
        entries: Vec::new(),
        seen_virtual: HashSet::new(),
        multiple: false,
    };
    walker.visit(layout, 0, PmdDisplacement::direct(0), BcdAttributes::HASPCHD, true);

    let mut counts: HashMap<TypeIndex, usize> = HashMap::new();
    for entry in walker.entries.iter().skip(1) {
        *counts.entry(entry.type_descriptor.type_index).or_insert(0) += 1;
    }
    let mut attributes = ChdAttributes::empty();
    for entry in walker.entries.iter_mut().skip(1) {
        if counts[&entry.type_descriptor.type_index] > 1 {
            entry.attributes |= BcdAttributes::AMBIGUOUS;
            attributes |= ChdAttributes::AMBIGUOUS;
        }
    }
    if walker.multiple {
        attributes |= ChdAttributes::MULTINH;
    }
    if !layout.virtual_bases().is_empty() {
        attributes |= ChdAttributes::VIRTINH;
    }

    let type_descriptor = TypeDescriptor::of(layout);
    Some(MsvcRtti {
        locator: CompleteObjectLocator {
            signature: if pointer_size == 8 { 1 } else { 0 },
            offset: 0,
            cd_offset: 0,
            type_descriptor: type_descriptor.type_index,
        },
        hierarchy: ClassHierarchyDescriptor {
            signature: 0,
            attributes,
            base_class_array: walker.entries,
        },
        type_descriptor,
    })
}
