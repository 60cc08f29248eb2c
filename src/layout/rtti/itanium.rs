// Sat Oct 17 2026 - Alex

use crate::layout::rtti::mangle::itanium_type_name;
use crate::layout::StructLayout;
use crate::registry::{TypeIndex, TypeRegistry};
use bitflags::bitflags;
use std::collections::HashSet;
use std::fmt;

/// Low byte of `__offset_flags`: the base is virtual.
pub const BASE_IS_VIRTUAL: i64 = 0x1;
/// Low byte of `__offset_flags`: the base is public.
pub const BASE_IS_PUBLIC: i64 = 0x2;
pub const OFFSET_SHIFT: u32 = 8;

bitflags! {
    /// `__vmi_class_type_info::__flags`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VmiFlags: u32 {
        const NON_DIAMOND_REPEAT = 0x1;
        const DIAMOND_SHAPED = 0x2;
    }
}

/// `__class_type_info`: the class has no bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeInfo {
    pub type_index: TypeIndex,
    /// Mangled `<name>`, the tail of both the `_ZTI` and `_ZTS` symbols.
    pub name: String,
}

impl ClassTypeInfo {
    pub fn of(layout: &StructLayout) -> Self {
        Self {
            type_index: layout.index(),
            name: itanium_type_name(layout.name()),
        }
    }

    pub fn symbol(&self) -> String {
        format!("_ZTI{}", self.name)
    }

    pub fn name_symbol(&self) -> String {
        format!("_ZTS{}", self.name)
    }
}

/// `__si_class_type_info`: exactly one public non-virtual base at offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiClassTypeInfo {
    pub class: ClassTypeInfo,
    pub base_type: TypeIndex,
}

/// One `__base_class_type_info` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseTypeInfo {
    pub base_type: TypeIndex,
    /// Offset in the high bits, flags in the low byte. For a virtual base
    /// the offset is the vtable position of its virtual-base offset.
    pub offset_flags: i64,
}

impl BaseTypeInfo {
    pub fn new(base_type: TypeIndex, offset: i64, is_virtual: bool, is_public: bool) -> Self {
        let mut flags = 0;
        if is_virtual {
            flags |= BASE_IS_VIRTUAL;
        }
        if is_public {
            flags |= BASE_IS_PUBLIC;
        }
        Self {
            base_type,
            offset_flags: (offset << OFFSET_SHIFT) | flags,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset_flags >> OFFSET_SHIFT
    }

    pub fn is_virtual(&self) -> bool {
        self.offset_flags & BASE_IS_VIRTUAL != 0
    }

    pub fn is_public(&self) -> bool {
        self.offset_flags & BASE_IS_PUBLIC != 0
    }
}

/// `__vmi_class_type_info`: every other shape of base list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmiClassTypeInfo {
    pub class: ClassTypeInfo,
    pub flags: VmiFlags,
    pub bases: Vec<BaseTypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItaniumTypeInfo {
    /// RTTI disabled for the target.
    None,
    Class(ClassTypeInfo),
    SiClass(SiClassTypeInfo),
    VmiClass(VmiClassTypeInfo),
}

impl ItaniumTypeInfo {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Class(_) => "__class_type_info",
            Self::SiClass(_) => "__si_class_type_info",
            Self::VmiClass(_) => "__vmi_class_type_info",
        }
    }

    pub fn class(&self) -> Option<&ClassTypeInfo> {
        match self {
            Self::None => None,
            Self::Class(class) => Some(class),
            Self::SiClass(si) => Some(&si.class),
            Self::VmiClass(vmi) => Some(&vmi.class),
        }
    }
}

impl fmt::Display for ItaniumTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class() {
            Some(class) => write!(f, "{} {}", self.kind_name(), class.symbol()),
            None => write!(f, "no type_info"),
        }
    }
}

pub(crate) fn build(registry: &TypeRegistry, layout: &StructLayout, vptr_shift: usize, pointer_size: usize) -> ItaniumTypeInfo {
    let class = ClassTypeInfo::of(layout);
    let bases = layout.bases();

    if bases.is_empty() {
        return ItaniumTypeInfo::Class(class);
    }

    if let [base] = bases {
        let at_zero = base.offset.map_or(false, |o| o + vptr_shift == 0);
        if !base.is_virtual && base.access.is_public() && at_zero {
            return ItaniumTypeInfo::SiClass(SiClassTypeInfo {
                class,
                base_type: base.type_index,
            });
        }
    }

    let entries = bases
        .iter()
        .map(|base| {
            let offset = if base.is_virtual {
                let ordinal = layout
                    .virtual_bases()
                    .iter()
                    .position(|vb| vb.type_index == base.type_index)
                    .unwrap_or(0);
                -(((3 + ordinal) * pointer_size) as i64)
            } else {
                (base.offset.unwrap_or(0) + vptr_shift) as i64
            };
            BaseTypeInfo::new(base.type_index, offset, base.is_virtual, base.access.is_public())
        })
        .collect();

    ItaniumTypeInfo::VmiClass(VmiClassTypeInfo {
        class,
        flags: vmi_flags(registry, layout),
        bases: entries,
    })
}

#[derive(Default)]
struct SeenBases {
    virtual_bases: HashSet<TypeIndex>,
    non_virtual_bases: HashSet<TypeIndex>,
}

/// A virtual base reached twice makes the graph diamond shaped; any other
/// repeat is a non-diamond repeat.
fn vmi_flags(registry: &TypeRegistry, layout: &StructLayout) -> VmiFlags {
    let mut seen = SeenBases::default();
    let mut flags = VmiFlags::empty();
    for base in layout.bases() {
        flags |= walk(registry, base.type_index, base.is_virtual, &mut seen);
    }
    flags
}

fn walk(registry: &TypeRegistry, type_index: TypeIndex, is_virtual: bool, seen: &mut SeenBases) -> VmiFlags {
    let mut flags = VmiFlags::empty();
    if is_virtual {
        if !seen.virtual_bases.insert(type_index) {
            // Shared subobject: its own bases were walked the first time.
            return VmiFlags::DIAMOND_SHAPED;
        } else if seen.non_virtual_bases.contains(&type_index) {
            flags |= VmiFlags::NON_DIAMOND_REPEAT;
        }
    } else if !seen.non_virtual_bases.insert(type_index) || seen.virtual_bases.contains(&type_index) {
        flags |= VmiFlags::NON_DIAMOND_REPEAT;
    }

    for base in registry.finalized_layout(type_index).bases() {
        flags |= walk(registry, base.type_index, base.is_virtual, seen);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::layout::{AccessSpecifier, MemberDecl, MemberFunction};
    use crate::registry::TypeKind;

    fn declare(
        registry: &mut TypeRegistry,
        config: &TargetConfig,
        name: &str,
        bases: &[(TypeIndex, AccessSpecifier, bool)],
        with_virtual: bool,
    ) -> TypeIndex {
        let int = registry.lookup("int").unwrap();
        let index = registry.declare(name, TypeKind::Class);
        let layout = registry.layout_mut(index);
        for (base, access, is_virtual) in bases {
            layout.add_base_class(&format!("{}", base), *base, *access, *is_virtual);
        }
        layout.add_member(MemberDecl::new(&name.to_lowercase(), "int", int, 4, 4));
        if with_virtual {
            layout.add_member_function(MemberFunction::new("f").with_virtual());
        }
        registry.finalize(index, config).unwrap();
        index
    }

    fn type_info(registry: &TypeRegistry, index: TypeIndex) -> ItaniumTypeInfo {
        registry.layout(index).unwrap().rtti().unwrap().itanium.clone()
    }

    #[test]
    fn test_single_public_base_uses_si() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = declare(&mut registry, &config, "A", &[], true);
        let b = declare(&mut registry, &config, "B", &[(a, AccessSpecifier::Public, false)], false);

        assert!(matches!(type_info(&registry, a), ItaniumTypeInfo::Class(_)));
        match type_info(&registry, b) {
            ItaniumTypeInfo::SiClass(si) => {
                assert_eq!(si.base_type, a);
                assert_eq!(si.class.symbol(), "_ZTI1B");
            }
            other => panic!("expected __si_class_type_info, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_private_or_second_base_uses_vmi() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = declare(&mut registry, &config, "A", &[], true);
        let plain = declare(&mut registry, &config, "Plain", &[], false);

        let private = declare(&mut registry, &config, "P", &[(a, AccessSpecifier::Private, false)], false);
        assert!(matches!(type_info(&registry, private), ItaniumTypeInfo::VmiClass(_)));

        let two = declare(
            &mut registry,
            &config,
            "Two",
            &[(a, AccessSpecifier::Public, false), (plain, AccessSpecifier::Public, false)],
            false,
        );
        match type_info(&registry, two) {
            ItaniumTypeInfo::VmiClass(vmi) => {
                assert_eq!(vmi.bases.len(), 2);
                assert_eq!(vmi.bases[0].offset(), 0);
                assert_eq!(vmi.bases[1].offset(), 16);
                assert!(vmi.bases[1].is_public());
                assert!(vmi.flags.is_empty());
            }
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_single_base_behind_own_vptr_uses_vmi() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let plain = declare(&mut registry, &config, "Plain", &[], false);

        // One public non-virtual base, but the class's own vptr sits at 0.
        let shifted = declare(&mut registry, &config, "S", &[(plain, AccessSpecifier::Public, false)], true);
        assert_eq!(registry.layout(shifted).unwrap().bases()[0].offset, Some(8));
        match type_info(&registry, shifted) {
            ItaniumTypeInfo::VmiClass(vmi) => {
                assert_eq!(vmi.bases.len(), 1);
                assert_eq!(vmi.bases[0].offset(), 8);
                assert!(vmi.bases[0].is_public());
            }
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_diamond_is_flagged() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = declare(&mut registry, &config, "A", &[], false);
        let b = declare(&mut registry, &config, "B", &[(a, AccessSpecifier::Public, true)], false);
        let c = declare(&mut registry, &config, "C", &[(a, AccessSpecifier::Public, true)], false);
        let d = declare(
            &mut registry,
            &config,
            "D",
            &[(b, AccessSpecifier::Public, false), (c, AccessSpecifier::Public, false)],
            false,
        );

        match type_info(&registry, b) {
            ItaniumTypeInfo::VmiClass(vmi) => {
                assert!(vmi.bases[0].is_virtual());
                assert_eq!(vmi.bases[0].offset(), -24);
            }
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
        match type_info(&registry, d) {
            ItaniumTypeInfo::VmiClass(vmi) => {
                assert_eq!(vmi.flags, VmiFlags::DIAMOND_SHAPED);
            }
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_diamond_over_base_with_own_base_is_only_diamond() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let x = declare(&mut registry, &config, "X", &[], false);
        let a = declare(&mut registry, &config, "A", &[(x, AccessSpecifier::Public, false)], false);
        let b = declare(&mut registry, &config, "B", &[(a, AccessSpecifier::Public, true)], false);
        let c = declare(&mut registry, &config, "C", &[(a, AccessSpecifier::Public, true)], false);
        let d = declare(
            &mut registry,
            &config,
            "D",
            &[(b, AccessSpecifier::Public, false), (c, AccessSpecifier::Public, false)],
            false,
        );
        match type_info(&registry, d) {
            ItaniumTypeInfo::VmiClass(vmi) => assert_eq!(vmi.flags, VmiFlags::DIAMOND_SHAPED),
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_repeated_non_virtual_base() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = declare(&mut registry, &config, "A", &[], false);
        let b = declare(&mut registry, &config, "B", &[(a, AccessSpecifier::Public, false)], false);
        let c = declare(&mut registry, &config, "C", &[(a, AccessSpecifier::Public, false)], false);
        let d = declare(
            &mut registry,
            &config,
            "D",
            &[(b, AccessSpecifier::Public, false), (c, AccessSpecifier::Public, false)],
            false,
        );
        match type_info(&registry, d) {
            ItaniumTypeInfo::VmiClass(vmi) => assert_eq!(vmi.flags, VmiFlags::NON_DIAMOND_REPEAT),
            other => panic!("expected __vmi_class_type_info, got {}", other.kind_name()),
        }
    }
}
