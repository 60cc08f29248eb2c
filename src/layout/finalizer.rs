// Sat Oct 17 2026 - Alex

use crate::config::TargetConfig;
use crate::layout::alignment::round_up;
use crate::layout::{
    Alignment, BaseClassLayoutEngine, LayoutError, LayoutState, MemberBuilder, RttiBuilder, StructLayout,
    VTableBuilder,
};
use crate::registry::TypeRegistry;
use log::{debug, warn};

/// Drives a layout from its appended declarations to the frozen result:
/// bases, vtable, RTTI, vptr insertion and padding, in that order.
///
/// Every base must already be finalized in `registry`. A semantic error
/// leaves the layout in [`LayoutState::Errored`] with the error recorded.
pub struct LayoutFinalizer<'a> {
    registry: &'a TypeRegistry,
    config: &'a TargetConfig,
}

impl<'a> LayoutFinalizer<'a> {
    pub fn new(registry: &'a TypeRegistry, config: &'a TargetConfig) -> Self {
        Self { registry, config }
    }

    pub fn finalize(&self, layout: &mut StructLayout) -> Result<(), LayoutError> {
        assert!(
            layout.state == LayoutState::Unfinalized,
            "{} finalized twice",
            layout.name
        );

        match self.run(layout) {
            Ok(()) => {
                layout.state = LayoutState::Finalized;
                debug!(
                    "{}: finalized, size {} align {}",
                    layout.name, layout.total_size, layout.alignment
                );
                Ok(())
            }
            Err(err) => {
                warn!("{}: {}", layout.name, err);
                layout.error = Some(err.clone());
                layout.state = LayoutState::Errored;
                Err(err)
            }
        }
    }

    fn run(&self, layout: &mut StructLayout) -> Result<(), LayoutError> {
        self.apply_default_pack(layout);

        BaseClassLayoutEngine::new(self.registry).layout(layout)?;
        layout.state = LayoutState::BasesPlaced;

        VTableBuilder::new(self.registry).build(layout)?;
        layout.state = LayoutState::VTableBuilt;

        layout.is_empty = self.is_empty(layout);
        let shift = if layout.is_dynamic() && layout.primary_base.is_none() {
            round_up(self.config.pointer_size, layout.alignment)
        } else {
            0
        };

        layout.rtti = Some(RttiBuilder::new(self.registry, self.config).build(layout, shift));
        layout.state = LayoutState::RttiBuilt;

        if shift > 0 {
            debug!("{}: inserting vptr, members move up by {}", layout.name, shift);
            layout.apply_vptr_shift(shift, self.config.pointer_size, self.config.pointer_alignment);
        }
        layout.state = LayoutState::VptrShifted;

        self.pad(layout);
        layout.state = LayoutState::Padded;
        Ok(())
    }

    /// A target-wide pack only applies to records that did not set their
    /// own; members already placed are placed again under it.
    fn apply_default_pack(&self, layout: &mut StructLayout) {
        let pack = match (layout.pack_alignment, self.config.default_pack) {
            (None, Some(pack)) => pack,
            _ => return,
        };
        layout.pack_alignment = Some(Alignment::new(pack));

        let mut builder = MemberBuilder::new(layout.is_union(), Some(pack));
        for member in &mut layout.members {
            let placement = builder.place(&member.decl);
            member.offset = placement.offset;
            member.bitfield = placement.bitfield;
        }
        layout.total_size = builder.size();
        layout.alignment = builder.alignment();
        layout.builder = builder;
    }

    fn is_empty(&self, layout: &StructLayout) -> bool {
        !layout.is_dynamic()
            && layout
                .members
                .iter()
                .all(|m| m.bitfield.map_or(false, |bits| bits.is_barrier()))
            && layout
                .bases
                .iter()
                .all(|b| self.registry.finalized_layout(b.type_index).is_empty())
    }

    fn pad(&self, layout: &mut StructLayout) {
        if let Some(custom) = layout.custom_alignment {
            layout.alignment = layout.alignment.max(custom.as_usize());
            layout.non_virtual_alignment = layout.non_virtual_alignment.max(custom.as_usize());
        }
        // A complete object occupies at least one byte, rounded to its alignment.
        layout.non_virtual_size = round_up(layout.data_size.max(1), layout.non_virtual_alignment);
        layout.total_size = round_up(layout.total_size.max(1), layout.alignment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::rtti::ItaniumTypeInfo;
    use crate::layout::{AccessSpecifier, ErrorKind, LayoutValidator, MemberDecl, MemberFunction};
    use crate::registry::TypeKind;

    fn setup() -> (TargetConfig, TypeRegistry) {
        let config = TargetConfig::x86_64();
        let registry = TypeRegistry::with_builtins(&config);
        (config, registry)
    }

    fn builtin(registry: &TypeRegistry, name: &str, member: &str) -> MemberDecl {
        let index = registry.lookup(name).unwrap();
        let record = registry.get(index);
        MemberDecl::new(member, name, index, record.size(), record.alignment)
    }

    #[test]
    fn test_bitfields_share_byte() {
        let (config, mut registry) = setup();
        let b = registry.declare("B", TypeKind::Struct);
        let a = builtin(&registry, "unsigned char", "a").with_bitfield(3);
        let bb = builtin(&registry, "unsigned char", "b").with_bitfield(3);
        let c = builtin(&registry, "unsigned char", "c").with_bitfield(4);
        {
            let layout = registry.layout_mut(b);
            layout.add_member(a);
            layout.add_member(bb);
            layout.add_member(c);
        }
        registry.finalize(b, &config).unwrap();

        let layout = registry.layout(b).unwrap();
        assert_eq!(layout.total_size(), 2);
        assert_eq!(layout.alignment(), 1);
        assert_eq!(layout.member("b").unwrap().bitfield.unwrap().bit_offset, 3);
        assert_eq!(layout.member("c").unwrap().offset, 1);
    }

    #[test]
    fn test_zero_width_bitfield_barrier() {
        let (config, mut registry) = setup();
        let z = registry.declare("Z", TypeKind::Struct);
        let a = builtin(&registry, "unsigned int", "a").with_bitfield(3);
        let barrier = builtin(&registry, "unsigned int", "").with_bitfield(0);
        let b = builtin(&registry, "unsigned int", "b").with_bitfield(3);
        {
            let layout = registry.layout_mut(z);
            layout.add_member(a);
            layout.add_member(barrier);
            layout.add_member(b);
        }
        registry.finalize(z, &config).unwrap();

        let layout = registry.layout(z).unwrap();
        assert_eq!(layout.member("b").unwrap().offset, 4);
        assert_eq!(layout.total_size(), 8);
        assert_eq!(layout.alignment(), 4);
    }

    #[test]
    fn test_vptr_moves_members() {
        let (config, mut registry) = setup();
        let v = registry.declare("V", TypeKind::Struct);
        let x = builtin(&registry, "int", "x");
        {
            let layout = registry.layout_mut(v);
            layout.add_member(x);
            layout.add_member_function(MemberFunction::new("f").with_virtual());
        }
        registry.finalize(v, &config).unwrap();

        let layout = registry.layout(v).unwrap();
        assert!(layout.has_own_vptr());
        assert_eq!(layout.member("x").unwrap().offset, 8);
        assert_eq!(layout.total_size(), 16);
        assert_eq!(layout.alignment(), 8);
        assert_eq!(layout.state(), LayoutState::Finalized);
        assert_eq!(registry.get(v).size(), 16);
    }

    #[test]
    fn test_diamond_shares_virtual_base() {
        let (config, mut registry) = setup();
        let a = registry.declare("A", TypeKind::Struct);
        registry.finalize(a, &config).unwrap();

        let b = registry.declare("B", TypeKind::Struct);
        registry.layout_mut(b).add_base_class("A", a, AccessSpecifier::Public, true);
        registry.finalize(b, &config).unwrap();

        let c = registry.declare("C", TypeKind::Struct);
        registry.layout_mut(c).add_base_class("A", a, AccessSpecifier::Public, true);
        registry.finalize(c, &config).unwrap();

        let d = registry.declare("D", TypeKind::Struct);
        {
            let layout = registry.layout_mut(d);
            layout.add_base_class("B", b, AccessSpecifier::Public, false);
            layout.add_base_class("C", c, AccessSpecifier::Public, false);
        }
        registry.finalize(d, &config).unwrap();

        let b_layout = registry.layout(b).unwrap();
        assert_eq!(b_layout.total_size(), 8);
        assert_eq!(b_layout.virtual_base_offset(a), Some(8));

        let layout = registry.layout(d).unwrap();
        assert_eq!(layout.virtual_bases().len(), 1);
        assert_eq!(layout.primary_base().map(|p| p.type_index), Some(b));
        assert_eq!(layout.bases()[1].offset, Some(8));
        let via_b = layout.resolve_base_path(&registry, &[b, a]);
        let via_c = layout.resolve_base_path(&registry, &[c, a]);
        assert_eq!(via_b, Some(16));
        assert_eq!(via_b, via_c);
        assert_eq!(layout.total_size(), 16);
    }

    #[test]
    fn test_final_override_is_rejected() {
        let (config, mut registry) = setup();
        let base = registry.declare("Base", TypeKind::Class);
        registry
            .layout_mut(base)
            .add_member_function(MemberFunction::new("f").with_virtual().with_final());
        registry.finalize(base, &config).unwrap();

        let derived = registry.declare("Derived", TypeKind::Class);
        {
            let layout = registry.layout_mut(derived);
            layout.add_base_class("Base", base, AccessSpecifier::Public, false);
            layout.add_member_function(MemberFunction::new("f").with_virtual());
        }
        let err = registry.finalize(derived, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FinalOverride);

        let layout = registry.layout(derived).unwrap();
        assert_eq!(layout.state(), LayoutState::Errored);
        assert!(!layout.is_finalized());
        assert!(layout.finalization_error_message().contains("f"));
        assert!(!registry.get(derived).is_complete());
    }

    #[test]
    #[should_panic(expected = "finalized twice")]
    fn test_finalize_twice_panics() {
        let (config, mut registry) = setup();
        let s = registry.declare("S", TypeKind::Struct);
        registry.finalize(s, &config).unwrap();
        let _ = registry.finalize(s, &config);
    }

    #[test]
    fn test_empty_class_and_custom_alignment() {
        let (config, mut registry) = setup();
        let empty = registry.declare("Empty", TypeKind::Struct);
        registry.finalize(empty, &config).unwrap();
        let layout = registry.layout(empty).unwrap();
        assert_eq!(layout.total_size(), 1);
        assert!(layout.is_empty());

        let aligned = registry.declare("Aligned", TypeKind::Struct);
        let c = builtin(&registry, "char", "c");
        {
            let layout = registry.layout_mut(aligned);
            layout.add_member(c);
            layout.set_custom_alignment(16);
        }
        registry.finalize(aligned, &config).unwrap();
        let layout = registry.layout(aligned).unwrap();
        assert_eq!(layout.alignment(), 16);
        assert_eq!(layout.total_size(), 16);
        assert_eq!(layout.total_padding(), 15);
    }

    #[test]
    fn test_empty_aligned_record_is_padded_to_alignment() {
        let (config, mut registry) = setup();
        let e = registry.declare("E", TypeKind::Struct);
        registry.layout_mut(e).set_custom_alignment(16);
        registry.finalize(e, &config).unwrap();

        let layout = registry.layout(e).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.alignment(), 16);
        assert_eq!(layout.total_size(), 16);
        assert_eq!(layout.non_virtual_size(), 16);
        assert!(LayoutValidator::new(&config).validate(layout).is_ok());

        let z = registry.declare("Z", TypeKind::Struct);
        let barrier = builtin(&registry, "int", "").with_bitfield(0);
        registry.layout_mut(z).add_member(barrier);
        registry.finalize(z, &config).unwrap();

        let layout = registry.layout(z).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.alignment(), 4);
        assert_eq!(layout.total_size(), 4);
        assert!(LayoutValidator::new(&config).validate(layout).is_ok());

        let u = registry.declare("U", TypeKind::Union);
        registry.layout_mut(u).set_custom_alignment(8);
        registry.finalize(u, &config).unwrap();
        let layout = registry.layout(u).unwrap();
        assert_eq!(layout.total_size(), 8);
        assert!(LayoutValidator::new(&config).validate(layout).is_ok());
    }

    #[test]
    fn test_union_size_and_errors() {
        let (config, mut registry) = setup();
        let u = registry.declare("U", TypeKind::Union);
        let i = builtin(&registry, "int", "i");
        let d = builtin(&registry, "double", "d");
        {
            let layout = registry.layout_mut(u);
            layout.add_member(i);
            layout.add_member(d);
        }
        registry.finalize(u, &config).unwrap();
        assert_eq!(registry.layout(u).unwrap().total_size(), 8);

        let bad = registry.declare("Bad", TypeKind::Union);
        registry
            .layout_mut(bad)
            .add_member_function(MemberFunction::new("f").with_virtual());
        let err = registry.finalize(bad, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VirtualInUnion);
    }

    #[test]
    fn test_rtti_can_be_disabled() {
        let config = TargetConfig::x86_64().with_rtti(false);
        let mut registry = TypeRegistry::with_builtins(&config);
        let v = registry.declare("V", TypeKind::Class);
        registry
            .layout_mut(v)
            .add_member_function(MemberFunction::new("f").with_virtual());
        registry.finalize(v, &config).unwrap();

        let rtti = registry.layout(v).unwrap().rtti().unwrap();
        assert_eq!(rtti.itanium, ItaniumTypeInfo::None);
        assert!(rtti.msvc.is_none());
        assert_eq!(registry.layout(v).unwrap().total_size(), 8);
    }

    #[test]
    fn test_default_pack_from_target() {
        let config = TargetConfig::x86_64().with_default_pack(1);
        let mut registry = TypeRegistry::with_builtins(&config);
        let p = registry.declare("P", TypeKind::Struct);
        let c = builtin(&registry, "char", "c");
        let i = builtin(&registry, "int", "i");
        {
            let layout = registry.layout_mut(p);
            layout.add_member(c);
            layout.add_member(i);
        }
        registry.finalize(p, &config).unwrap();

        let layout = registry.layout(p).unwrap();
        assert_eq!(layout.member("i").unwrap().offset, 1);
        assert_eq!(layout.total_size(), 5);
        assert_eq!(layout.pack_alignment(), Some(1));
    }
}
