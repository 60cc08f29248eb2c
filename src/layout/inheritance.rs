// Fri Oct 16 2026 - Alex

use crate::layout::alignment::{effective_alignment, round_up};
use crate::layout::{LayoutError, MemberBuilder, MemberDecl, StructLayout, VirtualBase};
use crate::registry::{TypeIndex, TypeRegistry};
use log::{debug, trace};
use std::collections::HashSet;

/// Places base-class subobjects around a class's own members.
///
/// Non-virtual bases come first, the primary base (the first non-virtual
/// base that carries a vptr) ahead of the others so the derived class can
/// share its vptr. The class's own members follow. Virtual bases are shared
/// by every path that reaches them and are allocated once, after the
/// non-virtual part, in inheritance-graph order.
pub struct BaseClassLayoutEngine<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> BaseClassLayoutEngine<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Semantic checks on the direct base list.
    pub fn check_bases(&self, layout: &StructLayout) -> Result<(), LayoutError> {
        if layout.is_union() && !layout.bases.is_empty() {
            return Err(LayoutError::UnionWithBase {
                class: layout.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for base in &layout.bases {
            let base_layout = self.registry.finalized_layout(base.type_index);
            if base_layout.is_final() {
                return Err(LayoutError::FinalBase {
                    class: layout.name.clone(),
                    base: base.name.clone(),
                });
            }
            if !seen.insert(base.type_index) {
                return Err(LayoutError::AmbiguousBase {
                    class: layout.name.clone(),
                    base: base.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn layout(&self, layout: &mut StructLayout) -> Result<(), LayoutError> {
        self.check_bases(layout)?;
        let pack = layout.pack();

        let primary = layout
            .bases
            .iter()
            .position(|b| !b.is_virtual && self.registry.finalized_layout(b.type_index).is_dynamic());
        layout.primary_base = primary;

        let order: Vec<usize> = primary
            .into_iter()
            .chain((0..layout.bases.len()).filter(|&i| Some(i) != primary && !layout.bases[i].is_virtual))
            .collect();

        let mut size = 0;
        let mut align = 1;
        let mut subobjects = Vec::new();
        for i in order {
            let type_index = layout.bases[i].type_index;
            let base_layout = self.registry.finalized_layout(type_index);
            let base_align = effective_alignment(base_layout.non_virtual_alignment(), pack);
            let occupied = if base_layout.is_empty() { 0 } else { base_layout.non_virtual_size() };
            let candidate = round_up(size, base_align);
            let offset = self.first_clear_offset(&subobjects, type_index, candidate, base_align);
            // An empty base moved off its candidate offset still needs a byte.
            let footprint = if occupied == 0 && offset != candidate { 1 } else { occupied };
            size = size.max(offset + footprint);
            align = align.max(base_align);
            self.collect_subobjects(type_index, offset, &mut subobjects);

            let specifier = &mut layout.bases[i];
            specifier.offset = Some(offset);
            specifier.size = occupied;
            trace!("{}: base {} at 0x{:X} ({} bytes)", layout.name, specifier.name, offset, occupied);
        }

        if layout.bases.is_empty() {
            size = layout.builder.size();
            align = layout.builder.alignment();
        } else {
            let mut builder = MemberBuilder::resume(size, align, layout.is_union(), pack);
            for member in &mut layout.members {
                let placement = match self.embedded_record(&member.decl) {
                    Some(type_index) => builder.place_clear_of(&member.decl, |offset| {
                        self.conflicts(&subobjects, type_index, offset)
                    }),
                    None => builder.place(&member.decl),
                };
                member.offset = placement.offset;
                member.bitfield = placement.bitfield;
            }
            size = builder.size();
            align = builder.alignment();
            layout.builder = builder;
        }

        layout.data_size = size;
        layout.non_virtual_alignment = align;
        self.place_virtual_bases(layout, size, align);

        debug!(
            "{}: bases placed, data size {}, {} virtual base(s), total {}",
            layout.name,
            layout.data_size,
            layout.virtual_bases.len(),
            layout.total_size
        );
        Ok(())
    }

    /// Pushes `type_index` at `offset` and all of its non-virtual base
    /// subobjects.
    fn collect_subobjects(&self, type_index: TypeIndex, offset: usize, out: &mut Vec<(TypeIndex, usize)>) {
        out.push((type_index, offset));
        let layout = match self.registry.try_get(type_index).and_then(|r| r.layout()) {
            Some(layout) if layout.is_finalized() => layout,
            _ => return,
        };
        for base in layout.bases().iter().filter(|b| !b.is_virtual) {
            self.collect_subobjects(base.type_index, offset + base.offset.unwrap_or(0), out);
        }
    }

    /// Two distinct objects of the same type never share an address.
    fn conflicts(&self, placed: &[(TypeIndex, usize)], type_index: TypeIndex, offset: usize) -> bool {
        let mut candidate = Vec::new();
        self.collect_subobjects(type_index, offset, &mut candidate);
        candidate.iter().any(|subobject| placed.contains(subobject))
    }

    fn first_clear_offset(&self, placed: &[(TypeIndex, usize)], type_index: TypeIndex, start: usize, step: usize) -> usize {
        let mut offset = start;
        while self.conflicts(placed, type_index, offset) {
            offset += step;
        }
        offset
    }

    /// Record type a member holds by value.
    fn embedded_record(&self, decl: &MemberDecl) -> Option<TypeIndex> {
        if decl.pointer_depth > 0 || decl.is_reference || decl.bitfield_width.is_some() {
            return None;
        }
        self.registry
            .try_get(decl.type_index)
            .and_then(|r| r.layout())
            .filter(|layout| layout.is_finalized())
            .map(|_| decl.type_index)
    }

    /// Distinct virtual bases reachable from `layout`, in inheritance-graph
    /// pre-order. A virtual base reached along several paths appears once.
    pub fn collect_virtual_bases(&self, layout: &StructLayout) -> Vec<TypeIndex> {
        let mut order: Vec<TypeIndex> = Vec::new();
        for base in &layout.bases {
            if base.is_virtual && !order.contains(&base.type_index) {
                order.push(base.type_index);
            }
            for inherited in self.registry.finalized_layout(base.type_index).virtual_bases() {
                if !order.contains(&inherited.type_index) {
                    order.push(inherited.type_index);
                }
            }
        }
        order
    }

    fn place_virtual_bases(&self, layout: &mut StructLayout, data_size: usize, nv_align: usize) {
        let pack = layout.pack();
        let mut size = data_size;
        let mut align = nv_align;

        layout.virtual_bases.clear();
        for type_index in self.collect_virtual_bases(layout) {
            let vbase = self.registry.finalized_layout(type_index);
            let vbase_align = effective_alignment(vbase.non_virtual_alignment(), pack);
            let occupied = if vbase.is_empty() { 0 } else { vbase.non_virtual_size() };
            let offset = round_up(size, vbase_align);
            size = offset + occupied;
            align = align.max(vbase_align);
            trace!("{}: virtual base {} at 0x{:X}", layout.name, vbase.name(), offset);
            layout.virtual_bases.push(VirtualBase {
                name: vbase.name().to_string(),
                type_index,
                offset,
                size: occupied,
            });
        }

        let placed = layout.virtual_bases.clone();
        for specifier in layout.bases.iter_mut().filter(|b| b.is_virtual) {
            if let Some(vbase) = placed.iter().find(|vb| vb.type_index == specifier.type_index) {
                specifier.offset = Some(vbase.offset);
                specifier.size = vbase.size;
            }
        }

        layout.total_size = size;
        layout.alignment = align;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::layout::{AccessSpecifier, MemberDecl};
    use crate::registry::TypeKind;

    fn int_member(registry: &TypeRegistry, name: &str) -> MemberDecl {
        MemberDecl::new(name, "int", registry.lookup("int").unwrap(), 4, 4)
    }

    fn char_member(registry: &TypeRegistry, name: &str) -> MemberDecl {
        MemberDecl::new(name, "char", registry.lookup("char").unwrap(), 1, 1)
    }

    #[test]
    fn test_non_virtual_bases_in_declaration_order() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);

        let a = registry.declare("A", TypeKind::Struct);
        let member = char_member(&registry, "a");
        registry.layout_mut(a).add_member(member);
        registry.finalize(a, &config).unwrap();

        let b = registry.declare("B", TypeKind::Struct);
        let member = int_member(&registry, "b");
        registry.layout_mut(b).add_member(member);
        registry.finalize(b, &config).unwrap();

        let c = registry.declare("C", TypeKind::Struct);
        let member = char_member(&registry, "c");
        {
            let layout = registry.layout_mut(c);
            layout.add_base_class("A", a, AccessSpecifier::Public, false);
            layout.add_base_class("B", b, AccessSpecifier::Public, false);
            layout.add_member(member);
        }
        registry.finalize(c, &config).unwrap();

        let layout = registry.layout(c).unwrap();
        assert_eq!(layout.bases()[0].offset, Some(0));
        assert_eq!(layout.bases()[1].offset, Some(4));
        assert_eq!(layout.member("c").unwrap().offset, 8);
        assert_eq!(layout.total_size(), 12);
    }

    #[test]
    fn test_empty_base_takes_no_space() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);

        let empty = registry.declare("Empty", TypeKind::Struct);
        registry.finalize(empty, &config).unwrap();
        assert_eq!(registry.layout(empty).unwrap().total_size(), 1);

        let d = registry.declare("D", TypeKind::Struct);
        let member = int_member(&registry, "x");
        {
            let layout = registry.layout_mut(d);
            layout.add_base_class("Empty", empty, AccessSpecifier::Public, false);
            layout.add_member(member);
        }
        registry.finalize(d, &config).unwrap();

        let layout = registry.layout(d).unwrap();
        assert_eq!(layout.member("x").unwrap().offset, 0);
        assert_eq!(layout.total_size(), 4);
    }

    #[test]
    fn test_empty_base_and_same_type_member_get_distinct_addresses() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);

        let e = registry.declare("E", TypeKind::Struct);
        registry.finalize(e, &config).unwrap();

        let s = registry.declare("S", TypeKind::Struct);
        {
            let layout = registry.layout_mut(s);
            layout.add_base_class("E", e, AccessSpecifier::Public, false);
            layout.add_member(MemberDecl::new("e", "E", e, 1, 1));
        }
        registry.finalize(s, &config).unwrap();

        let layout = registry.layout(s).unwrap();
        assert_eq!(layout.bases()[0].offset, Some(0));
        assert_eq!(layout.member("e").unwrap().offset, 1);
        assert_eq!(layout.total_size(), 2);

        // The clash also counts through a member's own empty base.
        let f = registry.declare("F", TypeKind::Struct);
        let member = int_member(&registry, "x");
        {
            let layout = registry.layout_mut(f);
            layout.add_base_class("E", e, AccessSpecifier::Public, false);
            layout.add_member(member);
        }
        registry.finalize(f, &config).unwrap();
        assert_eq!(registry.layout(f).unwrap().total_size(), 4);

        let t = registry.declare("T", TypeKind::Struct);
        {
            let layout = registry.layout_mut(t);
            layout.add_base_class("E", e, AccessSpecifier::Public, false);
            layout.add_member(MemberDecl::new("f", "F", f, 4, 4));
        }
        registry.finalize(t, &config).unwrap();

        let layout = registry.layout(t).unwrap();
        assert_eq!(layout.member("f").unwrap().offset, 4);
        assert_eq!(layout.total_size(), 8);
    }

    #[test]
    fn test_collect_virtual_bases_preorder() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);

        let a = registry.declare("A", TypeKind::Struct);
        let member = int_member(&registry, "a");
        registry.layout_mut(a).add_member(member);
        registry.finalize(a, &config).unwrap();

        let b = registry.declare("B", TypeKind::Struct);
        registry.layout_mut(b).add_base_class("A", a, AccessSpecifier::Public, true);
        registry.finalize(b, &config).unwrap();

        let z = registry.declare("Z", TypeKind::Struct);
        registry.finalize(z, &config).unwrap();

        let d = registry.declare("D", TypeKind::Struct);
        {
            let layout = registry.layout_mut(d);
            layout.add_base_class("B", b, AccessSpecifier::Public, true);
            layout.add_base_class("Z", z, AccessSpecifier::Public, true);
        }

        let engine = BaseClassLayoutEngine::new(&registry);
        let order = engine.collect_virtual_bases(registry.layout(d).unwrap());
        assert_eq!(order, vec![b, a, z]);
    }
}
