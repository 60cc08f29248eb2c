// Fri Oct 16 2026 - Alex

use crate::layout::{LayoutError, MemberFunction, StructLayout};
use crate::registry::{TypeIndex, TypeRegistry};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points at a member function by owning type and position in that type's
/// function list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    pub owner: TypeIndex,
    pub index: usize,
}

/// Represents a single entry in a virtual table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VTableSlot {
    pub name: String,
    /// Signature key shared by a function and all its overriders.
    pub key: String,
    /// The final overrider currently occupying the slot.
    pub function: FunctionRef,
    /// The class that first introduced this slot.
    pub introduced_by: TypeIndex,
    pub is_pure: bool,
    pub is_final: bool,
    pub is_override: bool,
}

impl VTableSlot {
    fn introduce(owner: TypeIndex, index: usize, function: &MemberFunction, is_override: bool) -> Self {
        Self {
            name: function.name.clone(),
            key: function.signature_key(),
            function: FunctionRef { owner, index },
            introduced_by: owner,
            is_pure: function.is_pure,
            is_final: function.is_final,
            is_override,
        }
    }

    /// This slot with `overrider` installed in it.
    fn overridden_by(&self, overrider: &VTableSlot) -> Self {
        Self {
            introduced_by: self.introduced_by,
            is_override: true,
            ..overrider.clone()
        }
    }
}

impl fmt::Display for VTableSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.is_override {
            write!(f, " [override]")?;
        }
        if self.is_pure {
            write!(f, " [pure]")?;
        }
        if self.is_final {
            write!(f, " [final]")?;
        }
        Ok(())
    }
}

/// Primary virtual table: slot order is the dispatch index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VTable {
    pub slots: Vec<VTableSlot>,
}

impl VTable {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VTableSlot> {
        self.slots.get(index)
    }

    /// Dispatch index of the slot named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn override_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_override).count()
    }
}

/// Virtual table of a non-primary base subobject, with the derived class's
/// overriders already substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryVTable {
    pub base: TypeIndex,
    pub offset: usize,
    pub is_virtual_base: bool,
    pub slots: Vec<VTableSlot>,
}

/// Merges inherited virtual slots with the overrides and new virtuals a
/// class declares.
pub struct VTableBuilder<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> VTableBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, layout: &mut StructLayout) -> Result<(), LayoutError> {
        if layout.is_union() {
            if let Some(function) = layout.functions.iter().find(|f| f.is_virtual) {
                return Err(LayoutError::VirtualInUnion {
                    class: layout.name.clone(),
                    function: function.name.clone(),
                });
            }
        }

        let inherited = self.inherited_slots(layout);
        let mut slots = match layout.primary_base() {
            Some(primary) => self.registry.finalized_layout(primary.type_index).vtable().slots.clone(),
            None => Vec::new(),
        };

        let mut overriders: Vec<VTableSlot> = Vec::new();
        let mut appended: Vec<VTableSlot> = Vec::new();
        for (index, function) in layout.functions.iter().enumerate() {
            if !function.can_be_virtual() {
                continue;
            }

            let key = function.signature_key();
            let matches: Vec<&VTableSlot> = inherited.iter().filter(|s| s.key == key).collect();
            if let Some(sealed) = matches.iter().find(|s| s.is_final) {
                return Err(LayoutError::FinalOverride {
                    class: layout.name.clone(),
                    function: function.name.clone(),
                    base: self.registry.get(sealed.function.owner).name.clone(),
                });
            }
            if matches.is_empty() {
                if function.is_override {
                    return Err(LayoutError::OverrideWithoutBase {
                        class: layout.name.clone(),
                        function: function.name.clone(),
                    });
                }
                if !function.is_virtual {
                    continue;
                }
            }

            let slot = VTableSlot::introduce(layout.index, index, function, !matches.is_empty());
            let mut replaced = false;
            for existing in slots.iter_mut().filter(|s| s.key == key) {
                *existing = existing.overridden_by(&slot);
                replaced = true;
            }
            if !replaced {
                appended.push(slot.clone());
            }
            overriders.push(slot);
        }
        slots.extend(appended);

        let secondary = self.secondary_vtables(layout, &overriders);
        layout.has_vtable = !slots.is_empty() || secondary.iter().any(|s| !s.slots.is_empty());
        layout.is_abstract = slots
            .iter()
            .chain(secondary.iter().flat_map(|s| s.slots.iter()))
            .any(|s| s.is_pure);

        debug!(
            "{}: vtable has {} slot(s), {} secondary vtable(s){}",
            layout.name,
            slots.len(),
            secondary.len(),
            if layout.is_abstract { ", abstract" } else { "" }
        );
        layout.vtable = VTable { slots };
        layout.secondary_vtables = secondary;
        Ok(())
    }

    /// Every virtual slot visible through any direct base.
    fn inherited_slots(&self, layout: &StructLayout) -> Vec<VTableSlot> {
        let mut inherited = Vec::new();
        for base in &layout.bases {
            let base_layout = self.registry.finalized_layout(base.type_index);
            inherited.extend(base_layout.vtable().slots.iter().cloned());
            for secondary in base_layout.secondary_vtables() {
                inherited.extend(secondary.slots.iter().cloned());
            }
        }
        inherited
    }

    fn secondary_vtables(&self, layout: &StructLayout, overriders: &[VTableSlot]) -> Vec<SecondaryVTable> {
        let substitute = |slots: &[VTableSlot]| -> Vec<VTableSlot> {
            slots
                .iter()
                .map(|slot| match overriders.iter().find(|o| o.key == slot.key) {
                    Some(overrider) => slot.overridden_by(overrider),
                    None => slot.clone(),
                })
                .collect()
        };

        let mut result = Vec::new();
        let mut non_virtual: Vec<usize> = layout.primary_base.into_iter().collect();
        non_virtual.extend((0..layout.bases.len()).filter(|&i| Some(i) != layout.primary_base && !layout.bases[i].is_virtual));

        for i in non_virtual {
            let base = &layout.bases[i];
            let base_layout = self.registry.finalized_layout(base.type_index);
            let offset = base.offset.unwrap_or(0);
            if Some(i) != layout.primary_base && base_layout.is_dynamic() {
                result.push(SecondaryVTable {
                    base: base.type_index,
                    offset,
                    is_virtual_base: false,
                    slots: substitute(&base_layout.vtable().slots),
                });
            }
            for nested in base_layout.secondary_vtables().iter().filter(|s| !s.is_virtual_base) {
                result.push(SecondaryVTable {
                    base: nested.base,
                    offset: offset + nested.offset,
                    is_virtual_base: false,
                    slots: substitute(&nested.slots),
                });
            }
        }

        for vbase in &layout.virtual_bases {
            let vbase_layout = self.registry.finalized_layout(vbase.type_index);
            if vbase_layout.is_dynamic() {
                result.push(SecondaryVTable {
                    base: vbase.type_index,
                    offset: vbase.offset,
                    is_virtual_base: true,
                    slots: substitute(&self.virtual_base_slots(layout, vbase.type_index)),
                });
            }
            for nested in vbase_layout.secondary_vtables().iter().filter(|s| !s.is_virtual_base) {
                result.push(SecondaryVTable {
                    base: nested.base,
                    offset: vbase.offset + nested.offset,
                    is_virtual_base: false,
                    slots: substitute(&nested.slots),
                });
            }
        }
        result
    }

    /// Slots of a shared virtual base as seen through the direct bases,
    /// keeping any overrider an intermediate class already installed.
    fn virtual_base_slots(&self, layout: &StructLayout, vbase: TypeIndex) -> Vec<VTableSlot> {
        let own = &self.registry.finalized_layout(vbase).vtable().slots;
        let mut slots = own.clone();
        let seen_through = layout.bases.iter().flat_map(|base| {
            self.registry
                .finalized_layout(base.type_index)
                .secondary_vtables()
                .iter()
                .filter(|s| s.is_virtual_base && s.base == vbase)
        });
        for secondary in seen_through {
            for (slot, candidate) in slots.iter_mut().zip(&secondary.slots) {
                let untouched = own.iter().any(|o| o.key == slot.key && o.function == slot.function);
                if untouched && candidate.key == slot.key {
                    *slot = candidate.clone();
                }
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::layout::{AccessSpecifier, ErrorKind, MemberDecl};
    use crate::registry::TypeKind;

    fn class_with(registry: &mut TypeRegistry, config: &TargetConfig, name: &str, bases: &[TypeIndex], functions: Vec<MemberFunction>) -> Result<TypeIndex, LayoutError> {
        let index = registry.declare(name, TypeKind::Struct);
        let int = registry.lookup("int").unwrap();
        let names: Vec<String> = bases.iter().map(|b| registry.get(*b).name.clone()).collect();
        let layout = registry.layout_mut(index);
        for (base, base_name) in bases.iter().zip(&names) {
            layout.add_base_class(base_name, *base, AccessSpecifier::Public, false);
        }
        layout.add_member(MemberDecl::new(&name.to_lowercase(), "int", int, 4, 4));
        for function in functions {
            layout.add_member_function(function);
        }
        registry.finalize(index, config).map(|_| index)
    }

    #[test]
    fn test_override_replaces_slot_in_place() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let base = class_with(&mut registry, &config, "Base", &[], vec![
            MemberFunction::new("f").with_virtual(),
            MemberFunction::new("g").with_virtual(),
        ]).unwrap();
        let derived = class_with(&mut registry, &config, "Derived", &[base], vec![
            MemberFunction::new("h").with_virtual(),
            MemberFunction::new("g").with_override(),
        ]).unwrap();

        let vtable = registry.layout(derived).unwrap().vtable();
        let names: Vec<&str> = vtable.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g", "h"]);
        assert_eq!(vtable.slots[1].function.owner, derived);
        assert_eq!(vtable.slots[1].introduced_by, base);
        assert_eq!(vtable.slots[0].function.owner, base);
        assert_eq!(vtable.override_count(), 1);
    }

    #[test]
    fn test_implicit_virtual_by_signature() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let base = class_with(&mut registry, &config, "Base", &[], vec![
            MemberFunction::new("f").with_signature("void", vec!["int"]).with_virtual(),
        ]).unwrap();
        let derived = class_with(&mut registry, &config, "Derived", &[base], vec![
            MemberFunction::new("f").with_signature("void", vec!["int"]),
            MemberFunction::new("f").with_signature("void", vec!["double"]),
        ]).unwrap();

        let vtable = registry.layout(derived).unwrap().vtable();
        assert_eq!(vtable.len(), 1);
        assert_eq!(vtable.slots[0].function.owner, derived);
    }

    #[test]
    fn test_final_override_rejected() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let base = class_with(&mut registry, &config, "Base", &[], vec![
            MemberFunction::new("f").with_virtual().with_final(),
        ]).unwrap();
        let err = class_with(&mut registry, &config, "Derived", &[base], vec![
            MemberFunction::new("f").with_override(),
        ]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FinalOverride);
        assert!(err.to_string().contains("f"));
        let derived = registry.lookup("Derived").unwrap();
        assert!(!registry.layout(derived).unwrap().finalization_error_message().is_empty());
    }

    #[test]
    fn test_override_without_base() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let err = class_with(&mut registry, &config, "Lonely", &[], vec![
            MemberFunction::new("f").with_override(),
        ]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverrideWithoutBase);
    }

    #[test]
    fn test_abstractness_follows_overrides() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let shape = class_with(&mut registry, &config, "Shape", &[], vec![
            MemberFunction::new("area").with_signature("double", vec![]).with_const().with_pure(),
            MemberFunction::destructor("Shape").with_virtual(),
        ]).unwrap();
        assert!(registry.layout(shape).unwrap().is_abstract());

        let circle = class_with(&mut registry, &config, "Circle", &[shape], vec![
            MemberFunction::new("area").with_signature("double", vec![]).with_const().with_override(),
            MemberFunction::destructor("Circle"),
        ]).unwrap();
        let layout = registry.layout(circle).unwrap();
        assert!(!layout.is_abstract());
        assert_eq!(layout.vtable().index_of("~Circle"), Some(1));
    }

    #[test]
    fn test_secondary_vtable_gets_overrider() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = class_with(&mut registry, &config, "A", &[], vec![MemberFunction::new("f").with_virtual()]).unwrap();
        let b = class_with(&mut registry, &config, "B", &[], vec![MemberFunction::new("g").with_virtual()]).unwrap();
        let c = class_with(&mut registry, &config, "C", &[a, b], vec![MemberFunction::new("g").with_override()]).unwrap();

        let layout = registry.layout(c).unwrap();
        let names: Vec<&str> = layout.vtable().slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g"]);
        assert_eq!(layout.secondary_vtables().len(), 1);
        let secondary = &layout.secondary_vtables()[0];
        assert_eq!(secondary.base, b);
        assert_eq!(secondary.offset, 16);
        assert_eq!(secondary.slots[0].function.owner, c);
    }

    #[test]
    fn test_virtual_base_keeps_intermediate_overrider() {
        let config = TargetConfig::x86_64();
        let mut registry = TypeRegistry::with_builtins(&config);
        let a = class_with(&mut registry, &config, "A", &[], vec![MemberFunction::new("f").with_pure()]).unwrap();

        let mut derive_virtually = |name: &str, functions: Vec<MemberFunction>| {
            let index = registry.declare(name, TypeKind::Struct);
            let layout = registry.layout_mut(index);
            layout.add_base_class("A", a, AccessSpecifier::Public, true);
            for function in functions {
                layout.add_member_function(function);
            }
            registry.finalize(index, &config).unwrap();
            index
        };
        let b = derive_virtually("B", vec![MemberFunction::new("f").with_override()]);
        let c = derive_virtually("C", vec![]);
        assert!(!registry.layout(b).unwrap().is_abstract());
        assert!(registry.layout(c).unwrap().is_abstract());

        let d = class_with(&mut registry, &config, "D", &[b, c], vec![]).unwrap();
        let layout = registry.layout(d).unwrap();
        assert!(!layout.is_abstract());
        let through_a = layout
            .secondary_vtables()
            .iter()
            .find(|s| s.is_virtual_base && s.base == a)
            .unwrap();
        assert_eq!(through_a.slots[0].function.owner, b);
        assert_eq!(through_a.slots[0].introduced_by, a);
        assert!(!through_a.slots[0].is_pure);
    }
}
