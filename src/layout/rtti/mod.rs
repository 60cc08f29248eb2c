// Sat Oct 17 2026 - Alex

pub mod itanium;
pub mod mangle;
pub mod msvc;

pub use itanium::{BaseTypeInfo, ClassTypeInfo, ItaniumTypeInfo, SiClassTypeInfo, VmiClassTypeInfo, VmiFlags};
pub use msvc::{
    BaseClassDescriptor, BcdAttributes, ChdAttributes, ClassHierarchyDescriptor, CompleteObjectLocator, MsvcRtti,
    PmdDisplacement, TypeDescriptor,
};

use crate::config::TargetConfig;
use crate::layout::StructLayout;
use crate::registry::TypeRegistry;
use log::debug;

/// Both ABI shapes of a class's run-time type information, derived from the
/// same finalized base list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RttiDescriptors {
    pub itanium: ItaniumTypeInfo,
    /// Only polymorphic classes get MSVC descriptors.
    pub msvc: Option<MsvcRtti>,
}

impl RttiDescriptors {
    pub fn disabled() -> Self {
        Self {
            itanium: ItaniumTypeInfo::None,
            msvc: None,
        }
    }
}

pub struct RttiBuilder<'a> {
    registry: &'a TypeRegistry,
    config: &'a TargetConfig,
}

impl<'a> RttiBuilder<'a> {
    pub fn new(registry: &'a TypeRegistry, config: &'a TargetConfig) -> Self {
        Self { registry, config }
    }

    /// `vptr_shift` is the displacement the finalizer is about to apply to
    /// this layout's own subobjects; descriptors are expressed in final
    /// offsets.
    pub fn build(&self, layout: &StructLayout, vptr_shift: usize) -> RttiDescriptors {
        if !self.config.rtti {
            return RttiDescriptors::disabled();
        }

        let itanium = itanium::build(self.registry, layout, vptr_shift, self.config.pointer_size);
        let msvc = msvc::build(self.registry, layout, vptr_shift, self.config.pointer_size);
        debug!(
            "{}: rtti uses {}{}",
            layout.name(),
            itanium.kind_name(),
            if msvc.is_some() { " + MSVC locator" } else { "" }
        );
        RttiDescriptors { itanium, msvc }
    }
}
