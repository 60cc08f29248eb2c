// Fri Oct 16 2026 - Alex

pub mod alignment;
pub mod error;
pub mod member;
pub mod bitfield;
pub mod builder;
pub mod record;
pub mod inheritance;
pub mod vtable;
pub mod rtti;
pub mod finalizer;
pub mod validator;
pub mod serializer;

pub use alignment::Alignment;
pub use error::{ErrorKind, LayoutError};
pub use member::{AccessSpecifier, BaseClassSpecifier, BitfieldPlacement, DataMember, FunctionKind, MemberDecl, MemberFunction, StaticMember, VirtualBase};
pub use bitfield::{BitfieldCursor, BitfieldUnit};
pub use builder::{MemberBuilder, Placement};
pub use record::{LayoutState, StructKind, StructLayout};
pub use inheritance::BaseClassLayoutEngine;
pub use vtable::{FunctionRef, SecondaryVTable, VTable, VTableBuilder, VTableSlot};
pub use rtti::{RttiBuilder, RttiDescriptors};
pub use finalizer::LayoutFinalizer;
pub use validator::{LayoutValidator, ValidationError, Violation};
pub use serializer::SerializableLayout;
