// Fri Oct 16 2026 - Alex

use crate::config::{Abi, TargetConfig};
use crate::layout::{LayoutError, LayoutFinalizer, StructLayout};
use crate::registry::{TypeIndex, TypeKind, TypeRecord};
use indexmap::IndexMap;
use log::debug;

/// Append-only store of every type declared during a run.
///
/// Records live in a single growable vector and are addressed by
/// [`TypeIndex`]; nothing is ever removed, so indices handed to layouts,
/// vtable slots and RTTI descriptors remain valid until the registry is
/// dropped.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: Vec<TypeRecord>,
    by_name: IndexMap<String, TypeIndex>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the fundamental types of the
    /// given target.
    pub fn with_builtins(config: &TargetConfig) -> Self {
        let mut registry = Self::new();
        let long = config.long_size();
        let ptr = config.pointer_size;
        let wchar = if config.abi == Abi::Msvc { 2 } else { 4 };
        let builtins: [(&str, usize, usize); 18] = [
            ("bool", 1, 1),
            ("char", 1, 1),
            ("signed char", 1, 1),
            ("unsigned char", 1, 1),
            ("short", 2, 2),
            ("unsigned short", 2, 2),
            ("int", 4, 4),
            ("unsigned int", 4, 4),
            ("long", long, long),
            ("unsigned long", long, long),
            ("long long", 8, 8),
            ("unsigned long long", 8, 8),
            ("float", 4, 4),
            ("double", 8, 8),
            ("wchar_t", wchar, wchar),
            ("char16_t", 2, 2),
            ("char32_t", 4, 4),
            ("void*", ptr, config.pointer_alignment),
        ];
        for (name, size, align) in builtins {
            registry.declare_builtin(name, size, align);
        }

        let spellings = [
            ("unsigned", "unsigned int"),
            ("signed", "int"),
            ("signed int", "int"),
            ("short int", "short"),
            ("signed short", "short"),
            ("unsigned short int", "unsigned short"),
            ("long int", "long"),
            ("signed long", "long"),
            ("unsigned long int", "unsigned long"),
            ("long long int", "long long"),
            ("signed long long", "long long"),
            ("unsigned long long int", "unsigned long long"),
        ];
        for (alias, name) in spellings {
            if let Some(index) = registry.lookup(name) {
                registry.alias(alias, index);
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index the next newly declared name will receive.
    pub fn next_index(&self) -> TypeIndex {
        TypeIndex::new(self.records.len())
    }

    /// Declares a type, returning the existing index if the name is known.
    pub fn declare(&mut self, name: &str, kind: TypeKind) -> TypeIndex {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }

        let index = TypeIndex::new(self.records.len());
        let layout = kind
            .struct_kind()
            .map(|struct_kind| StructLayout::new(name, index, struct_kind));
        self.records.push(TypeRecord {
            name: name.to_string(),
            kind,
            index,
            size_in_bits: 0,
            alignment: 1,
            layout,
        });
        self.by_name.insert(name.to_string(), index);
        debug!("declared {:?} {} as {}", kind, name, index);
        index
    }

    pub fn declare_builtin(&mut self, name: &str, size: usize, alignment: usize) -> TypeIndex {
        let index = self.declare(name, TypeKind::Builtin);
        let record = &mut self.records[index.as_usize()];
        record.size_in_bits = size as u64 * 8;
        record.alignment = alignment.max(1);
        index
    }

    /// Makes `alias` another spelling of an already declared type. Both
    /// names resolve to the same record and compare equal as types.
    pub fn alias(&mut self, alias: &str, index: TypeIndex) {
        assert!(
            self.lookup(alias).map_or(true, |existing| existing == index),
            "{} already names {}",
            alias,
            self.get(self.by_name[alias]).name
        );
        self.by_name.insert(alias.to_string(), index);
    }

    pub fn lookup(&self, name: &str) -> Option<TypeIndex> {
        self.by_name.get(name).copied()
    }

    /// Panics on an index this registry never handed out.
    pub fn get(&self, index: TypeIndex) -> &TypeRecord {
        self.records
            .get(index.as_usize())
            .unwrap_or_else(|| panic!("unknown type index {}", index))
    }

    pub fn try_get(&self, index: TypeIndex) -> Option<&TypeRecord> {
        self.records.get(index.as_usize())
    }

    pub fn records(&self) -> impl Iterator<Item = &TypeRecord> {
        self.records.iter()
    }

    pub fn layout(&self, index: TypeIndex) -> Option<&StructLayout> {
        self.get(index).layout.as_ref()
    }

    /// Mutable access for the append calls of the parser. Panics once the
    /// layout has left the unfinalized state.
    pub fn layout_mut(&mut self, index: TypeIndex) -> &mut StructLayout {
        let record = self
            .records
            .get_mut(index.as_usize())
            .unwrap_or_else(|| panic!("unknown type index {}", index));
        let name = &record.name;
        match record.layout.as_mut() {
            Some(layout) => {
                assert!(!layout.is_frozen(), "layout of {} mutated after finalization", name);
                layout
            }
            None => panic!("{} is not a record type", name),
        }
    }

    /// Layout of a base class; the base must already be finalized.
    pub(crate) fn finalized_layout(&self, index: TypeIndex) -> &StructLayout {
        let record = self.get(index);
        match record.layout.as_ref() {
            Some(layout) if layout.is_finalized() => layout,
            Some(_) => panic!("{} used as a base before it was finalized", record.name),
            None => panic!("{} is not a record type", record.name),
        }
    }

    /// Runs the layout finalizer over one record. The layout is taken out of
    /// its slot for the duration so the finalizer can read base layouts from
    /// the same registry.
    pub fn finalize(&mut self, index: TypeIndex, config: &TargetConfig) -> Result<(), LayoutError> {
        let slot = self
            .records
            .get_mut(index.as_usize())
            .unwrap_or_else(|| panic!("unknown type index {}", index));
        let mut layout = match slot.layout.take() {
            Some(layout) => layout,
            None => panic!("{} is not a record type", slot.name),
        };

        let result = LayoutFinalizer::new(self, config).finalize(&mut layout);

        let record = &mut self.records[index.as_usize()];
        if result.is_ok() {
            record.size_in_bits = layout.total_size() as u64 * 8;
            record.alignment = layout.alignment();
        }
        record.layout = Some(layout);
        result
    }
}
