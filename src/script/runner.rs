// Sat Oct 17 2026 - Alex

use crate::config::TargetConfig;
use crate::layout::{FunctionKind, LayoutError, MemberDecl, MemberFunction, StaticMember, StructKind};
use crate::registry::{TypeIndex, TypeKind, TypeRegistry};
use crate::script::{FunctionEntry, MemberEntry, Script, ScriptError, StaticEntry, TypeEntry};
use log::{debug, info};

/// Finalization result of one scripted type.
#[derive(Debug, Clone)]
pub struct TypeOutcome {
    pub name: String,
    pub index: TypeIndex,
    pub result: Result<(), LayoutError>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptReport {
    pub outcomes: Vec<TypeOutcome>,
    /// Types not processed because an earlier type failed to finalize.
    pub skipped: Vec<String>,
}

impl ScriptReport {
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TypeOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

struct Resolved {
    size: usize,
    alignment: usize,
    index: TypeIndex,
}

impl Script {
    /// Declares and finalizes every type in order. The first layout error
    /// stops the run: later types may depend on the failed one.
    pub fn run(&self, registry: &mut TypeRegistry, config: &TargetConfig) -> Result<ScriptReport, ScriptError> {
        let mut report = ScriptReport::default();

        for (position, entry) in self.types.iter().enumerate() {
            let index = declare(entry, registry, config)?;
            let result = registry.finalize(index, config);
            let failed = result.is_err();
            debug!("{}: {}", entry.name, if failed { "failed" } else { "finalized" });
            report.outcomes.push(TypeOutcome {
                name: entry.name.clone(),
                index,
                result,
            });

            if failed {
                report.skipped = self.types[position + 1..].iter().map(|t| t.name.clone()).collect();
                if !report.skipped.is_empty() {
                    info!("{} later type(s) skipped after {} failed", report.skipped.len(), entry.name);
                }
                break;
            }
        }
        Ok(report)
    }
}

/// Resolves everything an entry refers to, then replays it as the ordered
/// append calls of a parser. Nothing is declared if resolution fails.
fn declare(entry: &TypeEntry, registry: &mut TypeRegistry, config: &TargetConfig) -> Result<TypeIndex, ScriptError> {
    if registry.lookup(&entry.name).is_some() {
        return Err(ScriptError::Redeclared(entry.name.clone()));
    }
    for (what, value) in [("alignas", entry.alignas), ("pack", entry.pack)] {
        if let Some(value) = value {
            if !value.is_power_of_two() {
                return Err(ScriptError::InvalidAlignment {
                    owner: entry.name.clone(),
                    what,
                    value,
                });
            }
        }
    }

    let default_access = entry.kind.default_access();
    let mut bases = Vec::new();
    for base in &entry.bases {
        let index = registry.lookup(&base.name).ok_or_else(|| ScriptError::UnknownType {
            owner: entry.name.clone(),
            type_name: base.name.clone(),
        })?;
        let record = registry.get(index);
        if !record.kind.is_record() {
            return Err(ScriptError::NotARecord {
                owner: entry.name.clone(),
                base: base.name.clone(),
            });
        }
        if !record.is_complete() {
            return Err(ScriptError::IncompleteType {
                owner: entry.name.clone(),
                type_name: base.name.clone(),
            });
        }
        bases.push((base, index));
    }

    let members = entry
        .members
        .iter()
        .map(|member| member_decl(entry, member, registry, config))
        .collect::<Result<Vec<_>, _>>()?;
    let statics = entry
        .statics
        .iter()
        .map(|s| static_member(entry, s, registry, config))
        .collect::<Result<Vec<_>, _>>()?;

    let kind = match entry.kind {
        StructKind::Struct => TypeKind::Struct,
        StructKind::Class => TypeKind::Class,
        StructKind::Union => TypeKind::Union,
    };
    let index = registry.declare(&entry.name, kind);
    let layout = registry.layout_mut(index);

    if let Some(pack) = entry.pack {
        layout.set_pack_alignment(pack);
    }
    if let Some(alignment) = entry.alignas {
        layout.set_custom_alignment(alignment);
    }
    if entry.is_final {
        layout.set_final();
    }
    for (base, base_index) in bases {
        layout.add_base_class(&base.name, base_index, base.access.unwrap_or(default_access), base.is_virtual);
    }
    for member in members {
        layout.add_member(member);
    }
    for member in statics {
        layout.add_static_member(member);
    }
    for function in &entry.functions {
        let function = member_function(entry, function);
        match function.kind {
            FunctionKind::Constructor => layout.add_constructor(function),
            FunctionKind::Destructor => layout.add_destructor(function),
            FunctionKind::Operator => layout.add_operator_overload(function),
            FunctionKind::Method => layout.add_member_function(function),
        }
    }
    Ok(index)
}

fn resolve(
    owner: &str,
    type_name: &str,
    indirect: bool,
    registry: &TypeRegistry,
    config: &TargetConfig,
) -> Result<Resolved, ScriptError> {
    // A type may point at itself before it is declared.
    let pending = (indirect && type_name == owner).then(|| registry.next_index());
    let index = registry
        .lookup(type_name)
        .or(pending)
        .ok_or_else(|| ScriptError::UnknownType {
            owner: owner.to_string(),
            type_name: type_name.to_string(),
        })?;
    if indirect {
        return Ok(Resolved {
            size: config.pointer_size,
            alignment: config.pointer_alignment,
            index,
        });
    }

    let record = registry.get(index);
    if !record.is_complete() {
        return Err(ScriptError::IncompleteType {
            owner: owner.to_string(),
            type_name: type_name.to_string(),
        });
    }
    Ok(Resolved {
        size: record.size(),
        alignment: record.alignment,
        index,
    })
}

fn member_decl(
    entry: &TypeEntry,
    member: &MemberEntry,
    registry: &TypeRegistry,
    config: &TargetConfig,
) -> Result<MemberDecl, ScriptError> {
    let indirect = member.pointer > 0 || member.reference;
    let resolved = resolve(&entry.name, &member.type_name, indirect, registry, config)?;
    let count: usize = member.array.iter().product();

    let mut decl = MemberDecl::new(
        &member.name,
        &member.type_name,
        resolved.index,
        resolved.size * count,
        resolved.alignment,
    )
    .with_access(member.access.unwrap_or(entry.kind.default_access()))
    .with_array(member.array.clone())
    .with_pointer_depth(member.pointer);
    if member.reference {
        decl = decl.with_reference();
    }
    if let Some(init) = &member.init {
        decl = decl.with_default_init(init);
    }

    if let Some(bits) = member.bits {
        let integral = !indirect
            && member.array.is_empty()
            && registry.get(resolved.index).kind == TypeKind::Builtin
            && !matches!(registry.get(resolved.index).name.as_str(), "float" | "double" | "void*");
        if !integral {
            return Err(ScriptError::InvalidBitfield {
                owner: entry.name.clone(),
                member: member.name.clone(),
                type_name: member.type_name.clone(),
            });
        }
        decl = decl.with_bitfield(bits);
    }
    Ok(decl)
}

fn static_member(
    entry: &TypeEntry,
    member: &StaticEntry,
    registry: &TypeRegistry,
    config: &TargetConfig,
) -> Result<StaticMember, ScriptError> {
    let resolved = resolve(&entry.name, &member.type_name, false, registry, config)?;
    let mut result = StaticMember::new(&member.name, &member.type_name, resolved.index, resolved.size, resolved.alignment)
        .with_access(member.access.unwrap_or(entry.kind.default_access()));
    if let Some(init) = &member.init {
        result = result.with_initializer(init);
    }
    Ok(result)
}

fn member_function(entry: &TypeEntry, function: &FunctionEntry) -> MemberFunction {
    let name = function.name.as_deref().unwrap_or("");
    let mut result = match function.kind {
        FunctionKind::Constructor => MemberFunction::constructor(&entry.name),
        FunctionKind::Destructor => MemberFunction::destructor(&entry.name),
        FunctionKind::Operator => MemberFunction::operator(name.trim_start_matches("operator")),
        FunctionKind::Method => MemberFunction::new(name),
    };
    if let Some(return_type) = &function.return_type {
        result.return_type = return_type.clone();
    }
    result.parameters = function.params.clone();
    result = result.with_access(function.access.unwrap_or(entry.kind.default_access()));
    if function.is_virtual {
        result = result.with_virtual();
    }
    if function.is_pure {
        result = result.with_pure();
    }
    if function.is_override {
        result = result.with_override();
    }
    if function.is_final {
        result = result.with_final();
    }
    if function.is_const {
        result = result.with_const();
    }
    if function.is_static {
        result = result.with_static();
    }
    result
}
