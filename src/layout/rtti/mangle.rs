// Sat Oct 17 2026 - Alex

use crate::layout::StructKind;

fn components(name: &str) -> Vec<&str> {
    name.split("::").filter(|part| !part.is_empty()).collect()
}

/// Itanium `<name>` production for a (possibly nested) class name:
/// `A` becomes `1A`, `ns::A` becomes `N2ns1AE`.
pub fn itanium_type_name(name: &str) -> String {
    let parts = components(name);
    let encoded: String = parts.iter().map(|p| format!("{}{}", p.len(), p)).collect();
    if parts.len() > 1 {
        format!("N{}E", encoded)
    } else {
        encoded
    }
}

/// Decorated name stored in an MSVC `TypeDescriptor`, e.g. `.?AVA@@` for
/// `class A` or `.?AUB@ns@@` for `struct ns::B`.
pub fn msvc_type_descriptor_name(name: &str, kind: StructKind) -> String {
    let tag = match kind {
        StructKind::Class => 'V',
        StructKind::Struct => 'U',
        StructKind::Union => 'T',
    };
    let mut parts = components(name);
    parts.reverse();
    format!(".?A{}{}@@", tag, parts.join("@"))
}
