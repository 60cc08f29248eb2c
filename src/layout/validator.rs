// Sat Oct 17 2026 - Alex

use crate::config::TargetConfig;
use crate::layout::alignment::round_up;
use crate::layout::StructLayout;
use itertools::Itertools;
use std::fmt;
use thiserror::Error;

/// One broken post-finalization invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NotFinalized,
    SizeNotMultipleOfAlignment { size: usize, alignment: usize },
    UnionMemberOffset { member: String, offset: usize },
    UnionSize { size: usize, expected: usize },
    Overlap { first: String, second: String },
    MemberOverlapsVptr { member: String, offset: usize },
    BitfieldOverflow { member: String, end_bit: u32, unit_bits: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFinalized => write!(f, "layout is not finalized"),
            Self::SizeNotMultipleOfAlignment { size, alignment } => {
                write!(f, "size {} is not a multiple of alignment {}", size, alignment)
            }
            Self::UnionMemberOffset { member, offset } => {
                write!(f, "union member {} @ 0x{:X}, expected 0x0", member, offset)
            }
            Self::UnionSize { size, expected } => write!(f, "union size {} but largest member needs {}", size, expected),
            Self::Overlap { first, second } => write!(f, "{} overlaps {}", first, second),
            Self::MemberOverlapsVptr { member, offset } => {
                write!(f, "{} @ 0x{:X} overlaps the vptr", member, offset)
            }
            Self::BitfieldOverflow { member, end_bit, unit_bits } => {
                write!(f, "bitfield {} ends at bit {} of a {}-bit unit", member, end_bit, unit_bits)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{class}: {} layout invariant(s) violated: {}", .violations.len(), list(.violations))]
pub struct ValidationError {
    pub class: String,
    pub violations: Vec<Violation>,
}

fn list(violations: &[Violation]) -> String {
    violations.iter().join("; ")
}

/// Checks a finalized layout against the invariants every consumer relies
/// on. Reports all violations, not just the first.
pub struct LayoutValidator {
    pointer_size: usize,
}

impl LayoutValidator {
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            pointer_size: config.pointer_size,
        }
    }

    pub fn validate(&self, layout: &StructLayout) -> Result<(), ValidationError> {
        let violations = self.violations(layout);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                class: layout.name().to_string(),
                violations,
            })
        }
    }

    pub fn violations(&self, layout: &StructLayout) -> Vec<Violation> {
        if !layout.is_finalized() {
            return vec![Violation::NotFinalized];
        }

        let mut violations = Vec::new();
        let (size, alignment) = (layout.total_size(), layout.alignment());
        if size % alignment != 0 {
            violations.push(Violation::SizeNotMultipleOfAlignment { size, alignment });
        }

        if layout.is_union() {
            self.check_union(layout, &mut violations);
        } else {
            self.check_overlaps(layout, &mut violations);
        }

        if layout.is_dynamic() {
            for member in layout.members().iter().filter(|m| m.offset < self.pointer_size) {
                violations.push(Violation::MemberOverlapsVptr {
                    member: member.name().to_string(),
                    offset: member.offset,
                });
            }
        }

        for member in layout.members() {
            if let Some(bits) = member.bitfield {
                let unit_bits = (bits.unit_size * 8) as u32;
                if bits.bit_offset + bits.width > unit_bits {
                    violations.push(Violation::BitfieldOverflow {
                        member: member.name().to_string(),
                        end_bit: bits.bit_offset + bits.width,
                        unit_bits,
                    });
                }
            }
        }
        violations
    }

    fn check_union(&self, layout: &StructLayout, violations: &mut Vec<Violation>) {
        for member in layout.members().iter().filter(|m| m.offset != 0) {
            violations.push(Violation::UnionMemberOffset {
                member: member.name().to_string(),
                offset: member.offset,
            });
        }
        let largest = layout.members().iter().map(|m| m.size()).max().unwrap_or(0);
        let expected = round_up(largest.max(1), layout.alignment());
        if layout.total_size() != expected {
            violations.push(Violation::UnionSize {
                size: layout.total_size(),
                expected,
            });
        }
    }

    fn check_overlaps(&self, layout: &StructLayout, violations: &mut Vec<Violation>) {
        let fields: Vec<_> = layout
            .members()
            .iter()
            .filter(|m| !m.is_bitfield() && m.size() > 0)
            .collect();
        for (i, first) in fields.iter().enumerate() {
            for second in &fields[i + 1..] {
                if first.offset < second.end_offset() && second.offset < first.end_offset() {
                    violations.push(Violation::Overlap {
                        first: first.name().to_string(),
                        second: second.name().to_string(),
                    });
                }
            }
        }
    }
}

impl Default for LayoutValidator {
    fn default() -> Self {
        Self::new(&TargetConfig::default())
    }
}
