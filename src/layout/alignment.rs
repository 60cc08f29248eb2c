// Fri Oct 16 2026 - Alex

use std::fmt;

/// Rounds `offset` up to the next multiple of `alignment`. An alignment of
/// zero is treated as one.
pub fn round_up(offset: usize, alignment: usize) -> usize {
    let alignment = alignment.max(1);
    offset.div_ceil(alignment) * alignment
}

/// Applies a `#pragma pack` cap to a natural alignment.
pub fn effective_alignment(natural: usize, pack: Option<usize>) -> usize {
    let natural = natural.max(1);
    match pack {
        Some(pack) if pack > 0 => natural.min(pack),
        _ => natural,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Alignment {
    value: usize,
}

impl Alignment {
    pub fn new(value: usize) -> Self {
        assert!(value > 0 && value.is_power_of_two(), "alignment {} is not a power of two", value);
        Self { value }
    }

    pub fn one() -> Self {
        Self::new(1)
    }

    pub fn as_usize(&self) -> usize {
        self.value
    }

    pub fn align(&self, offset: usize) -> usize {
        round_up(offset, self.value)
    }

    pub fn max(self, other: Self) -> Self {
        if other.value > self.value { other } else { self }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::one()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
