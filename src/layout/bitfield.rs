// Fri Oct 16 2026 - Alex

use crate::layout::alignment::round_up;
use crate::registry::TypeIndex;

/// The storage unit that consecutive compatible bitfields are packed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldUnit {
    pub offset: usize,
    pub size: usize,
    pub alignment: usize,
    pub type_index: TypeIndex,
    pub bits_used: u32,
}

impl BitfieldUnit {
    pub fn storage_bits(&self) -> u32 {
        (self.size * 8) as u32
    }

    /// First byte not touched by any bit packed so far.
    pub fn used_end(&self) -> usize {
        self.offset + (self.bits_used as usize).div_ceil(8)
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    fn accepts(&self, size: usize, alignment: usize, type_index: TypeIndex, width: u32) -> bool {
        self.size == size
            && self.alignment == alignment
            && self.type_index == type_index
            && self.bits_used + width <= self.storage_bits()
    }
}

/// Cursor over the in-progress bitfield unit, either open or closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitfieldCursor {
    active: Option<BitfieldUnit>,
}

impl BitfieldCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&BitfieldUnit> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn close(&mut self) {
        self.active = None;
    }

    /// Packs `width` bits into the open unit if it has the same storage
    /// type and enough room. Returns the unit and the bit offset assigned.
    pub fn try_pack(
        &mut self,
        size: usize,
        alignment: usize,
        type_index: TypeIndex,
        width: u32,
    ) -> Option<(BitfieldUnit, u32)> {
        let unit = self.active.as_mut()?;
        if !unit.accepts(size, alignment, type_index, width) {
            return None;
        }
        let bit_offset = unit.bits_used;
        unit.bits_used += width;
        Some((*unit, bit_offset))
    }

    /// Opens a fresh unit at `offset` with its first `width` bits taken.
    pub fn open(
        &mut self,
        offset: usize,
        size: usize,
        alignment: usize,
        type_index: TypeIndex,
        width: u32,
    ) -> BitfieldUnit {
        let unit = BitfieldUnit {
            offset,
            size,
            alignment,
            type_index,
            bits_used: width,
        };
        self.active = Some(unit);
        unit
    }

    /// Offset inside the open unit's unused trailing bytes where an ordinary
    /// member of the given size and alignment fits, if any.
    pub fn tail_slot(&self, size: usize, alignment: usize) -> Option<usize> {
        let unit = self.active.as_ref()?;
        let offset = round_up(unit.used_end(), alignment);
        (offset + size <= unit.end()).then_some(offset)
    }
}
