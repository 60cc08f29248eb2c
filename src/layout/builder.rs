// Fri Oct 16 2026 - Alex

use crate::layout::alignment::{effective_alignment, round_up};
use crate::layout::{BitfieldCursor, BitfieldPlacement, MemberDecl};
use log::trace;

/// Result of placing one data member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset: usize,
    pub bitfield: Option<BitfieldPlacement>,
}

/// Places data members one at a time, in declaration order, against a
/// running size, alignment and bitfield cursor.
#[derive(Debug, Clone)]
pub struct MemberBuilder {
    size: usize,
    alignment: usize,
    pack: Option<usize>,
    is_union: bool,
    cursor: BitfieldCursor,
}

impl MemberBuilder {
    pub fn new(is_union: bool, pack: Option<usize>) -> Self {
        Self::resume(0, 1, is_union, pack)
    }

    /// Continues placement after `size` bytes already occupied, e.g. by
    /// base class subobjects.
    pub fn resume(size: usize, alignment: usize, is_union: bool, pack: Option<usize>) -> Self {
        Self {
            size,
            alignment: alignment.max(1),
            pack,
            is_union,
            cursor: BitfieldCursor::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn cursor(&self) -> &BitfieldCursor {
        &self.cursor
    }

    pub fn set_pack(&mut self, pack: Option<usize>) {
        self.pack = pack;
    }

    pub fn place(&mut self, decl: &MemberDecl) -> Placement {
        let align = effective_alignment(decl.alignment, self.pack);
        let placement = if self.is_union {
            self.place_in_union(decl)
        } else if let Some(width) = decl.bitfield_width {
            self.place_bitfield(decl, width, align)
        } else {
            self.place_field(decl, align)
        };
        self.alignment = self.alignment.max(align);
        trace!(
            "placed {} at 0x{:X} (size {}, running size {})",
            decl.name,
            placement.offset,
            decl.size,
            self.size
        );
        placement
    }

    /// Places a member like [`place`](Self::place), then moves it up by its
    /// alignment while `conflicts` rejects the offset.
    pub fn place_clear_of(&mut self, decl: &MemberDecl, conflicts: impl Fn(usize) -> bool) -> Placement {
        let placement = self.place(decl);
        if self.is_union || decl.bitfield_width.is_some() || !conflicts(placement.offset) {
            return placement;
        }

        let align = effective_alignment(decl.alignment, self.pack);
        let mut offset = placement.offset + align;
        while conflicts(offset) {
            offset += align;
        }
        self.size = self.size.max(offset + decl.size);
        trace!("{} moved to 0x{:X}, clear of a same-type subobject", decl.name, offset);
        Placement { offset, bitfield: None }
    }

    fn place_in_union(&mut self, decl: &MemberDecl) -> Placement {
        let bitfield = decl.bitfield_width.map(|width| {
            let width = width.min((decl.size * 8) as u32);
            BitfieldPlacement {
                unit_offset: 0,
                unit_size: if width == 0 { 0 } else { decl.size },
                bit_offset: 0,
                width,
            }
        });
        if bitfield.map_or(true, |bits| !bits.is_barrier()) {
            self.size = self.size.max(decl.size);
        }
        Placement { offset: 0, bitfield }
    }

    fn place_field(&mut self, decl: &MemberDecl, align: usize) -> Placement {
        if let Some(offset) = self.cursor.tail_slot(decl.size, align) {
            trace!("{} reuses trailing bytes of the open bitfield unit", decl.name);
            self.cursor.close();
            return Placement { offset, bitfield: None };
        }

        self.cursor.close();
        let offset = round_up(self.size, align);
        self.size = offset + decl.size;
        Placement { offset, bitfield: None }
    }

    fn place_bitfield(&mut self, decl: &MemberDecl, width: u32, align: usize) -> Placement {
        let storage_bits = (decl.size * 8) as u32;
        let width = width.min(storage_bits);

        if width == 0 {
            self.size = round_up(self.size, align);
            self.cursor.close();
            return Placement {
                offset: self.size,
                bitfield: Some(BitfieldPlacement {
                    unit_offset: self.size,
                    unit_size: 0,
                    bit_offset: 0,
                    width: 0,
                }),
            };
        }

        let (unit, bit_offset) = match self.cursor.try_pack(decl.size, align, decl.type_index, width) {
            Some(packed) => packed,
            None => {
                let offset = round_up(self.size, align);
                self.size = offset + decl.size;
                trace!("{} opens a {}-byte bitfield unit at 0x{:X}", decl.name, decl.size, offset);
                (self.cursor.open(offset, decl.size, align, decl.type_index, width), 0)
            }
        };

        Placement {
            offset: unit.offset,
            bitfield: Some(BitfieldPlacement {
                unit_offset: unit.offset,
                unit_size: unit.size,
                bit_offset,
                width,
            }),
        }
    }
}
