// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Combining code: packed description of how a mark attaches to its base
//!
//! A combining code selects an alignment point on the base glyph's box and
//! one on the mark's box, plus a small offset between them. Vertical
//! alignment points are top (0), center (1), bottom (2) and baseline (3);
//! horizontal points are left (0), center (1) and right (2). Offsets are
//! stored biased by 128 in per-mille of the font size.
//!
//! A code may instead record a raw canonical combining class ("by class");
//! such codes are resolved through [`CombiningCode::from_class`] the first
//! time the layouter meets them.

use std::fmt;

const BY_CLASS: u32 = 1 << 30;

/// Packed mark-placement code
///
/// The zero code means "not a combining glyph".
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CombiningCode(pub u32);

/// Unpacked form of an explicit [`CombiningCode`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Vertical alignment point on the base (0..=3)
    pub base_y: u8,
    /// Horizontal alignment point on the base (0..=2)
    pub base_x: u8,
    /// Vertical alignment point on the mark (0..=3)
    pub add_y: u8,
    /// Horizontal alignment point on the mark (0..=2)
    pub add_x: u8,
    /// Vertical offset, biased by 128
    pub off_y: u8,
    /// Horizontal offset, biased by 128
    pub off_x: u8,
}

impl CombiningCode {
    pub const NONE: CombiningCode = CombiningCode(0);

    /// Pack an explicit placement
    pub fn pack(base_y: u8, base_x: u8, add_y: u8, add_x: u8, off_y: u8, off_x: u8) -> Self {
        debug_assert!(base_y < 4 && add_y < 4 && base_x < 3 && add_x < 3);
        CombiningCode(
            (u32::from(base_y) << 22)
                | (u32::from(base_x) << 20)
                | (u32::from(add_y) << 18)
                | (u32::from(add_x) << 16)
                | (u32::from(off_y) << 8)
                | u32::from(off_x),
        )
    }

    /// Record a canonical combining class for later resolution
    pub fn by_class(class: u8) -> Self {
        CombiningCode(BY_CLASS | u32::from(class))
    }

    /// Whether this is a combining code at all
    #[inline]
    pub fn is_combining(self) -> bool {
        self.0 != 0
    }

    /// Whether this code still holds a raw combining class
    #[inline]
    pub fn is_by_class(self) -> bool {
        self.0 & BY_CLASS != 0
    }

    /// The raw class of a by-class code (0 for explicit codes)
    #[inline]
    pub fn class(self) -> u8 {
        if self.is_by_class() { (self.0 & 0xff) as u8 } else { 0 }
    }

    /// Unpack an explicit code
    ///
    /// By-class codes are resolved through [`Self::from_class`] first.
    pub fn unpack(self) -> Placement {
        let code = if self.is_by_class() {
            Self::from_class(self.class())
        } else {
            self
        };
        Placement {
            base_y: ((code.0 >> 22) & 3) as u8,
            base_x: ((code.0 >> 20) & 3) as u8,
            add_y: ((code.0 >> 18) & 3) as u8,
            add_x: ((code.0 >> 16) & 3) as u8,
            off_y: ((code.0 >> 8) & 0xff) as u8,
            off_x: (code.0 & 0xff) as u8,
        }
    }

    /// Map a Unicode canonical combining class to a placement code
    ///
    /// The table is script-independent; font shapers may override placement
    /// with explicit codes.
    pub fn from_class(class: u8) -> Self {
        match class {
            0 => Self::pack(3, 1, 3, 1, 128, 128),
            200 => Self::pack(2, 0, 0, 1, 128, 128), // below left attached
            202 => Self::pack(2, 1, 0, 1, 128, 128), // below attached
            204 => Self::pack(2, 2, 0, 1, 128, 128), // below right attached
            208 => Self::pack(3, 0, 3, 2, 128, 128), // left attached
            210 => Self::pack(3, 2, 3, 0, 128, 128), // right attached
            212 => Self::pack(0, 0, 2, 1, 128, 128), // above left attached
            214 => Self::pack(0, 1, 2, 1, 128, 128), // above attached
            216 => Self::pack(0, 2, 2, 1, 128, 128), // above right attached
            218 => Self::pack(2, 0, 0, 1, 122, 128), // below left
            220 => Self::pack(2, 1, 0, 1, 122, 128), // below
            222 => Self::pack(2, 2, 0, 1, 122, 128), // below right
            224 => Self::pack(3, 0, 3, 2, 128, 122), // left
            226 => Self::pack(3, 2, 3, 0, 128, 133), // right
            228 => Self::pack(0, 0, 2, 1, 133, 128), // above left
            230 => Self::pack(0, 1, 2, 1, 133, 128), // above
            232 => Self::pack(0, 2, 2, 1, 133, 128), // above right
            233 => Self::pack(2, 2, 0, 2, 122, 128), // double below
            234 => Self::pack(0, 2, 2, 2, 133, 128), // double above
            240 => Self::pack(2, 1, 0, 1, 122, 128), // iota subscript
            _ => Self::pack(0, 1, 2, 1, 133, 128),
        }
    }
}

impl fmt::Debug for CombiningCode {
    /// Compact form: vertical/horizontal point letters and signed offsets,
    /// e.g. `tc+5.Bc` for "above center, raised 5, mark bottom-center".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_combining() {
            return write!(f, "none");
        }
        let p = self.unpack();
        const VALIGN: [char; 4] = ['t', 'c', 'b', 'B'];
        const HALIGN: [char; 3] = ['l', 'c', 'r'];
        write!(f, "{}{}", VALIGN[p.base_y as usize], HALIGN[p.base_x as usize])?;
        let off_y = i32::from(p.off_y) - 128;
        let off_x = i32::from(p.off_x) - 128;
        if off_y != 0 {
            write!(f, "{off_y:+}")?;
        } else if off_x == 0 {
            write!(f, ".")?;
        }
        if off_x > 0 {
            write!(f, ">{off_x}")?;
        } else if off_x < 0 {
            write!(f, "<{}", -off_x)?;
        }
        write!(f, "{}{}", VALIGN[p.add_y as usize], HALIGN[p.add_x as usize])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        let code = CombiningCode::pack(2, 1, 0, 2, 122, 133);
        assert_eq!(
            code.unpack(),
            Placement {
                base_y: 2,
                base_x: 1,
                add_y: 0,
                add_x: 2,
                off_y: 122,
                off_x: 133,
            }
        );
        assert!(code.is_combining());
        assert!(!code.is_by_class());
    }

    #[test]
    fn by_class_resolves_on_unpack() {
        let code = CombiningCode::by_class(230);
        assert!(code.is_by_class());
        assert_eq!(code.class(), 230);
        assert_eq!(code.unpack(), CombiningCode::from_class(230).unpack());
    }

    #[test]
    fn class_table() {
        // Attached below-center: base bottom-center, mark top-center, no offset.
        let p = CombiningCode::from_class(202).unpack();
        assert_eq!((p.base_y, p.base_x, p.add_y, p.add_x), (2, 1, 0, 1));
        assert_eq!((p.off_y, p.off_x), (128, 128));

        // Above with a gap: raised by 5/1000 of the font size.
        let p = CombiningCode::from_class(230).unpack();
        assert_eq!((p.base_y, p.base_x, p.add_y, p.add_x), (0, 1, 2, 1));
        assert_eq!(p.off_y, 133);

        // Unknown non-zero classes fall back to generic above-center.
        assert_eq!(CombiningCode::from_class(91), CombiningCode::from_class(230));
        assert_eq!(CombiningCode::from_class(250), CombiningCode::from_class(230));
    }

    #[test]
    fn zero_is_not_combining() {
        assert!(!CombiningCode::NONE.is_combining());
        assert_eq!(format!("{:?}", CombiningCode::NONE), "none");
    }
}
