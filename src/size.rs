//-
// Copyright 2017 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Byte widths of the primitive wire shapes, and selection of the minimal
//! width able to carry an integer range or an enumeration index.

/// Width in bytes of a serialized `bool`.
pub const BOOL: usize = 1;
/// Width in bytes of a serialized 8-bit integer.
pub const INT8: usize = 1;
/// Width in bytes of a serialized 16-bit integer.
pub const INT16: usize = 2;
/// Width in bytes of a serialized 31-bit or 32-bit integer.
pub const INT32: usize = 4;
/// Width in bytes of a serialized 64-bit integer.
pub const INT64: usize = 8;
/// Width in bytes of a serialized binary64 float.
pub const FLOAT: usize = 8;

/// The smallest integer a 31-bit signed value can hold.
pub const MIN_INT31: i64 = -(1 << 30);
/// The largest integer a 31-bit signed value can hold.
pub const MAX_INT31: i64 = (1 << 30) - 1;

/// Width of the numeric tag prefixing a union case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagSize {
    /// One-byte tags, values 0..=255.
    Uint8,
    /// Two-byte big-endian tags, values 0..=65535.
    Uint16,
}

impl TagSize {
    /// Number of bytes a tag of this width occupies on the wire.
    pub fn bytes(self) -> usize {
        match self {
            TagSize::Uint8 => 1,
            TagSize::Uint16 => 2,
        }
    }

    /// The largest tag representable at this width.
    pub fn max_tag(self) -> u16 {
        match self {
            TagSize::Uint8 => 0xFF,
            TagSize::Uint16 => 0xFFFF,
        }
    }
}

/// Width of a length prefix inserted by `dynamic_size`, or of an
/// enumeration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeWidth {
    /// One byte, lengths 0..=255.
    Uint8,
    /// Two bytes big-endian, lengths 0..=65535.
    Uint16,
    /// Four bytes, a big-endian signed 32-bit quantity restricted to
    /// 0..=2^30-1. Negative values are invalid on the wire.
    Uint30,
}

impl SizeWidth {
    /// Number of bytes a prefix of this width occupies on the wire.
    pub fn bytes(self) -> usize {
        match self {
            SizeWidth::Uint8 => 1,
            SizeWidth::Uint16 => 2,
            SizeWidth::Uint30 => 4,
        }
    }

    /// The largest length representable at this width.
    pub fn max_value(self) -> usize {
        match self {
            SizeWidth::Uint8 => 0xFF,
            SizeWidth::Uint16 => 0xFFFF,
            SizeWidth::Uint30 => MAX_INT31 as usize,
        }
    }
}

/// Concrete serialized width of a range-restricted integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IntWidth {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int31,
}

impl IntWidth {
    /// Number of bytes this width occupies on the wire.
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::Int8 | IntWidth::Uint8 => 1,
            IntWidth::Int16 | IntWidth::Uint16 => 2,
            IntWidth::Int31 => 4,
        }
    }
}

/// Selects the narrowest width able to carry every integer in
/// `minimum..=maximum`.
///
/// When `minimum > 0` the values are offset by `minimum` before writing, so
/// the width only has to span `0..=maximum-minimum` and the unsigned widths
/// are preferred. Callers must have already clamped the bounds to the
/// 31-bit range.
pub fn range_width(minimum: i64, maximum: i64) -> IntWidth {
    debug_assert!(minimum <= maximum);

    if minimum > 0 {
        let span = maximum - minimum;
        if span <= 0xFF {
            IntWidth::Uint8
        } else if span <= 0xFFFF {
            IntWidth::Uint16
        } else {
            IntWidth::Int31
        }
    } else if minimum >= -128 && maximum <= 127 {
        IntWidth::Int8
    } else if minimum >= 0 && maximum <= 0xFF {
        IntWidth::Uint8
    } else if minimum >= -32768 && maximum <= 32767 {
        IntWidth::Int16
    } else if minimum >= 0 && maximum <= 0xFFFF {
        IntWidth::Uint16
    } else {
        IntWidth::Int31
    }
}

/// Selects the narrowest width able to index an enumeration of
/// `cardinality` entries.
pub fn enum_width(cardinality: usize) -> SizeWidth {
    if cardinality <= 256 {
        SizeWidth::Uint8
    } else if cardinality <= 65536 {
        SizeWidth::Uint16
    } else {
        SizeWidth::Uint30
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn widths_for_signed_ranges() {
        assert_eq!(IntWidth::Int8, range_width(-5, 10));
        assert_eq!(IntWidth::Int8, range_width(-128, 127));
        assert_eq!(IntWidth::Int16, range_width(-129, 0));
        assert_eq!(IntWidth::Int16, range_width(-32768, 32767));
        assert_eq!(IntWidth::Int31, range_width(-32769, 0));
        assert_eq!(IntWidth::Int31, range_width(MIN_INT31, MAX_INT31));
    }

    #[test]
    fn widths_for_unsigned_ranges() {
        assert_eq!(IntWidth::Int8, range_width(0, 127));
        assert_eq!(IntWidth::Uint8, range_width(0, 255));
        assert_eq!(IntWidth::Int16, range_width(0, 256));
        assert_eq!(IntWidth::Uint16, range_width(0, 65535));
        assert_eq!(IntWidth::Int31, range_width(0, 65536));
    }

    #[test]
    fn widths_for_offset_ranges() {
        assert_eq!(IntWidth::Uint8, range_width(1, 256));
        assert_eq!(IntWidth::Uint16, range_width(100, 400));
        assert_eq!(IntWidth::Uint16, range_width(1, 65536));
        assert_eq!(IntWidth::Int31, range_width(1, 65538));
    }

    #[test]
    fn widths_for_enums() {
        assert_eq!(SizeWidth::Uint8, enum_width(2));
        assert_eq!(SizeWidth::Uint8, enum_width(256));
        assert_eq!(SizeWidth::Uint16, enum_width(257));
        assert_eq!(SizeWidth::Uint16, enum_width(65536));
        assert_eq!(SizeWidth::Uint30, enum_width(65537));
    }
}
