//! Header field layouts
//!
//! Each codec describes its header as a table of [`Field`] constants: a byte
//! offset plus a width. All multi-byte fields are big-endian on the wire.

/// Width of a header field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8 bits
    Byte,
    /// 16 bits
    Short,
    /// 32 bits
    Integer,
}

impl Width {
    /// Width in bytes
    pub const fn bytes(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Short => 2,
            Width::Integer => 4,
        }
    }

    /// Largest value that fits in this width
    pub const fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Short => 0xFFFF,
            Width::Integer => 0xFFFF_FFFF,
        }
    }
}

/// A named, fixed-offset, fixed-width region within a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Byte offset from the start of the header
    pub offset: usize,
    /// Field width
    pub width: Width,
}

impl Field {
    pub const fn byte(offset: usize) -> Self {
        Field {
            offset,
            width: Width::Byte,
        }
    }

    pub const fn short(offset: usize) -> Self {
        Field {
            offset,
            width: Width::Short,
        }
    }

    pub const fn integer(offset: usize) -> Self {
        Field {
            offset,
            width: Width::Integer,
        }
    }

    /// Offset one past the last byte of the field
    pub const fn end(self) -> usize {
        self.offset + self.width.bytes()
    }

    /// Decode the field from `bytes`.
    ///
    /// `bytes` must cover `offset..end()`; the codecs only call this on
    /// buffers that hold at least their fixed header.
    pub(crate) fn extract(self, bytes: &[u8]) -> u32 {
        let raw = &bytes[self.offset..self.end()];
        match self.width {
            Width::Byte => raw[0] as u32,
            Width::Short => u16::from_be_bytes([raw[0], raw[1]]) as u32,
            Width::Integer => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_bytes() {
        assert_eq!(Width::Byte.bytes(), 1);
        assert_eq!(Width::Short.bytes(), 2);
        assert_eq!(Width::Integer.bytes(), 4);
    }

    #[test]
    fn test_field_end() {
        assert_eq!(Field::byte(9).end(), 10);
        assert_eq!(Field::short(10).end(), 12);
        assert_eq!(Field::integer(16).end(), 20);
    }

    #[test]
    fn test_extract_big_endian() {
        let bytes = [0x45, 0x00, 0x00, 0x27, 0xC0, 0xA8, 0x01, 0x64];

        assert_eq!(Field::byte(0).extract(&bytes), 0x45);
        assert_eq!(Field::short(2).extract(&bytes), 39);
        assert_eq!(Field::integer(4).extract(&bytes), 0xC0A8_0164);
    }
}
