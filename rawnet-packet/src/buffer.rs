//! Growable byte buffer with random access and a sequential read cursor
//!
//! [`ByteBuffer`] is the storage every packet codec is built on. Random
//! writes past the current length extend the buffer, filling any gap with
//! [`PADDING_BYTE`] so that unset header bytes stand out in a dump. Reads
//! never extend: addressing a byte at or beyond the length is an error.

use crate::field::{Field, Width};
use bytes::{BufMut, Bytes, BytesMut};
use rawnet_core::{Error, Result};
use std::fmt::Write;
use tracing::trace;

/// Fill value for bytes created by pre-allocation or gap-filling writes
pub const PADDING_BYTE: u8 = 0xFF;

/// Bytes per line in [`ByteBuffer::dump`]
pub const DUMP_LINE_WIDTH: usize = 50;

/// Byte buffer with big-endian field accessors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuffer {
    data: BytesMut,
    read_pos: usize,
}

impl ByteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        ByteBuffer {
            data: BytesMut::new(),
            read_pos: 0,
        }
    }

    /// Create a buffer pre-allocated to `size` bytes of padding
    pub fn with_size(size: usize) -> Self {
        let mut buffer = Self::new();
        buffer.set_memory_size(size);
        buffer
    }

    /// Create a buffer holding a copy of `data`
    pub fn from_slice(data: &[u8]) -> Self {
        ByteBuffer {
            data: BytesMut::from(data),
            read_pos: 0,
        }
    }

    /// Logical length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert into an immutable `Bytes` handle
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    // Appending

    pub fn add_byte(&mut self, byte: u8) {
        self.data.put_u8(byte);
    }

    pub fn add_string(&mut self, data: &[u8]) {
        self.data.put_slice(data);
    }

    pub fn add_short(&mut self, value: u16) {
        self.data.put_u16(value);
    }

    pub fn add_integer(&mut self, value: u32) {
        self.data.put_u32(value);
    }

    // Random access
    //
    // Writes past the current length extend the buffer. They panic if `pos`
    // plus the field width overflows `usize`.

    pub fn set_byte(&mut self, pos: usize, byte: u8) {
        self.write_at(pos, &[byte]);
    }

    pub fn set_short(&mut self, pos: usize, value: u16) {
        self.write_at(pos, &value.to_be_bytes());
    }

    pub fn set_integer(&mut self, pos: usize, value: u32) {
        self.write_at(pos, &value.to_be_bytes());
    }

    pub fn get_byte(&self, pos: usize) -> Result<u8> {
        Ok(self.window(pos, 1)?[0])
    }

    pub fn get_short(&self, pos: usize) -> Result<u16> {
        let raw = self.window(pos, 2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    pub fn get_integer(&self, pos: usize) -> Result<u32> {
        let raw = self.window(pos, 4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Read a header field described by a layout table entry
    pub fn get_field(&self, field: Field) -> Result<u32> {
        match field.width {
            Width::Byte => self.get_byte(field.offset).map(u32::from),
            Width::Short => self.get_short(field.offset).map(u32::from),
            Width::Integer => self.get_integer(field.offset),
        }
    }

    /// Write a header field, truncating `value` to the field width
    pub fn set_field(&mut self, field: Field, value: u32) {
        let value = value & field.width.mask();
        match field.width {
            Width::Byte => self.set_byte(field.offset, value as u8),
            Width::Short => self.set_short(field.offset, value as u16),
            Width::Integer => self.set_integer(field.offset, value),
        }
    }

    // Sequential reads

    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.get_byte(self.read_pos)?;
        self.read_pos += 1;
        Ok(byte)
    }

    pub fn read_short(&mut self) -> Result<u16> {
        let value = self.get_short(self.read_pos)?;
        self.read_pos += 2;
        Ok(value)
    }

    pub fn read_integer(&mut self) -> Result<u32> {
        let value = self.get_integer(self.read_pos)?;
        self.read_pos += 4;
        Ok(value)
    }

    pub fn reset_read_pointer(&mut self) {
        self.read_pos = 0;
    }

    pub fn set_read_pointer(&mut self, pos: usize) {
        self.read_pos = pos;
    }

    pub fn read_position(&self) -> usize {
        self.read_pos
    }

    // Sizing

    /// Grow the buffer to `size` bytes, padding with [`PADDING_BYTE`].
    ///
    /// Never shrinks; use [`truncate`](Self::truncate) for that.
    pub fn set_memory_size(&mut self, size: usize) {
        if size > self.data.len() {
            trace!(from = self.data.len(), to = size, "Pre-allocating buffer");
            self.data.resize(size, PADDING_BYTE);
        }
    }

    /// Shrink the buffer to `size` bytes. No-op if already shorter.
    pub fn truncate(&mut self, size: usize) {
        if size < self.data.len() {
            trace!(from = self.data.len(), to = size, "Truncating buffer");
            self.data.truncate(size);
        }
    }

    /// Drop all contents and rewind the read cursor
    pub fn reset(&mut self) {
        self.data.clear();
        self.read_pos = 0;
    }

    /// Bytes in `start..end`; `None` for `end` means the current length
    pub fn get_memory(&self, start: usize, end: Option<usize>) -> Result<&[u8]> {
        let len = self.data.len();
        let end = end.unwrap_or(len);
        if start > end || end > len {
            return Err(Error::out_of_bounds(start, end.saturating_sub(start), len));
        }
        Ok(&self.data[start..end])
    }

    /// Hex rendering, uppercase, [`DUMP_LINE_WIDTH`] bytes per line
    pub fn dump(&self) -> String {
        let mut out =
            String::with_capacity(self.data.len() * 3 + self.data.len() / DUMP_LINE_WIDTH + 1);
        for line in self.data.chunks(DUMP_LINE_WIDTH) {
            for byte in line {
                let _ = write!(out, "{:02X} ", byte);
            }
            out.push('\n');
        }
        out
    }

    fn window(&self, pos: usize, width: usize) -> Result<&[u8]> {
        let len = self.data.len();
        match pos.checked_add(width) {
            Some(end) if end <= len => Ok(&self.data[pos..end]),
            _ => Err(Error::out_of_bounds(pos, width, len)),
        }
    }

    fn write_at(&mut self, pos: usize, bytes: &[u8]) {
        let Some(end) = pos.checked_add(bytes.len()) else {
            panic!(
                "write of {} byte(s) at offset {} overflows the address space",
                bytes.len(),
                pos
            );
        };
        if end > self.data.len() {
            self.data.resize(end, PADDING_BYTE);
        }
        self.data[pos..end].copy_from_slice(bytes);
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_big_endian() {
        let mut buffer = ByteBuffer::new();
        buffer.add_byte(0x45);
        buffer.add_short(0x1234);
        buffer.add_integer(0xC0A8_0101);
        buffer.add_string(b"Hi");

        assert_eq!(
            buffer.as_bytes(),
            &[0x45, 0x12, 0x34, 0xC0, 0xA8, 0x01, 0x01, b'H', b'i']
        );
        assert_eq!(buffer.len(), 9);
    }

    #[test]
    fn test_with_size_pads() {
        let buffer = ByteBuffer::with_size(8);
        assert_eq!(buffer.as_bytes(), &[PADDING_BYTE; 8]);
    }

    #[test]
    #[should_panic(expected = "overflows the address space")]
    fn test_set_past_address_space_panics() {
        let mut buffer = ByteBuffer::new();
        buffer.set_short(usize::MAX, 0x1234);
    }

    #[test]
    fn test_set_extends_with_padding() {
        let mut buffer = ByteBuffer::new();
        buffer.set_short(3, 0xABCD);

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.as_bytes(), &[0xFF, 0xFF, 0xFF, 0xAB, 0xCD]);
    }

    #[test]
    fn test_set_within_length_keeps_length() {
        let mut buffer = ByteBuffer::with_size(20);
        buffer.set_integer(12, 0x7F00_0001);

        assert_eq!(buffer.len(), 20);
        assert_eq!(buffer.get_integer(12).unwrap(), 0x7F00_0001);
    }

    #[test]
    fn test_short_roundtrip_all_values() {
        let mut buffer = ByteBuffer::with_size(4);
        for value in 0..=u16::MAX {
            buffer.set_short(1, value);
            assert_eq!(buffer.get_short(1).unwrap(), value);
        }
    }

    #[test]
    fn test_byte_and_integer_roundtrip() {
        let mut buffer = ByteBuffer::new();
        for value in 0..=u8::MAX {
            buffer.set_byte(0, value);
            assert_eq!(buffer.get_byte(0).unwrap(), value);
        }
        for value in [0, 1, 0x8000_0000, 0xDEAD_BEEF, u32::MAX] {
            buffer.set_integer(5, value);
            assert_eq!(buffer.get_integer(5).unwrap(), value);
        }
    }

    #[test]
    fn test_get_out_of_bounds() {
        let buffer = ByteBuffer::with_size(4);

        assert_eq!(
            buffer.get_short(3),
            Err(Error::OutOfBounds {
                offset: 3,
                width: 2,
                len: 4
            })
        );
        assert!(buffer.get_byte(4).is_err());
        assert!(buffer.get_integer(usize::MAX).is_err());
    }

    #[test]
    fn test_field_access_masks_value() {
        let mut buffer = ByteBuffer::with_size(4);
        buffer.set_field(Field::short(0), 0x1_2345);
        buffer.set_field(Field::byte(2), 0x1FF);

        assert_eq!(buffer.get_field(Field::short(0)).unwrap(), 0x2345);
        assert_eq!(buffer.get_field(Field::byte(2)).unwrap(), 0xFF);
    }

    #[test]
    fn test_sequential_reads() {
        let mut buffer = ByteBuffer::from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);

        assert_eq!(buffer.read_byte().unwrap(), 0x01);
        assert_eq!(buffer.read_short().unwrap(), 0x0203);
        assert_eq!(buffer.read_integer().unwrap(), 0x0405_0607);
        assert_eq!(buffer.read_position(), 7);
        assert!(buffer.read_byte().is_err());

        buffer.reset_read_pointer();
        assert_eq!(buffer.read_byte().unwrap(), 0x01);

        buffer.set_read_pointer(5);
        assert!(buffer.read_integer().is_err());
        // A failed read leaves the cursor in place
        assert_eq!(buffer.read_position(), 5);
        assert_eq!(buffer.read_short().unwrap(), 0x0607);
    }

    #[test]
    fn test_set_memory_size_grows_only() {
        let mut buffer = ByteBuffer::from_slice(&[1, 2, 3, 4]);
        buffer.set_memory_size(2);
        assert_eq!(buffer.len(), 4);

        buffer.set_memory_size(6);
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4, 0xFF, 0xFF]);
    }

    #[test]
    fn test_truncate_and_reset() {
        let mut buffer = ByteBuffer::from_slice(&[1, 2, 3, 4]);
        buffer.truncate(2);
        assert_eq!(buffer.as_bytes(), &[1, 2]);

        buffer.truncate(10);
        assert_eq!(buffer.len(), 2);

        buffer.read_byte().unwrap();
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.read_position(), 0);
    }

    #[test]
    fn test_get_memory() {
        let buffer = ByteBuffer::from_slice(&[0, 1, 2, 3, 4, 5]);

        assert_eq!(buffer.get_memory(0, None).unwrap(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(buffer.get_memory(2, None).unwrap(), &[2, 3, 4, 5]);
        assert_eq!(buffer.get_memory(1, Some(3)).unwrap(), &[1, 2]);
        assert_eq!(buffer.get_memory(6, None).unwrap(), &[] as &[u8]);
        assert!(buffer.get_memory(2, Some(7)).is_err());
        assert!(buffer.get_memory(4, Some(3)).is_err());
    }

    #[test]
    fn test_dump_line_width() {
        let buffer = ByteBuffer::from_slice(&[0xAB; 51]);
        let dump = buffer.dump();
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split_whitespace().count(), 50);
        assert_eq!(lines[1], "AB ");
        assert_eq!(ByteBuffer::new().dump(), "");
    }
}
