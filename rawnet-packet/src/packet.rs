//! Packet capability traits
//!
//! Every codec owns a [`ByteBuffer`] holding its serialized header and
//! payload. [`Packet`] exposes that buffer; [`TransportPacket`] adds the
//! finalize step TCP and UDP run against an enclosing IPv4 header.

use crate::buffer::ByteBuffer;
use crate::ip::IpProtocol;
use rawnet_core::{Error, Result};
use std::fmt;

/// A packet backed by a single byte buffer
pub trait Packet: fmt::Debug + Send {
    /// The underlying buffer
    fn buffer(&self) -> &ByteBuffer;

    /// Length of the header in bytes; the payload starts here
    fn header_len(&self) -> usize;

    /// Serialized bytes (header and payload)
    fn encode(&self) -> &[u8] {
        self.buffer().as_bytes()
    }

    /// Total length in bytes
    fn len(&self) -> usize {
        self.buffer().len()
    }

    fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// Payload bytes following the header
    fn data(&self) -> &[u8] {
        let bytes = self.encode();
        &bytes[self.header_len().min(bytes.len())..]
    }

    /// Hex dump of the serialized bytes
    fn dump(&self) -> String {
        self.buffer().dump()
    }
}

/// A transport-layer packet that can be carried inside IPv4
pub trait TransportPacket: Packet {
    /// IP protocol number used in the pseudo-header
    fn protocol(&self) -> IpProtocol;

    /// Compute the checksum against the pseudo-header drawn from `ip_header`
    /// and store it, replacing any previous value.
    fn calculate_checksum(&mut self, ip_header: &ByteBuffer) -> Result<()>;

    /// Fill in length and checksum fields that are still zero.
    ///
    /// Non-zero fields are left untouched, so calling this twice is harmless
    /// and callers can override computed values by setting them first.
    fn complete_packet(&mut self, ip_header: &ByteBuffer) -> Result<()>;

    /// Check the stored checksum against the pseudo-header drawn from `ip_header`
    fn is_checksum_valid(&self, ip_header: &ByteBuffer) -> Result<bool>;
}

/// Convert a segment length to the 16-bit value carried in headers
pub(crate) fn segment_length(len: usize) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| Error::construction(format!("{} bytes exceeds the 16-bit length field", len)))
}

/// Untyped bytes with no header structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPacket {
    buffer: ByteBuffer,
}

impl RawPacket {
    pub fn new() -> Self {
        RawPacket {
            buffer: ByteBuffer::new(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        RawPacket {
            buffer: ByteBuffer::from_slice(data),
        }
    }

    /// Append raw bytes
    pub fn set_raw_packet(&mut self, data: &[u8]) {
        self.buffer.add_string(data);
    }

    pub fn into_buffer(self) -> ByteBuffer {
        self.buffer
    }
}

impl Packet for RawPacket {
    fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    fn header_len(&self) -> usize {
        0
    }
}
