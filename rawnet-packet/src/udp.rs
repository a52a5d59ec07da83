//! UDP datagram construction and parsing
//!
//! This module provides functionality for building and parsing UDP datagrams,
//! including header construction and checksum calculation.

use crate::buffer::ByteBuffer;
use crate::checksum::{transport_checksum, PseudoHeader};
use crate::field::Field;
use crate::ip::IpProtocol;
use crate::packet::{segment_length, Packet, TransportPacket};
use rawnet_core::{Error, Result};
use tracing::trace;

/// UDP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    buffer: ByteBuffer,
}

impl UdpPacket {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 0x08;

    pub const SOURCE_PORT: Field = Field::short(0x00);
    pub const DESTINATION_PORT: Field = Field::short(0x02);
    pub const LENGTH: Field = Field::short(0x04);
    pub const CHECKSUM: Field = Field::short(0x06);
    /// Payload offset
    pub const DATA: usize = 0x08;

    /// Create a UDP datagram with zero length and checksum, ready for
    /// [`complete_packet`](TransportPacket::complete_packet) to fill in
    pub fn new() -> Self {
        let mut packet = UdpPacket {
            buffer: ByteBuffer::with_size(Self::HEADER_SIZE),
        };
        packet.set_length(0);
        packet.reset_checksum();
        packet
    }

    /// Wrap a received datagram
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::malformed(format!(
                "UDP header needs {} bytes, got {}",
                Self::HEADER_SIZE,
                data.len()
            )));
        }

        Ok(UdpPacket {
            buffer: ByteBuffer::from_slice(data),
        })
    }

    fn field(&self, field: Field) -> u32 {
        field.extract(self.buffer.as_bytes())
    }

    pub fn source_port(&self) -> u16 {
        self.field(Self::SOURCE_PORT) as u16
    }

    pub fn destination_port(&self) -> u16 {
        self.field(Self::DESTINATION_PORT) as u16
    }

    /// Length of header and payload as carried in the header
    pub fn length(&self) -> u16 {
        self.field(Self::LENGTH) as u16
    }

    pub fn checksum(&self) -> u16 {
        self.field(Self::CHECKSUM) as u16
    }

    pub fn set_source_port(&mut self, port: u16) {
        self.buffer.set_field(Self::SOURCE_PORT, port as u32);
    }

    pub fn set_destination_port(&mut self, port: u16) {
        self.buffer.set_field(Self::DESTINATION_PORT, port as u32);
    }

    /// Set the length field; 0 lets [`complete_packet`](TransportPacket::complete_packet) fill it in
    pub fn set_length(&mut self, length: u16) {
        self.buffer.set_field(Self::LENGTH, length as u32);
    }

    /// Set the checksum field. 0 means "no checksum" on the wire and lets
    /// [`complete_packet`](TransportPacket::complete_packet) compute one.
    pub fn set_checksum(&mut self, checksum: u16) {
        self.buffer.set_field(Self::CHECKSUM, checksum as u32);
    }

    /// Replace the payload
    pub fn set_data(&mut self, data: &[u8]) {
        self.buffer.truncate(Self::HEADER_SIZE);
        self.buffer.add_string(data);
    }

    pub fn reset_checksum(&mut self) {
        self.set_checksum(0);
    }

    /// Bytes covered by the length field, clamped to the buffer.
    ///
    /// A zero length field (not yet completed) covers the whole buffer, so
    /// trailing bytes past a declared length are never part of the segment.
    fn segment(&self) -> &[u8] {
        let bytes = self.buffer.as_bytes();
        match self.length() as usize {
            0 => bytes,
            length => &bytes[..length.min(bytes.len())],
        }
    }

    fn pseudo_header(&self, ip_header: &ByteBuffer) -> Result<PseudoHeader> {
        let length = segment_length(self.segment().len())?;
        PseudoHeader::from_ipv4_header(ip_header, IpProtocol::UDP, length)
    }

    pub fn into_buffer(self) -> ByteBuffer {
        self.buffer
    }
}

impl Default for UdpPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for UdpPacket {
    fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn data(&self) -> &[u8] {
        let segment = self.segment();
        &segment[Self::HEADER_SIZE.min(segment.len())..]
    }
}

impl TransportPacket for UdpPacket {
    fn protocol(&self) -> IpProtocol {
        IpProtocol::UDP
    }

    fn calculate_checksum(&mut self, ip_header: &ByteBuffer) -> Result<()> {
        let pseudo = self.pseudo_header(ip_header)?;
        self.reset_checksum();

        let mut checksum = transport_checksum(&pseudo, self.segment());
        // An all-zero field means the sender computed no checksum
        if checksum == 0 {
            checksum = 0xFFFF;
        }

        trace!(checksum, len = self.segment().len(), "Computed UDP checksum");
        self.set_checksum(checksum);
        Ok(())
    }

    fn complete_packet(&mut self, ip_header: &ByteBuffer) -> Result<()> {
        if self.length() == 0 {
            let length = segment_length(self.buffer.len())?;
            self.set_length(length);
        }

        if self.checksum() == 0 {
            self.calculate_checksum(ip_header)?;
        }
        Ok(())
    }

    fn is_checksum_valid(&self, ip_header: &ByteBuffer) -> Result<bool> {
        if self.checksum() == 0 {
            return Ok(true);
        }

        let pseudo = self.pseudo_header(ip_header)?;
        Ok(transport_checksum(&pseudo, self.segment()) == 0)
    }
}
