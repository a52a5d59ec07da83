//! TCP segment construction and parsing
//!
//! This module provides functionality for building and parsing TCP segments,
//! including header construction, flags, and checksum calculation. Options
//! are not modeled; the header is always the fixed 20 bytes.

use crate::buffer::ByteBuffer;
use crate::checksum::{transport_checksum, PseudoHeader};
use crate::field::Field;
use crate::ip::IpProtocol;
use crate::packet::{segment_length, Packet, TransportPacket};
use rawnet_core::{CodecConfig, Error, Result};
use tracing::trace;

/// TCP flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    /// FIN - No more data from sender
    pub fin: bool,
    /// SYN - Synchronize sequence numbers
    pub syn: bool,
    /// RST - Reset the connection
    pub rst: bool,
    /// PSH - Push function
    pub psh: bool,
    /// ACK - Acknowledgment field is significant
    pub ack: bool,
    /// URG - Urgent pointer field is significant
    pub urg: bool,
}

impl TcpFlags {
    const FIN_BIT: u8 = 0x01;
    const SYN_BIT: u8 = 0x02;
    const RST_BIT: u8 = 0x04;
    const PSH_BIT: u8 = 0x08;
    const ACK_BIT: u8 = 0x10;
    const URG_BIT: u8 = 0x20;

    /// No flags set
    pub const NONE: TcpFlags = TcpFlags::from_u8(0);

    /// SYN flag (connection initiation)
    pub const SYN: TcpFlags = TcpFlags::from_u8(Self::SYN_BIT);

    /// SYN+ACK flags (connection acknowledgment)
    pub const SYN_ACK: TcpFlags = TcpFlags::from_u8(Self::SYN_BIT | Self::ACK_BIT);

    /// ACK flag
    pub const ACK: TcpFlags = TcpFlags::from_u8(Self::ACK_BIT);

    /// FIN+ACK flags (connection termination)
    pub const FIN_ACK: TcpFlags = TcpFlags::from_u8(Self::FIN_BIT | Self::ACK_BIT);

    /// RST flag (connection reset)
    pub const RST: TcpFlags = TcpFlags::from_u8(Self::RST_BIT);

    /// PSH+ACK flags (data push)
    pub const PSH_ACK: TcpFlags = TcpFlags::from_u8(Self::PSH_BIT | Self::ACK_BIT);

    /// Convert flags to a byte
    pub const fn to_u8(self) -> u8 {
        let mut flags = 0u8;
        if self.fin {
            flags |= Self::FIN_BIT;
        }
        if self.syn {
            flags |= Self::SYN_BIT;
        }
        if self.rst {
            flags |= Self::RST_BIT;
        }
        if self.psh {
            flags |= Self::PSH_BIT;
        }
        if self.ack {
            flags |= Self::ACK_BIT;
        }
        if self.urg {
            flags |= Self::URG_BIT;
        }
        flags
    }

    /// Parse flags from a byte; the two high (ECN) bits are ignored
    pub const fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: (value & Self::FIN_BIT) != 0,
            syn: (value & Self::SYN_BIT) != 0,
            rst: (value & Self::RST_BIT) != 0,
            psh: (value & Self::PSH_BIT) != 0,
            ack: (value & Self::ACK_BIT) != 0,
            urg: (value & Self::URG_BIT) != 0,
        }
    }
}

/// TCP segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpPacket {
    buffer: ByteBuffer,
}

impl TcpPacket {
    /// TCP header size without options
    pub const HEADER_SIZE: usize = 0x14;

    pub const SOURCE_PORT: Field = Field::short(0x00);
    pub const DESTINATION_PORT: Field = Field::short(0x02);
    pub const SEQUENCE: Field = Field::integer(0x04);
    pub const ACKNOWLEDGMENT: Field = Field::integer(0x08);
    /// Header length in words, high nibble
    pub const SEGMENT_OFFSET: Field = Field::byte(0x0C);
    pub const FLAGS: Field = Field::byte(0x0D);
    pub const WINDOW: Field = Field::short(0x0E);
    pub const CHECKSUM: Field = Field::short(0x10);
    pub const URGENT_POINTER: Field = Field::short(0x12);
    /// Payload offset
    pub const DATA: usize = 0x14;

    /// Header length in words without options
    const DEFAULT_SEGMENT_OFFSET: u8 = 5;

    /// Create a TCP segment.
    ///
    /// Data offset, checksum and urgent pointer are initialized; ports,
    /// sequence numbers, flags and window hold the padding value until set.
    pub fn new() -> Self {
        let mut packet = TcpPacket {
            buffer: ByteBuffer::with_size(Self::HEADER_SIZE),
        };
        packet.set_segment_offset(Self::DEFAULT_SEGMENT_OFFSET);
        packet.reset_checksum();
        packet.set_urgent_pointer(0);
        packet
    }

    /// Create a TCP segment with the window from `config`
    pub fn with_config(config: &CodecConfig) -> Self {
        let mut packet = Self::new();
        packet.set_window_size(config.tcp_window);
        packet
    }

    /// Wrap a received segment
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::malformed(format!(
                "TCP header needs {} bytes, got {}",
                Self::HEADER_SIZE,
                data.len()
            )));
        }

        Ok(TcpPacket {
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

    pub fn sequence_number(&self) -> u32 {
        self.field(Self::SEQUENCE)
    }

    pub fn acknowledgment_number(&self) -> u32 {
        self.field(Self::ACKNOWLEDGMENT)
    }

    /// Header length in 32-bit words
    pub fn segment_offset(&self) -> u8 {
        (self.field(Self::SEGMENT_OFFSET) >> 4) as u8
    }

    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_u8(self.field(Self::FLAGS) as u8)
    }

    pub fn window_size(&self) -> u16 {
        self.field(Self::WINDOW) as u16
    }

    pub fn checksum(&self) -> u16 {
        self.field(Self::CHECKSUM) as u16
    }

    pub fn urgent_pointer(&self) -> u16 {
        self.field(Self::URGENT_POINTER) as u16
    }

    pub fn set_source_port(&mut self, port: u16) {
        self.buffer.set_field(Self::SOURCE_PORT, port as u32);
    }

    pub fn set_destination_port(&mut self, port: u16) {
        self.buffer.set_field(Self::DESTINATION_PORT, port as u32);
    }

    pub fn set_sequence_number(&mut self, seq: u32) {
        self.buffer.set_field(Self::SEQUENCE, seq);
    }

    pub fn set_acknowledgment_number(&mut self, ack: u32) {
        self.buffer.set_field(Self::ACKNOWLEDGMENT, ack);
    }

    /// Set the header length in 32-bit words
    pub fn set_segment_offset(&mut self, words: u8) {
        self.buffer
            .set_field(Self::SEGMENT_OFFSET, ((words & 0x0F) << 4) as u32);
    }

    pub fn set_flags(&mut self, flags: TcpFlags) {
        self.buffer.set_field(Self::FLAGS, flags.to_u8() as u32);
    }

    pub fn set_window_size(&mut self, window: u16) {
        self.buffer.set_field(Self::WINDOW, window as u32);
    }

    /// Set the checksum; 0 lets [`complete_packet`](TransportPacket::complete_packet) compute it
    pub fn set_checksum(&mut self, checksum: u16) {
        self.buffer.set_field(Self::CHECKSUM, checksum as u32);
    }

    pub fn set_urgent_pointer(&mut self, pointer: u16) {
        self.buffer.set_field(Self::URGENT_POINTER, pointer as u32);
    }

    /// Replace the payload
    pub fn set_data(&mut self, data: &[u8]) {
        self.buffer.truncate(Self::HEADER_SIZE);
        self.buffer.add_string(data);
    }

    pub fn reset_checksum(&mut self) {
        self.set_checksum(0);
    }

    fn pseudo_header(&self, ip_header: &ByteBuffer) -> Result<PseudoHeader> {
        let length = segment_length(self.buffer.len())?;
        PseudoHeader::from_ipv4_header(ip_header, IpProtocol::TCP, length)
    }

    pub fn into_buffer(self) -> ByteBuffer {
        self.buffer
    }
}

impl Default for TcpPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for TcpPacket {
    fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    fn header_len(&self) -> usize {
        (self.segment_offset() as usize * 4)
            .max(Self::HEADER_SIZE)
            .min(self.buffer.len())
    }
}

impl TransportPacket for TcpPacket {
    fn protocol(&self) -> IpProtocol {
        IpProtocol::TCP
    }

    fn calculate_checksum(&mut self, ip_header: &ByteBuffer) -> Result<()> {
        let pseudo = self.pseudo_header(ip_header)?;
        self.reset_checksum();
        let checksum = transport_checksum(&pseudo, self.buffer.as_bytes());
        trace!(checksum, len = self.buffer.len(), "Computed TCP checksum");
        self.set_checksum(checksum);
        Ok(())
    }

    fn complete_packet(&mut self, ip_header: &ByteBuffer) -> Result<()> {
        if self.checksum() == 0 {
            self.calculate_checksum(ip_header)?;
        }
        Ok(())
    }

    fn is_checksum_valid(&self, ip_header: &ByteBuffer) -> Result<bool> {
        let pseudo = self.pseudo_header(ip_header)?;
        Ok(transport_checksum(&pseudo, self.buffer.as_bytes()) == 0)
    }
}
