//! IPv4 packet construction and parsing
//!
//! [`Ipv4Packet`] is a view over a byte buffer holding the 20-byte IPv4
//! header followed by the payload. A transport packet attached with
//! [`Ipv4Packet::set_data`] is finalized against this header's addresses
//! when the IPv4 packet is completed.

use crate::buffer::ByteBuffer;
use crate::checksum::{internet_checksum, validate_checksum};
use crate::field::Field;
use crate::packet::{segment_length, Packet, RawPacket, TransportPacket};
use crate::tcp::TcpPacket;
use crate::udp::UdpPacket;
use rawnet_core::{CodecConfig, Error, Result};
use std::net::Ipv4Addr;
use tracing::{debug, trace, warn};

/// IP Protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    /// ICMP (1)
    ICMP,
    /// IGMP (2)
    IGMP,
    /// TCP (6)
    TCP,
    /// UDP (17)
    UDP,
    /// Any other protocol number
    Custom(u8),
}

impl IpProtocol {
    pub fn to_u8(self) -> u8 {
        match self {
            IpProtocol::ICMP => 1,
            IpProtocol::IGMP => 2,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IpProtocol::ICMP,
            2 => IpProtocol::IGMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            val => IpProtocol::Custom(val),
        }
    }
}

/// Type of Service (ToS) / Differentiated Services Code Point (DSCP)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeOfService(pub u8);

impl TypeOfService {
    pub const DEFAULT: TypeOfService = TypeOfService(0);
    pub const MINIMIZE_DELAY: TypeOfService = TypeOfService(0x10);
    pub const MAXIMIZE_THROUGHPUT: TypeOfService = TypeOfService(0x08);
    pub const MAXIMIZE_RELIABILITY: TypeOfService = TypeOfService(0x04);
    pub const MINIMIZE_COST: TypeOfService = TypeOfService(0x02);
}

/// IP Flags (top three bits of the flags/fragment-offset field)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpFlags {
    /// Reserved bit (must be 0)
    pub reserved: bool,
    /// Don't Fragment flag
    pub dont_fragment: bool,
    /// More Fragments flag
    pub more_fragments: bool,
}

impl IpFlags {
    pub const NONE: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: false,
        more_fragments: false,
    };

    pub const DONT_FRAGMENT: IpFlags = IpFlags {
        reserved: false,
        dont_fragment: true,
        more_fragments: false,
    };

    /// Convert to 3-bit value
    pub fn to_u8(self) -> u8 {
        (self.reserved as u8) << 2 | (self.dont_fragment as u8) << 1 | self.more_fragments as u8
    }

    /// Parse from 3-bit value
    pub fn from_u8(value: u8) -> Self {
        IpFlags {
            reserved: (value & 0b100) != 0,
            dont_fragment: (value & 0b010) != 0,
            more_fragments: (value & 0b001) != 0,
        }
    }
}

/// Transport payload decoded lazily from a received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    Udp(UdpPacket),
    Raw(RawPacket),
}

impl DecodedPayload {
    pub fn as_udp(&self) -> Option<&UdpPacket> {
        match self {
            DecodedPayload::Udp(udp) => Some(udp),
            DecodedPayload::Raw(_) => None,
        }
    }

    pub fn as_packet(&self) -> &dyn Packet {
        match self {
            DecodedPayload::Udp(udp) => udp,
            DecodedPayload::Raw(raw) => raw,
        }
    }
}

/// IPv4 packet
#[derive(Debug)]
pub struct Ipv4Packet {
    buffer: ByteBuffer,
    /// Transport packet attached for construction
    payload: Option<Box<dyn TransportPacket>>,
    /// Cache for [`get_data_object`](Self::get_data_object)
    decoded: Option<DecodedPayload>,
}

impl Ipv4Packet {
    /// IPv4 header size without options
    pub const HEADER_SIZE: usize = 0x14;

    pub const VERSION_LENGTH: Field = Field::byte(0x00);
    pub const TOS: Field = Field::byte(0x01);
    pub const LENGTH: Field = Field::short(0x02);
    pub const IDENTIFICATION: Field = Field::short(0x04);
    pub const OFFSET: Field = Field::short(0x06);
    pub const TTL: Field = Field::byte(0x08);
    pub const PROTOCOL: Field = Field::byte(0x09);
    pub const CHECKSUM: Field = Field::short(0x0A);
    pub const SOURCE: Field = Field::integer(0x0C);
    pub const DESTINATION: Field = Field::integer(0x10);
    /// Payload offset
    pub const DATA: usize = 0x14;

    /// Version 4, five 32-bit header words
    const VERSION_IHL: u8 = 0x45;

    /// Create an IPv4 packet with the default configuration.
    ///
    /// Version/IHL, ToS, TTL, length and checksum are initialized; every
    /// other header byte holds the padding value until set.
    pub fn new() -> Self {
        Self::with_config(&CodecConfig::default())
    }

    /// Create an IPv4 packet using the TTL from `config`
    pub fn with_config(config: &CodecConfig) -> Self {
        let mut packet = Ipv4Packet {
            buffer: ByteBuffer::with_size(Self::HEADER_SIZE),
            payload: None,
            decoded: None,
        };
        packet.buffer.set_field(Self::VERSION_LENGTH, Self::VERSION_IHL as u32);
        packet.set_tos(TypeOfService::DEFAULT);
        packet.set_length(0);
        packet.set_ttl(config.default_ttl);
        packet.reset_checksum();
        packet
    }

    /// Wrap a received datagram.
    ///
    /// The header fields are left exactly as received.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::malformed(format!(
                "IPv4 header needs {} bytes, got {}",
                Self::HEADER_SIZE,
                data.len()
            )));
        }

        let packet = Ipv4Packet {
            buffer: ByteBuffer::from_slice(data),
            payload: None,
            decoded: None,
        };

        if packet.version() != 4 {
            return Err(Error::malformed(format!(
                "IP version {} is not 4",
                packet.version()
            )));
        }

        let header_len = packet.ihl() as usize * 4;
        if header_len < Self::HEADER_SIZE || header_len > data.len() {
            return Err(Error::malformed(format!(
                "IHL of {} words does not fit a {} byte datagram",
                packet.ihl(),
                data.len()
            )));
        }

        Ok(packet)
    }

    /// Wrap a datagram handed over by the socket layer, clamped to the
    /// configured receive limit.
    pub fn from_received(data: &[u8], config: &CodecConfig) -> Result<Self> {
        let data = if data.len() > config.receive_limit {
            debug!(
                received = data.len(),
                limit = config.receive_limit,
                "Clamping inbound datagram to receive limit"
            );
            &data[..config.receive_limit]
        } else {
            data
        };

        Self::from_bytes(data)
    }

    fn field(&self, field: Field) -> u32 {
        field.extract(self.buffer.as_bytes())
    }

    pub fn version(&self) -> u8 {
        (self.field(Self::VERSION_LENGTH) >> 4) as u8
    }

    /// Header length in 32-bit words
    pub fn ihl(&self) -> u8 {
        (self.field(Self::VERSION_LENGTH) & 0x0F) as u8
    }

    pub fn tos(&self) -> TypeOfService {
        TypeOfService(self.field(Self::TOS) as u8)
    }

    /// Total length (header + data) in bytes
    pub fn length(&self) -> u16 {
        self.field(Self::LENGTH) as u16
    }

    pub fn identification(&self) -> u16 {
        self.field(Self::IDENTIFICATION) as u16
    }

    /// Raw flags/fragment-offset field
    pub fn offset(&self) -> u16 {
        self.field(Self::OFFSET) as u16
    }

    pub fn flags(&self) -> IpFlags {
        IpFlags::from_u8((self.offset() >> 13) as u8)
    }

    /// Fragment offset in 8-byte blocks
    pub fn fragment_offset(&self) -> u16 {
        self.offset() & 0x1FFF
    }

    pub fn ttl(&self) -> u8 {
        self.field(Self::TTL) as u8
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from_u8(self.field(Self::PROTOCOL) as u8)
    }

    pub fn checksum(&self) -> u16 {
        self.field(Self::CHECKSUM) as u16
    }

    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.field(Self::SOURCE))
    }

    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.field(Self::DESTINATION))
    }

    pub fn set_tos(&mut self, tos: TypeOfService) {
        self.buffer.set_field(Self::TOS, tos.0 as u32);
    }

    /// Set the total length; 0 lets [`complete_packet`](Self::complete_packet) fill it in
    pub fn set_length(&mut self, length: u16) {
        self.buffer.set_field(Self::LENGTH, length as u32);
    }

    pub fn set_identification(&mut self, id: u16) {
        self.buffer.set_field(Self::IDENTIFICATION, id as u32);
    }

    /// Set the raw flags/fragment-offset field
    pub fn set_offset(&mut self, offset: u16) {
        self.buffer.set_field(Self::OFFSET, offset as u32);
    }

    pub fn set_flags(&mut self, flags: IpFlags) {
        let offset = ((flags.to_u8() as u16) << 13) | self.fragment_offset();
        self.set_offset(offset);
    }

    pub fn set_fragment_offset(&mut self, fragment_offset: u16) {
        let offset = (self.offset() & 0xE000) | (fragment_offset & 0x1FFF);
        self.set_offset(offset);
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.set_field(Self::TTL, ttl as u32);
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.buffer.set_field(Self::PROTOCOL, protocol.to_u8() as u32);
        self.decoded = None;
    }

    /// Set the header checksum; 0 lets [`complete_packet`](Self::complete_packet) compute it
    pub fn set_checksum(&mut self, checksum: u16) {
        self.buffer.set_field(Self::CHECKSUM, checksum as u32);
    }

    pub fn set_source(&mut self, addr: Ipv4Addr) {
        self.buffer.set_field(Self::SOURCE, u32::from(addr));
    }

    pub fn set_destination(&mut self, addr: Ipv4Addr) {
        self.buffer.set_field(Self::DESTINATION, u32::from(addr));
    }

    /// Set the source address from dotted-quad text
    pub fn set_source_str(&mut self, addr: &str) -> Result<()> {
        self.set_source(parse_addr(addr)?);
        Ok(())
    }

    /// Set the destination address from dotted-quad text
    pub fn set_destination_str(&mut self, addr: &str) -> Result<()> {
        self.set_destination(parse_addr(addr)?);
        Ok(())
    }

    /// Attach a transport packet as the payload.
    ///
    /// The payload region is replaced by the packet's current bytes and the
    /// packet is kept so that [`complete_packet`](Self::complete_packet) can
    /// finalize it against this header.
    pub fn set_data<P: TransportPacket + 'static>(&mut self, packet: P) {
        debug!(
            protocol = ?packet.protocol(),
            len = packet.len(),
            "Attaching transport packet"
        );
        self.write_payload(packet.encode());
        self.payload = Some(Box::new(packet));
    }

    /// Replace the payload region with raw bytes, dropping any attached packet
    pub fn set_raw_data(&mut self, data: &[u8]) {
        self.write_payload(data);
        self.payload = None;
    }

    fn write_payload(&mut self, data: &[u8]) {
        Self::replace_payload(&mut self.buffer, data);
        self.decoded = None;
    }

    /// Cut `buffer` back to the fixed header and append `data`.
    ///
    /// Options are not modeled, so any parsed options are dropped and the
    /// header length is reset to five words to keep `header_len()` in step.
    fn replace_payload(buffer: &mut ByteBuffer, data: &[u8]) {
        buffer.truncate(Self::HEADER_SIZE);
        buffer.set_field(Self::VERSION_LENGTH, Self::VERSION_IHL as u32);
        buffer.add_string(data);
    }

    /// The transport packet attached with [`set_data`](Self::set_data)
    pub fn data_packet(&self) -> Option<&dyn TransportPacket> {
        self.payload.as_deref()
    }

    /// Decode the payload according to the protocol field.
    ///
    /// UDP payloads decode to a [`UdpPacket`]; anything else is wrapped as
    /// raw bytes. The result is cached until the payload or protocol changes.
    pub fn get_data_object(&mut self) -> Result<&DecodedPayload> {
        let decoded = match self.decoded.take() {
            Some(decoded) => decoded,
            None => self.decode_payload()?,
        };
        Ok(&*self.decoded.insert(decoded))
    }

    fn decode_payload(&self) -> Result<DecodedPayload> {
        let protocol = self.protocol();
        debug!(?protocol, len = self.data().len(), "Decoding IPv4 payload");

        Ok(match protocol {
            IpProtocol::UDP => DecodedPayload::Udp(UdpPacket::from_bytes(self.data())?),
            _ => DecodedPayload::Raw(RawPacket::from_bytes(self.data())),
        })
    }

    pub fn reset_checksum(&mut self) {
        self.set_checksum(0);
    }

    /// Compute the header checksum and store it
    pub fn calculate_checksum(&mut self) {
        self.reset_checksum();
        let checksum = internet_checksum(&self.buffer.as_bytes()[..self.header_len()]);
        trace!(checksum, "Computed IPv4 header checksum");
        self.set_checksum(checksum);
    }

    /// Check the stored header checksum
    pub fn is_checksum_valid(&self) -> bool {
        validate_checksum(&self.buffer.as_bytes()[..self.header_len()])
    }

    /// Check the checksum of the carried TCP or UDP segment
    pub fn verify_transport_checksum(&self) -> Result<bool> {
        match self.protocol() {
            IpProtocol::UDP => UdpPacket::from_bytes(self.data())?.is_checksum_valid(&self.buffer),
            IpProtocol::TCP => TcpPacket::from_bytes(self.data())?.is_checksum_valid(&self.buffer),
            other => Err(Error::UnsupportedProtocol(other.to_u8())),
        }
    }

    /// Finalize the packet for sending.
    ///
    /// The attached transport packet (if any) is completed first and its
    /// bytes re-serialized into the payload region. Then a zero total
    /// length is replaced by the buffer length and a zero checksum is
    /// computed. Non-zero fields are never recomputed.
    pub fn complete_packet(&mut self) -> Result<()> {
        let declared = self.protocol();

        if let Some(payload) = self.payload.as_deref_mut() {
            if payload.protocol() != declared {
                warn!(
                    declared = ?declared,
                    carried = ?payload.protocol(),
                    "IPv4 protocol field does not match attached transport packet"
                );
            }

            payload.complete_packet(&self.buffer)?;

            Self::replace_payload(&mut self.buffer, payload.encode());
            self.decoded = None;
        }

        let filled_length = self.length() == 0;
        if filled_length {
            let length = segment_length(self.buffer.len())?;
            self.set_length(length);
        }

        let filled_checksum = self.checksum() == 0;
        if filled_checksum {
            self.calculate_checksum();
        }

        debug!(
            length = self.length(),
            checksum = self.checksum(),
            filled_length,
            filled_checksum,
            "Completed IPv4 packet"
        );
        Ok(())
    }

    /// Finalize and return the datagram ready for a raw socket
    pub fn get_packet(&mut self) -> Result<&[u8]> {
        self.complete_packet()?;
        Ok(self.buffer.as_bytes())
    }

    pub fn into_buffer(self) -> ByteBuffer {
        self.buffer
    }
}

impl Default for Ipv4Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for Ipv4Packet {
    fn buffer(&self) -> &ByteBuffer {
        &self.buffer
    }

    fn header_len(&self) -> usize {
        (self.ihl() as usize * 4)
            .max(Self::HEADER_SIZE)
            .min(self.buffer.len())
    }

    /// Payload bytes up to the total length field.
    ///
    /// Bytes past a non-zero total length (frame padding, over-read receive
    /// buffers) are not part of the datagram. A zero total length, as on a
    /// packet still under construction, covers the whole buffer.
    fn data(&self) -> &[u8] {
        let bytes = self.buffer.as_bytes();
        let start = self.header_len();
        let end = match self.length() as usize {
            0 => bytes.len(),
            total => total.clamp(start, bytes.len()),
        };
        &bytes[start..end]
    }
}

fn parse_addr(addr: &str) -> Result<Ipv4Addr> {
    addr.trim()
        .parse()
        .map_err(|_| Error::invalid_address(addr))
}
