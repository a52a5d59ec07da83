//! Raw IPv4, TCP and UDP packet codecs
//!
//! This crate builds and parses packets at the wire level, without going
//! through a kernel protocol stack. Every packet is a view over a
//! [`ByteBuffer`] holding its serialized header and payload; typed getters
//! and setters read and write big-endian fields at fixed offsets.
//!
//! # Architecture
//!
//! - [`buffer`] - Growable byte buffer with random access and a read cursor
//! - [`field`] - Offset/width descriptors making up each header table
//! - [`checksum`] - Internet checksum and the TCP/UDP pseudo-header
//! - [`packet`] - The [`Packet`] and [`TransportPacket`] traits
//! - [`ip`] - IPv4 header codec and encapsulation
//! - [`tcp`] - TCP header codec
//! - [`udp`] - UDP header codec
//! - [`builder`] - High-level fluent API for complete datagrams
//!
//! # Quick Start
//!
//! ## Encapsulating a UDP datagram
//!
//! ```rust
//! use rawnet_packet::{IpProtocol, Ipv4Packet, UdpPacket};
//!
//! let mut udp = UdpPacket::new();
//! udp.set_source_port(54321);
//! udp.set_destination_port(12345);
//! udp.set_data(b"Hello World");
//!
//! let mut ip = Ipv4Packet::new();
//! ip.set_identification(1);
//! ip.set_offset(0);
//! ip.set_protocol(IpProtocol::UDP);
//! ip.set_source_str("192.168.1.1").unwrap();
//! ip.set_destination_str("192.168.1.100").unwrap();
//! ip.set_data(udp);
//!
//! // Lengths and checksums still zero are filled in bottom-up
//! let bytes = ip.get_packet().unwrap();
//! assert_eq!(bytes.len(), 39);
//! ```
//!
//! ## Building a TCP SYN packet
//!
//! ```rust
//! use std::net::Ipv4Addr;
//! use rawnet_packet::DatagramBuilder;
//! use rawnet_packet::tcp::TcpFlags;
//!
//! let packet = DatagramBuilder::new()
//!     .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
//!     .tcp(54321, 80, 1000, 0, TcpFlags::SYN)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(packet.length(), 40);
//! ```
//!
//! ## Parsing a received datagram
//!
//! ```rust
//! use rawnet_packet::{DatagramBuilder, Ipv4Packet};
//! use std::net::Ipv4Addr;
//!
//! let mut sent = DatagramBuilder::new()
//!     .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
//!     .udp(5000, 53)
//!     .payload(vec![0xAB; 4])
//!     .build()
//!     .unwrap();
//! let wire = sent.get_packet().unwrap().to_vec();
//!
//! let mut received = Ipv4Packet::from_bytes(&wire).unwrap();
//! assert!(received.is_checksum_valid());
//! let udp = received.get_data_object().unwrap().as_udp().unwrap();
//! assert_eq!(udp.destination_port(), 53);
//! ```

pub mod buffer;
pub mod builder;
pub mod checksum;
pub mod field;
pub mod ip;
pub mod packet;
pub mod tcp;
pub mod udp;

// Re-export commonly used types for convenience
pub use buffer::ByteBuffer;
pub use builder::DatagramBuilder;
pub use checksum::{internet_checksum, transport_checksum, PseudoHeader};
pub use field::{Field, Width};
pub use ip::{DecodedPayload, IpFlags, IpProtocol, Ipv4Packet, TypeOfService};
pub use packet::{Packet, RawPacket, TransportPacket};
pub use tcp::{TcpFlags, TcpPacket};
pub use udp::UdpPacket;
