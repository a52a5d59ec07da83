//! Datagram builder with a fluent API
//!
//! This module provides a high-level builder that assembles an IPv4 header,
//! an optional TCP or UDP segment and a payload, then finalizes lengths and
//! checksums in one step.

use crate::ip::{IpProtocol, Ipv4Packet};
use crate::tcp::{TcpFlags, TcpPacket};
use crate::udp::UdpPacket;
use rand::Rng;
use rawnet_core::{CodecConfig, Error, Result};
use std::net::Ipv4Addr;
use tracing::debug;

/// Network layer settings
#[derive(Debug, Clone)]
struct Layer3 {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    identification: u16,
}

/// Transport layer settings
#[derive(Debug, Clone, Copy)]
enum Layer4 {
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Tcp {
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
        window: u16,
    },
}

/// Builder for complete IPv4 datagrams
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use rawnet_packet::{DatagramBuilder, Packet};
///
/// let packet = DatagramBuilder::new()
///     .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 100))
///     .ttl(255)
///     .udp(54321, 12345)
///     .payload(b"Hello World".to_vec())
///     .build()
///     .unwrap();
///
/// assert_eq!(packet.len(), 39);
/// ```
#[derive(Debug, Clone)]
pub struct DatagramBuilder {
    config: CodecConfig,
    layer3: Option<Layer3>,
    layer4: Option<Layer4>,
    protocol: Option<IpProtocol>,
    payload: Vec<u8>,
}

impl DatagramBuilder {
    /// Create a new builder with the default configuration
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Create a new builder whose TTL and TCP window defaults come from `config`
    pub fn with_config(config: CodecConfig) -> Self {
        DatagramBuilder {
            config,
            layer3: None,
            layer4: None,
            protocol: None,
            payload: Vec::new(),
        }
    }

    /// Add the IPv4 layer
    pub fn ipv4(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.layer3 = Some(Layer3 {
            src,
            dst,
            ttl: self.config.default_ttl,
            identification: 0,
        });
        self
    }

    /// Set the TTL for the IPv4 layer
    ///
    /// Must be called after `ipv4()`.
    pub fn ttl(mut self, new_ttl: u8) -> Self {
        if let Some(layer3) = self.layer3.as_mut() {
            layer3.ttl = new_ttl;
        }
        self
    }

    /// Set the identification for the IPv4 layer
    ///
    /// Must be called after `ipv4()`.
    pub fn identification(mut self, id: u16) -> Self {
        if let Some(layer3) = self.layer3.as_mut() {
            layer3.identification = id;
        }
        self
    }

    /// Use a random identification for the IPv4 layer
    ///
    /// Must be called after `ipv4()`.
    pub fn random_identification(self) -> Self {
        let id = rand::thread_rng().gen();
        self.identification(id)
    }

    /// Add a UDP layer
    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.layer4 = Some(Layer4::Udp { src_port, dst_port });
        self
    }

    /// Add a TCP layer
    ///
    /// # Arguments
    ///
    /// * `src_port` - Source port
    /// * `dst_port` - Destination port
    /// * `seq` - Sequence number
    /// * `ack` - Acknowledgment number
    /// * `flags` - TCP flags
    pub fn tcp(
        mut self,
        src_port: u16,
        dst_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
    ) -> Self {
        self.layer4 = Some(Layer4::Tcp {
            src_port,
            dst_port,
            seq,
            ack,
            flags,
            window: self.config.tcp_window,
        });
        self
    }

    /// Set the TCP window size
    ///
    /// Must be called after `tcp()`.
    pub fn window(mut self, new_window: u16) -> Self {
        if let Some(Layer4::Tcp { ref mut window, .. }) = self.layer4 {
            *window = new_window;
        }
        self
    }

    /// Set the IPv4 protocol number for a payload carried without a
    /// transport layer. Ignored when `udp()` or `tcp()` is used.
    pub fn protocol(mut self, protocol: IpProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set the payload data
    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = data;
        self
    }

    /// Build the finalized datagram
    ///
    /// # Errors
    ///
    /// Returns an error if no IPv4 layer was configured or the datagram
    /// does not fit the 16-bit length fields.
    pub fn build(self) -> Result<Ipv4Packet> {
        let layer3 = self
            .layer3
            .as_ref()
            .ok_or_else(|| Error::PacketConstruction("IPv4 layer is required".into()))?;

        let mut ip = Ipv4Packet::with_config(&self.config);
        ip.set_identification(layer3.identification);
        ip.set_offset(0);
        ip.set_ttl(layer3.ttl);
        ip.set_source(layer3.src);
        ip.set_destination(layer3.dst);

        match self.layer4 {
            Some(Layer4::Udp { src_port, dst_port }) => {
                let mut udp = UdpPacket::new();
                udp.set_source_port(src_port);
                udp.set_destination_port(dst_port);
                udp.set_data(&self.payload);

                ip.set_protocol(IpProtocol::UDP);
                ip.set_data(udp);
            }
            Some(Layer4::Tcp {
                src_port,
                dst_port,
                seq,
                ack,
                flags,
                window,
            }) => {
                let mut tcp = TcpPacket::new();
                tcp.set_source_port(src_port);
                tcp.set_destination_port(dst_port);
                tcp.set_sequence_number(seq);
                tcp.set_acknowledgment_number(ack);
                tcp.set_flags(flags);
                tcp.set_window_size(window);
                tcp.set_data(&self.payload);

                ip.set_protocol(IpProtocol::TCP);
                ip.set_data(tcp);
            }
            None => {
                // Raw IP
                ip.set_protocol(self.protocol.unwrap_or(IpProtocol::Custom(0)));
                ip.set_raw_data(&self.payload);
            }
        }

        ip.complete_packet()?;
        debug!(
            src = %layer3.src,
            dst = %layer3.dst,
            protocol = ?ip.protocol(),
            length = ip.length(),
            "Built IPv4 datagram"
        );
        Ok(ip)
    }

    /// Build the datagram and hand its bytes to `tx`
    ///
    /// The socket layer stays with the caller; `tx` is typically a closure
    /// around a raw socket send.
    ///
    /// # Errors
    ///
    /// Returns an error if building fails or `tx` fails.
    pub fn send<F>(self, mut tx: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut packet = self.build()?;
        tx(packet.get_packet()?)
    }
}

impl Default for DatagramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Packet, TransportPacket};

    #[test]
    fn test_builder_udp() {
        let src_ip = Ipv4Addr::new(192, 168, 1, 1);
        let dst_ip = Ipv4Addr::new(192, 168, 1, 2);

        let mut packet = DatagramBuilder::new()
            .ipv4(src_ip, dst_ip)
            .udp(12345, 53)
            .payload(vec![0x01, 0x02, 0x03, 0x04])
            .build()
            .unwrap();

        assert_eq!(packet.source(), src_ip);
        assert_eq!(packet.destination(), dst_ip);
        assert_eq!(packet.protocol(), IpProtocol::UDP);
        assert_eq!(packet.ttl(), 64);
        assert_eq!(packet.length(), 32);
        assert!(packet.is_checksum_valid());
        assert!(packet.verify_transport_checksum().unwrap());

        let udp = packet.get_data_object().unwrap().as_udp().unwrap();
        assert_eq!(udp.source_port(), 12345);
        assert_eq!(udp.destination_port(), 53);
        assert_eq!(udp.length(), 12);
    }

    #[test]
    fn test_builder_tcp() {
        let packet = DatagramBuilder::new()
            .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
            .tcp(12345, 80, 1000, 2000, TcpFlags::SYN)
            .payload(vec![0x01, 0x02, 0x03, 0x04])
            .build()
            .unwrap();

        assert_eq!(packet.protocol(), IpProtocol::TCP);
        assert_eq!(packet.length(), 44);
        assert!(packet.verify_transport_checksum().unwrap());

        let tcp = TcpPacket::from_bytes(packet.data()).unwrap();
        assert_eq!(tcp.source_port(), 12345);
        assert_eq!(tcp.destination_port(), 80);
        assert_eq!(tcp.sequence_number(), 1000);
        assert_eq!(tcp.acknowledgment_number(), 2000);
        assert_eq!(tcp.window_size(), 65535);
        assert!(tcp.flags().syn);
        assert_eq!(tcp.data(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_builder_window() {
        let packet = DatagramBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(1, 2, 0, 0, TcpFlags::ACK)
            .window(512)
            .build()
            .unwrap();

        let tcp = TcpPacket::from_bytes(packet.data()).unwrap();
        assert_eq!(tcp.window_size(), 512);
    }

    #[test]
    fn test_builder_config_defaults() {
        let config = CodecConfig::new().with_default_ttl(32).with_tcp_window(4096);
        let packet = DatagramBuilder::with_config(config)
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .tcp(1, 2, 0, 0, TcpFlags::SYN)
            .build()
            .unwrap();

        assert_eq!(packet.ttl(), 32);
        let attached = packet.data_packet().unwrap();
        assert_eq!(attached.protocol(), IpProtocol::TCP);
        assert_eq!(TcpPacket::from_bytes(attached.encode()).unwrap().window_size(), 4096);
    }

    #[test]
    fn test_builder_ttl_and_identification() {
        let packet = DatagramBuilder::new()
            .ipv4(Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 1, 2))
            .ttl(128)
            .identification(0x1234)
            .build()
            .unwrap();

        assert_eq!(packet.ttl(), 128);
        assert_eq!(packet.identification(), 0x1234);
        assert_eq!(packet.offset(), 0);
    }

    #[test]
    fn test_builder_random_identification() {
        let packet = DatagramBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .random_identification()
            .build()
            .unwrap();

        // Whatever was drawn, the header checksum covers it
        assert!(packet.is_checksum_valid());
    }

    #[test]
    fn test_builder_raw_protocol() {
        let packet = DatagramBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .protocol(IpProtocol::ICMP)
            .payload(vec![8, 0, 0xF7, 0xFF])
            .build()
            .unwrap();

        assert_eq!(packet.protocol(), IpProtocol::ICMP);
        assert_eq!(packet.length(), 24);
        assert_eq!(packet.data(), &[8, 0, 0xF7, 0xFF]);
        assert!(packet.data_packet().is_none());
    }

    #[test]
    fn test_builder_missing_layer3() {
        let result = DatagramBuilder::new()
            .udp(12345, 53)
            .payload(vec![0x01, 0x02])
            .build();

        assert!(matches!(result, Err(Error::PacketConstruction(_))));
    }

    #[test]
    fn test_builder_oversized_payload() {
        let result = DatagramBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .udp(1, 2)
            .payload(vec![0; 70_000])
            .build();

        assert!(matches!(result, Err(Error::PacketConstruction(_))));
    }

    #[test]
    fn test_builder_send() {
        let mut sent_packet = Vec::new();

        let result = DatagramBuilder::new()
            .ipv4(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
            .udp(5000, 5001)
            .payload(vec![0x01, 0x02, 0x03, 0x04])
            .send(|packet| {
                sent_packet = packet.to_vec();
                Ok(())
            });

        assert!(result.is_ok());
        assert_eq!(sent_packet.len(), 32);
        assert!(Ipv4Packet::from_bytes(&sent_packet).unwrap().is_checksum_valid());
    }

    #[test]
    fn test_builder_send_propagates_sink_error() {
        let result = DatagramBuilder::new()
            .ipv4(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
            .send(|_| Err(Error::construction("socket closed")));

        assert_eq!(
            result,
            Err(Error::PacketConstruction("socket closed".into()))
        );
    }
}
