//! Example: Building a UDP datagram
//!
//! This example nests a UDP datagram inside an IPv4 packet by hand, lets
//! `get_packet` fill in lengths and checksums, and dumps the result.

use rawnet_packet::{IpProtocol, Ipv4Packet, Packet, UdpPacket};

fn main() -> rawnet_core::Result<()> {
    let level = if std::env::var_os("RAWNET_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut udp = UdpPacket::new();
    udp.set_source_port(54321);
    udp.set_destination_port(12345);
    udp.set_data(b"Hello World");

    let mut ip = Ipv4Packet::new();
    ip.set_identification(1);
    ip.set_offset(0);
    ip.set_ttl(255);
    ip.set_protocol(IpProtocol::UDP);
    ip.set_source_str("192.168.1.1")?;
    ip.set_destination_str("192.168.1.100")?;
    ip.set_data(udp);

    let bytes = ip.get_packet()?.to_vec();

    println!("UDP datagram built successfully!");
    println!("Total size: {} bytes", bytes.len());
    println!("IP total length: {}", ip.length());
    println!("IP checksum: 0x{:04X}", ip.checksum());
    if let Some(udp) = ip.get_data_object()?.as_udp() {
        println!("UDP length: {}", udp.length());
        println!("UDP checksum: 0x{:04X}", udp.checksum());
    }
    println!("\n{}", ip.dump());

    Ok(())
}
