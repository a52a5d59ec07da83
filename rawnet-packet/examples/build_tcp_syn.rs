//! Example: Building a TCP SYN packet
//!
//! This example uses the datagram builder to produce a TCP SYN packet and
//! hands the finished bytes to a stand-in for a raw socket.

use rawnet_packet::tcp::TcpFlags;
use rawnet_packet::{DatagramBuilder, Packet};
use std::net::Ipv4Addr;

fn main() -> rawnet_core::Result<()> {
    let level = if std::env::var_os("RAWNET_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let src_ip = Ipv4Addr::new(127, 0, 0, 1);
    let dst_ip = Ipv4Addr::new(127, 0, 0, 1);

    let builder = DatagramBuilder::new()
        .ipv4(src_ip, dst_ip)
        .random_identification()
        .tcp(
            80,   // Source port
            80,   // Destination port (HTTP)
            1000, // Initial sequence number
            0,    // Acknowledgment number (0 for SYN)
            TcpFlags::SYN,
        )
        .window(65535);

    let packet = builder.clone().build()?;
    println!("TCP SYN packet built successfully!");
    println!("Total size: {} bytes", packet.len());
    println!("IP identification: 0x{:04X}", packet.identification());
    println!("TCP checksum valid: {}", packet.verify_transport_checksum()?);

    // Parse the flags byte to verify
    let tcp_flags_byte = packet.data()[13];
    println!("TCP flags byte: 0x{:02X}", tcp_flags_byte);
    println!("  SYN flag set: {}", (tcp_flags_byte & 0x02) != 0);

    builder.send(|bytes| {
        println!("\nWould send {} bytes:\n{}", bytes.len(), packet.dump());
        Ok(())
    })
}
