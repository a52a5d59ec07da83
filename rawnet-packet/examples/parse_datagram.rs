//! Example: Parsing a received datagram
//!
//! Decodes a captured IPv4/UDP datagram, verifies both checksums and prints
//! the header fields.

use rawnet_core::CodecConfig;
use rawnet_packet::{DecodedPayload, Ipv4Packet, Packet};

const CAPTURED: &str =
    "4500002700010000ff11380fc0a80101c0a80164d4313039001325d948656c6c6f20576f726c64";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = if std::env::var_os("RAWNET_DEBUG").is_some() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let raw = hex::decode(CAPTURED)?;
    let mut ip = Ipv4Packet::from_received(&raw, &CodecConfig::default())?;

    println!("{} -> {}", ip.source(), ip.destination());
    println!("Protocol: {:?}, TTL: {}", ip.protocol(), ip.ttl());
    println!("Header checksum valid: {}", ip.is_checksum_valid());
    println!("Transport checksum valid: {}", ip.verify_transport_checksum()?);

    match ip.get_data_object()? {
        DecodedPayload::Udp(udp) => {
            println!(
                "UDP {} -> {} ({} bytes): {}",
                udp.source_port(),
                udp.destination_port(),
                udp.length(),
                String::from_utf8_lossy(udp.data())
            );
        }
        DecodedPayload::Raw(raw) => println!("Raw payload:\n{}", raw.dump()),
    }

    Ok(())
}
