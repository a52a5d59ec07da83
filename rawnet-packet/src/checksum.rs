//! Checksum calculations for network packets
//!
//! This module provides the Internet Checksum (RFC 1071) used in IP, TCP,
//! and UDP headers, together with the IPv4 pseudo-header that TCP and UDP
//! fold into their checksums.

use crate::buffer::ByteBuffer;
use crate::ip::{IpProtocol, Ipv4Packet};
use rawnet_core::Result;
use std::net::Ipv4Addr;

/// 16-bit one's complement accumulator.
///
/// Additions that carry out of bit 15 wrap the carry back into bit 0
/// (end-around carry), so the running value always fits in 16 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnesComplementSum(u16);

impl OnesComplementSum {
    pub fn new() -> Self {
        OnesComplementSum(0)
    }

    /// Add one 16-bit word
    pub fn add_word(&mut self, word: u16) {
        let (sum, carry) = self.0.overflowing_add(word);
        // With a carry the wrapped sum is at most 0xFFFE, so this cannot overflow
        self.0 = sum + carry as u16;
    }

    /// Add a sequence of 16-bit words
    pub fn add_words(&mut self, words: &[u16]) {
        for &word in words {
            self.add_word(word);
        }
    }

    /// Add `data` as big-endian 16-bit words, padding an odd tail with a zero byte
    pub fn add_bytes(&mut self, data: &[u8]) {
        let mut chunks = data.chunks_exact(2);
        for chunk in &mut chunks {
            self.add_word(u16::from_be_bytes([chunk[0], chunk[1]]));
        }

        if let Some(&byte) = chunks.remainder().first() {
            self.add_word(u16::from_be_bytes([byte, 0]));
        }
    }

    /// The accumulated sum before complementing
    pub fn sum(self) -> u16 {
        self.0
    }

    /// The checksum to transmit: the complemented sum
    pub fn finish(self) -> u16 {
        !self.0
    }
}

/// Calculates the Internet Checksum as defined in RFC 1071.
///
/// The data is treated as a sequence of big-endian 16-bit words, summed with
/// end-around carry, and the one's complement of the sum is returned.
///
/// # Examples
///
/// ```
/// use rawnet_packet::checksum::internet_checksum;
///
/// let data = vec![0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
/// assert_eq!(internet_checksum(&data), 0x220d);
/// ```
pub fn internet_checksum(data: &[u8]) -> u16 {
    internet_checksum_with(data, &[])
}

/// Calculates the Internet Checksum over `data` plus extra pseudo-header words.
pub fn internet_checksum_with(data: &[u8], pseudo_words: &[u16]) -> u16 {
    let mut sum = OnesComplementSum::new();
    sum.add_bytes(data);
    sum.add_words(pseudo_words);
    sum.finish()
}

/// Returns the one's complement sum of `data` without complementing it.
///
/// Summing a range whose checksum field already holds the correct value
/// yields `0xFFFF`.
pub fn checksum_accumulate(data: &[u8]) -> u16 {
    let mut sum = OnesComplementSum::new();
    sum.add_bytes(data);
    sum.sum()
}

/// Validates an Internet checksum.
///
/// The checksum is recomputed over the range including the stored checksum
/// field; a correct range sums to all ones, so the result is 0. A result of
/// 0xFFFF only comes from an all-zero range, i.e. no checksum at all, and is
/// rejected.
pub fn validate_checksum(data: &[u8]) -> bool {
    internet_checksum(data) == 0
}

/// The IPv4 pseudo-header prepended (conceptually) to TCP and UDP segments
/// when computing their checksums. It is never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: IpProtocol,
    /// Transport segment length (header + payload)
    pub length: u16,
}

impl PseudoHeader {
    pub fn new(
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: IpProtocol,
        length: u16,
    ) -> Self {
        PseudoHeader {
            source,
            destination,
            protocol,
            length,
        }
    }

    /// Build a pseudo-header from the address fields of an IPv4 header buffer
    pub fn from_ipv4_header(
        ip_header: &ByteBuffer,
        protocol: IpProtocol,
        length: u16,
    ) -> Result<Self> {
        let source = ip_header.get_field(Ipv4Packet::SOURCE)?;
        let destination = ip_header.get_field(Ipv4Packet::DESTINATION)?;

        Ok(PseudoHeader::new(
            Ipv4Addr::from(source),
            Ipv4Addr::from(destination),
            protocol,
            length,
        ))
    }

    /// Words in summation order: source high/low, destination high/low,
    /// protocol (zero-extended), length
    pub fn words(&self) -> [u16; 6] {
        let src = u32::from(self.source);
        let dst = u32::from(self.destination);
        [
            (src >> 16) as u16,
            src as u16,
            (dst >> 16) as u16,
            dst as u16,
            self.protocol.to_u8() as u16,
            self.length,
        ]
    }
}

/// Calculates the checksum for a TCP or UDP segment including the pseudo-header.
///
/// `segment` is the full transport segment (header and payload) with its
/// checksum field zeroed.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use rawnet_packet::checksum::{transport_checksum, PseudoHeader};
/// use rawnet_packet::IpProtocol;
///
/// let segment = vec![0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
/// let pseudo = PseudoHeader::new(
///     Ipv4Addr::new(192, 168, 1, 1),
///     Ipv4Addr::new(192, 168, 1, 2),
///     IpProtocol::UDP,
///     segment.len() as u16,
/// );
/// let checksum = transport_checksum(&pseudo, &segment);
/// ```
pub fn transport_checksum(pseudo: &PseudoHeader, segment: &[u8]) -> u16 {
    internet_checksum_with(segment, &pseudo.words())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internet_checksum_empty() {
        let data = vec![];
        let checksum = internet_checksum(&data);
        assert_eq!(checksum, 0xFFFF);
    }

    #[test]
    fn test_internet_checksum_rfc1071() {
        // Worked example from RFC 1071 section 3
        let data = vec![0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum_accumulate(&data), 0xddf2);
        assert_eq!(internet_checksum(&data), 0x220d);
    }

    #[test]
    fn test_internet_checksum_ipv4_header() {
        let header = vec![
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(internet_checksum(&header), 0xb861);
    }

    #[test]
    fn test_internet_checksum_odd_length() {
        // Odd tail is padded with a zero low byte
        assert_eq!(
            internet_checksum(&[0x00, 0x01, 0x02]),
            internet_checksum(&[0x00, 0x01, 0x02, 0x00])
        );
    }

    #[test]
    fn test_end_around_carry() {
        let mut sum = OnesComplementSum::new();
        sum.add_word(0xFFFF);
        sum.add_word(0x0001);
        // 0x1_0000 wraps to 0x0001
        assert_eq!(sum.sum(), 0x0001);

        sum.add_word(0xFFFE);
        assert_eq!(sum.sum(), 0xFFFF);
        assert_eq!(sum.finish(), 0x0000);
    }

    #[test]
    fn test_word_plus_complement_sweep() {
        for word in 0..=u16::MAX {
            let mut sum = OnesComplementSum::new();
            sum.add_word(word);
            sum.add_word(!word);
            assert_eq!(sum.sum(), 0xFFFF, "word {:#06x}", word);
        }
    }

    #[test]
    fn test_validate_checksum() {
        let data = vec![0x45, 0x00, 0x00, 0x3c];
        let checksum = internet_checksum(&data);

        // Create data with checksum included
        let mut data_with_checksum = data.clone();
        data_with_checksum.extend_from_slice(&checksum.to_be_bytes());

        // Checksum of data including the checksum should be valid
        assert!(validate_checksum(&data_with_checksum));
    }

    #[test]
    fn test_validate_rejects_all_zero_range() {
        // Sums to zero, so the recomputed checksum is 0xFFFF: nothing was computed
        assert_eq!(internet_checksum(&[0u8; 20]), 0xFFFF);
        assert!(!validate_checksum(&[0u8; 20]));
        assert!(!validate_checksum(&[]));
    }

    #[test]
    fn test_verification_sum_is_all_ones() {
        // Checksum field at offset 0, followed by payloads of both parities
        for tail in [&b"Hello World"[..], &b"Hello World!"[..], &[0xFF; 7][..], &[][..]] {
            let mut data = vec![0x00, 0x00];
            data.extend_from_slice(tail);

            let checksum = internet_checksum(&data);
            data[..2].copy_from_slice(&checksum.to_be_bytes());

            assert_eq!(checksum_accumulate(&data), 0xFFFF);
        }
    }

    #[test]
    fn test_pseudo_header_words() {
        let pseudo = PseudoHeader::new(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            IpProtocol::TCP,
            40,
        );

        assert_eq!(pseudo.words(), [0xC0A8, 0x0101, 0x0A00, 0x0002, 6, 40]);
    }

    #[test]
    fn test_pseudo_header_from_ipv4_header() {
        let mut header = ByteBuffer::with_size(Ipv4Packet::HEADER_SIZE);
        header.set_field(Ipv4Packet::SOURCE, 0x7F00_0001);
        header.set_field(Ipv4Packet::DESTINATION, 0xC0A8_0164);

        let pseudo = PseudoHeader::from_ipv4_header(&header, IpProtocol::UDP, 19).unwrap();

        assert_eq!(pseudo.source, Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(pseudo.destination, Ipv4Addr::new(192, 168, 1, 100));
        assert_eq!(pseudo.words()[4], 17);
        assert_eq!(pseudo.words()[5], 19);
    }

    #[test]
    fn test_pseudo_header_from_short_buffer() {
        let header = ByteBuffer::with_size(12);
        assert!(PseudoHeader::from_ipv4_header(&header, IpProtocol::UDP, 8).is_err());
    }

    #[test]
    fn test_transport_checksum_matches_flat_layout() {
        let segment = vec![0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
        let pseudo = PseudoHeader::new(
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 2),
            IpProtocol::UDP,
            8,
        );

        // Same sum laid out as the classic 12-byte pseudo-header prefix
        let mut flat = vec![192, 168, 1, 1, 192, 168, 1, 2, 0, 17, 0, 8];
        flat.extend_from_slice(&segment);

        assert_eq!(transport_checksum(&pseudo, &segment), internet_checksum(&flat));
    }
}
