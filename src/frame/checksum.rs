// SPDX-License-Identifier: MIT

//! Internet checksum (RFC 1071) helpers for the header surgery the
//! forwarders perform. Each function returns the value to store in the
//! respective checksum field; the stored field itself is skipped while
//! summing so callers do not have to zero it first.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Sums `data` as big-endian 16-bit words, padding an odd tail with zero.
/// `skip` is the byte offset of a 16-bit field to treat as zero.
fn sum_be_words(data: &[u8], skip: Option<usize>) -> u32 {
    let mut sum = 0u32;
    let mut i = 0;
    while i < data.len() {
        if Some(i) == skip {
            i += 2;
            continue;
        }
        let word = if i + 1 < data.len() {
            (u32::from(data[i]) << 8) | u32::from(data[i + 1])
        } else {
            u32::from(data[i]) << 8
        };
        sum += word;
        i += 2;
    }
    sum
}

fn finish(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Checksum of an IPv4 header (the header's own checksum field ignored).
pub fn ipv4_header_checksum(header: &[u8]) -> u16 {
    finish(sum_be_words(header, Some(10)))
}

fn pseudo_header_v4(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, len: u32) -> u32 {
    sum_be_words(&src.octets(), None)
        + sum_be_words(&dst.octets(), None)
        + u32::from(protocol)
        + len
}

fn pseudo_header_v6(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    next_header: u8,
    len: u32,
) -> u32 {
    sum_be_words(&src.octets(), None)
        + sum_be_words(&dst.octets(), None)
        + u32::from(next_header)
        + len
}

/// UDP checksum over the IPv4 pseudo-header. `segment` is the UDP header
/// plus payload. A computed zero is transmitted as `0xffff` (RFC 768).
pub fn udp_checksum_v4(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> u16 {
    let sum = pseudo_header_v4(src, dst, 17, segment.len() as u32)
        + sum_be_words(segment, Some(6));
    match finish(sum) {
        0 => 0xffff,
        value => value,
    }
}

/// UDP checksum over the IPv6 pseudo-header (RFC 2460 section 8.1).
pub fn udp_checksum_v6(src: Ipv6Addr, dst: Ipv6Addr, segment: &[u8]) -> u16 {
    let sum = pseudo_header_v6(src, dst, 17, segment.len() as u32)
        + sum_be_words(segment, Some(6));
    match finish(sum) {
        0 => 0xffff,
        value => value,
    }
}

/// ICMPv6 checksum over the IPv6 pseudo-header. `message` is the full
/// ICMPv6 message starting at its type octet.
pub fn icmpv6_checksum(src: Ipv6Addr, dst: Ipv6Addr, message: &[u8]) -> u16 {
    finish(
        pseudo_header_v6(src, dst, 58, message.len() as u32)
            + sum_be_words(message, Some(2)),
    )
}
