// SPDX-License-Identifier: MIT

use std::net::IpAddr;

use netlink_packet_utils::DecodeError;

use crate::classify::MulticastPacket;
use crate::frame::{
    ipv4_header_checksum, udp_checksum_v4, udp_checksum_v6, EthernetBuffer,
    IpProtocol, Ipv4Buffer, Ipv6Buffer, Mac, UdpBuffer, VlanBuffer,
    ETHERNET_HEADER_LEN, IPV6_HEADER_LEN, TAGGED_PAYLOAD_OFFSET,
    UDP_HEADER_LEN,
};

/// The header fields to stamp on one outgoing copy of a captured frame.
/// `None` IPs mean "leave the captured address alone" and skip the
/// checksum work entirely.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Rewrite {
    pub vlan: u16,
    pub src_mac: Mac,
    pub dst_mac: Mac,
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
}

/// Produces a fresh serialized frame for one target VLAN.
///
/// The captured bytes are never aliased into the output: each target
/// VLAN gets its own copy with MACs, tag, and optionally IPs patched.
/// UDP and IPv4 header checksums are recomputed when, and only when, an
/// IP field was mutated.
pub fn rewrite_frame(
    packet: &MulticastPacket,
    rewrite: &Rewrite,
) -> Result<Vec<u8>, DecodeError> {
    let mut frame = packet.frame.clone();

    let mut eth = EthernetBuffer::new_checked(&mut frame[..])?;
    eth.set_source(rewrite.src_mac);
    eth.set_destination(rewrite.dst_mac);

    VlanBuffer::new_checked(&mut frame[ETHERNET_HEADER_LEN..])?
        .set_vlan_id(rewrite.vlan);

    if rewrite.src_ip.is_none() && rewrite.dst_ip.is_none() {
        return Ok(frame);
    }
    if packet.is_ipv6 {
        patch_ipv6(&mut frame, rewrite)?;
    } else {
        patch_ipv4(&mut frame, rewrite)?;
    }
    Ok(frame)
}

fn expect_v4(addr: IpAddr) -> Result<std::net::Ipv4Addr, DecodeError> {
    match addr {
        IpAddr::V4(addr) => Ok(addr),
        IpAddr::V6(addr) => Err(DecodeError::from(format!(
            "cannot stamp IPv6 address {addr} into an IPv4 packet"
        ))),
    }
}

fn expect_v6(addr: IpAddr) -> Result<std::net::Ipv6Addr, DecodeError> {
    match addr {
        IpAddr::V6(addr) => Ok(addr),
        IpAddr::V4(addr) => Err(DecodeError::from(format!(
            "cannot stamp IPv4 address {addr} into an IPv6 packet"
        ))),
    }
}

fn patch_ipv4(frame: &mut [u8], rewrite: &Rewrite) -> Result<(), DecodeError> {
    let header_len = {
        let ip = Ipv4Buffer::new_checked(&frame[TAGGED_PAYLOAD_OFFSET..])?;
        if IpProtocol::from(ip.protocol()) != IpProtocol::Udp {
            return Err(DecodeError::from(format!(
                "cannot rewrite IPv4 protocol {} packets",
                ip.protocol()
            )));
        }
        ip.header_len()
    };

    {
        let mut ip = Ipv4Buffer::new(&mut frame[TAGGED_PAYLOAD_OFFSET..]);
        if let Some(addr) = rewrite.src_ip {
            ip.set_source(expect_v4(addr)?);
        }
        if let Some(addr) = rewrite.dst_ip {
            ip.set_destination(expect_v4(addr)?);
        }
    }

    let checksum = ipv4_header_checksum(
        &frame[TAGGED_PAYLOAD_OFFSET..TAGGED_PAYLOAD_OFFSET + header_len],
    );
    Ipv4Buffer::new(&mut frame[TAGGED_PAYLOAD_OFFSET..]).set_checksum(checksum);

    let ip = Ipv4Buffer::new(&frame[TAGGED_PAYLOAD_OFFSET..]);
    let (src, dst) = (ip.source(), ip.destination());
    let udp_offset = TAGGED_PAYLOAD_OFFSET + header_len;
    patch_udp_checksum(frame, udp_offset, |segment| {
        udp_checksum_v4(src, dst, segment)
    })
}

fn patch_ipv6(frame: &mut [u8], rewrite: &Rewrite) -> Result<(), DecodeError> {
    {
        let mut ip = Ipv6Buffer::new_checked(&mut frame[TAGGED_PAYLOAD_OFFSET..])?;
        if IpProtocol::from(ip.next_header()) != IpProtocol::Udp {
            return Err(DecodeError::from(format!(
                "cannot rewrite IPv6 next header {} packets",
                ip.next_header()
            )));
        }
        if let Some(addr) = rewrite.src_ip {
            ip.set_source(expect_v6(addr)?);
        }
        if let Some(addr) = rewrite.dst_ip {
            ip.set_destination(expect_v6(addr)?);
        }
    }

    let ip = Ipv6Buffer::new(&frame[TAGGED_PAYLOAD_OFFSET..]);
    let (src, dst) = (ip.source(), ip.destination());
    let udp_offset = TAGGED_PAYLOAD_OFFSET + IPV6_HEADER_LEN;
    patch_udp_checksum(frame, udp_offset, |segment| {
        udp_checksum_v6(src, dst, segment)
    })
}

/// Recomputes the UDP checksum over exactly the length the UDP header
/// announces, which excludes any Ethernet trailer padding.
fn patch_udp_checksum(
    frame: &mut [u8],
    udp_offset: usize,
    checksum: impl Fn(&[u8]) -> u16,
) -> Result<(), DecodeError> {
    let udp_len =
        usize::from(UdpBuffer::new_checked(&frame[udp_offset..])?.length());
    if udp_len < UDP_HEADER_LEN || udp_offset + udp_len > frame.len() {
        return Err(DecodeError::from(format!(
            "UDP length {udp_len} does not fit the captured frame"
        )));
    }
    let value = checksum(&frame[udp_offset..udp_offset + udp_len]);
    UdpBuffer::new(&mut frame[udp_offset..]).set_checksum(value);
    Ok(())
}
