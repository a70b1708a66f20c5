// SPDX-License-Identifier: MIT

use std::net::{Ipv4Addr, Ipv6Addr};

use netlink_packet_utils::{
    traits::{Emitable, Parseable},
    DecodeError,
};

use crate::capture::FrameWriter;
use crate::classify::MulticastPacket;
use crate::diag::bump;
use crate::frame::{
    icmpv6_checksum, ArpBuffer, ArpOperation, ArpPacket, EthernetHeader,
    Ethertype, Icmpv6Buffer, IpProtocol, Ipv6Buffer, Ipv6Header, Mac,
    NeighborAdvert, NeighborSolicit, VlanHeader, ETHERNET_HEADER_LEN,
    IPV6_HEADER_LEN, NA_FLAG_SOLICITED, TAGGED_PAYLOAD_OFFSET,
};

use super::ReflectorContext;

const ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// Claims the reflector's addresses on every configured VLAN: one
/// gratuitous ARP per VLAN IPv4, and one unsolicited Neighbor
/// Advertisement for the link-local derived from the NIC MAC.
pub fn announce(writer: &dyn FrameWriter, ctx: &ReflectorContext) {
    for (vlan, ip) in ctx.policy.vlan_ips() {
        let frame = build_arp_reply(ctx.mac, Mac::BROADCAST, ip, ip, vlan);
        if let Err(e) = writer.write_frame(&frame) {
            log::error!("error sending gratuitous arp on vlan {vlan}: {e}");
            continue;
        }
    }
    for (vlan, _) in ctx.policy.vlan_ips() {
        let frame = build_neighbor_advert(
            ctx.mac,
            Mac::ALL_NODES_V6,
            ctx.link_local,
            ALL_NODES,
            vlan,
        );
        if let Err(e) = writer.write_frame(&frame) {
            log::error!(
                "error sending ipv6 neighbor advertisement \
                (optimistic DAD) on vlan {vlan}: {e}"
            );
            continue;
        }
    }
}

/// Replies to ARP requests for the VLAN's impersonated IPv4.
pub(crate) fn process_arp(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    packet: &MulticastPacket,
) {
    let Some(ip) = ctx.policy.vlan_ip(packet.vlan) else {
        return;
    };
    let arp = match parse_arp(&packet.frame) {
        Ok(arp) => arp,
        Err(e) => {
            log::debug!("dropping malformed ARP packet: {e}");
            return;
        }
    };
    if arp.operation != ArpOperation::Request {
        return;
    }
    if arp.target_protocol_addr != ip {
        return;
    }

    let frame = build_arp_reply(
        ctx.mac,
        arp.sender_hardware_addr,
        ip,
        arp.sender_protocol_addr,
        packet.vlan,
    );
    if let Err(e) = writer.write_frame(&frame) {
        log::error!("error sending arp reply: {e}");
        return;
    }
    bump(&ctx.stats.arp_replies);
    log::debug!("replied to arp from {} for ip {ip}", arp.sender_hardware_addr);
}

/// Replies to Neighbor Solicitations targeting the reflector's
/// link-local address on any VLAN it impersonates.
pub(crate) fn process_neighbor_solicitation(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    packet: &MulticastPacket,
) {
    if ctx.policy.vlan_ip(packet.vlan).is_none() {
        return;
    }
    let (src_ip, solicit) = match parse_solicitation(&packet.frame) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("dropping malformed neighbor solicitation: {e}");
            return;
        }
    };
    if solicit.target != ctx.link_local {
        return;
    }

    let frame = build_neighbor_advert(
        ctx.mac,
        packet.src_mac,
        ctx.link_local,
        src_ip,
        packet.vlan,
    );
    if let Err(e) = writer.write_frame(&frame) {
        log::error!("error sending neighbor advertisement: {e}");
        return;
    }
    bump(&ctx.stats.ndp_replies);
    log::info!(
        "replied to {} for ip {}",
        packet.src_mac,
        ctx.link_local
    );
}

fn network_layer(frame: &[u8]) -> Result<&[u8], DecodeError> {
    if frame.len() < TAGGED_PAYLOAD_OFFSET {
        return Err(DecodeError::from(format!(
            "tagged frame of {} bytes has no network layer",
            frame.len()
        )));
    }
    Ok(&frame[TAGGED_PAYLOAD_OFFSET..])
}

fn parse_arp(frame: &[u8]) -> Result<ArpPacket, DecodeError> {
    ArpPacket::parse(&ArpBuffer::new_checked(network_layer(frame)?)?)
}

fn parse_solicitation(
    frame: &[u8],
) -> Result<(Ipv6Addr, NeighborSolicit), DecodeError> {
    let ip = Ipv6Buffer::new_checked(network_layer(frame)?)?;
    let solicit =
        NeighborSolicit::parse(&Icmpv6Buffer::new_checked(ip.payload())?)?;
    Ok((ip.source(), solicit))
}

/// An ARP reply frame, also used for the gratuitous announcement where
/// sender and target protocol addresses coincide.
fn build_arp_reply(
    src_mac: Mac,
    dst_mac: Mac,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    vlan: u16,
) -> Vec<u8> {
    let eth = EthernetHeader {
        destination: dst_mac,
        source: src_mac,
        ethertype: Ethertype::Vlan,
    };
    let tag = VlanHeader::new(vlan, Ethertype::Arp);
    let arp = ArpPacket {
        operation: ArpOperation::Reply,
        sender_hardware_addr: src_mac,
        sender_protocol_addr: src_ip,
        target_hardware_addr: dst_mac,
        target_protocol_addr: dst_ip,
    };

    let mut frame =
        vec![0; TAGGED_PAYLOAD_OFFSET + arp.buffer_len()];
    eth.emit(&mut frame);
    tag.emit(&mut frame[ETHERNET_HEADER_LEN..]);
    arp.emit(&mut frame[TAGGED_PAYLOAD_OFFSET..]);
    frame
}

/// A Neighbor Advertisement for the reflector's link-local address.
///
/// Solicited is set for unicast replies and cleared for multicast ones;
/// Override stays clear because the address is announced optimistically
/// (RFC 4429) and must not clobber a defended cache entry.
fn build_neighbor_advert(
    src_mac: Mac,
    dst_mac: Mac,
    link_local: Ipv6Addr,
    dst_ip: Ipv6Addr,
    vlan: u16,
) -> Vec<u8> {
    let eth = EthernetHeader {
        destination: dst_mac,
        source: src_mac,
        ethertype: Ethertype::Vlan,
    };
    let tag = VlanHeader::new(vlan, Ethertype::IPv6);
    let advert = NeighborAdvert {
        flags: if dst_ip.is_multicast() {
            0
        } else {
            NA_FLAG_SOLICITED
        },
        target: link_local,
        target_lla: Some(src_mac),
    };
    let ip = Ipv6Header {
        payload_len: advert.buffer_len() as u16,
        next_header: IpProtocol::Icmpv6,
        hop_limit: 255,
        source: link_local,
        destination: dst_ip,
    };

    let icmp_offset = TAGGED_PAYLOAD_OFFSET + IPV6_HEADER_LEN;
    let mut frame = vec![0; icmp_offset + advert.buffer_len()];
    eth.emit(&mut frame);
    tag.emit(&mut frame[ETHERNET_HEADER_LEN..]);
    ip.emit(&mut frame[TAGGED_PAYLOAD_OFFSET..]);
    advert.emit(&mut frame[icmp_offset..]);

    // The checksum binds to the IPv6 pseudo-header, so it is computed
    // over the finished message and patched in last.
    let checksum =
        icmpv6_checksum(link_local, dst_ip, &frame[icmp_offset..]);
    Icmpv6Buffer::new(&mut frame[icmp_offset..]).set_checksum(checksum);
    frame
}
