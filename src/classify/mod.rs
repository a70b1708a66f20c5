// SPDX-License-Identifier: MIT

mod dns;
mod ssdp;

#[cfg(test)]
mod tests;

pub use self::dns::MDNS_PORT;
pub use self::ssdp::{MX_MAX, SSDP_PORT};

use std::net::IpAddr;

use anyhow::Context;
use netlink_packet_utils::DecodeError;

use crate::frame::{
    ArpBuffer, EthernetBuffer, Ethertype, Icmpv6Buffer, Icmpv6Type,
    IpProtocol, Ipv4Buffer, Ipv6Buffer, Mac, UdpBuffer, VlanBuffer,
};

/// One admitted observation from the trunk: the raw frame plus
/// everything the forwarders need to route it.
///
/// Parsing is lazy per layer: a frame is abandoned with an error as soon
/// as a layer makes it unclassifiable, and the deeper protocol layers
/// (full ARP, NS target, DNS records) are left to the handler that
/// consumes the packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MulticastPacket {
    pub frame: Vec<u8>,
    pub vlan: u16,
    pub src_mac: Mac,
    pub dst_mac: Mac,
    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub is_ipv6: bool,
    pub is_arp: bool,
    pub is_ndp: bool,
    pub is_dns_query: bool,
    pub is_dns_response: bool,
    pub is_ssdp_query: bool,
    pub is_ssdp_advertisement: bool,
    pub is_ssdp_response: bool,
    /// Clamped M-SEARCH MX value in seconds; zero unless `is_ssdp_query`.
    pub max_wait: u64,
}

impl MulticastPacket {
    fn new(frame: &[u8], vlan: u16, src_mac: Mac, dst_mac: Mac) -> Self {
        Self {
            frame: frame.to_vec(),
            vlan,
            src_mac,
            dst_mac,
            src_ip: None,
            dst_ip: None,
            src_port: None,
            dst_port: None,
            is_ipv6: false,
            is_arp: false,
            is_ndp: false,
            is_dns_query: false,
            is_dns_response: false,
            is_ssdp_query: false,
            is_ssdp_advertisement: false,
            is_ssdp_response: false,
            max_wait: 0,
        }
    }

    fn classified(&self) -> bool {
        self.is_arp
            || self.is_ndp
            || self.is_dns_query
            || self.is_dns_response
            || self.is_ssdp_query
            || self.is_ssdp_advertisement
            || self.is_ssdp_response
    }
}

impl std::fmt::Display for MulticastPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_arp {
            "arp"
        } else if self.is_ndp {
            "ndp"
        } else if self.is_dns_query {
            "dns-query"
        } else if self.is_dns_response {
            "dns-response"
        } else if self.is_ssdp_query {
            "ssdp-query"
        } else if self.is_ssdp_advertisement {
            "ssdp-advertisement"
        } else if self.is_ssdp_response {
            "ssdp-response"
        } else {
            "unclassified"
        };
        write!(
            f,
            "{kind} vlan {} {} > {}",
            self.vlan, self.src_mac, self.dst_mac
        )?;
        if let (Some(src), Some(dst)) = (self.src_ip, self.dst_ip) {
            write!(f, " {src} > {dst}")?;
        }
        if let (Some(src), Some(dst)) = (self.src_port, self.dst_port) {
            write!(f, " udp {src} > {dst}")?;
        }
        Ok(())
    }
}

/// Classifies a captured frame into a [MulticastPacket].
///
/// The BPF pre-filter has already narrowed traffic down to tagged ARP,
/// ICMPv6, discovery multicast and unicast addressed to the reflector;
/// everything that still fails to classify is a decode error for the
/// caller to drop at debug level.
pub fn classify(raw: &[u8]) -> Result<MulticastPacket, DecodeError> {
    let eth = EthernetBuffer::new_checked(raw)
        .context("failed to parse Ethernet header")?;
    if !Ethertype::from(eth.ethertype()).is_vlan() {
        return Err(DecodeError::from(format!(
            "untagged frame with ethertype {:#06x}",
            eth.ethertype()
        )));
    }
    let tag = VlanBuffer::new_checked(eth.payload())
        .context("failed to parse 802.1Q tag")?;

    let mut packet =
        MulticastPacket::new(raw, tag.vlan_id(), eth.source(), eth.destination());

    match Ethertype::from(tag.ethertype()) {
        Ethertype::Arp => {
            ArpBuffer::new_checked(tag.payload())
                .context("failed to parse ARP packet")?;
            packet.is_arp = true;
        }
        Ethertype::IPv4 => {
            let ip = Ipv4Buffer::new_checked(tag.payload())
                .context("failed to parse IPv4 header")?;
            packet.src_ip = Some(ip.source().into());
            packet.dst_ip = Some(ip.destination().into());
            match IpProtocol::from(ip.protocol()) {
                IpProtocol::Udp => classify_udp(&mut packet, ip.payload())?,
                protocol => {
                    return Err(DecodeError::from(format!(
                        "unhandled IPv4 protocol {:?}",
                        protocol
                    )))
                }
            }
        }
        Ethertype::IPv6 => {
            let ip = Ipv6Buffer::new_checked(tag.payload())
                .context("failed to parse IPv6 header")?;
            packet.is_ipv6 = true;
            packet.src_ip = Some(ip.source().into());
            packet.dst_ip = Some(ip.destination().into());
            match IpProtocol::from(ip.next_header()) {
                IpProtocol::Icmpv6 => {
                    let icmp = Icmpv6Buffer::new_checked(ip.payload())
                        .context("failed to parse ICMPv6 header")?;
                    match Icmpv6Type::from(icmp.msg_type()) {
                        Icmpv6Type::NeighborSolicitation => {
                            packet.is_ndp = true;
                        }
                        kind => {
                            return Err(DecodeError::from(format!(
                                "unhandled ICMPv6 type {:?}",
                                kind
                            )))
                        }
                    }
                }
                IpProtocol::Udp => classify_udp(&mut packet, ip.payload())?,
                protocol => {
                    return Err(DecodeError::from(format!(
                        "unhandled IPv6 next header {:?}",
                        protocol
                    )))
                }
            }
        }
        ethertype => {
            return Err(DecodeError::from(format!(
                "unhandled inner ethertype {:?}",
                ethertype
            )))
        }
    }

    if packet.classified() {
        Ok(packet)
    } else {
        Err(DecodeError::from(format!("unclassifiable packet: {packet}")))
    }
}

fn classify_udp(
    packet: &mut MulticastPacket,
    segment: &[u8],
) -> Result<(), DecodeError> {
    let udp = UdpBuffer::new_checked(segment)
        .context("failed to parse UDP header")?;
    packet.src_port = Some(udp.source_port());
    packet.dst_port = Some(udp.destination_port());
    let payload = udp.payload();
    match udp.destination_port() {
        MDNS_PORT => match dns::classify(payload) {
            Some(dns::DnsClass::Query) => packet.is_dns_query = true,
            Some(dns::DnsClass::Response) => packet.is_dns_response = true,
            None => (),
        },
        SSDP_PORT => match ssdp::classify_request(payload) {
            Some(ssdp::SsdpRequest::Query { max_wait }) => {
                packet.is_ssdp_query = true;
                packet.max_wait = max_wait;
            }
            Some(ssdp::SsdpRequest::Advertisement) => {
                packet.is_ssdp_advertisement = true;
            }
            None => (),
        },
        _ => {
            if ssdp::is_search_response(payload) {
                packet.is_ssdp_response = true;
            }
        }
    }
    Ok(())
}
