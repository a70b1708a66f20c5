// SPDX-License-Identifier: MIT

mod arp;
mod checksum;
mod ethernet;
mod icmpv6;
mod ip;
mod mac;
mod udp;

#[cfg(test)]
mod tests;

pub use self::arp::{ArpBuffer, ArpOperation, ArpPacket, ARP_PACKET_LEN};
pub use self::checksum::{
    icmpv6_checksum, ipv4_header_checksum, udp_checksum_v4, udp_checksum_v6,
};
pub use self::ethernet::{
    EthernetBuffer, EthernetHeader, Ethertype, VlanBuffer, VlanHeader,
    ETHERNET_HEADER_LEN, TAGGED_PAYLOAD_OFFSET, VLAN_HEADER_LEN,
};
pub use self::icmpv6::{
    Icmpv6Buffer, Icmpv6Type, NeighborAdvert, NeighborSolicit,
    NA_FLAG_OVERRIDE, NA_FLAG_SOLICITED,
};
pub use self::ip::{
    IpProtocol, Ipv4Buffer, Ipv6Buffer, Ipv6Header, IPV6_HEADER_LEN,
};
pub use self::mac::Mac;
pub use self::udp::{UdpBuffer, UDP_HEADER_LEN};
