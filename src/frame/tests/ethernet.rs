// SPDX-License-Identifier: MIT

use netlink_packet_utils::{Emitable, Parseable};
use pretty_assertions::assert_eq;

use crate::frame::{
    EthernetBuffer, EthernetHeader, Ethertype, VlanBuffer, VlanHeader,
    ETHERNET_HEADER_LEN,
};

// The first 18 bytes of a tagged mDNS query: group MAC destination,
// 802.1Q tag with PCP 5 on VLAN 30, IPv4 inside.
const TAGGED_HEADER: [u8; 18] = [
    0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x01,
    0x81, 0x00, 0xa0, 0x1e, 0x08, 0x00,
];

#[test]
fn test_parse_tagged_header() {
    let eth = EthernetBuffer::new_checked(&TAGGED_HEADER[..]).unwrap();
    let expected = EthernetHeader {
        destination: [0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb].into(),
        source: [0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x01].into(),
        ethertype: Ethertype::Vlan,
    };
    assert_eq!(EthernetHeader::parse(&eth).unwrap(), expected);

    let tag = VlanBuffer::new_checked(eth.payload()).unwrap();
    let expected = VlanHeader {
        priority: 5,
        drop_eligible: false,
        vlan_id: 30,
        ethertype: Ethertype::IPv4,
    };
    assert_eq!(VlanHeader::parse(&tag).unwrap(), expected);

    let mut buf = vec![0; 18];
    EthernetHeader::parse(&eth).unwrap().emit(&mut buf);
    VlanHeader::parse(&tag)
        .unwrap()
        .emit(&mut buf[ETHERNET_HEADER_LEN..]);
    assert_eq!(buf, TAGGED_HEADER);
}

#[test]
fn test_set_vlan_id_preserves_pcp_and_dei() {
    let mut raw = TAGGED_HEADER;
    let mut tag = VlanBuffer::new(&mut raw[ETHERNET_HEADER_LEN..]);
    tag.set_vlan_id(4094);
    assert_eq!(tag.vlan_id(), 4094);
    assert_eq!(tag.priority(), 5);
    assert!(!tag.drop_eligible());
}

#[test]
fn test_vlan_ethertypes() {
    assert!(Ethertype::from(0x8100).is_vlan());
    assert!(Ethertype::from(0x88a8).is_vlan());
    assert!(Ethertype::from(0x9100).is_vlan());
    assert!(!Ethertype::from(0x0800).is_vlan());
    assert_eq!(u16::from(Ethertype::from(0x1234)), 0x1234);
}

#[test]
fn test_reject_truncated_ethernet() {
    assert!(EthernetBuffer::new_checked(&TAGGED_HEADER[..10]).is_err());
}
