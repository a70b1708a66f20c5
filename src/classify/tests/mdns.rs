// SPDX-License-Identifier: MIT

use std::net::{IpAddr, Ipv4Addr};

use pretty_assertions::assert_eq;

use super::src_mac;
use crate::classify::classify;
use crate::frame::Mac;
use crate::tests::{
    build_udp_frame, MDNS_QUERY_PAYLOAD, MDNS_RESPONSE_PAYLOAD,
};

#[test]
fn test_classify_ipv4_mdns_query() {
    let frame = build_udp_frame(
        30,
        src_mac(),
        Mac::MDNS_V4,
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        IpAddr::V4(Ipv4Addr::new(224, 0, 0, 251)),
        5353,
        5353,
        &MDNS_QUERY_PAYLOAD,
    );

    let packet = classify(&frame).unwrap();
    assert!(packet.is_dns_query);
    assert!(!packet.is_dns_response);
    assert!(!packet.is_ipv6);
    assert_eq!(packet.vlan, 30);
    assert_eq!(packet.src_mac, src_mac());
    assert_eq!(packet.dst_mac, Mac::MDNS_V4);
    assert_eq!(packet.src_ip, Some(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
    assert_eq!(
        packet.dst_ip,
        Some(IpAddr::V4(Ipv4Addr::new(224, 0, 0, 251)))
    );
    assert_eq!(packet.src_port, Some(5353));
    assert_eq!(packet.dst_port, Some(5353));
}

#[test]
fn test_classify_ipv6_mdns_response() {
    let frame = build_udp_frame(
        30,
        src_mac(),
        Mac::MDNS_V6,
        IpAddr::V6("fe80::1".parse().unwrap()),
        IpAddr::V6("ff02::fb".parse().unwrap()),
        5353,
        5353,
        &MDNS_RESPONSE_PAYLOAD,
    );

    let packet = classify(&frame).unwrap();
    assert!(packet.is_dns_response);
    assert!(!packet.is_dns_query);
    assert!(packet.is_ipv6);
    assert_eq!(packet.vlan, 30);
}

#[test]
fn test_truncated_dns_payload_is_unclassifiable() {
    let frame = build_udp_frame(
        30,
        src_mac(),
        Mac::MDNS_V4,
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        IpAddr::V4(Ipv4Addr::new(224, 0, 0, 251)),
        5353,
        5353,
        &MDNS_QUERY_PAYLOAD[..8],
    );
    assert!(classify(&frame).is_err());
}

#[test]
fn test_untagged_frame_is_rejected() {
    let tagged = build_udp_frame(
        30,
        src_mac(),
        Mac::MDNS_V4,
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
        IpAddr::V4(Ipv4Addr::new(224, 0, 0, 251)),
        5353,
        5353,
        &MDNS_QUERY_PAYLOAD,
    );
    // Splice the tag out: an untagged frame must not classify even
    // though the BPF normally guarantees its presence.
    let mut untagged = tagged[..12].to_vec();
    untagged.extend_from_slice(&tagged[16..]);
    assert!(classify(&untagged).is_err());
}
