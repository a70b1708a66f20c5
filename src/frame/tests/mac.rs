// SPDX-License-Identifier: MIT

use std::net::Ipv6Addr;
use std::str::FromStr;

use pretty_assertions::assert_eq;

use crate::frame::Mac;

#[test]
fn test_display_is_lowercase_colon_separated() {
    let mac = Mac::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
}

#[test]
fn test_from_str_round_trip() {
    let mac = Mac::from_str("AA:bb:0C:dd:EE:01").unwrap();
    assert_eq!(mac, Mac::from([0xaa, 0xbb, 0x0c, 0xdd, 0xee, 0x01]));
    assert!(Mac::from_str("aa:bb:cc:dd:ee").is_err());
    assert!(Mac::from_str("aa:bb:cc:dd:ee:ff:00").is_err());
    assert!(Mac::from_str("aa:bb:cc:dd:ee:zz").is_err());
}

#[test]
fn test_multicast_bit() {
    assert!(Mac::MDNS_V4.is_multicast());
    assert!(Mac::SSDP_V6.is_multicast());
    assert!(Mac::BROADCAST.is_multicast());
    assert!(!Mac::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]).is_multicast());
}

// RFC 2464 sections 4 and 5: ff:fe spliced into the middle and the
// universal/local bit of the first octet inverted.
#[test]
fn test_link_local_derivation() {
    let mac = Mac::from([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
    assert_eq!(
        mac.link_local(),
        Ipv6Addr::from_str("fe80::11:22ff:fe33:4455").unwrap()
    );

    let mac = Mac::from([0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb]);
    assert_eq!(
        mac.link_local(),
        Ipv6Addr::from_str("fe80::b9bb:bbff:febb:bbbb").unwrap()
    );
}
