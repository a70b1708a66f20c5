// SPDX-License-Identifier: MIT

// Shared fixtures for the per-module test suites: synthetic frame
// builders, a recording frame writer, and independent checksum
// verifiers. The round-trip test at the bottom covers the whole
// parse -> rewrite -> parse cycle; detailed parsing and forwarding
// behavior lives in each component's own tests module.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use netlink_packet_utils::Emitable;
use parking_lot::Mutex;

use crate::capture::{CaptureError, FrameWriter};
use crate::frame::{
    EthernetHeader, Ethertype, IpProtocol, Ipv4Buffer, Ipv6Buffer,
    Ipv6Header, Mac, UdpBuffer, VlanBuffer, VlanHeader,
    ETHERNET_HEADER_LEN, IPV6_HEADER_LEN, TAGGED_PAYLOAD_OFFSET,
    UDP_HEADER_LEN,
};

pub(crate) const MDNS_QUERY_PAYLOAD: [u8; 29] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm',
    0x00, 0x00, 0x01, 0x00, 0x01,
];

pub(crate) const MDNS_RESPONSE_PAYLOAD: [u8; 41] = [
    0x00, 0x00, 0x84, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
    0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm',
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x04, 0x00, 0x00, 0x04, 0x01,
    0x02, 0x03, 0x04,
];

pub(crate) fn ssdp_search_payload(mx: &str) -> Vec<u8> {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
        HOST: 239.255.255.250:1900\r\n\
        MAN: \"ssdp:discover\"\r\n\
        MX: {mx}\r\n\
        ST: ssdp:all\r\n\r\n"
    )
    .into_bytes()
}

pub(crate) fn ssdp_notify_payload(nts: &str) -> Vec<u8> {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
        HOST: 239.255.255.250:1900\r\n\
        CACHE-CONTROL: max-age=1800\r\n\
        LOCATION: http://192.0.2.5:8080/description.xml\r\n\
        NT: upnp:rootdevice\r\n\
        NTS: {nts}\r\n\
        USN: uuid:2f402f80-da50-11e1-9b23-0017880979ae\r\n\r\n"
    )
    .into_bytes()
}

pub(crate) fn ssdp_response_payload() -> Vec<u8> {
    b"HTTP/1.1 200 OK\r\n\
    CACHE-CONTROL: max-age=1800\r\n\
    EXT:\r\n\
    LOCATION: http://10.0.40.5:8080/description.xml\r\n\
    SERVER: Linux/5.10 UPnP/1.1 Product/1.0\r\n\
    ST: upnp:rootdevice\r\n\
    USN: uuid:2f402f80-da50-11e1-9b23-0017880979ae\r\n\r\n"
        .to_vec()
}

/// Assembles a single-tagged UDP frame with valid checksums, the shape
/// every discovery packet on the trunk has.
pub(crate) fn build_udp_frame(
    vlan: u16,
    src_mac: Mac,
    dst_mac: Mac,
    src_ip: IpAddr,
    dst_ip: IpAddr,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    match (src_ip, dst_ip) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => build_udp_frame_v4(
            vlan, src_mac, dst_mac, src, dst, src_port, dst_port, payload,
        ),
        (IpAddr::V6(src), IpAddr::V6(dst)) => build_udp_frame_v6(
            vlan, src_mac, dst_mac, src, dst, src_port, dst_port, payload,
        ),
        _ => panic!("mixed address families"),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_udp_frame_v4(
    vlan: u16,
    src_mac: Mac,
    dst_mac: Mac,
    src_ip: Ipv4Addr,
    dst_ip: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let udp_len = UDP_HEADER_LEN + payload.len();
    let ip_offset = TAGGED_PAYLOAD_OFFSET;
    let udp_offset = ip_offset + 20;
    let mut frame = vec![0u8; udp_offset + udp_len];

    emit_l2(&mut frame, vlan, src_mac, dst_mac, Ethertype::IPv4);

    frame[ip_offset] = 0x45;
    frame[ip_offset + 2..ip_offset + 4]
        .copy_from_slice(&((20 + udp_len) as u16).to_be_bytes());
    frame[ip_offset + 8] = 255;
    frame[ip_offset + 9] = u8::from(IpProtocol::Udp);
    let checksum = {
        let mut ip = Ipv4Buffer::new(&mut frame[ip_offset..]);
        ip.set_source(src_ip);
        ip.set_destination(dst_ip);
        crate::frame::ipv4_header_checksum(
            &frame[ip_offset..ip_offset + 20],
        )
    };
    Ipv4Buffer::new(&mut frame[ip_offset..]).set_checksum(checksum);

    emit_udp(&mut frame, udp_offset, src_port, dst_port, payload);
    let checksum =
        crate::frame::udp_checksum_v4(src_ip, dst_ip, &frame[udp_offset..]);
    UdpBuffer::new(&mut frame[udp_offset..]).set_checksum(checksum);
    frame
}

#[allow(clippy::too_many_arguments)]
fn build_udp_frame_v6(
    vlan: u16,
    src_mac: Mac,
    dst_mac: Mac,
    src_ip: Ipv6Addr,
    dst_ip: Ipv6Addr,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let udp_len = UDP_HEADER_LEN + payload.len();
    let udp_offset = TAGGED_PAYLOAD_OFFSET + IPV6_HEADER_LEN;
    let mut frame = vec![0u8; udp_offset + udp_len];

    emit_l2(&mut frame, vlan, src_mac, dst_mac, Ethertype::IPv6);

    Ipv6Header {
        payload_len: udp_len as u16,
        next_header: IpProtocol::Udp,
        hop_limit: 255,
        source: src_ip,
        destination: dst_ip,
    }
    .emit(&mut frame[TAGGED_PAYLOAD_OFFSET..]);

    emit_udp(&mut frame, udp_offset, src_port, dst_port, payload);
    let checksum =
        crate::frame::udp_checksum_v6(src_ip, dst_ip, &frame[udp_offset..]);
    UdpBuffer::new(&mut frame[udp_offset..]).set_checksum(checksum);
    frame
}

fn emit_l2(
    frame: &mut [u8],
    vlan: u16,
    src_mac: Mac,
    dst_mac: Mac,
    inner: Ethertype,
) {
    EthernetHeader {
        destination: dst_mac,
        source: src_mac,
        ethertype: Ethertype::Vlan,
    }
    .emit(frame);
    VlanHeader::new(vlan, inner).emit(&mut frame[ETHERNET_HEADER_LEN..]);
}

fn emit_udp(
    frame: &mut [u8],
    udp_offset: usize,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) {
    let udp_len = UDP_HEADER_LEN + payload.len();
    let mut udp = UdpBuffer::new(&mut frame[udp_offset..]);
    udp.set_source_port(src_port);
    udp.set_destination_port(dst_port);
    udp.set_length(udp_len as u16);
    frame[udp_offset + UDP_HEADER_LEN..udp_offset + udp_len]
        .copy_from_slice(payload);
}

/// Records every frame instead of touching a NIC.
#[derive(Default)]
pub(crate) struct MockWriter {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl MockWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }
}

impl FrameWriter for MockWriter {
    fn write_frame(&self, frame: &[u8]) -> Result<(), CaptureError> {
        self.frames.lock().push(frame.to_vec());
        Ok(())
    }
}

// Independent RFC 1071 verification: summing a checksummed segment
// together with its pseudo-header must fold to 0xffff.

fn fold_sum(data: &[u8], mut sum: u32) -> u16 {
    let mut i = 0;
    while i < data.len() {
        let word = if i + 1 < data.len() {
            (u32::from(data[i]) << 8) | u32::from(data[i + 1])
        } else {
            u32::from(data[i]) << 8
        };
        sum += word;
        i += 2;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}

fn pseudo_sum(src: IpAddr, dst: IpAddr, protocol: u8, len: usize) -> u32 {
    let mut sum = u32::from(protocol) + len as u32;
    match (src, dst) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            sum = sum
                + u32::from(fold_sum(&src.octets(), 0))
                + u32::from(fold_sum(&dst.octets(), 0));
        }
        (IpAddr::V6(src), IpAddr::V6(dst)) => {
            sum = sum
                + u32::from(fold_sum(&src.octets(), 0))
                + u32::from(fold_sum(&dst.octets(), 0));
        }
        _ => panic!("mixed address families"),
    }
    sum
}

/// Verifies the UDP checksum of a finished single-tagged frame.
pub(crate) fn udp_checksum_valid(frame: &[u8]) -> bool {
    let tag = VlanBuffer::new(&frame[ETHERNET_HEADER_LEN..]);
    let (src, dst, udp_offset): (IpAddr, IpAddr, usize) =
        match Ethertype::from(tag.ethertype()) {
            Ethertype::IPv4 => {
                let ip = Ipv4Buffer::new(&frame[TAGGED_PAYLOAD_OFFSET..]);
                (
                    ip.source().into(),
                    ip.destination().into(),
                    TAGGED_PAYLOAD_OFFSET + ip.header_len(),
                )
            }
            Ethertype::IPv6 => {
                let ip = Ipv6Buffer::new(&frame[TAGGED_PAYLOAD_OFFSET..]);
                (
                    ip.source().into(),
                    ip.destination().into(),
                    TAGGED_PAYLOAD_OFFSET + IPV6_HEADER_LEN,
                )
            }
            _ => return false,
        };
    let udp_len = usize::from(UdpBuffer::new(&frame[udp_offset..]).length());
    let segment = &frame[udp_offset..udp_offset + udp_len];
    fold_sum(segment, pseudo_sum(src, dst, 17, udp_len)) == 0xffff
}

/// Verifies the ICMPv6 checksum of a finished single-tagged frame.
pub(crate) fn icmpv6_checksum_valid(frame: &[u8]) -> bool {
    let ip = Ipv6Buffer::new(&frame[TAGGED_PAYLOAD_OFFSET..]);
    let message_offset = TAGGED_PAYLOAD_OFFSET + IPV6_HEADER_LEN;
    let message =
        &frame[message_offset..message_offset + usize::from(ip.payload_len())];
    fold_sum(
        message,
        pseudo_sum(
            ip.source().into(),
            ip.destination().into(),
            58,
            message.len(),
        ),
    ) == 0xffff
}

mod round_trip {
    use super::*;
    use crate::classify::classify;
    use crate::reflect::{rewrite_frame, Rewrite};

    // Serializing a rewritten copy must preserve the classification of
    // the original for every packet shape the reflector forwards.
    #[test]
    fn test_classification_survives_rewrite() {
        let src_mac = Mac::from([0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x01]);
        let reflector = Mac::from([0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb]);
        let frames = [
            build_udp_frame(
                10,
                src_mac,
                Mac::MDNS_V4,
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
                IpAddr::V4(Ipv4Addr::new(224, 0, 0, 251)),
                5353,
                5353,
                &MDNS_QUERY_PAYLOAD,
            ),
            build_udp_frame(
                10,
                src_mac,
                Mac::MDNS_V6,
                IpAddr::V6("fe80::1".parse().unwrap()),
                IpAddr::V6("ff02::fb".parse().unwrap()),
                5353,
                5353,
                &MDNS_RESPONSE_PAYLOAD,
            ),
            build_udp_frame(
                50,
                src_mac,
                Mac::SSDP_V4,
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
                IpAddr::V4(Ipv4Addr::new(239, 255, 255, 250)),
                55123,
                1900,
                &ssdp_search_payload("3"),
            ),
            build_udp_frame(
                40,
                src_mac,
                reflector,
                IpAddr::V4(Ipv4Addr::new(10, 0, 40, 5)),
                IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
                1900,
                55123,
                &ssdp_response_payload(),
            ),
        ];

        for frame in frames {
            let packet = classify(&frame).unwrap();
            let copy = rewrite_frame(
                &packet,
                &Rewrite {
                    vlan: 20,
                    src_mac: reflector,
                    dst_mac: packet.dst_mac,
                    src_ip: None,
                    dst_ip: None,
                },
            )
            .unwrap();
            let reparsed = classify(&copy).unwrap();

            assert_eq!(reparsed.vlan, 20);
            assert_eq!(reparsed.is_ipv6, packet.is_ipv6);
            assert_eq!(reparsed.is_dns_query, packet.is_dns_query);
            assert_eq!(reparsed.is_dns_response, packet.is_dns_response);
            assert_eq!(reparsed.is_ssdp_query, packet.is_ssdp_query);
            assert_eq!(
                reparsed.is_ssdp_advertisement,
                packet.is_ssdp_advertisement
            );
            assert_eq!(reparsed.is_ssdp_response, packet.is_ssdp_response);
            assert_eq!(reparsed.max_wait, packet.max_wait);
        }
    }
}
