// SPDX-License-Identifier: MIT


use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::config::{Config, MulticastDevice, VlanIpSource};
use crate::frame::Mac;
use crate::policy::Policy;

use super::{Dispatcher, ForwarderToggles, ReflectorContext, SsdpSessions};
use crate::tests::MockWriter;

pub(crate) fn reflector_mac() -> Mac {
    Mac::from([0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb])
}

/// Builds a context from `(mac, origin_pool, shared_pools)` device
/// tuples and `(vlan, ip)` source entries.
pub(crate) fn context(
    mac: Mac,
    devices: &[(&str, u16, &[u16])],
    vlan_ips: &[(u16, &str)],
) -> ReflectorContext {
    let cfg = Config {
        net_interface: "eth0".to_string(),
        devices: devices
            .iter()
            .map(|(mac, origin, shared)| {
                (
                    mac.to_string(),
                    MulticastDevice {
                        origin_pool: *origin,
                        shared_pools: shared.to_vec(),
                    },
                )
            })
            .collect(),
        vlan_ip_source: vlan_ips
            .iter()
            .map(|(vlan, ip)| {
                (
                    vlan.to_string(),
                    VlanIpSource {
                        ip_source: ip.parse::<Ipv4Addr>().unwrap(),
                    },
                )
            })
            .collect::<HashMap<_, _>>(),
    };
    ReflectorContext::new(mac, Policy::new(&cfg))
}

// Disabled forwarders drop their traffic class entirely.
#[test]
fn test_disabled_forwarders_drop_traffic() {
    use crate::classify::classify;
    use crate::tests::{build_udp_frame, ssdp_search_payload};
    use std::net::IpAddr;

    let ctx = Arc::new(context(
        reflector_mac(),
        &[("dd:dd:dd:dd:dd:01", 40, &[50])],
        &[(40, "10.0.40.1")],
    ));
    let writer = Arc::new(MockWriter::new());
    let sessions = Arc::new(SsdpSessions::new());
    let dispatcher = Dispatcher::new(
        ctx.clone(),
        writer.clone(),
        sessions.clone(),
        ForwarderToggles {
            ssdp: false,
            bonjour: true,
            ndp_arp: true,
        },
    );

    let frame = build_udp_frame(
        50,
        Mac::from([0xcc, 0xcc, 0xcc, 0xcc, 0xcc, 0x01]),
        Mac::SSDP_V4,
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)),
        IpAddr::V4(Ipv4Addr::new(239, 255, 255, 250)),
        55123,
        1900,
        &ssdp_search_payload("3"),
    );
    dispatcher.dispatch(&classify(&frame).unwrap());

    assert!(writer.frames().is_empty());
    assert!(sessions.query(55123).is_none());
}
