// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use crate::config::{Config, MulticastDevice, VlanIpSource};
use crate::frame::Mac;

/// The read-only reflection policy, derived from the configuration once
/// at startup and shared by every worker without synchronization.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// For a query arriving on VLAN O, the VLANs hosting at least one
    /// device that shares traffic into O.
    pools: HashMap<u16, Vec<u16>>,
    /// Per-device policy, keyed by lowercase MAC string.
    devices: HashMap<String, MulticastDevice>,
    /// IPv4 source to stamp on frames forwarded into a VLAN.
    vlan_ips: HashMap<u16, Ipv4Addr>,
}

impl Policy {
    pub fn new(cfg: &Config) -> Self {
        Self {
            pools: map_by_pool(&cfg.devices),
            devices: map_lower_case_mac(&cfg.devices),
            vlan_ips: map_ip_source_by_vlan(&cfg.vlan_ip_source),
        }
    }

    /// The VLANs a query arriving on `vlan` fans out to.
    pub fn query_fanout(&self, vlan: u16) -> Option<&[u16]> {
        self.pools.get(&vlan).map(Vec::as_slice)
    }

    /// The policy entry for a device MAC, if it is allow-listed.
    pub fn device(&self, mac: &Mac) -> Option<&MulticastDevice> {
        self.devices.get(&mac.to_string())
    }

    pub fn vlan_ip(&self, vlan: u16) -> Option<Ipv4Addr> {
        self.vlan_ips.get(&vlan).copied()
    }

    /// Every VLAN the reflector impersonates an address on.
    pub fn vlan_ips(&self) -> impl Iterator<Item = (u16, Ipv4Addr)> + '_ {
        self.vlan_ips.iter().map(|(vlan, ip)| (*vlan, *ip))
    }
}

/// Inverts the device table: for each shared pool S, the deduplicated
/// origin pools with at least one device replicating into S.
fn map_by_pool(
    devices: &HashMap<String, MulticastDevice>,
) -> HashMap<u16, Vec<u16>> {
    let mut seen: HashMap<u16, HashSet<u16>> = HashMap::new();
    let mut pools: HashMap<u16, Vec<u16>> = HashMap::new();
    for device in devices.values() {
        for pool in &device.shared_pools {
            if seen.entry(*pool).or_default().insert(device.origin_pool) {
                pools.entry(*pool).or_default().push(device.origin_pool);
            }
        }
    }
    pools
}

fn map_lower_case_mac(
    devices: &HashMap<String, MulticastDevice>,
) -> HashMap<String, MulticastDevice> {
    devices
        .iter()
        .map(|(mac, device)| (mac.to_lowercase(), device.clone()))
        .collect()
}

fn map_ip_source_by_vlan(
    vlan_ip_source: &HashMap<String, VlanIpSource>,
) -> HashMap<u16, Ipv4Addr> {
    let mut vlan_ips = HashMap::new();
    for (vlan, value) in vlan_ip_source {
        match vlan.parse::<u16>() {
            Ok(vlan_id) => {
                vlan_ips.insert(vlan_id, value.ip_source);
            }
            Err(_) => {
                log::error!("cannot decode {vlan} to a VLAN id");
            }
        }
    }
    vlan_ips
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn device(origin: u16, shared: &[u16]) -> MulticastDevice {
        MulticastDevice {
            origin_pool: origin,
            shared_pools: shared.to_vec(),
        }
    }

    #[test]
    fn test_map_by_pool_deduplicates_origins() {
        let devices = HashMap::from([
            ("aa:aa:aa:aa:aa:01".to_string(), device(10, &[20])),
            ("aa:aa:aa:aa:aa:02".to_string(), device(10, &[20, 30])),
            ("aa:aa:aa:aa:aa:03".to_string(), device(40, &[20])),
        ]);

        let pools = map_by_pool(&devices);

        let mut into_20 = pools.get(&20).unwrap().clone();
        into_20.sort_unstable();
        assert_eq!(into_20, vec![10, 40]);
        assert_eq!(pools.get(&30), Some(&vec![10]));
        assert_eq!(pools.get(&10), None);
    }

    #[test]
    fn test_mac_lookup_is_case_insensitive() {
        let cfg = Config {
            net_interface: "eth0".to_string(),
            devices: HashMap::from([(
                "AA:BB:CC:DD:EE:FF".to_string(),
                device(40, &[50]),
            )]),
            vlan_ip_source: HashMap::new(),
        };
        let policy = Policy::new(&cfg);

        let mac = Mac::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(policy.device(&mac), Some(&device(40, &[50])));
    }

    #[test]
    fn test_unparseable_vlan_id_is_skipped() {
        let cfg = Config {
            net_interface: "eth0".to_string(),
            devices: HashMap::new(),
            vlan_ip_source: HashMap::from([
                (
                    "40".to_string(),
                    VlanIpSource {
                        ip_source: Ipv4Addr::new(192, 0, 2, 40),
                    },
                ),
                (
                    "not-a-vlan".to_string(),
                    VlanIpSource {
                        ip_source: Ipv4Addr::new(192, 0, 2, 41),
                    },
                ),
            ]),
        };
        let policy = Policy::new(&cfg);

        assert_eq!(policy.vlan_ip(40), Some(Ipv4Addr::new(192, 0, 2, 40)));
        assert_eq!(policy.vlan_ips().count(), 1);
    }
}
