// SPDX-License-Identifier: MIT

use crate::frame::Mac;

/// Builds the kernel pre-filter admitting exactly the traffic the
/// dispatcher can route: tagged ARP, ICMPv6, mDNS and SSDP multicast,
/// and unicast addressed to the reflector that is not mDNS.
///
/// The `vlan` keyword shifts every later offset past the 802.1Q tag, so
/// the protocol clauses match the inner packet. Our own transmissions
/// are excluded by source MAC before anything else.
pub fn admit_filter(reflector_mac: Mac) -> String {
    format!(
        "not (ether src {mac}) and vlan and \
        (arp or icmp6 or \
        (dst net (224.0.0.251 or ff02::fb) and udp dst port 5353) or \
        ((dst net (239.255.255.250 or ff02::c or ff05::c or ff08::c) \
        and dst port 1900) or \
        (ether dst {mac} and not dst port 5353)))",
        mac = reflector_mac
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_admit_filter_substitutes_reflector_mac() {
        let filter =
            admit_filter(Mac::from([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
        assert_eq!(
            filter,
            "not (ether src aa:bb:cc:dd:ee:ff) and vlan and \
            (arp or icmp6 or \
            (dst net (224.0.0.251 or ff02::fb) and udp dst port 5353) or \
            ((dst net (239.255.255.250 or ff02::c or ff05::c or ff08::c) \
            and dst port 1900) or \
            (ether dst aa:bb:cc:dd:ee:ff and not dst port 5353)))"
        );
    }
}
