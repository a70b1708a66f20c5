// SPDX-License-Identifier: MIT

use crate::classify::MulticastPacket;
use crate::diag::bump;
use crate::frame::Mac;

use super::{forward_multicast, ReflectorContext};
use crate::capture::FrameWriter;

/// Fans mDNS traffic across VLAN boundaries.
///
/// Queries replicate by pool policy with no session state: responders
/// answer to the multicast group on port 5353, so the reply comes back
/// through the same path. Responses replicate only for allow-listed
/// devices seen on their home VLAN.
pub(crate) fn process_mdns(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    packet: &MulticastPacket,
) {
    log::debug!("mDNS packet received: {packet}");

    // Network devices may address the reflector's unicast MAC; every
    // copy goes out to the mDNS group MAC regardless.
    let dst_mac = if packet.is_ipv6 {
        Mac::MDNS_V6
    } else {
        Mac::MDNS_V4
    };

    if packet.is_dns_query {
        let Some(tags) = ctx.policy.query_fanout(packet.vlan) else {
            return;
        };
        for &tag in tags {
            forward_multicast(writer, ctx, packet, tag, dst_mac);
        }
    } else if packet.is_dns_response {
        let Some(device) = ctx.policy.device(&packet.src_mac) else {
            return;
        };
        if device.origin_pool != packet.vlan {
            log::warn!(
                "spoofing/vlan leak detected: traffic from sourceMac {} \
                was expected from expectedVlan {}, got a packet from \
                vlanTag {}",
                packet.src_mac,
                device.origin_pool,
                packet.vlan
            );
            bump(&ctx.stats.policy_drops);
            return;
        }
        for &tag in &device.shared_pools {
            forward_multicast(writer, ctx, packet, tag, dst_mac);
        }
    }
}
