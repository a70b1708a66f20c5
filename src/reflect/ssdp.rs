// SPDX-License-Identifier: MIT

use std::net::IpAddr;
use std::time::Duration;

use crate::capture::FrameWriter;
use crate::classify::MulticastPacket;
use crate::diag::bump;
use crate::frame::Mac;
use crate::session::{TimedMap, SSDP_SESSION_DURATION};

use super::{emit, forward_multicast, ReflectorContext, Rewrite};

/// Who asked: enough to steer a later unicast response back through the
/// reflector to the original querier.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SsdpSession {
    pub ip: IpAddr,
    pub vlan: u16,
    pub mac: Mac,
    /// Populated for advertisement sessions only.
    pub allowed_vlans: Vec<u16>,
}

/// The correlation state, keyed by the original source UDP port.
#[derive(Default)]
pub struct SsdpSessions {
    queries: TimedMap<u16, SsdpSession>,
    advertisements: TimedMap<u16, SsdpSession>,
}

impl SsdpSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// One eviction pass over both tables.
    pub fn sweep(&self) {
        self.queries.remove_expired();
        self.advertisements.remove_expired();
    }

    #[cfg(test)]
    pub(crate) fn query(&self, port: u16) -> Option<SsdpSession> {
        self.queries.get(&port)
    }
}

/// SSDP queries and advertisements are multicast; responses come back
/// as unicast aimed at the querier's ephemeral port, which only the
/// session table can route.
pub(crate) fn process_ssdp(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    sessions: &SsdpSessions,
    packet: &MulticastPacket,
) {
    if packet.is_ssdp_query {
        process_query(writer, ctx, sessions, packet);
    } else if packet.is_ssdp_advertisement {
        process_advertisement(writer, ctx, sessions, packet);
    } else if packet.is_ssdp_response {
        process_response(writer, ctx, sessions, packet);
    }
}

fn group_mac(packet: &MulticastPacket) -> Mac {
    if packet.is_ipv6 {
        Mac::SSDP_V6
    } else {
        Mac::SSDP_V4
    }
}

fn process_query(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    sessions: &SsdpSessions,
    packet: &MulticastPacket,
) {
    let Some(tags) = ctx.policy.query_fanout(packet.vlan) else {
        return;
    };
    log::debug!("SSDP query packet received: {packet}");
    if !packet.dst_mac.is_multicast() {
        log::info!(
            "got a SSDP query from an unicast packet, this is a protocol \
            violation: sourceMac {}",
            packet.src_mac
        );
        bump(&ctx.stats.protocol_drops);
        return;
    }
    let (Some(src_ip), Some(src_port)) = (packet.src_ip, packet.src_port)
    else {
        return;
    };

    // The session must be visible before the first copy hits the wire:
    // a responder can answer faster than this thread loops.
    sessions.queries.insert(
        src_port,
        SsdpSession {
            ip: src_ip,
            vlan: packet.vlan,
            mac: packet.src_mac,
            allowed_vlans: Vec::new(),
        },
        Duration::from_secs(packet.max_wait + 1),
    );

    let dst_mac = group_mac(packet);
    for &tag in tags {
        forward_multicast(writer, ctx, packet, tag, dst_mac);
    }
}

fn process_advertisement(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    sessions: &SsdpSessions,
    packet: &MulticastPacket,
) {
    let Some(device) = ctx.policy.device(&packet.src_mac) else {
        return;
    };
    log::debug!("SSDP advertisement packet received: {packet}");
    if device.origin_pool != packet.vlan {
        log::warn!(
            "spoofing/vlan leak detected: traffic from sourceMac {} was \
            expected from expectedVlan {}, got a packet from vlanTag {}",
            packet.src_mac,
            device.origin_pool,
            packet.vlan
        );
        bump(&ctx.stats.policy_drops);
        return;
    }
    if !packet.dst_mac.is_multicast() {
        log::info!(
            "got a SSDP advertisement from an unicast packet, this is a \
            protocol violation: sourceMac {}",
            packet.src_mac
        );
        bump(&ctx.stats.protocol_drops);
        return;
    }
    let (Some(src_ip), Some(src_port)) = (packet.src_ip, packet.src_port)
    else {
        return;
    };

    sessions.advertisements.insert(
        src_port,
        SsdpSession {
            ip: src_ip,
            vlan: packet.vlan,
            mac: packet.src_mac,
            allowed_vlans: device.shared_pools.clone(),
        },
        SSDP_SESSION_DURATION,
    );

    let dst_mac = group_mac(packet);
    for &tag in &device.shared_pools {
        forward_multicast(writer, ctx, packet, tag, dst_mac);
    }
}

fn process_response(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    sessions: &SsdpSessions,
    packet: &MulticastPacket,
) {
    let Some(device) = ctx.policy.device(&packet.src_mac) else {
        return;
    };
    log::debug!("SSDP query response packet received: {packet}");
    if device.origin_pool != packet.vlan {
        log::warn!(
            "spoofing/vlan leak detected: traffic from sourceMac {} was \
            expected from expectedVlan {}, got a packet from vlanTag {}",
            packet.src_mac,
            device.origin_pool,
            packet.vlan
        );
        bump(&ctx.stats.policy_drops);
        return;
    }
    let Some(dst_port) = packet.dst_port else {
        return;
    };
    let Some(session) = sessions.queries.get(&dst_port) else {
        log::info!(
            "no matching SSDP session found with SSDP \
            request/advertisement: sourcePort {dst_port}"
        );
        bump(&ctx.stats.correlation_misses);
        return;
    };
    sessions.queries.refresh(&dst_port, SSDP_SESSION_DURATION);

    let src_ip = if packet.is_ipv6 {
        Some(IpAddr::V6(ctx.link_local))
    } else {
        ctx.policy.vlan_ip(session.vlan).map(IpAddr::V4)
    };
    emit(
        writer,
        ctx,
        packet,
        &Rewrite {
            vlan: session.vlan,
            src_mac: ctx.mac,
            dst_mac: session.mac,
            src_ip,
            dst_ip: Some(session.ip),
        },
    );
}
