// SPDX-License-Identifier: MIT

mod mdns;
mod neigh;
mod rewrite;
mod ssdp;

#[cfg(test)]
mod tests;

pub use self::neigh::announce;
pub use self::rewrite::{rewrite_frame, Rewrite};
pub use self::ssdp::{SsdpSession, SsdpSessions};

use std::net::{IpAddr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::FrameWriter;
use crate::classify::MulticastPacket;
use crate::diag::{bump, Stats};
use crate::frame::Mac;
use crate::policy::Policy;

/// Everything that is read-only after startup, shared by all workers.
pub struct ReflectorContext {
    pub mac: Mac,
    /// RFC 2464 link-local derived from `mac`, announced on every VLAN.
    pub link_local: Ipv6Addr,
    pub policy: Policy,
    pub stats: Arc<Stats>,
}

impl ReflectorContext {
    pub fn new(mac: Mac, policy: Policy) -> Self {
        Self {
            mac,
            link_local: mac.link_local(),
            policy,
            stats: Arc::new(Stats::default()),
        }
    }
}

/// Which protocol handlers are active; CLI switches clear entries.
#[derive(Debug, Clone, Copy)]
pub struct ForwarderToggles {
    pub ssdp: bool,
    pub bonjour: bool,
    pub ndp_arp: bool,
}

impl Default for ForwarderToggles {
    fn default() -> Self {
        Self {
            ssdp: true,
            bonjour: true,
            ndp_arp: true,
        }
    }
}

/// The top-level loop: takes classified packets off the bounded channel
/// and routes each to the one handler its flags select.
pub struct Dispatcher {
    ctx: Arc<ReflectorContext>,
    writer: Arc<dyn FrameWriter>,
    sessions: Arc<SsdpSessions>,
    toggles: ForwarderToggles,
}

impl Dispatcher {
    pub fn new(
        ctx: Arc<ReflectorContext>,
        writer: Arc<dyn FrameWriter>,
        sessions: Arc<SsdpSessions>,
        toggles: ForwarderToggles,
    ) -> Self {
        Self {
            ctx,
            writer,
            sessions,
            toggles,
        }
    }

    /// Runs until the stop flag is raised or the capture side hangs up.
    pub fn run(&self, packets: Receiver<MulticastPacket>, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            match packets.recv_timeout(Duration::from_secs(1)) {
                Ok(packet) => self.dispatch(&packet),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    pub fn dispatch(&self, packet: &MulticastPacket) {
        let writer = self.writer.as_ref();
        if packet.is_arp {
            if self.toggles.ndp_arp {
                neigh::process_arp(writer, &self.ctx, packet);
            }
        } else if packet.is_ndp {
            if self.toggles.ndp_arp {
                neigh::process_neighbor_solicitation(writer, &self.ctx, packet);
            }
        } else if packet.is_ssdp_query
            || packet.is_ssdp_advertisement
            || packet.is_ssdp_response
        {
            if self.toggles.ssdp {
                ssdp::process_ssdp(writer, &self.ctx, &self.sessions, packet);
            }
        } else if packet.is_dns_query || packet.is_dns_response {
            if self.toggles.bonjour {
                mdns::process_mdns(writer, &self.ctx, packet);
            }
        } else {
            log::debug!("unknown packet received: {packet}");
        }
    }
}

/// Sends one multicast copy into `vlan`: reflector source MAC, group
/// destination MAC, and for IPv4 the VLAN's configured source address.
/// IPv6 sources stay untouched, link-local scope already confines them.
pub(crate) fn forward_multicast(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    packet: &MulticastPacket,
    vlan: u16,
    dst_mac: Mac,
) {
    let src_ip = if packet.is_ipv6 {
        None
    } else {
        ctx.policy.vlan_ip(vlan).map(IpAddr::V4)
    };
    emit(
        writer,
        ctx,
        packet,
        &Rewrite {
            vlan,
            src_mac: ctx.mac,
            dst_mac,
            src_ip,
            dst_ip: None,
        },
    );
}

/// Serializes one rewritten copy and puts it on the wire.
pub(crate) fn emit(
    writer: &dyn FrameWriter,
    ctx: &ReflectorContext,
    packet: &MulticastPacket,
    rewrite: &Rewrite,
) {
    match rewrite_frame(packet, rewrite) {
        Ok(frame) => match writer.write_frame(&frame) {
            Ok(()) => {
                bump(&ctx.stats.forwarded);
                log::debug!("packet sent to vlan {}: {packet}", rewrite.vlan);
            }
            Err(e) => {
                log::error!(
                    "could not transmit to vlan {}: {e}",
                    rewrite.vlan
                );
                bump(&ctx.stats.send_errors);
            }
        },
        Err(e) => {
            log::debug!("could not rewrite frame: {e}");
            bump(&ctx.stats.parse_drops);
        }
    }
}
