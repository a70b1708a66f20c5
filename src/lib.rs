// SPDX-License-Identifier: MIT

//! The `multicast-reflector` crate forwards multicast discovery traffic
//! across 802.1Q VLAN boundaries from a single trunk port, preserving
//! protocol semantics by policy instead of flooding.
//!
//! This crate grouped the reflector into these modules:
//!  * `frame`: wire model of the protocols seen on the trunk, parsed
//!    and emitted on raw frame bytes.
//!  * `classify`: the lazy per-layer parser producing classified
//!    [classify::MulticastPacket] records.
//!  * `capture`: the pcap capture and injection handles plus the BPF
//!    pre-filter.
//!  * `policy`: read-only reflection policy derived from configuration.
//!  * `session`: the time-expiring SSDP correlation table.
//!  * `reflect`: the dispatcher, the mDNS/SSDP forwarders and the
//!    ARP/NDP impersonation handlers.
//!  * `config`: TOML configuration loading.
//!  * `nic`: hardware `rx-vlan-filter` control.
//!  * `diag`: runtime counters and the optional diagnostics endpoint.

pub mod capture;
pub mod classify;
pub mod config;
pub mod diag;
pub mod frame;
pub mod nic;
pub mod policy;
pub mod reflect;
pub mod session;

#[cfg(test)]
mod tests;
