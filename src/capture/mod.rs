// SPDX-License-Identifier: MIT

mod filter;

pub use self::filter::admit_filter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;

use parking_lot::Mutex;
use pcap::{Active, Capture};
use thiserror::Error;

use crate::classify::{classify, MulticastPacket};
use crate::diag::{bump, Stats};
use crate::frame::Mac;

/// Bound of the parsed-packet channel; a full channel blocks the
/// capture read and lets the kernel ring absorb the burst.
pub const PACKET_CHANNEL_BOUND: usize = 100;

const SNAPLEN: i32 = 65536;
const READ_TIMEOUT_MS: i32 = 1000;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not find network interface {0}")]
    InterfaceNotFound(String),

    #[error(transparent)]
    Pcap(#[from] pcap::Error),
}

/// Resolves the MAC address of the trunk interface.
pub fn interface_mac(interface: &str) -> Result<Mac, CaptureError> {
    pnet::datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == interface)
        .and_then(|iface| iface.mac)
        .map(|mac| Mac::from(mac.octets()))
        .ok_or_else(|| CaptureError::InterfaceNotFound(interface.to_string()))
}

/// Opens the read side: whole tagged frames, short read timeout so the
/// stop flag is observed promptly, and the admit filter compiled by
/// libpcap with the reflector MAC substituted in.
pub fn open_capture(
    interface: &str,
    promiscuous: bool,
    reflector_mac: Mac,
) -> Result<Capture<Active>, CaptureError> {
    let mut capture = Capture::from_device(interface)?
        .promisc(promiscuous)
        .snaplen(SNAPLEN)
        .timeout(READ_TIMEOUT_MS)
        .open()?;
    capture.filter(&admit_filter(reflector_mac), true)?;
    Ok(capture)
}

/// Anything that can put a finished frame on the wire.
///
/// The forwarders only ever see this trait; tests substitute a recorder.
pub trait FrameWriter: Send + Sync {
    fn write_frame(&self, frame: &[u8]) -> Result<(), CaptureError>;
}

/// The injection side of the trunk NIC. A second pcap handle, distinct
/// from the capture handle, serialized by an internal mutex.
pub struct Injector {
    handle: Mutex<Capture<Active>>,
}

impl Injector {
    pub fn open(interface: &str) -> Result<Self, CaptureError> {
        let handle = Capture::from_device(interface)?.open()?;
        Ok(Self {
            handle: Mutex::new(handle),
        })
    }
}

impl FrameWriter for Injector {
    fn write_frame(&self, frame: &[u8]) -> Result<(), CaptureError> {
        self.handle.lock().sendpacket(frame)?;
        Ok(())
    }
}

/// The capture loop: blocking reads, inline classification, bounded
/// hand-off to the dispatcher. Returns when the stop flag is raised,
/// the dispatcher goes away, or the handle fails hard.
pub fn run_capture_loop(
    mut capture: Capture<Active>,
    packets: SyncSender<MulticastPacket>,
    stop: &AtomicBool,
    stats: &Stats,
) {
    while !stop.load(Ordering::Relaxed) {
        match capture.next_packet() {
            Ok(frame) => {
                bump(&stats.received);
                match classify(frame.data) {
                    Ok(packet) => {
                        if packets.send(packet).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("dropping unclassifiable frame: {e}");
                        bump(&stats.parse_drops);
                    }
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => {
                log::error!("capture read failed: {e}");
                break;
            }
        }
    }
    if let Ok(stat) = capture.stats() {
        log::info!(
            "capture statistics: {} received, {} dropped by kernel, \
            {} dropped by interface",
            stat.received,
            stat.dropped,
            stat.if_dropped
        );
    }
}
