// SPDX-License-Identifier: MIT

use std::net::Ipv6Addr;
use std::str::FromStr;

use netlink_packet_utils::DecodeError;

pub(crate) const MAC_LEN: usize = 6;

/// An IEEE 802 MAC address.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Mac([u8; MAC_LEN]);

impl Mac {
    /// The all-ones broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: Mac = Mac([0xff; MAC_LEN]);

    /// IPv4 mDNS group MAC, `224.0.0.251` mapped per RFC 1112.
    pub const MDNS_V4: Mac = Mac([0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb]);
    /// IPv6 mDNS group MAC, `ff02::fb` mapped per RFC 2464.
    pub const MDNS_V6: Mac = Mac([0x33, 0x33, 0x00, 0x00, 0x00, 0xfb]);
    /// IPv4 SSDP group MAC, `239.255.255.250`.
    pub const SSDP_V4: Mac = Mac([0x01, 0x00, 0x5e, 0x7f, 0xff, 0xfa]);
    /// IPv6 SSDP group MAC, `ff0x::c`.
    pub const SSDP_V6: Mac = Mac([0x33, 0x33, 0x00, 0x00, 0x00, 0x03]);
    /// IPv6 all-nodes group MAC, `ff02::1`.
    pub const ALL_NODES_V6: Mac = Mac([0x33, 0x33, 0x00, 0x00, 0x00, 0x01]);

    pub fn parse(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() == MAC_LEN {
            let mut data = [0u8; MAC_LEN];
            data.copy_from_slice(raw);
            Ok(Mac(data))
        } else {
            Err(DecodeError::from(format!(
                "Invalid u8 array length {}, expecting {MAC_LEN} for MAC \
                address, got {:?}",
                raw.len(),
                raw,
            )))
        }
    }

    /// Group bit (LSB of the first octet).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }

    /// The link-local address this MAC yields under RFC 2464 section 4 and
    /// 5: modified EUI-64 with `ff:fe` spliced in and the universal/local
    /// bit inverted.
    pub fn link_local(&self) -> Ipv6Addr {
        let m = &self.0;
        Ipv6Addr::from([
            0xfe,
            0x80,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            m[0] ^ 0x02,
            m[1],
            m[2],
            0xff,
            0xfe,
            m[3],
            m[4],
            m[5],
        ])
    }
}

impl AsRef<[u8; MAC_LEN]> for Mac {
    fn as_ref(&self) -> &[u8; MAC_LEN] {
        &self.0
    }
}

impl From<[u8; MAC_LEN]> for Mac {
    fn from(val: [u8; MAC_LEN]) -> Self {
        Self(val)
    }
}

impl From<Mac> for [u8; MAC_LEN] {
    fn from(val: Mac) -> Self {
        val.0
    }
}

impl std::fmt::Display for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for Mac {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut data = [0u8; MAC_LEN];
        let mut count = 0;
        for part in s.split(':') {
            if count == MAC_LEN {
                return Err(DecodeError::from(format!(
                    "Invalid MAC address string {s}"
                )));
            }
            data[count] = u8::from_str_radix(part, 16).map_err(|_| {
                DecodeError::from(format!("Invalid MAC address string {s}"))
            })?;
            count += 1;
        }
        if count != MAC_LEN {
            return Err(DecodeError::from(format!(
                "Invalid MAC address string {s}"
            )));
        }
        Ok(Mac(data))
    }
}
