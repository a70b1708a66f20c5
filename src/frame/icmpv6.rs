// SPDX-License-Identifier: MIT

use std::net::Ipv6Addr;

use byteorder::{BigEndian, ByteOrder};
use netlink_packet_utils::{
    traits::{Emitable, Parseable},
    DecodeError,
};

use crate::frame::{ip::parse_ipv6_addr, Mac};

const NEIGHBOR_SOLICITATION: u8 = 135;
const NEIGHBOR_ADVERTISEMENT: u8 = 136;

/// Enum of the `ICMPv6` message types the reflector reacts to.
///
/// List sourced from [iana.org][1]
///
/// [1]: https://www.iana.org/assignments/icmpv6-parameters/icmpv6-parameters.xhtml#icmpv6-parameters-2
#[derive(Debug, PartialEq, Eq, Clone, Copy, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum Icmpv6Type {
    NeighborSolicitation,
    NeighborAdvertisement,
    Other(u8),
}

impl From<u8> for Icmpv6Type {
    fn from(value: u8) -> Self {
        match value {
            NEIGHBOR_SOLICITATION => Self::NeighborSolicitation,
            NEIGHBOR_ADVERTISEMENT => Self::NeighborAdvertisement,
            _ => Self::Other(value),
        }
    }
}

impl From<Icmpv6Type> for u8 {
    fn from(value: Icmpv6Type) -> Self {
        match value {
            Icmpv6Type::NeighborSolicitation => NEIGHBOR_SOLICITATION,
            Icmpv6Type::NeighborAdvertisement => NEIGHBOR_ADVERTISEMENT,
            Icmpv6Type::Other(d) => d,
        }
    }
}

pub const ICMPV6_HEADER_LEN: usize = 4;
pub const NEIGHBOR_SOLICIT_LEN: usize = 24;
pub const NEIGHBOR_ADVERT_LEN: usize = 24;
const OPTION_TARGET_LLA: u8 = 2;

/// Neighbor Advertisement flag bits (first octet of the flags word).
pub const NA_FLAG_SOLICITED: u8 = 0x40;
pub const NA_FLAG_OVERRIDE: u8 = 0x20;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Icmpv6Buffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Icmpv6Buffer<T> {
    pub fn new(buffer: T) -> Icmpv6Buffer<T> {
        Icmpv6Buffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Icmpv6Buffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < ICMPV6_HEADER_LEN {
            Err(DecodeError::from(format!(
                "invalid Icmpv6Buffer: length is {len} but Icmpv6Buffer \
                requires at least {ICMPV6_HEADER_LEN}",
            )))
        } else {
            Ok(())
        }
    }

    pub fn msg_type(&self) -> u8 {
        self.buffer.as_ref()[0]
    }

    pub fn code(&self) -> u8 {
        self.buffer.as_ref()[1]
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Icmpv6Buffer<T> {
    pub fn set_msg_type(&mut self, value: u8) {
        self.buffer.as_mut()[0] = value;
    }

    pub fn set_code(&mut self, value: u8) {
        self.buffer.as_mut()[1] = value;
    }

    pub fn set_checksum(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[2..4], value)
    }
}

/// A Neighbor Solicitation message (RFC 4861 section 4.3), options
/// ignored: the reflector only ever needs the target address.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NeighborSolicit {
    pub target: Ipv6Addr,
}

impl<T: AsRef<[u8]>> Parseable<Icmpv6Buffer<T>> for NeighborSolicit {
    fn parse(buf: &Icmpv6Buffer<T>) -> Result<Self, DecodeError> {
        if buf.msg_type() != NEIGHBOR_SOLICITATION {
            return Err(DecodeError::from(format!(
                "not a neighbor solicitation: ICMPv6 type {}",
                buf.msg_type()
            )));
        }
        let data = buf.buffer.as_ref();
        if data.len() < NEIGHBOR_SOLICIT_LEN {
            return Err(DecodeError::from(format!(
                "truncated neighbor solicitation: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            target: parse_ipv6_addr(&data[8..24])?,
        })
    }
}

/// A Neighbor Advertisement message (RFC 4861 section 4.4) with an
/// optional target link-layer address option.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NeighborAdvert {
    pub flags: u8,
    pub target: Ipv6Addr,
    pub target_lla: Option<Mac>,
}

impl<T: AsRef<[u8]>> Parseable<Icmpv6Buffer<T>> for NeighborAdvert {
    fn parse(buf: &Icmpv6Buffer<T>) -> Result<Self, DecodeError> {
        if buf.msg_type() != NEIGHBOR_ADVERTISEMENT {
            return Err(DecodeError::from(format!(
                "not a neighbor advertisement: ICMPv6 type {}",
                buf.msg_type()
            )));
        }
        let data = buf.buffer.as_ref();
        if data.len() < NEIGHBOR_ADVERT_LEN {
            return Err(DecodeError::from(format!(
                "truncated neighbor advertisement: {} bytes",
                data.len()
            )));
        }
        let mut target_lla = None;
        let mut options = &data[NEIGHBOR_ADVERT_LEN..];
        while options.len() >= 8 {
            let length = usize::from(options[1]) * 8;
            if length == 0 || length > options.len() {
                break;
            }
            if options[0] == OPTION_TARGET_LLA && length == 8 {
                target_lla = Some(Mac::parse(&options[2..8])?);
            }
            options = &options[length..];
        }
        Ok(Self {
            flags: data[4],
            target: parse_ipv6_addr(&data[8..24])?,
            target_lla,
        })
    }
}

impl Emitable for NeighborAdvert {
    fn buffer_len(&self) -> usize {
        NEIGHBOR_ADVERT_LEN + if self.target_lla.is_some() { 8 } else { 0 }
    }

    fn emit(&self, buffer: &mut [u8]) {
        buffer[..self.buffer_len()].fill(0);
        buffer[0] = NEIGHBOR_ADVERTISEMENT;
        buffer[4] = self.flags;
        buffer[8..24].copy_from_slice(&self.target.octets());
        if let Some(mac) = self.target_lla {
            buffer[24] = OPTION_TARGET_LLA;
            buffer[25] = 1;
            buffer[26..32].copy_from_slice(mac.as_ref());
        }
    }
}
