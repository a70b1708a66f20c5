// SPDX-License-Identifier: MIT

use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder};
use netlink_packet_utils::{
    traits::{Emitable, Parseable},
    DecodeError,
};

pub(crate) const IPV4_ADDR_LEN: usize = 4;
pub(crate) const IPV6_ADDR_LEN: usize = 16;

pub(crate) fn parse_ipv4_addr(raw: &[u8]) -> Result<Ipv4Addr, DecodeError> {
    if raw.len() == IPV4_ADDR_LEN {
        Ok(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
    } else {
        Err(DecodeError::from(format!(
            "Invalid u8 array length {}, expecting \
            {IPV4_ADDR_LEN} for IPv4 address, got {:?}",
            raw.len(),
            raw,
        )))
    }
}

pub(crate) fn parse_ipv6_addr(raw: &[u8]) -> Result<Ipv6Addr, DecodeError> {
    if raw.len() == IPV6_ADDR_LEN {
        let mut data = [0u8; IPV6_ADDR_LEN];
        data.copy_from_slice(raw);
        Ok(Ipv6Addr::from(data))
    } else {
        Err(DecodeError::from(format!(
            "Invalid u8 array length {}, expecting {IPV6_ADDR_LEN} \
            for IPv6 address, got {:?}",
            raw.len(),
            raw,
        )))
    }
}

const IPPROTO_UDP: u8 = 17;
const IPPROTO_ICMPV6: u8 = 58;

/// Enum of the IP protocol numbers the pre-filter can admit.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[non_exhaustive]
pub enum IpProtocol {
    Udp,
    Icmpv6,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            IPPROTO_UDP => Self::Udp,
            IPPROTO_ICMPV6 => Self::Icmpv6,
            _ => Self::Other(value),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(value: IpProtocol) -> Self {
        match value {
            IpProtocol::Udp => IPPROTO_UDP,
            IpProtocol::Icmpv6 => IPPROTO_ICMPV6,
            IpProtocol::Other(d) => d,
        }
    }
}

pub const IPV4_HEADER_MIN_LEN: usize = 20;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Ipv4Buffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Ipv4Buffer<T> {
    pub fn new(buffer: T) -> Ipv4Buffer<T> {
        Ipv4Buffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Ipv4Buffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < IPV4_HEADER_MIN_LEN {
            return Err(DecodeError::from(format!(
                "invalid Ipv4Buffer: length is {len} but Ipv4Buffer \
                requires at least {IPV4_HEADER_MIN_LEN}",
            )));
        }
        let data = self.buffer.as_ref();
        if data[0] >> 4 != 4 {
            return Err(DecodeError::from(format!(
                "invalid Ipv4Buffer: version is {}",
                data[0] >> 4
            )));
        }
        if len < self.header_len() {
            return Err(DecodeError::from(format!(
                "invalid Ipv4Buffer: length is {len} but the IHL \
                announces {}",
                self.header_len(),
            )));
        }
        Ok(())
    }

    /// Header length in bytes, decoded from the IHL field.
    pub fn header_len(&self) -> usize {
        usize::from(self.buffer.as_ref()[0] & 0x0f) * 4
    }

    pub fn total_len(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[9]
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[10..12])
    }

    pub fn source(&self) -> Ipv4Addr {
        let data = self.buffer.as_ref();
        Ipv4Addr::new(data[12], data[13], data[14], data[15])
    }

    pub fn destination(&self) -> Ipv4Addr {
        let data = self.buffer.as_ref();
        Ipv4Addr::new(data[16], data[17], data[18], data[19])
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Ipv4Buffer<&'a T> {
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv4Buffer<T> {
    pub fn set_checksum(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[10..12], value)
    }

    pub fn set_source(&mut self, value: Ipv4Addr) {
        self.buffer.as_mut()[12..16].copy_from_slice(&value.octets());
    }

    pub fn set_destination(&mut self, value: Ipv4Addr) {
        self.buffer.as_mut()[16..20].copy_from_slice(&value.octets());
    }
}

pub const IPV6_HEADER_LEN: usize = 40;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Ipv6Buffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Ipv6Buffer<T> {
    pub fn new(buffer: T) -> Ipv6Buffer<T> {
        Ipv6Buffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Ipv6Buffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < IPV6_HEADER_LEN {
            return Err(DecodeError::from(format!(
                "invalid Ipv6Buffer: length is {len} but Ipv6Buffer \
                requires at least {IPV6_HEADER_LEN}",
            )));
        }
        if self.buffer.as_ref()[0] >> 4 != 6 {
            return Err(DecodeError::from(format!(
                "invalid Ipv6Buffer: version is {}",
                self.buffer.as_ref()[0] >> 4
            )));
        }
        Ok(())
    }

    pub fn payload_len(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[4..6])
    }

    pub fn next_header(&self) -> u8 {
        self.buffer.as_ref()[6]
    }

    pub fn hop_limit(&self) -> u8 {
        self.buffer.as_ref()[7]
    }

    pub fn source(&self) -> Ipv6Addr {
        let mut data = [0u8; IPV6_ADDR_LEN];
        data.copy_from_slice(&self.buffer.as_ref()[8..24]);
        Ipv6Addr::from(data)
    }

    pub fn destination(&self) -> Ipv6Addr {
        let mut data = [0u8; IPV6_ADDR_LEN];
        data.copy_from_slice(&self.buffer.as_ref()[24..40]);
        Ipv6Addr::from(data)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Ipv6Buffer<&'a T> {
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer.as_ref()[IPV6_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv6Buffer<T> {
    pub fn set_version(&mut self) {
        let data = self.buffer.as_mut();
        data[0] = (data[0] & 0x0f) | 0x60;
    }

    pub fn set_payload_len(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[4..6], value)
    }

    pub fn set_next_header(&mut self, value: u8) {
        self.buffer.as_mut()[6] = value;
    }

    pub fn set_hop_limit(&mut self, value: u8) {
        self.buffer.as_mut()[7] = value;
    }

    pub fn set_source(&mut self, value: Ipv6Addr) {
        self.buffer.as_mut()[8..24].copy_from_slice(&value.octets());
    }

    pub fn set_destination(&mut self, value: Ipv6Addr) {
        self.buffer.as_mut()[24..40].copy_from_slice(&value.octets());
    }
}

/// The fixed IPv6 header of a frame the reflector originates. Traffic
/// class and flow label are always zero on those.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Ipv6Header {
    pub payload_len: u16,
    pub next_header: IpProtocol,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
}

impl<T: AsRef<[u8]>> Parseable<Ipv6Buffer<T>> for Ipv6Header {
    fn parse(buf: &Ipv6Buffer<T>) -> Result<Self, DecodeError> {
        Ok(Self {
            payload_len: buf.payload_len(),
            next_header: buf.next_header().into(),
            hop_limit: buf.hop_limit(),
            source: buf.source(),
            destination: buf.destination(),
        })
    }
}

impl Emitable for Ipv6Header {
    fn buffer_len(&self) -> usize {
        IPV6_HEADER_LEN
    }

    fn emit(&self, buffer: &mut [u8]) {
        buffer[..IPV6_HEADER_LEN].fill(0);
        let mut buffer = Ipv6Buffer::new(buffer);
        buffer.set_version();
        buffer.set_payload_len(self.payload_len);
        buffer.set_next_header(self.next_header.into());
        buffer.set_hop_limit(self.hop_limit);
        buffer.set_source(self.source);
        buffer.set_destination(self.destination);
    }
}
