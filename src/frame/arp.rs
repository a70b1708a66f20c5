// SPDX-License-Identifier: MIT

use std::net::Ipv4Addr;

use byteorder::{BigEndian, ByteOrder};
use netlink_packet_utils::{
    traits::{Emitable, Parseable},
    DecodeError,
};

use crate::frame::{ip::parse_ipv4_addr, Mac};

const REQUEST: u16 = 1;
const REPLY: u16 = 2;

/// Enum of the ARP operation codes the reflector handles.
///
/// List from [iana.org][1]
///
/// [1]: https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml
#[derive(Debug, PartialEq, Eq, Clone, Copy, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOperation {
    fn from(value: u16) -> Self {
        match value {
            REQUEST => ArpOperation::Request,
            REPLY => ArpOperation::Reply,
            _ => ArpOperation::Other(value),
        }
    }
}

impl From<ArpOperation> for u16 {
    fn from(value: ArpOperation) -> Self {
        match value {
            ArpOperation::Request => REQUEST,
            ArpOperation::Reply => REPLY,
            ArpOperation::Other(d) => d,
        }
    }
}

const ARP_HTYPE_ETHERNET: u16 = 1;
const ARP_PTYPE_IPV4: u16 = 0x0800;
const ARP_HLEN_ETHERNET: u8 = 6;
const ARP_PLEN_IPV4: u8 = 4;

pub const ARP_PACKET_LEN: usize = 28;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ArpBuffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> ArpBuffer<T> {
    pub fn new(buffer: T) -> ArpBuffer<T> {
        ArpBuffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<ArpBuffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < ARP_PACKET_LEN {
            Err(DecodeError::from(format!(
                "invalid ArpBuffer: length is {len} but ArpBuffer \
                requires at least {ARP_PACKET_LEN}",
            )))
        } else {
            Ok(())
        }
    }

    pub fn hardware_type(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn protocol_type(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn hardware_len(&self) -> u8 {
        self.buffer.as_ref()[4]
    }

    pub fn protocol_len(&self) -> u8 {
        self.buffer.as_ref()[5]
    }

    pub fn operation(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[6..8])
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        &self.buffer.as_ref()[8..14]
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        &self.buffer.as_ref()[14..18]
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        &self.buffer.as_ref()[18..24]
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        &self.buffer.as_ref()[24..28]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ArpBuffer<T> {
    pub fn set_hardware_type(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[0..2], value)
    }

    pub fn set_protocol_type(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[2..4], value)
    }

    pub fn set_hardware_len(&mut self, value: u8) {
        self.buffer.as_mut()[4] = value;
    }

    pub fn set_protocol_len(&mut self, value: u8) {
        self.buffer.as_mut()[5] = value;
    }

    pub fn set_operation(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[6..8], value)
    }

    pub fn set_sender_hardware_addr(&mut self, value: Mac) {
        self.buffer.as_mut()[8..14].copy_from_slice(value.as_ref());
    }

    pub fn set_sender_protocol_addr(&mut self, value: Ipv4Addr) {
        self.buffer.as_mut()[14..18].copy_from_slice(&value.octets());
    }

    pub fn set_target_hardware_addr(&mut self, value: Mac) {
        self.buffer.as_mut()[18..24].copy_from_slice(value.as_ref());
    }

    pub fn set_target_protocol_addr(&mut self, value: Ipv4Addr) {
        self.buffer.as_mut()[24..28].copy_from_slice(&value.octets());
    }
}

/// An ARP packet over Ethernet/IPv4, the only flavor seen on the trunk.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ArpPacket {
    pub operation: ArpOperation,
    pub sender_hardware_addr: Mac,
    pub sender_protocol_addr: Ipv4Addr,
    pub target_hardware_addr: Mac,
    pub target_protocol_addr: Ipv4Addr,
}

impl<T: AsRef<[u8]>> Parseable<ArpBuffer<T>> for ArpPacket {
    fn parse(buf: &ArpBuffer<T>) -> Result<Self, DecodeError> {
        if buf.hardware_type() != ARP_HTYPE_ETHERNET
            || buf.protocol_type() != ARP_PTYPE_IPV4
            || buf.hardware_len() != ARP_HLEN_ETHERNET
            || buf.protocol_len() != ARP_PLEN_IPV4
        {
            return Err(DecodeError::from(format!(
                "unsupported ARP address types: hardware {}/{} \
                protocol {:#06x}/{}",
                buf.hardware_type(),
                buf.hardware_len(),
                buf.protocol_type(),
                buf.protocol_len(),
            )));
        }
        Ok(Self {
            operation: buf.operation().into(),
            sender_hardware_addr: Mac::parse(buf.sender_hardware_addr())?,
            sender_protocol_addr: parse_ipv4_addr(buf.sender_protocol_addr())?,
            target_hardware_addr: Mac::parse(buf.target_hardware_addr())?,
            target_protocol_addr: parse_ipv4_addr(buf.target_protocol_addr())?,
        })
    }
}

impl Emitable for ArpPacket {
    fn buffer_len(&self) -> usize {
        ARP_PACKET_LEN
    }

    fn emit(&self, buffer: &mut [u8]) {
        let mut buffer = ArpBuffer::new(buffer);
        buffer.set_hardware_type(ARP_HTYPE_ETHERNET);
        buffer.set_protocol_type(ARP_PTYPE_IPV4);
        buffer.set_hardware_len(ARP_HLEN_ETHERNET);
        buffer.set_protocol_len(ARP_PLEN_IPV4);
        buffer.set_operation(self.operation.into());
        buffer.set_sender_hardware_addr(self.sender_hardware_addr);
        buffer.set_sender_protocol_addr(self.sender_protocol_addr);
        buffer.set_target_hardware_addr(self.target_hardware_addr);
        buffer.set_target_protocol_addr(self.target_protocol_addr);
    }
}
