// SPDX-License-Identifier: MIT

use byteorder::{BigEndian, ByteOrder};
use netlink_packet_utils::{
    traits::{Emitable, Parseable},
    DecodeError,
};

use crate::frame::Mac;

const ETH_TYPE_IPV4: u16 = 0x0800;
const ETH_TYPE_ARP: u16 = 0x0806;
const ETH_TYPE_VLAN: u16 = 0x8100;
const ETH_TYPE_IPV6: u16 = 0x86DD;
const ETH_TYPE_QINQ: u16 = 0x88A8;
const ETH_TYPE_QINQ_LEGACY: u16 = 0x9100;

/// Ethernet Type (Ethertype)
///
/// Only the Ethertypes the reflector ever needs to tell apart are named;
/// everything else is carried as `Other`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Ethertype {
    IPv4,
    Arp,
    /// IEEE 802.1Q single tag.
    Vlan,
    IPv6,
    /// IEEE 802.1ad provider tag.
    QinQ,
    /// Pre-standard 0x9100 provider tag, still emitted by some switches.
    QinQLegacy,
    Other(u16),
}

impl Ethertype {
    /// True for every Ethertype that announces an 802.1Q-shaped tag.
    pub fn is_vlan(&self) -> bool {
        matches!(self, Self::Vlan | Self::QinQ | Self::QinQLegacy)
    }
}

impl From<u16> for Ethertype {
    fn from(value: u16) -> Self {
        match value {
            ETH_TYPE_IPV4 => Self::IPv4,
            ETH_TYPE_ARP => Self::Arp,
            ETH_TYPE_VLAN => Self::Vlan,
            ETH_TYPE_IPV6 => Self::IPv6,
            ETH_TYPE_QINQ => Self::QinQ,
            ETH_TYPE_QINQ_LEGACY => Self::QinQLegacy,
            _ => Self::Other(value),
        }
    }
}

impl From<Ethertype> for u16 {
    fn from(value: Ethertype) -> Self {
        match value {
            Ethertype::IPv4 => ETH_TYPE_IPV4,
            Ethertype::Arp => ETH_TYPE_ARP,
            Ethertype::Vlan => ETH_TYPE_VLAN,
            Ethertype::IPv6 => ETH_TYPE_IPV6,
            Ethertype::QinQ => ETH_TYPE_QINQ,
            Ethertype::QinQLegacy => ETH_TYPE_QINQ_LEGACY,
            Ethertype::Other(d) => d,
        }
    }
}

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_HEADER_LEN: usize = 4;

/// Byte offset of the network layer in a single-tagged frame.
pub const TAGGED_PAYLOAD_OFFSET: usize = ETHERNET_HEADER_LEN + VLAN_HEADER_LEN;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EthernetBuffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> EthernetBuffer<T> {
    pub fn new(buffer: T) -> EthernetBuffer<T> {
        EthernetBuffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<EthernetBuffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < ETHERNET_HEADER_LEN {
            Err(DecodeError::from(format!(
                "invalid EthernetBuffer: length is {len} but \
                EthernetBuffer requires at least {ETHERNET_HEADER_LEN}",
            )))
        } else {
            Ok(())
        }
    }

    pub fn destination(&self) -> Mac {
        let data = self.buffer.as_ref();
        Mac::from([data[0], data[1], data[2], data[3], data[4], data[5]])
    }

    pub fn source(&self) -> Mac {
        let data = self.buffer.as_ref();
        Mac::from([data[6], data[7], data[8], data[9], data[10], data[11]])
    }

    pub fn ethertype(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[12..14])
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> EthernetBuffer<&'a T> {
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer.as_ref()[ETHERNET_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EthernetBuffer<T> {
    pub fn set_destination(&mut self, value: Mac) {
        self.buffer.as_mut()[..6].copy_from_slice(value.as_ref());
    }

    pub fn set_source(&mut self, value: Mac) {
        self.buffer.as_mut()[6..12].copy_from_slice(value.as_ref());
    }

    pub fn set_ethertype(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[12..14], value)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EthernetHeader {
    pub destination: Mac,
    pub source: Mac,
    pub ethertype: Ethertype,
}

impl<T: AsRef<[u8]>> Parseable<EthernetBuffer<T>> for EthernetHeader {
    fn parse(buf: &EthernetBuffer<T>) -> Result<Self, DecodeError> {
        Ok(Self {
            destination: buf.destination(),
            source: buf.source(),
            ethertype: buf.ethertype().into(),
        })
    }
}

impl Emitable for EthernetHeader {
    fn buffer_len(&self) -> usize {
        ETHERNET_HEADER_LEN
    }

    fn emit(&self, buffer: &mut [u8]) {
        let mut buffer = EthernetBuffer::new(buffer);
        buffer.set_destination(self.destination);
        buffer.set_source(self.source);
        buffer.set_ethertype(self.ethertype.into());
    }
}

/// View of the 4 tag bytes that follow the Ethernet header in an
/// 802.1Q-tagged frame: 16 bits of TCI, then the inner Ethertype.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VlanBuffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> VlanBuffer<T> {
    pub fn new(buffer: T) -> VlanBuffer<T> {
        VlanBuffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<VlanBuffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < VLAN_HEADER_LEN {
            Err(DecodeError::from(format!(
                "invalid VlanBuffer: length is {len} but VlanBuffer \
                requires at least {VLAN_HEADER_LEN}",
            )))
        } else {
            Ok(())
        }
    }

    fn tci(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn priority(&self) -> u8 {
        (self.tci() >> 13) as u8
    }

    pub fn drop_eligible(&self) -> bool {
        self.tci() & 0x1000 != 0
    }

    pub fn vlan_id(&self) -> u16 {
        self.tci() & 0x0fff
    }

    pub fn ethertype(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> VlanBuffer<&'a T> {
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer.as_ref()[VLAN_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> VlanBuffer<T> {
    /// Replaces the VLAN id, preserving the captured PCP and DEI bits.
    pub fn set_vlan_id(&mut self, value: u16) {
        let tci = (self.tci() & 0xf000) | (value & 0x0fff);
        BigEndian::write_u16(&mut self.buffer.as_mut()[0..2], tci)
    }

    pub fn set_tci(&mut self, priority: u8, drop_eligible: bool, vlan_id: u16) {
        let tci = (u16::from(priority) << 13)
            | (u16::from(drop_eligible) << 12)
            | (vlan_id & 0x0fff);
        BigEndian::write_u16(&mut self.buffer.as_mut()[0..2], tci)
    }

    pub fn set_ethertype(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[2..4], value)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct VlanHeader {
    pub priority: u8,
    pub drop_eligible: bool,
    pub vlan_id: u16,
    pub ethertype: Ethertype,
}

impl VlanHeader {
    pub fn new(vlan_id: u16, ethertype: Ethertype) -> Self {
        Self {
            priority: 0,
            drop_eligible: false,
            vlan_id,
            ethertype,
        }
    }
}

impl<T: AsRef<[u8]>> Parseable<VlanBuffer<T>> for VlanHeader {
    fn parse(buf: &VlanBuffer<T>) -> Result<Self, DecodeError> {
        Ok(Self {
            priority: buf.priority(),
            drop_eligible: buf.drop_eligible(),
            vlan_id: buf.vlan_id(),
            ethertype: buf.ethertype().into(),
        })
    }
}

impl Emitable for VlanHeader {
    fn buffer_len(&self) -> usize {
        VLAN_HEADER_LEN
    }

    fn emit(&self, buffer: &mut [u8]) {
        let mut buffer = VlanBuffer::new(buffer);
        buffer.set_tci(self.priority, self.drop_eligible, self.vlan_id);
        buffer.set_ethertype(self.ethertype.into());
    }
}
