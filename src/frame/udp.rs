// SPDX-License-Identifier: MIT

use byteorder::{BigEndian, ByteOrder};
use netlink_packet_utils::DecodeError;

pub const UDP_HEADER_LEN: usize = 8;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UdpBuffer<T> {
    buffer: T,
}

impl<T: AsRef<[u8]>> UdpBuffer<T> {
    pub fn new(buffer: T) -> UdpBuffer<T> {
        UdpBuffer { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<UdpBuffer<T>, DecodeError> {
        let packet = Self::new(buffer);
        packet.check_buffer_length()?;
        Ok(packet)
    }

    fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.buffer.as_ref().len();
        if len < UDP_HEADER_LEN {
            Err(DecodeError::from(format!(
                "invalid UdpBuffer: length is {len} but UdpBuffer \
                requires at least {UDP_HEADER_LEN}",
            )))
        } else {
            Ok(())
        }
    }

    pub fn source_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[0..2])
    }

    pub fn destination_port(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[2..4])
    }

    pub fn length(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[4..6])
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.buffer.as_ref()[6..8])
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> UdpBuffer<&'a T> {
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer.as_ref()[UDP_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> UdpBuffer<T> {
    pub fn set_source_port(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[0..2], value)
    }

    pub fn set_destination_port(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[2..4], value)
    }

    pub fn set_length(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[4..6], value)
    }

    pub fn set_checksum(&mut self, value: u16) {
        BigEndian::write_u16(&mut self.buffer.as_mut()[6..8], value)
    }
}
