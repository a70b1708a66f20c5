// SPDX-License-Identifier: MIT

//! NIC feature control. Hardware RX VLAN filtering strips or drops
//! tagged frames before the capture handle sees them, so it has to be
//! off for the reflector to observe the trunk at all. Failure here is
//! survivable: the driver may not strip tags in the first place.

/// Switches `rx-vlan-filter` off unless it already is. Warns and
/// continues on any failure.
#[cfg(target_os = "linux")]
pub fn remove_vlan_filter(interface: &str) {
    match ethtool::disable_feature(interface, b"rx-vlan-filter") {
        Ok(ethtool::FeatureChange::Disabled) => {}
        Ok(ethtool::FeatureChange::AlreadyOff) => {}
        Ok(ethtool::FeatureChange::NotPresent) => {
            log::warn!(
                "interface {interface} does not expose rx-vlan-filter"
            );
        }
        Err(e) => {
            log::warn!(
                "unable to remove the hardware vlan filter \
                (rx-vlan-filter) on {interface}: {e}"
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn remove_vlan_filter(interface: &str) {
    log::warn!(
        "cannot control rx-vlan-filter on {interface}: NIC feature \
        control is only implemented for Linux"
    );
}

#[cfg(target_os = "linux")]
mod ethtool {
    use std::io;

    const SIOCETHTOOL: libc::c_ulong = 0x8946;
    const ETHTOOL_GSTRINGS: u32 = 0x0000001b;
    const ETHTOOL_GSSET_INFO: u32 = 0x00000037;
    const ETHTOOL_GFEATURES: u32 = 0x0000003a;
    const ETHTOOL_SFEATURES: u32 = 0x0000003b;
    const ETH_SS_FEATURES: u32 = 4;
    const ETH_GSTRING_LEN: usize = 32;

    /// `struct ethtool_gstrings` header: cmd, string_set, len.
    const GSTRINGS_HEADER_LEN: usize = 12;
    /// `struct ethtool_gfeatures` / `ethtool_sfeatures` header: cmd, size.
    const FEATURES_HEADER_LEN: usize = 8;
    /// `struct ethtool_get_features_block`: available, requested,
    /// active, never_changed.
    const GET_BLOCK_LEN: usize = 16;
    /// `struct ethtool_set_features_block`: valid, requested.
    const SET_BLOCK_LEN: usize = 8;

    pub(super) enum FeatureChange {
        Disabled,
        AlreadyOff,
        NotPresent,
    }

    struct Socket(libc::c_int);

    impl Socket {
        fn open() -> io::Result<Self> {
            let fd =
                unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self(fd))
        }

        fn ethtool(
            &self,
            interface: &str,
            data: *mut libc::c_void,
        ) -> io::Result<()> {
            let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
            let name = interface.as_bytes();
            if name.len() >= ifr.ifr_name.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("interface name {interface} too long"),
                ));
            }
            for (dst, src) in ifr.ifr_name.iter_mut().zip(name) {
                *dst = *src as libc::c_char;
            }
            ifr.ifr_ifru.ifru_data = data as *mut libc::c_char;
            let rc = unsafe { libc::ioctl(self.0, SIOCETHTOOL, &mut ifr) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl Drop for Socket {
        fn drop(&mut self) {
            unsafe { libc::close(self.0) };
        }
    }

    /// An 8-byte aligned ioctl argument buffer with u32 field access.
    struct Arg(Vec<u64>);

    impl Arg {
        fn new(len: usize) -> Self {
            Self(vec![0u64; len.div_ceil(8)])
        }

        fn ptr(&mut self) -> *mut libc::c_void {
            self.0.as_mut_ptr() as *mut libc::c_void
        }

        fn bytes(&self) -> &[u8] {
            unsafe {
                std::slice::from_raw_parts(
                    self.0.as_ptr() as *const u8,
                    self.0.len() * 8,
                )
            }
        }

        fn get_u32(&self, offset: usize) -> u32 {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&self.bytes()[offset..offset + 4]);
            u32::from_ne_bytes(raw)
        }

        fn set_u32(&mut self, offset: usize, value: u32) {
            let bytes = unsafe {
                std::slice::from_raw_parts_mut(
                    self.0.as_mut_ptr() as *mut u8,
                    self.0.len() * 8,
                )
            };
            bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
        }
    }

    pub(super) fn disable_feature(
        interface: &str,
        feature: &[u8],
    ) -> io::Result<FeatureChange> {
        let sock = Socket::open()?;
        let count = feature_count(&sock, interface)?;
        let Some(index) = feature_index(&sock, interface, count, feature)?
        else {
            return Ok(FeatureChange::NotPresent);
        };
        if !feature_active(&sock, interface, count, index)? {
            return Ok(FeatureChange::AlreadyOff);
        }
        log::info!(
            "hardware vlan filter (rx-vlan-filter) is enabled, disabling it"
        );
        clear_feature(&sock, interface, count, index)?;
        Ok(FeatureChange::Disabled)
    }

    /// How many strings are in the feature string set.
    fn feature_count(sock: &Socket, interface: &str) -> io::Result<usize> {
        // struct ethtool_sset_info: cmd, reserved, sset_mask (u64),
        // then one u32 count per set bit in the mask.
        let mut arg = Arg::new(16 + 4);
        arg.set_u32(0, ETHTOOL_GSSET_INFO);
        arg.set_u32(8, 1 << ETH_SS_FEATURES);
        sock.ethtool(interface, arg.ptr())?;
        if arg.get_u32(8) & (1 << ETH_SS_FEATURES) == 0 {
            return Ok(0);
        }
        Ok(arg.get_u32(16) as usize)
    }

    fn feature_index(
        sock: &Socket,
        interface: &str,
        count: usize,
        feature: &[u8],
    ) -> io::Result<Option<usize>> {
        if count == 0 {
            return Ok(None);
        }
        let mut arg = Arg::new(GSTRINGS_HEADER_LEN + count * ETH_GSTRING_LEN);
        arg.set_u32(0, ETHTOOL_GSTRINGS);
        arg.set_u32(4, ETH_SS_FEATURES);
        arg.set_u32(8, count as u32);
        sock.ethtool(interface, arg.ptr())?;
        for i in 0..count {
            let start = GSTRINGS_HEADER_LEN + i * ETH_GSTRING_LEN;
            let name = &arg.bytes()[start..start + ETH_GSTRING_LEN];
            let end = name
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(ETH_GSTRING_LEN);
            if &name[..end] == feature {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn blocks(count: usize) -> usize {
        count.div_ceil(32)
    }

    fn feature_active(
        sock: &Socket,
        interface: &str,
        count: usize,
        index: usize,
    ) -> io::Result<bool> {
        let mut arg =
            Arg::new(FEATURES_HEADER_LEN + blocks(count) * GET_BLOCK_LEN);
        arg.set_u32(0, ETHTOOL_GFEATURES);
        arg.set_u32(4, blocks(count) as u32);
        sock.ethtool(interface, arg.ptr())?;
        // The `active` word sits third in its feature block.
        let offset = FEATURES_HEADER_LEN + (index / 32) * GET_BLOCK_LEN + 8;
        Ok(arg.get_u32(offset) & (1 << (index % 32)) != 0)
    }

    fn clear_feature(
        sock: &Socket,
        interface: &str,
        count: usize,
        index: usize,
    ) -> io::Result<()> {
        let mut arg =
            Arg::new(FEATURES_HEADER_LEN + blocks(count) * SET_BLOCK_LEN);
        arg.set_u32(0, ETHTOOL_SFEATURES);
        arg.set_u32(4, blocks(count) as u32);
        // Mark only our feature's bit valid, requested stays zero.
        let offset = FEATURES_HEADER_LEN + (index / 32) * SET_BLOCK_LEN;
        arg.set_u32(offset, 1 << (index % 32));
        sock.ethtool(interface, arg.ptr())
    }
}
