// SPDX-License-Identifier: MIT

mod mdns;

use crate::frame::Mac;

pub(crate) fn src_mac() -> Mac {
    Mac::from([0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0x01])
}

pub(crate) fn reflector_mac() -> Mac {
    Mac::from([0xbb, 0xbb, 0xbb, 0xbb, 0xbb, 0xbb])
}
