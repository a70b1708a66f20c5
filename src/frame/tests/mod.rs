// SPDX-License-Identifier: MIT

mod ethernet;
mod mac;
