// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! RP2040 drivers
//!
//! Implementations of the HAL traits the bootloader owns on the RP2040:
//! the QSPI flash block device (via boot-ROM routines), the recovery
//! trigger pins, the microsecond timer, and the system reset.
//!
//! The external W5500 Ethernet driver and DHCP client remain outside this
//! crate; the board support in the bootloader binary adapts them to the
//! [`MacInterface`](crate::traits::MacInterface) family of traits.

pub mod flash;
pub mod pins;
pub mod reset;
pub mod timer;

pub use flash::Rp2040Flash;
pub use pins::Rp2040TriggerPin;
pub use reset::Rp2040Reset;
pub use timer::Rp2040Timer;
