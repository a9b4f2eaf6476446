// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Hardware Abstraction Layer for Emberboot
//!
//! This crate defines the thin interfaces through which the bootloader
//! consumes its hardware collaborators, and the RP2040 implementations of
//! the ones the bootloader owns:
//!
//! 1. **Traits**: platform-agnostic interfaces (`traits` module) — block
//!    device, trigger pins, timer, reset, board identity, and the Ethernet
//!    MAC / socket / DHCP collaborators
//! 2. **Drivers**: RP2040 implementations (`rp2040` module, feature-gated)
//!
//! The external SPI Ethernet driver and DHCP client are not implemented
//! here; the bootloader only ever sees them through the traits, which keeps
//! every core testable on the host against RAM-backed mocks.

#![no_std]
#![warn(missing_docs)]

pub mod error;
pub mod traits;

cfg_if::cfg_if! {
    if #[cfg(feature = "rp2040")] {
        pub mod rp2040;
    }
}

// Re-export main traits
pub use error::{HalError, HalResult};
pub use traits::*;

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// RP2040 (Cortex-M0+)
    Rp2040,
    /// Unknown/simulation
    Unknown,
}

impl Platform {
    /// Get the current platform
    #[must_use]
    pub const fn current() -> Self {
        #[cfg(feature = "rp2040")]
        return Self::Rp2040;

        #[cfg(not(feature = "rp2040"))]
        Self::Unknown
    }

    /// Get the XIP flash base address for this platform
    #[must_use]
    pub const fn flash_base(&self) -> u32 {
        match self {
            Self::Rp2040 => 0x1000_0000,
            Self::Unknown => 0x0000_0000,
        }
    }
}
