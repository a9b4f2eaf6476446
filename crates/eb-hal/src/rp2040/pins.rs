// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! RP2040 recovery trigger pins
//!
//! The two recovery trigger inputs are plain GPIOs with pull-ups, sampled
//! once at reset. Active low: a held button reads 0.

use crate::error::HalResult;
use crate::traits::GpioPin;

#[cfg(target_arch = "arm")]
use core::ptr::{read_volatile, write_volatile};

// RP2040 register bases (datasheet section 2.19)
#[cfg(target_arch = "arm")]
const IO_BANK0_BASE: u32 = 0x4001_4000;
#[cfg(target_arch = "arm")]
const PADS_BANK0_BASE: u32 = 0x4001_C000;
#[cfg(target_arch = "arm")]
const SIO_BASE: u32 = 0xD000_0000;
#[cfg(target_arch = "arm")]
const SIO_GPIO_IN_OFFSET: u32 = 0x004;

// Pad control bits
#[cfg(target_arch = "arm")]
const PADS_IE: u32 = 1 << 6;
#[cfg(target_arch = "arm")]
const PADS_PUE: u32 = 1 << 3;
#[cfg(target_arch = "arm")]
const PADS_SCHMITT: u32 = 1 << 1;

// GPIO function select: SIO
#[cfg(target_arch = "arm")]
const FUNCSEL_SIO: u32 = 5;

/// A single recovery trigger input pin
pub struct Rp2040TriggerPin {
    pin: u8,
}

impl Rp2040TriggerPin {
    /// Configure the given GPIO as a pulled-up SIO input
    #[must_use]
    pub fn new(pin: u8) -> Self {
        #[cfg(target_arch = "arm")]
        {
            let ctrl = IO_BANK0_BASE + 4 + u32::from(pin) * 8;
            let pad = PADS_BANK0_BASE + 4 + u32::from(pin) * 4;

            // SAFETY: `ctrl` and `pad` are the IO_BANK0 GPIOx_CTRL and
            // PADS_BANK0 GPIOx registers for this pin, valid MMIO for
            // pins 0-29. Selects the SIO function and enables the input
            // buffer with a pull-up; volatile writes required for MMIO.
            unsafe {
                write_volatile(pad as *mut u32, PADS_IE | PADS_PUE | PADS_SCHMITT);
                write_volatile(ctrl as *mut u32, FUNCSEL_SIO);
            }
        }

        Self { pin }
    }

    /// The GPIO number this pin is bound to
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.pin
    }
}

impl GpioPin for Rp2040TriggerPin {
    fn is_high(&self) -> HalResult<bool> {
        #[cfg(target_arch = "arm")]
        {
            // SAFETY: SIO GPIO_IN (0xD000_0004) is the single-cycle input
            // register, always readable. Volatile read because the pin
            // state changes asynchronously.
            let bits = unsafe { read_volatile((SIO_BASE + SIO_GPIO_IN_OFFSET) as *const u32) };
            Ok(bits & (1 << self.pin) != 0)
        }

        #[cfg(not(target_arch = "arm"))]
        {
            // Simulation: pin never held
            Ok(true)
        }
    }
}
