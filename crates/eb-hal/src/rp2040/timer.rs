// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! RP2040 microsecond timer

use crate::traits::TimerInterface;

#[cfg(target_arch = "arm")]
use core::ptr::read_volatile;

#[cfg(target_arch = "arm")]
const TIMER_BASE: u32 = 0x4005_4000;
#[cfg(target_arch = "arm")]
const TIMERAWL_OFFSET: u32 = 0x28;

/// Free-running microsecond timer
///
/// Wraps the RP2040 TIMER peripheral's raw low word. The 32-bit
/// microsecond counter wraps after about 71 minutes, far beyond any
/// bootloader session; deltas use wrapping arithmetic regardless.
pub struct Rp2040Timer;

impl Rp2040Timer {
    /// Create a timer handle
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn micros(&self) -> u32 {
        #[cfg(target_arch = "arm")]
        {
            // SAFETY: TIMERAWL (0x4005_4028) is the non-latching read of
            // the timer low word, always readable. Volatile read because
            // the counter advances continuously.
            unsafe { read_volatile((TIMER_BASE + TIMERAWL_OFFSET) as *const u32) }
        }

        #[cfg(not(target_arch = "arm"))]
        {
            0
        }
    }
}

impl Default for Rp2040Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerInterface for Rp2040Timer {
    fn get_millis(&self) -> u32 {
        self.micros() / 1000
    }

    fn delay_ms(&self, ms: u32) {
        #[cfg(target_arch = "arm")]
        {
            let start = self.micros();
            let target = ms.saturating_mul(1000);
            while self.micros().wrapping_sub(start) < target {
                core::hint::spin_loop();
            }
        }

        #[cfg(not(target_arch = "arm"))]
        {
            let _ = ms;
        }
    }
}
