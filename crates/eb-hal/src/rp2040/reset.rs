// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! RP2040 system reset

use crate::traits::ResetInterface;

/// Hardware reset via the Cortex-M system control block
pub struct Rp2040Reset;

impl Rp2040Reset {
    /// Create a reset handle
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for Rp2040Reset {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetInterface for Rp2040Reset {
    fn hard_reset(&mut self) -> ! {
        #[cfg(target_arch = "arm")]
        {
            const SCB_AIRCR: u32 = 0xE000_ED0C;
            const AIRCR_VECTKEY: u32 = 0x05FA_0000;
            const AIRCR_SYSRESETREQ: u32 = 1 << 2;

            // SAFETY: SCB_AIRCR is the Application Interrupt and Reset
            // Control Register. Writing VECTKEY with SYSRESETREQ requests a
            // system reset; this is the architectural Cortex-M reset path.
            unsafe {
                core::ptr::write_volatile(
                    SCB_AIRCR as *mut u32,
                    AIRCR_VECTKEY | AIRCR_SYSRESETREQ,
                );
            }
        }

        // The reset takes a few cycles to assert
        loop {
            core::hint::spin_loop();
        }
    }
}
