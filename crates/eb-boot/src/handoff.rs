// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Application hand-off
//!
//! The last step of every boot path: quiesce the hardware the bootloader
//! touched, point the vector table at the application, and branch to its
//! reset vector. Precondition: all metadata writes are durable.

use eb_common::config::MemoryLayout;
use eb_hal::FlashInterface;

#[cfg(target_arch = "arm")]
use core::ptr::{read_volatile, write_volatile};

// Cortex-M system control registers
#[cfg(target_arch = "arm")]
const SYST_CSR: u32 = 0xE000_E010;
#[cfg(target_arch = "arm")]
const NVIC_ICER: u32 = 0xE000_E180;
#[cfg(target_arch = "arm")]
const NVIC_ICPR: u32 = 0xE000_E280;
#[cfg(target_arch = "arm")]
const SCB_VTOR: u32 = 0xE000_ED08;

// RP2040 reset controller
#[cfg(target_arch = "arm")]
const RESETS_RESET_SET: u32 = 0x4000_C000 + 0x2000;

// Peripherals that must stay out of reset for execution to continue:
// QSPI I/O and pads (XIP), system config, and the system PLL.
#[cfg(target_arch = "arm")]
const RESET_IO_QSPI: u32 = 1 << 6;
#[cfg(target_arch = "arm")]
const RESET_PADS_QSPI: u32 = 1 << 9;
#[cfg(target_arch = "arm")]
const RESET_PLL_SYS: u32 = 1 << 12;
#[cfg(target_arch = "arm")]
const RESET_SYSCFG: u32 = 1 << 18;
#[cfg(target_arch = "arm")]
const RESET_ALL_PERIPHERALS: u32 = 0x01FF_FFFF;

/// Check that the application vector table looks bootable
///
/// Word 0 must be a stack pointer in SRAM and word 1 a thumb-mode reset
/// vector inside the APP slot. A freshly erased slot fails both.
pub fn vector_table_is_plausible<F: FlashInterface>(flash: &F, layout: &MemoryLayout) -> bool {
    let mut words = [0u8; 8];
    if flash.read(layout.app_vtor(), &mut words).is_err() {
        return false;
    }

    let initial_sp = u32::from_le_bytes([words[0], words[1], words[2], words[3]]);
    let reset_vector = u32::from_le_bytes([words[4], words[5], words[6], words[7]]);

    let sp_in_sram = (0x2000_0000..=0x2004_2000).contains(&initial_sp);
    let vector_in_slot = reset_vector & 1 == 1
        && (layout.app_start..layout.app_end()).contains(&(reset_vector & !1));

    sp_in_sram && vector_in_slot
}

/// Disable SysTick and mask and clear all external interrupts
#[cfg(target_arch = "arm")]
fn disable_interrupts() {
    // SAFETY: SYST_CSR, NVIC_ICER, and NVIC_ICPR are architectural
    // Cortex-M registers. Clearing the SysTick enable bit and writing
    // all-ones to the clear-enable and clear-pending registers masks every
    // interrupt source before the jump.
    unsafe {
        let csr = read_volatile(SYST_CSR as *const u32);
        write_volatile(SYST_CSR as *mut u32, csr & !1);

        write_volatile(NVIC_ICER as *mut u32, 0xFFFF_FFFF);
        write_volatile(NVIC_ICPR as *mut u32, 0xFFFF_FFFF);
    }
}

/// Put every peripheral except the execution-critical set back into reset
#[cfg(target_arch = "arm")]
fn reset_peripherals() {
    let keep = RESET_IO_QSPI | RESET_PADS_QSPI | RESET_PLL_SYS | RESET_SYSCFG;

    // SAFETY: RESETS_RESET_SET is the atomic set alias of the RP2040 reset
    // controller. Asserting reset on everything except QSPI, SYSCFG, and
    // the system PLL leaves XIP and the core clock running; the
    // application's own startup deasserts what it needs.
    unsafe {
        write_volatile(RESETS_RESET_SET as *mut u32, RESET_ALL_PERIPHERALS & !keep);
    }
}

/// Relocate the vector table and jump to the application reset vector
///
/// Does not return. The application's stack pointer is loaded from word 0
/// of its vector table and execution continues at word 1.
pub fn jump_to_application(layout: &MemoryLayout) -> ! {
    #[cfg(target_arch = "arm")]
    {
        let vtor = layout.app_vtor();

        disable_interrupts();
        reset_peripherals();

        // SAFETY: `vtor` is the sector-aligned application vector table
        // within the APP slot. Word 0 holds the initial stack pointer and
        // word 4 the reset vector; both were staged by a verified image.
        // After VTOR is redirected, MSP is reloaded and control transfers
        // to the application — the standard Cortex-M hand-off sequence.
        unsafe {
            let initial_sp = read_volatile(vtor as *const u32);
            let reset_vector = read_volatile((vtor + 4) as *const u32);

            write_volatile(SCB_VTOR as *mut u32, vtor);

            core::arch::asm!(
                "msr msp, {sp}",
                "bx {entry}",
                sp = in(reg) initial_sp,
                entry = in(reg) reset_vector,
                options(noreturn),
            );
        }
    }

    #[cfg(not(target_arch = "arm"))]
    {
        let _ = layout;
        unreachable!("application hand-off is only possible on the target")
    }
}
