// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! RP2040 QSPI flash driver
//!
//! Flash erase/program on the RP2040 go through the boot-ROM routines and
//! require XIP to be suspended first. The full sequence is:
//!
//! 1. `connect_internal_flash()`
//! 2. `flash_exit_xip()`
//! 3. `flash_range_erase()` or `flash_range_program()`
//! 4. `flash_flush_cache()`
//! 5. `flash_enter_cmd_xip()`
//!
//! Because the bootloader itself executes in place from the same flash,
//! every function that runs during steps 1-5 is placed in RAM with
//! `#[link_section = ".data"]`, the ROM entry points are resolved once at
//! `init()` while XIP is still active, and interrupts are disabled for the
//! whole sequence.

use crate::error::{HalError, HalResult};
use crate::traits::FlashInterface;
use eb_common::constants;

#[cfg(target_arch = "arm")]
use core::sync::atomic::{AtomicUsize, Ordering};

/// XIP flash base address
pub const XIP_BASE: u32 = 0x1000_0000;

/// Total flash size (2 MB QSPI device)
pub const FLASH_TOTAL_SIZE: usize = 2 * 1024 * 1024;

/// QSPI block erase command (sector erase, 0x20)
#[cfg(target_arch = "arm")]
const BLOCK_ERASE_CMD: u8 = 0x20;

// RP2040 ROM table addresses (datasheet section 2.8.3)
#[cfg(target_arch = "arm")]
const ROM_FUNC_TABLE_PTR: *const u16 = 0x0000_0014 as *const u16;
#[cfg(target_arch = "arm")]
const ROM_TABLE_LOOKUP_PTR: *const u16 = 0x0000_0018 as *const u16;

#[cfg(target_arch = "arm")]
type RomFnVoid = unsafe extern "C" fn();
#[cfg(target_arch = "arm")]
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
#[cfg(target_arch = "arm")]
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

// ROM function pointers, resolved once at init while XIP is active.
// AtomicUsize avoids static mut while staying reachable from the
// RAM-resident routines below.
#[cfg(target_arch = "arm")]
static ROM_CONNECT_INTERNAL_FLASH: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_arch = "arm")]
static ROM_FLASH_EXIT_XIP: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_arch = "arm")]
static ROM_FLASH_RANGE_ERASE: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_arch = "arm")]
static ROM_FLASH_RANGE_PROGRAM: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_arch = "arm")]
static ROM_FLASH_FLUSH_CACHE: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_arch = "arm")]
static ROM_FLASH_ENTER_CMD_XIP: AtomicUsize = AtomicUsize::new(0);

/// Look up a ROM function by its two-character tag
///
/// # Safety
///
/// Must be called while XIP is active (the ROM table lives below the flash
/// window and the lookup routine is in ROM).
#[cfg(target_arch = "arm")]
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *ROM_FUNC_TABLE_PTR as *const u16;

    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *ROM_TABLE_LOOKUP_PTR as usize,
        );

    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Save the interrupt mask and disable interrupts
#[cfg(target_arch = "arm")]
#[inline(always)]
fn save_and_disable_interrupts() -> u32 {
    let primask: u32;
    // SAFETY: MRS PRIMASK and CPSID I are standard Cortex-M register
    // accesses with no memory effects beyond masking interrupts.
    unsafe {
        core::arch::asm!("mrs {}, PRIMASK", out(reg) primask, options(nomem, nostack));
        core::arch::asm!("cpsid i", options(nomem, nostack));
    }
    primask
}

/// Restore a previously saved interrupt mask
#[cfg(target_arch = "arm")]
#[inline(always)]
fn restore_interrupts(primask: u32) {
    if primask & 1 == 0 {
        // SAFETY: CPSIE I re-enables interrupts; only done when they were
        // enabled before the matching save.
        unsafe {
            core::arch::asm!("cpsie i", options(nomem, nostack));
        }
    }
}

/// Erase flash at the given flash-relative offset
///
/// Runs entirely from RAM with the full XIP teardown/setup sequence and
/// interrupts disabled.
///
/// # Safety
///
/// The ROM pointers must have been resolved by `Rp2040Flash::init()`.
/// `offset` and `len` must be sector-aligned and within the device.
#[cfg(target_arch = "arm")]
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase_raw(offset: u32, len: usize) {
    let connect: RomFnVoid =
        core::mem::transmute(ROM_CONNECT_INTERNAL_FLASH.load(Ordering::Acquire));
    let exit_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_EXIT_XIP.load(Ordering::Acquire));
    let erase: RomFnErase = core::mem::transmute(ROM_FLASH_RANGE_ERASE.load(Ordering::Acquire));
    let flush: RomFnVoid = core::mem::transmute(ROM_FLASH_FLUSH_CACHE.load(Ordering::Acquire));
    let enter_xip: RomFnVoid =
        core::mem::transmute(ROM_FLASH_ENTER_CMD_XIP.load(Ordering::Acquire));

    let saved = save_and_disable_interrupts();
    connect();
    exit_xip();
    erase(offset, len, constants::SECTOR_SIZE as u32, BLOCK_ERASE_CMD);
    flush();
    enter_xip();
    restore_interrupts(saved);
}

/// Program flash at the given flash-relative offset
///
/// Runs entirely from RAM with the full XIP teardown/setup sequence and
/// interrupts disabled.
///
/// # Safety
///
/// The ROM pointers must have been resolved by `Rp2040Flash::init()`.
/// `offset` and `len` must be `WRITE_ALIGN` multiples, the target sectors
/// erased, and `data` valid for `len` bytes.
#[cfg(target_arch = "arm")]
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program_raw(offset: u32, data: *const u8, len: usize) {
    let connect: RomFnVoid =
        core::mem::transmute(ROM_CONNECT_INTERNAL_FLASH.load(Ordering::Acquire));
    let exit_xip: RomFnVoid = core::mem::transmute(ROM_FLASH_EXIT_XIP.load(Ordering::Acquire));
    let program: RomFnProgram =
        core::mem::transmute(ROM_FLASH_RANGE_PROGRAM.load(Ordering::Acquire));
    let flush: RomFnVoid = core::mem::transmute(ROM_FLASH_FLUSH_CACHE.load(Ordering::Acquire));
    let enter_xip: RomFnVoid =
        core::mem::transmute(ROM_FLASH_ENTER_CMD_XIP.load(Ordering::Acquire));

    let saved = save_and_disable_interrupts();
    connect();
    exit_xip();
    program(offset, data, len);
    flush();
    enter_xip();
    restore_interrupts(saved);
}

/// RP2040 flash driver
///
/// Implements the block-device facade over the boot-ROM flash routines.
pub struct Rp2040Flash {
    initialized: bool,
}

impl Rp2040Flash {
    /// Create a new flash driver instance
    #[must_use]
    pub const fn new() -> Self {
        Self { initialized: false }
    }

    /// Resolve the ROM entry points
    ///
    /// Must be called once, before any erase or program operation, while
    /// XIP is still active.
    pub fn init(&mut self) -> HalResult<()> {
        #[cfg(target_arch = "arm")]
        {
            // SAFETY: Called from XIP context at startup; the ROM table and
            // lookup routine are fixed by the RP2040 mask ROM.
            unsafe {
                ROM_CONNECT_INTERNAL_FLASH.store(rom_func_lookup(b"IF"), Ordering::Release);
                ROM_FLASH_EXIT_XIP.store(rom_func_lookup(b"EX"), Ordering::Release);
                ROM_FLASH_RANGE_ERASE.store(rom_func_lookup(b"RE"), Ordering::Release);
                ROM_FLASH_RANGE_PROGRAM.store(rom_func_lookup(b"RP"), Ordering::Release);
                ROM_FLASH_FLUSH_CACHE.store(rom_func_lookup(b"FC"), Ordering::Release);
                ROM_FLASH_ENTER_CMD_XIP.store(rom_func_lookup(b"CX"), Ordering::Release);
            }
            self.initialized = true;
            Ok(())
        }

        #[cfg(not(target_arch = "arm"))]
        {
            Err(HalError::NotSupported)
        }
    }

    /// Check if an address range is within flash bounds
    fn check_range(address: u32, len: usize) -> HalResult<()> {
        let end = (address as u64) + (len as u64);
        if address < XIP_BASE || end > (XIP_BASE as u64 + FLASH_TOTAL_SIZE as u64) {
            return Err(HalError::FlashOutOfBounds);
        }
        Ok(())
    }

    fn check_initialized(&self) -> HalResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(HalError::NotInitialized)
        }
    }
}

impl Default for Rp2040Flash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for Rp2040Flash {
    const SECTOR_SIZE: usize = constants::SECTOR_SIZE;
    const WRITE_ALIGN: usize = constants::WRITE_ALIGN;

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        Self::check_range(address, buffer.len())?;

        #[cfg(target_arch = "arm")]
        {
            for (i, byte) in buffer.iter_mut().enumerate() {
                // SAFETY: The range check above confines the access to the
                // memory-mapped XIP window. Volatile reads bypass any stale
                // cache state after erase/program cycles.
                *byte = unsafe { ((address + i as u32) as *const u8).read_volatile() };
            }
            Ok(())
        }

        #[cfg(not(target_arch = "arm"))]
        {
            let _ = buffer;
            Err(HalError::NotSupported)
        }
    }

    fn erase_sector(&mut self, address: u32) -> HalResult<()> {
        self.check_initialized()?;
        Self::check_range(address, constants::SECTOR_SIZE)?;
        if address % constants::SECTOR_SIZE as u32 != 0 {
            return Err(HalError::FlashAlignment);
        }

        #[cfg(target_arch = "arm")]
        {
            // SAFETY: init() resolved the ROM pointers; address is bounds-
            // and alignment-checked; the raw routine handles XIP teardown
            // and interrupt masking.
            unsafe {
                flash_erase_raw(address - XIP_BASE, constants::SECTOR_SIZE);
            }
            Ok(())
        }

        #[cfg(not(target_arch = "arm"))]
        {
            Err(HalError::NotSupported)
        }
    }

    fn program(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        self.check_initialized()?;
        Self::check_range(address, data.len())?;
        if address % constants::WRITE_ALIGN as u32 != 0 || data.len() % constants::WRITE_ALIGN != 0 {
            return Err(HalError::FlashAlignment);
        }

        #[cfg(target_arch = "arm")]
        {
            // SAFETY: init() resolved the ROM pointers; address and length
            // are bounds- and alignment-checked; `data` outlives the call.
            unsafe {
                flash_program_raw(address - XIP_BASE, data.as_ptr(), data.len());
            }
            Ok(())
        }

        #[cfg(not(target_arch = "arm"))]
        {
            let _ = data;
            Err(HalError::NotSupported)
        }
    }

    fn with_flash_critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        #[cfg(target_arch = "arm")]
        {
            let saved = save_and_disable_interrupts();
            let result = f(self);
            restore_interrupts(saved);
            result
        }

        #[cfg(not(target_arch = "arm"))]
        {
            f(self)
        }
    }
}
