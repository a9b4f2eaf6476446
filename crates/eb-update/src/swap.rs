// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Sector-granular image swap
//!
//! Exchanges the contents of the APP and DOWNLOAD slots sector by sector.
//! The whole loop runs inside one flash critical section: a half-swapped
//! image split across an interrupt boundary is a state neither boot nor
//! rollback could recover from without the recovery path.
//!
//! The swap is not power-fail atomic at image granularity. Power loss
//! mid-sector leaves that sector erased or partially programmed; the device
//! is then brought back through the recovery trigger and a re-upload.

use eb_common::config::MemoryLayout;
use eb_common::constants::SECTOR_SIZE;
use eb_common::{Error, Result};
use eb_hal::{FlashInterface, HalResult};

/// Number of sectors participating in a swap of `swap_size` bytes
///
/// 0 or anything past the slot length means the whole slot; otherwise the
/// byte count is rounded up to full sectors.
#[must_use]
pub const fn swap_sector_count(swap_size: u32, slot_len: u32) -> u32 {
    let sector = SECTOR_SIZE as u32;
    let effective = if swap_size == 0 || swap_size > slot_len {
        slot_len
    } else {
        swap_size
    };
    effective.div_ceil(sector)
}

/// Exchange the first `swap_size` bytes of the APP and DOWNLOAD slots
///
/// Post-condition: for every swapped sector `i`, the bytes previously at
/// `APP + i * SECTOR_SIZE` are at `DOWNLOAD + i * SECTOR_SIZE` and vice
/// versa. Self-inverse: running the same swap twice restores both slots.
pub fn swap_slots<F: FlashInterface>(
    flash: &mut F,
    layout: &MemoryLayout,
    swap_size: u32,
) -> Result<()> {
    debug_assert_eq!(F::SECTOR_SIZE, SECTOR_SIZE);

    let sectors = swap_sector_count(swap_size, layout.swap_space_len);

    let result: HalResult<()> = flash.with_flash_critical(|flash| {
        let mut app_buf = [0u8; SECTOR_SIZE];
        let mut download_buf = [0u8; SECTOR_SIZE];

        for i in 0..sectors {
            let app_addr = layout.app_start + i * SECTOR_SIZE as u32;
            let download_addr = layout.download_start + i * SECTOR_SIZE as u32;

            flash.read(app_addr, &mut app_buf)?;
            flash.read(download_addr, &mut download_buf)?;

            flash.erase_sector(app_addr)?;
            flash.erase_sector(download_addr)?;

            flash.program(app_addr, &download_buf)?;
            flash.program(download_addr, &app_buf)?;
        }

        Ok(())
    });

    result.map_err(|_| Error::SwapFailed)
}
