// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Application-facing OTA interface
//!
//! The thin surface the running application links against to drive an
//! update: stage an image into the DOWNLOAD slot, record its size and
//! digest, confirm its own health after a swap, or hand control back to the
//! bootloader.
//!
//! A successful boot is confirmed by calling
//! [`OtaHandle::mark_should_not_rollback`]; until then the armed
//! `should_rollback` flag makes the next reset roll back to the previous
//! image.

use crate::metadata::{Flag, MetadataStore};
use eb_common::config::MemoryLayout;
use eb_common::constants::{DIGEST_SIZE, WRITE_ALIGN};
use eb_common::{Error, Result};
use eb_hal::{FlashInterface, ResetInterface};

/// Handle through which the application drives firmware updates
pub struct OtaHandle<F> {
    store: MetadataStore<F>,
    layout: MemoryLayout,
}

impl<F: FlashInterface> OtaHandle<F> {
    /// Create a handle and load the current metadata
    pub fn new(flash: F, layout: MemoryLayout) -> Result<Self> {
        let mut store = MetadataStore::new(flash, layout.info_start);
        store.load()?;
        Ok(Self { store, layout })
    }

    /// Access the underlying metadata store
    pub fn store(&self) -> &MetadataStore<F> {
        &self.store
    }

    /// The bootloader installed a new image that has not been committed yet
    #[must_use]
    pub fn is_after_firmware_update(&self) -> bool {
        self.store.has_new_firmware()
    }

    /// The running image is the result of a rollback
    #[must_use]
    pub fn is_after_rollback(&self) -> bool {
        self.store.is_after_rollback()
    }

    /// Clear the new-firmware marker
    pub fn mark_has_no_new_firmware(&mut self) -> Result<()> {
        self.store
            .update(|r| r.set(Flag::HasNewFirmware, false))
    }

    /// Commit the running image: the next reset will not roll back
    pub fn mark_should_not_rollback(&mut self) -> Result<()> {
        self.store
            .update(|r| r.set(Flag::ShouldRollback, false))
    }

    /// Erase the DOWNLOAD slot in preparation for staging a new image
    pub fn initialize_download_slot(&mut self) -> Result<()> {
        let start = self.layout.download_start;
        let end = self.layout.download_end();
        self.store
            .flash_mut()
            .erase_range(start, end)
            .map_err(Error::from)
    }

    /// Program an aligned chunk of the staged image
    ///
    /// `offset` is relative to the start of the DOWNLOAD slot; both the
    /// offset and `data.len()` must be multiples of the program alignment.
    pub fn write_to_flash_aligned(&mut self, data: &[u8], offset: u32) -> Result<()> {
        if offset % WRITE_ALIGN as u32 != 0 || data.len() % WRITE_ALIGN != 0 {
            return Err(Error::AlignmentError);
        }
        let end = offset as u64 + data.len() as u64;
        if end > u64::from(self.layout.swap_space_len) {
            return Err(Error::OutOfBounds);
        }

        let address = self.layout.download_start + offset;
        self.store
            .flash_mut()
            .program(address, data)
            .map_err(Error::from)
    }

    /// Record the staged image's size and digest
    pub fn mark_download_slot_valid(
        &mut self,
        size: u32,
        digest: &[u8; DIGEST_SIZE],
    ) -> Result<()> {
        self.store.update(|r| {
            r.swap_size = size;
            r.digest = *digest;
        })
    }

    /// Drop the staged image record
    pub fn mark_download_slot_invalid(&mut self) -> Result<()> {
        self.store.update(|r| {
            r.set(Flag::HasFirmwareToSwap, false);
            r.swap_size = 0;
            r.digest = [0; DIGEST_SIZE];
        })
    }

    /// Arm the staged image and soft-reset into the bootloader
    ///
    /// Sets `has_firmware_to_swap` so the next boot performs Swap-and-arm,
    /// then resets. The reset happens even if persisting the flag fails —
    /// in that case the bootloader simply passes through to the current
    /// image.
    pub fn perform_update<R: ResetInterface>(&mut self, reset: &mut R) -> ! {
        let _ = self
            .store
            .update(|r| r.set(Flag::HasFirmwareToSwap, true));
        reset.hard_reset()
    }
}
