// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Integration tests for eb-update
//!
//! Metadata persistence, the sector swap contract, staged-image
//! verification, and the application OTA flow, all on the host against a
//! RAM-backed flash.

use eb_common::config::MemoryLayout;
use eb_common::constants::{DIGEST_SIZE, SECTOR_SIZE, WRITE_ALIGN};
use eb_hal::{FlashInterface, HalError, HalResult};
use eb_update::metadata::{Flag, MetadataStore};
use eb_update::{swap_slots, verify_download, OtaHandle};
use sha2::{Digest, Sha256};

const BASE: u32 = 0x1000_0000;
const FLASH_LEN: usize = 10 * SECTOR_SIZE;

/// Four-sector slots for fast tests
fn test_layout() -> MemoryLayout {
    MemoryLayout {
        flash_base: BASE,
        bootloader_len: SECTOR_SIZE as u32,
        info_start: BASE + SECTOR_SIZE as u32,
        app_start: BASE + 2 * SECTOR_SIZE as u32,
        download_start: BASE + 6 * SECTOR_SIZE as u32,
        swap_space_len: 4 * SECTOR_SIZE as u32,
        vtor_offset: 0x100,
    }
}

/// RAM-backed flash with NOR erase/program semantics
#[derive(Clone)]
struct RamFlash {
    memory: Vec<u8>,
}

impl RamFlash {
    fn new() -> Self {
        Self {
            memory: vec![0xFF; FLASH_LEN],
        }
    }

    fn offset(address: u32, len: usize) -> HalResult<usize> {
        let offset = address.checked_sub(BASE).ok_or(HalError::FlashOutOfBounds)? as usize;
        if offset + len > FLASH_LEN {
            return Err(HalError::FlashOutOfBounds);
        }
        Ok(offset)
    }

    fn slice(&self, address: u32, len: usize) -> &[u8] {
        let offset = Self::offset(address, len).unwrap();
        &self.memory[offset..offset + len]
    }
}

impl FlashInterface for RamFlash {
    const SECTOR_SIZE: usize = SECTOR_SIZE;
    const WRITE_ALIGN: usize = WRITE_ALIGN;

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        let offset = Self::offset(address, buffer.len())?;
        buffer.copy_from_slice(&self.memory[offset..offset + buffer.len()]);
        Ok(())
    }

    fn erase_sector(&mut self, address: u32) -> HalResult<()> {
        if address % SECTOR_SIZE as u32 != 0 {
            return Err(HalError::FlashAlignment);
        }
        let offset = Self::offset(address, SECTOR_SIZE)?;
        self.memory[offset..offset + SECTOR_SIZE].fill(0xFF);
        Ok(())
    }

    fn program(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        if address % WRITE_ALIGN as u32 != 0 || data.len() % WRITE_ALIGN != 0 {
            return Err(HalError::FlashAlignment);
        }
        let offset = Self::offset(address, data.len())?;
        for (dst, src) in self.memory[offset..offset + data.len()].iter_mut().zip(data) {
            *dst &= *src;
        }
        Ok(())
    }
}

/// Program a whole slot with a deterministic pattern
fn fill_slot(flash: &mut RamFlash, start: u32, len: u32, seed: u8) {
    let mut page = [0u8; WRITE_ALIGN];
    let mut addr = start;
    while addr < start + len {
        for (i, byte) in page.iter_mut().enumerate() {
            *byte = seed ^ (addr.wrapping_add(i as u32) % 251) as u8;
        }
        flash.program(addr, &page).unwrap();
        addr += WRITE_ALIGN as u32;
    }
}

mod metadata_tests {
    use super::*;

    #[test]
    fn test_fresh_flash_loads_as_all_false() {
        let layout = test_layout();
        let mut store = MetadataStore::new(RamFlash::new(), layout.info_start);
        store.load().unwrap();

        assert!(!store.has_firmware_to_swap());
        assert!(!store.has_new_firmware());
        assert!(!store.is_after_rollback());
        assert!(!store.should_rollback());
        assert_eq!(store.swap_size(), 0);
    }

    #[test]
    fn test_update_survives_reload() {
        let layout = test_layout();
        let mut store = MetadataStore::new(RamFlash::new(), layout.info_start);
        store.load().unwrap();
        store
            .update(|r| {
                r.set(Flag::ShouldRollback, true);
                r.swap_size = 0x0003_0000;
                r.digest = [0xAB; DIGEST_SIZE];
            })
            .unwrap();

        // A fresh store over the same flash sees the persisted record
        let flash = store.into_flash();
        let mut reloaded = MetadataStore::new(flash, layout.info_start);
        reloaded.load().unwrap();

        assert!(reloaded.should_rollback());
        assert!(!reloaded.has_new_firmware());
        assert_eq!(reloaded.swap_size(), 0x0003_0000);
        assert_eq!(reloaded.digest(), [0xAB; DIGEST_SIZE]);
    }

    #[test]
    fn test_corrupted_record_reads_as_defaults() {
        let layout = test_layout();
        let mut flash = RamFlash::new();

        // A record-sized splat of garbage with no valid magic or CRC
        let garbage = [0x5Au8; WRITE_ALIGN];
        flash.program(layout.info_start, &garbage).unwrap();

        let mut store = MetadataStore::new(flash, layout.info_start);
        store.load().unwrap();

        assert!(!store.should_rollback());
        assert!(!store.has_firmware_to_swap());
        assert_eq!(store.swap_size(), 0);
    }

    #[test]
    fn test_batched_update_is_one_record() {
        let layout = test_layout();
        let mut store = MetadataStore::new(RamFlash::new(), layout.info_start);
        store.load().unwrap();
        store
            .update(|r| {
                r.set(Flag::HasNewFirmware, true);
                r.set(Flag::ShouldRollback, true);
                r.set(Flag::AfterRollback, false);
            })
            .unwrap();

        assert!(store.has_new_firmware());
        assert!(store.should_rollback());
        assert!(!store.is_after_rollback());
    }
}

mod swap_tests {
    use super::*;

    #[test]
    fn test_swap_exchanges_whole_slots() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        fill_slot(&mut flash, layout.app_start, layout.swap_space_len, 0x11);
        fill_slot(
            &mut flash,
            layout.download_start,
            layout.swap_space_len,
            0x77,
        );

        let app_before = flash.slice(layout.app_start, layout.swap_space_len as usize).to_vec();
        let dl_before = flash
            .slice(layout.download_start, layout.swap_space_len as usize)
            .to_vec();

        swap_slots(&mut flash, &layout, 0).unwrap();

        assert_eq!(
            flash.slice(layout.app_start, layout.swap_space_len as usize),
            &dl_before[..]
        );
        assert_eq!(
            flash.slice(layout.download_start, layout.swap_space_len as usize),
            &app_before[..]
        );
    }

    #[test]
    fn test_swap_is_self_inverse() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        fill_slot(&mut flash, layout.app_start, layout.swap_space_len, 0x22);
        fill_slot(
            &mut flash,
            layout.download_start,
            layout.swap_space_len,
            0x99,
        );
        let before = flash.memory.clone();

        swap_slots(&mut flash, &layout, 2 * SECTOR_SIZE as u32).unwrap();
        swap_slots(&mut flash, &layout, 2 * SECTOR_SIZE as u32).unwrap();

        assert_eq!(flash.memory, before);
    }

    #[test]
    fn test_partial_swap_leaves_tail_untouched() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        fill_slot(&mut flash, layout.app_start, layout.swap_space_len, 0x33);
        fill_slot(
            &mut flash,
            layout.download_start,
            layout.swap_space_len,
            0xCC,
        );

        let tail_addr = layout.app_start + SECTOR_SIZE as u32;
        let tail_before = flash
            .slice(tail_addr, 3 * SECTOR_SIZE)
            .to_vec();

        // One byte past nothing: rounds up to exactly one sector
        swap_slots(&mut flash, &layout, 1).unwrap();

        assert_eq!(flash.slice(tail_addr, 3 * SECTOR_SIZE), &tail_before[..]);
    }

    #[test]
    fn test_app_bytes_survive_arm_rollback_cycles() {
        // Property: without a commit, the original APP image is always
        // present in exactly one of the two slots.
        let layout = test_layout();
        let mut flash = RamFlash::new();
        fill_slot(&mut flash, layout.app_start, layout.swap_space_len, 0x44);
        fill_slot(
            &mut flash,
            layout.download_start,
            layout.swap_space_len,
            0xEE,
        );
        let original_app = flash
            .slice(layout.app_start, layout.swap_space_len as usize)
            .to_vec();

        for cycle in 0..5 {
            swap_slots(&mut flash, &layout, 0).unwrap();

            let in_app = flash.slice(layout.app_start, layout.swap_space_len as usize)
                == &original_app[..];
            let in_download = flash
                .slice(layout.download_start, layout.swap_space_len as usize)
                == &original_app[..];
            assert!(
                in_app ^ in_download,
                "cycle {cycle}: original APP image must live in exactly one slot"
            );
        }
    }
}

mod verify_tests {
    use super::*;

    fn stage_image(flash: &mut RamFlash, layout: &MemoryLayout, body: &[u8]) {
        let mut addr = layout.download_start;
        let mut offset = 0;
        while offset < body.len() {
            let mut page = [0u8; WRITE_ALIGN];
            let n = (body.len() - offset).min(WRITE_ALIGN);
            page[..n].copy_from_slice(&body[offset..offset + n]);
            flash.program(addr, &page).unwrap();
            addr += WRITE_ALIGN as u32;
            offset += n;
        }
    }

    #[test]
    fn test_verify_accepts_matching_digest() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 253) as u8).collect();
        stage_image(&mut flash, &layout, &body);

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&Sha256::digest(&body));

        assert!(verify_download(&flash, &layout, body.len() as u32, &digest));
    }

    #[test]
    fn test_verify_rejects_wrong_digest() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        let body = vec![0x5Au8; 1024];
        stage_image(&mut flash, &layout, &body);

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&Sha256::digest(&body));
        digest[0] ^= 0x01;

        assert!(!verify_download(&flash, &layout, body.len() as u32, &digest));
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let layout = test_layout();
        let mut flash = RamFlash::new();
        let body = vec![0x5Au8; 1024];
        stage_image(&mut flash, &layout, &body);

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&Sha256::digest(&body));

        assert!(!verify_download(&flash, &layout, 1023, &digest));
    }

    #[test]
    fn test_verify_rejects_length_past_slot() {
        let layout = test_layout();
        let flash = RamFlash::new();
        let digest = [0u8; DIGEST_SIZE];
        assert!(!verify_download(
            &flash,
            &layout,
            layout.swap_space_len + 1,
            &digest
        ));
    }
}

mod ota_tests {
    use super::*;
    use eb_hal::ResetInterface;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    struct PanicReset;

    impl ResetInterface for PanicReset {
        fn hard_reset(&mut self) -> ! {
            panic!("hard reset requested");
        }
    }

    #[test]
    fn test_staging_flow_records_size_and_digest() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();

        ota.initialize_download_slot().unwrap();

        let chunk = [0xA5u8; WRITE_ALIGN];
        ota.write_to_flash_aligned(&chunk, 0).unwrap();
        ota.write_to_flash_aligned(&chunk, WRITE_ALIGN as u32).unwrap();

        let digest = [0x42u8; DIGEST_SIZE];
        ota.mark_download_slot_valid(2 * WRITE_ALIGN as u32, &digest)
            .unwrap();

        assert_eq!(ota.store().swap_size(), 2 * WRITE_ALIGN as u32);
        assert_eq!(ota.store().digest(), digest);
    }

    #[test]
    fn test_write_rejects_misaligned_offset() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();
        let chunk = [0u8; WRITE_ALIGN];
        assert!(ota.write_to_flash_aligned(&chunk, 10).is_err());
    }

    #[test]
    fn test_write_rejects_overflow_past_slot() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();
        let chunk = [0u8; WRITE_ALIGN];
        assert!(ota
            .write_to_flash_aligned(&chunk, layout.swap_space_len)
            .is_err());
    }

    #[test]
    fn test_perform_update_arms_swap_then_resets() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();
        let mut reset = PanicReset;

        let result = catch_unwind(AssertUnwindSafe(|| ota.perform_update(&mut reset)));
        assert!(result.is_err(), "perform_update must reach the reset");

        assert!(ota.store().has_firmware_to_swap());
    }

    #[test]
    fn test_commit_clears_rollback_arm() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();

        // Simulate the state the bootloader leaves after Swap-and-arm
        let digest = [0u8; DIGEST_SIZE];
        ota.mark_download_slot_valid(1024, &digest).unwrap();

        ota.mark_should_not_rollback().unwrap();
        ota.mark_has_no_new_firmware().unwrap();

        assert!(!ota.store().should_rollback());
        assert!(!ota.store().has_new_firmware());
    }

    #[test]
    fn test_invalidate_clears_staged_record() {
        let layout = test_layout();
        let mut ota = OtaHandle::new(RamFlash::new(), layout).unwrap();
        ota.mark_download_slot_valid(4096, &[0x11; DIGEST_SIZE]).unwrap();

        ota.mark_download_slot_invalid().unwrap();

        assert!(!ota.store().has_firmware_to_swap());
        assert_eq!(ota.store().swap_size(), 0);
        assert_eq!(ota.store().digest(), [0; DIGEST_SIZE]);
    }
}
