// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Armed-update metadata store
//!
//! The INFO sector holds a single record describing the armed-update state
//! machine shared between the bootloader and the running application:
//!
//! - `has_firmware_to_swap` — a staged image is waiting in DOWNLOAD
//! - `has_new_firmware` — the last swap installed a not-yet-committed image
//! - `after_rollback` — the running image is the result of a rollback
//! - `should_rollback` — the next boot rolls back unless the application
//!   commits first
//!
//! plus the staged image's byte count (`swap_size`) and its SHA-256 digest.
//!
//! Every mutation rewrites the whole record: read, modify in RAM, erase the
//! sector, program back. A record whose magic or CRC does not check out
//! (fresh device, interrupted write) reads as all-false defaults.

use core::ptr;
use eb_common::constants::{DIGEST_SIZE, WRITE_ALIGN};
use eb_common::{Error, Result};
use eb_hal::FlashInterface;

/// Metadata record magic number
pub const INFO_MAGIC: u32 = 0x4542_494E; // "EBIN"

/// Current record format version
const RECORD_VERSION: u16 = 1;

/// Flag byte value for "set"
const FLAG_SET: u8 = 1;

/// Flag byte value for "clear"
const FLAG_CLEAR: u8 = 0;

/// Persisted metadata record
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct InfoRecord {
    /// Magic number for validation
    pub magic: u32,
    /// Record format version
    pub version: u16,
    /// Reserved padding
    pub reserved: u16,
    /// A staged image in DOWNLOAD is ready to swap on the next boot
    pub has_firmware_to_swap: u8,
    /// The last swap installed a not-yet-committed image
    pub has_new_firmware: u8,
    /// The running image is the result of a rollback
    pub after_rollback: u8,
    /// Roll back on the next boot unless the application commits
    pub should_rollback: u8,
    /// Bytes from the low end of the slots participating in the next swap;
    /// 0 or larger than the slot means "whole slot"
    pub swap_size: u32,
    /// SHA-256 digest of the staged image, supplied by the uploader
    pub digest: [u8; DIGEST_SIZE],
    /// CRC-32 of all preceding bytes
    pub crc32: u32,
}

impl InfoRecord {
    /// Size of the serialized record
    pub const SIZE: usize = 52;

    /// Create the all-false default record
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            magic: INFO_MAGIC,
            version: RECORD_VERSION,
            reserved: 0,
            has_firmware_to_swap: FLAG_CLEAR,
            has_new_firmware: FLAG_CLEAR,
            after_rollback: FLAG_CLEAR,
            should_rollback: FLAG_CLEAR,
            swap_size: 0,
            digest: [0; DIGEST_SIZE],
            crc32: 0,
        }
    }

    /// Compute CRC-32 of the record excluding the CRC field
    fn compute_crc(&self) -> u32 {
        // SAFETY: `InfoRecord` is `#[repr(C, packed)]` with a known fixed
        // size (`Self::SIZE`). The slice covers the struct up to but not
        // including the trailing 4-byte CRC field. All fields are integral,
        // so every byte is initialised.
        let bytes = unsafe {
            core::slice::from_raw_parts(self as *const Self as *const u8, Self::SIZE - 4)
        };
        compute_crc32(bytes)
    }

    /// Read a flag
    #[must_use]
    pub fn get(&self, flag: Flag) -> bool {
        let byte = match flag {
            Flag::HasFirmwareToSwap => self.has_firmware_to_swap,
            Flag::HasNewFirmware => self.has_new_firmware,
            Flag::AfterRollback => self.after_rollback,
            Flag::ShouldRollback => self.should_rollback,
        };
        byte == FLAG_SET
    }

    /// Set or clear a flag
    pub fn set(&mut self, flag: Flag, value: bool) {
        let byte = if value { FLAG_SET } else { FLAG_CLEAR };
        match flag {
            Flag::HasFirmwareToSwap => self.has_firmware_to_swap = byte,
            Flag::HasNewFirmware => self.has_new_firmware = byte,
            Flag::AfterRollback => self.after_rollback = byte,
            Flag::ShouldRollback => self.should_rollback = byte,
        }
    }

    /// Validate magic, version, and CRC
    pub fn validate(&self) -> Result<()> {
        if self.magic != INFO_MAGIC || self.version != RECORD_VERSION {
            return Err(Error::MetadataCorrupted);
        }
        if self.crc32 != self.compute_crc() {
            return Err(Error::MetadataCorrupted);
        }
        Ok(())
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc32 = self.compute_crc();
    }
}

impl Default for InfoRecord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Metadata store over the INFO sector
///
/// Owns the flash handle and a cached copy of the record. All writes are
/// whole-record read-modify-erase-program; `update` batches several field
/// changes into a single erase cycle.
pub struct MetadataStore<F> {
    flash: F,
    info_start: u32,
    record: InfoRecord,
    loaded: bool,
}

impl<F: FlashInterface> MetadataStore<F> {
    /// Create a store over the INFO sector at `info_start`
    pub fn new(flash: F, info_start: u32) -> Self {
        Self {
            flash,
            info_start,
            record: InfoRecord::empty(),
            loaded: false,
        }
    }

    /// Borrow the flash handle for slot-level operations
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Borrow the flash handle immutably
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Consume the store and return the flash handle
    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Load and validate the record from flash
    ///
    /// A record that fails validation boots as the all-false defaults.
    pub fn load(&mut self) -> Result<()> {
        let mut buffer = [0u8; InfoRecord::SIZE];
        self.flash
            .read(self.info_start, &mut buffer)
            .map_err(Error::from)?;

        // SAFETY: `buffer` holds exactly `InfoRecord::SIZE` bytes read from
        // flash. `read_unaligned` is required because the struct is packed
        // and the buffer carries no alignment guarantee. Every bit pattern
        // is a valid value for the integral fields; semantic validity is
        // established by `validate()`.
        let record = unsafe { ptr::read_unaligned(buffer.as_ptr() as *const InfoRecord) };

        self.record = match record.validate() {
            Ok(()) => record,
            Err(_) => InfoRecord::empty(),
        };
        self.loaded = true;
        Ok(())
    }

    /// Persist the cached record
    pub fn save(&mut self) -> Result<()> {
        self.record.update_crc();

        // SAFETY: Serialises the packed record for programming. The pointer
        // is derived from `&self.record` and valid for `InfoRecord::SIZE`
        // bytes; all fields are integral so every byte is initialised.
        let bytes = unsafe {
            core::slice::from_raw_parts(
                &self.record as *const InfoRecord as *const u8,
                InfoRecord::SIZE,
            )
        };

        // Pad to the program granularity, leaving the tail erased
        let mut page = [0xFFu8; WRITE_ALIGN];
        page[..bytes.len()].copy_from_slice(bytes);

        self.flash
            .erase_sector(self.info_start)
            .map_err(Error::from)?;
        self.flash
            .program(self.info_start, &page)
            .map_err(Error::from)?;
        Ok(())
    }

    /// Apply a batched mutation and persist it in one erase cycle
    pub fn update(&mut self, f: impl FnOnce(&mut InfoRecord)) -> Result<()> {
        if !self.loaded {
            self.load()?;
        }
        f(&mut self.record);
        self.save()
    }

    /// The cached record
    #[must_use]
    pub fn record(&self) -> &InfoRecord {
        &self.record
    }

    /// A staged image is waiting to be swapped in
    #[must_use]
    pub fn has_firmware_to_swap(&self) -> bool {
        self.record.has_firmware_to_swap == FLAG_SET
    }

    /// The last swap installed a not-yet-committed image
    #[must_use]
    pub fn has_new_firmware(&self) -> bool {
        self.record.has_new_firmware == FLAG_SET
    }

    /// The running image is the result of a rollback
    #[must_use]
    pub fn is_after_rollback(&self) -> bool {
        self.record.after_rollback == FLAG_SET
    }

    /// The next boot should roll back
    #[must_use]
    pub fn should_rollback(&self) -> bool {
        self.record.should_rollback == FLAG_SET
    }

    /// Bytes participating in the next swap
    #[must_use]
    pub fn swap_size(&self) -> u32 {
        self.record.swap_size
    }

    /// Digest of the staged image
    #[must_use]
    pub fn digest(&self) -> [u8; DIGEST_SIZE] {
        self.record.digest
    }
}

/// Persisted boolean flags of the armed-update state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// A staged image is waiting in DOWNLOAD
    HasFirmwareToSwap,
    /// The last swap installed a not-yet-committed image
    HasNewFirmware,
    /// The running image is the result of a rollback
    AfterRollback,
    /// Roll back on the next boot
    ShouldRollback,
}

// ============================================================================
// CRC-32 Implementation
// ============================================================================

/// Compute CRC-32 (IEEE 802.3 polynomial)
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = generate_crc32_table();

    let mut crc = 0xFFFF_FFFFu32;

    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }

    !crc
}

/// Generate the CRC-32 lookup table at compile time
const fn generate_crc32_table() -> [u32; 256] {
    const POLYNOMIAL: u32 = 0xEDB8_8320;
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }

    table
}

// ============================================================================
// Tests
// ============================================================================
