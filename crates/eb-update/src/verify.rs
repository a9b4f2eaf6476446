// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Staged image integrity verification
//!
//! Computes SHA-256 over the staged image in the DOWNLOAD slot and compares
//! it against the digest the uploader stored in the INFO record. Integrity
//! only — authenticity is out of scope for this bootloader.

use eb_common::config::MemoryLayout;
use eb_common::constants::{DIGEST_SIZE, WRITE_ALIGN};
use eb_hal::FlashInterface;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of the first `length` bytes of DOWNLOAD
///
/// Returns `None` when `length` exceeds the slot or the flash read fails.
pub fn compute_download_digest<F: FlashInterface>(
    flash: &F,
    layout: &MemoryLayout,
    length: u32,
) -> Option<[u8; DIGEST_SIZE]> {
    if length > layout.swap_space_len {
        return None;
    }

    let mut hasher = Sha256::new();
    let mut chunk = [0u8; WRITE_ALIGN];
    let mut remaining = length as usize;
    let mut address = layout.download_start;

    while remaining > 0 {
        let n = remaining.min(chunk.len());
        flash.read(address, &mut chunk[..n]).ok()?;
        hasher.update(&chunk[..n]);
        address += n as u32;
        remaining -= n;
    }

    let mut digest = [0u8; DIGEST_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    Some(digest)
}

/// Verify the staged image against an expected digest
///
/// `true` only when the image hashes to exactly `expected`. Comparison is
/// constant time.
pub fn verify_download<F: FlashInterface>(
    flash: &F,
    layout: &MemoryLayout,
    length: u32,
    expected: &[u8; DIGEST_SIZE],
) -> bool {
    match compute_download_digest(flash, layout, length) {
        Some(actual) => constant_time_eq(&actual, expected),
        None => false,
    }
}

/// Constant-time equality of two byte slices
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_sha256_empty_input() {
        // SHA-256 of the empty string
        let expected = [
            0xE3, 0xB0, 0xC4, 0x42, 0x98, 0xFC, 0x1C, 0x14, 0x9A, 0xFB, 0xF4, 0xC8, 0x99, 0x6F,
            0xB9, 0x24, 0x27, 0xAE, 0x41, 0xE4, 0x64, 0x9B, 0x93, 0x4C, 0xA4, 0x95, 0x99, 0x1B,
            0x78, 0x52, 0xB8, 0x55,
        ];
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&Sha256::digest(b""));
        assert_eq!(digest, expected);
    }
}
