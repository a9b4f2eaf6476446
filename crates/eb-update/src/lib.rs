// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Emberboot Update Library
//!
//! Firmware update primitives shared by the bootloader and the running
//! application:
//!
//! - **Metadata**: the persisted armed-update record in the INFO sector
//! - **Swap**: sector-granular exchange of the APP and DOWNLOAD slots
//! - **Verify**: SHA-256 integrity check of the staged image
//! - **OTA**: the thin interface the application uses to stage an update
//!   and hand control to the bootloader

#![no_std]
#![warn(missing_docs)]

pub mod metadata;
pub mod ota;
pub mod swap;
pub mod verify;

pub use metadata::{InfoRecord, MetadataStore};
pub use ota::OtaHandle;
pub use swap::{swap_sector_count, swap_slots};
pub use verify::{compute_download_digest, verify_download};
