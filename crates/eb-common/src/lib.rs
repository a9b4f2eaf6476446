// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Emberboot Common Library
//!
//! Shared types for the Emberboot firmware-update bootloader:
//! error definitions, the boot log, memory layout, and configuration.
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for embedded debugging
//!
//! No heap allocations are performed — all buffers are fixed-size arrays or
//! heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod errors;
pub mod log;

// Re-export commonly used items
pub use config::{BootConfig, MemoryLayout, TriggerPolicy};
pub use errors::{Error, Result};
