// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Emberboot Bootloader Library
//!
//! The decision-making half of the bootloader, kept as a library so the
//! state machine, recovery transport, and network bring-up are testable on
//! the host:
//!
//! - **Decision**: map persisted flags and the recovery trigger to exactly
//!   one boot action, and apply its metadata transition
//! - **Recovery**: single-connection HTTP server that stages an uploaded
//!   image into the DOWNLOAD slot
//! - **Netup**: MAC bring-up, DHCP with retries, static fallback
//! - **Handoff**: vector-table relocation and the jump into the application

#![no_std]
#![warn(missing_docs)]

pub mod decision;
pub mod handoff;
pub mod netup;
pub mod page;
pub mod recovery;

pub use decision::{decide, run_boot_transition, BootAction};
pub use recovery::{RecoveryServer, SessionOutcome};
