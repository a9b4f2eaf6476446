// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Boot decision core
//!
//! On every reset the bootloader computes exactly one action from the
//! recovery trigger and the persisted flags:
//!
//! | trigger | `should_rollback` | `has_firmware_to_swap` | action      |
//! |---------|-------------------|------------------------|-------------|
//! | true    | —                 | —                      | Recovery    |
//! | false   | true              | —                      | Rollback    |
//! | false   | false             | true                   | SwapAndArm  |
//! | false   | false             | false                  | Passthrough |
//!
//! SwapAndArm re-arms `should_rollback`: unless the freshly installed
//! application confirms a healthy boot by committing, the next reset rolls
//! back. This gives A/B fail-over without any watchdog cooperation in the
//! bootloader itself.

use eb_common::config::{MemoryLayout, TriggerPolicy};
use eb_common::log::LogBuffer;
use eb_common::{log_error, log_info, Error, Result};
use eb_hal::{FlashInterface, GpioPin, TimerInterface};
use eb_update::metadata::{Flag, MetadataStore};
use eb_update::swap_slots;

/// The single action chosen at reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    /// Serve the recovery HTTP endpoint
    Recovery,
    /// Swap back to the previous image
    Rollback,
    /// Install the staged image and arm the rollback
    SwapAndArm,
    /// Fall through to the existing application
    Passthrough,
}

/// Map the trigger and persisted flags to a boot action
///
/// Total over all inputs; the table rows are evaluated top to bottom.
#[must_use]
pub const fn decide(
    recovery_trigger: bool,
    should_rollback: bool,
    has_firmware_to_swap: bool,
) -> BootAction {
    if recovery_trigger {
        BootAction::Recovery
    } else if should_rollback {
        BootAction::Rollback
    } else if has_firmware_to_swap {
        BootAction::SwapAndArm
    } else {
        BootAction::Passthrough
    }
}

/// Evaluate the recovery trigger under the configured policy
///
/// `pins_held` is the debounced state of the trigger inputs. Under
/// [`TriggerPolicy::ArmedUnion`] any unresolved armed-update flag also
/// forces recovery, turning every unconfirmed boot into a recovery
/// opportunity.
#[must_use]
pub fn evaluate_trigger<F: FlashInterface>(
    policy: TriggerPolicy,
    pins_held: bool,
    store: &MetadataStore<F>,
) -> bool {
    match policy {
        TriggerPolicy::GpioOnly => pins_held,
        TriggerPolicy::ArmedUnion => {
            pins_held
                || store.should_rollback()
                || store.has_firmware_to_swap()
                || store.has_new_firmware()
                || store.is_after_rollback()
        }
    }
}

/// Sample the two active-low trigger pins with a settle delay
///
/// Both samples must agree before recovery is entered; a pin that cannot
/// be read counts as not held.
pub fn sample_trigger_pins<A: GpioPin, B: GpioPin, T: TimerInterface>(
    pin_a: &A,
    pin_b: &B,
    timer: &T,
    settle_ms: u32,
) -> bool {
    let held = |a: &A, b: &B| {
        a.is_low().unwrap_or(false) || b.is_low().unwrap_or(false)
    };

    if !held(pin_a, pin_b) {
        return false;
    }
    timer.delay_ms(settle_ms);
    held(pin_a, pin_b)
}

/// Apply a non-recovery boot action: swap if needed, then persist the flag
/// transition in one record write
///
/// The swap precedes the flag write, as the flags describe the state the
/// slots are already in by the time any later reset observes them.
pub fn run_boot_transition<F: FlashInterface>(
    action: BootAction,
    store: &mut MetadataStore<F>,
    layout: &MemoryLayout,
    log: &mut LogBuffer,
    now_ms: u32,
) -> Result<()> {
    match action {
        BootAction::Rollback => {
            log_info!(log, now_ms, "boot", "rolling back to the previous firmware");
            let swap_size = store.swap_size();
            swap_slots(store.flash_mut(), layout, swap_size)?;
            store.update(|r| {
                r.set(Flag::ShouldRollback, false);
                r.set(Flag::HasNewFirmware, false);
                r.set(Flag::AfterRollback, true);
                r.set(Flag::HasFirmwareToSwap, false);
            })
        }
        BootAction::SwapAndArm => {
            log_info!(log, now_ms, "boot", "swapping in staged firmware, arming rollback");
            let swap_size = store.swap_size();
            swap_slots(store.flash_mut(), layout, swap_size)?;
            store.update(|r| {
                r.set(Flag::HasNewFirmware, true);
                r.set(Flag::AfterRollback, false);
                r.set(Flag::ShouldRollback, true);
                r.set(Flag::HasFirmwareToSwap, false);
            })
        }
        BootAction::Passthrough => {
            log_info!(log, now_ms, "boot", "nothing to swap, committing current firmware");
            store.update(|r| {
                r.set(Flag::ShouldRollback, false);
                r.set(Flag::HasNewFirmware, false);
                r.set(Flag::HasFirmwareToSwap, false);
            })
        }
        BootAction::Recovery => {
            // Recovery drives its own flow; reaching here is a logic error
            log_error!(log, now_ms, "boot", "recovery action in transition path");
            Err(Error::InvalidState)
        }
    }
}

/// Apply the post-recovery swap-and-commit transition
///
/// After a verified upload: swap the staged image in and clear every armed
/// flag — a recovered image is trusted without a confirmation boot.
pub fn run_swap_and_commit<F: FlashInterface>(
    store: &mut MetadataStore<F>,
    layout: &MemoryLayout,
    image_len: u32,
    log: &mut LogBuffer,
    now_ms: u32,
) -> Result<()> {
    log_info!(log, now_ms, "boot", "recovered image verified, swap and commit");
    swap_slots(store.flash_mut(), layout, image_len)?;
    store.update(|r| {
        r.set(Flag::ShouldRollback, false);
        r.set(Flag::HasNewFirmware, false);
        r.set(Flag::AfterRollback, false);
        r.set(Flag::HasFirmwareToSwap, false);
    })
}
