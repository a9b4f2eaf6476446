// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Emberboot entry point
//!
//! Runs on every reset, before the application. Consults the persisted
//! metadata and the recovery trigger pins, performs exactly one of
//! {recovery, rollback, swap-and-arm, passthrough}, and hands off to the
//! application slot.

#![no_std]
#![no_main]

mod board;

use board::{PicoBoardId, W5500Mac, W5500Socket, WizDhcp};
use eb_boot::decision::{
    decide, evaluate_trigger, run_boot_transition, run_swap_and_commit, sample_trigger_pins,
    BootAction,
};
use eb_boot::handoff::{jump_to_application, vector_table_is_plausible};
use eb_boot::netup::bring_up;
use eb_boot::recovery::{RecoveryServer, SessionOutcome};
use eb_common::config::{BootConfig, MemoryLayout};
use eb_common::constants::RESERVED_SOCKET;
use eb_common::log::LogBuffer;
use eb_common::{log_error, log_info, log_warn};
use eb_hal::rp2040::{Rp2040Flash, Rp2040Reset, Rp2040TriggerPin, Rp2040Timer};
use eb_hal::{ResetInterface, TimerInterface};
use eb_update::metadata::MetadataStore;

/// Recovery trigger inputs, active low
const TRIGGER_PIN_A: u8 = 0;
const TRIGGER_PIN_B: u8 = 8;

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // A panicking bootloader cannot safely continue; reset and let the
    // next boot (or the recovery trigger) take over.
    Rp2040Reset::new().hard_reset()
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    let layout = MemoryLayout::RP2040;
    let config = BootConfig::DEFAULT;
    let timer = Rp2040Timer::new();
    let mut log = LogBuffer::new();

    timer.delay_ms(10);

    let pin_a = Rp2040TriggerPin::new(TRIGGER_PIN_A);
    let pin_b = Rp2040TriggerPin::new(TRIGGER_PIN_B);
    let pins_held = sample_trigger_pins(&pin_a, &pin_b, &timer, config.trigger_settle_ms);

    let mut flash = Rp2040Flash::new();
    if flash.init().is_err() {
        log_error!(log, timer.get_millis(), "boot", "flash init failed");
    }

    let mut store = MetadataStore::new(flash, layout.info_start);
    if store.load().is_err() {
        log_warn!(log, timer.get_millis(), "boot", "metadata unreadable, using defaults");
    }

    let trigger = evaluate_trigger(config.trigger_policy, pins_held, &store);
    let action = decide(trigger, store.should_rollback(), store.has_firmware_to_swap());
    log_info!(log, timer.get_millis(), "boot", "action {:?}", action);

    match action {
        BootAction::Recovery => run_recovery(&mut store, &layout, &config, &timer, &mut log),
        _ => {
            if let Err(error) = run_boot_transition(action, &mut store, &layout, &mut log, timer.get_millis()) {
                log_error!(log, timer.get_millis(), "boot", "transition failed: {}", error);
                // Prefer passthrough while the application looks intact;
                // otherwise the recovery path is the only way forward.
                if !vector_table_is_plausible(store.flash(), &layout) {
                    run_recovery(&mut store, &layout, &config, &timer, &mut log);
                }
            }
        }
    }

    log_info!(log, timer.get_millis(), "boot", "handing off to the application");
    jump_to_application(&layout)
}

/// Serve recovery connections until an image is swapped in or a reboot is
/// requested
fn run_recovery(
    store: &mut MetadataStore<Rp2040Flash>,
    layout: &MemoryLayout,
    config: &BootConfig,
    timer: &Rp2040Timer,
    log: &mut LogBuffer,
) {
    let mut reset = Rp2040Reset::new();
    let mut mac = W5500Mac::new();
    let mut dhcp = WizDhcp::new();
    let board_id = PicoBoardId;

    // Keep trying bring-up until the network is reachable; a reset (or the
    // recovery trigger on the next boot) breaks the loop.
    while bring_up(&mut mac, &mut dhcp, timer, &board_id, config, log).is_err() {
        log_warn!(log, timer.get_millis(), "net", "bring-up failed, retrying");
        timer.delay_ms(1000);
    }

    let mut socket = W5500Socket::new(RESERVED_SOCKET);
    loop {
        let mut server = RecoveryServer::new(&mut socket, timer, *config, *layout);
        match server.serve_connection(store, log) {
            Ok(SessionOutcome::RebootRequested) => reset.hard_reset(),
            Ok(SessionOutcome::UploadVerified { image_len }) => {
                match run_swap_and_commit(store, layout, image_len, log, timer.get_millis()) {
                    Ok(()) => return,
                    Err(error) => {
                        log_error!(
                            log,
                            timer.get_millis(),
                            "boot",
                            "swap and commit failed: {}",
                            error
                        );
                        // The slots may be half-exchanged; stay in
                        // recovery for a fresh upload.
                    }
                }
            }
            Ok(_) => {}
            Err(error) => {
                log_error!(log, timer.get_millis(), "recovery", "session error: {}", error);
            }
        }
    }
}
