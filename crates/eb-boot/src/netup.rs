// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Network bring-up
//!
//! Initializes the external Ethernet MAC, derives the hardware address
//! from the board's unique ID, and attempts DHCP with bounded retries
//! before falling back to a static configuration. The observable output is
//! the effective IPv4 configuration the recovery server is reachable at.

use eb_common::config::BootConfig;
use eb_common::constants::{
    FALLBACK_DNS, FALLBACK_GATEWAY, FALLBACK_IP, FALLBACK_SUBNET, MAC_OUI, RESERVED_SOCKET,
};
use eb_common::log::LogBuffer;
use eb_common::{log_info, log_warn, Error, Result};
use eb_hal::{BoardIdInterface, DhcpInterface, DhcpPoll, MacInterface, NetConfig, TimerInterface};

/// Derive the hardware address from the unique board ID
///
/// Fixed three-byte OUI concatenated with the last three bytes of the
/// 8-byte unique ID, so every board gets a stable, distinct address.
#[must_use]
pub fn derive_mac(unique_id: &[u8; 8]) -> [u8; 6] {
    [
        MAC_OUI[0],
        MAC_OUI[1],
        MAC_OUI[2],
        unique_id[5],
        unique_id[6],
        unique_id[7],
    ]
}

/// The static configuration used when DHCP fails
#[must_use]
pub fn static_fallback(mac: [u8; 6]) -> NetConfig {
    NetConfig {
        mac,
        ip: FALLBACK_IP,
        subnet: FALLBACK_SUBNET,
        gateway: FALLBACK_GATEWAY,
        dns: FALLBACK_DNS,
    }
}

/// Bring the network up and return the effective configuration
///
/// DHCP runs on the reserved socket for up to `dhcp_attempts` rounds of
/// `dhcp_polls_per_attempt` polls each; total failure selects the static
/// fallback.
pub fn bring_up<M, D, T, B>(
    mac_if: &mut M,
    dhcp: &mut D,
    timer: &T,
    board: &B,
    config: &BootConfig,
    log: &mut LogBuffer,
) -> Result<NetConfig>
where
    M: MacInterface,
    D: DhcpInterface,
    T: TimerInterface,
    B: BoardIdInterface,
{
    mac_if.init().map_err(|_| Error::MacInitFailed)?;

    let unique_id = board.read_unique_id().unwrap_or_else(|_| {
        log_warn!(log, timer.get_millis(), "net", "unique ID unavailable, using zeros");
        [0; 8]
    });
    let mac = derive_mac(&unique_id);
    mac_if.set_mac_address(&mac).map_err(Error::from)?;
    log_info!(
        log,
        timer.get_millis(),
        "net",
        "MAC {:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0],
        mac[1],
        mac[2],
        mac[3],
        mac[4],
        mac[5]
    );

    let mut leased = false;
    for attempt in 0..config.dhcp_attempts {
        log_info!(log, timer.get_millis(), "net", "DHCP attempt {}", attempt + 1);
        if dhcp.start(RESERVED_SOCKET).is_err() {
            break;
        }

        let mut polls = 0;
        while polls < config.dhcp_polls_per_attempt {
            match dhcp.poll() {
                DhcpPoll::Leased => {
                    leased = true;
                    break;
                }
                DhcpPoll::Failed => break,
                DhcpPoll::Pending => {
                    timer.delay_ms(config.dhcp_poll_interval_ms);
                    polls += 1;
                }
            }
        }

        dhcp.stop();
        if leased {
            break;
        }
    }

    if leased {
        if let Some(mut lease) = dhcp.leased_config() {
            lease.mac = mac;
            mac_if.apply_config(&lease).map_err(Error::from)?;
        }
    } else {
        log_warn!(
            log,
            timer.get_millis(),
            "net",
            "{}, using static fallback",
            Error::DhcpTimeout
        );
        mac_if
            .apply_config(&static_fallback(mac))
            .map_err(Error::from)?;
    }

    let effective = mac_if.current_config().map_err(Error::from)?;
    log_info!(
        log,
        timer.get_millis(),
        "net",
        "IP {}.{}.{}.{}",
        effective.ip[0],
        effective.ip[1],
        effective.ip[2],
        effective.ip[3]
    );
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_derivation_uses_id_tail() {
        let id = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];
        assert_eq!(derive_mac(&id), [0x00, 0x08, 0xDC, 0x60, 0x70, 0x80]);
    }

    #[test]
    fn test_static_fallback_address() {
        let config = static_fallback([0; 6]);
        assert_eq!(config.ip, [192, 168, 0, 100]);
        assert_eq!(config.subnet, [255, 255, 255, 0]);
        assert_eq!(config.gateway, [192, 168, 0, 1]);
    }
}
