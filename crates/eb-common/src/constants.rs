// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! System-wide constants for Emberboot

/// Minimum erase granularity of the block device (bytes)
pub const SECTOR_SIZE: usize = 4096;

/// Minimum program granularity of the block device (bytes)
pub const WRITE_ALIGN: usize = 256;

/// SHA-256 digest size (bytes)
pub const DIGEST_SIZE: usize = 32;

/// Ethernet receive buffer size (bytes)
pub const ETHERNET_BUF_SIZE: usize = 2048;

/// TCP port the recovery server listens on
pub const RECOVERY_HTTP_PORT: u16 = 80;

/// Socket index reserved for DHCP and the recovery listener
pub const RESERVED_SOCKET: u8 = 1;

/// Organizationally unique identifier prefix of the derived MAC address
pub const MAC_OUI: [u8; 3] = [0x00, 0x08, 0xDC];

/// Static fallback IPv4 address used when DHCP fails
pub const FALLBACK_IP: [u8; 4] = [192, 168, 0, 100];

/// Static fallback subnet mask
pub const FALLBACK_SUBNET: [u8; 4] = [255, 255, 255, 0];

/// Static fallback gateway
pub const FALLBACK_GATEWAY: [u8; 4] = [192, 168, 0, 1];

/// Static fallback DNS server
pub const FALLBACK_DNS: [u8; 4] = [8, 8, 8, 8];
