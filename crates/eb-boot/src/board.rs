// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Board support: bindings to the external network collaborators
//!
//! The W5500 SPI driver, its socket layer, and the DHCP client are vendor
//! C libraries linked into the final image. This module is the thin
//! interface the rest of the bootloader consumes them through — nothing
//! outside this file touches the vendor API.

use core::ffi::c_void;

use eb_common::constants::ETHERNET_BUF_SIZE;
use eb_hal::{
    BoardIdInterface, DhcpInterface, DhcpPoll, HalError, HalResult, MacInterface, NetConfig,
    TcpSocketInterface,
};

/// Wire format of the vendor driver's network configuration
#[repr(C)]
#[derive(Clone, Copy)]
struct WizNetInfo {
    mac: [u8; 6],
    ip: [u8; 4],
    sn: [u8; 4],
    gw: [u8; 4],
    dns: [u8; 4],
    dhcp: u8,
}

const NETINFO_STATIC: u8 = 1;

// ctlnetwork operations
const CN_GET_NETINFO: i32 = 1;

// Socket mode and status values
const SN_MR_TCP: u8 = 0x01;
const SOCK_CLOSED: u8 = 0x00;
const SOCK_CLOSE_WAIT: u8 = 0x1C;

// DHCP_run return values
const DHCP_RET_FAILED: u8 = 0;
const DHCP_RET_IP_LEASED: u8 = 4;

#[allow(non_snake_case)]
extern "C" {
    // W5500 SPI driver
    fn wizchip_spi_initialize();
    fn wizchip_reset();
    fn wizchip_initialize();
    fn wizchip_check();
    fn network_initialize(info: WizNetInfo);
    fn ctlnetwork(op: i32, arg: *mut c_void) -> i8;

    // Socket layer
    fn socket(sn: u8, protocol: u8, port: u16, flag: u8) -> i8;
    fn listen(sn: u8) -> i8;
    fn recv(sn: u8, buf: *mut u8, len: u16) -> i32;
    fn send(sn: u8, buf: *const u8, len: u16) -> i32;
    fn disconnect(sn: u8) -> i8;
    fn close(sn: u8) -> i8;
    fn getSn_RX_RSR(sn: u8) -> u16;
    fn getSn_SR(sn: u8) -> u8;

    // DHCP client
    fn DHCP_init(sn: u8, buf: *mut u8);
    fn DHCP_run() -> u8;
    fn DHCP_stop();
    fn getIPfromDHCP(ip: *mut u8);
    fn getGWfromDHCP(gw: *mut u8);
    fn getSNfromDHCP(sn: *mut u8);
    fn getDNSfromDHCP(dns: *mut u8);

    // Pico SDK
    fn flash_get_unique_id(id_out: *mut u8);
}

// DHCP lease/receive scratch, handed to the vendor client at init.
// Single-threaded bootloader: only one DHCP session ever runs.
static mut DHCP_BUF: [u8; ETHERNET_BUF_SIZE] = [0; ETHERNET_BUF_SIZE];

/// W5500 Ethernet MAC
pub struct W5500Mac {
    info: WizNetInfo,
}

impl W5500Mac {
    /// Create an uninitialized MAC handle
    #[must_use]
    pub const fn new() -> Self {
        Self {
            info: WizNetInfo {
                mac: [0; 6],
                ip: [0; 4],
                sn: [0; 4],
                gw: [0; 4],
                dns: [0; 4],
                dhcp: NETINFO_STATIC,
            },
        }
    }
}

impl MacInterface for W5500Mac {
    fn init(&mut self) -> HalResult<()> {
        // SAFETY: Vendor driver init sequence; must run once before any
        // socket use. wizchip_initialize blocks until the PHY link is up.
        unsafe {
            wizchip_spi_initialize();
            wizchip_reset();
            wizchip_initialize();
            wizchip_check();
        }
        Ok(())
    }

    fn set_mac_address(&mut self, mac: &[u8; 6]) -> HalResult<()> {
        self.info.mac = *mac;
        // SAFETY: Writes the cached configuration, including the hardware
        // address, into the controller. Required before DHCP discovery.
        unsafe {
            network_initialize(self.info);
        }
        Ok(())
    }

    fn apply_config(&mut self, config: &NetConfig) -> HalResult<()> {
        self.info = WizNetInfo {
            mac: config.mac,
            ip: config.ip,
            sn: config.subnet,
            gw: config.gateway,
            dns: config.dns,
            dhcp: NETINFO_STATIC,
        };
        // SAFETY: Pushes the full configuration into the controller.
        unsafe {
            network_initialize(self.info);
        }
        Ok(())
    }

    fn current_config(&self) -> HalResult<NetConfig> {
        let mut info = self.info;
        // SAFETY: CN_GET_NETINFO fills a caller-provided wiz_NetInfo; the
        // pointer is valid for the duration of the call.
        let rc = unsafe { ctlnetwork(CN_GET_NETINFO, &mut info as *mut WizNetInfo as *mut c_void) };
        if rc < 0 {
            return Err(HalError::SpiError);
        }
        Ok(NetConfig {
            mac: info.mac,
            ip: info.ip,
            subnet: info.sn,
            gateway: info.gw,
            dns: info.dns,
        })
    }
}

/// One hardware socket of the W5500
pub struct W5500Socket {
    sn: u8,
}

impl W5500Socket {
    /// Bind to the given hardware socket index
    #[must_use]
    pub const fn new(sn: u8) -> Self {
        Self { sn }
    }
}

impl TcpSocketInterface for W5500Socket {
    fn open(&mut self, port: u16) -> HalResult<()> {
        // SAFETY: Vendor socket call on a valid socket index.
        let rc = unsafe { socket(self.sn, SN_MR_TCP, port, 0) };
        if rc == self.sn as i8 {
            Ok(())
        } else {
            Err(HalError::SocketError)
        }
    }

    fn listen(&mut self) -> HalResult<()> {
        // SAFETY: Vendor socket call on an opened socket.
        let rc = unsafe { listen(self.sn) };
        if rc == 1 {
            Ok(())
        } else {
            Err(HalError::SocketError)
        }
    }

    fn rx_available(&self) -> usize {
        // SAFETY: Read-only query of the socket receive size register.
        unsafe { getSn_RX_RSR(self.sn) as usize }
    }

    fn is_closed(&self) -> bool {
        // SAFETY: Read-only query of the socket status register.
        let status = unsafe { getSn_SR(self.sn) };
        status == SOCK_CLOSED || status == SOCK_CLOSE_WAIT
    }

    fn recv(&mut self, buffer: &mut [u8]) -> HalResult<usize> {
        let len = self.rx_available().min(buffer.len());
        if len == 0 {
            return Ok(0);
        }
        // SAFETY: `buffer` is valid for `len` bytes; the driver copies at
        // most `len` bytes out of the socket buffer.
        let rc = unsafe { recv(self.sn, buffer.as_mut_ptr(), len as u16) };
        if rc < 0 {
            Err(HalError::SocketError)
        } else {
            Ok(rc as usize)
        }
    }

    fn send(&mut self, data: &[u8]) -> HalResult<()> {
        let mut offset = 0;
        while offset < data.len() {
            let chunk = (data.len() - offset).min(u16::MAX as usize);
            // SAFETY: The slice is valid for `chunk` bytes from `offset`.
            let rc = unsafe { send(self.sn, data[offset..].as_ptr(), chunk as u16) };
            if rc <= 0 {
                return Err(HalError::SocketError);
            }
            offset += rc as usize;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        // SAFETY: Initiates the TCP FIN handshake on this socket.
        unsafe {
            disconnect(self.sn);
        }
    }

    fn close(&mut self) {
        // SAFETY: Forces the socket back to CLOSED.
        unsafe {
            close(self.sn);
        }
    }
}

/// Vendor DHCP client
pub struct WizDhcp {
    leased: bool,
}

impl WizDhcp {
    /// Create a DHCP client handle
    #[must_use]
    pub const fn new() -> Self {
        Self { leased: false }
    }
}

impl DhcpInterface for WizDhcp {
    fn start(&mut self, socket: u8) -> HalResult<()> {
        self.leased = false;
        // SAFETY: Hands the static scratch buffer to the client. The
        // bootloader is single-threaded and runs one DHCP session at a
        // time, so the buffer is never aliased.
        unsafe {
            DHCP_init(socket, core::ptr::addr_of_mut!(DHCP_BUF) as *mut u8);
        }
        Ok(())
    }

    fn poll(&mut self) -> DhcpPoll {
        // SAFETY: Drives the vendor client state machine.
        let state = unsafe { DHCP_run() };
        match state {
            DHCP_RET_IP_LEASED => {
                self.leased = true;
                DhcpPoll::Leased
            }
            DHCP_RET_FAILED => DhcpPoll::Failed,
            _ => DhcpPoll::Pending,
        }
    }

    fn stop(&mut self) {
        // SAFETY: Releases the socket the client was using.
        unsafe {
            DHCP_stop();
        }
    }

    fn leased_config(&self) -> Option<NetConfig> {
        if !self.leased {
            return None;
        }
        let mut config = NetConfig::EMPTY;
        // SAFETY: Each getter fills a 4-byte caller buffer with the leased
        // parameters; only called after DHCP_run reported a lease.
        unsafe {
            getIPfromDHCP(config.ip.as_mut_ptr());
            getGWfromDHCP(config.gateway.as_mut_ptr());
            getSNfromDHCP(config.subnet.as_mut_ptr());
            getDNSfromDHCP(config.dns.as_mut_ptr());
        }
        Some(config)
    }
}

/// Unique board identity from the QSPI flash device
pub struct PicoBoardId;

impl BoardIdInterface for PicoBoardId {
    fn read_unique_id(&self) -> HalResult<[u8; 8]> {
        let mut id = [0u8; 8];
        // SAFETY: The SDK routine fills exactly 8 bytes; it performs its
        // own XIP-safe flash command sequence.
        unsafe {
            flash_get_unique_id(id.as_mut_ptr());
        }
        Ok(id)
    }
}
