// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! HAL trait definitions
//!
//! Platform-agnostic interfaces for the hardware the bootloader touches.
//! The Ethernet MAC, socket, and DHCP traits model the external SPI
//! Ethernet collaborator; the bootloader never calls the vendor driver
//! directly.

use crate::error::HalResult;

/// Block-device facade over the flash controller
///
/// `erase_sector` requires sector alignment; `program` requires the address
/// and length to be multiples of [`Self::WRITE_ALIGN`] and the target
/// sector to have been erased first. Erase and program execute with
/// interrupts disabled and XIP quiesced; implementations keep those code
/// paths resident in RAM.
pub trait FlashInterface {
    /// Erase sector size in bytes
    const SECTOR_SIZE: usize;

    /// Program alignment in bytes
    const WRITE_ALIGN: usize;

    /// Read data from flash
    ///
    /// # Arguments
    /// * `address` - Absolute flash address
    /// * `buffer` - Buffer to read into
    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()>;

    /// Erase the sector at `address` (sector-aligned)
    fn erase_sector(&mut self, address: u32) -> HalResult<()>;

    /// Program previously erased flash
    ///
    /// # Arguments
    /// * `address` - Absolute flash address, `WRITE_ALIGN`-aligned
    /// * `data` - Data to write; length must be a `WRITE_ALIGN` multiple
    fn program(&mut self, address: u32, data: &[u8]) -> HalResult<()>;

    /// Erase a range of sectors
    ///
    /// # Arguments
    /// * `start` - Start address (sector-aligned)
    /// * `end` - End address (exclusive)
    fn erase_range(&mut self, start: u32, end: u32) -> HalResult<()> {
        let mut addr = start;
        while addr < end {
            self.erase_sector(addr)?;
            addr += Self::SECTOR_SIZE as u32;
        }
        Ok(())
    }

    /// Verify flash contents match expected data
    fn verify(&self, address: u32, expected: &[u8]) -> HalResult<bool> {
        let mut buffer = [0u8; 256];
        let mut offset = 0;

        while offset < expected.len() {
            let chunk_size = (expected.len() - offset).min(buffer.len());
            self.read(address + offset as u32, &mut buffer[..chunk_size])?;

            if buffer[..chunk_size] != expected[offset..offset + chunk_size] {
                return Ok(false);
            }
            offset += chunk_size;
        }

        Ok(true)
    }

    /// Run `f` inside a flash critical section
    ///
    /// The interrupt mask is saved, interrupts are disabled, and the mask is
    /// restored on every exit path. The provided implementation runs `f`
    /// directly; hardware drivers override it.
    fn with_flash_critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        f(self)
    }
}

/// GPIO input pin
pub trait GpioPin {
    /// Read pin state
    fn is_high(&self) -> HalResult<bool>;

    /// Check whether the pin is held low
    fn is_low(&self) -> HalResult<bool> {
        self.is_high().map(|high| !high)
    }
}

/// Timer interface
pub trait TimerInterface {
    /// Get elapsed milliseconds since reset
    fn get_millis(&self) -> u32;

    /// Delay for the given number of milliseconds
    fn delay_ms(&self, ms: u32);
}

/// Reset interface
pub trait ResetInterface {
    /// Perform an immediate hardware reset
    fn hard_reset(&mut self) -> !;
}

/// Board identity interface
pub trait BoardIdInterface {
    /// Read the board's unique hardware identifier
    fn read_unique_id(&self) -> HalResult<[u8; 8]>;
}

/// IPv4 network configuration of the Ethernet MAC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetConfig {
    /// Hardware (MAC) address
    pub mac: [u8; 6],
    /// IPv4 address
    pub ip: [u8; 4],
    /// Subnet mask
    pub subnet: [u8; 4],
    /// Default gateway
    pub gateway: [u8; 4],
    /// DNS server
    pub dns: [u8; 4],
}

impl NetConfig {
    /// All-zero configuration
    pub const EMPTY: Self = Self {
        mac: [0; 6],
        ip: [0; 4],
        subnet: [0; 4],
        gateway: [0; 4],
        dns: [0; 4],
    };
}

/// External Ethernet MAC collaborator
pub trait MacInterface {
    /// Reset and initialize the controller, waiting for the PHY link
    fn init(&mut self) -> HalResult<()>;

    /// Program the hardware address
    fn set_mac_address(&mut self, mac: &[u8; 6]) -> HalResult<()>;

    /// Apply a full network configuration
    fn apply_config(&mut self, config: &NetConfig) -> HalResult<()>;

    /// Read back the active network configuration
    fn current_config(&self) -> HalResult<NetConfig>;
}

/// Single TCP socket of the Ethernet MAC
///
/// Models one hardware socket: open in listen mode, poll for received
/// bytes, read them out in bounded chunks, and tear the connection down.
pub trait TcpSocketInterface {
    /// Open the socket in TCP mode on the given local port
    fn open(&mut self, port: u16) -> HalResult<()>;

    /// Start listening for a connection
    fn listen(&mut self) -> HalResult<()>;

    /// Number of received bytes waiting in the socket buffer
    fn rx_available(&self) -> usize;

    /// Whether the connection has been torn down by the peer
    fn is_closed(&self) -> bool;

    /// Receive up to `buffer.len()` bytes; returns the number read
    fn recv(&mut self, buffer: &mut [u8]) -> HalResult<usize>;

    /// Send all of `data`
    fn send(&mut self, data: &[u8]) -> HalResult<()>;

    /// Initiate an orderly disconnect
    fn disconnect(&mut self);

    /// Close the socket unconditionally
    fn close(&mut self);
}

/// DHCP poll outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpPoll {
    /// Negotiation still in progress
    Pending,
    /// A lease has been obtained
    Leased,
    /// Negotiation failed; restart or fall back
    Failed,
}

/// External DHCP client collaborator
pub trait DhcpInterface {
    /// Begin negotiation on the given socket index
    fn start(&mut self, socket: u8) -> HalResult<()>;

    /// Drive the client state machine one step
    fn poll(&mut self) -> DhcpPoll;

    /// Stop the client and release the socket
    fn stop(&mut self);

    /// The leased configuration, if negotiation succeeded
    fn leased_config(&self) -> Option<NetConfig>;
}
