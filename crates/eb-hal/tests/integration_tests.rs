// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Integration tests for eb-hal
//!
//! Exercises the trait provided methods and error conversions on the host
//! using a RAM-backed flash mock.

use eb_hal::{FlashInterface, GpioPin, HalError, HalResult, NetConfig, Platform};

const SECTOR: usize = 4096;
const ALIGN: usize = 256;
const FLASH_LEN: usize = 8 * SECTOR;
const BASE: u32 = 0x1000_0000;

/// RAM-backed flash with erase/program semantics
struct RamFlash {
    memory: Vec<u8>,
    critical_depth: u32,
    max_critical_depth: u32,
}

impl RamFlash {
    fn new() -> Self {
        Self {
            memory: vec![0xFF; FLASH_LEN],
            critical_depth: 0,
            max_critical_depth: 0,
        }
    }

    fn offset(address: u32, len: usize) -> HalResult<usize> {
        let offset = address.checked_sub(BASE).ok_or(HalError::FlashOutOfBounds)? as usize;
        if offset + len > FLASH_LEN {
            return Err(HalError::FlashOutOfBounds);
        }
        Ok(offset)
    }
}

impl FlashInterface for RamFlash {
    const SECTOR_SIZE: usize = SECTOR;
    const WRITE_ALIGN: usize = ALIGN;

    fn read(&self, address: u32, buffer: &mut [u8]) -> HalResult<()> {
        let offset = Self::offset(address, buffer.len())?;
        buffer.copy_from_slice(&self.memory[offset..offset + buffer.len()]);
        Ok(())
    }

    fn erase_sector(&mut self, address: u32) -> HalResult<()> {
        if address % SECTOR as u32 != 0 {
            return Err(HalError::FlashAlignment);
        }
        let offset = Self::offset(address, SECTOR)?;
        self.memory[offset..offset + SECTOR].fill(0xFF);
        Ok(())
    }

    fn program(&mut self, address: u32, data: &[u8]) -> HalResult<()> {
        if address % ALIGN as u32 != 0 || data.len() % ALIGN != 0 {
            return Err(HalError::FlashAlignment);
        }
        let offset = Self::offset(address, data.len())?;
        // NOR semantics: programming can only clear bits
        for (dst, src) in self.memory[offset..offset + data.len()].iter_mut().zip(data) {
            *dst &= *src;
        }
        Ok(())
    }

    fn with_flash_critical<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.critical_depth += 1;
        self.max_critical_depth = self.max_critical_depth.max(self.critical_depth);
        let result = f(self);
        self.critical_depth -= 1;
        result
    }
}

mod flash_trait_tests {
    use super::*;

    #[test]
    fn test_erase_range_covers_all_sectors() {
        let mut flash = RamFlash::new();
        let page = vec![0u8; ALIGN];
        for sector in 0..3 {
            flash
                .program(BASE + (sector * SECTOR) as u32, &page)
                .unwrap();
        }

        flash.erase_range(BASE, BASE + 3 * SECTOR as u32).unwrap();

        let mut buf = vec![0u8; 3 * SECTOR];
        flash.read(BASE, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_verify_matches_programmed_data() {
        let mut flash = RamFlash::new();
        let data: Vec<u8> = (0..ALIGN * 3).map(|i| (i % 251) as u8).collect();
        flash.program(BASE, &data).unwrap();

        assert!(flash.verify(BASE, &data).unwrap());

        let mut wrong = data.clone();
        wrong[ALIGN + 7] ^= 0xFF;
        assert!(!flash.verify(BASE, &wrong).unwrap());
    }

    #[test]
    fn test_verify_handles_lengths_beyond_one_chunk() {
        let mut flash = RamFlash::new();
        // 5 * 256 bytes spans multiple internal verify chunks
        let data = vec![0xA5u8; ALIGN * 5];
        flash.program(BASE + SECTOR as u32, &data).unwrap();
        assert!(flash.verify(BASE + SECTOR as u32, &data).unwrap());
    }

    #[test]
    fn test_with_flash_critical_nests() {
        let mut flash = RamFlash::new();
        flash.with_flash_critical(|f| {
            f.with_flash_critical(|f| {
                f.erase_sector(BASE).unwrap();
            });
        });
        assert_eq!(flash.max_critical_depth, 2);
        assert_eq!(flash.critical_depth, 0);
    }

    #[test]
    fn test_program_rejects_misalignment() {
        let mut flash = RamFlash::new();
        let data = vec![0u8; ALIGN];
        assert_eq!(
            flash.program(BASE + 17, &data),
            Err(HalError::FlashAlignment)
        );
        assert_eq!(
            flash.program(BASE, &data[..100]),
            Err(HalError::FlashAlignment)
        );
    }

    #[test]
    fn test_out_of_bounds_read_rejected() {
        let flash = RamFlash::new();
        let mut buf = [0u8; 16];
        assert_eq!(
            flash.read(BASE + FLASH_LEN as u32, &mut buf),
            Err(HalError::FlashOutOfBounds)
        );
    }
}

mod gpio_trait_tests {
    use super::*;

    struct FixedPin(bool);

    impl GpioPin for FixedPin {
        fn is_high(&self) -> HalResult<bool> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_is_low_is_inverse_of_is_high() {
        assert!(FixedPin(false).is_low().unwrap());
        assert!(!FixedPin(true).is_low().unwrap());
    }
}

mod error_tests {
    use super::*;
    use eb_common::Error;

    #[test]
    fn test_hal_errors_map_to_common_errors() {
        assert_eq!(Error::from(HalError::FlashEraseFailed), Error::EraseFailed);
        assert_eq!(Error::from(HalError::FlashWriteFailed), Error::ProgramFailed);
        assert_eq!(Error::from(HalError::FlashOutOfBounds), Error::OutOfBounds);
        assert_eq!(Error::from(HalError::FlashAlignment), Error::AlignmentError);
        assert_eq!(Error::from(HalError::SocketError), Error::SocketError);
        assert_eq!(Error::from(HalError::InitFailed), Error::HardwareInitFailed);
    }

    #[test]
    fn test_hal_error_codes_in_hal_category() {
        assert_eq!(HalError::FlashError.code() >> 8, 0x05);
        assert_eq!(HalError::Timeout.code() >> 8, 0x05);
    }
}

mod platform_tests {
    use super::*;

    #[test]
    fn test_host_platform_is_unknown() {
        assert_eq!(Platform::current(), Platform::Unknown);
        assert_eq!(Platform::current().flash_base(), 0);
    }

    #[test]
    fn test_empty_net_config_is_zeroed() {
        let config = NetConfig::EMPTY;
        assert_eq!(config.mac, [0; 6]);
        assert_eq!(config.ip, [0; 4]);
    }
}
