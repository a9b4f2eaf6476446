// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Hardware not initialized
    NotInitialized,
    /// Hardware initialization failed
    InitFailed,
    /// Flash operation failed
    FlashError,
    /// Flash address out of bounds
    FlashOutOfBounds,
    /// Flash address or length misaligned
    FlashAlignment,
    /// Flash erase failed
    FlashEraseFailed,
    /// Flash write failed
    FlashWriteFailed,
    /// Flash verify failed
    FlashVerifyFailed,
    /// GPIO error
    GpioError,
    /// Timer error
    TimerError,
    /// SPI communication error
    SpiError,
    /// Socket operation failed
    SocketError,
    /// Invalid parameter
    InvalidParameter,
    /// Operation timeout
    Timeout,
    /// Hardware busy
    Busy,
    /// Operation not supported on this platform
    NotSupported,
    /// Invalid state for operation
    InvalidState,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => 0x0501,
            Self::InitFailed => 0x0502,
            Self::FlashError => 0x0510,
            Self::FlashOutOfBounds => 0x0511,
            Self::FlashAlignment => 0x0512,
            Self::FlashEraseFailed => 0x0513,
            Self::FlashWriteFailed => 0x0514,
            Self::FlashVerifyFailed => 0x0515,
            Self::GpioError => 0x0520,
            Self::TimerError => 0x0530,
            Self::SpiError => 0x0540,
            Self::SocketError => 0x0550,
            Self::InvalidParameter => 0x05F0,
            Self::Timeout => 0x05F1,
            Self::Busy => 0x05F2,
            Self::NotSupported => 0x05F3,
            Self::InvalidState => 0x05F4,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::InitFailed => "initialization failed",
            Self::FlashError => "flash error",
            Self::FlashOutOfBounds => "flash address out of bounds",
            Self::FlashAlignment => "flash address misaligned",
            Self::FlashEraseFailed => "flash erase failed",
            Self::FlashWriteFailed => "flash write failed",
            Self::FlashVerifyFailed => "flash verify failed",
            Self::GpioError => "GPIO error",
            Self::TimerError => "timer error",
            Self::SpiError => "SPI error",
            Self::SocketError => "socket error",
            Self::InvalidParameter => "invalid parameter",
            Self::Timeout => "timeout",
            Self::Busy => "busy",
            Self::NotSupported => "not supported",
            Self::InvalidState => "invalid state for operation",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for eb_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::NotInitialized | HalError::InitFailed => Self::HardwareInitFailed,
            HalError::FlashError => Self::FlashError,
            HalError::FlashOutOfBounds => Self::OutOfBounds,
            HalError::FlashAlignment => Self::AlignmentError,
            HalError::FlashEraseFailed => Self::EraseFailed,
            HalError::FlashWriteFailed => Self::ProgramFailed,
            HalError::FlashVerifyFailed => Self::VerifyFailed,
            HalError::GpioError => Self::GpioError,
            HalError::TimerError => Self::TimerError,
            HalError::SpiError => Self::SpiError,
            HalError::SocketError => Self::SocketError,
            HalError::InvalidParameter => Self::InvalidParameter,
            HalError::Timeout => Self::Timeout,
            HalError::Busy | HalError::InvalidState => Self::InvalidState,
            HalError::NotSupported => Self::NotSupported,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
