// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Integration tests for eb-common
//!
//! Error code stability, log buffer behavior, and memory layout invariants.
//! These exercise the real crate API on the host platform.

mod error_tests {
    use eb_common::Error;

    #[test]
    fn test_error_codes_are_categorized() {
        assert_eq!(Error::EraseFailed.code() >> 8, 0x01);
        assert_eq!(Error::DigestMismatch.code() >> 8, 0x02);
        assert_eq!(Error::DhcpTimeout.code() >> 8, 0x03);
        assert_eq!(Error::MissingHeaderTerminator.code() >> 8, 0x04);
        assert_eq!(Error::FlashError.code() >> 8, 0x05);
        assert_eq!(Error::InvalidVectorTable.code() >> 8, 0x06);
        assert_eq!(Error::Timeout.code() >> 8, 0xFF);
    }

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            Error::EraseFailed,
            Error::ProgramFailed,
            Error::VerifyFailed,
            Error::AlignmentError,
            Error::OutOfBounds,
            Error::MetadataCorrupted,
            Error::DigestMismatch,
            Error::NothingStaged,
            Error::SwapFailed,
            Error::MacInitFailed,
            Error::DhcpTimeout,
            Error::SocketError,
            Error::ConnectionClosed,
            Error::UnrecognizedRequest,
            Error::MissingHeaderTerminator,
            Error::RequestTooLarge,
            Error::HardwareInitFailed,
            Error::FlashError,
            Error::GpioError,
            Error::TimerError,
            Error::SpiError,
            Error::InvalidVectorTable,
            Error::TransitionNotPersisted,
            Error::BufferTooSmall,
            Error::InvalidParameter,
            Error::Timeout,
            Error::InvalidState,
            Error::NotSupported,
            Error::InternalError,
        ];

        for (i, e1) in errors.iter().enumerate() {
            for (j, e2) in errors.iter().enumerate() {
                if i != j {
                    assert_ne!(e1.code(), e2.code(), "{e1} and {e2} share a code");
                }
            }
        }
    }

    #[test]
    fn test_display_includes_code_and_description() {
        let rendered = format!("{}", Error::DigestMismatch);
        assert!(rendered.contains("0x0201"));
        assert!(rendered.contains("digest mismatch"));
    }

    #[test]
    fn test_swap_failure_is_not_recoverable() {
        assert!(!Error::SwapFailed.is_recoverable());
        assert!(Error::DigestMismatch.is_recoverable());
        assert!(Error::DhcpTimeout.is_recoverable());
    }
}

mod log_tests {
    use eb_common::log::{LogBuffer, LogLevel, LOG_BUFFER_SIZE};
    use eb_common::{log_debug, log_error, log_info};

    #[test]
    fn test_log_buffer_starts_empty() {
        let buffer = LogBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_log_macros_record_entries() {
        let mut buffer = LogBuffer::new();
        log_info!(buffer, 10, "boot", "action {}", "passthrough");
        log_error!(buffer, 20, "swap", "sector {} failed", 3);

        assert_eq!(buffer.len(), 2);
        let entries: Vec<_> = buffer.iter().collect();
        assert_eq!(entries[0].module, "boot");
        assert_eq!(entries[0].message.as_str(), "action passthrough");
        assert_eq!(entries[1].level, LogLevel::Error);
        assert_eq!(entries[1].message.as_str(), "sector 3 failed");
    }

    #[test]
    fn test_min_level_filters_entries() {
        let mut buffer = LogBuffer::new();
        // Default minimum level is Info
        log_debug!(buffer, 0, "net", "ignored");
        assert!(buffer.is_empty());

        buffer.set_min_level(LogLevel::Debug);
        log_debug!(buffer, 0, "net", "recorded");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_log_buffer_wraps_oldest_first() {
        let mut buffer = LogBuffer::new();
        for i in 0..(LOG_BUFFER_SIZE + 4) {
            log_info!(buffer, i as u32, "wrap", "entry {}", i);
        }

        assert_eq!(buffer.len(), LOG_BUFFER_SIZE);
        let first = buffer.iter().next().unwrap();
        // The four oldest entries were overwritten
        assert_eq!(first.timestamp, 4);
        let last = buffer.iter().last().unwrap();
        assert_eq!(last.timestamp, (LOG_BUFFER_SIZE + 3) as u32);
    }

    #[test]
    fn test_clear_resets_buffer() {
        let mut buffer = LogBuffer::new();
        log_info!(buffer, 0, "boot", "entry");
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.iter().next().is_none());
    }

    #[test]
    fn test_overlong_message_is_truncated() {
        let mut buffer = LogBuffer::new();
        let long = "x".repeat(500);
        log_info!(buffer, 0, "boot", "{}", long);
        let entry = buffer.iter().next().unwrap();
        assert!(entry.message.len() <= eb_common::log::MAX_LOG_MESSAGE_LEN);
    }
}

mod layout_tests {
    use eb_common::constants::{SECTOR_SIZE, WRITE_ALIGN};
    use eb_common::MemoryLayout;

    #[test]
    fn test_rp2040_layout_invariants() {
        let layout = MemoryLayout::RP2040;
        assert!(layout.is_valid());

        // Equal-length, sector-aligned slots
        assert_eq!(layout.swap_space_len % SECTOR_SIZE as u32, 0);
        assert_eq!(layout.app_start % SECTOR_SIZE as u32, 0);
        assert_eq!(layout.download_start % SECTOR_SIZE as u32, 0);

        // Disjoint regions in INFO < APP < DOWNLOAD order
        assert!(layout.info_start + SECTOR_SIZE as u32 <= layout.app_start);
        assert!(layout.app_end() <= layout.download_start);
    }

    #[test]
    fn test_sector_is_multiple_of_write_align() {
        assert_eq!(SECTOR_SIZE % WRITE_ALIGN, 0);
    }

    #[test]
    fn test_app_vtor_within_app_slot() {
        let layout = MemoryLayout::RP2040;
        assert!(layout.app_vtor() >= layout.app_start);
        assert!(layout.app_vtor() < layout.app_end());
    }
}
