// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Recovery HTTP server
//!
//! A single-connection TCP listener on port 80 that serves the recovery
//! page on GET and streams a POSTed firmware image into the DOWNLOAD slot.
//! Request recognition is deliberately minimal: the method is matched on
//! the request-line prefix, the body starts after the first CRLF CRLF, and
//! `Content-Length` is honored when present.
//!
//! The upload artifact is the raw image followed by a 32-byte SHA-256
//! digest suffix. The suffix is stored in the INFO record and the image is
//! verified against it before anything is committed.
//!
//! No concurrency: a new connection is accepted only after the current one
//! closes. A stalled POST without `Content-Length` stalls the server until
//! the peer tears the socket down.

use core::fmt::Write as _;

use crate::page::{RECOVERY_PAGE_BODY, UPLOAD_OK_RESPONSE};
use eb_common::config::{BootConfig, MemoryLayout};
use eb_common::constants::{
    DIGEST_SIZE, ETHERNET_BUF_SIZE, RECOVERY_HTTP_PORT, WRITE_ALIGN,
};
use eb_common::log::LogBuffer;
use eb_common::{log_error, log_info, log_warn, Error, Result};
use eb_hal::{FlashInterface, TcpSocketInterface, TimerInterface};
use eb_update::metadata::MetadataStore;
use eb_update::verify_download;
use heapless::String;

/// Delay between receive polls while a POST body is in flight (ms)
const BODY_POLL_INTERVAL_MS: u32 = 10;

/// Settle delay around the orderly disconnect (ms)
const DISCONNECT_SETTLE_MS: u32 = 20;

/// Outcome of one accepted (or timed-out) connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The listen window elapsed without a connection
    NoConnection,
    /// The recovery page was served
    PageServed,
    /// A GET named the reboot path; the caller must reset now
    RebootRequested,
    /// An image was staged and verified; the caller performs
    /// swap-and-commit and hands off
    UploadVerified {
        /// Verified image length in bytes (digest suffix excluded)
        image_len: u32,
    },
    /// The staged image failed verification; keep listening
    UploadRejected,
    /// The request was malformed; keep listening
    ProtocolError,
}

/// Single-connection recovery server
pub struct RecoveryServer<'a, S, T> {
    socket: &'a mut S,
    timer: &'a T,
    config: BootConfig,
    layout: MemoryLayout,
    rx_buf: [u8; ETHERNET_BUF_SIZE],
}

impl<'a, S: TcpSocketInterface, T: TimerInterface> RecoveryServer<'a, S, T> {
    /// Create a server over the given socket
    pub fn new(socket: &'a mut S, timer: &'a T, config: BootConfig, layout: MemoryLayout) -> Self {
        Self {
            socket,
            timer,
            config,
            layout,
            rx_buf: [0; ETHERNET_BUF_SIZE],
        }
    }

    /// Listen for and serve exactly one connection
    ///
    /// Socket teardown is performed on every path, so the next call can
    /// accept a fresh connection regardless of how this one ended.
    pub fn serve_connection<F: FlashInterface>(
        &mut self,
        store: &mut MetadataStore<F>,
        log: &mut LogBuffer,
    ) -> Result<SessionOutcome> {
        self.socket.open(RECOVERY_HTTP_PORT).map_err(Error::from)?;
        self.socket.listen().map_err(Error::from)?;

        // Bounded wait for the first bytes of a request
        let mut polls = 0;
        while self.socket.rx_available() == 0 {
            polls += 1;
            if polls > self.config.listen_polls {
                self.socket.close();
                return Ok(SessionOutcome::NoConnection);
            }
            self.timer.delay_ms(self.config.listen_poll_interval_ms);
        }

        let received = self.socket.recv(&mut self.rx_buf).map_err(Error::from)?;
        if received == 0 {
            self.socket.close();
            return Ok(SessionOutcome::NoConnection);
        }
        log_info!(
            log,
            self.timer.get_millis(),
            "recovery",
            "connection received, {} bytes",
            received
        );

        if request_has_method(&self.rx_buf[..received], b"GET") {
            self.handle_get(received, log)
        } else if request_has_method(&self.rx_buf[..received], b"POST") {
            self.handle_post(received, store, log)
        } else {
            log_warn!(
                log,
                self.timer.get_millis(),
                "recovery",
                "unrecognized request"
            );
            self.socket.close();
            Ok(SessionOutcome::ProtocolError)
        }
    }

    /// Serve the recovery page, or report a reboot request
    fn handle_get(&mut self, received: usize, log: &mut LogBuffer) -> Result<SessionOutcome> {
        let request_line = first_line(&self.rx_buf[..received]);
        if contains_ignore_case(request_line, b"REBOOT") {
            log_info!(log, self.timer.get_millis(), "recovery", "reboot requested");
            self.socket.disconnect();
            self.socket.close();
            return Ok(SessionOutcome::RebootRequested);
        }

        let mut header: String<128> = String::new();
        // The write cannot fail: the formatted header fits the buffer
        let _ = write!(
            header,
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            RECOVERY_PAGE_BODY.len()
        );

        let sent = self
            .socket
            .send(header.as_bytes())
            .and_then(|()| self.socket.send(RECOVERY_PAGE_BODY.as_bytes()));
        if sent.is_err() {
            log_warn!(log, self.timer.get_millis(), "recovery", "page send failed");
        }

        self.timer.delay_ms(DISCONNECT_SETTLE_MS);
        self.socket.disconnect();
        self.timer.delay_ms(DISCONNECT_SETTLE_MS);
        self.socket.close();
        Ok(SessionOutcome::PageServed)
    }

    /// Stream a POSTed image into the DOWNLOAD slot and verify it
    fn handle_post<F: FlashInterface>(
        &mut self,
        received: usize,
        store: &mut MetadataStore<F>,
        log: &mut LogBuffer,
    ) -> Result<SessionOutcome> {
        let Some(header_end) = find_subslice(&self.rx_buf[..received], b"\r\n\r\n") else {
            log_warn!(
                log,
                self.timer.get_millis(),
                "recovery",
                "{}",
                Error::MissingHeaderTerminator
            );
            self.socket.close();
            return Ok(SessionOutcome::ProtocolError);
        };
        let content_length = parse_content_length(&self.rx_buf[..header_end]);
        let body_start = header_end + 4;

        log_info!(
            log,
            self.timer.get_millis(),
            "recovery",
            "initializing download slot"
        );
        store
            .flash_mut()
            .erase_range(self.layout.download_start, self.layout.download_end())
            .map_err(Error::from)?;

        // Accumulate into the aligned upload buffer; every full buffer is
        // programmed at the running offset.
        let mut upload_buf = [0u8; WRITE_ALIGN];
        let mut upload_pos = 0usize;
        let mut written = 0u32;
        let mut body_bytes: u64 = 0;

        let mut start = body_start;
        let mut end = received;

        'stream: loop {
            // Drain the current chunk
            let mut index = start;
            while index < end {
                let take = (end - index).min(WRITE_ALIGN - upload_pos);
                upload_buf[upload_pos..upload_pos + take]
                    .copy_from_slice(&self.rx_buf[index..index + take]);
                upload_pos += take;
                index += take;
                body_bytes += take as u64;

                if upload_pos == WRITE_ALIGN {
                    if written + WRITE_ALIGN as u32 > self.layout.swap_space_len {
                        log_error!(
                            log,
                            self.timer.get_millis(),
                            "recovery",
                            "upload exceeds the download slot"
                        );
                        self.socket.close();
                        return Ok(SessionOutcome::ProtocolError);
                    }
                    store
                        .flash_mut()
                        .program(self.layout.download_start + written, &upload_buf)
                        .map_err(Error::from)?;
                    written += WRITE_ALIGN as u32;
                    upload_pos = 0;
                }
            }

            // Stop once a declared body length has fully arrived
            if let Some(length) = content_length {
                if body_bytes >= length {
                    break 'stream;
                }
            }

            // Refill from the socket
            while self.socket.rx_available() == 0 {
                if self.socket.is_closed() {
                    break 'stream;
                }
                if content_length.is_none() {
                    // Empty receive queue terminates an undeclared body
                    break 'stream;
                }
                self.timer.delay_ms(BODY_POLL_INTERVAL_MS);
            }
            if self.socket.rx_available() == 0 {
                break 'stream;
            }

            let chunk = self.socket.recv(&mut self.rx_buf).map_err(Error::from)?;
            if chunk == 0 {
                break 'stream;
            }
            start = 0;
            end = chunk;
        }

        // Short final write: zero-pad the partial buffer
        if upload_pos > 0 {
            upload_buf[upload_pos..].fill(0);
            if written + WRITE_ALIGN as u32 > self.layout.swap_space_len {
                self.socket.close();
                return Ok(SessionOutcome::ProtocolError);
            }
            store
                .flash_mut()
                .program(self.layout.download_start + written, &upload_buf)
                .map_err(Error::from)?;
        }

        log_info!(
            log,
            self.timer.get_millis(),
            "recovery",
            "upload complete, {} body bytes",
            body_bytes
        );

        // The artifact is image || SHA-256 digest
        if body_bytes <= DIGEST_SIZE as u64 {
            log_warn!(
                log,
                self.timer.get_millis(),
                "recovery",
                "upload too short to carry a digest"
            );
            self.socket.close();
            return Ok(SessionOutcome::ProtocolError);
        }
        let image_len = (body_bytes - DIGEST_SIZE as u64) as u32;

        let mut digest = [0u8; DIGEST_SIZE];
        store
            .flash()
            .read(self.layout.download_start + image_len, &mut digest)
            .map_err(Error::from)?;
        store.update(|r| {
            r.swap_size = image_len;
            r.digest = digest;
        })?;

        if verify_download(store.flash(), &self.layout, image_len, &digest) {
            log_info!(
                log,
                self.timer.get_millis(),
                "recovery",
                "digest verified, {} image bytes",
                image_len
            );
            let _ = self.socket.send(UPLOAD_OK_RESPONSE);
            self.timer.delay_ms(DISCONNECT_SETTLE_MS);
            self.socket.disconnect();
            self.socket.close();
            Ok(SessionOutcome::UploadVerified { image_len })
        } else {
            log_error!(
                log,
                self.timer.get_millis(),
                "recovery",
                "{}",
                Error::DigestMismatch
            );
            self.socket.close();
            Ok(SessionOutcome::UploadRejected)
        }
    }
}

/// Check whether the request line starts with the given method
fn request_has_method(request: &[u8], method: &[u8]) -> bool {
    let trimmed = trim_leading_whitespace(request);
    trimmed.len() > method.len()
        && trimmed[..method.len()].eq_ignore_ascii_case(method)
        && trimmed[method.len()] == b' '
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < data.len() && (data[start] == b'\r' || data[start] == b'\n' || data[start] == b' ')
    {
        start += 1;
    }
    &data[start..]
}

/// The request line, without its terminator
fn first_line(data: &[u8]) -> &[u8] {
    match find_subslice(data, b"\r\n") {
        Some(end) => &data[..end],
        None => data,
    }
}

/// Case-insensitive substring search
fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// Find the first occurrence of `needle` in `haystack`
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Extract a `Content-Length` header value, if present
fn parse_content_length(head: &[u8]) -> Option<u64> {
    const NAME: &[u8] = b"content-length:";

    let mut offset = 0;
    while offset < head.len() {
        let line_end = find_subslice(&head[offset..], b"\r\n")
            .map(|e| offset + e)
            .unwrap_or(head.len());
        let line = &head[offset..line_end];

        if line.len() > NAME.len() && line[..NAME.len()].eq_ignore_ascii_case(NAME) {
            let mut value: u64 = 0;
            let mut seen_digit = false;
            for &byte in &line[NAME.len()..] {
                match byte {
                    b' ' | b'\t' if !seen_digit => {}
                    b'0'..=b'9' => {
                        seen_digit = true;
                        value = value.checked_mul(10)?.checked_add(u64::from(byte - b'0'))?;
                    }
                    _ => break,
                }
            }
            return seen_digit.then_some(value);
        }

        offset = line_end + 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_matching() {
        assert!(request_has_method(b"GET / HTTP/1.1\r\n", b"GET"));
        assert!(request_has_method(b"get /index HTTP/1.1\r\n", b"GET"));
        assert!(request_has_method(b"POST /upload HTTP/1.1\r\n", b"POST"));
        assert!(!request_has_method(b"GET/ HTTP/1.1\r\n", b"GET"));
        assert!(!request_has_method(b"PUT / HTTP/1.1\r\n", b"GET"));
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case(b"GET /ReBoOt HTTP/1.1", b"REBOOT"));
        assert!(!contains_ignore_case(b"GET / HTTP/1.1", b"REBOOT"));
        assert!(!contains_ignore_case(b"short", b"much longer needle"));
    }

    #[test]
    fn test_parse_content_length() {
        let head = b"POST /upload HTTP/1.1\r\nHost: x\r\nContent-Length: 4096\r\nAccept: */*";
        assert_eq!(parse_content_length(head), Some(4096));

        let lower = b"POST / HTTP/1.1\r\ncontent-length:17";
        assert_eq!(parse_content_length(lower), Some(17));

        let absent = b"POST / HTTP/1.1\r\nHost: x";
        assert_eq!(parse_content_length(absent), None);

        let garbage = b"POST / HTTP/1.1\r\nContent-Length: abc";
        assert_eq!(parse_content_length(garbage), None);
    }

    #[test]
    fn test_find_subslice() {
        assert_eq!(find_subslice(b"abc\r\n\r\ndef", b"\r\n\r\n"), Some(3));
        assert_eq!(find_subslice(b"abcdef", b"\r\n\r\n"), None);
    }
}
