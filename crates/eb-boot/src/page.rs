// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Emberlink Systems

//! Recovery page
//!
//! The fixed HTML document served on any GET. A file input plus a small
//! client-side script that POSTs the selected file to `/upload` as a raw
//! octet stream, and a reboot button.

/// HTML body of the recovery page
pub const RECOVERY_PAGE_BODY: &str = concat!(
    "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">",
    "<title>Emberboot Recovery</title></head><body>",
    "<h1>SYSTEM RECOVERY</h1>",
    "Booted in recovery mode. A new firmware image can be loaded here.<br><br>",
    "The upload takes about two minutes. Once the new firmware boots, refresh this page.<br><br>",
    "<input type=\"file\" id=\"input\" onchange=\"upload()\"><br><br>",
    "<script>",
    "function upload() {",
    "const input = document.getElementById('input');",
    "if (input.files.length > 0) {",
    "const rdr = new FileReader();",
    "rdr.onload = e => fetch('upload', {",
    "method: 'POST',",
    "headers: {'Content-Type': 'application/octet-stream'},",
    "body: e.target.result",
    "}).then(res => res.text()).catch(err => console.error('Error:', err));",
    "rdr.readAsArrayBuffer(input.files[0]);",
    "}",
    "}",
    "</script><br><br>",
    "<button onclick=\"location.href='reboot'\">REBOOT</button>",
    "</body></html>"
);

/// Response sent after a verified upload
pub const UPLOAD_OK_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
