/*
 * header.rs
 * Copyright (C) 2026 webclient_core contributors
 *
 * This file is part of webclient_core.
 *
 * webclient_core is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * webclient_core is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with webclient_core.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Byte-exact HTTP/1.x packet header: request line XOR status line, an
//! ordered (duplicates allowed) header-field list, and an optional body.
//!
//! Fields borrow from the receive buffer they were parsed out of
//! (`HttpHeader<'a>`); call [`HttpHeader::to_owned_header`] before that
//! buffer is reused or recycled (see `acsocket`'s slot buffers, which are
//! refilled on every read).

use std::borrow::Cow;

use crate::error::{Result, WebclientError};

/// Request line or status line — a packet is either a request XOR a
/// response, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine<'a> {
    Request {
        directive: Cow<'a, str>,
        directive_object: Cow<'a, str>,
    },
    Response {
        status_code: u16,
        status_text: Cow<'a, str>,
    },
}

impl<'a> StartLine<'a> {
    pub fn to_owned_line(&self) -> StartLine<'static> {
        match self {
            StartLine::Request {
                directive,
                directive_object,
            } => StartLine::Request {
                directive: Cow::Owned(directive.clone().into_owned()),
                directive_object: Cow::Owned(directive_object.clone().into_owned()),
            },
            StartLine::Response {
                status_code,
                status_text,
            } => StartLine::Response {
                status_code: *status_code,
                status_text: Cow::Owned(status_text.clone().into_owned()),
            },
        }
    }
}

/// `Transfer-Encoding` as relevant to this engine: only `identity` and
/// `chunked` are understood (gzip/deflate are out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Identity,
    Chunked,
}

/// An HTTP/1.x packet header, with borrowed-or-owned fields throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeader<'a> {
    pub start_line: StartLine<'a>,
    pub version: Cow<'a, str>,
    /// Order-preserving, duplicate-name-preserving header fields.
    pub fields: Vec<(Cow<'a, str>, Cow<'a, str>)>,
    pub body: Option<Cow<'a, [u8]>>,
}

impl<'a> HttpHeader<'a> {
    pub fn new_request(directive: &'a str, directive_object: &'a str, version: &'a str) -> Self {
        Self {
            start_line: StartLine::Request {
                directive: Cow::Borrowed(directive),
                directive_object: Cow::Borrowed(directive_object),
            },
            version: Cow::Borrowed(version),
            fields: Vec::new(),
            body: None,
        }
    }

    pub fn new_response(status_code: u16, status_text: &'a str, version: &'a str) -> Self {
        Self {
            start_line: StartLine::Response {
                status_code,
                status_text: Cow::Borrowed(status_text),
            },
            version: Cow::Borrowed(version),
            fields: Vec::new(),
            body: None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request { .. })
    }

    pub fn set_version(&mut self, version: impl Into<Cow<'a, str>>) {
        self.version = version.into();
    }

    pub fn set_status(&mut self, code: u16, text: impl Into<Cow<'a, str>>) {
        self.start_line = StartLine::Response {
            status_code: code,
            status_text: text.into(),
        };
    }

    pub fn set_directive(&mut self, directive: impl Into<Cow<'a, str>>, object: impl Into<Cow<'a, str>>) {
        self.start_line = StartLine::Request {
            directive: directive.into(),
            directive_object: object.into(),
        };
    }

    pub fn set_body(&mut self, body: impl Into<Cow<'a, [u8]>>) {
        self.body = Some(body.into());
    }

    pub fn add_header_line(&mut self, name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Case-insensitive lookup of the first field with this name.
    pub fn get_header_line(&self, name: &str) -> Result<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
            .ok_or_else(|| WebclientError::HeaderNotFound(name.to_string()))
    }

    pub fn parse_content_length(&self) -> Option<u64> {
        self.get_header_line("content-length")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn parse_transfer_encoding(&self) -> TransferEncoding {
        match self.get_header_line("transfer-encoding") {
            Ok(v) if v.to_ascii_lowercase().contains("chunked") => TransferEncoding::Chunked,
            _ => TransferEncoding::Identity,
        }
    }

    /// Deep-copy every borrowed field to owned storage. Call this before the
    /// underlying receive buffer is reused.
    pub fn to_owned_header(&self) -> HttpHeader<'static> {
        HttpHeader {
            start_line: self.start_line.to_owned_line(),
            version: Cow::Owned(self.version.clone().into_owned()),
            fields: self
                .fields
                .iter()
                .map(|(n, v)| {
                    (
                        Cow::Owned(n.clone().into_owned()),
                        Cow::Owned(v.clone().into_owned()),
                    )
                })
                .collect(),
            body: self.body.as_ref().map(|b| Cow::Owned(b.clone().into_owned())),
        }
    }

    /// Serialize to raw HTTP/1.x bytes: start line, header lines, blank
    /// line, body (if set).
    pub fn to_raw(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match &self.start_line {
            StartLine::Request {
                directive,
                directive_object,
            } => {
                out.extend_from_slice(directive.as_bytes());
                out.push(b' ');
                out.extend_from_slice(directive_object.as_bytes());
                out.push(b' ');
                out.extend_from_slice(self.version.as_bytes());
            }
            StartLine::Response {
                status_code,
                status_text,
            } => {
                out.extend_from_slice(self.version.as_bytes());
                out.push(b' ');
                out.extend_from_slice(status_code.to_string().as_bytes());
                out.push(b' ');
                out.extend_from_slice(status_text.as_bytes());
            }
        }
        out.extend_from_slice(b"\r\n");
        for (name, value) in &self.fields {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
        out
    }
}

/// Find the offset of the blank line (`\r\n\r\n`) that ends the header
/// block, searching `buf[off..end]`. Returns the offset of the first `\r`
/// of the terminating CRLFCRLF, relative to the start of `buf`.
pub fn find_header_end(buf: &[u8], off: usize, end: usize) -> Option<usize> {
    if off + 4 > end {
        return None;
    }
    let hay = &buf[off..end];
    hay.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|rel| off + rel)
}

fn split_line(line: &str) -> Result<(&str, &str, &str)> {
    let mut parts = line.splitn(3, ' ');
    let a = parts
        .next()
        .ok_or_else(|| WebclientError::CorruptedHttpMessage("empty start line".into()))?;
    let b = parts
        .next()
        .ok_or_else(|| WebclientError::CorruptedHttpMessage("malformed start line".into()))?;
    let c = parts.next().unwrap_or("");
    Ok((a, b, c))
}

/// Parse a full header block (up to but excluding the terminating blank
/// line) out of `bytes[offset..header_end]`. `bytes` must contain at least
/// through the `\r\n\r\n` terminator; use [`find_header_end`] to locate it
/// first.
pub fn parse(bytes: &[u8], offset: usize, header_end: usize) -> Result<HttpHeader<'_>> {
    let text = std::str::from_utf8(&bytes[offset..header_end])
        .map_err(|_| WebclientError::CorruptedHttpMessage("header is not valid UTF-8".into()))?;
    let mut lines = text.split("\r\n");
    let start = lines
        .next()
        .ok_or_else(|| WebclientError::CorruptedHttpMessage("missing start line".into()))?;

    let (a, b, c) = split_line(start)?;
    let start_line = if let Ok(code) = b.parse::<u16>() {
        // "HTTP/1.1 200 OK"
        StartLine::Response {
            status_code: code,
            status_text: Cow::Borrowed(c),
        }
    } else {
        // "GET /path HTTP/1.1"
        StartLine::Request {
            directive: Cow::Borrowed(a),
            directive_object: Cow::Borrowed(b),
        }
    };
    let version = if matches!(start_line, StartLine::Response { .. }) {
        Cow::Borrowed(a)
    } else {
        Cow::Borrowed(c)
    };

    let mut fields = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let colon = line
            .find(':')
            .ok_or_else(|| WebclientError::InvalidHeaderLine(line.to_string()))?;
        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();
        fields.push((Cow::Borrowed(name), Cow::Borrowed(value)));
    }

    Ok(HttpHeader {
        start_line,
        version,
        fields,
        body: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_header_end() {
        let buf = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nbody";
        let end = find_header_end(buf, 0, buf.len()).unwrap();
        assert_eq!(&buf[end..end + 4], b"\r\n\r\n");
    }

    #[test]
    fn parses_response_header() {
        let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nX-A: 1\r\n\r\n";
        let end = find_header_end(buf, 0, buf.len()).unwrap();
        let h = parse(buf, 0, end).unwrap();
        assert!(!h.is_request());
        assert_eq!(h.parse_content_length(), Some(5));
        assert_eq!(h.get_header_line("x-a").unwrap(), "1");
        match h.start_line {
            StartLine::Response { status_code, .. } => assert_eq!(status_code, 200),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn parses_request_header() {
        let buf = b"GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let end = find_header_end(buf, 0, buf.len()).unwrap();
        let h = parse(buf, 0, end).unwrap();
        assert!(h.is_request());
        match &h.start_line {
            StartLine::Request {
                directive,
                directive_object,
            } => {
                assert_eq!(directive, "GET");
                assert_eq!(directive_object, "/foo");
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn roundtrip_parse_to_raw() {
        let mut h = HttpHeader::new_response(200, "OK", "HTTP/1.1");
        h.add_header_line("Content-Length", "5");
        h.set_body(&b"HELLO"[..]);
        let raw = h.to_raw();
        let end = find_header_end(&raw, 0, raw.len()).unwrap();
        let parsed = parse(&raw, 0, end).unwrap();
        assert_eq!(parsed.parse_content_length(), Some(5));
        assert_eq!(parsed.get_header_line("content-length").unwrap(), "5");
    }

    #[test]
    fn chunked_transfer_encoding_detected() {
        let buf = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
        let end = find_header_end(buf, 0, buf.len()).unwrap();
        let h = parse(buf, 0, end).unwrap();
        assert_eq!(h.parse_transfer_encoding(), TransferEncoding::Chunked);
    }

    #[test]
    fn missing_header_is_an_error() {
        let buf = b"HTTP/1.1 200 OK\r\n\r\n";
        let end = find_header_end(buf, 0, buf.len()).unwrap();
        let h = parse(buf, 0, end).unwrap();
        assert!(h.get_header_line("content-length").is_err());
    }
}
