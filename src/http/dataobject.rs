/*
 * dataobject.rs
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

//! Incremental HTTP/1.x response assembler. One instance drives successive
//! pipelined responses on the same persistent connection: [`HttpDataObject::reinit`]
//! resets it after each full packet.
//!
//! Follows the `(&mut begin, end)` coroutine-like contract used throughout
//! this crate (and by the teacher's `h1::parser::ResponseParser::receive`):
//! consume as much of `bytes[*begin..end]` as possible, advance `*begin` past
//! everything consumed, and return when more data is needed.

use std::borrow::Cow;

use crate::error::Result;
use crate::http::chunk::ChunkProcessor;
use crate::http::header::{self, HttpHeader, TransferEncoding};

const HEADER_TERMINATOR_LEN: usize = 4; // "\r\n\r\n"

struct SpillBuffer {
    buf: Vec<u8>,
    offset: usize,
}

impl SpillBuffer {
    fn new(target_len: usize) -> Self {
        Self {
            buf: vec![0u8; target_len],
            offset: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn is_full(&self) -> bool {
        self.offset == self.buf.len()
    }
}

/// Outcome of feeding bytes to an [`HttpDataObject`].
pub enum Assembled<'a> {
    /// More data is needed; nothing was completed this call.
    NeedMore,
    /// A full response header (and, if any, body) is ready.
    Full(HttpHeader<'a>),
}

/// Incremental HTTP response assembler, built on [`header`] + [`ChunkProcessor`].
pub struct HttpDataObject {
    header_parsed: bool,
    chunked: bool,
    full_packet: bool,
    spill: Option<SpillBuffer>,
    /// Content-Length bytes still owed; meaningless once `chunked` is set.
    bytes_left: i64,
    socket_buffer_size: usize,
    chunk_processor: Option<ChunkProcessor>,
    owned_header: Option<HttpHeader<'static>>,
}

impl HttpDataObject {
    pub fn new(socket_buffer_size: usize) -> Self {
        Self {
            header_parsed: false,
            chunked: false,
            full_packet: false,
            spill: None,
            bytes_left: 0,
            socket_buffer_size,
            chunk_processor: None,
            owned_header: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.full_packet
    }

    /// Clear all state so the same instance can parse the next pipelined
    /// response. After this call no memory from the previous response is
    /// reachable: no spill buffer, no parsed header, no chunk processor.
    pub fn reinit(&mut self) {
        self.header_parsed = false;
        self.chunked = false;
        self.full_packet = false;
        self.spill = None;
        self.bytes_left = 0;
        self.chunk_processor = None;
        self.owned_header = None;
    }

    /// Feed `bytes[*begin..end]`. Advances `*begin` past everything consumed.
    pub fn process<'a>(
        &mut self,
        bytes: &'a [u8],
        begin: &mut usize,
        end: usize,
    ) -> Result<Assembled<'a>> {
        if !self.header_parsed {
            let Some(header_end) = header::find_header_end(bytes, *begin, end) else {
                return Ok(Assembled::NeedMore);
            };
            let parsed = header::parse(bytes, *begin, header_end)?;
            let body_start = header_end + HEADER_TERMINATOR_LEN;
            let transfer_encoding = parsed.parse_transfer_encoding();
            let content_length = parsed.parse_content_length();

            if transfer_encoding == TransferEncoding::Chunked {
                self.chunked = true;
                self.header_parsed = true;
                self.owned_header = Some(parsed.to_owned_header());
                self.chunk_processor = Some(ChunkProcessor::new());
                *begin = body_start;
                return self.drive_chunked(bytes, begin, end);
            }

            let bytes_left = content_length.unwrap_or(0) as i64;
            if bytes_left == 0 {
                let mut header = parsed;
                header.set_body(Cow::Borrowed(&b""[..]));
                *begin = body_start;
                self.full_packet = true;
                return Ok(Assembled::Full(header));
            }

            let available = end.saturating_sub(body_start);
            if available >= bytes_left as usize {
                // Whole body already present: attach in place, no clone needed.
                let body_end = body_start + bytes_left as usize;
                let mut header = parsed;
                header.set_body(Cow::Borrowed(&bytes[body_start..body_end]));
                *begin = body_end;
                self.full_packet = true;
                return Ok(Assembled::Full(header));
            }

            // Body is not fully here yet: the receive buffer will be reused,
            // so clone to owned storage before returning.
            self.owned_header = Some(parsed.to_owned_header());
            self.header_parsed = true;
            self.bytes_left = bytes_left;
            *begin = body_start;
            if bytes_left as usize > self.socket_buffer_size {
                self.spill = Some(SpillBuffer::new(bytes_left as usize));
            }
            return self.drive_identity_body(bytes, begin, end);
        }

        if self.chunked {
            return self.drive_chunked(bytes, begin, end);
        }
        self.drive_identity_body(bytes, begin, end)
    }

    fn drive_identity_body<'a>(
        &mut self,
        bytes: &'a [u8],
        begin: &mut usize,
        end: usize,
    ) -> Result<Assembled<'a>> {
        if let Some(spill) = &mut self.spill {
            let take = (end - *begin).min(spill.remaining());
            if take > 0 {
                let dst_start = spill.offset;
                spill.buf[dst_start..dst_start + take].copy_from_slice(&bytes[*begin..*begin + take]);
                spill.offset += take;
                *begin += take;
            }
            if !spill.is_full() {
                return Ok(Assembled::NeedMore);
            }
            let mut header = self.owned_header.take().expect("header parsed before body phase");
            let body = self.spill.take().expect("spill present").buf;
            header.set_body(Cow::Owned(body));
            self.full_packet = true;
            return Ok(Assembled::Full(header));
        }

        let available = end - *begin;
        if available < self.bytes_left as usize {
            return Ok(Assembled::NeedMore);
        }
        let take = self.bytes_left as usize;
        let mut header = self.owned_header.take().expect("header parsed before body phase");
        header.set_body(Cow::Owned(bytes[*begin..*begin + take].to_vec()));
        *begin += take;
        self.full_packet = true;
        Ok(Assembled::Full(header))
    }

    fn drive_chunked<'a>(
        &mut self,
        bytes: &'a [u8],
        begin: &mut usize,
        end: usize,
    ) -> Result<Assembled<'a>> {
        let mut header = self.owned_header.take().expect("chunked header must be owned");
        let processor = self.chunk_processor.as_mut().expect("chunk processor present");
        let done = processor.process(&mut header, bytes, begin, end)?;
        if done {
            self.full_packet = true;
            Ok(Assembled::Full(header))
        } else {
            self.owned_header = Some(header);
            Ok(Assembled::NeedMore)
        }
    }
}
