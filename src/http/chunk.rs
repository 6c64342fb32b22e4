/*
 * chunk.rs
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

//! Stateful decoder for `Transfer-Encoding: chunked` bodies. Created when a
//! response header advertises chunked encoding, destroyed when the owning
//! dataobject resets for the next pipelined response.

use std::borrow::Cow;

use crate::error::{Result, WebclientError};
use crate::http::header::HttpHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SizeLine,
    Data,
    DataCrlf,
    Trailer,
    Done,
}

/// Incremental chunked-body decoder. Feed bytes via [`ChunkProcessor::process`];
/// when the terminating zero-size chunk's trailer is consumed, the decoded
/// body is attached to the header (transferring ownership) and `process`
/// returns `Ok(true)`.
pub struct ChunkProcessor {
    phase: Phase,
    chunk_remaining: u64,
    body: Vec<u8>,
    /// Optional cap on total decoded size; `None` means unbounded.
    max_body_len: Option<usize>,
}

impl ChunkProcessor {
    pub fn new() -> Self {
        Self {
            phase: Phase::SizeLine,
            chunk_remaining: 0,
            body: Vec::new(),
            max_body_len: None,
        }
    }

    pub fn with_max_body_len(max_body_len: usize) -> Self {
        Self {
            max_body_len: Some(max_body_len),
            ..Self::new()
        }
    }

    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|w| w == b"\r\n")
    }

    fn push_body(&mut self, data: &[u8]) -> Result<()> {
        if let Some(max) = self.max_body_len {
            if self.body.len() + data.len() > max {
                return Err(WebclientError::BufferTooSmall {
                    needed: self.body.len() + data.len(),
                    have: max,
                });
            }
        }
        self.body.extend_from_slice(data);
        Ok(())
    }

    /// Consume as much of `bytes[*begin..end]` as possible, advancing
    /// `*begin` past everything consumed. Returns `Ok(true)` once the final
    /// chunk and trailer have been consumed and `header.body` has been set.
    pub fn process(
        &mut self,
        header: &mut HttpHeader<'static>,
        bytes: &[u8],
        begin: &mut usize,
        end: usize,
    ) -> Result<bool> {
        loop {
            if *begin >= end && self.phase != Phase::Done {
                return Ok(false);
            }
            match self.phase {
                Phase::SizeLine => {
                    let window = &bytes[*begin..end];
                    let Some(rel) = Self::find_crlf(window) else {
                        return Ok(false);
                    };
                    let line = std::str::from_utf8(&window[..rel]).map_err(|_| {
                        WebclientError::CorruptedChunkData("chunk size line is not UTF-8".into())
                    })?;
                    let hex_part = line.split(';').next().unwrap_or(line).trim();
                    let size = u64::from_str_radix(hex_part, 16).map_err(|_| {
                        WebclientError::CorruptedChunkData(format!("bad chunk size: {:?}", line))
                    })?;
                    *begin += rel + 2;
                    self.chunk_remaining = size;
                    self.phase = if size == 0 { Phase::Trailer } else { Phase::Data };
                }
                Phase::Data => {
                    let available = end - *begin;
                    let take = available.min(self.chunk_remaining as usize);
                    if take > 0 {
                        self.push_body(&bytes[*begin..*begin + take])?;
                        *begin += take;
                        self.chunk_remaining -= take as u64;
                    }
                    if self.chunk_remaining == 0 {
                        self.phase = Phase::DataCrlf;
                    } else {
                        return Ok(false);
                    }
                }
                Phase::DataCrlf => {
                    if end - *begin < 2 {
                        return Ok(false);
                    }
                    if &bytes[*begin..*begin + 2] != b"\r\n" {
                        return Err(WebclientError::CorruptedChunkData(
                            "missing CRLF after chunk data".into(),
                        ));
                    }
                    *begin += 2;
                    self.phase = Phase::SizeLine;
                }
                Phase::Trailer => {
                    let window = &bytes[*begin..end];
                    let Some(rel) = Self::find_crlf(window) else {
                        return Ok(false);
                    };
                    *begin += rel + 2;
                    if rel == 0 {
                        // blank line: trailers done
                        header.set_body(Cow::Owned(std::mem::take(&mut self.body)));
                        self.phase = Phase::Done;
                        return Ok(true);
                    }
                    // trailer header lines are parsed but not surfaced separately;
                    // the driver may choose to fold them into header.fields.
                    let line = std::str::from_utf8(&window[..rel]).map_err(|_| {
                        WebclientError::CorruptedChunkData("trailer line is not UTF-8".into())
                    })?;
                    if let Some(colon) = line.find(':') {
                        let name = line[..colon].trim().to_string();
                        let value = line[colon + 1..].trim().to_string();
                        header.add_header_line(Cow::Owned(name), Cow::Owned(value));
                    }
                }
                Phase::Done => return Ok(true),
            }
        }
    }
}

impl Default for ChunkProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<u8> {
        let mut header = HttpHeader::new_response(200, "OK", "HTTP/1.1");
        let mut proc = ChunkProcessor::new();
        let mut begin = 0usize;
        let done = proc.process(&mut header, input, &mut begin, input.len()).unwrap();
        assert!(done, "expected chunk stream to complete in one shot");
        header.body.unwrap().into_owned()
    }

    #[test]
    fn decodes_hello_world() {
        let input = b"5\r\nHELLO\r\n6\r\n WORLD\r\n0\r\n\r\n";
        assert_eq!(decode_all(input), b"HELLO WORLD");
    }

    #[test]
    fn byte_at_a_time_matches_one_shot() {
        let input = b"5\r\nHELLO\r\n6\r\n WORLD\r\n0\r\n\r\n";
        let mut header = HttpHeader::new_response(200, "OK", "HTTP/1.1");
        let mut proc = ChunkProcessor::new();
        let mut begin = 0usize;
        let mut done = false;
        for end in 1..=input.len() {
            if begin < end {
                done = proc.process(&mut header, input, &mut begin, end).unwrap() || done;
            }
        }
        assert!(done);
        assert_eq!(header.body.unwrap().into_owned(), b"HELLO WORLD".to_vec());
    }

    #[test]
    fn bad_size_line_is_corrupted_chunk_data() {
        let mut header = HttpHeader::new_response(200, "OK", "HTTP/1.1");
        let mut proc = ChunkProcessor::new();
        let input = b"zzz\r\n";
        let mut begin = 0usize;
        let err = proc.process(&mut header, input, &mut begin, input.len()).unwrap_err();
        assert!(matches!(err, WebclientError::CorruptedChunkData(_)));
    }
}
