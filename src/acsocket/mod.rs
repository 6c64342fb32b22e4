/*
 * mod.rs
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

//! Bounded pool of non-blocking outbound TCP connections, addressed by
//! [`SlotId`] (a `slab` key, never a pointer). A chain object: registers
//! every live slot's fd with the chain's `mio::Registry` and, once per tick,
//! turns whatever fired into a batch of [`SocketEvent`]s for the caller
//! (`webclient::pool::DataObjectPool`) to route by `user_tag`.
//!
//! `on_data` uses the same `(&mut begin, end)` contract as the HTTP parser:
//! [`AcSocket::with_recv_buffer`] lends the slot's buffer to a closure, which
//! reports how much it consumed; the unread tail is preserved for the next
//! read and the buffer grows (up to `buffer_size`) if a read arrives with no
//! room left and nothing was consumed.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;
use mio::{Events, Interest, Token};
use slab::Slab;

use crate::error::{Result, WebclientError};

pub type SlotId = usize;

const INITIAL_SLOT_BUFFER: usize = 2048;

/// Event surfaced by [`AcSocket::post_select`]. Mirrors the four callbacks
/// named in the design document (`on_connect`, `on_disconnect`, `on_data`,
/// `on_send_data`), minus `on_data`'s buffer payload, which is delivered
/// separately through [`AcSocket::with_recv_buffer`] so the caller can
/// borrow the slot's buffer directly instead of receiving a copy.
#[derive(Debug)]
pub enum SocketEvent {
    Connected { slot: SlotId, user_tag: u64 },
    ConnectFailed { slot: SlotId, user_tag: u64, error: WebclientError },
    Readable { slot: SlotId, user_tag: u64 },
    SendComplete { slot: SlotId, user_tag: u64, len: usize },
    SendFailed { slot: SlotId, user_tag: u64, error: WebclientError },
    Disconnected { slot: SlotId, user_tag: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Connecting,
    Connected,
    Closing,
}

struct Slot {
    stream: TcpStream,
    user_tag: u64,
    state: SlotState,
    recv_buf: Vec<u8>,
    recv_len: usize,
    max_recv_buf: usize,
    send_buf: VecDeque<u8>,
    sent_so_far: usize,
}

impl Slot {
    fn token(slot: SlotId) -> Token {
        Token(slot)
    }
}

/// Bounded pool of outbound connections. `capacity` slots may be live at
/// once; beyond that, [`AcSocket::connect_to`] returns `SocketPoolEmpty`.
pub struct AcSocket {
    slots: Slab<Slot>,
    capacity: usize,
    buffer_size: usize,
}

impl AcSocket {
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
            capacity,
            buffer_size,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocate a free slot and start a non-blocking connect. `user_tag` is
    /// opaque to this module; it is echoed back on every callback so the
    /// owner can route without a reverse lookup.
    pub fn connect_to(&mut self, addr: SocketAddr, user_tag: u64) -> Result<SlotId> {
        if self.slots.len() >= self.capacity {
            return Err(WebclientError::SocketPoolEmpty);
        }
        let stream = TcpStream::connect(addr).map_err(WebclientError::FailConnect)?;
        let initial = INITIAL_SLOT_BUFFER.min(self.buffer_size).max(1);
        let slot = Slot {
            stream,
            user_tag,
            state: SlotState::Connecting,
            recv_buf: vec![0u8; initial],
            recv_len: 0,
            max_recv_buf: self.buffer_size,
            send_buf: VecDeque::new(),
            sent_so_far: 0,
        };
        Ok(self.slots.insert(slot))
    }

    /// Queue `bytes` on `slot`'s outbound buffer. Nothing is written to the
    /// kernel until the next `pre_select`/`post_select` round trip.
    pub fn send(&mut self, slot: SlotId, bytes: &[u8]) -> Result<()> {
        let slot = self.slots.get_mut(slot).ok_or(WebclientError::ConnectionNotSetup)?;
        slot.send_buf.extend(bytes.iter().copied());
        Ok(())
    }

    /// Close `slot` and return it to the free list. Emits no event; the
    /// caller already knows it asked for this.
    pub fn disconnect(&mut self, slot: SlotId) -> Result<()> {
        if self.slots.contains(slot) {
            self.slots.remove(slot);
            Ok(())
        } else {
            Err(WebclientError::ConnectionNotSetup)
        }
    }

    /// Lend `slot`'s readable bytes to `consume`, which returns how many
    /// bytes (from the start) it fully processed. The unread remainder is
    /// shifted to the front of the buffer for the next read; if the buffer
    /// is completely full and nothing was consumed, it grows (up to
    /// `buffer_size`) or, at the cap, returns `BufferTooSmall`.
    pub fn with_recv_buffer(
        &mut self,
        slot: SlotId,
        consume: impl FnOnce(&[u8], usize) -> usize,
    ) -> Result<()> {
        let slot = self.slots.get_mut(slot).ok_or(WebclientError::ConnectionNotSetup)?;
        let consumed = consume(&slot.recv_buf[..slot.recv_len], slot.recv_len);
        let consumed = consumed.min(slot.recv_len);
        if consumed > 0 {
            slot.recv_buf.copy_within(consumed..slot.recv_len, 0);
            slot.recv_len -= consumed;
            return Ok(());
        }
        if slot.recv_len == slot.recv_buf.len() {
            if slot.recv_buf.len() >= slot.max_recv_buf {
                return Err(WebclientError::BufferTooSmall {
                    needed: slot.recv_buf.len() + 1,
                    have: slot.recv_buf.len(),
                });
            }
            let new_len = (slot.recv_buf.len() * 2).min(slot.max_recv_buf);
            slot.recv_buf.resize(new_len, 0);
        }
        Ok(())
    }

    fn poll_connect_result(stream: &TcpStream) -> io::Result<()> {
        match stream.take_error()? {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl AcSocket {
    /// Register every live slot's interest for the coming `poll()` call.
    /// Not a [`super::reactor::ChainObject`] impl: acsocket's `post_select`
    /// needs to return owned [`SocketEvent`]s, which that trait's
    /// `io::Result<()>` has no room for, so `webclient::pool::DataObjectPool`
    /// (which *is* the chain object) calls these two methods directly.
    pub fn pre_select(&mut self, registry: &mio::Registry, _timeout: &mut std::time::Duration) -> io::Result<()> {
        for (id, slot) in self.slots.iter_mut() {
            let interest = match slot.state {
                SlotState::Connecting => Interest::READABLE | Interest::WRITABLE,
                SlotState::Connected if !slot.send_buf.is_empty() => Interest::READABLE | Interest::WRITABLE,
                SlotState::Connected => Interest::READABLE,
                SlotState::Closing => continue,
            };
            if registry.reregister(&mut slot.stream, Slot::token(id), interest).is_err() {
                registry.register(&mut slot.stream, Slot::token(id), interest)?;
            }
        }
        Ok(())
    }

    /// Turn whatever fired in `events` into a batch of [`SocketEvent`]s.
    /// Must be called once per tick after `Poll::poll`, before the next
    /// `pre_select`.
    pub fn post_select(&mut self, events: &Events) -> Vec<SocketEvent> {
        let mut out = Vec::new();
        for event in events.iter() {
            let Token(id) = event.token();
            if !self.slots.contains(id) {
                continue;
            }

            if event.is_writable() {
                let state = self.slots[id].state;
                if state == SlotState::Connecting {
                    match Self::poll_connect_result(&self.slots[id].stream) {
                        Ok(()) => {
                            let slot = &mut self.slots[id];
                            slot.state = SlotState::Connected;
                            out.push(SocketEvent::Connected { slot: id, user_tag: slot.user_tag });
                        }
                        Err(e) => {
                            let user_tag = self.slots[id].user_tag;
                            self.slots.remove(id);
                            out.push(SocketEvent::ConnectFailed {
                                slot: id,
                                user_tag,
                                error: WebclientError::FailConnect(e),
                            });
                            continue;
                        }
                    }
                }
                self.flush_send(id, &mut out);
            }

            if event.is_readable() && self.slots.contains(id) {
                self.do_read(id, &mut out);
            }

            if (event.is_error() || event.is_read_closed()) && self.slots.contains(id) {
                let user_tag = self.slots[id].user_tag;
                self.slots.remove(id);
                out.push(SocketEvent::Disconnected { slot: id, user_tag });
            }
        }
        out
    }

    fn flush_send(&mut self, id: SlotId, out: &mut Vec<SocketEvent>) {
        let Some(slot) = self.slots.get_mut(id) else { return };
        if slot.send_buf.is_empty() {
            return;
        }
        let (a, b) = slot.send_buf.as_slices();
        let pending: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        match slot.stream.write(&pending) {
            Ok(n) => {
                slot.send_buf.drain(..n);
                slot.sent_so_far += n;
                if slot.send_buf.is_empty() {
                    let len = slot.sent_so_far;
                    slot.sent_so_far = 0;
                    out.push(SocketEvent::SendComplete { slot: id, user_tag: slot.user_tag, len });
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                let user_tag = slot.user_tag;
                self.slots.remove(id);
                out.push(SocketEvent::SendFailed {
                    slot: id,
                    user_tag,
                    error: WebclientError::FailSend(e),
                });
            }
        }
    }

    /// `mio`'s epoll backend is edge-triggered: a single readable event must
    /// be drained until `WouldBlock` or the next edge may never come. Loops,
    /// growing the buffer (up to `max_recv_buf`) whenever it fills mid-drain.
    fn do_read(&mut self, id: SlotId, out: &mut Vec<SocketEvent>) {
        loop {
            let Some(slot) = self.slots.get_mut(id) else { return };
            if slot.recv_len == slot.recv_buf.len() {
                if slot.recv_buf.len() >= slot.max_recv_buf {
                    out.push(SocketEvent::Readable { slot: id, user_tag: slot.user_tag });
                    return;
                }
                let new_len = (slot.recv_buf.len() * 2).min(slot.max_recv_buf);
                slot.recv_buf.resize(new_len, 0);
            }
            match slot.stream.read(&mut slot.recv_buf[slot.recv_len..]) {
                Ok(0) => {
                    let user_tag = slot.user_tag;
                    self.slots.remove(id);
                    out.push(SocketEvent::Disconnected { slot: id, user_tag });
                    return;
                }
                Ok(n) => {
                    slot.recv_len += n;
                    out.push(SocketEvent::Readable { slot: id, user_tag: slot.user_tag });
                    if slot.recv_len < slot.recv_buf.len() {
                        return;
                    }
                    // Buffer came up exactly full: keep draining in case more
                    // is queued in the kernel.
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(_) => {
                    let user_tag = slot.user_tag;
                    self.slots.remove(id);
                    out.push(SocketEvent::Disconnected { slot: id, user_tag });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn connect_to_rejects_when_pool_full() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut pool = AcSocket::new(1, 2048);
        pool.connect_to(addr, 1).unwrap();
        let err = pool.connect_to(addr, 2).unwrap_err();
        assert!(matches!(err, WebclientError::SocketPoolEmpty));
    }

    #[test]
    fn disconnect_unknown_slot_errors() {
        let mut pool = AcSocket::new(4, 2048);
        let err = pool.disconnect(0).unwrap_err();
        assert!(matches!(err, WebclientError::ConnectionNotSetup));
    }

    #[test]
    fn with_recv_buffer_on_unknown_slot_errors() {
        let mut pool = AcSocket::new(4, 2048);
        let err = pool.with_recv_buffer(0, |_buf, _end| 0).unwrap_err();
        assert!(matches!(err, WebclientError::ConnectionNotSetup));
    }
}
