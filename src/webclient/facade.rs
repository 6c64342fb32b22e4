/*
 * facade.rs
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

//! Public, thread-safe entry point. Every other piece of this crate
//! (`reactor`, `acsocket`, `webclient::pool`) is chain-thread-local;
//! `Webclient` is the one type meant to be called from any thread while the
//! chain runs its `tick()` loop on its own.
//!
//! Callers stage operations into a mutex-guarded queue and wake the chain
//! only if it might be blocked in `poll()` — the same staging pattern the
//! design document calls out for the facade's "shared resources" (§5).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::config::WebclientConfig;
use crate::error::{Result, WebclientError};
use crate::http::HttpHeader;
use crate::reactor::{Chain, ChainObject, ChainWaker};

use super::pool::DataObjectPool;
use super::request::WebclientRequest;

pub use super::request::Event;

enum StagedOp {
    Submit {
        dest_key: String,
        addr: SocketAddr,
        request: WebclientRequest,
    },
    Delete {
        dest_key: String,
    },
    Destroy,
}

struct Staging {
    ops: Mutex<Vec<StagedOp>>,
}

impl Staging {
    fn new() -> Self {
        Self { ops: Mutex::new(Vec::new()) }
    }

    /// Pushes `op` and reports whether the queue was empty beforehand (the
    /// caller only needs to wake the chain on that transition).
    fn push(&self, op: StagedOp) -> bool {
        let mut ops = self.ops.lock().unwrap();
        let was_empty = ops.is_empty();
        ops.push(op);
        was_empty
    }

    fn drain(&self) -> Vec<StagedOp> {
        std::mem::take(&mut *self.ops.lock().unwrap())
    }
}

/// A chain object that applies staged operations to the
/// [`DataObjectPool`] at the top of every `pre_select`, before acsocket or
/// utimer get a chance to run.
struct StagingApplier {
    staging: Arc<Staging>,
    pool: DataObjectPool,
}

impl ChainObject for StagingApplier {
    fn pre_select(&mut self, registry: &mio::Registry, timeout: &mut std::time::Duration) -> std::io::Result<()> {
        for op in self.staging.drain() {
            match op {
                StagedOp::Submit { dest_key, addr, request } => self.pool.submit(dest_key, addr, request),
                StagedOp::Delete { dest_key } => self.pool.delete_requests(&dest_key),
                StagedOp::Destroy => self.pool.destroy_all(),
            }
        }
        self.pool.pre_select(registry, timeout)
    }

    fn post_select(&mut self, events: &mio::Events) -> std::io::Result<()> {
        self.pool.post_select(events)
    }
}

/// Public handle to a running webclient engine. Cheaply `Clone`-able;
/// every clone stages onto the same queue and wakes the same chain.
#[derive(Clone)]
pub struct Webclient {
    staging: Arc<Staging>,
    waker: ChainWaker,
}

impl Webclient {
    /// Build a chain pre-wired with a [`DataObjectPool`] and hand back both
    /// the chain (for the caller to `run()` on its own thread) and the
    /// facade handle used from any other thread.
    pub fn new(config: WebclientConfig) -> Result<(Chain, Self)> {
        config.validate()?;
        let mut chain = Chain::new().map_err(WebclientError::Io)?;
        let pool = DataObjectPool::new(config, chain.clock.clone());
        let staging = Arc::new(Staging::new());
        let waker = chain.waker();
        chain.add_object(Box::new(StagingApplier {
            staging: staging.clone(),
            pool,
        }));
        Ok((chain, Self { staging, waker }))
    }

    fn stage_and_wake(&self, op: StagedOp) {
        if self.staging.push(op) {
            let _ = self.waker.wake();
        }
    }

    fn dest_key(peer_ip: &str, port: u16) -> String {
        format!("{peer_ip}:{port}")
    }

    /// Stage already-serialized packet bytes for `peer_ip:port`. Shared by
    /// every public submission entry point below. `on_event` fires exactly
    /// once, with `IncomingData` on success or `RequestDeleted` if the
    /// request is never going to get a response.
    fn submit_bytes(
        &self,
        peer_ip: &str,
        port: u16,
        packet_bytes: Vec<u8>,
        user: u64,
        on_event: impl FnMut(Event, u64) + Send + 'static,
    ) -> Result<()> {
        let addr: SocketAddr = format!("{peer_ip}:{port}")
            .parse()
            .map_err(|_| WebclientError::InvalidParam("peer_ip"))?;
        let request = WebclientRequest {
            bytes: packet_bytes,
            user,
            on_event: Box::new(on_event),
        };
        self.stage_and_wake(StagedOp::Submit {
            dest_key: Self::dest_key(peer_ip, port),
            addr,
            request,
        });
        Ok(())
    }

    /// Submit a structured packet for `peer_ip:port`: serializes
    /// `packet_header` via [`HttpHeader::to_raw`] (start line, header
    /// lines, blank line, and whatever body is already set on it) before
    /// staging.
    pub fn send_http_packet(
        &self,
        peer_ip: &str,
        port: u16,
        packet_header: &HttpHeader<'_>,
        user: u64,
        on_event: impl FnMut(Event, u64) + Send + 'static,
    ) -> Result<()> {
        self.submit_bytes(peer_ip, port, packet_header.to_raw(), user, on_event)
    }

    /// Submit a packet already split into raw header bytes and an optional
    /// raw body, concatenating them before staging. Unlike
    /// [`Self::send_http_packet`] this takes no structured header at all —
    /// callers that already hold serialized bytes (e.g. a body read from
    /// disk) use this to avoid round-tripping through [`HttpHeader`].
    pub fn send_http_header_and_body(
        &self,
        peer_ip: &str,
        port: u16,
        header_bytes: &[u8],
        body_bytes: Option<&[u8]>,
        user: u64,
        on_event: impl FnMut(Event, u64) + Send + 'static,
    ) -> Result<()> {
        let body_bytes = body_bytes.unwrap_or(&[]);
        let mut bytes = Vec::with_capacity(header_bytes.len() + body_bytes.len());
        bytes.extend_from_slice(header_bytes);
        bytes.extend_from_slice(body_bytes);
        self.submit_bytes(peer_ip, port, bytes, user, on_event)
    }

    /// Drain every request still queued for `peer_ip:port`, firing
    /// `RequestDeleted` on each. Any live connection is left untouched.
    pub fn delete_request(&self, peer_ip: &str, port: u16) {
        self.stage_and_wake(StagedOp::Delete {
            dest_key: Self::dest_key(peer_ip, port),
        });
    }

    /// Tear down every destination: disconnect, drain every queue with
    /// `RequestDeleted`.
    pub fn destroy(&self) {
        self.stage_and_wake(StagedOp::Destroy);
    }
}
