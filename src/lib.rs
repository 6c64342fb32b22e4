/*
 * lib.rs
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

//! Single-threaded, select-driven async HTTP client engine.
//!
//! Design:
//! - A [`reactor`] chain multiplexes timers ([`reactor::utimer`]) and socket
//!   readiness over a single `mio::Poll`, one tick at a time.
//! - [`acsocket`] is a bounded pool of non-blocking outbound TCP connections
//!   addressed by `SlotId`, driven entirely from chain callbacks.
//! - [`http`] incrementally assembles HTTP/1.x responses (`Content-Length` or
//!   chunked) from whatever bytes the socket handed over, one dataobject per
//!   persistent connection.
//! - [`webclient`] keys a pool of per-destination state machines by
//!   `(ip, port)`, pipelines requests over the acsocket pool, and retries
//!   with exponential backoff.
//! - [`queue`] is the bounded three-priority FIFO used by callers that sit in
//!   front of the webclient (not used internally by the webclient itself).
//! - [`sync_transfer`] is the one blocking, non-chain entry point: connect,
//!   send, parse a single response, return.

pub mod acsocket;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod queue;
pub mod reactor;
pub mod socket_pair;
pub mod sync_transfer;
pub mod uri;
pub mod webclient;

pub use config::WebclientConfig;
pub use error::WebclientError;
pub use webclient::facade::{Event, Webclient};
