/*
 * request.rs
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

//! A queued outbound request: its wire bytes (already serialised, owned —
//! the request copies the caller's bytes so the caller's buffer can be
//! dropped immediately) and the callback that reports its outcome.

use crate::http::HttpHeader;

/// Delivered to a request's callback exactly once (invariant: every
/// submitted request receives exactly one terminal event).
pub enum Event {
    /// The full response for this request has been assembled.
    IncomingData(HttpHeader<'static>),
    /// This request will never receive a response (connect retries
    /// exhausted, pool torn down, or explicit `delete_request`).
    RequestDeleted,
}

pub struct WebclientRequest {
    pub bytes: Vec<u8>,
    pub user: u64,
    pub on_event: Box<dyn FnMut(Event, u64) + Send>,
}

impl WebclientRequest {
    pub fn fire(&mut self, event: Event) {
        (self.on_event)(event, self.user);
    }
}
