/*
 * session.rs
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

//! Per-destination state: the data half of the C11 state machine. The
//! transition logic itself lives in [`super::pool::DataObjectPool`], since
//! every transition also touches the shared acsocket pool and utimer.

use std::collections::VecDeque;
use std::net::SocketAddr;

use crate::acsocket::SlotId;
use crate::http::HttpDataObject;
use crate::reactor::TaskToken;

use super::request::WebclientRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initial,
    Connecting,
    Operative,
    Idle,
}

/// Whether this destination is known to answer more than one request per
/// connection. Starts `Unknown`; resolved the first time a connection
/// either survives past one response (`Yes`) or is closed right after one
/// (`No`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineFlag {
    Unknown,
    Yes,
    No,
}

pub struct DestinationSession {
    pub addr: SocketAddr,
    pub state: State,
    pub pipeline_flag: PipelineFlag,
    pub queue: VecDeque<WebclientRequest>,
    pub slot: Option<SlotId>,
    pub tag: Option<u64>,
    pub http: HttpDataObject,
    pub backoff_exponent: u32,
    pub responses_completed_on_connection: u64,
    pub idle_timer: Option<TaskToken>,
    pub free_timer: Option<TaskToken>,
    pub retry_timer: Option<TaskToken>,
}

impl DestinationSession {
    pub fn new(addr: SocketAddr, buffer_size: usize) -> Self {
        Self {
            addr,
            state: State::Initial,
            pipeline_flag: PipelineFlag::Unknown,
            queue: VecDeque::new(),
            slot: None,
            tag: None,
            http: HttpDataObject::new(buffer_size),
            backoff_exponent: 0,
            responses_completed_on_connection: 0,
            idle_timer: None,
            free_timer: None,
            retry_timer: None,
        }
    }
}
