/*
 * pool.rs
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

//! Owns one [`AcSocket`] and one [`Utimer`] shared by every destination, and
//! drives the per-destination state machine (`Initial` / `Connecting` /
//! `Operative` / `Idle`) in response to acsocket and timer events. This is
//! the chain object the facade hands to [`crate::reactor::Chain`].
//!
//! Utimer's `on_fire` closures cannot borrow back into this struct (the
//! scheduler is itself one of this struct's fields, already uniquely
//! borrowed while firing) — so timers here carry no logic of their own,
//! only a `(TimerKind, destination)` key pushed onto a shared queue that
//! this struct drains right after `utimer.pre_select` returns. Direct token
//! bookkeeping per destination still does cancellation, so timers are never
//! handled twice.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use mio::Events;

use crate::acsocket::{AcSocket, SlotId, SocketEvent};
use crate::clock::Clock;
use crate::config::WebclientConfig;
use crate::error::WebclientError;
use crate::http::Assembled;
use crate::reactor::{ChainObject, TaskToken, Utimer};

use super::request::{Event, WebclientRequest};
use super::session::{DestinationSession, PipelineFlag, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKind {
    Idle,
    Free,
    Retry,
}

type TimerKey = (TimerKind, String);

pub struct DataObjectPool {
    destinations: HashMap<String, DestinationSession>,
    tag_to_dest: HashMap<u64, String>,
    next_tag: u64,
    acsocket: AcSocket,
    utimer: Utimer<TimerKey>,
    fired: Rc<RefCell<VecDeque<TimerKey>>>,
    clock: Clock,
    config: WebclientConfig,
}

impl DataObjectPool {
    pub fn new(config: WebclientConfig, clock: Clock) -> Self {
        Self {
            destinations: HashMap::new(),
            tag_to_dest: HashMap::new(),
            next_tag: 0,
            acsocket: AcSocket::new(config.pool_size, config.buffer_size),
            utimer: Utimer::new(clock.clone()),
            fired: Rc::new(RefCell::new(VecDeque::new())),
            clock,
            config,
        }
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Look up (or create) the destination's session, enqueue `request`,
    /// and post the `SendData` event. If the pool is at `pool_size` and
    /// this is a brand-new destination, the request is rejected immediately
    /// with `RequestDeleted` — a synchronous-looking failure surfaced
    /// through the same completion path as every other failure mode.
    pub fn submit(&mut self, dest_key: String, addr: SocketAddr, mut request: WebclientRequest) {
        if !self.destinations.contains_key(&dest_key) {
            if self.destinations.len() >= self.config.pool_size {
                request.fire(Event::RequestDeleted);
                return;
            }
            self.destinations
                .insert(dest_key.clone(), DestinationSession::new(addr, self.config.buffer_size));
        }
        if let Some(session) = self.destinations.get_mut(&dest_key) {
            session.queue.push_back(request);
        }
        self.send_data_event(&dest_key);
    }

    /// Drain `dest_key`'s FIFO, firing `RequestDeleted` on everything still
    /// queued. The connection, if any, is left alone.
    pub fn delete_requests(&mut self, dest_key: &str) {
        self.drain_queue_with_deleted(dest_key);
    }

    /// Tear down every destination: disconnect, drain with `RequestDeleted`,
    /// forget every timer.
    pub fn destroy_all(&mut self) {
        let keys: Vec<String> = self.destinations.keys().cloned().collect();
        for key in keys {
            if let Some(session) = self.destinations.get_mut(&key) {
                if let Some(slot) = session.slot.take() {
                    let _ = self.acsocket.disconnect(slot);
                }
                if let Some(tag) = session.tag.take() {
                    self.tag_to_dest.remove(&tag);
                }
            }
            self.drain_queue_with_deleted(&key);
            self.destinations.remove(&key);
        }
    }

    fn drain_queue_with_deleted(&mut self, dest_key: &str) {
        if let Some(session) = self.destinations.get_mut(dest_key) {
            while let Some(mut req) = session.queue.pop_front() {
                req.fire(Event::RequestDeleted);
            }
        }
    }

    fn send_data_event(&mut self, dest_key: &str) {
        let state = match self.destinations.get(dest_key) {
            Some(s) => s.state,
            None => return,
        };
        match state {
            State::Initial => self.start_connect(dest_key),
            State::Idle => self.send_head(dest_key, State::Operative),
            State::Connecting | State::Operative => {}
        }
    }

    fn send_head(&mut self, dest_key: &str, resulting_state: State) {
        let bytes = self
            .destinations
            .get(dest_key)
            .and_then(|s| s.queue.front())
            .map(|r| r.bytes.clone());
        let slot = self.destinations.get(dest_key).and_then(|s| s.slot);
        if let (Some(slot), Some(bytes)) = (slot, bytes) {
            let _ = self.acsocket.send(slot, &bytes);
        }
        self.set_state(dest_key, resulting_state);
    }

    fn start_connect(&mut self, dest_key: &str) {
        let addr = match self.destinations.get(dest_key) {
            Some(s) => s.addr,
            None => return,
        };
        let tag = self.next_tag;
        self.next_tag += 1;
        match self.acsocket.connect_to(addr, tag) {
            Ok(slot) => {
                if let Some(session) = self.destinations.get_mut(dest_key) {
                    session.slot = Some(slot);
                    session.tag = Some(tag);
                }
                self.tag_to_dest.insert(tag, dest_key.to_string());
                self.set_state(dest_key, State::Connecting);
            }
            Err(e) => {
                tracing::warn!(destination = dest_key, error = %e, "acsocket connect_to failed");
                self.schedule_retry_or_giveup(dest_key);
            }
        }
    }

    fn schedule_retry_or_giveup(&mut self, dest_key: &str) {
        let give_up = match self.destinations.get_mut(dest_key) {
            Some(session) => {
                session.slot = None;
                session.tag = None;
                session.backoff_exponent >= self.config.retry_max
            }
            None => return,
        };
        if give_up {
            self.drain_queue_with_deleted(dest_key);
            self.destinations.remove(dest_key);
            return;
        }
        let delay_ms = {
            let session = self.destinations.get_mut(dest_key).unwrap();
            let delay = 1000u64.saturating_mul(1u64 << session.backoff_exponent.min(30));
            session.backoff_exponent += 1;
            delay
        };
        self.set_state(dest_key, State::Initial);
        self.arm_retry_timer(dest_key, delay_ms);
    }

    fn on_connected(&mut self, dest_key: &str) {
        if let Some(session) = self.destinations.get_mut(dest_key) {
            session.backoff_exponent = 0;
        }
        self.send_head(dest_key, State::Operative);
    }

    fn on_connect_failed(&mut self, dest_key: &str, error: WebclientError) {
        tracing::warn!(destination = dest_key, error = %error, "connect failed");
        self.schedule_retry_or_giveup(dest_key);
    }

    fn on_send_failed(&mut self, dest_key: &str, error: WebclientError) {
        tracing::warn!(destination = dest_key, error = %error, "send failed");
        self.schedule_retry_or_giveup(dest_key);
    }

    /// One full response parsed off `dest_key`'s connection: deliver it to
    /// the head-of-queue request and decide what happens next.
    fn on_data_sent(&mut self, dest_key: &str, header: crate::http::HttpHeader<'static>) {
        let (queue_empty, pipeline_no, slot) = {
            let session = match self.destinations.get_mut(dest_key) {
                Some(s) => s,
                None => return,
            };
            session.responses_completed_on_connection += 1;
            if session.responses_completed_on_connection > 1 && session.pipeline_flag == PipelineFlag::Unknown {
                session.pipeline_flag = PipelineFlag::Yes;
            }
            session.http.reinit();
            if let Some(mut req) = session.queue.pop_front() {
                req.fire(Event::IncomingData(header));
            }
            (
                session.queue.is_empty(),
                session.pipeline_flag == PipelineFlag::No,
                session.slot,
            )
        };

        if queue_empty {
            self.set_state(dest_key, State::Idle);
            return;
        }

        if pipeline_no {
            if let Some(slot) = slot {
                let _ = self.acsocket.disconnect(slot);
            }
            if let Some(session) = self.destinations.get_mut(dest_key) {
                session.slot = None;
                if let Some(tag) = session.tag.take() {
                    self.tag_to_dest.remove(&tag);
                }
            }
            self.set_state(dest_key, State::Initial);
            self.start_connect(dest_key);
        } else {
            self.send_head(dest_key, State::Operative);
        }
    }

    fn on_parse_or_buffer_error(&mut self, dest_key: &str, error: WebclientError) {
        tracing::warn!(destination = dest_key, error = %error, "dropping connection on parse error");
        if let Some(session) = self.destinations.get_mut(dest_key) {
            if let Some(slot) = session.slot.take() {
                let _ = self.acsocket.disconnect(slot);
            }
            if let Some(tag) = session.tag.take() {
                self.tag_to_dest.remove(&tag);
            }
            session.http.reinit();
        }
        self.drain_queue_with_deleted(dest_key);
        self.destinations.remove(dest_key);
    }

    fn on_disconnected(&mut self, dest_key: &str) {
        enum Follow {
            RetryOrGiveUp,
            ToInitial,
            None,
        }

        let follow = {
            let session = match self.destinations.get_mut(dest_key) {
                Some(s) => s,
                None => return,
            };
            session.slot = None;
            session.tag = None;
            match session.state {
                State::Operative => {
                    if session.responses_completed_on_connection >= 1
                        && session.pipeline_flag == PipelineFlag::Unknown
                    {
                        session.pipeline_flag = PipelineFlag::No;
                    } else if session.responses_completed_on_connection == 0
                        && self.config.latch_no_pipeline_before_first_response
                        && session.pipeline_flag == PipelineFlag::Unknown
                    {
                        session.pipeline_flag = PipelineFlag::No;
                    }
                    session.responses_completed_on_connection = 0;
                    if session.queue.is_empty() {
                        Follow::ToInitial
                    } else {
                        Follow::RetryOrGiveUp
                    }
                }
                State::Idle => {
                    session.responses_completed_on_connection = 0;
                    Follow::ToInitial
                }
                _ => Follow::None,
            }
        };

        match follow {
            Follow::RetryOrGiveUp => self.schedule_retry_or_giveup(dest_key),
            Follow::ToInitial => self.set_state(dest_key, State::Initial),
            Follow::None => {}
        }
    }

    fn on_readable(&mut self, dest_key: &str, slot: SlotId) {
        loop {
            let mut completed: Option<crate::http::HttpHeader<'static>> = None;
            let mut parse_err: Option<WebclientError> = None;
            let result = {
                let acsocket = &mut self.acsocket;
                let session = match self.destinations.get_mut(dest_key) {
                    Some(s) => s,
                    None => return,
                };
                acsocket.with_recv_buffer(slot, |buf, end| {
                    let mut begin = 0usize;
                    match session.http.process(buf, &mut begin, end) {
                        Ok(Assembled::Full(header)) => {
                            completed = Some(header.to_owned_header());
                            begin
                        }
                        Ok(Assembled::NeedMore) => begin,
                        Err(e) => {
                            parse_err = Some(e);
                            begin
                        }
                    }
                })
            };

            if let Err(e) = result {
                self.on_parse_or_buffer_error(dest_key, e);
                return;
            }
            if let Some(e) = parse_err {
                self.on_parse_or_buffer_error(dest_key, e);
                return;
            }
            match completed {
                Some(header) => {
                    self.on_data_sent(dest_key, header);
                    // on_data_sent may have torn down and replaced this
                    // connection (no-pipelining cycle) or moved it to Idle;
                    // only keep draining if `slot` is still the live one.
                    let still_current = matches!(
                        self.destinations.get(dest_key),
                        Some(session) if session.slot == Some(slot)
                    );
                    if !still_current {
                        return;
                    }
                }
                None => return,
            }
        }
    }

    fn set_state(&mut self, dest_key: &str, new_state: State) {
        let old_state = match self.destinations.get(dest_key) {
            Some(s) => s.state,
            None => return,
        };
        if old_state == new_state {
            return;
        }
        match old_state {
            State::Idle => self.cancel_timer(dest_key, |s| &mut s.idle_timer),
            State::Initial => self.cancel_timer(dest_key, |s| &mut s.free_timer),
            _ => {}
        }
        if let Some(session) = self.destinations.get_mut(dest_key) {
            session.state = new_state;
        }
        match new_state {
            State::Idle => {
                let delay = self.config.idle_timeout_ms;
                let token = self.arm_timer(TimerKind::Idle, dest_key, delay);
                if let Some(session) = self.destinations.get_mut(dest_key) {
                    session.idle_timer = Some(token);
                }
            }
            State::Initial => {
                let delay = self.config.free_timeout_ms;
                let token = self.arm_timer(TimerKind::Free, dest_key, delay);
                if let Some(session) = self.destinations.get_mut(dest_key) {
                    session.free_timer = Some(token);
                }
            }
            _ => {}
        }
    }

    fn cancel_timer(&mut self, dest_key: &str, field: impl Fn(&mut DestinationSession) -> &mut Option<TaskToken>) {
        let token = self.destinations.get_mut(dest_key).and_then(|s| field(s).take());
        if let Some(t) = token {
            self.utimer.cancel(t);
        }
    }

    fn arm_retry_timer(&mut self, dest_key: &str, delay_ms: u64) {
        let token = self.arm_timer(TimerKind::Retry, dest_key, delay_ms);
        if let Some(session) = self.destinations.get_mut(dest_key) {
            session.retry_timer = Some(token);
        }
    }

    fn arm_timer(&mut self, kind: TimerKind, dest_key: &str, delay_ms: u64) -> TaskToken {
        let fired = self.fired.clone();
        let key: TimerKey = (kind, dest_key.to_string());
        self.utimer
            .schedule(key.clone(), delay_ms, move |k| fired.borrow_mut().push_back(k), |_| {})
    }

    fn drain_fired_timers(&mut self) {
        let items: Vec<TimerKey> = self.fired.borrow_mut().drain(..).collect();
        for (kind, dest_key) in items {
            match kind {
                TimerKind::Idle => self.on_idle_timeout(&dest_key),
                TimerKind::Free => self.on_free_timeout(&dest_key),
                TimerKind::Retry => self.start_connect(&dest_key),
            }
        }
    }

    fn on_idle_timeout(&mut self, dest_key: &str) {
        let slot = match self.destinations.get_mut(dest_key) {
            Some(session) if session.state == State::Idle => {
                session.idle_timer = None;
                session.slot.take()
            }
            _ => return,
        };
        if let Some(slot) = slot {
            let _ = self.acsocket.disconnect(slot);
        }
        if let Some(session) = self.destinations.get_mut(dest_key) {
            if let Some(tag) = session.tag.take() {
                self.tag_to_dest.remove(&tag);
            }
        }
        self.set_state(dest_key, State::Initial);
    }

    fn on_free_timeout(&mut self, dest_key: &str) {
        let evict = matches!(
            self.destinations.get(dest_key),
            Some(session) if session.state == State::Initial && session.queue.is_empty()
        );
        if evict {
            self.destinations.remove(dest_key);
        }
    }

    fn handle_socket_event(&mut self, ev: SocketEvent) {
        match ev {
            SocketEvent::Connected { user_tag, .. } => {
                if let Some(dest) = self.tag_to_dest.get(&user_tag).cloned() {
                    self.on_connected(&dest);
                }
            }
            SocketEvent::ConnectFailed { user_tag, error, .. } => {
                if let Some(dest) = self.tag_to_dest.remove(&user_tag) {
                    self.on_connect_failed(&dest, error);
                }
            }
            SocketEvent::Readable { user_tag, slot, .. } => {
                if let Some(dest) = self.tag_to_dest.get(&user_tag).cloned() {
                    self.on_readable(&dest, slot);
                }
            }
            SocketEvent::SendComplete { .. } => {}
            SocketEvent::SendFailed { user_tag, error, .. } => {
                if let Some(dest) = self.tag_to_dest.remove(&user_tag) {
                    self.on_send_failed(&dest, error);
                }
            }
            SocketEvent::Disconnected { user_tag, .. } => {
                if let Some(dest) = self.tag_to_dest.remove(&user_tag) {
                    self.on_disconnected(&dest);
                }
            }
        }
    }
}

impl ChainObject for DataObjectPool {
    fn pre_select(&mut self, registry: &mio::Registry, timeout: &mut Duration) -> io::Result<()> {
        self.acsocket.pre_select(registry, timeout)?;
        self.utimer.pre_select(registry, timeout)?;
        self.drain_fired_timers();
        Ok(())
    }

    fn post_select(&mut self, events: &Events) -> io::Result<()> {
        for ev in self.acsocket.post_select(events) {
            self.handle_socket_event(ev);
        }
        Ok(())
    }
}
