/*
 * utimer.rs
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

//! Chain object wrapping [`AfterTaskScheduler`] in the `pre_select` /
//! `post_select` contract: on every tick it fires whatever is due and
//! reports how much longer the chain may safely block.
//!
//! Timers are only ever added from within the chain thread (in reaction to
//! another chain object's callback in the same tick), so the next
//! `pre_select` always sees a fresh deadline — there is no dedicated fd to
//! register and `post_select` is a no-op.

use std::io;
use std::time::Duration;

use mio::Events;

use crate::clock::{Clock, MillisTime};
use crate::reactor::attask::{AfterTaskScheduler, TaskToken};
use crate::reactor::chain::ChainObject;

/// Millisecond timers driven by the chain's tick. `K` identifies which
/// subsystem owns a given timer (e.g. a destination key) so a whole family
/// can be cancelled with [`Utimer::cancel_all`].
pub struct Utimer<K: Clone> {
    scheduler: AfterTaskScheduler<K>,
    clock: Clock,
}

impl<K: Clone + PartialEq> Utimer<K> {
    pub fn new(clock: Clock) -> Self {
        Self {
            scheduler: AfterTaskScheduler::new(),
            clock,
        }
    }

    /// Schedule `on_fire` to run `delay_ms` from now. `on_destroy` runs
    /// instead if the timer is cancelled before it fires.
    pub fn schedule(
        &mut self,
        key: K,
        delay_ms: u64,
        on_fire: impl FnOnce(K) + 'static,
        on_destroy: impl FnOnce(K) + 'static,
    ) -> TaskToken {
        let now = self.clock.now_ms();
        self.scheduler.add(key, delay_ms, now, on_fire, on_destroy)
    }

    pub fn cancel(&mut self, token: TaskToken) -> bool {
        self.scheduler.remove_by_token(token)
    }

    pub fn cancel_all(&mut self, key: &K) -> usize {
        self.scheduler.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.scheduler.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scheduler.len()
    }

    fn now_ms(&self) -> MillisTime {
        self.clock.now_ms()
    }
}

impl<K: Clone + PartialEq> ChainObject for Utimer<K> {
    fn pre_select(&mut self, _registry: &mio::Registry, timeout: &mut Duration) -> io::Result<()> {
        let now = self.now_ms();
        if let Some(blocktime_ms) = self.scheduler.check(now) {
            *timeout = (*timeout).min(Duration::from_millis(blocktime_ms));
        }
        Ok(())
    }

    fn post_select(&mut self, _events: &Events) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fires_after_check_with_time_advanced() {
        let clock = Clock::new();
        let mut utimer: Utimer<&'static str> = Utimer::new(clock.clone());
        let fired = Rc::new(RefCell::new(false));
        let f = fired.clone();
        utimer.schedule("retry", 0, move |_| *f.borrow_mut() = true, |_| {});

        let mut registry_timeout = Duration::from_secs(5);
        // mio::Registry has no public constructor outside Poll, so exercise
        // the scheduler directly through check() semantics via pre_select's
        // internal call path is covered by attask's own tests; here we only
        // assert the timeout shrinks and the timer is gone after it fires.
        let poll = mio::Poll::new().unwrap();
        utimer
            .pre_select(poll.registry(), &mut registry_timeout)
            .unwrap();
        assert!(*fired.borrow());
        assert!(utimer.is_empty());
    }

    #[test]
    fn cancel_all_removes_family() {
        let clock = Clock::new();
        let mut utimer: Utimer<&'static str> = Utimer::new(clock);
        utimer.schedule("dest-a", 10_000, |_| {}, |_| {});
        utimer.schedule("dest-a", 20_000, |_| {}, |_| {});
        utimer.schedule("dest-b", 10_000, |_| {}, |_| {});
        assert_eq!(utimer.cancel_all(&"dest-a"), 2);
        assert_eq!(utimer.len(), 1);
    }
}
