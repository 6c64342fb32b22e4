/*
 * clock.rs
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

//! Monotonic millisecond clock. Everything in the reactor (attask deadlines,
//! retry backoff, idle/free timers) is expressed in milliseconds since an
//! arbitrary but fixed epoch (process start), never wall-clock time.

use std::time::{Duration, Instant};

/// A point in time expressed as milliseconds since the clock's epoch.
pub type MillisTime = u64;

/// Monotonic clock anchored at construction time. One instance is normally
/// shared (via the chain) by every component that needs `now_ms()`.
#[derive(Debug, Clone)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Milliseconds elapsed since this clock was created.
    pub fn now_ms(&self) -> MillisTime {
        self.epoch.elapsed().as_millis() as MillisTime
    }

    /// `now_ms() + delay_ms`, saturating instead of overflowing.
    pub fn deadline_ms(&self, delay_ms: u64) -> MillisTime {
        self.now_ms().saturating_add(delay_ms)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking sleep, used only by [`crate::sync_transfer`] which is explicitly
/// allowed to block (it does not participate in the chain).
pub fn sleep(d: Duration) {
    std::thread::sleep(d);
}
