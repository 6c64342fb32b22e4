/*
 * priority_queue.rs
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

//! Bounded FIFO that orders by arrival, not priority, but decides *admission*
//! by priority: a full queue displaces the oldest lower-or-equal-priority
//! message to make room for a higher one.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Result, WebclientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Mid,
    High,
}

struct Inner<T> {
    fifo: VecDeque<(Priority, T)>,
    high_count: usize,
    mid_count: usize,
    low_count: usize,
    max_count: usize,
}

impl<T> Inner<T> {
    fn count_for(&self, p: Priority) -> usize {
        match p {
            Priority::High => self.high_count,
            Priority::Mid => self.mid_count,
            Priority::Low => self.low_count,
        }
    }

    fn bump(&mut self, p: Priority, delta: i32) {
        let counter = match p {
            Priority::High => &mut self.high_count,
            Priority::Mid => &mut self.mid_count,
            Priority::Low => &mut self.low_count,
        };
        *counter = (*counter as i32 + delta) as usize;
    }

    fn total(&self) -> usize {
        self.high_count + self.mid_count + self.low_count
    }

    /// True if displacing the oldest message is allowed to admit a message
    /// of priority `p`.
    fn may_displace_for(&self, p: Priority) -> bool {
        match p {
            Priority::High => true,
            Priority::Mid => self.high_count == 0,
            Priority::Low => self.high_count == 0 && self.mid_count == 0,
        }
    }
}

/// Bounded 3-priority FIFO. All operations are serialised under an internal
/// mutex, matching the single shared-resource story in the design document.
pub struct PriorityQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new(max_count: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                fifo: VecDeque::new(),
                high_count: 0,
                mid_count: 0,
                low_count: 0,
                max_count,
            }),
        }
    }

    /// Enqueue `msg` at priority `p`. If the queue is at capacity, the
    /// oldest eligible-to-displace message is dropped to make room; if no
    /// message is eligible, returns `Err(QueueFull)` and `msg` is dropped.
    pub fn enqueue(&self, p: Priority, msg: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.total() >= inner.max_count {
            if !inner.may_displace_for(p) {
                return Err(WebclientError::QueueFull);
            }
            if let Some((old_p, _)) = inner.fifo.pop_front() {
                inner.bump(old_p, -1);
            }
        }
        inner.fifo.push_back((p, msg));
        inner.bump(p, 1);
        Ok(())
    }

    /// Remove and return the oldest message, if any.
    pub fn dequeue(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        let (p, msg) = inner.fifo.pop_front()?;
        inner.bump(p, -1);
        Some(msg)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(high, mid, low)` counts, for invariant checks and tests.
    pub fn counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock().unwrap();
        (inner.high_count, inner.mid_count, inner.low_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s6_high_priority_displaces_oldest_low() {
        let q: PriorityQueue<&'static str> = PriorityQueue::new(3);
        q.enqueue(Priority::Low, "l1").unwrap();
        q.enqueue(Priority::Low, "l2").unwrap();
        q.enqueue(Priority::Low, "l3").unwrap();
        q.enqueue(Priority::High, "h1").unwrap();

        // "l1" was the oldest and got displaced; FIFO order is preserved
        // for what remains, so "l2" dequeues first and "h1" dequeues last.
        assert_eq!(q.len(), 3);
        assert_eq!(q.dequeue(), Some("l2"));
        assert_eq!(q.dequeue(), Some("l3"));
        assert_eq!(q.dequeue(), Some("h1"));
    }

    #[test]
    fn mid_cannot_displace_while_high_present() {
        let q: PriorityQueue<&'static str> = PriorityQueue::new(2);
        q.enqueue(Priority::High, "h1").unwrap();
        q.enqueue(Priority::Low, "l1").unwrap();
        let err = q.enqueue(Priority::Mid, "m1").unwrap_err();
        assert!(matches!(err, WebclientError::QueueFull));
    }

    #[test]
    fn low_displaces_oldest_low_when_no_higher_priority_present() {
        let q: PriorityQueue<&'static str> = PriorityQueue::new(1);
        q.enqueue(Priority::Low, "l1").unwrap();
        // No High or Mid present, so Low is still eligible to displace Low.
        q.enqueue(Priority::Low, "l2").unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.dequeue(), Some("l2"));
    }

    #[test]
    fn low_cannot_displace_mid() {
        let q: PriorityQueue<&'static str> = PriorityQueue::new(1);
        q.enqueue(Priority::Mid, "m1").unwrap();
        let err = q.enqueue(Priority::Low, "l1").unwrap_err();
        assert!(matches!(err, WebclientError::QueueFull));
    }

    #[test]
    fn counts_match_fifo_contents() {
        let q: PriorityQueue<u32> = PriorityQueue::new(10);
        q.enqueue(Priority::High, 1).unwrap();
        q.enqueue(Priority::Mid, 2).unwrap();
        q.enqueue(Priority::Mid, 3).unwrap();
        q.enqueue(Priority::Low, 4).unwrap();
        assert_eq!(q.counts(), (1, 2, 1));
        assert_eq!(q.len(), 4);
        q.dequeue();
        assert_eq!(q.counts(), (0, 2, 1));
    }
}
