/*
 * attask.rs
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

//! One-shot millisecond-deadline callbacks in a deadline-sorted list. The
//! underlying primitive behind [`super::utimer::Utimer`]; also used directly
//! by the webclient dataobject for idle/free/retry timers.

use crate::clock::MillisTime;

pub type TaskToken = u64;

struct Item<K> {
    token: TaskToken,
    key: K,
    deadline_ms: MillisTime,
    on_fire: Box<dyn FnOnce(K)>,
    on_destroy: Box<dyn FnOnce(K)>,
}

/// Deadline-sorted list of one-shot tasks, keyed by an arbitrary `K` so
/// callers can find-and-cancel a whole family of tasks (e.g. "every timer
/// belonging to this destination") without tracking individual tokens.
pub struct AfterTaskScheduler<K> {
    items: Vec<Item<K>>,
    next_token: TaskToken,
}

impl<K: Clone> AfterTaskScheduler<K> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_token: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Insert a task firing `delay_ms` from `now_ms`. Returns a token that
    /// can be used with [`Self::remove_by_token`].
    pub fn add(
        &mut self,
        key: K,
        delay_ms: u64,
        now_ms: MillisTime,
        on_fire: impl FnOnce(K) + 'static,
        on_destroy: impl FnOnce(K) + 'static,
    ) -> TaskToken {
        let deadline_ms = now_ms.saturating_add(delay_ms);
        let token = self.next_token;
        self.next_token += 1;
        let item = Item {
            token,
            key,
            deadline_ms,
            on_fire: Box::new(on_fire),
            on_destroy: Box::new(on_destroy),
        };
        // Ties go after existing items with the same deadline.
        let idx = self
            .items
            .iter()
            .position(|it| it.deadline_ms > deadline_ms)
            .unwrap_or(self.items.len());
        self.items.insert(idx, item);
        token
    }

    /// Pop and fire every item whose deadline has passed. Returns the
    /// milliseconds until the next deadline, or `None` if the list is empty
    /// (the spec's "infinite" blocktime).
    pub fn check(&mut self, now_ms: MillisTime) -> Option<u64> {
        while let Some(first) = self.items.first() {
            if first.deadline_ms > now_ms {
                break;
            }
            let item = self.items.remove(0);
            (item.on_fire)(item.key.clone());
            (item.on_destroy)(item.key);
        }
        self.items.first().map(|it| it.deadline_ms.saturating_sub(now_ms))
    }

    /// Remove every item whose key equals `key`, calling `on_destroy` (not
    /// `on_fire`) on each. Returns how many were removed.
    pub fn remove(&mut self, key: &K) -> usize
    where
        K: PartialEq,
    {
        let mut removed = 0;
        let mut i = 0;
        while i < self.items.len() {
            if &self.items[i].key == key {
                let item = self.items.remove(i);
                (item.on_destroy)(item.key);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Remove a single task by token, calling `on_destroy`. Returns whether
    /// a task was found.
    pub fn remove_by_token(&mut self, token: TaskToken) -> bool {
        if let Some(idx) = self.items.iter().position(|it| it.token == token) {
            let item = self.items.remove(idx);
            (item.on_destroy)(item.key);
            true
        } else {
            false
        }
    }
}

impl<K: Clone> Default for AfterTaskScheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fires_in_deadline_order() {
        let fired: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let mut sched: AfterTaskScheduler<&'static str> = AfterTaskScheduler::new();

        let f1 = fired.clone();
        sched.add("late", 100, 0, move |k| f1.borrow_mut().push(k), |_| {});
        let f2 = fired.clone();
        sched.add("early", 10, 0, move |k| f2.borrow_mut().push(k), |_| {});

        let blocktime = sched.check(50);
        assert_eq!(*fired.borrow(), vec!["early"]);
        assert_eq!(blocktime, Some(50));

        sched.check(150);
        assert_eq!(*fired.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn remove_calls_on_destroy_not_on_fire() {
        let fired = Rc::new(RefCell::new(false));
        let destroyed = Rc::new(RefCell::new(false));
        let mut sched: AfterTaskScheduler<u32> = AfterTaskScheduler::new();

        let f = fired.clone();
        let d = destroyed.clone();
        sched.add(
            7,
            1000,
            0,
            move |_| *f.borrow_mut() = true,
            move |_| *d.borrow_mut() = true,
        );
        let removed = sched.remove(&7);
        assert_eq!(removed, 1);
        assert!(!*fired.borrow());
        assert!(*destroyed.borrow());
        assert!(sched.is_empty());
    }

    #[test]
    fn empty_list_reports_infinite_blocktime() {
        let mut sched: AfterTaskScheduler<u32> = AfterTaskScheduler::new();
        assert_eq!(sched.check(0), None);
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut sched: AfterTaskScheduler<u32> = AfterTaskScheduler::new();
        for i in 0..3 {
            let o = order.clone();
            sched.add(i, 10, 0, move |k| o.borrow_mut().push(k), |_| {});
        }
        sched.check(10);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
