//! Repeating timers on a min-heap of deadlines.
//!
//! The wheel is plain data: it never reads the clock itself, callers pass
//! `now` in. That keeps it deterministic under test and lets the worker
//! thread decide how long to sleep.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashMap},
    time::{Duration, Instant},
};

/// Handle for one repeating timer. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

struct Deadline {
    at: Instant,
    // Tie-breaker so timers due at the same instant fire in insertion order
    seq: u64,
    id: TimerId,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

struct Timer<T> {
    interval: Duration,
    payload: T,
}

/// A set of repeating timers, each carrying a payload handed back on fire.
///
/// Cancelled timers are dropped from the index immediately; their stale
/// heap entries are skipped lazily when they reach the top.
pub struct TimerWheel<T> {
    heap: BinaryHeap<Reverse<Deadline>>,
    timers: HashMap<TimerId, Timer<T>>,
    seq: u64,
}

impl<T: Clone> TimerWheel<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            timers: HashMap::new(),
            seq: 0,
        }
    }

    /// Arm a timer that first fires at `first` and then every `interval`.
    ///
    /// Re-inserting a live id replaces its interval and payload but keeps a
    /// single schedule.
    pub fn insert(&mut self, id: TimerId, first: Instant, interval: Duration, payload: T) {
        let fresh = self
            .timers
            .insert(id, Timer { interval, payload })
            .is_none();
        if fresh {
            self.push(id, first);
        }
    }

    /// Disarm a timer. Returns false if it was not armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest deadline among armed timers.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_stale();
        self.heap.peek().map(|Reverse(d)| d.at)
    }

    /// Fire every timer due at or before `now`, in deadline order.
    ///
    /// Each fired timer is re-armed one interval after its deadline. A timer
    /// that fell more than an interval behind skips the missed firings
    /// instead of bursting to catch up. No timer fires twice in one call.
    pub fn pop_due(&mut self, now: Instant) -> Vec<(TimerId, T)> {
        let mut fired = Vec::new();
        let mut rearm = Vec::new();
        loop {
            self.discard_stale();
            let due = match self.heap.peek() {
                Some(Reverse(d)) => d.at <= now,
                None => false,
            };
            if !due {
                break;
            }
            let Some(Reverse(deadline)) = self.heap.pop() else {
                break;
            };
            let Some(timer) = self.timers.get(&deadline.id) else {
                continue;
            };

            fired.push((deadline.id, timer.payload.clone()));

            let mut next = deadline.at + timer.interval;
            if next <= now {
                next = now + timer.interval;
            }
            rearm.push((deadline.id, next));
        }
        for (id, at) in rearm {
            self.push(id, at);
        }
        fired
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.heap.clear();
    }

    fn push(&mut self, id: TimerId, at: Instant) {
        self.seq = self.seq.wrapping_add(1);
        self.heap.push(Reverse(Deadline {
            at,
            seq: self.seq,
            id,
        }));
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse(d)) = self.heap.peek() {
            if self.timers.contains_key(&d.id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<T: Clone> Default for TimerWheel<T> {
    fn default() -> Self {
        Self::new()
    }
}
