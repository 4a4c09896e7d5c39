//! `Scheduler`: virtual clock plus pending wake-ups.
//!
//! Wake-ups are kept in a `BinaryHeap` ordered by `(time, seq)`, where `seq`
//! is a submission counter.  Two wake-ups for the same instant therefore pop
//! in the order they were scheduled, which is what makes FIFO grants and
//! same-time arrivals deterministic.
//!
//! The clock only moves inside [`pop_due`][Scheduler::pop_due] and
//! [`advance_to`][Scheduler::advance_to]; it never goes backwards.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hs_core::{ProcessId, SimTime};

use crate::{KernelError, KernelResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Wakeup {
    at:      SimTime,
    seq:     u64,
    process: ProcessId,
}

// Reversed so the std max-heap pops the earliest wake-up first.
impl Ord for Wakeup {
    fn cmp(&self, other: &Self) -> Ordering {
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now:  SimTime,
    seq:  u64,
    heap: BinaryHeap<Wakeup>,
}

impl Scheduler {
    /// A scheduler whose clock starts at `start` (non-zero on resume).
    pub fn new(start: SimTime) -> Self {
        Self { now: start, seq: 0, heap: BinaryHeap::new() }
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Wake `process` at `at`.  Instants in the past are clamped to `now`.
    pub fn schedule_at(&mut self, process: ProcessId, at: SimTime) {
        let at = at.max(self.now);
        self.heap.push(Wakeup { at, seq: self.seq, process });
        self.seq += 1;
    }

    /// Wake `process` at the current instant, after everything already
    /// scheduled for it.
    pub fn schedule_now(&mut self, process: ProcessId) {
        self.schedule_at(process, self.now);
    }

    /// Suspend `process` for `minutes`.  Returns the wake instant.
    pub fn schedule_timeout(&mut self, process: ProcessId, minutes: f64) -> KernelResult<SimTime> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(KernelError::InvalidDelay(minutes));
        }
        let at = self.now.after(minutes);
        self.schedule_at(process, at);
        Ok(at)
    }

    /// Pop the earliest wake-up if it is due at or before `target`, moving
    /// the clock to its instant.
    pub fn pop_due(&mut self, target: SimTime) -> Option<(SimTime, ProcessId)> {
        if self.heap.peek()?.at > target {
            return None;
        }
        let w = self.heap.pop()?;
        self.now = w.at;
        Some((w.at, w.process))
    }

    /// Move the clock forward to `target` without dispatching anything.
    pub fn advance_to(&mut self, target: SimTime) {
        self.now = self.now.max(target);
    }
}
