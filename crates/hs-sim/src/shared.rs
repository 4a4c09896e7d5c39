//! Lock-free counters and a stop flag shared with other threads.
//!
//! A simulation publishes its aggregate counters after every dispatch; a
//! driver thread may poll them while the run continues.  The stop flag is
//! checked between dispatches, so a stop request lands at a consistent
//! event boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use hs_core::SimTime;

#[derive(Debug, Default)]
struct Counters {
    created:    AtomicU64,
    treated:    AtomicU64,
    busy:       AtomicUsize,
    waiting:    AtomicUsize,
    clock_bits: AtomicU64,
}

/// Cheap-to-clone handle on a simulation's published counters.
#[derive(Clone, Debug, Default)]
pub struct SharedCounters(Arc<Counters>);

/// A consistent-enough read of [`SharedCounters`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CounterReading {
    pub created: u64,
    pub treated: u64,
    pub busy:    usize,
    pub waiting: usize,
    pub clock:   SimTime,
}

impl SharedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, r: CounterReading) {
        self.0.created.store(r.created, Ordering::Relaxed);
        self.0.treated.store(r.treated, Ordering::Relaxed);
        self.0.busy.store(r.busy, Ordering::Relaxed);
        self.0.waiting.store(r.waiting, Ordering::Relaxed);
        self.0.clock_bits.store(r.clock.0.to_bits(), Ordering::Release);
    }

    pub fn read(&self) -> CounterReading {
        let clock = SimTime(f64::from_bits(self.0.clock_bits.load(Ordering::Acquire)));
        CounterReading {
            created: self.0.created.load(Ordering::Relaxed),
            treated: self.0.treated.load(Ordering::Relaxed),
            busy:    self.0.busy.load(Ordering::Relaxed),
            waiting: self.0.waiting.load(Ordering::Relaxed),
            clock,
        }
    }
}

/// Request an early, graceful stop from another thread.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
