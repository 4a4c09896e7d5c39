//! `hs-sim` — composes the kernel and demand crates into one hospital run.
//!
//! # Dispatch loop
//!
//! ```text
//! run_until(target):
//!   while stop not requested:
//!     (t, process) = scheduler.pop_due(target) or break
//!     match process:
//!       Arrivals     → [spawn patient drawn with last effects]
//!                      effects = modulator.tick(t); rate = demand × throttle
//!                      sleep Exp(60 / rate)
//!       Journey      → route → enqueue → request → (wait) → treat → record → release
//!       Collector    → record StateSample; sleep state_interval
//!       Checkpointer → record Snapshot; sleep checkpoint_interval
//!     publish SharedCounters
//!   clock = target
//! ```
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`simulation`]  | `Simulation`, `RunOutcome`                                  |
//! | [`builder`]     | `SimulationBuilder` (fresh runs and resume)                 |
//! | [`checkpoint`]  | `Snapshot`, `CheckpointManager`                             |
//! | [`recorder`]    | `Recorder` trait, `NoopRecorder`, `MemoryRecorder`          |
//! | [`record`]      | Row types handed to recorders                               |
//! | [`stats`]       | `HistoryStats` (completion history for ensemble seeding)    |
//! | [`shared`]      | `SharedCounters`, `StopHandle`                              |
//! | [`error`]       | `SimError`, `SimResult<T>`                                  |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use hs_core::{SimConfig, SimTime};
//! use hs_sim::{MemoryRecorder, SimulationBuilder};
//!
//! let mut sim = SimulationBuilder::new(SimConfig::default(), MemoryRecorder::new()).build()?;
//! sim.run(SimTime::from_days(7.0))?;
//! println!("treated {}", sim.patients_treated());
//! ```

pub mod builder;
pub mod checkpoint;
pub mod error;
mod process;
pub mod record;
pub mod recorder;
pub mod shared;
pub mod simulation;
pub mod stats;

#[cfg(test)]
mod tests;

pub use builder::SimulationBuilder;
pub use checkpoint::{CheckpointManager, Snapshot};
pub use error::{SimError, SimResult};
pub use recorder::{MemoryRecorder, NoopRecorder, RecordError, RecordResult, Recorder};
pub use shared::{CounterReading, SharedCounters, StopHandle};
pub use simulation::{RunOutcome, Simulation};
pub use stats::HistoryStats;
