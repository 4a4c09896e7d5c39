//! `hs-core` — foundational types for the hospital patient-flow simulator.
//!
//! This crate is a dependency of every other `hs-*` crate.  It has no `hs-*`
//! dependencies and only a handful of external ones (`rand`, `thiserror`,
//! `serde`, `chrono`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `DoctorId`, `PatientId`, `ProcessId`, `EventId`, `SimId`, `TrajectoryId` |
//! | [`time`]      | `SimTime`, `SimCalendar`, `SimConfig`                      |
//! | [`rng`]       | `SimRng` (seeded, injectable)                              |
//! | [`catalog`]   | `Specialty`, `Condition` and their fixed tables            |
//! | [`error`]     | `HsError`, `HsResult`                                      |

pub mod catalog;
pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use catalog::{Condition, Specialty};
pub use error::{HsError, HsResult};
pub use ids::{DoctorId, EventId, PatientId, ProcessId, SimId, TrajectoryId};
pub use rng::SimRng;
pub use time::{SimCalendar, SimConfig, SimTime, MINUTES_PER_DAY, MINUTES_PER_HOUR};
