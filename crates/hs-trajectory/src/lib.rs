//! `hs-trajectory` — what-if ensembles seeded from a base simulation.
//!
//! A base simulation that has run for at least 30 simulated days carries a
//! history (completions per condition, arrivals per hour of day).  The
//! ensemble runner draws perturbed parameters for each member, runs every
//! member forward from the base's last instant with a demand model shaped by
//! that history, and records hourly aggregate samples per member.
//!
//! # Crate layout
//!
//! | Module        | Contents                                               |
//! |---------------|--------------------------------------------------------|
//! | [`stats`]     | `BaseStatistics`, `MIN_BASE_DAYS`                      |
//! | [`params`]    | `EnsembleConfig`, `TrajectoryParams`                   |
//! | [`demand`]    | `TrajectoryDemand` (a `DemandModel`)                   |
//! | [`ensemble`]  | `EnsembleRunner`, `EnsembleReport`, `MemberResult`     |
//! | [`error`]     | `TrajectoryError`, `TrajectoryResult<T>`               |
//!
//! # Features
//!
//! | Feature    | Effect                                  |
//! |------------|-----------------------------------------|
//! | `parallel` | Members run on Rayon's thread pool      |
//!
//! # Usage
//!
//! ```rust,ignore
//! let base = BaseStatistics::load(&recorder, sim_id)?;
//! let report = EnsembleRunner::new(EnsembleConfig::default()).run(&base, &mut recorder)?;
//! ```

pub mod demand;
pub mod ensemble;
pub mod error;
pub mod params;
pub mod stats;


pub use demand::TrajectoryDemand;
pub use ensemble::{EnsembleReport, EnsembleRunner, MemberResult, MemberSample};
pub use error::{TrajectoryError, TrajectoryResult};
pub use params::{EnsembleConfig, TrajectoryParams};
pub use stats::{BaseStatistics, MIN_BASE_DAYS};
