//! `hs-demand` — everything that shapes how many patients arrive and what
//! they arrive with.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`factors`]     | Hour / weekday / month / special-date tables, `Season`        |
//! | [`weights`]     | `ConditionWeights` (catalog-indexed, seasonal adjustment)     |
//! | [`demand`]      | `DemandModel` trait, `DemandContext`, `CalendarDemand`        |
//! | [`arrival`]     | Rate throttling, inter-arrival and treatment sampling         |
//! | [`modulator`]   | `EventModulator`, `EventParams`, `EventEffects`               |
//! | [`error`]       | `ModulatorError`, `ModulatorResult<T>`                        |
//!
//! # Rate composition
//!
//! ```text
//! raw       = base × hour × weekday × month × special_date × events.arrival
//! effective = max(1, raw × (0.7 if busy > 0.9 × active else 1))   patients / hour
//! gap       ~ Exp(mean = 60 / effective)                           minutes
//! ```
//!
//! `DemandModel` computes `raw`; [`arrival::effective_rate`] applies the
//! occupancy throttle and the floor.  The trajectory runner swaps in its own
//! `DemandModel` and reuses everything else.

pub mod arrival;
pub mod demand;
pub mod error;
pub mod factors;
pub mod modulator;
pub mod weights;


pub use demand::{CalendarDemand, DemandContext, DemandModel};
pub use error::{ModulatorError, ModulatorResult};
pub use factors::Season;
pub use modulator::{ActiveEvent, EventEffects, EventKind, EventModulator, EventParams, WeatherKind};
pub use weights::ConditionWeights;
