//! `hs-kernel` — the discrete-event core: scheduler, specialists, routing.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`scheduler`]   | `Scheduler` (min-heap of `(time, seq)` wake-ups)          |
//! | [`specialist`]  | `Specialist` capacity-1 resource, `Grant`                 |
//! | [`fleet`]       | `Fleet` arena, `DoctorState`, fleet composition           |
//! | [`patient`]     | `Patient` record                                          |
//! | [`routing`]     | `RoutingPolicy` trait, `ShortestQueue`                    |
//! | [`roster`]      | `load_roster_csv`, `load_roster_reader`                   |
//! | [`error`]       | `KernelError`, `KernelResult<T>`                          |
//!
//! # Dispatch model (summary)
//!
//! ```text
//! loop:
//!   (t, process) = scheduler.pop_due(target)?    // earliest, FIFO on ties
//!   clock = t
//!   resume process → it either
//!       schedule_timeout(d)          → wake at t + d
//!       specialist.request(process)  → Granted (continue) | Queued (wait)
//!       specialist.release(process)  → head waiter woken at t
//!       finishes
//! ```
//!
//! Nothing in this crate knows about arrivals or patients' journeys; those
//! state machines live in `hs-sim` and drive the primitives here.

pub mod error;
pub mod fleet;
pub mod patient;
pub mod roster;
pub mod routing;
pub mod scheduler;
pub mod specialist;

#[cfg(test)]
mod tests;

pub use error::{KernelError, KernelResult};
pub use fleet::{DoctorState, Fleet, composition};
pub use patient::Patient;
pub use roster::{load_roster_csv, load_roster_reader};
pub use routing::{RoutingPolicy, ShortestQueue};
pub use scheduler::Scheduler;
pub use specialist::{Grant, Specialist};
