//! Strongly typed identifier wrappers.
//!
//! `DoctorId` indexes the specialist arena directly (`id.index()`); the
//! 64-bit ids are monotonic counters that are never reused within a run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// The id following `self`.
            #[inline]
            pub fn next(self) -> $name {
                $name(self.0 + 1)
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a specialist in the fleet arena.
    pub struct DoctorId(u32);
}

typed_id! {
    /// Patient identity, assigned in arrival order.
    pub struct PatientId(u64);
}

typed_id! {
    /// Identity of a suspendable process owned by the scheduler.
    pub struct ProcessId(u64);
}

typed_id! {
    /// Identity of an active transient event (epidemic, disaster, weather).
    pub struct EventId(u64);
}

typed_id! {
    /// Identity of a simulation run as registered with a recorder.
    pub struct SimId(u64);
}

typed_id! {
    /// Identity of one ensemble member.
    pub struct TrajectoryId(u64);
}
