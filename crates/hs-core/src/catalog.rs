//! Fixed specialty and condition tables.
//!
//! Both enumerations are closed: routing, weighting and event overrides all
//! refer to catalog entries by variant, never by free-form string.  String
//! names are accepted only at the edges (event parameter bags, roster files)
//! through `FromStr`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::HsError;

// ── Specialty ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    Generalist,
    Emergency,
    Cardiology,
    Neurology,
    Gynecology,
    Pulmonology,
}

impl Specialty {
    pub const ALL: [Specialty; 6] = [
        Specialty::Generalist,
        Specialty::Emergency,
        Specialty::Cardiology,
        Specialty::Neurology,
        Specialty::Gynecology,
        Specialty::Pulmonology,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Specialty::Generalist  => "generalist",
            Specialty::Emergency   => "emergency",
            Specialty::Cardiology  => "cardiology",
            Specialty::Neurology   => "neurology",
            Specialty::Gynecology  => "gynecology",
            Specialty::Pulmonology => "pulmonology",
        }
    }

    /// Target share of the fleet used when sizing or growing it.
    pub fn target_share(self) -> f64 {
        match self {
            Specialty::Generalist  => 0.40,
            Specialty::Emergency   => 0.20,
            Specialty::Cardiology  => 0.10,
            Specialty::Neurology   => 0.08,
            Specialty::Gynecology  => 0.10,
            Specialty::Pulmonology => 0.12,
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Specialty {
    type Err = HsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Specialty::ALL
            .into_iter()
            .find(|sp| sp.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| HsError::UnknownSpecialty(s.to_owned()))
    }
}

// ── Condition ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    ViralInfection,
    MinorFracture,
    OpenWound,
    AsthmaAttack,
    AbdominalPain,
    AcuteBackPain,
    UrinaryInfection,
    ChestPain,
    Gastroenteritis,
    PregnantWoman,
    Stroke,
    HeartAttack,
}

impl Condition {
    pub const COUNT: usize = 12;

    /// Catalog order.  Weight vectors are indexed by `Condition::index`.
    pub const ALL: [Condition; Self::COUNT] = [
        Condition::ViralInfection,
        Condition::MinorFracture,
        Condition::OpenWound,
        Condition::AsthmaAttack,
        Condition::AbdominalPain,
        Condition::AcuteBackPain,
        Condition::UrinaryInfection,
        Condition::ChestPain,
        Condition::Gastroenteritis,
        Condition::PregnantWoman,
        Condition::Stroke,
        Condition::HeartAttack,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::ViralInfection   => "viral_infection",
            Condition::MinorFracture    => "minor_fracture",
            Condition::OpenWound        => "open_wound",
            Condition::AsthmaAttack     => "asthma_attack",
            Condition::AbdominalPain    => "abdominal_pain",
            Condition::AcuteBackPain    => "acute_back_pain",
            Condition::UrinaryInfection => "urinary_infection",
            Condition::ChestPain        => "chest_pain",
            Condition::Gastroenteritis  => "gastroenteritis",
            Condition::PregnantWoman    => "pregnant_woman",
            Condition::Stroke           => "stroke",
            Condition::HeartAttack      => "heart_attack",
        }
    }

    /// Mean treatment duration in minutes.
    pub fn mean_treatment_minutes(self) -> f64 {
        match self {
            Condition::ViralInfection   => 20.0,
            Condition::MinorFracture    => 40.0,
            Condition::OpenWound        => 25.0,
            Condition::AsthmaAttack     => 35.0,
            Condition::AbdominalPain    => 45.0,
            Condition::AcuteBackPain    => 25.0,
            Condition::UrinaryInfection => 15.0,
            Condition::ChestPain        => 40.0,
            Condition::Gastroenteritis  => 30.0,
            Condition::PregnantWoman    => 60.0,
            Condition::Stroke           => 120.0,
            Condition::HeartAttack      => 90.0,
        }
    }

    /// Specialty required to treat the condition.
    pub fn specialty(self) -> Specialty {
        match self {
            Condition::ViralInfection
            | Condition::AbdominalPain
            | Condition::AcuteBackPain
            | Condition::UrinaryInfection
            | Condition::Gastroenteritis => Specialty::Generalist,
            Condition::MinorFracture | Condition::OpenWound => Specialty::Emergency,
            Condition::AsthmaAttack => Specialty::Pulmonology,
            Condition::ChestPain | Condition::HeartAttack => Specialty::Cardiology,
            Condition::PregnantWoman => Specialty::Gynecology,
            Condition::Stroke => Specialty::Neurology,
        }
    }

    /// Relative frequency before seasonal and event adjustments.
    pub fn base_weight(self) -> f64 {
        match self {
            Condition::ViralInfection   => 25.0,
            Condition::MinorFracture    => 14.0,
            Condition::OpenWound        => 12.0,
            Condition::AsthmaAttack     => 6.0,
            Condition::AbdominalPain    => 8.0,
            Condition::AcuteBackPain    => 9.0,
            Condition::UrinaryInfection => 10.0,
            Condition::ChestPain        => 6.0,
            Condition::Gastroenteritis  => 5.0,
            Condition::PregnantWoman    => 2.0,
            Condition::Stroke           => 1.0,
            Condition::HeartAttack      => 2.0,
        }
    }

    /// Base weights in catalog order.
    pub fn base_weights() -> [f64; Self::COUNT] {
        Self::ALL.map(Condition::base_weight)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Condition {
    type Err = HsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Condition::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| HsError::UnknownCondition(s.to_owned()))
    }
}
