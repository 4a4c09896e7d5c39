//! Transient events that modulate demand for a bounded time.
//!
//! # Composition
//!
//! Active events are visited in insertion order (ids are monotonic) and
//! folded into one [`EventEffects`]:
//!
//! | Effect             | Composition                                        |
//! |--------------------|----------------------------------------------------|
//! | arrival factor     | product across events                              |
//! | treatment factor   | product across events                              |
//! | weight overrides   | per condition, the last event visited wins         |
//!
//! Overrides do not compound: two concurrent epidemics on the same condition
//! leave a single factor, the later event's.
//!
//! An event is active on `[start, expires)`; it is pruned by the first
//! [`tick`][EventModulator::tick] at or after `expires`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hs_core::{Condition, EventId, SimTime};

use crate::{ModulatorError, ModulatorResult};

pub const DEFAULT_DURATION_MINUTES: f64 = 1_440.0;

// ── Kinds and parameters ──────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Epidemic,
    Disaster,
    Weather,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Epidemic => "epidemic",
            EventKind::Disaster => "disaster",
            EventKind::Weather  => "weather",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = ModulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "epidemic" => Ok(EventKind::Epidemic),
            "disaster" => Ok(EventKind::Disaster),
            "weather"  => Ok(EventKind::Weather),
            other      => Err(ModulatorError::UnknownKind(other.to_owned())),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Cold,
    Heat,
    Storm,
}

impl FromStr for WeatherKind {
    type Err = ModulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cold"  => Ok(WeatherKind::Cold),
            "heat"  => Ok(WeatherKind::Heat),
            "storm" => Ok(WeatherKind::Storm),
            other   => Err(ModulatorError::UnknownWeather(other.to_owned())),
        }
    }
}

/// Validated, typed event parameters.  The variant determines the kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventParams {
    Epidemic {
        arrival_factor:        f64,
        disease:               Condition,
        disease_factor:        f64,
        treatment_time_factor: f64,
    },
    Disaster {
        arrival_factor:  f64,
        fracture_factor: f64,
    },
    Weather {
        weather_type: WeatherKind,
    },
}

impl EventParams {
    pub fn kind(&self) -> EventKind {
        match self {
            EventParams::Epidemic { .. } => EventKind::Epidemic,
            EventParams::Disaster { .. } => EventKind::Disaster,
            EventParams::Weather { .. }  => EventKind::Weather,
        }
    }

    /// Parse and validate a loosely typed parameter bag.
    ///
    /// Missing or `null` fields take their defaults; a `null` bag is treated
    /// as an empty one.  Factors must be positive and finite, names must be known.
    /// Unrecognised keys are ignored.
    pub fn from_bag(kind: EventKind, bag: &Value) -> ModulatorResult<Self> {
        let empty = Map::new();
        let map = match bag {
            Value::Object(m) => m,
            Value::Null => &empty,
            _ => return Err(ModulatorError::NotAnObject { kind: kind.name() }),
        };
        let k = kind.name();

        Ok(match kind {
            EventKind::Epidemic => EventParams::Epidemic {
                arrival_factor:        factor(map, k, "arrival_factor", 1.5)?,
                disease:               condition(map, "disease", Condition::ViralInfection)?,
                disease_factor:        factor(map, k, "disease_factor", 3.0)?,
                treatment_time_factor: factor(map, k, "treatment_time_factor", 1.2)?,
            },
            EventKind::Disaster => EventParams::Disaster {
                arrival_factor:  factor(map, k, "arrival_factor", 2.0)?,
                fracture_factor: factor(map, k, "fracture_factor", 4.0)?,
            },
            EventKind::Weather => {
                let weather_type = match map.get("weather_type") {
                    None | Some(Value::Null) => WeatherKind::Storm,
                    Some(Value::String(s)) => s.parse()?,
                    Some(other) => {
                        return Err(ModulatorError::InvalidField {
                            kind:   k,
                            field:  "weather_type",
                            reason: format!("expected a string, got {other}"),
                        });
                    }
                };
                EventParams::Weather { weather_type }
            }
        })
    }

    /// Fold this event's contribution into `effects`.
    fn apply_to(&self, effects: &mut EventEffects) {
        match *self {
            EventParams::Epidemic { arrival_factor, disease, disease_factor, treatment_time_factor } => {
                effects.arrival_factor *= arrival_factor;
                effects.weight_overrides.insert(disease, disease_factor);
                effects.treatment_factor *= treatment_time_factor;
            }
            EventParams::Disaster { arrival_factor, fracture_factor } => {
                effects.arrival_factor *= arrival_factor;
                effects.weight_overrides.insert(Condition::MinorFracture, fracture_factor);
            }
            EventParams::Weather { weather_type } => match weather_type {
                WeatherKind::Cold => {
                    effects.weight_overrides.insert(Condition::ViralInfection, 2.0);
                }
                WeatherKind::Heat => effects.arrival_factor *= 1.2,
                WeatherKind::Storm => effects.arrival_factor *= 0.8,
            },
        }
    }
}

fn factor(map: &Map<String, Value>, kind: &'static str, field: &'static str, default: f64) -> ModulatorResult<f64> {
    let Some(v) = map.get(field).filter(|v| !v.is_null()) else {
        return Ok(default);
    };
    let x = v.as_f64().ok_or_else(|| ModulatorError::InvalidField {
        kind,
        field,
        reason: format!("expected a number, got {v}"),
    })?;
    if !x.is_finite() || x <= 0.0 {
        return Err(ModulatorError::InvalidField {
            kind,
            field,
            reason: format!("must be positive and finite, got {x}"),
        });
    }
    Ok(x)
}

fn condition(map: &Map<String, Value>, field: &'static str, default: Condition) -> ModulatorResult<Condition> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => s
            .parse::<Condition>()
            .map_err(|_| ModulatorError::UnknownCondition(s.clone())),
        Some(other) => Err(ModulatorError::InvalidField {
            kind:   "epidemic",
            field,
            reason: format!("expected a condition name, got {other}"),
        }),
    }
}

// ── Active events and their composition ───────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub id:      EventId,
    pub params:  EventParams,
    pub start:   SimTime,
    pub expires: SimTime,
}

impl ActiveEvent {
    pub fn kind(&self) -> EventKind {
        self.params.kind()
    }

    #[inline]
    pub fn is_active_at(&self, now: SimTime) -> bool {
        now < self.expires
    }
}

/// Composed effect of every event active at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEffects {
    pub arrival_factor:   f64,
    pub treatment_factor: f64,
    pub weight_overrides: BTreeMap<Condition, f64>,
}

impl Default for EventEffects {
    fn default() -> Self {
        Self {
            arrival_factor:   1.0,
            treatment_factor: 1.0,
            weight_overrides: BTreeMap::new(),
        }
    }
}

impl EventEffects {
    pub fn is_neutral(&self) -> bool {
        self.arrival_factor == 1.0 && self.treatment_factor == 1.0 && self.weight_overrides.is_empty()
    }
}

// ── EventModulator ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct EventModulator {
    events:  BTreeMap<EventId, ActiveEvent>,
    next_id: u64,
}

impl EventModulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot.  `next_id` is raised past every restored id
    /// so new events never collide with old ones.
    pub fn restore(events: Vec<ActiveEvent>, next_id: EventId) -> Self {
        let max_seen = events.iter().map(|e| e.id.0 + 1).max().unwrap_or(0);
        Self {
            next_id: next_id.0.max(max_seen),
            events:  events.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Activate validated parameters on `[now, now + duration_minutes)`.
    pub fn add(&mut self, params: EventParams, duration_minutes: f64, now: SimTime) -> ModulatorResult<ActiveEvent> {
        if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
            return Err(ModulatorError::InvalidDuration(duration_minutes));
        }
        let event = ActiveEvent {
            id:      EventId(self.next_id),
            params,
            start:   now,
            expires: now.after(duration_minutes),
        };
        self.next_id += 1;
        log::info!(
            "event {} ({}) active from {} until {}",
            event.id,
            event.kind(),
            event.start,
            event.expires
        );
        self.events.insert(event.id, event.clone());
        Ok(event)
    }

    /// Remove events with `expires <= now`, returning them.
    pub fn prune(&mut self, now: SimTime) -> Vec<ActiveEvent> {
        let expired: Vec<EventId> = self
            .events
            .values()
            .filter(|e| !e.is_active_at(now))
            .map(|e| e.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.events.remove(&id))
            .inspect(|e| log::info!("event {} ({}) expired at {now}", e.id, e.kind()))
            .collect()
    }

    /// Prune expired events, then compose the survivors.
    pub fn tick(&mut self, now: SimTime) -> EventEffects {
        self.prune(now);
        self.effects_at(now)
    }

    /// Compose the events active at `now` without mutating the set.
    pub fn effects_at(&self, now: SimTime) -> EventEffects {
        let mut effects = EventEffects::default();
        for event in self.events.values().filter(|e| e.is_active_at(now)) {
            event.params.apply_to(&mut effects);
        }
        effects
    }

    pub fn active(&self) -> impl Iterator<Item = &ActiveEvent> {
        self.events.values()
    }

    pub fn get(&self, id: EventId) -> Option<&ActiveEvent> {
        self.events.get(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Id the next added event will receive.
    pub fn next_id(&self) -> EventId {
        EventId(self.next_id)
    }

    pub fn snapshot(&self) -> Vec<ActiveEvent> {
        self.events.values().cloned().collect()
    }
}
