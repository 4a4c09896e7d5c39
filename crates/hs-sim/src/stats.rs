//! Running statistics a simulation accumulates for later ensemble seeding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hs_core::Condition;

/// Completion-derived history carried in every snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Treated patients per condition.
    pub completions_by_condition: BTreeMap<Condition, u64>,
    /// Treated patients by hour of day of their arrival.
    pub arrivals_by_hour:         [u64; 24],
}

impl HistoryStats {
    pub fn record_completion(&mut self, condition: Condition, arrival_hour: usize) {
        *self.completions_by_condition.entry(condition).or_insert(0) += 1;
        if let Some(slot) = self.arrivals_by_hour.get_mut(arrival_hour) {
            *slot += 1;
        }
    }

    pub fn total_completions(&self) -> u64 {
        self.completions_by_condition.values().sum()
    }
}
