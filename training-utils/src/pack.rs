use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::PlanTier;

/// A curated bundle of drills, from the read-only catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pack {
    pub id: String,
    pub title: String,
    /// The pack's current drills. Catalogs change, so progress is always measured against this.
    pub drill_ids: Vec<String>,
    #[serde(default)]
    pub min_plan: PlanTier,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackProgressEntry {
    #[serde(default)]
    pub completed_drill_ids: BTreeSet<String>,
    /// Set by the first completed drill and never cleared.
    #[serde(default)]
    pub last_started_at: Option<DateTime<Utc>>,
}

impl PackProgressEntry {
    /// Returns whether the drill was newly completed.
    pub fn complete_drill(&mut self, drill_id: &str, now: DateTime<Utc>) -> bool {
        if self.last_started_at.is_none() {
            self.last_started_at = Some(now);
        }
        self.completed_drill_ids.insert(drill_id.to_string())
    }

    /// Union of completions; the earlier of the two start times.
    pub fn merge(&self, other: &PackProgressEntry) -> PackProgressEntry {
        PackProgressEntry {
            completed_drill_ids: self
                .completed_drill_ids
                .union(&other.completed_drill_ids)
                .cloned()
                .collect(),
            last_started_at: match (self.last_started_at, other.last_started_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}
