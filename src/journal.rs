//! Per-user, per-day journal. Short-term behaviors live for exactly one
//! day; persistent status carries forward until explicitly cancelled;
//! training context is plain same-day metadata.

use std::collections::HashMap;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::TrainingLoad;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortTermBehaviors {
    pub alcohol: bool,
    pub late_caffeine: bool,
    pub screen_before_bed: bool,
    pub late_meal: bool,
}

impl ShortTermBehaviors {
    pub fn any(&self) -> bool {
        self.alcohol || self.late_caffeine || self.screen_before_bed || self.late_meal
    }
}

/// Per-flag tri-state: `None` means nothing recorded for the day,
/// `Some(true)` an active flag, `Some(false)` an explicit cancellation.
/// The distinction is what lets a recorded `false` beat carry-forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sick: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_injured: Option<bool>,
    /// `Some("none")` is the explicit end-of-phase marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menstrual_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_work_stress: Option<bool>,
}

fn phase_cleared(label: &str) -> bool {
    matches!(label.trim().to_lowercase().as_str(), "none" | "无")
}

impl PersistentStatus {
    pub fn sick(&self) -> bool {
        self.is_sick == Some(true)
    }

    pub fn injured(&self) -> bool {
        self.is_injured == Some(true)
    }

    pub fn work_stressed(&self) -> bool {
        self.high_work_stress == Some(true)
    }

    /// The phase label, unless absent or explicitly cleared.
    pub fn active_phase(&self) -> Option<&str> {
        self.menstrual_phase
            .as_deref()
            .filter(|p| !phase_cleared(p))
    }

    pub fn any_active(&self) -> bool {
        self.sick() || self.injured() || self.active_phase().is_some() || self.work_stressed()
    }

    /// Carry yesterday's record into today: a value recorded today wins,
    /// including an explicit `Some(false)`; unrecorded fields inherit. An
    /// explicit end-of-phase marker drops the carried phase.
    pub fn carried_into(&self, today: &PersistentStatus) -> PersistentStatus {
        PersistentStatus {
            is_sick: today.is_sick.or(self.is_sick),
            is_injured: today.is_injured.or(self.is_injured),
            menstrual_phase: match today.menstrual_phase.as_deref() {
                Some(p) if phase_cleared(p) => None,
                Some(_) => today.menstrual_phase.clone(),
                None => self.menstrual_phase.clone(),
            },
            high_work_stress: today.high_work_stress.or(self.high_work_stress),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<TrainingLoad>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_fatigue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default)]
    pub short_term: ShortTermBehaviors,
    #[serde(default)]
    pub persistent: PersistentStatus,
    #[serde(default)]
    pub training: TrainingContext,
}

/// Partial update; `Some` replaces the whole sub-record, `None` leaves it
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_term: Option<ShortTermBehaviors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<PersistentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingContext>,
}

/// The only storage contract the engine needs: read the previous day,
/// write the current day. Any persistent key-value or relational backend
/// can implement this.
pub trait JournalStore: Send + Sync {
    fn get(&self, user_id: &str, date: NaiveDate) -> Option<JournalEntry>;
    fn upsert(&self, user_id: &str, date: NaiveDate, patch: JournalPatch);
}

#[derive(Debug, Default)]
pub struct InMemoryJournal {
    entries: RwLock<HashMap<(String, NaiveDate), JournalEntry>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JournalStore for InMemoryJournal {
    fn get(&self, user_id: &str, date: NaiveDate) -> Option<JournalEntry> {
        self.entries
            .read()
            .get(&(user_id.to_string(), date))
            .cloned()
    }

    fn upsert(&self, user_id: &str, date: NaiveDate, patch: JournalPatch) {
        let mut entries = self.entries.write();
        let entry = entries
            .entry((user_id.to_string(), date))
            .or_default();
        if let Some(short_term) = patch.short_term {
            entry.short_term = short_term;
        }
        if let Some(persistent) = patch.persistent {
            entry.persistent = persistent;
        }
        if let Some(training) = patch.training {
            entry.training = training;
        }
    }
}
