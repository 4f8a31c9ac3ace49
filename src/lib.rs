//! Daily readiness inference over six discrete recovery states.
//!
//! The engine computes a once-per-day prior from yesterday's posterior and
//! causal training inputs, then folds in same-day evidence (subjective
//! Hooper items, objective markers, journal flags, menstrual-cycle phase)
//! through incremental Bayesian updates. The personalization subsystem
//! learns a per-user emission table from history via approximate EM with
//! shrinkage, re-running the engine as its E-step.

pub mod config;
pub mod cpt;
pub mod dist;
pub mod engine;
pub mod error;
pub mod journal;
pub mod mapping;
pub mod personalize;
pub mod types;

pub use config::EngineConfig;
pub use cpt::{EmissionTable, TableSet};
pub use dist::Distribution;
pub use engine::{EngineSession, ReadinessEngine};
pub use error::EngineError;
pub use journal::{InMemoryJournal, JournalEntry, JournalPatch, JournalStore};
pub use mapping::cycle::{CycleParamRegistry, CycleParams};
pub use types::{
    CausalInputs, DailyRecord, DailySummary, EvidenceInput, EvidenceValue, EvidenceVar, Gender,
    State, TrainingLoad, UpdateOutcome, UpdateRecord, UserProfile,
};
