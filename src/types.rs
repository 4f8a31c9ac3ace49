use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dist::Distribution;

pub const STATE_COUNT: usize = 6;

/// Likelihood vector over the six states, indexed by `State::index`.
pub type StateVector = [f64; STATE_COUNT];

/// The six readiness states. The order is fixed; `For` is functional
/// overreaching, `Nfor` non-functional overreaching, `Ots` overtraining
/// syndrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Peak,
    WellAdapted,
    For,
    AcuteFatigue,
    Nfor,
    Ots,
}

impl State {
    pub const ALL: [State; STATE_COUNT] = [
        State::Peak,
        State::WellAdapted,
        State::For,
        State::AcuteFatigue,
        State::Nfor,
        State::Ots,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::Peak => 0,
            Self::WellAdapted => 1,
            Self::For => 2,
            Self::AcuteFatigue => 3,
            Self::Nfor => 4,
            Self::Ots => 5,
        }
    }

    /// Fixed integer weight used for the composite readiness score.
    pub fn readiness_weight(&self) -> i32 {
        match self {
            Self::Peak => 100,
            Self::WellAdapted => 85,
            Self::For => 70,
            Self::AcuteFatigue => 50,
            Self::Nfor => 30,
            Self::Ots => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::WellAdapted => "well_adapted",
            Self::For => "for",
            Self::AcuteFatigue => "acute_fatigue",
            Self::Nfor => "nfor",
            Self::Ots => "ots",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "peak" => Some(Self::Peak),
            "well_adapted" | "welladapted" => Some(Self::WellAdapted),
            "for" => Some(Self::For),
            "acute_fatigue" | "acutefatigue" => Some(Self::AcuteFatigue),
            "nfor" => Some(Self::Nfor),
            "ots" => Some(Self::Ots),
            _ => None,
        }
    }
}

/// Training-load label for one day. Labels on the wire may be Chinese or
/// English; unknown labels fall back to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum TrainingLoad {
    Rest,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl TrainingLoad {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "rest" | "休息" | "无" => Self::Rest,
            "low" | "低" => Self::Low,
            "high" | "高" => Self::High,
            "very_high" | "veryhigh" | "非常高" | "极高" => Self::VeryHigh,
            _ => Self::Medium,
        }
    }

    /// High or very-high: counts toward the streak penalty.
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High | Self::VeryHigh)
    }

    pub fn at_least_medium(&self) -> bool {
        matches!(self, Self::Medium | Self::High | Self::VeryHigh)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "female" | "f" | "女" => Self::Female,
            "male" | "m" | "男" => Self::Male,
            _ => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub gender: Gender,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, gender: Gender) -> Self {
        Self {
            user_id: user_id.into(),
            gender,
        }
    }
}

/// The fixed evidence-variable set. Unknown categories inside a known
/// variable are ignored permissively; an entirely unknown variable simply
/// never enters the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceVar {
    Fatigue,
    Soreness,
    Stress,
    SleepQuality,
    Motivation,
    Appetite,
    Energy,
    IsSick,
    IsInjured,
    MenstrualPhase,
    RestingHr,
    HrvStatus,
}

impl EvidenceVar {
    pub const ALL: [EvidenceVar; 12] = [
        EvidenceVar::Fatigue,
        EvidenceVar::Soreness,
        EvidenceVar::Stress,
        EvidenceVar::SleepQuality,
        EvidenceVar::Motivation,
        EvidenceVar::Appetite,
        EvidenceVar::Energy,
        EvidenceVar::IsSick,
        EvidenceVar::IsInjured,
        EvidenceVar::MenstrualPhase,
        EvidenceVar::RestingHr,
        EvidenceVar::HrvStatus,
    ];

    /// The subjective core set personalized by default.
    pub const CORE: [EvidenceVar; 7] = [
        EvidenceVar::Fatigue,
        EvidenceVar::Soreness,
        EvidenceVar::Stress,
        EvidenceVar::SleepQuality,
        EvidenceVar::Motivation,
        EvidenceVar::Appetite,
        EvidenceVar::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatigue => "fatigue",
            Self::Soreness => "soreness",
            Self::Stress => "stress",
            Self::SleepQuality => "sleep_quality",
            Self::Motivation => "motivation",
            Self::Appetite => "appetite",
            Self::Energy => "energy",
            Self::IsSick => "is_sick",
            Self::IsInjured => "is_injured",
            Self::MenstrualPhase => "menstrual_phase",
            Self::RestingHr => "resting_hr",
            Self::HrvStatus => "hrv_status",
        }
    }

    /// Hooper items carry a 1..7 ordinal score and go through the
    /// continuous anchor blend instead of the categorical pass.
    pub fn is_hooper(&self) -> bool {
        matches!(
            self,
            Self::Fatigue | Self::Soreness | Self::Stress | Self::SleepQuality
        )
    }
}

/// Most recently observed value for one evidence variable. Later writes
/// replace earlier ones; `Flag(false)` explicitly cancels an inherited flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum EvidenceValue {
    Score(f64),
    Flag(bool),
    Category(String),
}

pub type EvidencePool = HashMap<EvidenceVar, EvidenceValue>;

/// Causal inputs consumed by prior computation. Absent fields mean the
/// corresponding adjustment is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalInputs {
    /// Yesterday's training-load category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yesterday_load: Option<TrainingLoad>,
    /// Recent load labels, oldest first, most recent last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_loads: Vec<TrainingLoad>,
    /// Recent daily load magnitudes (arbitrary units), oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_magnitudes: Vec<f64>,
    /// Subjective 0-10 soreness proxy for the last 3 days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soreness_0_10: Option<f64>,
    /// Subjective 0-10 energy proxy for the last 3 days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_0_10: Option<f64>,
}

/// Raw same-day evidence as supplied by the request layer. All fields are
/// optional; absent means "no observation", not "observed false".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatigue_hooper: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soreness_hooper: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_hooper: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_quality_hooper: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appetite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sick: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_injured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menstrual_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resting_hr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrv_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<u32>,
}

/// One append-only history entry per posterior update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    /// Wall-clock metadata only; never used in computation.
    pub timestamp: i64,
    /// Evidence variables this call contributed, not the whole re-applied
    /// pool.
    pub applied: Vec<String>,
    pub pool_size: usize,
    pub score: i32,
    pub distribution: Distribution,
}

/// Result of a single posterior update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub score: i32,
    pub diagnosis: State,
    pub distribution: Distribution,
    pub pool_size: usize,
}

/// Everything an external storage collaborator persists per (user, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub user_id: String,
    pub date: NaiveDate,
    pub prior: Option<Distribution>,
    pub posterior: Distribution,
    pub evidence_pool: HashMap<String, EvidenceValue>,
    pub update_history: Vec<UpdateRecord>,
    pub score: i32,
    pub diagnosis: State,
}

/// One historical day for personalization replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub causal: CausalInputs,
    #[serde(default)]
    pub evidence: EvidenceInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrip() {
        for s in State::ALL {
            assert_eq!(State::parse(s.as_str()), Some(s));
        }
        assert_eq!(State::parse("unknown"), None);
    }

    #[test]
    fn readiness_weights_are_ordered_by_severity() {
        let w: Vec<i32> = State::ALL.iter().map(|s| s.readiness_weight()).collect();
        let mut sorted = w.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(w, sorted);
    }

    #[test]
    fn training_load_parses_both_languages() {
        assert_eq!(TrainingLoad::parse("高"), TrainingLoad::High);
        assert_eq!(TrainingLoad::parse("low"), TrainingLoad::Low);
        assert_eq!(TrainingLoad::parse("非常高"), TrainingLoad::VeryHigh);
        assert_eq!(TrainingLoad::parse("休息"), TrainingLoad::Rest);
        assert_eq!(TrainingLoad::parse("???"), TrainingLoad::Medium);
    }
}
