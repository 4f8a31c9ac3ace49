//! Conditional probability tables. Population-level defaults are versioned,
//! replaceable data: everything here is plain serializable structure, no
//! logic beyond lookup. The emission table is the object of personalization
//! and is a full structural copy per personalized user.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{EvidenceVar, State, StateVector, TrainingLoad, STATE_COUNT};

/// Day-to-day baseline transition, keyed by yesterday's state. Rows are
/// row-stochastic over today's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionTable {
    rows: [[f64; STATE_COUNT]; STATE_COUNT],
}

impl TransitionTable {
    pub fn row(&self, prev: State) -> &StateVector {
        &self.rows[prev.index()]
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self {
            rows: [
                // Peak
                [0.55, 0.30, 0.08, 0.05, 0.015, 0.005],
                // WellAdapted
                [0.15, 0.60, 0.12, 0.10, 0.025, 0.005],
                // For
                [0.05, 0.30, 0.40, 0.15, 0.09, 0.01],
                // AcuteFatigue
                [0.02, 0.25, 0.13, 0.40, 0.18, 0.02],
                // Nfor
                [0.005, 0.05, 0.08, 0.20, 0.56, 0.105],
                // Ots
                [0.0, 0.01, 0.02, 0.07, 0.25, 0.65],
            ],
        }
    }
}

/// Causal-factor likelihoods multiplied into the prior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalTables {
    pub training_load: HashMap<TrainingLoad, StateVector>,
    pub alcohol: StateVector,
    pub late_caffeine: StateVector,
    pub screen_before_bed: StateVector,
    /// Branch used when yesterday's load was at least medium intensity.
    pub late_meal_positive: StateVector,
    pub late_meal_negative: StateVector,
}

impl CausalTables {
    pub fn training_load_row(&self, load: TrainingLoad) -> Option<&StateVector> {
        self.training_load.get(&load)
    }
}

impl Default for CausalTables {
    fn default() -> Self {
        let mut training_load = HashMap::new();
        training_load.insert(TrainingLoad::Rest, [0.30, 0.30, 0.15, 0.10, 0.09, 0.06]);
        training_load.insert(TrainingLoad::Low, [0.28, 0.32, 0.16, 0.12, 0.08, 0.04]);
        training_load.insert(TrainingLoad::Medium, [0.20, 0.30, 0.22, 0.16, 0.08, 0.04]);
        training_load.insert(TrainingLoad::High, [0.10, 0.20, 0.28, 0.25, 0.12, 0.05]);
        training_load.insert(TrainingLoad::VeryHigh, [0.05, 0.12, 0.25, 0.32, 0.18, 0.08]);
        Self {
            training_load,
            alcohol: [0.10, 0.15, 0.20, 0.28, 0.15, 0.12],
            late_caffeine: [0.12, 0.18, 0.22, 0.26, 0.13, 0.09],
            screen_before_bed: [0.14, 0.18, 0.22, 0.24, 0.13, 0.09],
            late_meal_positive: [0.22, 0.26, 0.22, 0.16, 0.08, 0.06],
            late_meal_negative: [0.14, 0.17, 0.21, 0.26, 0.13, 0.09],
        }
    }
}

/// Emission likelihoods: for each variable, category -> P(category | state)
/// as a vector over states. For every (variable, state) the values across
/// that variable's categories sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmissionTable {
    vars: HashMap<EvidenceVar, HashMap<String, StateVector>>,
}

impl EmissionTable {
    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn likelihood(&self, var: EvidenceVar, category: &str) -> Option<&StateVector> {
        self.vars.get(&var).and_then(|rows| rows.get(category))
    }

    pub fn rows(&self, var: EvidenceVar) -> Option<&HashMap<String, StateVector>> {
        self.vars.get(&var)
    }

    pub fn set_row(&mut self, var: EvidenceVar, category: &str, row: StateVector) {
        self.vars
            .entry(var)
            .or_default()
            .insert(category.to_string(), row);
    }

    pub fn categories(&self, var: EvidenceVar) -> Vec<String> {
        self.vars
            .get(&var)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn insert_var(&mut self, var: EvidenceVar, rows: &[(&str, StateVector)]) {
        let map = rows
            .iter()
            .map(|(cat, row)| (cat.to_string(), *row))
            .collect();
        self.vars.insert(var, map);
    }
}

impl Default for EmissionTable {
    fn default() -> Self {
        let mut t = Self::empty();
        t.insert_var(
            EvidenceVar::Fatigue,
            &[
                ("low", [0.70, 0.55, 0.30, 0.10, 0.05, 0.02]),
                ("medium", [0.25, 0.35, 0.45, 0.35, 0.25, 0.18]),
                ("high", [0.05, 0.10, 0.25, 0.55, 0.70, 0.80]),
            ],
        );
        t.insert_var(
            EvidenceVar::Soreness,
            &[
                ("low", [0.65, 0.50, 0.25, 0.12, 0.08, 0.05]),
                ("medium", [0.30, 0.38, 0.45, 0.38, 0.27, 0.20]),
                ("high", [0.05, 0.12, 0.30, 0.50, 0.65, 0.75]),
            ],
        );
        t.insert_var(
            EvidenceVar::Stress,
            &[
                ("low", [0.60, 0.50, 0.35, 0.20, 0.10, 0.05]),
                ("medium", [0.32, 0.38, 0.42, 0.40, 0.30, 0.20]),
                ("high", [0.08, 0.12, 0.23, 0.40, 0.60, 0.75]),
            ],
        );
        t.insert_var(
            EvidenceVar::SleepQuality,
            &[
                ("good", [0.70, 0.55, 0.35, 0.15, 0.08, 0.04]),
                ("medium", [0.25, 0.35, 0.40, 0.40, 0.27, 0.16]),
                ("poor", [0.05, 0.10, 0.25, 0.45, 0.65, 0.80]),
            ],
        );
        t.insert_var(
            EvidenceVar::Motivation,
            &[
                ("high", [0.65, 0.50, 0.35, 0.20, 0.08, 0.03]),
                ("medium", [0.30, 0.40, 0.45, 0.45, 0.32, 0.17]),
                ("low", [0.05, 0.10, 0.20, 0.35, 0.60, 0.80]),
            ],
        );
        t.insert_var(
            EvidenceVar::Appetite,
            &[
                ("normal", [0.90, 0.85, 0.75, 0.60, 0.40, 0.25]),
                ("reduced", [0.10, 0.15, 0.25, 0.40, 0.60, 0.75]),
            ],
        );
        t.insert_var(
            EvidenceVar::Energy,
            &[
                ("high", [0.60, 0.45, 0.30, 0.12, 0.05, 0.02]),
                ("medium", [0.33, 0.42, 0.45, 0.43, 0.30, 0.18]),
                ("low", [0.07, 0.13, 0.25, 0.45, 0.65, 0.80]),
            ],
        );
        t.insert_var(
            EvidenceVar::IsSick,
            &[
                ("true", [0.03, 0.05, 0.08, 0.20, 0.35, 0.45]),
                ("false", [0.97, 0.95, 0.92, 0.80, 0.65, 0.55]),
            ],
        );
        t.insert_var(
            EvidenceVar::IsInjured,
            &[
                ("true", [0.05, 0.08, 0.12, 0.30, 0.40, 0.45]),
                ("false", [0.95, 0.92, 0.88, 0.70, 0.60, 0.55]),
            ],
        );
        t.insert_var(
            EvidenceVar::MenstrualPhase,
            &[
                ("menstrual", [0.15, 0.20, 0.25, 0.30, 0.32, 0.33]),
                ("follicular", [0.40, 0.35, 0.28, 0.22, 0.20, 0.18]),
                ("ovulation", [0.30, 0.25, 0.22, 0.18, 0.15, 0.14]),
                ("luteal", [0.15, 0.20, 0.25, 0.30, 0.33, 0.35]),
            ],
        );
        t.insert_var(
            EvidenceVar::RestingHr,
            &[
                ("normal", [0.80, 0.70, 0.55, 0.35, 0.20, 0.10]),
                ("elevated", [0.17, 0.25, 0.35, 0.45, 0.45, 0.40]),
                ("high", [0.03, 0.05, 0.10, 0.20, 0.35, 0.50]),
            ],
        );
        t.insert_var(
            EvidenceVar::HrvStatus,
            &[
                ("high", [0.45, 0.35, 0.22, 0.10, 0.05, 0.03]),
                ("normal", [0.45, 0.50, 0.48, 0.40, 0.25, 0.17]),
                ("low", [0.10, 0.15, 0.30, 0.50, 0.70, 0.80]),
            ],
        );
        t
    }
}

/// Two-key soreness x stress interaction. Pairs not present are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionTable {
    rows: HashMap<String, HashMap<String, StateVector>>,
}

impl InteractionTable {
    pub fn likelihood(&self, soreness: &str, stress: &str) -> Option<&StateVector> {
        self.rows.get(soreness).and_then(|by_stress| by_stress.get(stress))
    }
}

impl Default for InteractionTable {
    fn default() -> Self {
        let mut rows: HashMap<String, HashMap<String, StateVector>> = HashMap::new();
        let mut put = |sore: &str, stress: &str, row: StateVector| {
            rows.entry(sore.to_string())
                .or_default()
                .insert(stress.to_string(), row);
        };
        put("high", "high", [0.04, 0.08, 0.15, 0.28, 0.45, 0.60]);
        put("high", "medium", [0.08, 0.15, 0.25, 0.40, 0.45, 0.45]);
        put("medium", "high", [0.10, 0.18, 0.28, 0.40, 0.42, 0.40]);
        put("medium", "medium", [0.20, 0.30, 0.35, 0.35, 0.30, 0.25]);
        put("low", "low", [0.50, 0.45, 0.30, 0.20, 0.12, 0.08]);
        Self { rows }
    }
}

/// The full population-default table set consumed by a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSet {
    pub transition: TransitionTable,
    pub causal: CausalTables,
    pub emission: EmissionTable,
    pub interaction: InteractionTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_rows_are_stochastic() {
        let t = TransitionTable::default();
        for s in State::ALL {
            let sum: f64 = t.row(s).iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "row {:?} sums to {}", s, sum);
        }
    }

    #[test]
    fn emission_columns_sum_to_one_per_state() {
        let t = EmissionTable::default();
        for var in EvidenceVar::ALL {
            let rows = t.rows(var).expect("default table covers every var");
            for s in State::ALL {
                let sum: f64 = rows.values().map(|row| row[s.index()]).sum();
                assert!(
                    (sum - 1.0).abs() < 1e-6,
                    "{:?}/{:?} categories sum to {}",
                    var,
                    s,
                    sum
                );
            }
        }
    }

    #[test]
    fn interaction_lookup_is_permissive() {
        let t = InteractionTable::default();
        assert!(t.likelihood("high", "high").is_some());
        assert!(t.likelihood("low", "high").is_none());
    }

    #[test]
    fn emission_table_roundtrips_through_json() {
        let t = EmissionTable::default();
        let json = serde_json::to_string(&t).unwrap();
        let back: EmissionTable = serde_json::from_str(&json).unwrap();
        assert_eq!(
            t.likelihood(EvidenceVar::Fatigue, "high"),
            back.likelihood(EvidenceVar::Fatigue, "high")
        );
    }
}
