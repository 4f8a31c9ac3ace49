//! Approximate EM for a per-user emission table. The E-step replays the
//! engine over the user's history (a filtering approximation, no backward
//! smoothing), treating each day's posterior as soft state labels; the
//! M-step turns the weighted counts into frequencies and shrinks them
//! toward the immutable population baseline.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::cpt::{EmissionTable, TableSet};
use crate::dist::Distribution;
use crate::engine::ReadinessEngine;
use crate::error::EngineError;
use crate::journal::InMemoryJournal;
use crate::mapping::evidence::map_evidence;
use crate::mapping::hooper;
use crate::types::{
    DailyRecord, EvidenceInput, EvidenceValue, EvidenceVar, State, UserProfile, STATE_COUNT,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationOptions {
    pub whitelist: Vec<EvidenceVar>,
    pub shrink_k: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub min_history_days: usize,
}

impl Default for PersonalizationOptions {
    fn default() -> Self {
        Self {
            whitelist: EvidenceVar::CORE.to_vec(),
            shrink_k: 100.0,
            max_iterations: 3,
            tolerance: 1e-3,
            min_history_days: 14,
        }
    }
}

impl PersonalizationOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            whitelist: EvidenceVar::CORE.to_vec(),
            shrink_k: config.em.shrink_k,
            max_iterations: config.em.max_iterations,
            tolerance: config.em.tolerance,
            min_history_days: config.em.min_history_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationDelta {
    pub iteration: usize,
    pub l1_delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationResult {
    /// Directly substitutable as the user's emission table.
    pub table: EmissionTable,
    pub convergence: Vec<IterationDelta>,
    pub days_used: usize,
}

type Counts = HashMap<EvidenceVar, HashMap<String, [f64; STATE_COUNT]>>;
type Totals = HashMap<EvidenceVar, [f64; STATE_COUNT]>;

/// Categorical observations a day contributes to the counts: ordinal
/// scores collapse to their dominant anchor, flags count as "true".
fn observed_categories(
    evidence: &EvidenceInput,
    whitelist: &[EvidenceVar],
) -> Vec<(EvidenceVar, String)> {
    map_evidence(evidence)
        .into_iter()
        .filter_map(|(var, value)| {
            if !whitelist.contains(&var) {
                return None;
            }
            match value {
                EvidenceValue::Score(s) => {
                    let score = s.round().clamp(1.0, 7.0) as u8;
                    Some((var, hooper::dominant_anchor(var, score).to_string()))
                }
                EvidenceValue::Category(cat) => Some((var, cat)),
                EvidenceValue::Flag(true) => Some((var, "true".to_string())),
                EvidenceValue::Flag(false) => None,
            }
        })
        .collect()
}

/// Replay the whole history once with `working` as the emission table,
/// chaining each day's posterior into the next day's prior.
fn replay(
    config: &EngineConfig,
    tables: &TableSet,
    working: &EmissionTable,
    profile: &UserProfile,
    history: &[DailyRecord],
    whitelist: &[EvidenceVar],
) -> Result<(Counts, Totals), EngineError> {
    let mut replay_tables = tables.clone();
    replay_tables.emission = working.clone();
    let engine = ReadinessEngine::with_config(
        config.clone(),
        replay_tables,
        Arc::new(InMemoryJournal::new()),
    );

    let mut counts: Counts = HashMap::new();
    let mut totals: Totals = HashMap::new();
    let mut previous = Distribution::default_seed();

    for day in history {
        let mut session = engine.session(profile, day.date, Some(previous.clone()));
        session.compute_prior(&day.causal);
        let outcome = session.update(&day.evidence)?;
        let gamma = outcome.distribution;

        for (var, category) in observed_categories(&day.evidence, whitelist) {
            let row = counts
                .entry(var)
                .or_default()
                .entry(category)
                .or_insert([0.0; STATE_COUNT]);
            let state_total = totals.entry(var).or_insert([0.0; STATE_COUNT]);
            for s in State::ALL {
                row[s.index()] += gamma.get(s);
                state_total[s.index()] += gamma.get(s);
            }
        }
        previous = gamma;
    }
    Ok((counts, totals))
}

/// M-step: weighted frequencies shrunk toward the baseline with
/// `lambda = n / (n + k)`, floored and renormalized across categories
/// per (variable, state).
fn shrink_step(
    working: &EmissionTable,
    baseline: &EmissionTable,
    counts: &Counts,
    totals: &Totals,
    whitelist: &[EvidenceVar],
    shrink_k: f64,
    eps: f64,
) -> EmissionTable {
    let mut next = working.clone();
    for &var in whitelist {
        let Some(baseline_rows) = baseline.rows(var) else {
            continue;
        };
        let categories: Vec<String> = baseline_rows.keys().cloned().collect();
        let var_counts = counts.get(&var);
        let var_totals = totals.get(&var);

        // Mixed values per (category, state).
        let mut mixed: HashMap<&str, [f64; STATE_COUNT]> = HashMap::new();
        for cat in &categories {
            let baseline_row = baseline_rows[cat];
            let working_row = working
                .likelihood(var, cat)
                .copied()
                .unwrap_or(baseline_row);
            let count_row = var_counts
                .and_then(|c| c.get(cat))
                .copied()
                .unwrap_or([0.0; STATE_COUNT]);
            let mut out = [0.0; STATE_COUNT];
            for s in State::ALL {
                let i = s.index();
                let n = var_totals.map(|t| t[i]).unwrap_or(0.0);
                let learned = if n > 0.0 {
                    count_row[i] / n
                } else {
                    working_row[i]
                };
                let lambda = n / (n + shrink_k);
                out[i] = ((1.0 - lambda) * baseline_row[i] + lambda * learned).max(eps);
            }
            mixed.insert(cat.as_str(), out);
        }

        // Renormalize across categories for each state.
        for s in State::ALL {
            let i = s.index();
            let sum: f64 = mixed.values().map(|row| row[i]).sum();
            if sum <= 0.0 {
                continue;
            }
            for row in mixed.values_mut() {
                row[i] /= sum;
            }
        }
        for cat in &categories {
            next.set_row(var, cat, mixed[cat.as_str()]);
        }
    }
    next
}

fn l1_delta(old: &EmissionTable, new: &EmissionTable, whitelist: &[EvidenceVar]) -> f64 {
    let mut total = 0.0;
    let mut cells = 0usize;
    for &var in whitelist {
        let Some(old_rows) = old.rows(var) else {
            continue;
        };
        for (cat, old_row) in old_rows {
            let Some(new_row) = new.likelihood(var, cat) else {
                continue;
            };
            for i in 0..STATE_COUNT {
                total += (new_row[i] - old_row[i]).abs();
                cells += 1;
            }
        }
    }
    if cells == 0 {
        0.0
    } else {
        total / cells as f64
    }
}

/// Learn a personalized emission table for one user from chronologically
/// sorted history. Returns `InsufficientData` below the valid-day minimum
/// instead of a low-confidence table.
pub fn personalize_emission(
    config: &EngineConfig,
    tables: &TableSet,
    profile: &UserProfile,
    history: &[DailyRecord],
    opts: &PersonalizationOptions,
) -> Result<PersonalizationResult, EngineError> {
    let valid_days = history
        .iter()
        .filter(|day| !observed_categories(&day.evidence, &opts.whitelist).is_empty())
        .count();
    if valid_days < opts.min_history_days {
        return Err(EngineError::InsufficientData {
            reason: "too few days with whitelisted evidence".to_string(),
            available: valid_days,
            required: opts.min_history_days,
        });
    }

    let baseline = &tables.emission;
    let mut working = baseline.clone();
    let mut convergence = Vec::new();

    for iteration in 0..opts.max_iterations {
        let (counts, totals) = replay(config, tables, &working, profile, history, &opts.whitelist)?;
        let next = shrink_step(
            &working,
            baseline,
            &counts,
            &totals,
            &opts.whitelist,
            opts.shrink_k,
            config.epsilon,
        );
        let delta = l1_delta(&working, &next, &opts.whitelist);
        convergence.push(IterationDelta {
            iteration,
            l1_delta: delta,
        });
        tracing::info!(
            user_id = %profile.user_id,
            iteration,
            l1_delta = delta,
            "personalization iteration"
        );
        working = next;
        if delta < opts.tolerance {
            break;
        }
    }

    Ok(PersonalizationResult {
        table: working,
        convergence,
        days_used: valid_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_categories_respect_whitelist() {
        let evidence = EvidenceInput {
            fatigue_hooper: Some(7),
            resting_hr: Some("elevated".to_string()),
            ..Default::default()
        };
        let core = EvidenceVar::CORE.to_vec();
        let observed = observed_categories(&evidence, &core);
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0], (EvidenceVar::Fatigue, "high".to_string()));
    }

    #[test]
    fn shrink_with_zero_counts_returns_baseline() {
        let baseline = EmissionTable::default();
        let working = baseline.clone();
        let counts = Counts::new();
        let totals = Totals::new();
        let whitelist = vec![EvidenceVar::Fatigue];
        let next = shrink_step(&working, &baseline, &counts, &totals, &whitelist, 100.0, 1e-6);
        for cat in ["low", "medium", "high"] {
            let b = baseline.likelihood(EvidenceVar::Fatigue, cat).unwrap();
            let n = next.likelihood(EvidenceVar::Fatigue, cat).unwrap();
            for i in 0..STATE_COUNT {
                assert!((b[i] - n[i]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn shrink_converges_to_empirical_with_large_n() {
        let baseline = EmissionTable::default();
        let working = baseline.clone();
        let whitelist = vec![EvidenceVar::Appetite];
        // Huge synthetic sample: "reduced" observed with all mass on Nfor.
        let mut counts = Counts::new();
        let mut totals = Totals::new();
        let n = 1e9;
        let mut row = [0.0; STATE_COUNT];
        row[State::Nfor.index()] = n;
        counts
            .entry(EvidenceVar::Appetite)
            .or_default()
            .insert("reduced".to_string(), row);
        let mut t = [0.0; STATE_COUNT];
        t[State::Nfor.index()] = n;
        totals.insert(EvidenceVar::Appetite, t);

        let next = shrink_step(&working, &baseline, &counts, &totals, &whitelist, 100.0, 1e-6);
        let reduced = next.likelihood(EvidenceVar::Appetite, "reduced").unwrap();
        // Empirical frequency is 1.0; shrinkage weight is n/(n+100) ~ 1.
        assert!(reduced[State::Nfor.index()] > 0.99);
    }
}
