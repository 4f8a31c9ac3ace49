//! The readiness engine: per-(user, date) sessions computing a once-a-day
//! prior from yesterday's posterior and causal inputs, then folding in
//! same-day evidence incrementally.

pub mod acwr;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::cpt::{EmissionTable, TableSet};
use crate::dist::Distribution;
use crate::error::EngineError;
use crate::journal::{JournalPatch, JournalStore, PersistentStatus, ShortTermBehaviors};
use crate::mapping::cycle::{self, CycleParamRegistry, CycleParams};
use crate::mapping::evidence::{map_evidence, phase_category};
use crate::mapping::hooper;
use crate::types::{
    CausalInputs, DailySummary, EvidenceInput, EvidencePool, EvidenceValue, EvidenceVar, Gender,
    State, TrainingLoad, UpdateOutcome, UpdateRecord, UserProfile, STATE_COUNT,
};

/// Owner of the population tables, per-user personalized-table registry,
/// cycle-parameter registry, and the journal. Sessions snapshot what they
/// need at creation, so a registry write never disturbs a running session.
pub struct ReadinessEngine {
    config: EngineConfig,
    tables: Arc<TableSet>,
    personalized: RwLock<HashMap<String, Arc<EmissionTable>>>,
    cycle_registry: CycleParamRegistry,
    journal: Arc<dyn JournalStore>,
}

impl ReadinessEngine {
    pub fn new(journal: Arc<dyn JournalStore>) -> Self {
        Self::with_config(EngineConfig::default(), TableSet::default(), journal)
    }

    pub fn with_config(
        config: EngineConfig,
        tables: TableSet,
        journal: Arc<dyn JournalStore>,
    ) -> Self {
        Self {
            config,
            tables: Arc::new(tables),
            personalized: RwLock::new(HashMap::new()),
            cycle_registry: CycleParamRegistry::new(),
            journal,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn journal(&self) -> &Arc<dyn JournalStore> {
        &self.journal
    }

    pub fn cycle_registry(&self) -> &CycleParamRegistry {
        &self.cycle_registry
    }

    /// Install a personalized emission table for a user. Sessions created
    /// afterwards for that user use it; running sessions are unaffected.
    pub fn set_personalized_table(&self, user_id: &str, table: EmissionTable) {
        self.personalized
            .write()
            .insert(user_id.to_string(), Arc::new(table));
        tracing::info!(user_id, "personalized emission table installed");
    }

    pub fn personalized_table(&self, user_id: &str) -> Option<Arc<EmissionTable>> {
        self.personalized.read().get(user_id).cloned()
    }

    pub fn clear_personalized_table(&self, user_id: &str) {
        self.personalized.write().remove(user_id);
    }

    /// Open a session for one (user, date). `previous` seeds the prior
    /// computation; absent means the default population seed.
    pub fn session(
        &self,
        profile: &UserProfile,
        date: NaiveDate,
        previous: Option<Distribution>,
    ) -> EngineSession {
        EngineSession {
            user_id: profile.user_id.clone(),
            date,
            gender: profile.gender,
            config: self.config.clone(),
            tables: Arc::clone(&self.tables),
            emission_override: self.personalized_table(&profile.user_id),
            cycle_params: self.cycle_registry.resolve(&profile.user_id),
            journal: Arc::clone(&self.journal),
            previous: previous.unwrap_or_else(Distribution::default_seed).normalized(),
            prior: None,
            posterior: None,
            pool: EvidencePool::new(),
            cycle_day: None,
            cycle_length: None,
            history: Vec::new(),
        }
    }
}

/// One user-day of inference. `compute_prior` is callable exactly once
/// (repeats return the cached result); `update` any number of times after
/// that, each call refining the posterior.
pub struct EngineSession {
    user_id: String,
    date: NaiveDate,
    gender: Gender,
    config: EngineConfig,
    tables: Arc<TableSet>,
    emission_override: Option<Arc<EmissionTable>>,
    cycle_params: CycleParams,
    journal: Arc<dyn JournalStore>,
    previous: Distribution,
    prior: Option<Distribution>,
    posterior: Option<Distribution>,
    pool: EvidencePool,
    cycle_day: Option<u32>,
    cycle_length: Option<u32>,
    history: Vec<UpdateRecord>,
}

impl EngineSession {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn prior(&self) -> Option<&Distribution> {
        self.prior.as_ref()
    }

    pub fn posterior(&self) -> Option<&Distribution> {
        self.posterior.as_ref()
    }

    fn emission(&self) -> &EmissionTable {
        self.emission_override
            .as_deref()
            .unwrap_or(&self.tables.emission)
    }

    /// Write a journal patch for this session's day. The request layer
    /// calls this with `journal_today` payload fields before updating.
    pub fn record_journal(&self, patch: JournalPatch) {
        self.journal.upsert(&self.user_id, self.date, patch);
    }

    /// Compute today's prior from yesterday's posterior and causal inputs.
    /// Single pass, idempotent: the second call returns the cached result
    /// and repeats none of the journal side effects.
    pub fn compute_prior(&mut self, causal: &CausalInputs) -> Distribution {
        if let Some(prior) = &self.prior {
            return prior.clone();
        }
        let eps = self.config.epsilon;

        // 1. Baseline transition from yesterday's distribution.
        let mut probs = [0.0; STATE_COUNT];
        for today in State::ALL {
            let mut acc = 0.0;
            for yesterday in State::ALL {
                acc += self.previous.get(yesterday)
                    * self.tables.transition.row(yesterday)[today.index()];
            }
            probs[today.index()] = acc;
        }
        let mut d = Distribution::from_probs(probs).normalized();

        // 2. Yesterday's training-load causal factor.
        if let Some(load) = causal.yesterday_load {
            if let Some(row) = self.tables.causal.training_load_row(load) {
                d = d.combined(row, self.config.causal_weights.training_load, eps);
            }
        }

        // 3. Streak penalty; both windows are checked independently.
        let streak = &self.config.streak;
        let from: &[State] = &[
            State::Peak,
            State::WellAdapted,
            State::For,
            State::AcuteFatigue,
        ];
        if acwr::high_count(&causal.recent_loads, streak.short_window) >= streak.short_count {
            d = d.shifted(from, &[State::Nfor], streak.short_ratio);
        }
        if acwr::high_count(&causal.recent_loads, streak.long_window) >= streak.long_count {
            d = d.shifted(from, &[State::Nfor], streak.long_ratio);
        }

        // 4. ACWR adjustment, skipped entirely below the history gate.
        if let Some(assessment) = acwr::assess(&causal.load_magnitudes, &self.config.acwr) {
            tracing::debug!(
                user_id = %self.user_id,
                ratio = assessment.ratio,
                band = ?assessment.band,
                "acwr assessed"
            );
            for shift in acwr::plan_shifts(&assessment) {
                d = d.shifted(shift.from, shift.to, shift.ratio);
            }
        }

        // 5. 3-day subjective fatigue proxy.
        if let Some(score) = acwr::fatigue_proxy_score(
            &causal.load_magnitudes,
            causal.soreness_0_10,
            causal.energy_0_10,
            &self.config.fatigue_proxy,
        ) {
            let proxy = &self.config.fatigue_proxy;
            let sources: &[State] = &[State::Peak, State::WellAdapted, State::For];
            if score >= proxy.high_threshold {
                d = d.shifted(sources, &[State::AcuteFatigue], proxy.high_shift);
            } else if score >= proxy.mild_threshold {
                d = d.shifted(sources, &[State::AcuteFatigue], proxy.mild_shift);
            }
        }

        // 6-8. Journal: yesterday's short-term behaviors apply once, then
        // expire; persistent status carries forward but never touches the
        // prior (it re-enters through every posterior update instead).
        if let Some(yesterday) = self.date.pred_opt() {
            if let Some(entry) = self.journal.get(&self.user_id, yesterday) {
                let weights = &self.config.causal_weights;
                let behaviors = entry.short_term;
                if behaviors.alcohol {
                    d = d.combined(&self.tables.causal.alcohol, weights.alcohol, eps);
                }
                if behaviors.late_caffeine {
                    d = d.combined(&self.tables.causal.late_caffeine, weights.late_caffeine, eps);
                }
                if behaviors.screen_before_bed {
                    d = d.combined(
                        &self.tables.causal.screen_before_bed,
                        weights.screen_before_bed,
                        eps,
                    );
                }
                if behaviors.late_meal {
                    let yesterday_load = causal
                        .yesterday_load
                        .or(entry.training.load)
                        .unwrap_or(TrainingLoad::Rest);
                    let row = if yesterday_load.at_least_medium() {
                        &self.tables.causal.late_meal_positive
                    } else {
                        &self.tables.causal.late_meal_negative
                    };
                    d = d.combined(row, weights.late_meal, eps);
                }

                if entry.persistent.any_active() {
                    let today = self
                        .journal
                        .get(&self.user_id, self.date)
                        .unwrap_or_default();
                    let merged = entry.persistent.carried_into(&today.persistent);
                    self.journal.upsert(
                        &self.user_id,
                        self.date,
                        JournalPatch {
                            persistent: Some(merged),
                            ..Default::default()
                        },
                    );
                }

                if behaviors.any() {
                    self.journal.upsert(
                        &self.user_id,
                        yesterday,
                        JournalPatch {
                            short_term: Some(ShortTermBehaviors::default()),
                            ..Default::default()
                        },
                    );
                }
            }
        }

        d.normalize();
        tracing::debug!(user_id = %self.user_id, date = %self.date, score = d.readiness_score(), "prior computed");
        self.posterior = Some(d.clone());
        self.prior = Some(d.clone());
        d
    }

    /// Fold same-day evidence into the posterior. Fails when the prior has
    /// not been computed yet; never silently substitutes a default.
    pub fn update(&mut self, evidence: &EvidenceInput) -> Result<UpdateOutcome, EngineError> {
        if self.prior.is_none() {
            return Err(EngineError::PriorNotComputed {
                user_id: self.user_id.clone(),
                date: self.date.to_string(),
            });
        }
        let eps = self.config.epsilon;

        // 1. Inherited persistent evidence first (only where the pool has
        // nothing yet, so an explicit same-day cancellation stays
        // cancelled), then the caller's evidence on top.
        self.merge_persistent_evidence();
        let mapped = map_evidence(evidence);
        // The history entry records the delta this call contributed; pool
        // variables inherited or re-applied from earlier calls are not
        // listed again.
        let touched: Vec<EvidenceVar> = mapped.iter().map(|(var, _)| *var).collect();
        let mut applied: Vec<String> = Vec::new();
        for (var, value) in mapped {
            self.pool.insert(var, value);
        }
        if evidence.cycle_day.is_some() {
            self.cycle_day = evidence.cycle_day;
        }
        if evidence.cycle_length.is_some() {
            self.cycle_length = evidence.cycle_length;
        }

        let mut d = self
            .posterior
            .clone()
            .unwrap_or_else(Distribution::uniform);

        // 2-4. Re-derive the full pool in fixed variable order: Hooper
        // scores through the anchor blend, everything else categorical.
        for var in EvidenceVar::ALL {
            let Some(value) = self.pool.get(&var) else {
                continue;
            };
            let weight = self.config.evidence_weights.weight(var);
            match value {
                EvidenceValue::Score(score) if var.is_hooper() => {
                    let score = score.round().clamp(1.0, 7.0) as u8;
                    if let Some(lik) = hooper::state_likelihood(self.emission(), var, score) {
                        d = d.combined(&lik, weight, eps);
                        if touched.contains(&var) {
                            applied.push(var.as_str().to_string());
                        }
                    }
                }
                EvidenceValue::Score(_) => {
                    tracing::debug!(var = var.as_str(), "score on non-ordinal variable ignored");
                }
                EvidenceValue::Flag(false) => {}
                EvidenceValue::Flag(true) => {
                    if let Some(row) = self.emission().likelihood(var, "true") {
                        let row = *row;
                        d = d.combined(&row, weight, eps);
                        if touched.contains(&var) {
                            applied.push(var.as_str().to_string());
                        }
                    }
                }
                EvidenceValue::Category(cat) => {
                    if let Some(row) = self.emission().likelihood(var, cat) {
                        let row = *row;
                        d = d.combined(&row, weight, eps);
                        if touched.contains(&var) {
                            applied.push(var.as_str().to_string());
                        }
                    } else {
                        tracing::debug!(
                            var = var.as_str(),
                            category = %cat,
                            "category missing from emission table, ignored"
                        );
                    }
                }
            }
        }

        // 5. Soreness x stress interaction.
        if let (Some(sore), Some(stress)) = (
            self.pool_category(EvidenceVar::Soreness),
            self.pool_category(EvidenceVar::Stress),
        ) {
            if let Some(row) = self.tables.interaction.likelihood(&sore, &stress) {
                d = d.combined(row, self.config.interaction_weight, eps);
                if touched.contains(&EvidenceVar::Soreness)
                    || touched.contains(&EvidenceVar::Stress)
                {
                    applied.push("soreness_stress_interaction".to_string());
                }
            }
        }

        // 6. Cycle evidence for female users with a cycle day.
        if self.gender == Gender::Female {
            if let Some(day) = self.cycle_day {
                let length = self.cycle_length.unwrap_or(28);
                let lik = cycle::cycle_likelihood(day, length, &self.cycle_params);
                d = d.combined(&lik, self.config.cycle_weight, eps);
                if evidence.cycle_day.is_some() {
                    applied.push("cycle".to_string());
                }
            }
        }

        // 7. Finalize.
        d.normalize();
        let score = d.readiness_score();
        let diagnosis = d.argmax();
        self.history.push(UpdateRecord {
            timestamp: chrono::Utc::now().timestamp_millis(),
            applied,
            pool_size: self.pool.len(),
            score,
            distribution: d.clone(),
        });
        self.posterior = Some(d.clone());
        tracing::debug!(
            user_id = %self.user_id,
            date = %self.date,
            score,
            diagnosis = diagnosis.as_str(),
            "posterior updated"
        );
        Ok(UpdateOutcome {
            score,
            diagnosis,
            distribution: d,
            pool_size: self.pool.len(),
        })
    }

    /// Inherited persistent journal flags enter the pool only where the
    /// caller has not spoken for that variable today.
    fn merge_persistent_evidence(&mut self) {
        let Some(entry) = self.journal.get(&self.user_id, self.date) else {
            return;
        };
        let persistent: &PersistentStatus = &entry.persistent;
        if persistent.sick() {
            self.pool
                .entry(EvidenceVar::IsSick)
                .or_insert(EvidenceValue::Flag(true));
        }
        if persistent.injured() {
            self.pool
                .entry(EvidenceVar::IsInjured)
                .or_insert(EvidenceValue::Flag(true));
        }
        if let Some(phase) = persistent.active_phase().and_then(phase_category) {
            self.pool
                .entry(EvidenceVar::MenstrualPhase)
                .or_insert_with(|| EvidenceValue::Category(phase.to_string()));
        }
        if persistent.work_stressed() {
            self.pool
                .entry(EvidenceVar::Stress)
                .or_insert_with(|| EvidenceValue::Category("high".to_string()));
        }
    }

    /// Categorical reading of a pool variable: ordinal scores collapse to
    /// their dominant anchor, flags have no category.
    fn pool_category(&self, var: EvidenceVar) -> Option<String> {
        match self.pool.get(&var)? {
            EvidenceValue::Category(cat) => Some(cat.clone()),
            EvidenceValue::Score(score) => {
                let score = score.round().clamp(1.0, 7.0) as u8;
                Some(hooper::dominant_anchor(var, score).to_string())
            }
            EvidenceValue::Flag(_) => None,
        }
    }

    /// Everything the storage collaborator persists for this user-day.
    pub fn daily_summary(&self) -> Result<DailySummary, EngineError> {
        let posterior = self
            .posterior
            .clone()
            .ok_or_else(|| EngineError::PriorNotComputed {
                user_id: self.user_id.clone(),
                date: self.date.to_string(),
            })?;
        Ok(DailySummary {
            user_id: self.user_id.clone(),
            date: self.date,
            prior: self.prior.clone(),
            score: posterior.readiness_score(),
            diagnosis: posterior.argmax(),
            posterior,
            evidence_pool: self
                .pool
                .iter()
                .map(|(var, value)| (var.as_str().to_string(), value.clone()))
                .collect(),
            update_history: self.history.clone(),
        })
    }
}
