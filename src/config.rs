//! Engine tuning parameters. Tables of weights and thresholds live here so
//! they can be replaced wholesale without touching engine logic.

use serde::{Deserialize, Serialize};

use crate::types::EvidenceVar;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceWeights {
    pub fatigue: f64,
    pub soreness: f64,
    pub stress: f64,
    pub sleep_quality: f64,
    pub motivation: f64,
    pub appetite: f64,
    pub energy: f64,
    pub is_sick: f64,
    pub is_injured: f64,
    pub menstrual_phase: f64,
    pub resting_hr: f64,
    pub hrv_status: f64,
}

impl EvidenceWeights {
    pub fn weight(&self, var: EvidenceVar) -> f64 {
        match var {
            EvidenceVar::Fatigue => self.fatigue,
            EvidenceVar::Soreness => self.soreness,
            EvidenceVar::Stress => self.stress,
            EvidenceVar::SleepQuality => self.sleep_quality,
            EvidenceVar::Motivation => self.motivation,
            EvidenceVar::Appetite => self.appetite,
            EvidenceVar::Energy => self.energy,
            EvidenceVar::IsSick => self.is_sick,
            EvidenceVar::IsInjured => self.is_injured,
            EvidenceVar::MenstrualPhase => self.menstrual_phase,
            EvidenceVar::RestingHr => self.resting_hr,
            EvidenceVar::HrvStatus => self.hrv_status,
        }
    }
}

impl Default for EvidenceWeights {
    fn default() -> Self {
        Self {
            fatigue: 1.0,
            soreness: 1.0,
            stress: 0.9,
            sleep_quality: 1.0,
            motivation: 0.6,
            appetite: 0.5,
            energy: 0.7,
            is_sick: 1.2,
            is_injured: 1.0,
            menstrual_phase: 0.6,
            resting_hr: 0.8,
            hrv_status: 0.9,
        }
    }
}

/// Weights for the causal factors multiplied into the prior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalWeights {
    pub training_load: f64,
    pub alcohol: f64,
    pub late_caffeine: f64,
    pub screen_before_bed: f64,
    pub late_meal: f64,
}

impl Default for CausalWeights {
    fn default() -> Self {
        Self {
            training_load: 1.0,
            alcohol: 0.8,
            late_caffeine: 0.6,
            screen_before_bed: 0.5,
            late_meal: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakParams {
    pub short_window: usize,
    pub short_count: usize,
    pub short_ratio: f64,
    pub long_window: usize,
    pub long_count: usize,
    pub long_ratio: f64,
}

impl Default for StreakParams {
    fn default() -> Self {
        Self {
            short_window: 4,
            short_count: 3,
            short_ratio: 0.50,
            long_window: 8,
            long_count: 6,
            long_ratio: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcwrParams {
    /// Below this many days of magnitude history the whole adjustment is
    /// skipped, never estimated from partial data.
    pub min_history_days: usize,
    pub acute_window: usize,
    pub chronic_window: usize,
    pub spike_window: usize,
    /// Band thresholds on weekly accumulated chronic load.
    pub band_low_max: f64,
    pub band_mid_max: f64,
}

impl Default for AcwrParams {
    fn default() -> Self {
        Self {
            min_history_days: 7,
            acute_window: 7,
            chronic_window: 28,
            spike_window: 3,
            band_low_max: 1200.0,
            band_mid_max: 2500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueProxyParams {
    pub load_weight: f64,
    pub soreness_weight: f64,
    pub energy_weight: f64,
    /// Daily magnitude divisor mapping AU onto the 0-10 proxy scale.
    pub load_norm_divisor: f64,
    pub high_threshold: f64,
    pub high_shift: f64,
    pub mild_threshold: f64,
    pub mild_shift: f64,
}

impl Default for FatigueProxyParams {
    fn default() -> Self {
        Self {
            load_weight: 0.4,
            soreness_weight: 0.4,
            energy_weight: 0.2,
            load_norm_divisor: 100.0,
            high_threshold: 7.0,
            high_shift: 0.04,
            mild_threshold: 4.0,
            mild_shift: 0.015,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmParams {
    pub shrink_k: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub min_history_days: usize,
    pub min_cycle_rows: usize,
}

impl Default for EmParams {
    fn default() -> Self {
        Self {
            shrink_k: 100.0,
            max_iterations: 3,
            tolerance: 1e-3,
            min_history_days: 14,
            min_cycle_rows: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Floor applied before any multiplicative combination.
    pub epsilon: f64,
    pub evidence_weights: EvidenceWeights,
    pub causal_weights: CausalWeights,
    pub interaction_weight: f64,
    pub cycle_weight: f64,
    pub streak: StreakParams,
    pub acwr: AcwrParams,
    pub fatigue_proxy: FatigueProxyParams,
    pub em: EmParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            evidence_weights: EvidenceWeights::default(),
            causal_weights: CausalWeights::default(),
            interaction_weight: 0.6,
            cycle_weight: 0.8,
            streak: StreakParams::default(),
            acwr: AcwrParams::default(),
            fatigue_proxy: FatigueProxyParams::default(),
            em: EmParams::default(),
        }
    }
}
