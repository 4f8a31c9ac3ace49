//! Training-load history analysis feeding the prior: exponentially
//! weighted acute/chronic averages, ACWR banding and nudge planning,
//! high-load streak counting, and the 3-day subjective fatigue proxy.

use serde::{Deserialize, Serialize};

use crate::config::{AcwrParams, FatigueProxyParams};
use crate::types::{State, TrainingLoad};

/// Exponentially weighted moving average with smoothing `2/(window+1)`,
/// oldest value first.
pub fn ewma(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut avg = values[0];
    for v in &values[1..] {
        avg = alpha * v + (1.0 - alpha) * avg;
    }
    avg
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronicBand {
    Low,
    Mid,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcwrAssessment {
    pub acute: f64,
    pub chronic: f64,
    pub ratio: f64,
    /// 3-day over chronic: the short spike check.
    pub spike_ratio: f64,
    pub band: ChronicBand,
}

/// Assess the load history, or `None` when fewer than the minimum days of
/// magnitudes are available (the adjustment is then skipped entirely).
pub fn assess(magnitudes: &[f64], params: &AcwrParams) -> Option<AcwrAssessment> {
    if magnitudes.len() < params.min_history_days {
        return None;
    }
    let acute = ewma(magnitudes, params.acute_window);
    let chronic = ewma(magnitudes, params.chronic_window);
    if chronic <= 0.0 {
        return None;
    }
    let spike = ewma(magnitudes, params.spike_window);
    // Band thresholds are expressed in weekly accumulated load units.
    let weekly_chronic = chronic * 7.0;
    let band = if weekly_chronic < params.band_low_max {
        ChronicBand::Low
    } else if weekly_chronic <= params.band_mid_max {
        ChronicBand::Mid
    } else {
        ChronicBand::High
    };
    Some(AcwrAssessment {
        acute,
        chronic,
        ratio: acute / chronic,
        spike_ratio: spike / chronic,
        band,
    })
}

/// One planned directional mass shift.
#[derive(Debug, Clone)]
pub struct MassShift {
    pub from: &'static [State],
    pub to: &'static [State],
    pub ratio: f64,
}

const OVERLOAD_FROM: &[State] = &[State::Peak, State::WellAdapted, State::For];
const OVERLOAD_TO: &[State] = &[State::AcuteFatigue, State::Nfor];
const RECOVERY_FROM: &[State] = &[State::Nfor, State::AcuteFatigue];
const RECOVERY_TO: &[State] = &[State::WellAdapted, State::Peak];
const DECONDITION_FROM: &[State] = &[State::Peak];
const DECONDITION_TO: &[State] = &[State::WellAdapted];

/// Translate an assessment into the shifts the prior applies.
pub fn plan_shifts(a: &AcwrAssessment) -> Vec<MassShift> {
    let mut shifts = Vec::new();

    if a.ratio <= 0.9 {
        // Under-training: reward recovery.
        let base = if a.ratio <= 0.7 { 0.02 } else { 0.01 };
        let scaled = if a.band == ChronicBand::High {
            base * 1.2
        } else {
            base
        };
        shifts.push(MassShift {
            from: RECOVERY_FROM,
            to: RECOVERY_TO,
            ratio: scaled,
        });
        if a.ratio <= 0.6 && a.band == ChronicBand::Low {
            // Mild deconditioning signal.
            shifts.push(MassShift {
                from: DECONDITION_FROM,
                to: DECONDITION_TO,
                ratio: 0.01,
            });
        }
    }

    if a.ratio >= 1.15 {
        let base = if a.ratio >= 1.50 {
            0.06
        } else if a.ratio >= 1.30 {
            0.04
        } else {
            0.02
        };
        let band_scale = match a.band {
            ChronicBand::Low => 1.5,
            ChronicBand::Mid => 1.0,
            ChronicBand::High => 0.5,
        };
        let mut ratio = base * band_scale;
        if a.spike_ratio >= 1.30 {
            ratio += 0.01;
        }
        shifts.push(MassShift {
            from: OVERLOAD_FROM,
            to: OVERLOAD_TO,
            ratio,
        });
    }

    shifts
}

/// High/very-high labels among the last `window` entries.
pub fn high_count(loads: &[TrainingLoad], window: usize) -> usize {
    let start = loads.len().saturating_sub(window);
    loads[start..].iter().filter(|l| l.is_high()).count()
}

/// 3-day subjective fatigue proxy on the 0-10 scale, or `None` when the
/// subjective inputs are absent.
pub fn fatigue_proxy_score(
    magnitudes: &[f64],
    soreness_0_10: Option<f64>,
    energy_0_10: Option<f64>,
    params: &FatigueProxyParams,
) -> Option<f64> {
    let soreness = soreness_0_10?.clamp(0.0, 10.0);
    let energy = energy_0_10?.clamp(0.0, 10.0);
    let start = magnitudes.len().saturating_sub(3);
    let recent = &magnitudes[start..];
    let load_norm = if recent.is_empty() {
        0.0
    } else {
        let mean: f64 = recent.iter().sum::<f64>() / recent.len() as f64;
        (mean / params.load_norm_divisor).clamp(0.0, 10.0)
    };
    Some(
        params.load_weight * load_norm
            + params.soreness_weight * soreness
            + params.energy_weight * (10.0 - energy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_of_constant_is_constant() {
        let values = vec![400.0; 28];
        assert!((ewma(&values, 7) - 400.0).abs() < 1e-9);
        assert!((ewma(&values, 28) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn assess_gates_on_history_length() {
        let params = AcwrParams::default();
        assert!(assess(&[500.0; 5], &params).is_none());
        assert!(assess(&[500.0; 7], &params).is_some());
    }

    #[test]
    fn spike_raises_ratio() {
        let params = AcwrParams::default();
        let mut magnitudes = vec![300.0; 25];
        magnitudes.extend([700.0, 750.0, 800.0]);
        let a = assess(&magnitudes, &params).unwrap();
        assert!(a.ratio > 1.15, "ratio was {}", a.ratio);
        assert!(a.spike_ratio > a.ratio);
    }

    #[test]
    fn overload_plan_scales_with_ratio_and_band() {
        let mild = AcwrAssessment {
            acute: 460.0,
            chronic: 400.0,
            ratio: 1.15,
            spike_ratio: 1.0,
            band: ChronicBand::Mid,
        };
        let severe = AcwrAssessment {
            ratio: 1.55,
            ..mild.clone()
        };
        let mild_shift = &plan_shifts(&mild)[0];
        let severe_shift = &plan_shifts(&severe)[0];
        assert!((mild_shift.ratio - 0.02).abs() < 1e-9);
        assert!((severe_shift.ratio - 0.06).abs() < 1e-9);

        let low_band = AcwrAssessment {
            band: ChronicBand::Low,
            ..mild.clone()
        };
        assert!((plan_shifts(&low_band)[0].ratio - 0.03).abs() < 1e-9);
    }

    #[test]
    fn under_training_rewards_recovery() {
        let a = AcwrAssessment {
            acute: 200.0,
            chronic: 400.0,
            ratio: 0.5,
            spike_ratio: 0.5,
            band: ChronicBand::Low,
        };
        let shifts = plan_shifts(&a);
        assert_eq!(shifts.len(), 2);
        assert!((shifts[0].ratio - 0.02).abs() < 1e-9);
        assert!((shifts[1].ratio - 0.01).abs() < 1e-9);
    }

    #[test]
    fn high_count_looks_at_window_tail() {
        let loads = vec![
            TrainingLoad::Low,
            TrainingLoad::High,
            TrainingLoad::High,
            TrainingLoad::VeryHigh,
            TrainingLoad::Medium,
        ];
        assert_eq!(high_count(&loads, 4), 3);
        assert_eq!(high_count(&loads, 2), 1);
    }

    #[test]
    fn fatigue_proxy_requires_subjective_inputs() {
        let params = FatigueProxyParams::default();
        assert!(fatigue_proxy_score(&[500.0; 3], None, Some(5.0), &params).is_none());
        let score = fatigue_proxy_score(&[500.0; 3], Some(8.0), Some(2.0), &params).unwrap();
        // 0.4*5 + 0.4*8 + 0.2*8 = 6.8
        assert!((score - 6.8).abs() < 1e-9);
    }
}
