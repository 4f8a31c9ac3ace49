//! Raw payload -> canonical evidence mapping. Category strings arrive in
//! Chinese or English; anything unrecognized maps to `None` and the
//! variable is left out of the pool (permissive contract).

use crate::types::{EvidenceInput, EvidenceValue, EvidenceVar};

/// Canonical three-level category from a free-form label.
fn level_category(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "low" | "低" | "差" => Some("low"),
        "medium" | "mid" | "中" | "一般" => Some("medium"),
        "high" | "高" | "好" => Some("high"),
        _ => None,
    }
}

fn appetite_category(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "normal" | "正常" | "好" => Some("normal"),
        "reduced" | "poor" | "下降" | "减退" | "差" => Some("reduced"),
        _ => None,
    }
}

pub fn phase_category(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "menstrual" | "menses" | "月经期" => Some("menstrual"),
        "follicular" | "卵泡期" => Some("follicular"),
        "ovulation" | "排卵期" => Some("ovulation"),
        "luteal" | "黄体期" => Some("luteal"),
        _ => None,
    }
}

fn resting_hr_category(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "normal" | "正常" => Some("normal"),
        "elevated" | "偏高" => Some("elevated"),
        "high" | "高" => Some("high"),
        _ => None,
    }
}

fn hrv_category(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "low" | "低" => Some("low"),
        "normal" | "正常" => Some("normal"),
        "high" | "高" => Some("high"),
        _ => None,
    }
}

/// Derive the canonical (variable, value) pairs present in a raw input.
/// Ordinal Hooper items become `Score`s, flags become `Flag`s, everything
/// else a canonical `Category`. Unmappable categories are dropped here.
pub fn map_evidence(input: &EvidenceInput) -> Vec<(EvidenceVar, EvidenceValue)> {
    let mut out = Vec::new();

    for (var, score) in [
        (EvidenceVar::Fatigue, input.fatigue_hooper),
        (EvidenceVar::Soreness, input.soreness_hooper),
        (EvidenceVar::Stress, input.stress_hooper),
        (EvidenceVar::SleepQuality, input.sleep_quality_hooper),
    ] {
        if let Some(s) = score {
            out.push((var, EvidenceValue::Score(s.clamp(1, 7) as f64)));
        }
    }

    let mut push_category = |var: EvidenceVar, raw: &Option<String>, mapper: fn(&str) -> Option<&'static str>| {
        if let Some(raw) = raw {
            match mapper(raw) {
                Some(cat) => out.push((var, EvidenceValue::Category(cat.to_string()))),
                None => tracing::debug!(var = var.as_str(), raw = %raw, "unmapped evidence category ignored"),
            }
        }
    };

    push_category(EvidenceVar::Motivation, &input.motivation, level_category);
    push_category(EvidenceVar::Appetite, &input.appetite, appetite_category);
    push_category(EvidenceVar::Energy, &input.energy, level_category);
    push_category(EvidenceVar::MenstrualPhase, &input.menstrual_phase, phase_category);
    push_category(EvidenceVar::RestingHr, &input.resting_hr, resting_hr_category);
    push_category(EvidenceVar::HrvStatus, &input.hrv_status, hrv_category);

    if let Some(flag) = input.is_sick {
        out.push((EvidenceVar::IsSick, EvidenceValue::Flag(flag)));
    }
    if let Some(flag) = input.is_injured {
        out.push((EvidenceVar::IsInjured, EvidenceValue::Flag(flag)));
    }

    out
}
