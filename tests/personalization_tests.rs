//! Personalization tests over the public API: EM with shrinkage toward the
//! population emission table, and grid fitting of per-user cycle parameters.

use std::sync::Arc;

use chrono::NaiveDate;

use readiness_engine::personalize::{
    fit_cycle_params, personalize_emission, PersonalizationOptions,
};
use readiness_engine::{
    CausalInputs, DailyRecord, EngineConfig, EngineError, EvidenceInput, EvidenceVar, Gender,
    InMemoryJournal, ReadinessEngine, State, TableSet, UserProfile,
};

fn date(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + chrono::Days::new(offset as u64)
}

fn record(offset: u32, evidence: EvidenceInput) -> DailyRecord {
    DailyRecord {
        date: date(offset),
        causal: CausalInputs::default(),
        evidence,
    }
}

fn exhausted_history(days: u32) -> Vec<DailyRecord> {
    (0..days)
        .map(|i| {
            record(
                i,
                EvidenceInput {
                    fatigue_hooper: Some(7),
                    ..Default::default()
                },
            )
        })
        .collect()
}

#[test]
fn too_short_history_is_rejected() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Unspecified);

    let err = personalize_emission(
        &config,
        &tables,
        &profile,
        &exhausted_history(10),
        &PersonalizationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientData {
            available: 10,
            required: 14,
            ..
        }
    ));
}

#[test]
fn days_without_whitelisted_evidence_do_not_count() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Unspecified);

    // 20 days, but only resting HR which is outside the default whitelist.
    let history: Vec<DailyRecord> = (0..20)
        .map(|i| {
            record(
                i,
                EvidenceInput {
                    resting_hr: Some("high".to_string()),
                    ..Default::default()
                },
            )
        })
        .collect();

    let err = personalize_emission(
        &config,
        &tables,
        &profile,
        &history,
        &PersonalizationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientData { available: 0, .. }));
}

#[test]
fn constant_high_fatigue_reshapes_the_fatigue_row() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Unspecified);

    let result = personalize_emission(
        &config,
        &tables,
        &profile,
        &exhausted_history(30),
        &PersonalizationOptions::default(),
    )
    .unwrap();

    assert_eq!(result.days_used, 30);
    assert!(!result.convergence.is_empty());
    assert!(result.convergence.len() <= 3);

    // Every observation lands in the "high" category, so for states that
    // accumulate responsibility the learned table moves mass toward "high".
    let baseline_high = tables
        .emission
        .likelihood(EvidenceVar::Fatigue, "high")
        .unwrap()[State::AcuteFatigue.index()];
    let learned_high = result
        .table
        .likelihood(EvidenceVar::Fatigue, "high")
        .unwrap()[State::AcuteFatigue.index()];
    assert!(learned_high > baseline_high);

    let baseline_low = tables
        .emission
        .likelihood(EvidenceVar::Fatigue, "low")
        .unwrap()[State::AcuteFatigue.index()];
    let learned_low = result
        .table
        .likelihood(EvidenceVar::Fatigue, "low")
        .unwrap()[State::AcuteFatigue.index()];
    assert!(learned_low < baseline_low);
}

#[test]
fn unobserved_variables_stay_at_baseline() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Unspecified);

    let result = personalize_emission(
        &config,
        &tables,
        &profile,
        &exhausted_history(30),
        &PersonalizationOptions::default(),
    )
    .unwrap();

    // Appetite is whitelisted but never reported: shrinkage keeps it put.
    for category in tables.emission.categories(EvidenceVar::Appetite) {
        let baseline = tables
            .emission
            .likelihood(EvidenceVar::Appetite, &category)
            .unwrap();
        let learned = result
            .table
            .likelihood(EvidenceVar::Appetite, &category)
            .unwrap();
        for (b, l) in baseline.iter().zip(learned.iter()) {
            assert!((b - l).abs() < 1e-9);
        }
    }
}

#[test]
fn personalized_table_is_usable_by_the_engine() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Unspecified);

    let result = personalize_emission(
        &config,
        &tables,
        &profile,
        &exhausted_history(30),
        &PersonalizationOptions::default(),
    )
    .unwrap();

    let engine = ReadinessEngine::new(Arc::new(InMemoryJournal::new()));
    engine.set_personalized_table("u1", result.table);

    let evidence = EvidenceInput {
        fatigue_hooper: Some(7),
        ..Default::default()
    };

    let mut personalized = engine.session(&profile, date(40), None);
    personalized.compute_prior(&CausalInputs::default());
    let personalized_out = personalized.update(&evidence).unwrap();

    let stock_profile = UserProfile::new("u2", Gender::Unspecified);
    let mut stock = engine.session(&stock_profile, date(40), None);
    stock.compute_prior(&CausalInputs::default());
    let stock_out = stock.update(&evidence).unwrap();

    assert_ne!(personalized_out.distribution, stock_out.distribution);

    engine.clear_personalized_table("u1");
    assert!(engine.personalized_table("u1").is_none());
}

fn cycle_history(days_with_cycle: u32) -> Vec<DailyRecord> {
    (0..days_with_cycle)
        .map(|i| {
            record(
                i,
                EvidenceInput {
                    fatigue_hooper: Some(if (i % 28) + 1 >= 24 { 6 } else { 2 }),
                    cycle_day: Some((i % 28) + 1),
                    cycle_length: Some(28),
                    ..Default::default()
                },
            )
        })
        .collect()
}

#[test]
fn cycle_fit_needs_enough_cycle_rows() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Female);

    let err = fit_cycle_params(&config, &tables, &profile, &cycle_history(5)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientData {
            available: 5,
            required: 10,
            ..
        }
    ));
}

#[test]
fn cycle_fit_returns_grid_parameters() {
    let config = EngineConfig::default();
    let tables = TableSet::default();
    let profile = UserProfile::new("u1", Gender::Female);

    let fit = fit_cycle_params(&config, &tables, &profile, &cycle_history(30)).unwrap();
    assert_eq!(fit.samples, 30);
    assert!(fit.log_likelihood.is_finite());
    assert!((0.40..=0.60).contains(&fit.params.ov_frac));
    assert!((-2.0..=2.0).contains(&fit.params.luteal_off));
    assert!([0.8, 1.0, 1.2, 1.5].contains(&fit.params.sig_scale));
}
