//! Property tests for the distribution arithmetic underneath the engine:
//! whatever the inputs, a distribution must stay a distribution.

use proptest::prelude::*;

use readiness_engine::{Distribution, State};

const TOL: f64 = 1e-9;

fn arb_weights() -> impl Strategy<Value = [f64; 6]> {
    prop::array::uniform6(0.0f64..1000.0)
}

fn arb_distribution() -> impl Strategy<Value = Distribution> {
    arb_weights().prop_map(|w| Distribution::from_probs(w).normalized())
}

fn arb_likelihood() -> impl Strategy<Value = [f64; 6]> {
    prop::array::uniform6(0.0f64..1.0)
}

proptest! {
    #[test]
    fn normalize_always_sums_to_one(weights in arb_weights()) {
        let d = Distribution::from_probs(weights).normalized();
        prop_assert!((d.sum() - 1.0).abs() < TOL);
        prop_assert!(d.probs().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn zero_likelihood_never_kills_a_state(d in arb_distribution(), weight in 0.1f64..=1.0) {
        let out = d.combined(&[0.0; 6], weight, 1e-6);
        // The epsilon floor leaves every state with the mass it had.
        for (a, b) in out.probs().iter().zip(d.probs().iter()) {
            prop_assert!((a - b).abs() < 1e-7);
        }
    }

    #[test]
    fn combine_preserves_the_simplex(
        d in arb_distribution(),
        likelihood in arb_likelihood(),
        weight in 0.0f64..=1.0,
    ) {
        let out = d.combined(&likelihood, weight, 1e-6);
        prop_assert!((out.sum() - 1.0).abs() < TOL);
        prop_assert!(out.probs().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn combine_with_zero_weight_is_identity(
        d in arb_distribution(),
        likelihood in arb_likelihood(),
    ) {
        let out = d.combined(&likelihood, 0.0, 1e-6);
        for (a, b) in out.probs().iter().zip(d.probs().iter()) {
            prop_assert!((a - b).abs() < TOL);
        }
    }

    #[test]
    fn shift_preserves_the_simplex(
        d in arb_distribution(),
        ratio in 0.0f64..=1.0,
    ) {
        let out = d.shifted(
            &[State::Peak, State::WellAdapted, State::For, State::AcuteFatigue],
            &[State::Nfor],
            ratio,
        );
        prop_assert!((out.sum() - 1.0).abs() < TOL);
        prop_assert!(out.probs().iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn shift_moves_exactly_the_requested_fraction(
        d in arb_distribution(),
        ratio in 0.0f64..=1.0,
    ) {
        let source: f64 = d.get(State::Peak) + d.get(State::WellAdapted);
        let out = d.shifted(&[State::Peak, State::WellAdapted], &[State::Nfor], ratio);
        let moved = d.get(State::Nfor) + ratio * source;
        prop_assert!((out.get(State::Nfor) - moved).abs() < 1e-7);
    }

    #[test]
    fn readiness_score_stays_in_range(d in arb_distribution()) {
        let score = d.readiness_score();
        prop_assert!((10..=100).contains(&score));
    }

    #[test]
    fn serde_roundtrip_is_lossless(d in arb_distribution()) {
        let json = serde_json::to_string(&d).unwrap();
        let back: Distribution = serde_json::from_str(&json).unwrap();
        for (a, b) in back.probs().iter().zip(d.probs().iter()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}
