//! Probability distribution over the six readiness states, plus the three
//! primitive operations every engine step is built from: normalize,
//! multiplicative combination, and proportional mass shift.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{State, StateVector, STATE_COUNT};

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    probs: [f64; STATE_COUNT],
}

impl Distribution {
    pub fn from_probs(probs: [f64; STATE_COUNT]) -> Self {
        Self { probs }
    }

    pub fn uniform() -> Self {
        Self {
            probs: [1.0 / STATE_COUNT as f64; STATE_COUNT],
        }
    }

    /// Healthy-population seed used when a session has no previous posterior.
    pub fn default_seed() -> Self {
        Self {
            probs: [0.15, 0.45, 0.15, 0.15, 0.08, 0.02],
        }
    }

    pub fn get(&self, state: State) -> f64 {
        self.probs[state.index()]
    }

    pub fn set(&mut self, state: State, value: f64) {
        self.probs[state.index()] = value;
    }

    pub fn probs(&self) -> &[f64; STATE_COUNT] {
        &self.probs
    }

    pub fn sum(&self) -> f64 {
        self.probs.iter().sum()
    }

    /// Divide by the total, or re-seed uniform when the distribution has
    /// degenerated to zero mass. Always the last step of every operation.
    pub fn normalize(&mut self) {
        let total = self.sum();
        if total <= 0.0 || !total.is_finite() {
            self.probs = [1.0 / STATE_COUNT as f64; STATE_COUNT];
            return;
        }
        for p in &mut self.probs {
            *p /= total;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Multiplicative Bayesian combination: `p[s] * max(lik[s], eps)^weight`,
    /// then normalize. The epsilon floor keeps a single zero-likelihood
    /// observation from permanently zeroing a state.
    pub fn combined(&self, likelihood: &StateVector, weight: f64, eps: f64) -> Self {
        let mut out = self.clone();
        for (i, p) in out.probs.iter_mut().enumerate() {
            *p *= likelihood[i].max(eps).powf(weight);
        }
        out.normalize();
        out
    }

    /// Directional mass shift: drain `ratio` of the combined mass of
    /// `from` proportionally to each member's share, spread it equally over
    /// `to`, normalize. A heuristic push, not a Bayesian update.
    pub fn shifted(&self, from: &[State], to: &[State], ratio: f64) -> Self {
        let mut out = self.clone();
        if from.is_empty() || to.is_empty() || ratio <= 0.0 {
            return out.normalized();
        }
        let total_from: f64 = from.iter().map(|s| out.get(*s)).sum();
        if total_from <= 0.0 {
            return out.normalized();
        }
        let amount = total_from * ratio.min(1.0);
        for s in from {
            let share = out.get(*s) / total_from;
            out.set(*s, out.get(*s) - amount * share);
        }
        let per_target = amount / to.len() as f64;
        for s in to {
            out.set(*s, out.get(*s) + per_target);
        }
        out.normalize();
        out
    }

    pub fn argmax(&self) -> State {
        let mut best = State::Peak;
        let mut best_p = f64::NEG_INFINITY;
        for s in State::ALL {
            let p = self.get(s);
            if p > best_p {
                best_p = p;
                best = s;
            }
        }
        best
    }

    /// Composite readiness score: probability-weighted state weights,
    /// rounded to an integer.
    pub fn readiness_score(&self) -> i32 {
        let raw: f64 = State::ALL
            .iter()
            .map(|s| self.get(*s) * s.readiness_weight() as f64)
            .sum();
        raw.round() as i32
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        State::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), self.get(*s)))
            .collect()
    }

    /// Build from a name-keyed map; unknown names are ignored, missing
    /// states get zero mass. The caller normalizes when appropriate.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        let mut probs = [0.0; STATE_COUNT];
        for (name, value) in map {
            if let Some(state) = State::parse(name) {
                probs[state.index()] = *value;
            }
        }
        Self { probs }
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::default_seed()
    }
}

// State-name-keyed JSON map on the wire, matching the boundary contract.
impl Serialize for Distribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(STATE_COUNT))?;
        for s in State::ALL {
            map.serialize_entry(s.as_str(), &self.get(s))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Distribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let dist = Distribution::from_map(&map);
        if map.is_empty() {
            return Err(D::Error::custom("empty state distribution"));
        }
        Ok(dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn normalize_divides_by_total() {
        let d = Distribution::from_probs([2.0, 2.0, 2.0, 2.0, 1.0, 1.0]).normalized();
        assert!((d.sum() - 1.0).abs() < EPS);
        assert!((d.get(State::Peak) - 0.2).abs() < EPS);
    }

    #[test]
    fn normalize_recovers_degenerate_to_uniform() {
        let d = Distribution::from_probs([0.0; 6]).normalized();
        for s in State::ALL {
            assert!((d.get(s) - 1.0 / 6.0).abs() < EPS);
        }
    }

    #[test]
    fn combined_floors_zero_likelihood() {
        let d = Distribution::uniform();
        let lik = [1.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        let out = d.combined(&lik, 1.0, 1e-6);
        assert!(out.get(State::Ots) > 0.0);
        assert!((out.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn combined_weight_scales_strength() {
        let d = Distribution::uniform();
        let lik = [0.9, 0.4, 0.3, 0.2, 0.1, 0.05];
        let weak = d.combined(&lik, 0.5, 1e-6);
        let strong = d.combined(&lik, 2.0, 1e-6);
        assert!(strong.get(State::Peak) > weak.get(State::Peak));
    }

    #[test]
    fn shift_moves_proportionally() {
        let d = Distribution::from_probs([0.4, 0.2, 0.1, 0.1, 0.1, 0.1]);
        let out = d.shifted(&[State::Peak, State::WellAdapted], &[State::Nfor], 0.5);
        // 0.3 drained: Peak loses 0.2, WellAdapted loses 0.1.
        assert!((out.get(State::Peak) - 0.2).abs() < EPS);
        assert!((out.get(State::WellAdapted) - 0.1).abs() < EPS);
        assert!((out.get(State::Nfor) - 0.4).abs() < EPS);
        assert!((out.sum() - 1.0).abs() < EPS);
    }

    #[test]
    fn shift_with_empty_source_mass_is_noop() {
        let d = Distribution::from_probs([0.0, 0.0, 0.5, 0.5, 0.0, 0.0]);
        let out = d.shifted(&[State::Peak], &[State::Nfor], 0.5);
        assert!((out.get(State::Nfor) - 0.0).abs() < EPS);
    }

    #[test]
    fn serde_roundtrip_is_name_keyed() {
        let d = Distribution::default_seed();
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"well_adapted\""));
        let back: Distribution = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn score_and_argmax() {
        let mut d = Distribution::from_probs([0.0; 6]);
        d.set(State::Peak, 1.0);
        assert_eq!(d.readiness_score(), 100);
        assert_eq!(d.argmax(), State::Peak);
    }
}
