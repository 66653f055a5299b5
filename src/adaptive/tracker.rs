//! Fixed-parameter Bayesian Knowledge Tracing.
//!
//! Each answer first conditions the prior mastery on the observed outcome and
//! then applies the learning transition. A zero posterior denominator (only
//! reachable at the 0/1 boundaries) is treated as uninformative evidence: the
//! posterior keeps the prior. Results are clamped into [0, 1].

use serde::{Deserialize, Serialize};

use crate::adaptive::error::SessionError;

pub const DEFAULT_L0: f64 = 0.01;
pub const DEFAULT_T: f64 = 0.1;
pub const DEFAULT_S: f64 = 0.05;
pub const DEFAULT_G: f64 = 0.33;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BktParams {
    /// Initial mastery.
    pub l0: f64,
    /// Transition (learning) rate.
    pub t: f64,
    /// Slip probability.
    pub s: f64,
    /// Guess probability.
    pub g: f64,
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            l0: DEFAULT_L0,
            t: DEFAULT_T,
            s: DEFAULT_S,
            g: DEFAULT_G,
        }
    }
}

impl BktParams {
    /// Builds parameters from optional request values; a missing or zero value
    /// falls back to its default.
    pub fn with_defaults(l0: Option<f64>, t: Option<f64>, s: Option<f64>, g: Option<f64>) -> Self {
        fn pick(value: Option<f64>, default: f64) -> f64 {
            match value {
                Some(v) if v != 0.0 => v,
                _ => default,
            }
        }

        Self {
            l0: pick(l0, DEFAULT_L0),
            t: pick(t, DEFAULT_T),
            s: pick(s, DEFAULT_S),
            g: pick(g, DEFAULT_G),
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        for (name, value) in [("l0", self.l0), ("t", self.t), ("s", self.s), ("g", self.g)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SessionError::invalid(format!(
                    "parameter {name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeTracker {
    params: BktParams,
    mastery: f64,
    mastery_history: Vec<f64>,
    answer_history: Vec<bool>,
}

impl KnowledgeTracker {
    pub fn new(params: BktParams) -> Self {
        Self {
            params,
            mastery: unit(params.l0),
            mastery_history: Vec::new(),
            answer_history: Vec::new(),
        }
    }

    pub fn update(&mut self, correct: bool) -> f64 {
        if correct {
            self.update_correct()
        } else {
            self.update_incorrect()
        }
    }

    pub fn update_correct(&mut self) -> f64 {
        let BktParams { t, s, g, .. } = self.params;
        let knew = self.mastery * (1.0 - s);
        let guessed = (1.0 - self.mastery) * g;
        let posterior = posterior(knew, knew + guessed, self.mastery);

        self.record(posterior + (1.0 - posterior) * t, true)
    }

    pub fn update_incorrect(&mut self) -> f64 {
        let BktParams { t, s, g, .. } = self.params;
        let slipped = self.mastery * s;
        let missed = (1.0 - self.mastery) * (1.0 - g);
        let posterior = posterior(slipped, slipped + missed, self.mastery);

        self.record(posterior + (1.0 - g) * t, false)
    }

    pub fn current_mastery(&self) -> f64 {
        self.mastery
    }

    pub fn params(&self) -> BktParams {
        self.params
    }

    pub fn mastery_history(&self) -> &[f64] {
        &self.mastery_history
    }

    pub fn answer_history(&self) -> &[bool] {
        &self.answer_history
    }

    fn record(&mut self, next: f64, correct: bool) -> f64 {
        self.mastery = unit(next);
        self.mastery_history.push(self.mastery);
        self.answer_history.push(correct);
        tracing::trace!(correct, mastery = self.mastery, "mastery updated");
        self.mastery
    }
}

fn posterior(numerator: f64, denominator: f64, prior: f64) -> f64 {
    if denominator.is_finite() && denominator > 0.0 {
        numerator / denominator
    } else {
        prior
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_tracker() -> KnowledgeTracker {
        KnowledgeTracker::new(BktParams::default())
    }

    #[test]
    fn test_initialization() {
        let tracker = default_tracker();
        assert_eq!(tracker.current_mastery(), 0.01);
        assert!(tracker.mastery_history().is_empty());
        assert!(tracker.answer_history().is_empty());
    }

    #[test]
    fn test_update_correct_increases_mastery() {
        let mut tracker = default_tracker();
        let next = tracker.update_correct();

        assert!(next > 0.01);
        assert_eq!(tracker.mastery_history(), &[next]);
        assert_eq!(tracker.answer_history(), &[true]);
    }

    #[test]
    fn test_update_correct_matches_closed_form() {
        let mut tracker = default_tracker();
        let next = tracker.update_correct();

        let knew = 0.01 * 0.95;
        let posterior = knew / (knew + 0.99 * 0.33);
        let expected = posterior + (1.0 - posterior) * 0.1;
        assert!((next - expected).abs() < 1e-12);
    }

    #[test]
    fn test_update_incorrect_records_false() {
        let mut tracker = default_tracker();
        let next = tracker.update_incorrect();

        let slipped = 0.01 * 0.05;
        let posterior = slipped / (slipped + 0.99 * 0.67);
        assert!((next - (posterior + 0.67 * 0.1)).abs() < 1e-12);
        assert_eq!(tracker.answer_history(), &[false]);
    }

    #[test]
    fn test_five_correct_strictly_increasing() {
        let mut tracker = default_tracker();
        let mut previous = tracker.current_mastery();

        for _ in 0..5 {
            let next = tracker.update_correct();
            assert!(next > previous);
            previous = next;
        }

        assert!(previous > 0.5);
        assert_eq!(tracker.mastery_history().len(), 5);
    }

    #[test]
    fn test_approaches_mastery_without_exceeding_one() {
        let mut tracker = KnowledgeTracker::new(BktParams {
            t: 0.2,
            ..BktParams::default()
        });

        for _ in 0..20 {
            tracker.update_correct();
        }

        assert!(tracker.current_mastery() <= 1.0);
        assert!(tracker.current_mastery() > 0.9);
    }

    #[test]
    fn test_boundary_parameters_stay_finite() {
        let mut certain = KnowledgeTracker::new(BktParams {
            l0: 1.0,
            t: 0.5,
            s: 1.0,
            g: 1.0,
        });
        assert_eq!(certain.update_correct(), 1.0);
        assert!(certain.update_incorrect().is_finite());

        let mut blank = KnowledgeTracker::new(BktParams {
            l0: 0.0,
            t: 0.0,
            s: 0.0,
            g: 1.0,
        });
        assert_eq!(blank.update_incorrect(), 0.0);
        assert_eq!(blank.update_correct(), 0.0);
    }

    #[test]
    fn test_with_defaults_replaces_missing_and_zero() {
        let params = BktParams::with_defaults(None, Some(0.0), Some(0.2), None);
        assert_eq!(params.l0, DEFAULT_L0);
        assert_eq!(params.t, DEFAULT_T);
        assert_eq!(params.s, 0.2);
        assert_eq!(params.g, DEFAULT_G);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(BktParams::default().validate().is_ok());
        let bad = BktParams {
            g: 1.2,
            ..BktParams::default()
        };
        assert!(bad.validate().is_err());
        let nan = BktParams {
            t: f64::NAN,
            ..BktParams::default()
        };
        assert!(nan.validate().is_err());
    }
}
