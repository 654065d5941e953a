// 📈 Transition Forecaster - score, confidence, breach, next regime
//
// A left fold over an ordered rule array. Every rule sees the accumulator the
// previous rule produced. Confidence is overwritten by whichever rule touches
// it last, never maximized, so the array order is observable in results.

use crate::catalog::RegimeCode;
use crate::signals::RuleInput;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Confidence::Low),
            "medium" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulator threaded through the rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForecastState {
    pub score: i32,
    pub confidence: Confidence,
}

type ForecastRule = fn(&RuleInput, ForecastState) -> ForecastState;

/// Evaluated in this exact order
const FORECAST_RULES: [(&str, ForecastRule); 4] = [
    ("ceiling_proximity", ceiling_proximity),
    ("mei_headcount_breach", mei_headcount_breach),
    ("transition_history", transition_history),
    ("long_lived_mei", long_lived_mei),
];

pub const BREACH_SCORE: i32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionForecast {
    /// Raw score before clamping
    pub score: i32,

    /// Score clamped to 0..=100
    pub transition_probability: u8,

    pub confidence: Confidence,
    pub breach_likely: bool,
    pub predicted_next_regime: RegimeCode,

    /// 12, 24, or None
    pub months_to_transition: Option<u32>,
}

pub fn forecast_transition(input: &RuleInput) -> TransitionForecast {
    let state = FORECAST_RULES
        .iter()
        .fold(ForecastState::default(), |acc, (id, rule)| {
            let next = rule(input, acc);
            if next != acc {
                debug!(rule = *id, score = next.score, confidence = %next.confidence, "forecast rule fired");
            }
            next
        });

    let months_to_transition = if state.score > 50 {
        Some(12)
    } else if state.score > 30 {
        Some(24)
    } else {
        None
    };

    TransitionForecast {
        score: state.score,
        transition_probability: state.score.clamp(0, 100) as u8,
        confidence: state.confidence,
        breach_likely: state.score >= BREACH_SCORE,
        predicted_next_regime: input.catalog.successor(&input.snapshot.current_regime),
        months_to_transition,
    }
}

/// Point estimate over the current ceiling; 0 when the regime is unbounded
pub fn ceiling_ratio(input: &RuleInput) -> f64 {
    match input.catalog.ceiling(&input.snapshot.current_regime) {
        Some(ceiling) => input.estimate.point / ceiling,
        None => 0.0,
    }
}

// ============================================================================
// RULES
// ============================================================================

fn ceiling_proximity(input: &RuleInput, mut acc: ForecastState) -> ForecastState {
    let ratio = ceiling_ratio(input);
    if ratio > 0.9 {
        acc.score += 40;
        acc.confidence = Confidence::High;
    } else if ratio > 0.7 {
        acc.score += 25;
        acc.confidence = Confidence::Medium;
    } else if ratio > 0.5 {
        acc.score += 10;
    }
    acc
}

fn mei_headcount_breach(input: &RuleInput, mut acc: ForecastState) -> ForecastState {
    let s = input.snapshot;
    if s.current_regime.is_mei() && s.headcount > 1 {
        acc.score += 50;
        acc.confidence = Confidence::High;
    }
    acc
}

fn transition_history(input: &RuleInput, mut acc: ForecastState) -> ForecastState {
    match input.snapshot.completed_transition_count {
        0 => {}
        1 => acc.score += 10,
        _ => acc.score += 15,
    }
    acc
}

fn long_lived_mei(input: &RuleInput, mut acc: ForecastState) -> ForecastState {
    let s = input.snapshot;
    if s.operating_age_years > 10 && s.current_regime.is_mei() {
        acc.score += 20;
        acc.confidence = Confidence::Medium;
    }
    acc
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RegimeCatalog, CATALOG};
    use crate::revenue::RevenueEstimate;
    use crate::sector::Sector;
    use crate::snapshot::EntitySnapshot;

    fn snapshot(regime: RegimeCode, headcount: u32, age: u32) -> EntitySnapshot {
        EntitySnapshot {
            current_regime: regime,
            headcount,
            registered_capital: 0.0,
            operating_age_years: age,
            partner_count: 0,
            sector: Sector::Default,
            size_class: None,
            mei_optant: false,
            simples_optant: false,
            completed_transition_count: 0,
            prior_regimes: Vec::new(),
        }
    }

    fn estimate(point: f64) -> RevenueEstimate {
        RevenueEstimate {
            low: 0.0,
            point,
            high: point,
            base: point,
        }
    }

    fn forecast(snapshot: &EntitySnapshot, point: f64, catalog: &RegimeCatalog) -> TransitionForecast {
        let estimate = estimate(point);
        forecast_transition(&RuleInput {
            snapshot,
            estimate: &estimate,
            catalog,
        })
    }

    #[test]
    fn test_quiet_entity() {
        let result = forecast(&snapshot(RegimeCode::LucroPresumido, 5, 2), 1_000_000.0, &CATALOG);
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.breach_likely);
        assert_eq!(result.months_to_transition, None);
        assert_eq!(result.predicted_next_regime, RegimeCode::LucroReal);
    }

    #[test]
    fn test_proximity_tiers() {
        let s = snapshot(RegimeCode::Mei, 1, 0);

        let near = forecast(&s, 75_000.0, &CATALOG);
        assert_eq!((near.score, near.confidence), (40, Confidence::High));
        assert_eq!(near.months_to_transition, Some(24));

        let mid = forecast(&s, 64_800.0, &CATALOG);
        assert_eq!((mid.score, mid.confidence), (25, Confidence::Medium));

        let low = forecast(&s, 45_000.0, &CATALOG);
        assert_eq!((low.score, low.confidence), (10, Confidence::Low));
    }

    #[test]
    fn test_mei_headcount_breach_is_unconditional() {
        let result = forecast(&snapshot(RegimeCode::Mei, 2, 0), 10_000.0, &CATALOG);
        assert_eq!(result.score, 50);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.breach_likely);
        assert_eq!(result.months_to_transition, Some(24));
    }

    #[test]
    fn test_long_lived_mei_overwrites_confidence() {
        let result = forecast(&snapshot(RegimeCode::Mei, 1, 11), 80_000.0, &CATALOG);
        assert_eq!(result.score, 60);
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.months_to_transition, Some(12));
    }

    #[test]
    fn test_transition_history_bonus() {
        let one = EntitySnapshot {
            completed_transition_count: 1,
            ..snapshot(RegimeCode::LucroPresumido, 1, 0)
        };
        let three = EntitySnapshot {
            completed_transition_count: 3,
            ..snapshot(RegimeCode::LucroPresumido, 1, 0)
        };
        assert_eq!(forecast(&one, 0.0, &CATALOG).score, 10);
        assert_eq!(forecast(&three, 0.0, &CATALOG).score, 15);
    }

    #[test]
    fn test_probability_is_clamped() {
        let s = EntitySnapshot {
            completed_transition_count: 2,
            ..snapshot(RegimeCode::Mei, 3, 12)
        };
        let result = forecast(&s, 80_000.0, &CATALOG);
        assert_eq!(result.score, 125);
        assert_eq!(result.transition_probability, 100);
        assert!(result.breach_likely);
    }

    #[test]
    fn test_unbounded_ceiling_has_no_proximity() {
        let result = forecast(&snapshot(RegimeCode::LucroReal, 1, 0), 1e12, &CATALOG);
        assert_eq!(result.score, 0);
        assert_eq!(result.predicted_next_regime, RegimeCode::LucroReal);
    }
}
