// 🚩 Signal Detector - Human-readable diagnostics
//
// Rules are data: an ordered table evaluated top to bottom, one string per
// rule that fires. Order only affects display. The revenue summary is always
// appended last, so every entity gets at least one signal.

use crate::catalog::{RegimeCatalog, RegimeCode};
use crate::history::grew_from;
use crate::revenue::RevenueEstimate;
use crate::snapshot::EntitySnapshot;
use tracing::debug;

/// Everything a rule may look at (history arrives folded into the snapshot)
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub snapshot: &'a EntitySnapshot,
    pub estimate: &'a RevenueEstimate,
    pub catalog: &'a RegimeCatalog,
}

/// Capital above this is unusual for an MEI
const MEI_HIGH_CAPITAL: f64 = 50_000.0;
const MEI_LONG_LIVED_YEARS: u32 = 8;
const SIMPLES_HIGH_HEADCOUNT: u32 = 50;
/// Fraction of the ME ceiling that counts as "near"
const NEAR_ME_CEILING: f64 = 0.8;

type SignalRule = fn(&RuleInput) -> Option<String>;

/// Evaluated in this order
const SIGNAL_RULES: [(&str, SignalRule); 7] = [
    ("mei_headcount_breach", mei_headcount_breach),
    ("mei_high_capital", mei_high_capital),
    ("mei_long_lived", mei_long_lived),
    ("simples_high_headcount", simples_high_headcount),
    ("simples_near_ceiling", simples_near_ceiling),
    ("grew_from_mei", grew_from_mei),
    ("multiple_transitions", multiple_transitions),
];

pub fn detect_signals(input: &RuleInput) -> Vec<String> {
    let mut signals: Vec<String> = SIGNAL_RULES
        .iter()
        .filter_map(|(id, rule)| {
            let signal = rule(input)?;
            debug!(rule = *id, %signal, "signal fired");
            Some(signal)
        })
        .collect();

    signals.push(revenue_summary(input));
    signals
}

// ============================================================================
// RULES
// ============================================================================

fn mei_headcount_breach(input: &RuleInput) -> Option<String> {
    let s = input.snapshot;
    (s.current_regime.is_mei() && s.headcount > 1).then(|| {
        format!(
            "MEI with {} employees exceeds the legal limit of 1 employee",
            s.headcount
        )
    })
}

fn mei_high_capital(input: &RuleInput) -> Option<String> {
    let s = input.snapshot;
    (s.current_regime.is_mei() && s.registered_capital > MEI_HIGH_CAPITAL).then(|| {
        format!(
            "Registered capital of {} is high for an MEI",
            format_brl(s.registered_capital)
        )
    })
}

fn mei_long_lived(input: &RuleInput) -> Option<String> {
    let s = input.snapshot;
    (s.current_regime.is_mei() && s.operating_age_years > MEI_LONG_LIVED_YEARS).then(|| {
        format!(
            "MEI operating for {} years; long-lived MEIs tend to outgrow the regime",
            s.operating_age_years
        )
    })
}

fn simples_high_headcount(input: &RuleInput) -> Option<String> {
    let s = input.snapshot;
    (s.current_regime.is_simples() && s.headcount > SIMPLES_HIGH_HEADCOUNT).then(|| {
        format!(
            "Simples Nacional entity with {} employees (significant headcount)",
            s.headcount
        )
    })
}

fn simples_near_ceiling(input: &RuleInput) -> Option<String> {
    let threshold = NEAR_ME_CEILING * input.catalog.nominal_ceiling(&RegimeCode::SimplesMe);
    let point = input.estimate.point;
    (input.snapshot.current_regime.is_simples() && point > threshold).then(|| {
        format!(
            "Estimated revenue of {} is above {} (80% of the ME ceiling)",
            format_brl(point),
            format_brl(threshold)
        )
    })
}

fn grew_from_mei(input: &RuleInput) -> Option<String> {
    let s = input.snapshot;
    grew_from(&s.prior_regimes, &RegimeCode::Mei, &s.current_regime)
        .then(|| format!("Grew from MEI to {}", s.current_regime))
}

fn multiple_transitions(input: &RuleInput) -> Option<String> {
    let count = input.snapshot.completed_transition_count;
    (count >= 2).then(|| format!("{} completed regime transitions", count))
}

fn revenue_summary(input: &RuleInput) -> String {
    let regime = &input.snapshot.current_regime;
    let point = format_brl(input.estimate.point);

    match input.catalog.ceiling(regime) {
        Some(ceiling) => format!(
            "Estimated revenue {} ({:.0}% of the {} ceiling)",
            point,
            input.estimate.point / ceiling * 100.0,
            regime
        ),
        None => format!("Estimated revenue {} (no ceiling under {})", point, regime),
    }
}

/// Whole reais with Brazilian thousands separators: 64800.0 → "R$ 64.800"
pub fn format_brl(value: f64) -> String {
    let digits = format!("{:.0}", value.max(0.0));
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("R$ {}", grouped)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;
    use crate::revenue::estimate_revenue;
    use crate::sector::Sector;

    fn snapshot(regime: RegimeCode, headcount: u32) -> EntitySnapshot {
        EntitySnapshot {
            current_regime: regime,
            headcount,
            registered_capital: 0.0,
            operating_age_years: 0,
            partner_count: 0,
            sector: Sector::Commerce,
            size_class: None,
            mei_optant: false,
            simples_optant: false,
            completed_transition_count: 0,
            prior_regimes: Vec::new(),
        }
    }

    fn signals_for(snapshot: &EntitySnapshot) -> Vec<String> {
        let estimate = estimate_revenue(snapshot, &CATALOG);
        detect_signals(&RuleInput {
            snapshot,
            estimate: &estimate,
            catalog: &CATALOG,
        })
    }

    #[test]
    fn test_rule_input_is_debuggable() {
        let s = snapshot(RegimeCode::Mei, 1);
        let estimate = estimate_revenue(&s, &CATALOG);
        let input = RuleInput {
            snapshot: &s,
            estimate: &estimate,
            catalog: &CATALOG,
        };

        let rendered = format!("{:?}", input);
        assert!(rendered.contains("RegimeCatalog"));
        assert!(rendered.contains("SIMPLES_EPP") || rendered.contains("SimplesEpp"));
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0.0), "R$ 0");
        assert_eq!(format_brl(999.4), "R$ 999");
        assert_eq!(format_brl(64_800.0), "R$ 64.800");
        assert_eq!(format_brl(4_800_000.0), "R$ 4.800.000");
    }

    #[test]
    fn test_quiet_entity_gets_only_summary() {
        let signals = signals_for(&snapshot(RegimeCode::Mei, 1));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0], "Estimated revenue R$ 64.800 (80% of the MEI ceiling)");
    }

    #[test]
    fn test_mei_rules_fire_in_order() {
        let s = EntitySnapshot {
            registered_capital: 60_000.0,
            operating_age_years: 9,
            ..snapshot(RegimeCode::Mei, 2)
        };
        let signals = signals_for(&s);

        assert_eq!(signals.len(), 4);
        assert!(signals[0].contains("legal limit of 1 employee"));
        assert!(signals[1].contains("high for an MEI"));
        assert!(signals[2].contains("9 years"));
        assert!(signals[3].starts_with("Estimated revenue"));
    }

    #[test]
    fn test_simples_near_ceiling() {
        let s = EntitySnapshot {
            size_class: Some(crate::snapshot::SizeClass::Epp),
            ..snapshot(RegimeCode::SimplesNacional, 5)
        };
        let signals = signals_for(&s);
        assert!(signals.iter().any(|m| m.contains("80% of the ME ceiling")));
    }

    #[test]
    fn test_history_rules() {
        let s = EntitySnapshot {
            prior_regimes: vec![RegimeCode::Mei, RegimeCode::SimplesMe],
            completed_transition_count: 2,
            ..snapshot(RegimeCode::LucroPresumido, 10)
        };
        let signals = signals_for(&s);

        assert_eq!(signals[0], "Grew from MEI to LUCRO_PRESUMIDO");
        assert_eq!(signals[1], "2 completed regime transitions");
    }

    #[test]
    fn test_lucro_real_summary_has_no_percentage() {
        let signals = signals_for(&snapshot(RegimeCode::LucroReal, 10));
        assert_eq!(signals.last().unwrap(), "Estimated revenue R$ 800.000 (no ceiling under LUCRO_REAL)");
    }
}
