// 💰 Revenue Estimator - low / likely / high annual revenue
//
// base = max(headcount, 1) × sector revenue per worker
//        × capital adjustment × age adjustment
// then banded by the entity's current regime.

use crate::catalog::{RegimeCatalog, RegimeCode};
use crate::snapshot::{EntitySnapshot, SizeClass};
use serde::{Deserialize, Serialize};

/// Floor for the MEI band's low estimate
const MEI_LOW_FLOOR: f64 = 20_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueEstimate {
    pub low: f64,
    pub point: f64,
    pub high: f64,

    /// Unbanded estimate after adjustments
    pub base: f64,
}

/// Unbanded revenue estimate from headcount, sector, capital and age
pub fn base_revenue(snapshot: &EntitySnapshot) -> f64 {
    let workers = f64::from(snapshot.headcount.max(1));
    let mut base = workers * snapshot.sector.revenue_per_worker();

    // Tiers are checked low-first, so the 500k tier can never fire.
    // Downstream calibration assumes the 1.2 factor for every capital above 100k.
    let capital = snapshot.registered_capital;
    if capital > 100_000.0 {
        base *= 1.2;
    } else if capital > 500_000.0 {
        base *= 1.5;
    }

    let age = f64::from(snapshot.operating_age_years);
    if age > 5.0 {
        base *= 1.0 + 0.02 * age;
    }

    base
}

pub fn estimate_revenue(snapshot: &EntitySnapshot, catalog: &RegimeCatalog) -> RevenueEstimate {
    let base = base_revenue(snapshot);
    let regime = &snapshot.current_regime;
    let mei_ceiling = catalog.nominal_ceiling(&RegimeCode::Mei);

    let (low, high, point) = if regime.is_mei() {
        let low = (base * 0.5).max(MEI_LOW_FLOOR);
        let point = base.min(0.8 * mei_ceiling);
        (low, mei_ceiling, point)
    } else if regime.is_simples() {
        let high = match simples_size_class(snapshot, base, catalog) {
            SizeClass::Me => catalog.nominal_ceiling(&RegimeCode::SimplesMe),
            SizeClass::Epp => catalog.nominal_ceiling(&RegimeCode::SimplesEpp),
        };
        (mei_ceiling, high, base.min(0.7 * high))
    } else {
        let high = catalog.nominal_ceiling(regime);
        // Only the unbounded rung may report a point above its nominal ceiling
        let point = match catalog.ceiling(regime) {
            Some(ceiling) => base.min(ceiling),
            None => base,
        };
        (catalog.ceiling_below(regime), high, point)
    };

    RevenueEstimate {
        low: low.min(point),
        point,
        high,
        base,
    }
}

/// Size class from the code itself, then the snapshot, then the base estimate
fn simples_size_class(snapshot: &EntitySnapshot, base: f64, catalog: &RegimeCatalog) -> SizeClass {
    match snapshot.current_regime {
        RegimeCode::SimplesMe => SizeClass::Me,
        RegimeCode::SimplesEpp => SizeClass::Epp,
        _ => snapshot.size_class.unwrap_or_else(|| {
            if base > catalog.nominal_ceiling(&RegimeCode::SimplesMe) {
                SizeClass::Epp
            } else {
                SizeClass::Me
            }
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CATALOG, EPP_CEILING, LUCRO_PRESUMIDO_CEILING, ME_CEILING, MEI_CEILING};
    use crate::sector::Sector;

    fn snapshot(regime: RegimeCode, headcount: u32, capital: f64, age: u32, sector: Sector) -> EntitySnapshot {
        EntitySnapshot {
            current_regime: regime,
            headcount,
            registered_capital: capital,
            operating_age_years: age,
            partner_count: 0,
            sector,
            size_class: None,
            mei_optant: false,
            simples_optant: false,
            completed_transition_count: 0,
            prior_regimes: Vec::new(),
        }
    }

    #[test]
    fn test_headcount_floored_to_one() {
        let s = snapshot(RegimeCode::Mei, 0, 0.0, 0, Sector::Services);
        assert_eq!(base_revenue(&s), 60_000.0);
    }

    #[test]
    fn test_capital_tier_only_applies_lower_multiplier() {
        let mid = snapshot(RegimeCode::LucroPresumido, 10, 200_000.0, 0, Sector::Default);
        let high = snapshot(RegimeCode::LucroPresumido, 10, 2_000_000.0, 0, Sector::Default);
        assert!((base_revenue(&mid) - 600_000.0).abs() < 1e-6);
        assert!((base_revenue(&high) - 600_000.0).abs() < 1e-6);

        let at_threshold = snapshot(RegimeCode::LucroPresumido, 10, 100_000.0, 0, Sector::Default);
        assert_eq!(base_revenue(&at_threshold), 500_000.0);
    }

    #[test]
    fn test_age_adjustment_after_five_years() {
        let five = snapshot(RegimeCode::LucroPresumido, 1, 0.0, 5, Sector::Default);
        let ten = snapshot(RegimeCode::LucroPresumido, 1, 0.0, 10, Sector::Default);
        assert_eq!(base_revenue(&five), 50_000.0);
        assert!((base_revenue(&ten) - 60_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_mei_band() {
        let s = snapshot(RegimeCode::Mei, 1, 30_000.0, 3, Sector::Commerce);
        let estimate = estimate_revenue(&s, &CATALOG);

        assert_eq!(estimate.high, MEI_CEILING);
        assert_eq!(estimate.point, 0.8 * MEI_CEILING);
        assert_eq!(estimate.low, 40_000.0);
    }

    #[test]
    fn test_mei_low_half_of_base() {
        let s = snapshot(RegimeCode::Mei, 1, 0.0, 0, Sector::Default);
        let estimate = estimate_revenue(&s, &CATALOG);
        assert_eq!(estimate.low, 25_000.0);
        assert_eq!(estimate.point, 50_000.0);
        assert!(estimate.low >= MEI_LOW_FLOOR);
    }

    #[test]
    fn test_simples_band_by_size_class() {
        let small = snapshot(RegimeCode::SimplesNacional, 2, 0.0, 0, Sector::Commerce);
        let estimate = estimate_revenue(&small, &CATALOG);
        assert_eq!(estimate.high, ME_CEILING);
        assert_eq!(estimate.low, MEI_CEILING);
        assert_eq!(estimate.point, 160_000.0);

        let large = snapshot(RegimeCode::SimplesNacional, 60, 0.0, 0, Sector::Commerce);
        let estimate = estimate_revenue(&large, &CATALOG);
        assert_eq!(estimate.high, EPP_CEILING);
        assert!((estimate.point - 0.7 * EPP_CEILING).abs() < 1e-6);

        let declared = EntitySnapshot {
            size_class: Some(SizeClass::Epp),
            ..snapshot(RegimeCode::SimplesNacional, 2, 0.0, 0, Sector::Commerce)
        };
        assert_eq!(estimate_revenue(&declared, &CATALOG).high, EPP_CEILING);
    }

    #[test]
    fn test_other_band_uses_ladder() {
        let s = snapshot(RegimeCode::LucroPresumido, 100, 0.0, 0, Sector::Technology);
        let estimate = estimate_revenue(&s, &CATALOG);
        assert_eq!(estimate.high, LUCRO_PRESUMIDO_CEILING);
        assert_eq!(estimate.point, 12_000_000.0);
        assert_eq!(estimate.low, EPP_CEILING);
    }

    #[test]
    fn test_bounded_other_band_clamps_point_to_ceiling() {
        let s = snapshot(RegimeCode::LucroPresumido, 1_000, 0.0, 0, Sector::Technology);
        let estimate = estimate_revenue(&s, &CATALOG);
        assert_eq!(estimate.base, 120_000_000.0);
        assert_eq!(estimate.point, LUCRO_PRESUMIDO_CEILING);
        assert_eq!(estimate.high, LUCRO_PRESUMIDO_CEILING);
        assert_eq!(estimate.low, EPP_CEILING);

        let unknown = snapshot(RegimeCode::Other("UNKNOWN".to_string()), 100, 0.0, 0, Sector::Technology);
        let estimate = estimate_revenue(&unknown, &CATALOG);
        assert_eq!(estimate.point, EPP_CEILING);
        assert_eq!(estimate.high, EPP_CEILING);
        assert_eq!(estimate.low, ME_CEILING);
    }

    #[test]
    fn test_lucro_real_point_is_unclamped() {
        let s = snapshot(RegimeCode::LucroReal, 1_000, 1_000_000.0, 0, Sector::Technology);
        let estimate = estimate_revenue(&s, &CATALOG);
        assert!(estimate.point > estimate.high);
        assert!(estimate.low <= estimate.point);
    }

    #[test]
    fn test_low_never_exceeds_point() {
        let s = snapshot(RegimeCode::Mei, 3, 0.0, 0, Sector::Technology);
        let estimate = estimate_revenue(&s, &CATALOG);
        assert!(estimate.low <= estimate.point);
        assert!(estimate.point <= estimate.high);
    }
}
