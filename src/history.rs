// ⏳ Regime History Tracker - Timeline of regime periods per entity
//
// Periods are appended when the registry reports a new optant period or an
// exclusion, and never mutated. The tracker trusts upstream ordering: no sort,
// no merge, no overlap validation. Counts operate on the raw list order.

use crate::catalog::RegimeCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// REGIME PERIOD
// ============================================================================

/// One period of an entity under a regime (stored shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePeriod {
    pub regime_code: RegimeCode,

    pub start_date: NaiveDate,

    /// None = still open
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    pub active: bool,

    #[serde(default)]
    pub exclusion_reason: Option<String>,
}

impl RegimePeriod {
    pub fn open(regime_code: RegimeCode, start_date: NaiveDate) -> Self {
        RegimePeriod {
            regime_code,
            start_date,
            end_date: None,
            active: true,
            exclusion_reason: None,
        }
    }

    pub fn closed(
        regime_code: RegimeCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclusion_reason: Option<String>,
    ) -> Self {
        RegimePeriod {
            regime_code,
            start_date,
            end_date: Some(end_date),
            active: false,
            exclusion_reason,
        }
    }
}

/// History entry as it arrives in a registry optant/exclusion payload.
/// No explicit active flag: an entry without an end date is the open one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPeriodEntry {
    #[serde(alias = "regime")]
    pub regime_code: String,

    #[serde(alias = "data_inicio")]
    pub start_date: NaiveDate,

    #[serde(default, alias = "data_fim")]
    pub end_date: Option<NaiveDate>,

    #[serde(default, alias = "motivo_exclusao")]
    pub exclusion_reason: Option<String>,
}

impl From<&RegistryPeriodEntry> for RegimePeriod {
    fn from(entry: &RegistryPeriodEntry) -> Self {
        RegimePeriod {
            regime_code: RegimeCode::parse(&entry.regime_code),
            start_date: entry.start_date,
            end_date: entry.end_date,
            active: entry.end_date.is_none(),
            exclusion_reason: entry.exclusion_reason.clone(),
        }
    }
}

// ============================================================================
// TRACKER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeHistory {
    periods: Vec<RegimePeriod>,
}

impl RegimeHistory {
    pub fn new(periods: Vec<RegimePeriod>) -> Self {
        let active = periods.iter().filter(|p| p.active).count();
        if active > 1 {
            warn!(active, "regime history has more than one active period");
        }
        RegimeHistory { periods }
    }

    pub fn from_registry_entries(entries: &[RegistryPeriodEntry]) -> Self {
        Self::new(entries.iter().map(RegimePeriod::from).collect())
    }

    pub fn periods(&self) -> &[RegimePeriod] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// First active period in list order
    pub fn active_period(&self) -> Option<&RegimePeriod> {
        self.periods.iter().find(|p| p.active)
    }

    /// Codes of closed periods, in input order
    pub fn prior_regimes(&self) -> Vec<RegimeCode> {
        self.periods
            .iter()
            .filter(|p| !p.active)
            .map(|p| p.regime_code.clone())
            .collect()
    }

    /// Each closed period is one completed transition or exclusion
    pub fn completed_transition_count(&self) -> usize {
        self.periods.iter().filter(|p| !p.active).count()
    }

    /// "Was regime `was`, now regime `now`"
    pub fn was_then_now(&self, was: &RegimeCode, now: &RegimeCode) -> bool {
        grew_from(&self.prior_regimes(), was, now)
    }
}

/// True when `was` appears among closed periods and the entity has since moved to `now`
pub fn grew_from(prior_regimes: &[RegimeCode], was: &RegimeCode, now: &RegimeCode) -> bool {
    now != was && prior_regimes.contains(was)
}

// ============================================================================
// TESTS
// ============================================================================
