// 🧮 Inference Engine - one algorithm, two call sites
//
// Site A: merged entity record + stored periods + partners (result is persisted)
// Site B: registry payload at fetch time (result is a preview, never stored)
//
// Pure over its arguments: no I/O, no shared mutable state. Only `computed_at`
// differs between two runs on the same input.

use crate::catalog::{RegimeCatalog, RegimeCode, CATALOG};
use crate::forecast::{forecast_transition, Confidence};
use crate::history::{RegimeHistory, RegimePeriod};
use crate::revenue::estimate_revenue;
use crate::signals::{detect_signals, RuleInput};
use crate::snapshot::{EntityRecord, EntitySnapshot, Partner, RegistryPayload};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

// ============================================================================
// INFERENCE RESULT
// ============================================================================

/// Latest inference for one entity. Overwritten on recompute, never versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub entity_id: String,
    pub current_regime: RegimeCode,

    pub revenue_low: f64,
    pub revenue_high: f64,
    pub revenue_point: f64,

    pub breach_likely: bool,

    /// 0..=100
    pub transition_probability: u8,

    pub confidence: Confidence,
    pub predicted_next_regime: RegimeCode,
    pub months_to_transition: Option<u32>,

    /// Ordered diagnostics; the revenue summary is always last
    pub signals: Vec<String>,

    /// SHA-256 of the snapshot and periods this result was computed from
    pub input_digest: String,

    pub computed_at: DateTime<Utc>,
}

impl InferenceResult {
    /// Equal in every field except `computed_at`
    pub fn same_outcome(&self, other: &InferenceResult) -> bool {
        InferenceResult {
            computed_at: other.computed_at,
            ..self.clone()
        } == *other
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct InferenceEngine {
    catalog: &'static RegimeCatalog,
}

impl InferenceEngine {
    pub fn new() -> Self {
        InferenceEngine { catalog: &CATALOG }
    }

    pub fn catalog(&self) -> &RegimeCatalog {
        self.catalog
    }

    /// Run the engine with the current time as `computed_at`
    pub fn analyze(
        &self,
        entity_id: &str,
        snapshot: &EntitySnapshot,
        history: &RegimeHistory,
    ) -> InferenceResult {
        self.analyze_at(entity_id, snapshot, history, Utc::now())
    }

    pub fn analyze_at(
        &self,
        entity_id: &str,
        snapshot: &EntitySnapshot,
        history: &RegimeHistory,
        computed_at: DateTime<Utc>,
    ) -> InferenceResult {
        // History-derived fields always come from the history that gets digested
        let snapshot = &EntitySnapshot {
            prior_regimes: history.prior_regimes(),
            completed_transition_count: history.completed_transition_count(),
            ..snapshot.clone()
        };

        let estimate = estimate_revenue(snapshot, self.catalog);
        let input = RuleInput {
            snapshot,
            estimate: &estimate,
            catalog: self.catalog,
        };

        let signals = detect_signals(&input);
        let forecast = forecast_transition(&input);

        info!(
            entity_id,
            regime = %snapshot.current_regime,
            point = estimate.point,
            probability = forecast.transition_probability,
            confidence = %forecast.confidence,
            "inference computed"
        );

        InferenceResult {
            entity_id: entity_id.to_string(),
            current_regime: snapshot.current_regime.clone(),
            revenue_low: estimate.low,
            revenue_high: estimate.high,
            revenue_point: estimate.point,
            breach_likely: forecast.breach_likely,
            transition_probability: forecast.transition_probability,
            confidence: forecast.confidence,
            predicted_next_regime: forecast.predicted_next_regime,
            months_to_transition: forecast.months_to_transition,
            signals,
            input_digest: input_digest(snapshot, history),
            computed_at,
        }
    }

    /// Site A: merged record, stored timeline and partner list
    pub fn analyze_entity_record(
        &self,
        record: &EntityRecord,
        partners: &[Partner],
        periods: Vec<RegimePeriod>,
        as_of: NaiveDate,
    ) -> InferenceResult {
        let history = RegimeHistory::new(periods);
        let snapshot = EntitySnapshot::from_entity_record(record, partners, &history, as_of);
        self.analyze(&record.entity_id, &snapshot, &history)
    }

    /// Site B: registry payload before persistence
    pub fn preview_registry_payload(
        &self,
        payload: &RegistryPayload,
        as_of: NaiveDate,
    ) -> InferenceResult {
        let history = payload.regime_history();
        let snapshot = EntitySnapshot::from_registry_payload(payload, &history, as_of);
        self.analyze(&payload.entity_id, &snapshot, &history)
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn input_digest(snapshot: &EntitySnapshot, history: &RegimeHistory) -> String {
    let canonical = serde_json::to_vec(&(snapshot, history.periods())).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
