// 📸 Entity Snapshot Builder - Minimal variable set for the engine
//
// Rebuilt on every run, never stored. Two adapters feed it:
// - Site A: merged internal entity record + partner list + stored periods
// - Site B: freshly fetched registry payload (optant/exclusion blocks)
//
// Missing values become defaults (zero age, zero capital, zero headcount,
// default sector) instead of errors.

use crate::catalog::RegimeCode;
use crate::history::{RegimeHistory, RegimePeriod, RegistryPeriodEntry};
use crate::sector::{Sector, SectorClassifier};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// SIZE CLASS
// ============================================================================

/// Registry size class ("porte") for Simples optants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeClass {
    /// Microempresa
    Me,
    /// Empresa de pequeno porte
    Epp,
}

impl SizeClass {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        match normalized.as_str() {
            "ME" | "01" | "1" | "MICRO EMPRESA" | "MICROEMPRESA" => Some(SizeClass::Me),
            "EPP" | "03" | "3" | "EMPRESA DE PEQUENO PORTE" => Some(SizeClass::Epp),
            _ => None,
        }
    }
}

// ============================================================================
// ENTITY SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub current_regime: RegimeCode,
    pub headcount: u32,
    pub registered_capital: f64,

    /// Whole years since incorporation
    pub operating_age_years: u32,

    pub partner_count: u32,
    pub sector: Sector,
    pub size_class: Option<SizeClass>,
    pub mei_optant: bool,
    pub simples_optant: bool,
    pub completed_transition_count: usize,

    /// Codes of closed periods, in history order
    pub prior_regimes: Vec<RegimeCode>,
}

/// Fields both adapters agree on, before history is folded in
struct SnapshotFields {
    activity_code: Option<String>,
    headcount: Option<u32>,
    registered_capital: Option<f64>,
    incorporation_date: Option<NaiveDate>,
    size_class: Option<String>,
    declared_regime: Option<String>,
    mei_optant: bool,
    simples_optant: bool,
    partner_count: u32,
}

impl EntitySnapshot {
    /// Site A: merged entity record, partner list, and the stored timeline
    pub fn from_entity_record(
        record: &EntityRecord,
        partners: &[Partner],
        history: &RegimeHistory,
        as_of: NaiveDate,
    ) -> Self {
        let fields = SnapshotFields {
            activity_code: record.activity_code.clone(),
            headcount: record.headcount,
            registered_capital: record.registered_capital,
            incorporation_date: record.incorporation_date,
            size_class: record.size_class.clone(),
            declared_regime: record.declared_regime.clone(),
            mei_optant: record.mei_optant,
            simples_optant: record.simples_optant,
            partner_count: u32::try_from(partners.len()).unwrap_or(u32::MAX),
        };
        Self::build(fields, history, as_of)
    }

    /// Site B: registry payload, before anything is persisted
    pub fn from_registry_payload(
        payload: &RegistryPayload,
        history: &RegimeHistory,
        as_of: NaiveDate,
    ) -> Self {
        let fields = SnapshotFields {
            activity_code: payload.activity_code.clone(),
            headcount: payload.headcount,
            registered_capital: payload.registered_capital,
            incorporation_date: payload.incorporation_date,
            size_class: payload.size_class.clone(),
            declared_regime: None,
            mei_optant: payload.mei.as_ref().is_some_and(|b| b.optant),
            simples_optant: payload.simples.as_ref().is_some_and(|b| b.optant),
            partner_count: 0,
        };
        Self::build(fields, history, as_of)
    }

    fn build(fields: SnapshotFields, history: &RegimeHistory, as_of: NaiveDate) -> Self {
        let current_regime = resolve_current_regime(
            fields.mei_optant,
            fields.simples_optant,
            history,
            fields.declared_regime.as_deref(),
        );

        let operating_age_years = fields
            .incorporation_date
            .and_then(|date| as_of.years_since(date))
            .unwrap_or(0);

        EntitySnapshot {
            current_regime,
            headcount: fields.headcount.unwrap_or(0),
            registered_capital: fields.registered_capital.unwrap_or(0.0).max(0.0),
            operating_age_years,
            partner_count: fields.partner_count,
            sector: fields
                .activity_code
                .as_deref()
                .map(SectorClassifier::classify)
                .unwrap_or_default(),
            size_class: fields.size_class.as_deref().and_then(SizeClass::parse),
            mei_optant: fields.mei_optant,
            simples_optant: fields.simples_optant,
            completed_transition_count: history.completed_transition_count(),
            prior_regimes: history.prior_regimes(),
        }
    }
}

/// MEI optant → Simples optant → active period → declared regime → UNKNOWN
fn resolve_current_regime(
    mei_optant: bool,
    simples_optant: bool,
    history: &RegimeHistory,
    declared_regime: Option<&str>,
) -> RegimeCode {
    if mei_optant {
        return RegimeCode::Mei;
    }
    if simples_optant {
        return RegimeCode::SimplesNacional;
    }
    if let Some(period) = history.active_period() {
        return period.regime_code.clone();
    }
    declared_regime
        .map(RegimeCode::parse)
        .unwrap_or_else(|| RegimeCode::Other("UNKNOWN".to_string()))
}

// ============================================================================
// SITE A INPUT: MERGED ENTITY RECORD
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Registry identifier (CNPJ)
    pub entity_id: String,

    #[serde(default)]
    pub legal_name: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub activity_code: Option<String>,

    #[serde(default)]
    pub headcount: Option<u32>,

    #[serde(default)]
    pub registered_capital: Option<f64>,

    #[serde(default)]
    pub incorporation_date: Option<NaiveDate>,

    #[serde(default)]
    pub size_class: Option<String>,

    /// Regime the record claims when the entity is not an optant
    #[serde(default)]
    pub declared_regime: Option<String>,

    #[serde(default)]
    pub mei_optant: bool,

    #[serde(default)]
    pub simples_optant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,

    #[serde(default)]
    pub qualification: Option<String>,

    #[serde(default)]
    pub joined_on: Option<NaiveDate>,
}

// ============================================================================
// SITE B INPUT: REGISTRY PAYLOAD
// ============================================================================

/// Optant/exclusion block as published by the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptantBlock {
    #[serde(default, alias = "optante")]
    pub optant: bool,

    #[serde(default, alias = "data_opcao")]
    pub opted_on: Option<NaiveDate>,

    #[serde(default, alias = "data_exclusao")]
    pub excluded_on: Option<NaiveDate>,

    #[serde(default, alias = "motivo_exclusao")]
    pub exclusion_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryPayload {
    #[serde(alias = "cnpj")]
    pub entity_id: String,

    #[serde(default, alias = "cnae_fiscal", deserialize_with = "string_or_number")]
    pub activity_code: Option<String>,

    #[serde(default, alias = "capital_social", deserialize_with = "amount")]
    pub registered_capital: Option<f64>,

    #[serde(default, alias = "data_inicio_atividade")]
    pub incorporation_date: Option<NaiveDate>,

    #[serde(default, alias = "porte")]
    pub size_class: Option<String>,

    #[serde(default)]
    pub headcount: Option<u32>,

    #[serde(default)]
    pub mei: Option<OptantBlock>,

    #[serde(default)]
    pub simples: Option<OptantBlock>,

    /// Explicit period list, when the registry publishes one
    #[serde(default, alias = "historico")]
    pub history: Vec<RegistryPeriodEntry>,
}

impl RegistryPayload {
    /// Timeline for this payload. An explicit history array wins; otherwise
    /// periods are derived from the MEI block, then the Simples block.
    pub fn regime_history(&self) -> RegimeHistory {
        if !self.history.is_empty() {
            return RegimeHistory::from_registry_entries(&self.history);
        }

        let blocks = [
            (RegimeCode::Mei, self.mei.as_ref()),
            (RegimeCode::SimplesNacional, self.simples.as_ref()),
        ];

        let periods = blocks
            .into_iter()
            .filter_map(|(code, block)| {
                let block = block?;
                let start_date = block.opted_on?;
                Some(RegimePeriod {
                    regime_code: code,
                    start_date,
                    end_date: block.excluded_on,
                    active: block.optant && block.excluded_on.is_none(),
                    exclusion_reason: block.exclusion_reason.clone(),
                })
            })
            .collect();

        RegimeHistory::new(periods)
    }
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Activity codes arrive as strings ("62.01-5-01") or bare numbers (6201501).
/// Numbers are left-padded to seven digits so divisions 01-09 survive.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(code)) => Some(code),
        Some(serde_json::Value::Number(n)) => match n.as_u64() {
            Some(code) => Some(format!("{:07}", code)),
            None => Some(n.to_string()),
        },
        _ => None,
    })
}

/// Capital arrives as a number or a decimal string ("15000.00")
fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

// ============================================================================
// TESTS
// ============================================================================
