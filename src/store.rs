// 🗄️ Inference Store - SQLite persistence collaborator
//
// - regime_periods: append-only, read back in insertion order
// - inference_results: one row per entity, last write wins
// - events: audit trail of recomputations
//
// The engine never touches this module; callers load periods from here,
// run the engine, and upsert the result.

use crate::catalog::RegimeCode;
use crate::forecast::Confidence;
use crate::history::RegimePeriod;
use crate::inference::InferenceResult;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while a recompute writes
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS regime_periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id TEXT NOT NULL,
            regime_code TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            active INTEGER NOT NULL,
            exclusion_reason TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS inference_results (
            entity_id TEXT PRIMARY KEY,
            current_regime TEXT NOT NULL,
            revenue_low REAL NOT NULL,
            revenue_high REAL NOT NULL,
            revenue_point REAL NOT NULL,
            breach_likely INTEGER NOT NULL,
            transition_probability INTEGER NOT NULL,
            confidence TEXT NOT NULL,
            predicted_next_regime TEXT NOT NULL,
            months_to_transition INTEGER,
            signals TEXT NOT NULL,
            input_digest TEXT NOT NULL,
            computed_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_periods_entity ON regime_periods(entity_id, id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// REGIME PERIODS
// ============================================================================

/// Append one period. Existing rows are never updated.
pub fn append_regime_period(conn: &Connection, entity_id: &str, period: &RegimePeriod) -> Result<()> {
    conn.execute(
        "INSERT INTO regime_periods (
            entity_id, regime_code, start_date, end_date, active, exclusion_reason
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entity_id,
            period.regime_code.as_str(),
            period.start_date.format(DATE_FORMAT).to_string(),
            period.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
            period.active,
            period.exclusion_reason,
        ],
    )?;
    Ok(())
}

/// Periods for an entity, in the order they were appended
pub fn get_regime_periods(conn: &Connection, entity_id: &str) -> Result<Vec<RegimePeriod>> {
    let mut stmt = conn.prepare(
        "SELECT regime_code, start_date, end_date, active, exclusion_reason
         FROM regime_periods
         WHERE entity_id = ?1
         ORDER BY id ASC",
    )?;

    let periods = stmt
        .query_map(params![entity_id], |row| {
            let code: String = row.get(0)?;
            let end_date: Option<String> = row.get(2)?;

            Ok(RegimePeriod {
                regime_code: RegimeCode::parse(&code),
                start_date: parse_date(row, 1)?,
                end_date: match end_date {
                    Some(_) => Some(parse_date(row, 2)?),
                    None => None,
                },
                active: row.get(3)?,
                exclusion_reason: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(periods)
}

/// One CSV row of a bulk period load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRow {
    pub entity_id: String,
    pub regime_code: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub exclusion_reason: Option<String>,
}

impl PeriodRow {
    pub fn into_period(self) -> (String, RegimePeriod) {
        let period = RegimePeriod {
            regime_code: RegimeCode::parse(&self.regime_code),
            start_date: self.start_date,
            end_date: self.end_date,
            active: self.active,
            exclusion_reason: self.exclusion_reason.filter(|r| !r.trim().is_empty()),
        };
        (self.entity_id, period)
    }
}

pub fn load_periods_csv(csv_path: &Path) -> Result<Vec<(String, RegimePeriod)>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;
    load_periods_from_reader(file)
}

pub fn load_periods_from_reader<R: Read>(reader: R) -> Result<Vec<(String, RegimePeriod)>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut periods = Vec::new();
    for (line, result) in rdr.deserialize::<PeriodRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to deserialize period row {}", line + 1))?;
        periods.push(row.into_period());
    }

    Ok(periods)
}

/// Append every loaded period inside one transaction
pub fn import_periods(conn: &mut Connection, periods: &[(String, RegimePeriod)]) -> Result<usize> {
    let tx = conn.transaction()?;
    for (entity_id, period) in periods {
        append_regime_period(&tx, entity_id, period)?;
    }
    tx.commit()?;

    info!(count = periods.len(), "regime periods imported");
    Ok(periods.len())
}

// ============================================================================
// INFERENCE RESULTS
// ============================================================================

/// Insert or overwrite the single current result for an entity
pub fn upsert_inference(conn: &Connection, result: &InferenceResult) -> Result<()> {
    let signals_json = serde_json::to_string(&result.signals)?;

    conn.execute(
        "INSERT INTO inference_results (
            entity_id, current_regime, revenue_low, revenue_high, revenue_point,
            breach_likely, transition_probability, confidence, predicted_next_regime,
            months_to_transition, signals, input_digest, computed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(entity_id) DO UPDATE SET
            current_regime = excluded.current_regime,
            revenue_low = excluded.revenue_low,
            revenue_high = excluded.revenue_high,
            revenue_point = excluded.revenue_point,
            breach_likely = excluded.breach_likely,
            transition_probability = excluded.transition_probability,
            confidence = excluded.confidence,
            predicted_next_regime = excluded.predicted_next_regime,
            months_to_transition = excluded.months_to_transition,
            signals = excluded.signals,
            input_digest = excluded.input_digest,
            computed_at = excluded.computed_at",
        params![
            result.entity_id,
            result.current_regime.as_str(),
            result.revenue_low,
            result.revenue_high,
            result.revenue_point,
            result.breach_likely,
            result.transition_probability,
            result.confidence.as_str(),
            result.predicted_next_regime.as_str(),
            result.months_to_transition,
            signals_json,
            result.input_digest,
            result.computed_at.to_rfc3339(),
        ],
    )?;

    let event = Event::new(
        "inference_recomputed",
        &result.entity_id,
        serde_json::json!({
            "transition_probability": result.transition_probability,
            "confidence": result.confidence,
            "input_digest": result.input_digest,
        }),
        "inference_engine",
    );
    insert_event(conn, &event)?;

    debug!(entity_id = %result.entity_id, "inference upserted");
    Ok(())
}

pub fn get_inference(conn: &Connection, entity_id: &str) -> Result<Option<InferenceResult>> {
    let result = conn
        .query_row(
            "SELECT entity_id, current_regime, revenue_low, revenue_high, revenue_point,
                    breach_likely, transition_probability, confidence, predicted_next_regime,
                    months_to_transition, signals, input_digest, computed_at
             FROM inference_results
             WHERE entity_id = ?1",
            params![entity_id],
            |row| {
                let current_regime: String = row.get(1)?;
                let confidence: String = row.get(7)?;
                let next_regime: String = row.get(8)?;
                let signals_json: String = row.get(10)?;

                Ok(InferenceResult {
                    entity_id: row.get(0)?,
                    current_regime: RegimeCode::parse(&current_regime),
                    revenue_low: row.get(2)?,
                    revenue_high: row.get(3)?,
                    revenue_point: row.get(4)?,
                    breach_likely: row.get(5)?,
                    transition_probability: row.get(6)?,
                    confidence: Confidence::parse(&confidence).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            7,
                            Type::Text,
                            format!("unknown confidence: {}", confidence).into(),
                        )
                    })?,
                    predicted_next_regime: RegimeCode::parse(&next_regime),
                    months_to_transition: row.get(9)?,
                    signals: serde_json::from_str(&signals_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e))
                    })?,
                    input_digest: row.get(11)?,
                    computed_at: parse_timestamp(row, 12)?,
                })
            },
        )
        .optional()?;

    Ok(result)
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(event_type: &str, entity_id: &str, data: serde_json::Value, actor: &str) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, entity_id, data, actor)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for an entity, newest first
pub fn get_events_for_entity(conn: &Connection, entity_id: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_id, data, actor
         FROM events
         WHERE entity_id = ?1
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_id], |row| {
            let data_json: String = row.get(4)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(row, 1)?,
                event_type: row.get(2)?,
                entity_id: row.get(3)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                })?,
                actor: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

// ============================================================================
// ROW HELPERS
// ============================================================================

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ============================================================================
// TESTS
// ============================================================================
