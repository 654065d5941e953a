// Regime Forecast - Core Library
// Tax-regime classification and transition forecasting for small businesses

pub mod catalog;    // Regime ladder: ceilings + successors
pub mod sector;     // Activity code → sector bucket
pub mod history;    // Regime period timeline
pub mod snapshot;   // Normalized entity variables + site adapters
pub mod revenue;    // Low / likely / high revenue estimate
pub mod signals;    // Ordered diagnostic rules
pub mod forecast;   // Score, confidence, breach, next regime
pub mod inference;  // Engine + result record
pub mod store;      // SQLite persistence collaborator
pub mod config;     // CLI configuration

// Re-export commonly used types
pub use catalog::{RegimeCatalog, RegimeCode, RegimeDefinition, CATALOG};
pub use sector::{Sector, SectorClassifier};
pub use history::{RegimeHistory, RegimePeriod, RegistryPeriodEntry};
pub use snapshot::{
    EntityRecord, EntitySnapshot, OptantBlock, Partner, RegistryPayload, SizeClass,
};
pub use revenue::{estimate_revenue, RevenueEstimate};
pub use signals::{detect_signals, RuleInput};
pub use forecast::{forecast_transition, Confidence, TransitionForecast};
pub use inference::{InferenceEngine, InferenceResult};
pub use store::{
    setup_database, append_regime_period, get_regime_periods, load_periods_csv,
    import_periods, upsert_inference, get_inference, get_events_for_entity, Event,
};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
