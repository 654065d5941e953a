// 🪜 Regime Catalog - Static tax-regime ladder
// MEI → SIMPLES_ME → SIMPLES_EPP → LUCRO_PRESUMIDO → LUCRO_REAL
//
// Built once as an immutable constant. Every lookup is total: codes that are
// not a ladder rung resolve to the SIMPLES_EPP entry.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// REGIME CODE
// ============================================================================

/// Regime code as reported by registries or stored history.
///
/// Serialized as the upper-case string code. Parsing never fails: anything
/// unrecognized lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegimeCode {
    Mei,
    /// Coarse code for Simples optants when the registry omits ME/EPP
    SimplesNacional,
    SimplesMe,
    SimplesEpp,
    LucroPresumido,
    LucroReal,
    Other(String),
}

impl RegimeCode {
    pub fn parse(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "MEI" => RegimeCode::Mei,
            "SIMPLES_NACIONAL" | "SIMPLES" => RegimeCode::SimplesNacional,
            "SIMPLES_ME" | "ME" => RegimeCode::SimplesMe,
            "SIMPLES_EPP" | "EPP" => RegimeCode::SimplesEpp,
            "LUCRO_PRESUMIDO" => RegimeCode::LucroPresumido,
            "LUCRO_REAL" => RegimeCode::LucroReal,
            other => RegimeCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RegimeCode::Mei => "MEI",
            RegimeCode::SimplesNacional => "SIMPLES_NACIONAL",
            RegimeCode::SimplesMe => "SIMPLES_ME",
            RegimeCode::SimplesEpp => "SIMPLES_EPP",
            RegimeCode::LucroPresumido => "LUCRO_PRESUMIDO",
            RegimeCode::LucroReal => "LUCRO_REAL",
            RegimeCode::Other(code) => code,
        }
    }

    /// Any of the three Simples Nacional codes
    pub fn is_simples(&self) -> bool {
        matches!(
            self,
            RegimeCode::SimplesNacional | RegimeCode::SimplesMe | RegimeCode::SimplesEpp
        )
    }

    pub fn is_mei(&self) -> bool {
        matches!(self, RegimeCode::Mei)
    }
}

impl From<String> for RegimeCode {
    fn from(code: String) -> Self {
        RegimeCode::parse(&code)
    }
}

impl From<RegimeCode> for String {
    fn from(code: RegimeCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for RegimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REGIME DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeDefinition {
    pub code: RegimeCode,

    /// Annual revenue ceiling in BRL (None = unbounded)
    pub annual_ceiling: Option<f64>,

    /// Next rung on the ladder (terminal rung points at itself)
    pub successor: RegimeCode,
}

pub const MEI_CEILING: f64 = 81_000.0;
pub const ME_CEILING: f64 = 360_000.0;
pub const EPP_CEILING: f64 = 4_800_000.0;
pub const LUCRO_PRESUMIDO_CEILING: f64 = 78_000_000.0;

/// Index of the SIMPLES_EPP rung, used for every non-ladder code
const DEFAULT_RUNG: usize = 2;

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug)]
pub struct RegimeCatalog {
    ladder: [RegimeDefinition; 5],
}

/// The one regime ladder, ascending by ceiling.
pub static CATALOG: RegimeCatalog = RegimeCatalog {
    ladder: [
        RegimeDefinition {
            code: RegimeCode::Mei,
            annual_ceiling: Some(MEI_CEILING),
            successor: RegimeCode::SimplesMe,
        },
        RegimeDefinition {
            code: RegimeCode::SimplesMe,
            annual_ceiling: Some(ME_CEILING),
            successor: RegimeCode::SimplesEpp,
        },
        RegimeDefinition {
            code: RegimeCode::SimplesEpp,
            annual_ceiling: Some(EPP_CEILING),
            successor: RegimeCode::LucroPresumido,
        },
        RegimeDefinition {
            code: RegimeCode::LucroPresumido,
            annual_ceiling: Some(LUCRO_PRESUMIDO_CEILING),
            successor: RegimeCode::LucroReal,
        },
        RegimeDefinition {
            code: RegimeCode::LucroReal,
            annual_ceiling: None,
            successor: RegimeCode::LucroReal,
        },
    ],
};

impl RegimeCatalog {
    /// Ladder position of a code (non-ladder codes → SIMPLES_EPP rung)
    fn rung(&self, code: &RegimeCode) -> usize {
        self.ladder
            .iter()
            .position(|def| &def.code == code)
            .unwrap_or(DEFAULT_RUNG)
    }

    pub fn definition(&self, code: &RegimeCode) -> &RegimeDefinition {
        &self.ladder[self.rung(code)]
    }

    /// All rungs in ascending order
    pub fn ladder(&self) -> &[RegimeDefinition] {
        &self.ladder
    }

    /// Ceiling for a code; None only for LUCRO_REAL
    pub fn ceiling(&self, code: &RegimeCode) -> Option<f64> {
        self.definition(code).annual_ceiling
    }

    /// Finite ceiling used to build revenue bands.
    /// LUCRO_REAL reports the LUCRO_PRESUMIDO ceiling (the point where it becomes mandatory).
    pub fn nominal_ceiling(&self, code: &RegimeCode) -> f64 {
        let rung = self.rung(code);
        self.ladder[..=rung]
            .iter()
            .rev()
            .find_map(|def| def.annual_ceiling)
            .unwrap_or(0.0)
    }

    /// Ceiling of the rung one step below (0 for the first rung)
    pub fn ceiling_below(&self, code: &RegimeCode) -> f64 {
        match self.rung(code) {
            0 => 0.0,
            rung => self.nominal_ceiling(&self.ladder[rung - 1].code),
        }
    }

    pub fn successor(&self, code: &RegimeCode) -> RegimeCode {
        self.definition(code).successor.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_is_ascending() {
        let ceilings: Vec<f64> = CATALOG
            .ladder()
            .iter()
            .map(|def| CATALOG.nominal_ceiling(&def.code))
            .collect();
        assert!(ceilings.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(CATALOG.ceiling(&RegimeCode::LucroReal), None);
    }

    #[test]
    fn test_unknown_code_defaults_to_epp() {
        let unknown = RegimeCode::parse("whatever");
        assert_eq!(unknown, RegimeCode::Other("WHATEVER".to_string()));
        assert_eq!(CATALOG.ceiling(&unknown), Some(EPP_CEILING));
        assert_eq!(CATALOG.ceiling(&RegimeCode::SimplesNacional), Some(EPP_CEILING));
        assert_eq!(CATALOG.successor(&unknown), RegimeCode::LucroPresumido);
    }

    #[test]
    fn test_ceiling_below() {
        assert_eq!(CATALOG.ceiling_below(&RegimeCode::Mei), 0.0);
        assert_eq!(CATALOG.ceiling_below(&RegimeCode::SimplesMe), MEI_CEILING);
        assert_eq!(CATALOG.ceiling_below(&RegimeCode::LucroPresumido), EPP_CEILING);
        assert_eq!(
            CATALOG.ceiling_below(&RegimeCode::LucroReal),
            LUCRO_PRESUMIDO_CEILING
        );
    }

    #[test]
    fn test_successor_chain_terminates() {
        assert_eq!(CATALOG.successor(&RegimeCode::Mei), RegimeCode::SimplesMe);
        assert_eq!(CATALOG.successor(&RegimeCode::SimplesEpp), RegimeCode::LucroPresumido);
        assert_eq!(CATALOG.successor(&RegimeCode::LucroReal), RegimeCode::LucroReal);
    }

    #[test]
    fn test_code_serializes_as_string() {
        let json = serde_json::to_string(&RegimeCode::LucroPresumido).unwrap();
        assert_eq!(json, "\"LUCRO_PRESUMIDO\"");

        let parsed: RegimeCode = serde_json::from_str("\" mei \"").unwrap();
        assert_eq!(parsed, RegimeCode::Mei);
    }
}
