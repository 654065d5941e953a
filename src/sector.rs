// 🏭 Sector Classifier - Activity code → sector bucket
// Maps the two-digit CNAE division to a bucket with an average revenue per worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// Agriculture, livestock, forestry, fishing
    AgroIndustry,

    /// Food and beverage manufacturing
    FoodIndustry,

    /// Retail, wholesale, vehicle trade
    Commerce,

    /// Software, IT services, telecom, publishing
    Technology,

    /// Professional, personal, transport and hospitality services
    Services,

    /// Anything unmapped
    #[default]
    Default,
}

impl Sector {
    /// Average annual revenue per worker, in BRL
    pub fn revenue_per_worker(&self) -> f64 {
        match self {
            Sector::AgroIndustry => 70_000.0,
            Sector::FoodIndustry => 90_000.0,
            Sector::Commerce => 80_000.0,
            Sector::Technology => 120_000.0,
            Sector::Services => 60_000.0,
            Sector::Default => 50_000.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::AgroIndustry => "agro/industry",
            Sector::FoodIndustry => "food/industry",
            Sector::Commerce => "commerce",
            Sector::Technology => "technology",
            Sector::Services => "services",
            Sector::Default => "default",
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct SectorClassifier;

impl SectorClassifier {
    /// Classify an activity code by its first two digits.
    /// Punctuation is ignored ("62.01-5/01" → "62").
    pub fn classify(activity_code: &str) -> Sector {
        let digits: String = activity_code
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(2)
            .collect();

        let division: u8 = match digits.parse() {
            Ok(division) if digits.len() == 2 => division,
            _ => return Sector::Default,
        };

        match division {
            1..=3 => Sector::AgroIndustry,
            10 | 11 => Sector::FoodIndustry,
            45..=47 => Sector::Commerce,
            58 | 61..=63 => Sector::Technology,
            49..=53 | 55 | 56 | 68..=75 | 77..=82 | 85..=88 | 90..=96 => Sector::Services,
            _ => Sector::Default,
        }
    }
}
