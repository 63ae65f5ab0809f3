use serde::{Deserialize, Serialize};

/// Realized volatility bucket of a price series (annualized).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolatilityClass {
    Low,
    Moderate,
    High,
    Unknown,
}

impl VolatilityClass {
    /// Per-day noise factor, as a fraction of the current price, used when
    /// synthesizing a price path. Unknown behaves like Moderate.
    pub fn noise_factor(&self) -> f64 {
        match self {
            VolatilityClass::Low => 0.003,
            VolatilityClass::Moderate => 0.006,
            VolatilityClass::High => 0.012,
            VolatilityClass::Unknown => 0.006,
        }
    }
}

impl std::fmt::Display for VolatilityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolatilityClass::Low => write!(f, "Low"),
            VolatilityClass::Moderate => write!(f, "Moderate"),
            VolatilityClass::High => write!(f, "High"),
            VolatilityClass::Unknown => write!(f, "Unknown"),
        }
    }
}
