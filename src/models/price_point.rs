use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// A single daily close for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate, // serialized as %Y-%m-%d
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }

    /// Usable closes are finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Latest close plus the move from the previous close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentPriceSnapshot {
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
}

impl CurrentPriceSnapshot {
    /// Build a snapshot from the last two closes of a chronological series.
    ///
    /// With a single close the previous price equals the current one. Returns
    /// `None` for an empty series.
    pub fn from_closes(closes: &[f64]) -> Option<Self> {
        let current = *closes.last()?;
        let previous = if closes.len() > 1 {
            closes[closes.len() - 2]
        } else {
            current
        };

        let price_change = current - previous;
        let price_change_percent = if previous != 0.0 {
            price_change / previous * 100.0
        } else {
            0.0
        };

        Some(Self {
            current_price: current,
            price_change,
            price_change_percent,
        })
    }
}

/// Chart-ready history plus the latest move, as served by the prices route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub period: HistoryPeriod,
    pub historical_data: Vec<PricePoint>,
    pub current: Option<CurrentPriceSnapshot>,
}

/// How much history to request from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl HistoryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::OneMonth => "1mo",
            HistoryPeriod::ThreeMonths => "3mo",
            HistoryPeriod::SixMonths => "6mo",
            HistoryPeriod::OneYear => "1y",
        }
    }

    /// Approximate number of calendar days covered.
    pub fn calendar_days(&self) -> u32 {
        match self {
            HistoryPeriod::OneMonth => 31,
            HistoryPeriod::ThreeMonths => 92,
            HistoryPeriod::SixMonths => 183,
            HistoryPeriod::OneYear => 366,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "1mo" => Some(HistoryPeriod::OneMonth),
            "3mo" => Some(HistoryPeriod::ThreeMonths),
            "6mo" => Some(HistoryPeriod::SixMonths),
            "1y" => Some(HistoryPeriod::OneYear),
            _ => None,
        }
    }
}

impl std::fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
