use serde::{Deserialize, Serialize};

/// Headline sentiment classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Neutral => write!(f, "Neutral"),
            Sentiment::Negative => write!(f, "Negative"),
        }
    }
}

/// Outcome of scoring the headlines for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentReport {
    pub sentiment: Sentiment,
    pub average_score: f64, // -1.0 to +1.0
    pub headlines_analyzed: usize,
    pub reason: String,
}

impl SentimentReport {
    /// Neutral report used whenever no headlines could be scored.
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            average_score: 0.0,
            headlines_analyzed: 0,
            reason: reason.into(),
        }
    }
}
