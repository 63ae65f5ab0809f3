use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::models::{Sentiment, SentimentReport};
use crate::services::news_service::NewsProvider;

/// Average compound score above which headlines read as Positive (and below
/// the negated value, Negative).
pub const SENTIMENT_THRESHOLD: f64 = 0.2;

const NORMALIZATION_ALPHA: f64 = 15.0;
const BOOSTER_INCREMENT: f64 = 0.293;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 3;

/// Market-flavoured valence lexicon, values on a -4..4 scale.
const LEXICON: &[(&str, f64)] = &[
    ("beat", 1.5),
    ("beats", 1.5),
    ("bullish", 2.0),
    ("boost", 1.7),
    ("breakthrough", 2.1),
    ("gain", 1.8),
    ("gains", 1.8),
    ("good", 1.9),
    ("great", 3.1),
    ("growth", 1.6),
    ("high", 0.9),
    ("improve", 1.9),
    ("optimistic", 2.4),
    ("outperform", 1.9),
    ("positive", 2.6),
    ("profit", 1.9),
    ("rally", 1.8),
    ("record", 1.0),
    ("rise", 1.2),
    ("soar", 2.2),
    ("soars", 2.2),
    ("strong", 2.3),
    ("success", 2.7),
    ("surge", 1.9),
    ("upgrade", 1.7),
    ("win", 2.8),
    ("bad", -2.5),
    ("bearish", -2.0),
    ("concern", -1.4),
    ("concerns", -1.4),
    ("crash", -2.7),
    ("decline", -1.5),
    ("downgrade", -1.6),
    ("drop", -1.1),
    ("fail", -2.5),
    ("fall", -1.3),
    ("fear", -2.2),
    ("fraud", -3.0),
    ("lawsuit", -1.8),
    ("loss", -1.3),
    ("losses", -1.3),
    ("miss", -1.2),
    ("misses", -1.2),
    ("plunge", -2.3),
    ("risk", -1.1),
    ("sell-off", -1.8),
    ("slump", -2.0),
    ("tumble", -1.9),
    ("weak", -1.9),
    ("worry", -1.9),
    ("worries", -1.9),
    ("worse", -2.1),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("very", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("hugely", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("significantly", BOOSTER_INCREMENT),
    ("slightly", -BOOSTER_INCREMENT),
    ("somewhat", -BOOSTER_INCREMENT),
    ("barely", -BOOSTER_INCREMENT),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "without", "isn't", "doesn't", "don't", "won't", "can't", "didn't"];

struct Lexicon {
    valence: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
    tokenizer: Option<Regex>,
}

impl Lexicon {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match &self.tokenizer {
            Some(re) => re.find_iter(text).map(|m| m.as_str()).collect(),
            None => text.split_whitespace().collect(),
        }
    }
}

fn lexicon() -> &'static Lexicon {
    static LEXICON_CELL: OnceLock<Lexicon> = OnceLock::new();
    LEXICON_CELL.get_or_init(|| Lexicon {
        valence: LEXICON.iter().copied().collect(),
        boosters: BOOSTERS.iter().copied().collect(),
        tokenizer: Regex::new(r"[a-z][a-z'\-]*").ok(),
    })
}

/// Compound polarity of one piece of text, in [-1, 1].
///
/// Sums word valences, letting a booster in the previous word scale the
/// magnitude and a negation within the previous three words flip it, adds
/// emphasis for exclamation marks, then normalises with x/√(x²+α).
pub fn compound_score(text: &str) -> f64 {
    let lexicon = lexicon();
    let lowered = text.to_lowercase();
    let tokens = lexicon.tokenize(&lowered);

    let mut sum = 0.0;
    for (i, token) in tokens.iter().enumerate() {
        let Some(&base) = lexicon.valence.get(*token) else { continue };
        let mut valence = base;

        if let Some(&boost) = i.checked_sub(1).and_then(|j| lexicon.boosters.get(tokens[j])) {
            valence += boost * valence.signum();
        }

        let negated = tokens[i.saturating_sub(3)..i].iter().any(|t| NEGATIONS.iter().any(|n| n == t));
        if negated {
            valence *= NEGATION_SCALAR;
        }

        sum += valence;
    }

    if sum != 0.0 {
        let exclamations = lowered.matches('!').count().min(MAX_EXCLAMATIONS);
        sum += sum.signum() * exclamations as f64 * EXCLAMATION_INCREMENT;
    }

    let score = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
    score.clamp(-1.0, 1.0)
}

pub fn classify_score(average: f64) -> Sentiment {
    if average > SENTIMENT_THRESHOLD {
        Sentiment::Positive
    } else if average < -SENTIMENT_THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Score a batch of headline titles.
pub fn score_headlines(titles: &[&str], source: &str) -> SentimentReport {
    if titles.is_empty() {
        return SentimentReport::no_data(format!("No headlines available from {}", source));
    }

    let average = titles.iter().map(|t| compound_score(t)).sum::<f64>() / titles.len() as f64;
    let sentiment = classify_score(average);

    SentimentReport {
        sentiment,
        average_score: average,
        headlines_analyzed: titles.len(),
        reason: format!(
            "{} based on {} headlines from {} (average score {:.2})",
            sentiment,
            titles.len(),
            source,
            average
        ),
    }
}

/// Fetch headlines for `symbol` and classify their average polarity.
///
/// Never fails: provider errors and empty results give a Neutral report.
pub async fn analyze(provider: &dyn NewsProvider, symbol: &str) -> SentimentReport {
    match provider.fetch_headlines(symbol).await {
        Ok(headlines) => {
            let titles: Vec<&str> = headlines.iter().map(|h| h.title.as_str()).collect();
            let report = score_headlines(&titles, provider.name());
            info!("Sentiment for {}: {} ({:.2})", symbol, report.sentiment, report.average_score);
            report
        }
        Err(e) => {
            warn!("Sentiment unavailable for {}: {}", symbol, e);
            SentimentReport::no_data(format!("No sentiment data available: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::models::Headline;
    use crate::services::news_service::MockHeadlineProvider;
    use async_trait::async_trait;

    struct BrokenNews;

    #[async_trait]
    impl NewsProvider for BrokenNews {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn fetch_headlines(&self, _symbol: &str) -> Result<Vec<Headline>, AppError> {
            Err(AppError::External("connection refused".to_string()))
        }
    }

    #[test]
    fn test_compound_score_polarity() {
        assert!(compound_score("Shares soar after record profit") > 0.5);
        assert!(compound_score("Stock tumbles on fraud lawsuit") < -0.5);
        assert_eq!(compound_score("Company holds annual meeting"), 0.0);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let plain = compound_score("results were good");
        let negated = compound_score("results were not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn test_booster_and_exclamation_increase_magnitude() {
        let plain = compound_score("strong quarter");
        assert!(compound_score("very strong quarter") > plain);
        assert!(compound_score("strong quarter!") > plain);
    }

    #[test]
    fn test_score_is_bounded() {
        let text = "great great great great great win win win success!!!";
        let score = compound_score(text);
        assert!(score <= 1.0 && score > 0.9);
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify_score(0.21), Sentiment::Positive);
        assert_eq!(classify_score(0.2), Sentiment::Neutral);
        assert_eq!(classify_score(-0.2), Sentiment::Neutral);
        assert_eq!(classify_score(-0.21), Sentiment::Negative);
    }

    #[tokio::test]
    async fn test_mock_headlines_are_neutral() {
        let report = analyze(&MockHeadlineProvider, "AAPL").await;
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert_eq!(report.headlines_analyzed, 3);
        assert!(report.reason.contains("3 headlines"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_neutral() {
        let report = analyze(&BrokenNews, "AAPL").await;
        assert_eq!(report.sentiment, Sentiment::Neutral);
        assert_eq!(report.headlines_analyzed, 0);
        assert!(report.reason.contains("No sentiment data"));
    }
}
