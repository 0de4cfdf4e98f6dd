//! Keyword fallbacks used when an inference model is not reachable.

use finpulse_core::SentimentClass;

/// Confidence reported for lexicon-derived sentiment.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Built-in finance vocabulary, lowercase and already in match form.
pub(crate) const FINANCE_TERMS: &[&str] = &[
    "stock",
    "stocks",
    "stock market",
    "market",
    "markets",
    "economy",
    "economic",
    "inflation",
    "deflation",
    "interest rate",
    "interest rates",
    "fed",
    "federal reserve",
    "earnings",
    "revenue",
    "profit",
    "investing",
    "investor",
    "investors",
    "investment",
    "crypto",
    "cryptocurrency",
    "bitcoin",
    "ethereum",
    "nasdaq",
    "dow jones",
    "s p 500",
    "shares",
    "dividend",
    "dividends",
    "bond",
    "bonds",
    "treasury",
    "yield",
    "yields",
    "recession",
    "gdp",
    "ipo",
    "etf",
    "portfolio",
    "trading",
    "trader",
    "forex",
    "currency",
    "bank",
    "banking",
    "mortgage",
    "unemployment",
    "jobs report",
    "tariff",
    "tariffs",
    "hedge fund",
    "valuation",
    "bull market",
    "bear market",
    "wall street",
    "finance",
    "financial",
];

const POSITIVE_TERMS: &[&str] = &[
    "surge", "surges", "surged", "soar", "soars", "soared", "beat", "beats", "gain", "gains",
    "gained", "rally", "rallies", "rallied", "bullish", "record high", "profit", "profits",
    "growth", "upgrade", "upgraded", "outperform", "strong", "boom", "recovery", "rebound",
    "jump", "jumps", "jumped", "rise", "rises", "rose",
];

const NEGATIVE_TERMS: &[&str] = &[
    "plunge", "plunges", "plunged", "crash", "crashes", "crashed", "loss", "losses", "bearish",
    "miss", "misses", "missed", "decline", "declines", "declined", "fall", "falls", "fell",
    "slump", "downgrade", "downgraded", "recession", "layoffs", "bankruptcy", "selloff",
    "sell off", "tumble", "tumbles", "tumbled", "drop", "drops", "dropped", "weak", "fears",
];

/// Lowercase ASCII alphanumerics, everything else collapsed to single spaces.
pub(crate) fn normalize_for_match(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finance terms matched on word boundaries: the built-in list plus the
/// configured query keywords.
#[derive(Debug, Clone)]
pub struct FinanceVocabulary {
    terms: Vec<String>,
}

impl FinanceVocabulary {
    #[must_use]
    pub fn new(keywords: &[String]) -> Self {
        let mut terms: Vec<String> = FINANCE_TERMS
            .iter()
            .map(|t| (*t).to_string())
            .chain(keywords.iter().map(|k| normalize_for_match(k)))
            .filter(|t| t.len() >= 3)
            .collect();
        terms.sort();
        terms.dedup();
        Self { terms }
    }

    /// `true` if `text` contains any term as whole words.
    #[must_use]
    pub fn mentions_finance(&self, text: &str) -> bool {
        let normalized = normalize_for_match(text);
        let padded = format!(" {normalized} ");
        let compact = normalized.replace(' ', "");
        self.terms.iter().any(|term| {
            if padded.contains(&format!(" {term} ")) {
                return true;
            }
            let compact_term = term.replace(' ', "");
            term.contains(' ') && compact_term.len() >= 6 && compact.contains(&compact_term)
        })
    }
}

fn count_hits(words: &[&str], term: &str) -> usize {
    let parts: Vec<&str> = term.split(' ').collect();
    if parts.is_empty() || parts.len() > words.len() {
        return 0;
    }
    words
        .windows(parts.len())
        .filter(|w| *w == parts.as_slice())
        .count()
}

/// Signed keyword count: positive hits minus negative hits.
#[must_use]
pub fn lexicon_score(text: &str) -> i64 {
    let normalized = normalize_for_match(text);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    let tally = |terms: &[&str]| -> i64 {
        terms
            .iter()
            .map(|t| i64::try_from(count_hits(&words, t)).unwrap_or(i64::MAX))
            .sum()
    };
    tally(POSITIVE_TERMS) - tally(NEGATIVE_TERMS)
}

/// Lexicon sentiment with the fixed fallback confidence.
#[must_use]
pub fn lexicon_sentiment(text: &str) -> (SentimentClass, f32) {
    let class = match lexicon_score(text) {
        s if s > 0 => SentimentClass::Positive,
        s if s < 0 => SentimentClass::Negative,
        _ => SentimentClass::Neutral,
    };
    (class, FALLBACK_CONFIDENCE)
}
