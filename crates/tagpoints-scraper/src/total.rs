//! Order-total extraction from rendered checkout text.
//!
//! Checkout markup changes constantly, so instead of selectors this scans the
//! page text for currency-tagged amounts and prefers the one sitting closest
//! to "total"-style phrases.

use std::sync::LazyLock;

use regex::Regex;

/// Characters inspected on each side of a candidate amount.
const CONTEXT_RADIUS: usize = 100;

/// Phrases that indicate an amount is the order total. Matched case-insensitively.
const TOTAL_PHRASES: &[&str] = &[
    "order total",
    "grand total",
    "amount payable",
    "total amount",
    "final total",
    "place your order",
];

// `R$` and `Rs` must precede `$` so the longer symbol wins at a given offset.
static SYMBOL_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<sym>R\$|Rs\.?|INR|USD|EUR|GBP|BRL|₹|\$|€|£)\s?(?P<amt>\d[\d,]*\.\d{1,2})")
        .expect("valid symbol-first regex")
});
static AMOUNT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<amt>\d[\d,]*(?:\.\d{1,2})?)\s?(?P<sym>INR|USD|EUR|GBP|BRL|₹|€|£)")
        .expect("valid amount-first regex")
});
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<sym>R\$|Rs\.?|INR|USD|EUR|GBP|BRL|₹|\$|€|£)\s?(?P<amt>\d[\d,]*)(?:/-)?")
        .expect("valid integer regex")
});

/// Currencies the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
    Brl,
}

impl Currency {
    /// Maps a matched symbol or ISO code to its currency.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "₹" | "Rs" | "Rs." | "INR" => Some(Self::Inr),
            "$" | "USD" => Some(Self::Usd),
            "€" | "EUR" => Some(Self::Eur),
            "£" | "GBP" => Some(Self::Gbp),
            "R$" | "BRL" => Some(Self::Brl),
            _ => None,
        }
    }

    /// Fixed conversion rate into USD. These are static reference rates, not
    /// live quotes.
    #[must_use]
    pub fn usd_rate(self) -> f64 {
        match self {
            Self::Inr => 0.012,
            Self::Usd => 1.0,
            Self::Eur => 1.08,
            Self::Gbp => 1.27,
            Self::Brl => 0.20,
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Brl => "BRL",
        }
    }
}

/// The winning amount and why it won.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalMatch {
    /// Amount as printed, in `currency`.
    pub amount: f64,
    pub currency: Currency,
    /// Amount converted to USD and rounded to cents.
    pub usd: f64,
    /// Number of distinct total phrases found near the amount.
    pub score: usize,
    /// Byte offset of the match in the scanned text.
    pub offset: usize,
}

#[derive(Debug)]
struct Candidate {
    start: usize,
    end: usize,
    amount: f64,
    currency: Currency,
}

/// Extracts the order total from page text, in USD.
///
/// Returns `None` when the text holds no currency-tagged amount.
#[must_use]
pub fn extract_total(text: &str) -> Option<f64> {
    extract_total_match(text).map(|m| m.usd)
}

/// Like [`extract_total`] but returns the full match details.
#[must_use]
pub fn extract_total_match(text: &str) -> Option<TotalMatch> {
    let mut best: Option<TotalMatch> = None;

    for candidate in candidates(text) {
        let window = context_window(text, candidate.start, candidate.end).to_lowercase();
        let score = TOTAL_PHRASES
            .iter()
            .filter(|phrase| window.contains(*phrase))
            .count();

        // Strictly greater: on ties the earlier match stays.
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(TotalMatch {
                amount: candidate.amount,
                currency: candidate.currency,
                usd: round_cents(candidate.amount * candidate.currency.usd_rate()),
                score,
                offset: candidate.start,
            });
        }
    }

    if let Some(found) = &best {
        tracing::debug!(
            amount = found.amount,
            currency = found.currency.code(),
            usd = found.usd,
            score = found.score,
            "extracted order total"
        );
    }
    best
}

/// All non-overlapping currency matches from the three pattern families, in
/// order of appearance. Where matches overlap, the earliest and then longest
/// one is kept.
fn candidates(text: &str) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = [&*SYMBOL_FIRST_RE, &*AMOUNT_FIRST_RE, &*INTEGER_RE]
        .into_iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let currency = Currency::from_symbol(caps.name("sym")?.as_str())?;
            let amount = parse_amount(caps.name("amt")?.as_str())?;
            Some(Candidate {
                start: whole.start(),
                end: whole.end(),
                amount,
                currency,
            })
        })
        .collect();

    found.sort_by(|a, b| a.start.cmp(&b.start).then((b.end - b.start).cmp(&(a.end - a.start))));

    let mut kept: Vec<Candidate> = Vec::with_capacity(found.len());
    for candidate in found {
        if kept.last().is_some_and(|last| candidate.start < last.end) {
            continue;
        }
        kept.push(candidate);
    }
    kept
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Slice of `text` spanning up to [`CONTEXT_RADIUS`] characters either side of
/// `start..end`.
fn context_window(text: &str, start: usize, end: usize) -> &str {
    let lo = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map_or(0, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map_or(text.len(), |(i, _)| end + i);
    &text[lo..hi]
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
