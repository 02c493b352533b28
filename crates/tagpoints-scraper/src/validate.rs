//! Cross-checks confirmation-page items against the stored checkout session.
//!
//! Checkout and confirmation pages truncate titles differently, so a pair
//! matches when either string contains the other. Generic titles can produce
//! false positives.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionMatch {
    pub confirmation: String,
    pub checkout: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    pub matches: Vec<DescriptionMatch>,
}

/// Returns every matching `(confirmation, checkout)` pair. Valid when at
/// least one pair matches.
#[must_use]
pub fn validate<I, J, A, B>(confirmation: I, checkout: J) -> Validation
where
    I: IntoIterator<Item = A>,
    J: IntoIterator<Item = B>,
    A: AsRef<str>,
    B: AsRef<str>,
{
    let checkout: Vec<String> = lowered(checkout);
    let mut matches = Vec::new();

    for confirmed in lowered(confirmation) {
        for expected in &checkout {
            if confirmed.contains(expected.as_str()) || expected.contains(confirmed.as_str()) {
                matches.push(DescriptionMatch {
                    confirmation: confirmed.clone(),
                    checkout: expected.clone(),
                });
            }
        }
    }

    Validation {
        is_valid: !matches.is_empty(),
        matches,
    }
}

/// Lowercased, trimmed, non-blank entries.
fn lowered<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn truncated_title_matches_full_title() {
        let result = validate(["Apple iPhone 15"], ["apple iphone 15 pro max 256gb"]);
        assert!(result.is_valid);
        assert_eq!(
            result.matches,
            vec![DescriptionMatch {
                confirmation: "apple iphone 15".to_owned(),
                checkout: "apple iphone 15 pro max 256gb".to_owned(),
            }]
        );
    }

    #[test]
    fn model_name_inside_longer_title_matches() {
        assert!(validate(["wireless mouse xl500"], ["mouse xl500"]).is_valid);
    }

    #[test]
    fn chair_does_not_match_desk_lamp() {
        assert!(!validate(["chair"], ["desk lamp"]).is_valid);
    }

    #[test]
    fn containment_is_checked_both_ways() {
        assert!(validate(["usb cable braided 2m"], ["USB Cable"]).is_valid);
    }

    #[test]
    fn unrelated_items_do_not_match() {
        let result = validate(["garden hose"], ["wireless mouse"]);
        assert!(!result.is_valid);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn empty_sides_are_invalid() {
        assert!(!validate(NONE, ["anything"]).is_valid);
        assert!(!validate(["anything"], NONE).is_valid);
    }

    #[test]
    fn blank_strings_never_match() {
        assert!(!validate(["  "], ["wireless mouse"]).is_valid);
        assert!(!validate(["wireless mouse"], [""]).is_valid);
    }

    #[test]
    fn reports_every_matching_pair() {
        let result = validate(["mouse", "hose"], ["wireless mouse", "mouse pad", "garden hose"]);
        assert_eq!(result.matches.len(), 3);
    }
}
