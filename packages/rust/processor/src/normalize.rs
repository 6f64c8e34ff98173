//! Text cleanup and cost/duration normalization.
//!
//! Every function here is total: unrecognized input falls back to an
//! "unspecified" value that keeps the original text.

use std::sync::LazyLock;

use regex::Regex;

use execadvisor_shared::{NOT_SPECIFIED, NormalizedCost, NormalizedDuration};

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Collapse whitespace runs into single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean every item and drop the ones that end up empty.
pub fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| clean_text(item))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Clean a text field, mapping empty results to the "Not specified" marker.
pub fn clean_field(text: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        cleaned
    }
}

fn is_unspecified(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_SPECIFIED)
}

// ---------------------------------------------------------------------------
// Costs
// ---------------------------------------------------------------------------

/// Currency patterns, tried in order.
static CURRENCY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "CHF",
            Regex::new(r"(?i)CHF\s*([\d',\.]+)").expect("valid regex"),
        ),
        (
            "EUR",
            Regex::new(r"(?i)(?:€|EUR)\s*([\d',\.]+)").expect("valid regex"),
        ),
        (
            "USD",
            Regex::new(r"(?i)(?:\$|USD)\s*([\d',\.]+)").expect("valid regex"),
        ),
    ]
});

/// Normalize a cost string like `"CHF 59,800"` into amount and currency.
pub fn normalize_costs(text: &str) -> NormalizedCost {
    let unspecified = NormalizedCost {
        amount: None,
        currency: None,
        original: text.to_string(),
    };

    if is_unspecified(text) {
        return unspecified;
    }

    for (currency, re) in CURRENCY_PATTERNS.iter() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let digits: String = caps[1].chars().filter(|c| *c != ',' && *c != '\'').collect();
        match digits.trim_end_matches('.').parse::<f64>() {
            Ok(amount) => {
                return NormalizedCost {
                    amount: Some(amount),
                    currency: Some((*currency).to_string()),
                    original: text.to_string(),
                };
            }
            Err(e) => {
                tracing::debug!(text, currency = *currency, error = %e, "cost amount is not numeric");
            }
        }
    }

    unspecified
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

static MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*months?").expect("valid regex"));

static YEAR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(\d+)\s*years?").expect("valid regex"),
        Regex::new(r"(?i)(\d+)\s*-\s*year").expect("valid regex"),
    ]
});

/// Normalize a duration string like `"18 months"` or `"2 years"` to months.
pub fn normalize_duration(text: &str) -> NormalizedDuration {
    let original = text.to_string();

    if is_unspecified(text) {
        return NormalizedDuration {
            months: None,
            original,
        };
    }

    if let Some(months) = MONTH_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
    {
        return NormalizedDuration {
            months: Some(months),
            original,
        };
    }

    let months = YEAR_RES.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .and_then(|years| years.checked_mul(12))
    });

    NormalizedDuration { months, original }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Executive \n\t MBA  "), "Executive MBA");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn clean_list_drops_empty_items() {
        let items = vec![" Strategy ".to_string(), "  ".to_string(), "Finance\n".to_string()];
        assert_eq!(clean_list(&items), vec!["Strategy", "Finance"]);
    }

    #[test]
    fn chf_with_thousands_separator() {
        let cost = normalize_costs("CHF 59,800");
        assert_eq!(cost.amount, Some(59800.0));
        assert_eq!(cost.currency.as_deref(), Some("CHF"));
        assert_eq!(cost.original, "CHF 59,800");
    }

    #[test]
    fn chf_with_swiss_apostrophe() {
        let cost = normalize_costs("Tuition fee: CHF 75'000 (all inclusive)");
        assert_eq!(cost.amount, Some(75000.0));
        assert_eq!(cost.currency.as_deref(), Some("CHF"));
    }

    #[test]
    fn euro_and_dollar() {
        let eur = normalize_costs("€ 42,500");
        assert_eq!(eur.currency.as_deref(), Some("EUR"));
        assert_eq!(eur.amount, Some(42500.0));

        let usd = normalize_costs("USD 60000");
        assert_eq!(usd.currency.as_deref(), Some("USD"));
        assert_eq!(usd.amount, Some(60000.0));
    }

    #[test]
    fn unparsable_amount_falls_through_to_next_currency() {
        let cost = normalize_costs("CHF ... or EUR 50,000");
        assert_eq!(cost.amount, Some(50000.0));
        assert_eq!(cost.currency.as_deref(), Some("EUR"));

        let none = normalize_costs("CHF ... per module");
        assert_eq!(none.amount, None);
        assert_eq!(none.currency, None);
    }

    #[test]
    fn not_specified_cost_keeps_original() {
        let cost = normalize_costs("Not specified");
        assert_eq!(cost.amount, None);
        assert_eq!(cost.currency, None);
        assert_eq!(cost.original, "Not specified");
    }

    #[test]
    fn non_numeric_amount_falls_back() {
        let cost = normalize_costs("CHF ...");
        assert_eq!(cost.amount, None);
        assert_eq!(cost.currency, None);
        assert_eq!(cost.original, "CHF ...");
    }

    #[test]
    fn cost_without_currency_is_unspecified() {
        let cost = normalize_costs("Please contact admissions");
        assert_eq!(cost.amount, None);
        assert_eq!(cost.original, "Please contact admissions");
    }

    #[test]
    fn months_are_taken_directly() {
        assert_eq!(normalize_duration("18 months").months, Some(18));
        assert_eq!(normalize_duration("1 month intensive").months, Some(1));
    }

    #[test]
    fn years_are_converted() {
        assert_eq!(normalize_duration("2 years").months, Some(24));
        assert_eq!(normalize_duration("a 2-year program").months, Some(24));
    }

    #[test]
    fn months_win_over_years() {
        assert_eq!(normalize_duration("18 months (1.5 years)").months, Some(18));
    }

    #[test]
    fn oversized_year_count_is_unspecified() {
        let d = normalize_duration("400000000 years");
        assert_eq!(d.months, None);
        assert_eq!(d.original, "400000000 years");
        assert_eq!(normalize_duration("99999999999 months").months, None);
    }

    #[test]
    fn unknown_duration_keeps_original() {
        let d = normalize_duration("part-time");
        assert_eq!(d.months, None);
        assert_eq!(d.original, "part-time");
        assert_eq!(normalize_duration("Not specified").months, None);
    }
}
