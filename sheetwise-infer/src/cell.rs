use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Per-cell classification, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Currency,
    Date,
    Number,
    Text,
    Empty,
}

impl CellKind {
    /// True for kinds that look like data rather than a label.
    pub fn is_typed(self) -> bool {
        matches!(self, CellKind::Currency | CellKind::Date | CellKind::Number)
    }
}

const CURRENCY_SYMBOLS: &str = r"(?:[$€£¥₹₩₽¢]|USD|EUR|GBP|JPY|INR|CAD|AUD|CHF)";
const AMOUNT_BODY: &str = r"(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)";
const MONTHS: &str = r"(?i:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-zA-Z]*\.?";

static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^[-+]?\s*(?:{sym}\s*[-+]?\s*{num}|{num}\s*{sym})$",
        sym = CURRENCY_SYMBOLS,
        num = AMOUNT_BODY
    );
    Regex::new(&pattern).expect("valid currency pattern")
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^\d{4}-\d{1,2}-\d{1,2}(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$"
            .to_string(),
        r"^\d{4}/\d{1,2}/\d{1,2}$".to_string(),
        r"^\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}$".to_string(),
        format!(r"^{MONTHS}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}$"),
        format!(r"^\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTHS},?\s+\d{{4}}$"),
        format!(r"^{MONTHS}\s+\d{{4}}$"),
        format!(r"^\d{{1,2}}-{MONTHS}-\d{{2,4}}$"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid date pattern"))
    .collect()
});

static PLAIN_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?$").expect("valid number pattern")
});

static GROUPED_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\d{1,3}(?:,\d{3})+(?:\.\d+)?$").expect("valid grouped number pattern")
});

const BOOLEAN_LITERALS: [&str; 6] = ["true", "false", "yes", "no", "y", "n"];

/// Generic fallback formats tried after the literal date patterns.
const LOOSE_DATE_FORMATS: [&str; 4] = ["%d %B %Y", "%B %d %Y", "%A, %B %d, %Y", "%Y.%m.%d"];

/// Classify one cell: currency, then date, then number, then text, else empty.
pub fn detect_cell(raw: &str) -> CellKind {
    let value = raw.trim();
    if value.is_empty() {
        CellKind::Empty
    } else if is_currency(value) {
        CellKind::Currency
    } else if is_date(value) {
        CellKind::Date
    } else if parse_number(value).is_some() {
        CellKind::Number
    } else {
        CellKind::Text
    }
}

/// Symbol-prefixed or suffixed amount, optionally wrapped in accounting parentheses.
pub fn is_currency(raw: &str) -> bool {
    let value = raw.trim();
    let inner = match (value.strip_prefix('('), value.strip_suffix(')')) {
        (Some(_), Some(_)) if value.len() >= 2 => &value[1..value.len() - 1],
        (None, None) => value,
        _ => return false,
    };
    CURRENCY_RE.is_match(inner.trim())
}

/// Numeric value of a currency-like string.
///
/// Everything except digits, `.` and `-` is stripped; accounting parentheses negate.
pub fn parse_currency_amount(raw: &str) -> Option<f64> {
    let value = raw.trim();
    let negate = value.starts_with('(') && value.ends_with(')');
    let stripped: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let amount: f64 = stripped.parse().ok()?;
    if !amount.is_finite() {
        return None;
    }
    Some(if negate { -amount.abs() } else { amount })
}

pub fn is_date(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() {
        return false;
    }
    if DATE_PATTERNS.iter().any(|re| re.is_match(value)) {
        return true;
    }
    // Pure numbers are never dates here, even when a parser would accept them.
    if PLAIN_NUMBER_RE.is_match(value) {
        return false;
    }
    DateTime::parse_from_rfc3339(value).is_ok()
        || DateTime::parse_from_rfc2822(value).is_ok()
        || LOOSE_DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Parse a plain number, accepting thousands separators and a trailing `%`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let value = raw.trim();
    let value = value.strip_suffix('%').map(str::trim_end).unwrap_or(value);
    let parsed = if PLAIN_NUMBER_RE.is_match(value) {
        value.parse::<f64>().ok()?
    } else if GROUPED_NUMBER_RE.is_match(value) {
        value.replace(',', "").parse::<f64>().ok()?
    } else {
        return None;
    };
    parsed.is_finite().then_some(parsed)
}

pub fn is_boolean_literal(raw: &str) -> bool {
    let value = raw.trim().to_ascii_lowercase();
    BOOLEAN_LITERALS.contains(&value.as_str())
}
