use crate::cell::{is_boolean_literal, is_currency, is_date, parse_number};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values inspected per column.
pub const TYPE_SAMPLE_SIZE: usize = 10;

const CURRENCY_RATIO: f64 = 0.5;
const STRICT_NUMBER_RATIO: f64 = 0.99;
const DATE_RATIO: f64 = 0.7;
const LOOSE_NUMBER_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Number,
    Currency,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Currency => "currency",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer a column type from its values.
///
/// Precedence: currency (>= 50%), number (all), date (>= 70%), boolean (all),
/// number (>= 70%), string. Empty cells are not sampled.
pub fn infer_data_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let samples: Vec<&str> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .take(TYPE_SAMPLE_SIZE)
        .collect();

    if samples.is_empty() {
        return ColumnType::String;
    }

    let total = samples.len() as f64;
    let ratio = |pred: fn(&str) -> bool| {
        samples.iter().copied().filter(|v| pred(v)).count() as f64 / total
    };

    let currency = ratio(is_currency);
    if currency >= CURRENCY_RATIO {
        return ColumnType::Currency;
    }

    let numeric = ratio(|v| parse_number(v).is_some());
    if numeric >= STRICT_NUMBER_RATIO {
        return ColumnType::Number;
    }

    if ratio(is_date) >= DATE_RATIO {
        return ColumnType::Date;
    }

    if ratio(is_boolean_literal) >= 1.0 {
        return ColumnType::Boolean;
    }

    if numeric >= LOOSE_NUMBER_RATIO {
        return ColumnType::Number;
    }

    ColumnType::String
}
