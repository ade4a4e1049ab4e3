use crate::cell::{parse_currency_amount, parse_number};
use crate::column_type::ColumnType;
use crate::header::hints_amount;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SHORT_TEXT_MAX_LEN: f64 = 20.0;
const CATEGORY_MAX_WORDS: f64 = 2.0;
const LOW_DISTINCT_RATIO: f64 = 0.5;

/// Logical roles a physical column can play in every row of one inference pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Date,
    Amount,
    AmountNumeric,
    Category,
    Description,
    Notes,
}

impl SemanticRole {
    pub const ALL: [SemanticRole; 6] = [
        SemanticRole::Date,
        SemanticRole::Amount,
        SemanticRole::AmountNumeric,
        SemanticRole::Category,
        SemanticRole::Description,
        SemanticRole::Notes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SemanticRole::Date => "date",
            SemanticRole::Amount => "amount",
            SemanticRole::AmountNumeric => "amount_numeric",
            SemanticRole::Category => "category",
            SemanticRole::Description => "description",
            SemanticRole::Notes => "notes",
        }
    }
}

/// Role -> physical column index, computed once per inference pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SemanticFieldMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_numeric: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<usize>,
}

impl SemanticFieldMapping {
    pub fn column_for(&self, role: SemanticRole) -> Option<usize> {
        match role {
            SemanticRole::Date => self.date,
            SemanticRole::Amount => self.amount,
            SemanticRole::AmountNumeric => self.amount_numeric,
            SemanticRole::Category => self.category,
            SemanticRole::Description => self.description,
            SemanticRole::Notes => self.notes,
        }
    }

    pub fn is_empty(&self) -> bool {
        SemanticRole::ALL
            .iter()
            .all(|role| self.column_for(*role).is_none())
    }

    /// Add the semantic fields of `row` to `record`.
    ///
    /// Keys already present in `record` (a column literally named `date`, say) are left alone.
    /// The same roles with every column index moved right by `offset`.
    pub fn shifted(&self, offset: usize) -> Self {
        let shift = |idx: Option<usize>| idx.map(|i| i + offset);
        Self {
            date: shift(self.date),
            amount: shift(self.amount),
            amount_numeric: shift(self.amount_numeric),
            category: shift(self.category),
            description: shift(self.description),
            notes: shift(self.notes),
        }
    }

    pub fn annotate(&self, row: &[String], record: &mut Map<String, Value>) {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
        };

        for role in SemanticRole::ALL {
            let Some(col) = self.column_for(role) else {
                continue;
            };
            let value = match role {
                SemanticRole::AmountNumeric => cell(Some(col))
                    .and_then(|raw| parse_currency_amount(raw).or_else(|| parse_number(raw)))
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                _ => cell(Some(col))
                    .map(|raw| Value::String(raw.to_string()))
                    .unwrap_or(Value::Null),
            };
            record.entry(role.key()).or_insert(value);
        }
    }
}

/// Shape statistics of one text column across all data rows.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TextProfile {
    column: usize,
    avg_len: f64,
    avg_words: f64,
    distinct_ratio: f64,
}

impl TextProfile {
    fn build(column: usize, rows: &[&[String]]) -> Option<Self> {
        let values: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.get(column))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if values.is_empty() {
            return None;
        }

        let total = values.len() as f64;
        let avg_len = values.iter().map(|v| v.chars().count()).sum::<usize>() as f64 / total;
        let avg_words = values
            .iter()
            .map(|v| v.split_whitespace().count())
            .sum::<usize>() as f64
            / total;
        let distinct: AHashSet<String> = values.iter().map(|v| v.to_lowercase()).collect();

        Some(Self {
            column,
            avg_len,
            avg_words,
            distinct_ratio: distinct.len() as f64 / total,
        })
    }

    fn is_categorical(&self) -> bool {
        self.avg_len <= SHORT_TEXT_MAX_LEN
            && self.avg_words <= CATEGORY_MAX_WORDS
            && self.distinct_ratio <= LOW_DISTINCT_RATIO
    }

    /// Higher means more category-like: short, few words, repeated values.
    fn category_score(&self) -> f64 {
        let short = if self.avg_len <= SHORT_TEXT_MAX_LEN { 1.0 } else { 0.0 };
        let terse = if self.avg_words <= CATEGORY_MAX_WORDS { 1.0 } else { 0.0 };
        let categorical = if self.is_categorical() { 1.0 } else { 0.0 };
        short + terse + categorical + (1.0 - self.distinct_ratio)
    }
}

/// First data row with the most non-empty cells; used to confirm role candidates.
fn representative_row<'a>(rows: &[&'a [String]]) -> Option<&'a [String]> {
    rows.iter()
        .copied()
        .enumerate()
        .max_by_key(|(idx, r)| {
            let filled = r.iter().filter(|c| !c.trim().is_empty()).count();
            (filled, std::cmp::Reverse(*idx))
        })
        .map(|(_, r)| r)
}

/// Assign semantic roles to columns.
///
/// `date` is the first date column, `amount` the first currency column (falling back to a
/// numeric column whose header names an amount). Text columns are ranked by how
/// category-like they are: best becomes `category`, next `description`, next `notes`.
pub fn compute_semantic_mapping(
    headers: &[String],
    types: &[ColumnType],
    rows: &[&[String]],
) -> SemanticFieldMapping {
    let sample = representative_row(rows);
    let filled_in_sample = |col: usize| {
        sample
            .and_then(|r| r.get(col))
            .is_some_and(|c| !c.trim().is_empty())
    };
    let first_of = |wanted: ColumnType| {
        let candidates: Vec<usize> = types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == wanted)
            .map(|(i, _)| i)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|c| filled_in_sample(*c))
            .or_else(|| candidates.first().copied())
    };

    let mut mapping = SemanticFieldMapping {
        date: first_of(ColumnType::Date),
        ..Default::default()
    };

    let amount = first_of(ColumnType::Currency).or_else(|| {
        types
            .iter()
            .enumerate()
            .find(|(i, t)| {
                **t == ColumnType::Number && headers.get(*i).is_some_and(|h| hints_amount(h))
            })
            .map(|(i, _)| i)
    });
    mapping.amount = amount;
    mapping.amount_numeric = amount;

    let mut profiles: Vec<TextProfile> = types
        .iter()
        .enumerate()
        .filter(|(_, t)| **t == ColumnType::String)
        .filter_map(|(i, _)| TextProfile::build(i, rows))
        .collect();

    // Stable sort keeps the leftmost column first among equal scores.
    profiles.sort_by(|a, b| b.category_score().total_cmp(&a.category_score()));

    let mut ranked = profiles.into_iter().map(|p| p.column);
    mapping.category = ranked.next();
    mapping.description = ranked.next();
    mapping.notes = ranked.next();
    mapping
}
