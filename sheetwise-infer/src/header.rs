use crate::cell::{CellKind, detect_cell};
use ahash::AHashSet;
use std::sync::LazyLock;

/// Rows from the top of a grid considered as header candidates.
pub const HEADER_SCAN_ROWS: usize = 30;
/// Rows sampled beneath a candidate when checking column consistency.
pub const CONSISTENCY_SAMPLE_ROWS: usize = 5;

const VOCABULARY_BONUS: f64 = 10.0;
const WIDTH_BONUS_PER_CELL: f64 = 2.0;
const CONSISTENCY_BONUS: f64 = 5.0;
const CONSISTENCY_THRESHOLD: f64 = 0.8;
const ROLE_MATCH_BONUS: f64 = 10.0;
const EARLY_ROW_PENALTY: f64 = 5.0;
const EARLY_ROWS: usize = 3;

static HEADER_VOCABULARY: LazyLock<AHashSet<&'static str>> = LazyLock::new(|| {
    [
        "account", "address", "amount", "assignee", "balance", "category", "city", "client",
        "code", "comment", "comments", "company", "cost", "count", "country", "created",
        "credit", "customer", "date", "day", "debit", "department", "desc", "description",
        "details", "due", "email", "end", "expense", "fee", "group", "id", "income", "invoice",
        "item", "label", "location", "memo", "merchant", "method", "month", "name", "no",
        "note", "notes", "number", "owner", "paid", "payee", "payment", "phone", "price",
        "priority", "product", "project", "qty", "quantity", "rate", "ref", "reference",
        "score", "sku", "start", "state", "status", "tag", "tags", "task", "tax", "time",
        "title", "total", "type", "updated", "value", "vendor", "year",
    ]
    .into_iter()
    .collect()
});

const AMOUNT_HINTS: [&str; 14] = [
    "amount", "balance", "cost", "credit", "debit", "expense", "fee", "income", "paid",
    "payment", "price", "spent", "tax", "total",
];

const DATE_HINTS: [&str; 9] = [
    "date", "day", "due", "created", "updated", "posted", "time", "timestamp", "when",
];

fn tokens(cell: &str) -> impl Iterator<Item = String> + '_ {
    cell.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// True when any word of the cell is a common header word.
pub fn matches_header_vocabulary(cell: &str) -> bool {
    tokens(cell).any(|t| HEADER_VOCABULARY.contains(t.as_str()))
}

pub fn hints_amount(header: &str) -> bool {
    tokens(header).any(|t| AMOUNT_HINTS.contains(&t.as_str()))
}

pub fn hints_date(header: &str) -> bool {
    tokens(header).any(|t| DATE_HINTS.contains(&t.as_str()))
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Non-empty cells of column `col` from the next non-blank rows after `row`.
fn sample_below(grid: &[Vec<String>], row: usize, col: usize, rows: usize) -> Vec<&str> {
    grid.iter()
        .skip(row + 1)
        .filter(|r| !is_blank_row(r))
        .take(rows)
        .filter_map(|r| r.get(col))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect()
}

fn share(kinds: &[CellKind], kind: CellKind) -> f64 {
    if kinds.is_empty() {
        return 0.0;
    }
    kinds.iter().filter(|k| **k == kind).count() as f64 / kinds.len() as f64
}

fn dominant(kinds: &[CellKind]) -> Option<(CellKind, f64)> {
    [
        CellKind::Currency,
        CellKind::Date,
        CellKind::Number,
        CellKind::Text,
    ]
    .into_iter()
    .map(|k| (k, share(kinds, k)))
    .filter(|(_, s)| *s > 0.0)
    .fold(None, |best, cur| match best {
        Some((_, s)) if s >= cur.1 => best,
        _ => Some(cur),
    })
}

/// Heuristic likelihood that `row` is the header row of the table in `grid`.
///
/// Rows without any text cell score zero. Scores are never negative.
pub fn score_row_as_headers(grid: &[Vec<String>], row: usize) -> f64 {
    let Some(cells) = grid.get(row) else {
        return 0.0;
    };

    let non_empty: Vec<(usize, &str, CellKind)> = cells
        .iter()
        .enumerate()
        .map(|(col, c)| (col, c.trim()))
        .filter(|(_, c)| !c.is_empty())
        .map(|(col, c)| (col, c, detect_cell(c)))
        .collect();

    if !non_empty.iter().any(|(_, _, kind)| *kind == CellKind::Text) {
        return 0.0;
    }

    let mut score = 0.0;
    for (col, cell, kind) in &non_empty {
        if *kind == CellKind::Text && matches_header_vocabulary(cell) {
            score += VOCABULARY_BONUS;
        }

        let samples = sample_below(grid, row, *col, CONSISTENCY_SAMPLE_ROWS);
        if samples.is_empty() {
            continue;
        }
        let kinds: Vec<CellKind> = samples.iter().map(|s| detect_cell(s)).collect();

        if let Some((dominant_kind, consistency)) = dominant(&kinds) {
            if consistency >= CONSISTENCY_THRESHOLD {
                score += CONSISTENCY_BONUS * consistency;
                // A label sitting on top of typed values is the strongest header signal.
                if *kind == CellKind::Text && dominant_kind.is_typed() {
                    score += CONSISTENCY_BONUS;
                }
            }
        }

        if *kind == CellKind::Text {
            if hints_amount(cell) {
                let numeric = share(&kinds, CellKind::Currency)
                    .max(share(&kinds, CellKind::Number) * 0.5);
                score += ROLE_MATCH_BONUS * numeric;
            }
            if hints_date(cell) {
                score += ROLE_MATCH_BONUS * share(&kinds, CellKind::Date);
            }
        }
    }

    score += WIDTH_BONUS_PER_CELL * non_empty.len() as f64;
    if row < EARLY_ROWS {
        score -= EARLY_ROW_PENALTY;
    }
    score.max(0.0)
}

/// Outcome of the header search over the top of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderDetection {
    /// Chosen header row; `None` when no row scored above zero.
    pub header_row: Option<usize>,
    pub score: f64,
}

/// Pick the highest scoring row among the first `scan_rows` rows; ties go to the earliest row.
pub fn detect_header_row(grid: &[Vec<String>], scan_rows: usize) -> HeaderDetection {
    let mut best = HeaderDetection {
        header_row: None,
        score: 0.0,
    };
    for row in 0..grid.len().min(scan_rows) {
        let score = score_row_as_headers(grid, row);
        if score > best.score {
            best = HeaderDetection {
                header_row: Some(row),
                score,
            };
        }
    }
    best
}
