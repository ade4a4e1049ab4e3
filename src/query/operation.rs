use crate::error::WorkspaceError;
use crate::remote::is_valid_resource_id;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Every operation name a caller may submit.
pub const ALLOWED_OPERATIONS: [&str; 15] = [
    "read_rows",
    "read_all",
    "read_range",
    "list_tabs",
    "list_resources",
    "resource_exists",
    "get_metadata",
    "read_document",
    "update_cells",
    "append_rows",
    "insert_rows",
    "delete_rows",
    "clear_range",
    "append_text",
    "replace_text",
];

const MAX_RANGE_LEN: usize = 512;

static CELL_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:'(?:[^']|'')+'|[^'!]+)!)?(?:[A-Za-z]{1,3}\d*|\d+)(?::(?:[A-Za-z]{1,3}\d*|\d+))?$",
    )
    .expect("valid cell range regex")
});

static SHEET_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:'(?:[^']|'')+'|[^'!:]+)$").expect("valid sheet name regex")
});

static TEMPLATING_LEFTOVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:undefined|null|NaN)\b").expect("valid token regex"));

/// A1 range (`Sheet1!A1:C9`, `'My tab'!B:B`, `A1`) or a bare tab name.
pub fn is_valid_range(range: &str) -> bool {
    let range = range.trim();
    !range.is_empty()
        && range.len() <= MAX_RANGE_LEN
        && !TEMPLATING_LEFTOVER.is_match(range)
        && (CELL_RANGE.is_match(range) || SHEET_ONLY.is_match(range))
}

pub type Rows = Vec<Vec<Value>>;

/// One allowed operation with its typed parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    ReadRows {
        #[serde(default)]
        sheet: Option<String>,
        #[serde(default)]
        offset: Option<usize>,
        #[serde(default)]
        limit: Option<usize>,
    },
    ReadAll {
        #[serde(default)]
        sheet: Option<String>,
    },
    ReadRange {
        range: String,
    },
    ListTabs {},
    ListResources {
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    ResourceExists {
        #[serde(default, alias = "resourceId")]
        resource_id: Option<String>,
    },
    GetMetadata {},
    ReadDocument {},
    UpdateCells {
        range: String,
        values: Rows,
    },
    AppendRows {
        #[serde(default)]
        sheet: Option<String>,
        values: Rows,
    },
    InsertRows {
        #[serde(default)]
        sheet: Option<String>,
        #[serde(alias = "startIndex")]
        start_index: u64,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        values: Option<Rows>,
    },
    DeleteRows {
        #[serde(default)]
        sheet: Option<String>,
        #[serde(alias = "startIndex")]
        start_index: u64,
        #[serde(alias = "endIndex")]
        end_index: u64,
    },
    ClearRange {
        range: String,
    },
    AppendText {
        text: String,
    },
    ReplaceText {
        find: String,
        replace: String,
        #[serde(default, alias = "matchCase")]
        match_case: bool,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ReadRows { .. } => "read_rows",
            Operation::ReadAll { .. } => "read_all",
            Operation::ReadRange { .. } => "read_range",
            Operation::ListTabs {} => "list_tabs",
            Operation::ListResources { .. } => "list_resources",
            Operation::ResourceExists { .. } => "resource_exists",
            Operation::GetMetadata {} => "get_metadata",
            Operation::ReadDocument {} => "read_document",
            Operation::UpdateCells { .. } => "update_cells",
            Operation::AppendRows { .. } => "append_rows",
            Operation::InsertRows { .. } => "insert_rows",
            Operation::DeleteRows { .. } => "delete_rows",
            Operation::ClearRange { .. } => "clear_range",
            Operation::AppendText { .. } => "append_text",
            Operation::ReplaceText { .. } => "replace_text",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::UpdateCells { .. }
                | Operation::AppendRows { .. }
                | Operation::InsertRows { .. }
                | Operation::DeleteRows { .. }
                | Operation::ClearRange { .. }
                | Operation::AppendText { .. }
                | Operation::ReplaceText { .. }
        )
    }

    /// Only meaningful against a document.
    pub fn is_document_only(&self) -> bool {
        matches!(
            self,
            Operation::ReadDocument {}
                | Operation::AppendText { .. }
                | Operation::ReplaceText { .. }
        )
    }

    /// Only meaningful against a spreadsheet.
    pub fn is_sheet_only(&self) -> bool {
        matches!(
            self,
            Operation::ReadRange { .. }
                | Operation::ListTabs {}
                | Operation::UpdateCells { .. }
                | Operation::AppendRows { .. }
                | Operation::InsertRows { .. }
                | Operation::DeleteRows { .. }
                | Operation::ClearRange { .. }
        )
    }

    /// Parameters as a flat JSON object, without the tag and without unset fields.
    pub fn parameters(&self) -> serde_json::Map<String, Value> {
        let mut params = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        params.remove("operation");
        params.retain(|_, v| !v.is_null());
        params
    }

    /// Shape checks serde cannot express.
    pub fn validate(&self) -> Result<(), WorkspaceError> {
        match self {
            Operation::ReadRange { range }
            | Operation::ClearRange { range }
            | Operation::UpdateCells { range, .. } => check_range(range)?,
            _ => {}
        }
        match self {
            Operation::ReadRows { sheet, .. }
            | Operation::ReadAll { sheet }
            | Operation::AppendRows { sheet, .. }
            | Operation::InsertRows { sheet, .. }
            | Operation::DeleteRows { sheet, .. } => {
                if let Some(sheet) = sheet {
                    check_sheet(sheet)?;
                }
            }
            _ => {}
        }
        match self {
            Operation::UpdateCells { values, .. } | Operation::AppendRows { values, .. } => {
                check_rows(values)
            }
            Operation::InsertRows { count, values, .. } => {
                if *count == Some(0) {
                    return Err(invalid("count must be at least 1"));
                }
                let Some(values) = values else {
                    return Ok(());
                };
                check_rows(values)?;
                match count {
                    Some(count) if usize::try_from(*count).is_ok_and(|c| c < values.len()) => {
                        Err(invalid(format!(
                            "count ({count}) is smaller than the {} rows of values",
                            values.len()
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Operation::DeleteRows {
                start_index,
                end_index,
                ..
            } if end_index <= start_index => Err(invalid(format!(
                "end_index ({end_index}) must be greater than start_index ({start_index})"
            ))),
            Operation::ReplaceText { find, .. } if find.is_empty() => {
                Err(invalid("find must not be empty"))
            }
            Operation::AppendText { text } if text.is_empty() => {
                Err(invalid("text must not be empty"))
            }
            Operation::ResourceExists {
                resource_id: Some(id),
            } if !is_valid_resource_id(id) => {
                Err(invalid(format!("malformed resource id: {id:?}")))
            }
            _ => Ok(()),
        }
    }
}

fn invalid(message: impl Into<String>) -> WorkspaceError {
    WorkspaceError::Validation(message.into())
}

fn check_range(range: &str) -> Result<(), WorkspaceError> {
    if is_valid_range(range) {
        Ok(())
    } else {
        Err(invalid(format!("malformed range: {range:?}")))
    }
}

fn check_sheet(sheet: &str) -> Result<(), WorkspaceError> {
    if sheet.trim().is_empty() || TEMPLATING_LEFTOVER.is_match(sheet) {
        Err(invalid(format!("malformed sheet name: {sheet:?}")))
    } else {
        Ok(())
    }
}

fn check_rows(rows: &Rows) -> Result<(), WorkspaceError> {
    if rows.is_empty() {
        return Err(invalid("values must contain at least one row"));
    }
    let nested = rows
        .iter()
        .flatten()
        .any(|cell| matches!(cell, Value::Array(_) | Value::Object(_)));
    if nested {
        return Err(invalid("cell values must be scalars"));
    }
    Ok(())
}
