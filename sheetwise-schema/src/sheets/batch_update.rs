use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    Rows,
    Columns,
}

/// Half-open `[start_index, end_index)` span of rows or columns, zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionRange {
    pub sheet_id: i64,
    pub dimension: Dimension,
    pub start_index: u64,
    pub end_index: u64,
}

impl DimensionRange {
    pub fn rows(sheet_id: i64, start_index: u64, end_index: u64) -> Self {
        Self {
            sheet_id,
            dimension: Dimension::Rows,
            start_index,
            end_index,
        }
    }
}

/// Subset of `spreadsheets.batchUpdate` requests used for structural edits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetRequest {
    #[serde(rename_all = "camelCase")]
    InsertDimension {
        range: DimensionRange,
        inherit_from_before: bool,
    },
    DeleteDimension { range: DimensionRange },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BatchUpdateSpreadsheetRequest {
    pub requests: Vec<SheetRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateSpreadsheetResponse {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub replies: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_use_wire_tags() {
        let body = BatchUpdateSpreadsheetRequest {
            requests: vec![
                SheetRequest::InsertDimension {
                    range: DimensionRange::rows(0, 4, 6),
                    inherit_from_before: true,
                },
                SheetRequest::DeleteDimension {
                    range: DimensionRange::rows(3, 10, 11),
                },
            ],
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serialize"),
            json!({"requests": [
                {"insertDimension": {
                    "range": {"sheetId": 0, "dimension": "ROWS", "startIndex": 4, "endIndex": 6},
                    "inheritFromBefore": true
                }},
                {"deleteDimension": {
                    "range": {"sheetId": 3, "dimension": "ROWS", "startIndex": 10, "endIndex": 11}
                }}
            ]})
        );
    }
}
