use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rectangle of cell values as returned by `values.get` and sent to `values.update`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,

    /// Trailing empty rows and cells are omitted by the service.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    pub fn rows(values: Vec<Vec<Value>>) -> Self {
        Self {
            range: None,
            major_dimension: Some("ROWS".to_string()),
            values,
        }
    }

    /// Cells rendered as display strings.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        self.values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect()
    }
}

pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub updated_range: String,
    #[serde(default)]
    pub updated_rows: u64,
    #[serde(default)]
    pub updated_columns: u64,
    #[serde(default)]
    pub updated_cells: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: UpdateValuesResponse,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub cleared_range: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn grid_renders_mixed_cells() {
        let range: ValueRange = serde_json::from_value(json!({
            "range": "Sheet1!A1:C2",
            "majorDimension": "ROWS",
            "values": [["Date", "Qty", "Ok"], ["2024-01-01", 3, true]]
        }))
        .expect("parse");
        assert_eq!(
            range.to_grid(),
            vec![vec!["Date", "Qty", "Ok"], vec!["2024-01-01", "3", "true"]]
        );
    }

    #[test]
    fn missing_values_mean_empty_range() {
        let range: ValueRange =
            serde_json::from_value(json!({"range": "Sheet1!A1:Z"})).expect("parse");
        assert!(range.to_grid().is_empty());
    }
}
