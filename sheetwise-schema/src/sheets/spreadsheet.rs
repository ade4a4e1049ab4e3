use serde::{Deserialize, Serialize};

/// Spreadsheet metadata (`fields=spreadsheetId,properties,sheets.properties`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_url: Option<String>,
}

impl Spreadsheet {
    pub fn sheet(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets
            .iter()
            .map(|s| &s.properties)
            .find(|p| p.title == title)
    }

    pub fn first_sheet(&self) -> Option<&SheetProperties> {
        self.sheets.iter().map(|s| &s.properties).min_by_key(|p| p.index)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Sheet {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: u64,
    #[serde(default)]
    pub column_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_row_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn looks_up_tabs_by_title_and_position() {
        let sheet: Spreadsheet = serde_json::from_value(json!({
            "spreadsheetId": "abc",
            "properties": {"title": "Budget", "timeZone": "Europe/Berlin"},
            "sheets": [
                {"properties": {"sheetId": 7, "title": "Archive", "index": 1}},
                {"properties": {"sheetId": 0, "title": "Expenses", "index": 0,
                    "gridProperties": {"rowCount": 1000, "columnCount": 26}}}
            ]
        }))
        .expect("parse");
        assert_eq!(sheet.sheet("Archive").map(|p| p.sheet_id), Some(7));
        assert_eq!(sheet.first_sheet().map(|p| p.title.as_str()), Some("Expenses"));
        assert_eq!(
            sheet.first_sheet().and_then(|p| p.grid_properties).map(|g| g.row_count),
            Some(1000)
        );
    }
}
