use serde::{Deserialize, Serialize};

/// Document returned by `documents.get`, reduced to the body structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Body,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
}

impl Document {
    /// Index just past the final body element.
    pub fn end_index(&self) -> u64 {
        self.body
            .content
            .iter()
            .filter_map(|e| e.end_index)
            .max()
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<Paragraph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_style: Option<ParagraphStyle>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| e.text_run.as_ref())
            .map(|r| r.content.as_str())
            .collect()
    }

    pub fn style_name(&self) -> &str {
        self.paragraph_style
            .as_ref()
            .and_then(|s| s.named_style_type.as_deref())
            .unwrap_or("NORMAL_TEXT")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_style_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub columns: u64,
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
}

impl Table {
    /// Cell text as a grid; paragraph breaks inside a cell collapse to spaces.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        self.table_rows
            .iter()
            .map(|row| row.table_cells.iter().map(TableCell::text).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

impl TableCell {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|e| e.paragraph.as_ref())
            .map(|p| p.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_paragraphs_and_tables() {
        let doc: Document = serde_json::from_value(json!({
            "documentId": "d1",
            "title": "Notes",
            "body": {"content": [
                {"startIndex": 1, "endIndex": 8, "paragraph": {
                    "elements": [{"textRun": {"content": "Hello "}}, {"textRun": {"content": "world\n"}}],
                    "paragraphStyle": {"namedStyleType": "HEADING_1"}
                }},
                {"startIndex": 8, "endIndex": 40, "table": {
                    "rows": 1, "columns": 2,
                    "tableRows": [{"tableCells": [
                        {"content": [{"paragraph": {"elements": [{"textRun": {"content": "a\n"}}]}}]},
                        {"content": [
                            {"paragraph": {"elements": [{"textRun": {"content": "b\n"}}]}},
                            {"paragraph": {"elements": [{"textRun": {"content": "c\n"}}]}}
                        ]}
                    ]}]
                }}
            ]}
        }))
        .expect("parse");

        let para = doc.body.content[0].paragraph.as_ref().expect("paragraph");
        assert_eq!(para.text(), "Hello world\n");
        assert_eq!(para.style_name(), "HEADING_1");
        let table = doc.body.content[1].table.as_ref().expect("table");
        assert_eq!(table.to_grid(), vec![vec!["a", "b c"]]);
        assert_eq!(doc.end_index(), 40);
    }
}
