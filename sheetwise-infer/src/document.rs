use crate::column_type::ColumnType;
use crate::table::{
    Column, GridSource, Inference, InferenceOptions, InferredTable, ROW_KEY, Record,
    TableMetadata, infer_table,
};
use serde_json::Value;

pub const PARAGRAPH_TABLE_NAME: &str = "paragraphs";

/// Flattened body element of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentElement {
    Paragraph { style: String, text: String },
    Table { rows: Vec<Vec<String>> },
}

/// An embedded table with the grid it was inferred from.
#[derive(Debug, Clone)]
pub struct EmbeddedTable {
    pub inference: Inference,
    pub grid: Vec<Vec<String>>,
}

impl EmbeddedTable {
    pub fn records(&self) -> Vec<Record> {
        self.inference.records(&self.grid).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentInference {
    pub paragraphs: InferredTable,
    pub paragraph_records: Vec<Record>,
    pub tables: Vec<EmbeddedTable>,
}

impl DocumentInference {
    pub fn schema(&self) -> Vec<InferredTable> {
        std::iter::once(self.paragraphs.clone())
            .chain(self.tables.iter().map(|t| t.inference.table.clone()))
            .collect()
    }
}

fn paragraph_table(resource_id: &str) -> InferredTable {
    let columns = [
        ("index", ColumnType::Number, true),
        ("style", ColumnType::String, false),
        ("text", ColumnType::String, false),
    ]
    .into_iter()
    .map(|(name, data_type, is_primary)| Column {
        name: name.to_string(),
        data_type,
        is_primary,
        description: None,
    })
    .collect();

    InferredTable {
        table_name: PARAGRAPH_TABLE_NAME.to_string(),
        columns,
        metadata: TableMetadata {
            source_resource_id: resource_id.to_string(),
            ..Default::default()
        },
        queryable: true,
    }
}

/// Paragraphs become rows of one table; every embedded table becomes `table_N`.
///
/// Empty paragraphs are skipped. Paragraph `index` counts the kept paragraphs from zero.
pub fn infer_document(
    resource_id: &str,
    elements: &[DocumentElement],
    opts: &InferenceOptions,
) -> DocumentInference {
    let mut paragraph_records = Vec::new();
    let mut tables = Vec::new();

    for element in elements {
        match element {
            DocumentElement::Paragraph { style, text } => {
                let text = text.trim_end_matches(['\n', '\r']);
                if text.trim().is_empty() {
                    continue;
                }
                let index = paragraph_records.len();
                let mut record = Record::new();
                record.insert(ROW_KEY.to_string(), Value::from(index + 1));
                record.insert("index".to_string(), Value::from(index));
                record.insert("style".to_string(), Value::from(style.as_str()));
                record.insert("text".to_string(), Value::from(text));
                paragraph_records.push(record);
            }
            DocumentElement::Table { rows } => {
                let name = format!("table_{}", tables.len() + 1);
                if let Some(inference) =
                    infer_table(&name, GridSource::new(resource_id, None), rows, opts)
                {
                    tables.push(EmbeddedTable {
                        inference,
                        grid: rows.clone(),
                    });
                }
            }
        }
    }

    DocumentInference {
        paragraphs: paragraph_table(resource_id),
        paragraph_records,
        tables,
    }
}
