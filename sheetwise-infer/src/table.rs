use crate::cell::{is_boolean_literal, parse_number};
use crate::column_type::{ColumnType, infer_data_type};
use crate::header::{HEADER_SCAN_ROWS, detect_header_row};
use crate::letters::{a1_block, index_to_letter};
use crate::semantic::{SemanticFieldMapping, compute_semantic_mapping};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key carrying the physical 1-based row number of every record.
pub const ROW_KEY: &str = "_row";
/// Name of the virtual summary table appended to every schema.
pub const INFO_TABLE_NAME: &str = "_info";
/// Data rows used for typing and semantic mapping.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub header_scan_rows: usize,
    /// `None` types every data row; reads always annotate every row regardless.
    pub preview_rows: Option<usize>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            header_scan_rows: HEADER_SCAN_ROWS,
            preview_rows: Some(DEFAULT_PREVIEW_ROWS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: ColumnType,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAddress {
    pub index: usize,
    pub letter: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub source_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_sheet_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_range: Option<String>,
    /// 1-based physical row of the first data row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_start_row: Option<usize>,
    #[serde(default)]
    pub column_mapping: BTreeMap<String, ColumnAddress>,
    #[serde(default)]
    pub semantic_field_mapping: SemanticFieldMapping,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub summary: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredTable {
    pub table_name: String,
    pub columns: Vec<Column>,
    pub metadata: TableMetadata,
    pub queryable: bool,
}

impl InferredTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Where a grid came from.
#[derive(Debug, Clone, Copy)]
pub struct GridSource<'a> {
    pub resource_id: &'a str,
    pub sheet_name: Option<&'a str>,
    /// Physical 1-based row of `grid[0]`.
    pub first_row: usize,
    /// Physical 0-based column of `grid[_][0]`.
    pub first_column: usize,
}

impl<'a> GridSource<'a> {
    pub fn new(resource_id: &'a str, sheet_name: Option<&'a str>) -> Self {
        Self {
            resource_id,
            sheet_name,
            first_row: 1,
            first_column: 0,
        }
    }
}

/// Located table body inside a raw grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRegion {
    /// Grid index of the header row; `None` when names were synthesized.
    pub header_row: Option<usize>,
    pub headers: Vec<String>,
    /// Grid indices of the non-empty rows below the header, uncapped.
    pub data_rows: Vec<usize>,
    pub width: usize,
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn synthesized_name(index: usize) -> String {
    format!("column_{}", index_to_letter(index))
}

fn header_names(raw: &[String], width: usize) -> Vec<String> {
    let mut seen: AHashSet<String> = AHashSet::new();
    (0..width)
        .map(|i| {
            let base = raw
                .get(i)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty() && *c != ROW_KEY)
                .map(str::to_string)
                .unwrap_or_else(|| synthesized_name(i));
            let mut name = base.clone();
            let mut suffix = 2;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Find the header row and data rows. `None` for a grid without any non-empty cell.
pub fn locate_region(grid: &[Vec<String>], opts: &InferenceOptions) -> Option<GridRegion> {
    let first_non_empty = grid.iter().position(|r| !is_blank_row(r))?;
    let detection = detect_header_row(grid, opts.header_scan_rows);

    let data_from = match detection.header_row {
        Some(row) => row + 1,
        None => first_non_empty,
    };
    let data_rows: Vec<usize> = (data_from..grid.len())
        .filter(|i| !is_blank_row(&grid[*i]))
        .collect();

    let header_cells: &[String] = detection
        .header_row
        .and_then(|r| grid.get(r))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let width = data_rows
        .iter()
        .map(|i| grid[*i].len())
        .chain(std::iter::once(header_cells.len()))
        .max()
        .unwrap_or(0);

    Some(GridRegion {
        header_row: detection.header_row,
        headers: header_names(header_cells, width),
        data_rows,
        width,
    })
}

/// Full inference result: the schema plus what is needed to annotate rows consistently.
#[derive(Debug, Clone)]
pub struct Inference {
    pub table: InferredTable,
    pub region: GridRegion,
    pub types: Vec<ColumnType>,
    /// Semantic roles by grid column; the table metadata holds the physical columns.
    grid_mapping: SemanticFieldMapping,
    first_row: usize,
}

impl Inference {
    /// Semantic roles by grid column index.
    pub fn mapping(&self) -> &SemanticFieldMapping {
        &self.grid_mapping
    }

    pub fn physical_row(&self, grid_index: usize) -> usize {
        self.first_row + grid_index
    }

    /// Annotate one grid row with `_row`, typed column values and semantic fields.
    pub fn record(&self, grid_index: usize, row: &[String]) -> Record {
        let mut record = Record::new();
        record.insert(ROW_KEY.to_string(), Value::from(self.physical_row(grid_index)));
        for (i, name) in self.region.headers.iter().enumerate() {
            let raw = row.get(i).map(|c| c.trim()).unwrap_or_default();
            let ty = self.types.get(i).copied().unwrap_or_default();
            record.insert(name.clone(), typed_value(raw, ty));
        }
        self.mapping().annotate(row, &mut record);
        record
    }

    /// Every data row of `grid`, annotated with the same semantic mapping.
    pub fn records<'a>(&'a self, grid: &'a [Vec<String>]) -> impl Iterator<Item = Record> + 'a {
        self.region
            .data_rows
            .iter()
            .filter_map(move |i| grid.get(*i).map(|row| self.record(*i, row)))
    }
}

fn typed_value(raw: &str, ty: ColumnType) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Number => parse_number(raw)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        ColumnType::Boolean if is_boolean_literal(raw) => {
            let lower = raw.to_ascii_lowercase();
            Value::Bool(matches!(lower.as_str(), "true" | "yes" | "y"))
        }
        _ => Value::String(raw.to_string()),
    }
}

/// Infer the schema of one grid. `None` when the grid holds no data at all.
pub fn infer_table(
    table_name: &str,
    source: GridSource<'_>,
    grid: &[Vec<String>],
    opts: &InferenceOptions,
) -> Option<Inference> {
    let region = locate_region(grid, opts)?;

    let preview_len = opts
        .preview_rows
        .unwrap_or(region.data_rows.len())
        .min(region.data_rows.len());
    let preview: Vec<&[String]> = region.data_rows[..preview_len]
        .iter()
        .map(|i| grid[*i].as_slice())
        .collect();

    let types: Vec<ColumnType> = (0..region.width)
        .map(|col| {
            infer_data_type(
                preview
                    .iter()
                    .map(|row| row.get(col).map(String::as_str).unwrap_or_default()),
            )
        })
        .collect();

    let semantic = compute_semantic_mapping(&region.headers, &types, &preview);

    let mut columns = vec![Column {
        name: ROW_KEY.to_string(),
        data_type: ColumnType::Number,
        is_primary: true,
        description: Some("Physical row number in the source".to_string()),
    }];
    let mut column_mapping = BTreeMap::new();
    for (i, (name, ty)) in region.headers.iter().zip(&types).enumerate() {
        let index = source.first_column + i;
        let letter = index_to_letter(index);
        columns.push(Column {
            name: name.clone(),
            data_type: *ty,
            is_primary: false,
            description: Some(format!("Column {letter} ({ty})")),
        });
        column_mapping.insert(name.clone(), ColumnAddress { index, letter });
    }

    let first_body_row = region.header_row.or(region.data_rows.first().copied());
    let last_row = region.data_rows.last().copied().or(region.header_row);
    let physical_range = first_body_row.map(|first| {
        a1_block(
            source.sheet_name,
            source.first_column,
            region.width,
            source.first_row + first,
            last_row.map(|last| source.first_row + last),
        )
    });

    let table = InferredTable {
        table_name: table_name.to_string(),
        columns,
        metadata: TableMetadata {
            source_resource_id: source.resource_id.to_string(),
            actual_sheet_name: source.sheet_name.map(str::to_string),
            physical_range,
            data_start_row: region.data_rows.first().map(|i| source.first_row + i),
            column_mapping,
            semantic_field_mapping: semantic.shifted(source.first_column),
            summary: Map::new(),
        },
        queryable: true,
    };

    Some(Inference {
        table,
        region,
        types,
        grid_mapping: semantic,
        first_row: source.first_row,
    })
}

/// The virtual, non-queryable table describing the resource as a whole.
pub fn info_table(resource_id: &str, summary: Map<String, Value>) -> InferredTable {
    let columns = [("property", true), ("value", false)]
        .into_iter()
        .map(|(name, is_primary)| Column {
            name: name.to_string(),
            data_type: ColumnType::String,
            is_primary,
            description: None,
        })
        .collect();
    InferredTable {
        table_name: INFO_TABLE_NAME.to_string(),
        columns,
        metadata: TableMetadata {
            source_resource_id: resource_id.to_string(),
            summary,
            ..Default::default()
        },
        queryable: false,
    }
}
