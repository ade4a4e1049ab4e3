pub mod cache;
pub mod cell;
pub mod column_type;
pub mod document;
pub mod header;
pub mod letters;
pub mod semantic;
pub mod table;

pub use cache::SchemaCache;
pub use cell::{CellKind, detect_cell, is_currency, parse_currency_amount};
pub use column_type::{ColumnType, infer_data_type};
pub use document::{DocumentElement, DocumentInference, EmbeddedTable, infer_document};
pub use header::{HeaderDetection, detect_header_row, score_row_as_headers};
pub use letters::{a1_block, a1_range, index_to_letter, letter_to_index, quote_sheet_name};
pub use semantic::{SemanticFieldMapping, SemanticRole, compute_semantic_mapping};
pub use table::{
    Column, ColumnAddress, GridRegion, GridSource, INFO_TABLE_NAME, Inference, InferenceOptions,
    InferredTable, ROW_KEY, Record, TableMetadata, info_table, infer_table, locate_region,
};
