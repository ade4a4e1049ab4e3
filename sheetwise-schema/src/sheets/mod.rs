mod batch_update;
mod spreadsheet;
mod values;

pub use batch_update::{
    BatchUpdateSpreadsheetRequest, BatchUpdateSpreadsheetResponse, Dimension, DimensionRange,
    SheetRequest,
};
pub use spreadsheet::{GridProperties, Sheet, SheetProperties, Spreadsheet, SpreadsheetProperties};
pub use values::{
    AppendValuesResponse, ClearValuesResponse, UpdateValuesResponse, ValueRange, cell_to_string,
};
