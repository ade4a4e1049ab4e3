pub mod docs;
pub mod drive;
pub mod fallback;
pub mod google_error;
pub mod sheets;

pub use docs::{BatchUpdateDocumentRequest, BatchUpdateDocumentResponse, DocRequest, Document};
pub use drive::{DriveFile, FileList};
pub use fallback::{FallbackWriteRequest, FallbackWriteResponse};
pub use google_error::{GoogleErrorBody, GoogleErrorObject};
pub use sheets::{
    AppendValuesResponse, BatchUpdateSpreadsheetRequest, BatchUpdateSpreadsheetResponse,
    ClearValuesResponse, SheetRequest, Spreadsheet, UpdateValuesResponse, ValueRange,
};
