mod batch_update;
mod document;

pub use batch_update::{
    BatchUpdateDocumentRequest, BatchUpdateDocumentResponse, DocRequest, EndOfSegmentLocation,
    SubstringMatchCriteria,
};
pub use document::{
    Body, Document, Paragraph, ParagraphElement, ParagraphStyle, StructuralElement, Table,
    TableCell, TableRow, TextRun,
};
