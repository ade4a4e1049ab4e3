pub mod guards;
pub mod router;
pub mod routes;

pub use router::{SheetwiseState, sheetwise_router};
