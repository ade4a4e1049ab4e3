pub mod oauth;
pub mod query;
