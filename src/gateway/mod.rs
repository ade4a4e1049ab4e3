//! Rate-limited, retrying request gateway.
//!
//! Every outbound call is queued FIFO and executed by one worker task, which enforces the
//! per-minute and per-day quotas, the retry policy and the courtesy delay.

mod job;
mod quota;
mod worker;

pub use quota::QuotaWindow;
pub use worker::{Gateway, GatewayStats};
