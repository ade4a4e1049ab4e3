use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Error envelope returned by the workspace REST APIs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GoogleErrorBody {
    #[serde(rename = "error")]
    #[serde(default)]
    pub inner: GoogleErrorObject,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GoogleErrorObject {
    #[serde(default)]
    pub code: u16,

    #[serde(default)]
    pub message: String,

    /// Canonical status string, e.g. `PERMISSION_DENIED`.
    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,

    #[serde(flatten)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl GoogleErrorBody {
    pub fn reason(&self) -> Option<&str> {
        self.inner
            .details
            .iter()
            .find_map(|d| d.get("reason").and_then(Value::as_str))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.inner.code == 429
            || self.inner.status == "RESOURCE_EXHAUSTED"
            || self
                .reason()
                .is_some_and(|r| r.eq_ignore_ascii_case("RATE_LIMIT_EXCEEDED"))
    }
}
