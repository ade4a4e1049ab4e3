use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body posted to a user-provisioned write endpoint: `{action, resourceId, ...params}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackWriteRequest {
    pub action: String,
    pub resource_id: String,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FallbackWriteResponse {
    /// Any non-null `error` is a failed write, whatever the HTTP status said.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FallbackWriteResponse {
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => Some(
                o.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(o.clone()).to_string()),
            ),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_are_flattened_next_to_action() {
        let mut params = Map::new();
        params.insert("range".to_string(), json!("A1:B2"));
        let req = FallbackWriteRequest {
            action: "update_cells".to_string(),
            resource_id: "abc".to_string(),
            params,
        };
        assert_eq!(
            serde_json::to_value(&req).expect("serialize"),
            json!({"action": "update_cells", "resourceId": "abc", "range": "A1:B2"})
        );
    }

    #[test]
    fn error_field_shapes() {
        let resp: FallbackWriteResponse =
            serde_json::from_value(json!({"error": {"message": "sheet locked"}})).expect("parse");
        assert_eq!(resp.error_message().as_deref(), Some("sheet locked"));

        let ok: FallbackWriteResponse =
            serde_json::from_value(json!({"ok": true, "error": null})).expect("parse");
        assert_eq!(ok.error_message(), None);
        assert_eq!(ok.extra["ok"], json!(true));
    }
}
