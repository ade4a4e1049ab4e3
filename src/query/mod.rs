//! Operation descriptors: parsing, guarding, positional substitution and page caps.

mod operation;
mod page;
mod params;

pub use operation::{ALLOWED_OPERATIONS, Operation, is_valid_range};
pub use page::PageLimits;
pub use params::{MAX_SUBSTITUTION_DEPTH, substitute};

use crate::error::WorkspaceError;
use crate::remote::is_valid_resource_id;
use serde_json::{Map, Value};

const FORBIDDEN_SUBSTRINGS: [&str; 4] = ["eval", "function(", "script", "exec"];

/// A validated operation plus the resource it targets, if the caller named one.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub operation: Operation,
    pub resource_id: Option<String>,
}

/// Reject payloads carrying code-execution markers.
pub fn guard_payload(payload: &str) -> Result<(), WorkspaceError> {
    let lowered = payload.to_ascii_lowercase();
    match FORBIDDEN_SUBSTRINGS.iter().find(|s| lowered.contains(*s)) {
        Some(found) => Err(WorkspaceError::InvalidQuery(format!(
            "payload contains forbidden token {found:?}"
        ))),
        None => Ok(()),
    }
}

/// Parse `{"operation": ..., "resourceId"?: ..., "parameters"?: {...}}` against `args`.
///
/// Parameters may also sit at the top level. The guard runs on the raw text and again after
/// substitution, so nothing here touches the network.
pub fn parse_query(input: &str, args: &[Value]) -> Result<ParsedQuery, WorkspaceError> {
    guard_payload(input)?;

    let raw: Value = serde_json::from_str(input)
        .map_err(|e| WorkspaceError::InvalidQuery(format!("query is not valid JSON: {e}")))?;
    let Value::Object(raw) = raw else {
        return Err(WorkspaceError::InvalidQuery(
            "query must be a JSON object".to_string(),
        ));
    };

    let name = raw
        .get("operation")
        .and_then(Value::as_str)
        .ok_or_else(|| WorkspaceError::InvalidQuery("missing \"operation\" field".to_string()))?
        .to_string();
    if !ALLOWED_OPERATIONS.contains(&name.as_str()) {
        return Err(WorkspaceError::UnsupportedOperation(name));
    }

    let Value::Object(resolved) = substitute(&Value::Object(raw), args)? else {
        return Err(WorkspaceError::InvalidQuery(
            "query must be a JSON object".to_string(),
        ));
    };
    guard_payload(&serde_json::to_string(&resolved)?)?;

    let (fields, resource_id) = flatten(resolved)?;
    if let Some(id) = &resource_id {
        if !is_valid_resource_id(id) {
            return Err(WorkspaceError::Validation(format!(
                "malformed resource id: {id:?}"
            )));
        }
    }

    let operation: Operation = serde_json::from_value(Value::Object(fields))
        .map_err(|e| WorkspaceError::Validation(format!("invalid parameters for {name}: {e}")))?;
    operation.validate()?;

    Ok(ParsedQuery {
        operation,
        resource_id,
    })
}

/// Merge `parameters` into the top level and pull out `resourceId`.
fn flatten(mut obj: Map<String, Value>) -> Result<(Map<String, Value>, Option<String>), WorkspaceError> {
    let params = match obj.remove("parameters") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(WorkspaceError::InvalidQuery(
                "\"parameters\" must be an object".to_string(),
            ));
        }
    };
    let resource_id = match obj.remove("resourceId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(_) => {
            return Err(WorkspaceError::Validation(
                "resourceId must be a string".to_string(),
            ));
        }
    };
    for (key, value) in params {
        obj.entry(key).or_insert(value);
    }
    Ok((obj, resource_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_range_resolves() {
        let parsed = parse_query(
            r#"{"operation":"read_range","parameters":{"range":"$1"}}"#,
            &[json!("A1:B2")],
        )
        .unwrap();
        assert_eq!(
            parsed.operation,
            Operation::ReadRange {
                range: "A1:B2".to_string()
            }
        );
    }

    #[test]
    fn function_call_marker_is_rejected() {
        let err = parse_query(
            r#"{"operation":"append_text","text":"x = function(){}"}"#,
            &[],
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY");

        let err = parse_query(
            r#"{"operation":"append_text","text":"$1"}"#,
            &[json!("function(){ alert(1) }")],
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_QUERY");
    }

    #[test]
    fn shape_errors_have_distinct_codes() {
        assert_eq!(parse_query("not json", &[]).unwrap_err().code(), "INVALID_QUERY");
        assert_eq!(parse_query("{}", &[]).unwrap_err().code(), "INVALID_QUERY");
        assert_eq!(
            parse_query(r#"{"operation":"drop_table"}"#, &[])
                .unwrap_err()
                .code(),
            "UNSUPPORTED_OPERATION"
        );
        assert_eq!(
            parse_query(r#"{"operation":"read_range","range":"Sheet1!A1:undefined"}"#, &[])
                .unwrap_err()
                .code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            parse_query(r#"{"operation":"list_tabs","resourceId":"bad id!"}"#, &[])
                .unwrap_err()
                .code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn top_level_parameters_win_over_nested() {
        let parsed = parse_query(
            r#"{"operation":"read_rows","resourceId":"abc123","limit":5,"parameters":{"limit":9,"offset":"$1"}}"#,
            &[json!("10")],
        )
        .unwrap();
        assert_eq!(parsed.resource_id.as_deref(), Some("abc123"));
        assert_eq!(
            parsed.operation,
            Operation::ReadRows {
                sheet: None,
                offset: Some(10),
                limit: Some(5),
            }
        );
    }
}
