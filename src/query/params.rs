use crate::error::WorkspaceError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Deepest nesting the substitution walk will enter.
pub const MAX_SUBSTITUTION_DEPTH: usize = 32;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$(\d+)$").expect("valid placeholder regex"));

/// Replace every string that is exactly `$N` with `args[N-1]`.
///
/// String arguments are JSON-parsed when possible (`"5"` becomes `5`), otherwise kept as text.
/// Placeholders without a matching argument stay literal. Returns a new value.
pub fn substitute(value: &Value, args: &[Value]) -> Result<Value, WorkspaceError> {
    walk(value, args, 0)
}

fn walk(value: &Value, args: &[Value], depth: usize) -> Result<Value, WorkspaceError> {
    if depth > MAX_SUBSTITUTION_DEPTH {
        return Err(WorkspaceError::InvalidQuery(format!(
            "parameters nest deeper than {MAX_SUBSTITUTION_DEPTH} levels"
        )));
    }
    Ok(match value {
        Value::String(s) => placeholder_arg(s, args).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| walk(item, args, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), walk(v, args, depth + 1)?)))
                .collect::<Result<_, WorkspaceError>>()?,
        ),
        other => other.clone(),
    })
}

fn placeholder_arg(s: &str, args: &[Value]) -> Option<Value> {
    let index: usize = PLACEHOLDER.captures(s)?.get(1)?.as_str().parse().ok()?;
    let arg = args.get(index.checked_sub(1)?)?;
    Some(match arg {
        Value::String(raw) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        other => other.clone(),
    })
}
