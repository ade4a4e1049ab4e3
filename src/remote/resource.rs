use crate::error::WorkspaceError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,200}$").expect("valid resource id regex"));

pub fn is_valid_resource_id(id: &str) -> bool {
    RESOURCE_ID.is_match(id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Sheet,
    Document,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::Sheet => "sheet",
            ResourceKind::Document => "document",
        })
    }
}

/// Identity of the remote item an accessor is bound to. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceHandle {
    pub resource_id: String,
    pub resource_kind: ResourceKind,
}

impl ResourceHandle {
    /// Accepts a bare id (kind = `default_kind`) or a service URL such as
    /// `https://docs.google.com/spreadsheets/d/<id>/edit`.
    pub fn resolve(input: &str, default_kind: ResourceKind) -> Result<Self, WorkspaceError> {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            return Self::from_url(&Url::parse(input)?, default_kind);
        }
        if !is_valid_resource_id(input) {
            return Err(WorkspaceError::Validation(format!(
                "malformed resource id: {input:?}"
            )));
        }
        Ok(Self {
            resource_id: input.to_string(),
            resource_kind: default_kind,
        })
    }

    fn from_url(url: &Url, default_kind: ResourceKind) -> Result<Self, WorkspaceError> {
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        let found = segments.windows(3).find_map(|w| match w {
            ["spreadsheets", "d", id] => Some((ResourceKind::Sheet, *id)),
            ["document", "d", id] => Some((ResourceKind::Document, *id)),
            ["file", "d", id] => Some((default_kind, *id)),
            _ => None,
        });

        match found {
            Some((kind, id)) if is_valid_resource_id(id) => Ok(Self {
                resource_id: id.to_string(),
                resource_kind: kind,
            }),
            _ => Err(WorkspaceError::Validation(format!(
                "no resource id in URL path: {}",
                url.path()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_determine_kind() {
        let h = ResourceHandle::resolve(
            "https://docs.google.com/spreadsheets/d/1AbC_def-GHI/edit#gid=0",
            ResourceKind::Document,
        )
        .unwrap();
        assert_eq!(h.resource_id, "1AbC_def-GHI");
        assert_eq!(h.resource_kind, ResourceKind::Sheet);

        let h = ResourceHandle::resolve(
            "https://docs.google.com/document/d/doc123/edit",
            ResourceKind::Sheet,
        )
        .unwrap();
        assert_eq!(h.resource_kind, ResourceKind::Document);
    }

    #[test]
    fn bare_id_uses_default_kind() {
        let h = ResourceHandle::resolve("abc123", ResourceKind::Sheet).unwrap();
        assert_eq!(h.resource_kind, ResourceKind::Sheet);
        assert!(ResourceHandle::resolve("../etc/passwd", ResourceKind::Sheet).is_err());
        assert!(ResourceHandle::resolve("https://docs.google.com/", ResourceKind::Sheet).is_err());
    }
}
