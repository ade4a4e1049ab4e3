use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subset of `documents.batchUpdate` requests used for text edits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocRequest {
    #[serde(rename_all = "camelCase")]
    InsertText {
        text: String,
        end_of_segment_location: EndOfSegmentLocation,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceAllText {
        contains_text: SubstringMatchCriteria,
        replace_text: String,
    },
}

/// Empty location means the end of the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndOfSegmentLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatchCriteria {
    pub text: String,
    pub match_case: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BatchUpdateDocumentRequest {
    pub requests: Vec<DocRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateDocumentResponse {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub replies: Vec<Value>,
}

impl BatchUpdateDocumentResponse {
    /// Sum of `replaceAllText.occurrencesChanged` across replies.
    pub fn occurrences_changed(&self) -> u64 {
        self.replies
            .iter()
            .filter_map(|r| r.pointer("/replaceAllText/occurrencesChanged"))
            .filter_map(Value::as_u64)
            .sum()
    }
}
