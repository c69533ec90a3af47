//! Wire shapes shared by the multipart and resumable upload flows.

use serde::Deserialize;
use std::collections::HashMap;

/// Object metadata sent as JSON: the first part of a multipart upload, or the
/// body of a resumable-upload initiation.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadMetadata {
    pub content_type: String,
    pub content_encoding: String,
    pub name: String,
    pub metadata: Option<HashMap<String, String>>,
}

impl UploadMetadata {
    /// Decode metadata from a request body. An empty body is empty metadata.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}
