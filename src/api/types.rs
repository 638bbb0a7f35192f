//! Request and response payloads for the backend API. Presigned form fields
//! are credentials for a single upload and must never be logged.

use crate::moderation::{ModerationItem, ModerationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub items: Vec<ListingItem>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    pub key: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl From<ListingItem> for ModerationItem {
    fn from(item: ListingItem) -> Self {
        Self {
            key: item.key,
            preview_url: item.preview_url.or(item.url),
            size: item.size,
            last_modified: item.last_modified,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ModerationRequest<'a> {
    pub key: &'a str,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResponse {
    #[serde(default)]
    pub approved_key: Option<String>,
    #[serde(default)]
    pub rejected_key: Option<String>,
}

impl From<ModerationResponse> for ModerationOutcome {
    fn from(response: ModerationResponse) -> Self {
        Self {
            approved_key: response.approved_key,
            rejected_key: response.rejected_key,
        }
    }
}

/// `ok`/`error` fields shared by the moderation and presign responses.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GalleryResponse {
    #[serde(default)]
    pub items: Vec<GalleryItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub key: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl GalleryItem {
    /// Last path segment of the key, as shown under each picture.
    pub fn display_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest<'a> {
    pub content_type: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PresignResponse {
    pub upload: PresignedUpload,
    #[serde(default)]
    pub target: Option<UploadTarget>,
}

/// Direct-to-storage form: POST `fields` plus the file to `url`.
#[derive(Clone, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl std::fmt::Debug for PresignedUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignedUpload")
            .field("url", &self.url)
            .field("fields", &format_args!("[{} REDACTED]", self.fields.len()))
            .finish()
    }
}

impl PresignedUpload {
    /// Form fields as text, in the order they will be sent.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    #[serde(default)]
    pub key: Option<String>,
    /// Upload ceiling enforced by the storage policy.
    #[serde(default)]
    pub max_bytes: Option<u64>,
}
