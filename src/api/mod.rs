//! HTTP client for the backend API and direct-to-storage uploads, with
//! consistent timeouts and error mapping. Bearer tokens are supplied per call
//! and never stored or logged here.

pub mod types;

use self::types::{
    Envelope, GalleryItem, GalleryResponse, ListingResponse, ModerationRequest,
    ModerationResponse, PresignRequest, PresignResponse, PresignedUpload,
};
use crate::{
    config::build_url_with_base,
    error::Error,
    moderation::{Category, ModerationAction, ModerationItem, ModerationOutcome},
    upload::UploadCandidate,
    APP_USER_AGENT,
};
use reqwest::{
    multipart::{Form, Part},
    Client, Response, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Default request timeout applied to every call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the shared HTTP client.
///
/// # Errors
/// Returns `Error::Network` if the TLS backend cannot be initialized.
pub fn http_client() -> Result<Client, Error> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Ok(Self::with_client(http_client()?, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }

    /// Fetches one moderation list.
    ///
    /// # Errors
    /// `Error::Forbidden` on 403, `Error::Http` on other failures, `Error::Parse`
    /// on a malformed body.
    #[instrument(skip(self, token))]
    pub async fn list(
        &self,
        category: Category,
        token: &SecretString,
    ) -> Result<Vec<ModerationItem>, Error> {
        let response = self
            .client
            .get(self.url(&category.path()))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        let listing: ListingResponse = handle_json_response(response).await?;

        debug!("{} {} item(s)", listing.items.len(), category);

        Ok(listing.items.into_iter().map(Into::into).collect())
    }

    /// Approves or rejects one pending key.
    ///
    /// # Errors
    /// `Error::Rejected` when the backend answers `ok: false` or explains a
    /// refusal, `Error::Forbidden` on a bare 403, `Error::Http` otherwise.
    #[instrument(skip(self, token))]
    pub async fn moderate(
        &self,
        action: ModerationAction,
        key: &str,
        token: &SecretString,
    ) -> Result<ModerationOutcome, Error> {
        let response = self
            .client
            .post(self.url(&action.path()))
            .bearer_auth(token.expose_secret())
            .json(&ModerationRequest { key })
            .send()
            .await?;

        // The body is optional on success; an empty one still counts.
        let body = handle_envelope_response(response).await?;
        let parsed: ModerationResponse = serde_json::from_str(&body).unwrap_or_default();

        Ok(parsed.into())
    }

    /// Lists approved pictures; no authentication.
    ///
    /// # Errors
    /// `Error::Http` or `Error::Parse` when the gallery cannot be read.
    #[instrument(skip(self))]
    pub async fn gallery(&self) -> Result<Vec<GalleryItem>, Error> {
        let response = self.client.get(self.url("/gallery")).send().await?;
        let gallery: GalleryResponse = handle_json_response(response).await?;
        Ok(gallery.items)
    }

    /// Requests a presigned upload form for `content_type`.
    ///
    /// # Errors
    /// `Error::Rejected` when the backend refuses (e.g. one upload per user),
    /// `Error::Http`/`Error::Parse` otherwise.
    #[instrument(skip(self, token))]
    pub async fn presign_upload(
        &self,
        content_type: &str,
        token: &SecretString,
    ) -> Result<PresignResponse, Error> {
        let response = self
            .client
            .post(self.url("/presign-upload"))
            .bearer_auth(token.expose_secret())
            .json(&PresignRequest { content_type })
            .send()
            .await?;

        let body = handle_envelope_response(response).await?;
        let presign: PresignResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("invalid presign response: {e}")))?;

        if let Some(target) = &presign.target {
            debug!("upload target {:?}", target.key);
        }

        Ok(presign)
    }

    /// Posts the presigned fields plus the file straight to storage. Only 204 is success.
    ///
    /// # Errors
    /// `Error::Http` for any other status.
    #[instrument(skip(self, upload, file), fields(file = %file.file_name, size = file.bytes.len()))]
    pub async fn upload_to_storage(
        &self,
        upload: &PresignedUpload,
        file: &UploadCandidate,
    ) -> Result<(), Error> {
        let mut form = Form::new();
        for (name, value) in upload.form_fields() {
            form = form.text(name, value);
        }

        // Storage ignores any field after the file, so it goes last.
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| Error::Validation(format!("invalid content type: {e}")))?;
        form = form.part("file", part);

        let response = self.client.post(&upload.url).multipart(form).send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("storage upload failed: {}", status);

        Err(Error::http(status.as_u16(), &body))
    }
}

/// Parses JSON responses; 403 becomes `Forbidden`, other failures `Http`.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();

    if status == StatusCode::FORBIDDEN {
        return Err(Error::Forbidden);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::http(status.as_u16(), &body));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| Error::Parse(format!("failed to decode response: {e}")))
}

/// Checks the `ok`/`error` envelope and returns the raw body on success.
async fn handle_envelope_response(response: Response) -> Result<String, Error> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let envelope: Envelope = serde_json::from_str(&body).unwrap_or_default();
    let reason = envelope.error.filter(|e| !e.trim().is_empty());

    if status == StatusCode::FORBIDDEN {
        return Err(reason.map_or(Error::Forbidden, Error::Rejected));
    }

    if !status.is_success() {
        return Err(match reason {
            Some(reason) => Error::Http {
                status: status.as_u16(),
                message: reason,
            },
            None => Error::http(status.as_u16(), &body),
        });
    }

    if envelope.ok == Some(false) {
        return Err(Error::Rejected(
            reason.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    Ok(body)
}
