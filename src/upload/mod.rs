//! Upload controller for the public surface: local validation, presign, and
//! a single direct-to-storage attempt per call. Nothing is retained on failure.

use crate::{
    api::{types::GalleryItem, ApiClient},
    auth::{Session, Storage},
    error::Error,
};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{info, instrument, warn};

pub const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
pub const MAX_BYTES: u64 = 2 * 1024 * 1024;

/// A file picked for upload, with its declared media type.
#[derive(Clone, Debug)]
pub struct UploadCandidate {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    /// Reads a file; the media type is guessed from the extension unless given.
    /// Type and size are checked against the file metadata before any byte is read.
    ///
    /// # Errors
    /// Returns `Error::Validation` if the file cannot be read, has no usable
    /// name, or fails [`validate`].
    pub async fn from_path(path: &Path, content_type: Option<&str>) -> Result<Self, Error> {
        let unreadable = |e: std::io::Error| Error::Validation(format!("cannot read {}: {e}", path.display()));

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("{} has no file name", path.display())))?
            .to_string();

        let content_type = match content_type {
            Some(ct) => ct.trim().to_lowercase(),
            None => guess_content_type(path).to_string(),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(Error::Validation(format!("{} is not a regular file", path.display())));
        }
        validate(&content_type, metadata.len())?;

        // The file may have grown since the metadata call.
        let mut bytes = Vec::new();
        tokio::fs::File::open(path)
            .await
            .map_err(unreadable)?
            .take(MAX_BYTES + 1)
            .read_to_end(&mut bytes)
            .await
            .map_err(unreadable)?;
        validate(&content_type, bytes.len() as u64)?;

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Media type from a file extension; unknown extensions map to `application/octet-stream`.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Checks declared type and size before anything touches the network.
///
/// # Errors
/// Returns `Error::Validation` for a disallowed type, an empty file, or a file over 2 MiB.
pub fn validate(content_type: &str, size: u64) -> Result<(), Error> {
    if !ALLOWED_TYPES.contains(&content_type) {
        return Err(Error::Validation(
            "only JPG, PNG and WEBP images are allowed".to_string(),
        ));
    }

    if size == 0 {
        return Err(Error::Validation("the file is empty".to_string()));
    }

    if size > MAX_BYTES {
        return Err(Error::Validation("max size is 2MB".to_string()));
    }

    Ok(())
}

/// A finished upload. The gallery reload that follows is reported separately:
/// once storage answered 204 the upload stands, whatever the reload does.
#[derive(Debug)]
pub struct Submitted {
    pub gallery: Result<Vec<GalleryItem>, Error>,
}

/// Validates, presigns and uploads one file, then reloads the gallery.
///
/// # Errors
/// - `Error::AuthRequired` without a valid session.
/// - `Error::Validation` for a rejected file; no request is made. A file over
///   the ceiling announced by the presign target is rejected before the storage POST.
/// - `Error::Rejected`/`Error::Http`/`Error::Parse` from the presign or storage step.
#[instrument(skip_all, fields(file = %file.file_name, content_type = %file.content_type))]
pub async fn submit<S: Storage>(
    api: &ApiClient,
    session: &Session<S>,
    file: &UploadCandidate,
) -> Result<Submitted, Error> {
    let token = session.bearer()?;

    validate(&file.content_type, file.size())?;

    let presign = api.presign_upload(&file.content_type, &token).await?;

    if let Some(max_bytes) = presign.target.as_ref().and_then(|t| t.max_bytes) {
        if file.size() > max_bytes {
            return Err(Error::Validation(format!(
                "the server accepts at most {max_bytes} bytes"
            )));
        }
    }

    api.upload_to_storage(&presign.upload, file).await?;

    info!("uploaded {} for review", file.file_name);

    let gallery = api.gallery().await;
    if let Err(e) = &gallery {
        warn!("gallery reload failed after upload: {e}");
    }

    Ok(Submitted { gallery })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStorage;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MIB: u64 = 1024 * 1024;

    fn candidate(content_type: &str, len: usize) -> UploadCandidate {
        UploadCandidate {
            file_name: "me.jpg".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0xff; len],
        }
    }

    fn signed_in() -> Session<MemoryStorage> {
        let mut session = Session::new(MemoryStorage::new());
        session
            .save(&SecretString::from("id-token".to_string()), 3600)
            .unwrap();
        session
    }

    #[test]
    fn validate_type_and_size() {
        assert!(validate("image/jpeg", 3 * MIB).is_err());
        assert!(validate("image/png", MIB).is_ok());
        assert!(validate("image/gif", MIB).is_err());
        assert!(validate("image/webp", MAX_BYTES).is_ok());
        assert!(validate("image/webp", MAX_BYTES + 1).is_err());
        assert!(validate("image/png", 0).is_err());
    }

    #[test]
    fn guess_content_type_from_extension() {
        assert_eq!(guess_content_type(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("b.webp")), "image/webp");
        assert_eq!(guess_content_type(Path::new("b.gif")), "image/gif");
        assert_eq!(guess_content_type(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.png");
        tokio::fs::write(&file, [1u8, 2, 3]).await.unwrap();

        let candidate = UploadCandidate::from_path(&file, None).await.unwrap();
        assert_eq!(candidate.file_name, "photo.png");
        assert_eq!(candidate.content_type, "image/png");
        assert_eq!(candidate.size(), 3);

        let forced = UploadCandidate::from_path(&file, Some("IMAGE/WEBP")).await.unwrap();
        assert_eq!(forced.content_type, "image/webp");
    }

    #[tokio::test]
    async fn from_path_rejects_oversized_file_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.jpg");
        std::fs::File::create(&file)
            .unwrap()
            .set_len(256 * MIB)
            .unwrap();

        let result = UploadCandidate::from_path(&file, None).await;
        assert!(matches!(result, Err(Error::Validation(ref m)) if m == "max size is 2MB"));
    }

    #[tokio::test]
    async fn from_path_rejects_type_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("anim.gif");
        tokio::fs::write(&file, [1u8]).await.unwrap();

        assert!(matches!(
            UploadCandidate::from_path(&file, None).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            UploadCandidate::from_path(dir.path(), Some("image/png")).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn submit_requires_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let session = Session::new(MemoryStorage::new());

        let result = submit(&api, &session, &candidate("image/jpeg", 10)).await;
        assert!(matches!(result, Err(Error::AuthRequired)));
    }

    #[tokio::test]
    async fn submit_validates_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = submit(&api, &signed_in(), &candidate("image/gif", 10)).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn submit_presigns_uploads_and_reloads_gallery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/presign-upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "upload": {
                    "url": format!("{}/bucket", server.uri()),
                    "fields": {"key": "pending/u/1.jpg", "Content-Type": "image/jpeg"}
                },
                "target": {"key": "pending/u/1.jpg", "contentType": "image/jpeg", "maxBytes": 2000000}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let submitted = submit(&api, &signed_in(), &candidate("image/jpeg", 10))
            .await
            .unwrap();
        assert!(submitted.gallery.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_succeeds_when_gallery_reload_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/presign-upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "upload": {"url": format!("{}/bucket", server.uri()), "fields": {}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let submitted = submit(&api, &signed_in(), &candidate("image/jpeg", 10))
            .await
            .unwrap();
        assert!(matches!(submitted.gallery, Err(Error::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn submit_honours_server_size_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/presign-upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "upload": {"url": format!("{}/bucket", server.uri()), "fields": {}},
                "target": {"key": "pending/u/1.jpg", "maxBytes": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = submit(&api, &signed_in(), &candidate("image/jpeg", 10)).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn submit_storage_failure_skips_gallery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/presign-upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "upload": {"url": format!("{}/bucket", server.uri()), "fields": {}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bucket"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<Error>Policy</Error>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gallery"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = submit(&api, &signed_in(), &candidate("image/jpeg", 10)).await;
        assert!(matches!(result, Err(Error::Http { status: 403, .. })));
    }
}
