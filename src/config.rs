//! Endpoint configuration for the identity provider and the backend API.
//! Values come from CLI flags or `IMGLAB_*` environment variables and are
//! normalized here so the rest of the crate can join paths without caring
//! about trailing slashes. Configuration values are public; the client id is
//! not a secret in a PKCE flow.

use crate::error::Error;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_SCOPE: &str = "openid email";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:5500/";

/// Client configuration shared by the auth flow and the API client.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_base_url: String,
    pub client_id: String,
    pub redirect_uri: Url,
    pub scope: String,
    pub state_dir: PathBuf,
}

impl AppConfig {
    /// Validates raw values and builds a config.
    ///
    /// # Errors
    /// Returns `Error::Validation` when a required value is empty or a URL is malformed.
    pub fn new(
        api_base_url: &str,
        auth_base_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        state_dir: PathBuf,
    ) -> Result<Self, Error> {
        let api_base_url = normalize_base_url("API base URL", api_base_url)?;
        let auth_base_url = normalize_base_url("identity provider URL", auth_base_url)?;

        let client_id = normalize_value(client_id)
            .ok_or_else(|| Error::Validation("client id is not configured".to_string()))?;

        let redirect_uri = Url::parse(redirect_uri.trim())
            .map_err(|e| Error::Validation(format!("invalid redirect URI: {e}")))?;

        let scope = normalize_value(scope).unwrap_or_else(|| DEFAULT_SCOPE.to_string());

        Ok(Self {
            api_base_url,
            auth_base_url,
            client_id,
            redirect_uri,
            scope,
            state_dir,
        })
    }

    /// Absolute URL of an identity provider path.
    pub fn auth_url(&self, path: &str) -> String {
        build_url_with_base(&self.auth_base_url, path)
    }

    /// Path of the durable session file.
    pub fn session_file(&self) -> PathBuf {
        self.state_dir.join("session.json")
    }
}

/// Default location for persisted client state.
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(env!("CARGO_PKG_NAME"))
}

fn normalize_base_url(name: &str, value: &str) -> Result<String, Error> {
    let value =
        normalize_value(value).ok_or_else(|| Error::Validation(format!("{name} is not configured")))?;

    let url = Url::parse(&value).map_err(|e| Error::Validation(format!("invalid {name}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        scheme => Err(Error::Validation(format!(
            "invalid {name}: unsupported scheme {scheme}"
        ))),
    }
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Builds a URL from an explicit base URL and the provided path.
pub(crate) fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(
            "https://api.imglab.dev/",
            "https://auth.imglab.dev",
            "client-123",
            "http://127.0.0.1:5500/",
            "",
            PathBuf::from("/tmp/imglab"),
        )
        .unwrap()
    }

    #[test]
    fn normalize_value_trims_and_rejects_empty() {
        assert_eq!(normalize_value(""), None);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(
            normalize_value("  https://api.imglab.dev "),
            Some("https://api.imglab.dev".to_string())
        );
    }

    #[test]
    fn new_applies_defaults_and_strips_trailing_slash() {
        let config = config();
        assert_eq!(config.api_base_url, "https://api.imglab.dev");
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.session_file(), PathBuf::from("/tmp/imglab/session.json"));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let config = config();
        assert_eq!(
            build_url_with_base(&config.api_base_url, "/admin/pending"),
            "https://api.imglab.dev/admin/pending"
        );
        assert_eq!(config.auth_url("oauth2/token"), "https://auth.imglab.dev/oauth2/token");
    }

    #[test]
    fn new_rejects_missing_client_id() {
        let result = AppConfig::new(
            "https://api.imglab.dev",
            "https://auth.imglab.dev",
            "  ",
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
            PathBuf::from("/tmp"),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn new_rejects_unsupported_scheme() {
        let result = AppConfig::new(
            "ftp://api.imglab.dev",
            "https://auth.imglab.dev",
            "client",
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
            PathBuf::from("/tmp"),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
