use crate::{
    api::ApiClient,
    auth::{AuthFlow, FileStorage, Session},
    config::AppConfig,
};
use anyhow::Result;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: AppConfig,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// The durable session; the file is created lazily on first write.
    #[must_use]
    pub fn session(&self) -> Session<FileStorage> {
        Session::new(FileStorage::new(self.config.session_file()))
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn auth_flow(&self) -> Result<AuthFlow<FileStorage>> {
        Ok(AuthFlow::new(self.config.clone(), self.session())?)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn api(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.config.api_base_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Storage;
    use secrecy::SecretString;

    fn globals(dir: &std::path::Path) -> GlobalArgs {
        let config = AppConfig::new(
            "https://api.example.com/",
            "https://auth.example.com",
            "client",
            "http://127.0.0.1:5500/",
            "openid email",
            dir.to_path_buf(),
        )
        .unwrap();
        GlobalArgs::new(config)
    }

    #[test]
    fn test_global_args() {
        let dir = tempfile::tempdir().unwrap();
        let args = globals(dir.path());
        assert_eq!(args.config.api_base_url, "https://api.example.com");
        assert_eq!(args.session().storage().path(), dir.path().join("session.json"));
        assert!(args.api().is_ok());
    }

    #[test]
    fn test_sessions_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = globals(dir.path());

        let mut first = args.session();
        first
            .save(&SecretString::from("id-token".to_string()), 3600)
            .unwrap();

        let second = args.session();
        assert!(second.is_valid());
        assert!(second.storage().get(crate::auth::session::KEY_ID_TOKEN).unwrap().is_some());
    }
}
