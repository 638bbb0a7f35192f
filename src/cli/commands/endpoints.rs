//! Identity provider and backend endpoint arguments.

use crate::config::{default_state_dir, AppConfig, DEFAULT_REDIRECT_URI, DEFAULT_SCOPE};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_CLIENT_ID: &str = "client-id";
pub const ARG_REDIRECT_URI: &str = "redirect-uri";
pub const ARG_SCOPE: &str = "scope";
pub const ARG_STATE_DIR: &str = "state-dir";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Backend API base URL, example: https://api.example.com")
                .env("IMGLAB_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Identity provider base URL (hosts /oauth2/authorize, /oauth2/token and /logout)")
                .env("IMGLAB_AUTH_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_CLIENT_ID)
                .long(ARG_CLIENT_ID)
                .help("OAuth2 public client id")
                .env("IMGLAB_CLIENT_ID")
                .global(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URI)
                .long(ARG_REDIRECT_URI)
                .help("Registered redirect URI; a loopback http address lets `login` capture the code")
                .env("IMGLAB_REDIRECT_URI")
                .default_value(DEFAULT_REDIRECT_URI)
                .global(true),
        )
        .arg(
            Arg::new(ARG_SCOPE)
                .long(ARG_SCOPE)
                .help("Requested OAuth2 scopes, space separated")
                .env("IMGLAB_SCOPE")
                .default_value(DEFAULT_SCOPE)
                .global(true),
        )
        .arg(
            Arg::new(ARG_STATE_DIR)
                .long(ARG_STATE_DIR)
                .help("Directory holding the session file")
                .env("IMGLAB_STATE_DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
}

#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state_dir: PathBuf,
}

impl Options {
    /// Parse endpoint arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            api_url: read_required(ARG_API_URL)?,
            auth_url: read_required(ARG_AUTH_URL)?,
            client_id: read_required(ARG_CLIENT_ID)?,
            redirect_uri: read_required(ARG_REDIRECT_URI)?,
            scope: read_required(ARG_SCOPE)?,
            state_dir: matches
                .get_one::<PathBuf>(ARG_STATE_DIR)
                .cloned()
                .unwrap_or_else(default_state_dir),
        })
    }

    /// # Errors
    /// Returns an error if a value fails validation.
    pub fn into_config(self) -> anyhow::Result<AppConfig> {
        Ok(AppConfig::new(
            &self.api_url,
            &self.auth_url,
            &self.client_id,
            &self.redirect_uri,
            &self.scope,
            self.state_dir,
        )?)
    }
}
