//! Authorization Code + PKCE flow against the identity provider.
//!
//! ```text
//! SignedOut --login()--> AwaitingCallback --exchange ok--> SignedIn
//!                              |                              |
//!                              +--exchange failed--+          | logout()
//!                                                  v          v
//!                                                  SignedOut <+
//! ```
//!
//! The verifier is taken out of storage by every exchange attempt, so a
//! replayed redirect fails with `MissingVerifier` instead of reaching the
//! token endpoint twice.

use super::{
    pkce::{derive_challenge, generate_verifier, CodeChallenge, CHALLENGE_METHOD},
    session::Session,
    storage::Storage,
};
use crate::{api, config::AppConfig, error::Error};
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    AwaitingCallback,
    SignedIn,
}

/// Query parameters the identity provider appends to the redirect target.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    expires_in: i64,
}

#[derive(Debug)]
pub struct AuthFlow<S: Storage> {
    config: AppConfig,
    client: Client,
    session: Session<S>,
}

impl<S: Storage> AuthFlow<S> {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AppConfig, session: Session<S>) -> Result<Self, Error> {
        Ok(Self::with_client(config, session, api::http_client()?))
    }

    pub fn with_client(config: AppConfig, session: Session<S>, client: Client) -> Self {
        Self {
            config,
            client,
            session,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn state(&self) -> AuthState {
        if self.session.is_valid() {
            AuthState::SignedIn
        } else if self.session.has_pending_verifier() {
            AuthState::AwaitingCallback
        } else {
            AuthState::SignedOut
        }
    }

    /// Starts a login: stores a fresh verifier and returns the authorization URL
    /// the user agent must navigate to.
    ///
    /// # Errors
    /// Returns an error if the verifier cannot be stored or the URL cannot be built.
    pub fn login(&mut self) -> Result<Url, Error> {
        let verifier = generate_verifier();
        self.session.store_verifier(&verifier)?;

        let challenge = derive_challenge(&verifier);
        let url = self.authorize_url(&challenge)?;

        debug!("authorization URL ready");

        Ok(url)
    }

    /// # Errors
    /// Returns `Error::Validation` if the identity provider URL is malformed.
    pub fn authorize_url(&self, challenge: &CodeChallenge) -> Result<Url, Error> {
        let mut url = parse_url(&self.config.auth_url("/oauth2/authorize"))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", CHALLENGE_METHOD);

        Ok(url)
    }

    /// Exchanges an authorization code for an identity token and saves the session.
    ///
    /// # Errors
    /// - `Error::MissingVerifier` when no login is pending; no request is made.
    /// - `Error::Http` when the token endpoint rejects the exchange.
    /// - `Error::Parse` when the token response is malformed.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&mut self, code: &str) -> Result<(), Error> {
        let verifier = self.session.take_verifier()?;

        let token_url = self.config.auth_url("/oauth2/token");
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.expose()),
        ];

        let response = self.client.post(&token_url).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("token exchange failed: {}", status);
            return Err(Error::http(status.as_u16(), &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("invalid token response: {e}")))?;

        if token.id_token.is_empty() {
            return Err(Error::Parse("token response has an empty id_token".to_string()));
        }

        self.session
            .save(&SecretString::from(token.id_token), token.expires_in)?;

        info!("signed in, token valid for {} seconds", token.expires_in);

        Ok(())
    }

    /// Handles the parameters of a redirect back from the identity provider.
    /// The code (or error) is consumed once, whatever the outcome.
    ///
    /// # Errors
    /// Returns `Error::Authorization` when the provider reported an error,
    /// `Error::Validation` when the redirect carries no code, or any
    /// [`AuthFlow::exchange_code`] error.
    pub async fn handle_callback(&mut self, params: CallbackParams) -> Result<(), Error> {
        if let Some(err) = params.error {
            // The pending login is dead either way.
            if let Err(e) = self.session.take_verifier() {
                debug!("no verifier to discard: {e}");
            }
            let reason = params
                .error_description
                .map_or_else(|| err.clone(), |description| format!("{err}: {description}"));
            warn!("identity provider returned an error: {reason}");
            return Err(Error::Authorization(reason));
        }

        match params.code {
            Some(code) if !code.is_empty() => self.exchange_code(&code).await,
            _ => Err(Error::Validation(
                "redirect does not carry an authorization code".to_string(),
            )),
        }
    }

    /// # Errors
    /// See [`AuthFlow::handle_callback`].
    pub async fn handle_redirect(&mut self, redirect: &Url) -> Result<(), Error> {
        self.handle_callback(CallbackParams::from_url(redirect)).await
    }

    /// Clears the session and returns the identity provider logout URL.
    ///
    /// # Errors
    /// Returns an error if the session cannot be cleared or the URL cannot be built.
    pub fn logout(&mut self) -> Result<Url, Error> {
        self.session.clear()?;

        let mut url = parse_url(&self.config.auth_url("/logout"))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("logout_uri", self.config.redirect_uri.as_str());

        info!("signed out");

        Ok(url)
    }
}

fn parse_url(value: &str) -> Result<Url, Error> {
    Url::parse(value).map_err(|e| Error::Validation(format!("invalid URL {value}: {e}")))
}
