//! Session store: identity token, absolute expiry and the pending PKCE
//! verifier, persisted under fixed keys. No network calls happen here.

use super::{claims::Claims, pkce::CodeVerifier, storage::Storage};
use crate::error::Error;
use secrecy::{ExposeSecret, SecretString};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const KEY_ID_TOKEN: &str = "id_token";
pub const KEY_EXPIRES_AT: &str = "expires_at";
pub const KEY_PKCE_VERIFIER: &str = "pkce_verifier";

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[derive(Debug)]
pub struct Session<S: Storage> {
    storage: S,
}

impl<S: Storage> Session<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persists a token expiring `expires_in_seconds` from now, replacing any prior session.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the session cannot be written.
    pub fn save(&mut self, token: &SecretString, expires_in_seconds: i64) -> Result<(), Error> {
        self.save_at(token, expires_in_seconds, now_ms())
    }

    /// Like [`Session::save`] with an explicit clock reading.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the session cannot be written.
    pub fn save_at(
        &mut self,
        token: &SecretString,
        expires_in_seconds: i64,
        now_ms: i64,
    ) -> Result<(), Error> {
        let expires_at = now_ms.saturating_add(expires_in_seconds.saturating_mul(1000));

        self.storage.set(KEY_ID_TOKEN, token.expose_secret())?;
        self.storage.set(KEY_EXPIRES_AT, &expires_at.to_string())?;

        debug!("session saved, expires at {expires_at}");

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_ms())
    }

    /// True iff a token is stored and `now_ms` is before the stored expiry.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        self.token().is_some() && now_ms < self.expires_at_ms()
    }

    /// Stored expiry; a missing or unparsable value reads as `0` (expired).
    pub fn expires_at_ms(&self) -> i64 {
        self.read(KEY_EXPIRES_AT)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// The stored identity token, valid or not.
    pub fn token(&self) -> Option<SecretString> {
        self.read(KEY_ID_TOKEN)
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
    }

    /// The identity token, only while the session is valid.
    ///
    /// # Errors
    /// Returns `Error::AuthRequired` when there is no valid session.
    pub fn bearer(&self) -> Result<SecretString, Error> {
        if !self.is_valid() {
            return Err(Error::AuthRequired);
        }
        self.token().ok_or(Error::AuthRequired)
    }

    /// Removes token, expiry and any leftover verifier.
    ///
    /// # Errors
    /// Returns `Error::Storage` if the session cannot be written.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.storage.remove(KEY_ID_TOKEN)?;
        self.storage.remove(KEY_EXPIRES_AT)?;
        self.storage.remove(KEY_PKCE_VERIFIER)?;
        debug!("session cleared");
        Ok(())
    }

    /// Claims of the stored token; empty when absent or malformed. Never fails.
    pub fn current_claims(&self) -> Claims {
        self.token()
            .map(|t| Claims::decode(t.expose_secret()))
            .unwrap_or_default()
    }

    /// # Errors
    /// Returns `Error::Storage` if the verifier cannot be written.
    pub fn store_verifier(&mut self, verifier: &CodeVerifier) -> Result<(), Error> {
        self.storage.set(KEY_PKCE_VERIFIER, verifier.expose())
    }

    pub fn has_pending_verifier(&self) -> bool {
        self.read(KEY_PKCE_VERIFIER).is_some()
    }

    /// Reads and removes the pending verifier so a code exchange can use it once.
    ///
    /// # Errors
    /// Returns `Error::MissingVerifier` when none is stored or it is not a valid verifier.
    pub fn take_verifier(&mut self) -> Result<CodeVerifier, Error> {
        let value = self.read(KEY_PKCE_VERIFIER).ok_or(Error::MissingVerifier)?;
        self.storage.remove(KEY_PKCE_VERIFIER)?;

        CodeVerifier::parse(&value).map_err(|e| {
            warn!("discarding stored verifier: {e}");
            Error::MissingVerifier
        })
    }

    // Read failures are treated as "absent": a broken session file means signed out.
    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("failed to read {key} from session storage: {e}");
                None
            }
        }
    }
}
