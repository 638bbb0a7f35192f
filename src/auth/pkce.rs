//! PKCE (RFC 7636) verifier generation and `S256` challenge derivation.

use crate::error::Error;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{distributions::Alphanumeric, Rng};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

/// Only `S256` is ever sent; there is no `plain` fallback.
pub const CHALLENGE_METHOD: &str = "S256";

pub const VERIFIER_LEN: usize = 64;
const MIN_VERIFIER_LEN: usize = 43;
const MAX_VERIFIER_LEN: usize = 128;

/// High-entropy secret kept between login initiation and code exchange.
#[derive(Clone)]
pub struct CodeVerifier(SecretString);

impl CodeVerifier {
    /// Validates an externally supplied verifier (RFC 7636 section 4.1).
    ///
    /// # Errors
    /// Returns `Error::Validation` on bad length or characters outside `[A-Za-z0-9-._~]`.
    pub fn parse(value: &str) -> Result<Self, Error> {
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&value.len()) {
            return Err(Error::Validation(format!(
                "code verifier must be {MIN_VERIFIER_LEN}-{MAX_VERIFIER_LEN} characters"
            )));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        {
            return Err(Error::Validation(
                "code verifier contains invalid characters".to_string(),
            ));
        }

        Ok(Self(SecretString::from(value.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier([REDACTED])")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates a fresh alphanumeric verifier from the thread-local CSPRNG.
pub fn generate_verifier() -> CodeVerifier {
    let verifier: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFIER_LEN)
        .map(char::from)
        .collect();

    CodeVerifier(SecretString::from(verifier))
}

/// `BASE64URL-ENCODE(SHA256(ASCII(code_verifier)))`, unpadded.
pub fn derive_challenge(verifier: &CodeVerifier) -> CodeChallenge {
    let digest = Sha256::digest(verifier.expose().as_bytes());
    CodeChallenge(Base64UrlUnpadded::encode_string(&digest))
}
