//! # imglab (photo submission client)
//!
//! `imglab` drives a photo-submission workflow that lives behind an external
//! OAuth2 identity provider and an external storage/API service.
//!
//! ## Authentication (Authorization Code + PKCE)
//!
//! Sign-in never handles a password. A random code verifier is persisted, its
//! `S256` challenge is sent to the identity provider, and the authorization
//! code that comes back on the redirect is exchanged for an identity token.
//! The token and its absolute expiry are kept in a small session file.
//!
//! ## Moderation
//!
//! Admins see three lists (`pending`, `approved`, `rejected`). Lists are cached
//! locally after the first fetch and only reconciled with the server on an
//! explicit refresh. Approve/reject results are applied optimistically.
//!
//! ## Uploads
//!
//! Uploads are validated locally (type and size), then sent straight to
//! storage using a pre-signed form obtained from the backend.
//!
//! Claims decoded from the identity token are for display only. The backend's
//! `403 Forbidden` is the only authorization signal this crate trusts.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod moderation;
pub mod upload;

pub use error::Error;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
