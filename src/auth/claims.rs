//! Unverified identity-token claims, for display only.
//!
//! The signature is never checked here. Nothing in this crate uses these
//! claims to decide what a user may do; the backend's 403 is authoritative.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};

const GROUPS_CLAIM: &str = "cognito:groups";
const ADMIN_GROUP: &str = "admins";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Decodes the payload segment of a JWT. Malformed tokens yield empty claims.
    pub fn decode(token: &str) -> Self {
        decode_payload(token).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// Whether the groups claim lists the admin group, as an array or a comma-separated string.
    pub fn is_admin(&self) -> bool {
        let groups: Vec<String> = match self.0.get(GROUPS_CLAIM) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };

        groups
            .iter()
            .any(|g| g.trim().eq_ignore_ascii_case(ADMIN_GROUP))
    }
}

fn decode_payload(token: &str) -> Option<Claims> {
    let segment = token.split('.').nth(1)?;
    let bytes = Base64UrlUnpadded::decode_vec(segment.trim_end_matches('=')).ok()?;

    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(Claims(map)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
    format!("{header}.{body}.signature")
}
