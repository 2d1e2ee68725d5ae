//! Basic-auth credential
//!
//! The credential is the base64 encoding of `username:password`. It is
//! stored as-is and sent as `Authorization: Basic <encoded>`.

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    encoded: String,
}

impl Credential {
    /// Encode a username/password pair
    pub fn from_login(username: &str, password: &str) -> Self {
        let raw = format!("{}:{}", username, password);
        Self {
            encoded: STANDARD.encode(raw.as_bytes()),
        }
    }

    /// Wrap an already-encoded credential (e.g. loaded from disk)
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
        }
    }

    /// The encoded form, as persisted
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.encoded)
    }

    /// Username part, if the encoded value decodes cleanly
    pub fn username(&self) -> Option<String> {
        let bytes = STANDARD.decode(self.encoded.as_bytes()).ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        raw.split_once(':').map(|(user, _)| user.to_string())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("encoded", &"<redacted>")
            .finish()
    }
}
