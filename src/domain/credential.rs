//! Credential material and the reversible secret text encoding.
//!
//! The encoding is base64 and hides nothing from anyone who can read the
//! configuration file; it only keeps secrets out of casual view.

use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::domain::server::AuthMethod;

/// Resolved authentication material for one target.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub kind: AuthMethod,
    /// Expanded private key path, for `key` and `key_with_passphrase`.
    pub key_path: Option<PathBuf>,
    /// Decoded password or key passphrase.
    pub secret: Option<String>,
}

impl Credential {
    #[must_use]
    pub fn key(path: PathBuf) -> Self {
        Self {
            kind: AuthMethod::Key,
            key_path: Some(path),
            secret: None,
        }
    }

    #[must_use]
    pub fn password(secret: String) -> Self {
        Self {
            kind: AuthMethod::Password,
            key_path: None,
            secret: Some(secret),
        }
    }

    #[must_use]
    pub fn key_with_passphrase(path: PathBuf, passphrase: String) -> Self {
        Self {
            kind: AuthMethod::KeyWithPassphrase,
            key_path: Some(path),
            secret: Some(passphrase),
        }
    }
}

// Secrets must never reach logs through `{:?}`.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("key_path", &self.key_path)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Encode a secret for storage in `password_base64`.
#[must_use]
pub fn encode_secret(secret: &str) -> String {
    BASE64.encode(secret.as_bytes())
}

/// Decode a stored secret. Returns `None` for text that is not base64 of UTF-8.
#[must_use]
pub fn decode_secret(text: &str) -> Option<String> {
    BASE64
        .decode(text.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
