//! Shared-secret authentication for the revalidation webhook.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::error::AppError;

/// Checks the secret presented by the webhook sender.
///
/// The expected secret is injected at construction; an absent or blank
/// secret leaves the authenticator misconfigured and every request fails.
#[derive(Clone)]
pub struct WebhookAuthenticator {
    expected: Option<Vec<u8>>,
}

impl WebhookAuthenticator {
    pub fn new(secret: Option<String>) -> Self {
        let expected = secret
            .filter(|secret| !secret.trim().is_empty())
            .map(|secret| hash_secret(&secret));
        Self { expected }
    }

    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Verify `provided` against the configured secret.
    ///
    /// Fails with [`AppError::Misconfigured`] before looking at `provided`
    /// when no secret is configured.
    pub fn verify(&self, provided: &str) -> Result<(), AppError> {
        let expected = self.expected.as_ref().ok_or(AppError::Misconfigured)?;
        let provided = hash_secret(provided);
        if expected.as_slice().ct_eq(provided.as_slice()).unwrap_u8() == 0 {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }
}

impl std::fmt::Debug for WebhookAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookAuthenticator")
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Pick the secret the sender presented.
///
/// `Authorization: Bearer <secret>` wins (scheme matched case-insensitively,
/// value trimmed); an empty bearer value falls back to the `secret` query
/// parameter. Nothing presented yields an empty string.
pub fn provided_secret(authorization: Option<&str>, query_secret: Option<&str>) -> String {
    authorization
        .map(strip_bearer)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(query_secret)
        .unwrap_or_default()
        .to_string()
}

fn strip_bearer(header: &str) -> &str {
    let header = header.trim_start();
    match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &header[6..];
            if rest.starts_with(char::is_whitespace) {
                rest
            } else {
                header
            }
        }
        _ => header,
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
