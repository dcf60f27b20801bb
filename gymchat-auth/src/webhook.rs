//! Inbound signature verification.
//!
//! The provider signs every callback with HMAC-SHA256 over the raw body,
//! hex encoded in the `x-signature` header. Verification happens on the
//! bytes as received, before any parsing, and a missing secret rejects
//! everything.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ChatAuthError, ChatAuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Header names checked for the signature, in order.
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-signature", "signature"];

/// A body whose signature checked out. Only [`WebhookVerifier::verify`]
/// creates one, so holding it means verification already happened.
#[derive(Debug, Clone, Copy)]
pub struct Verified<'a> {
    body: &'a [u8],
}

impl<'a> Verified<'a> {
    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl WebhookVerifier {
    /// A blank secret is treated the same as no secret.
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.as_bytes().to_vec());
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` (hex HMAC-SHA256) against `body`.
    ///
    /// The secret is checked first, so an unconfigured verifier answers
    /// `Configuration` whatever the signature.
    pub fn verify<'a>(
        &self,
        body: &'a [u8],
        signature: Option<&str>,
    ) -> ChatAuthResult<Verified<'a>> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ChatAuthError::Configuration("webhook secret is not configured".to_string())
        })?;

        let signature = signature.map(str::trim).unwrap_or("");
        if signature.is_empty() {
            return Err(ChatAuthError::BadSignature);
        }

        let expected = hex::decode(signature).map_err(|_| ChatAuthError::BadSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ChatAuthError::Configuration(e.to_string()))?;
        mac.update(body);
        // verify_slice compares in constant time and fails on length mismatch.
        mac.verify_slice(&expected)
            .map_err(|_| ChatAuthError::BadSignature)?;

        Ok(Verified { body })
    }

    /// Sign a body the way the provider does. Used by internal shims that
    /// call the inbound endpoints, and by tests.
    pub fn sign(&self, body: &[u8]) -> ChatAuthResult<String> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ChatAuthError::Configuration("webhook secret is not configured".to_string())
        })?;
        compute_signature(secret, body)
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> ChatAuthResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ChatAuthError::Configuration(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
