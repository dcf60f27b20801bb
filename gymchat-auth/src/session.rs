// Session identity: who is calling, as established by the app's own login.

use async_trait::async_trait;
use gymchat_core::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{ChatAuthError, ChatAuthResult};
#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::SessionOptions;

/// Output of the identity provider: a verified internal user and the role
/// attached to the session (informational; gym roles come from the
/// membership row).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub role: Option<String>,
}

/// Turns a bearer credential into a session identity. The chat core
/// trusts whatever this returns.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer: &str) -> ChatAuthResult<SessionIdentity>;
}

/// Extract `<token>` from an `Authorization: Bearer <token>` value.
pub fn bearer_from_header(value: &str) -> Option<String> {
    let v = value.trim();
    let (scheme, token) = v.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    role: Option<String>,
}

/// Verifies HMAC-signed session JWTs (`sub` = internal user id).
#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
pub struct JwtSessionVerifier {
    options: SessionOptions,
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtSessionVerifier {
    pub fn new(options: SessionOptions) -> ChatAuthResult<Self> {
        if options.secret.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ChatAuthError::Configuration(
                "session secret is not configured".to_string(),
            ));
        }
        Ok(Self { options })
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
#[async_trait]
impl IdentityProvider for JwtSessionVerifier {
    async fn resolve(&self, bearer: &str) -> ChatAuthResult<SessionIdentity> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let secret = self
            .options
            .secret
            .as_ref()
            .ok_or_else(|| ChatAuthError::NotAuthenticated("session secret missing".to_string()))?;

        let mut validation = Validation::new(crate::token::jwt_algorithm(self.options.algorithm));
        validation.set_issuer(&[self.options.issuer.as_str()]);
        validation.set_audience(
            &self
                .options
                .audience
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
        );

        let decoded = decode::<SessionClaims>(
            bearer,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ChatAuthError::NotAuthenticated(e.to_string()))?;

        let user_id = decoded
            .claims
            .sub
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ChatAuthError::NotAuthenticated("session subject is not a user id".to_string())
            })?;

        Ok(SessionIdentity {
            user_id: UserId(user_id),
            role: decoded.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_from_header("Bearer abc.def"), Some("abc.def".to_string()));
        assert_eq!(bearer_from_header("bearer   abc "), Some("abc".to_string()));
        assert_eq!(bearer_from_header("Bearer "), None);
        assert_eq!(bearer_from_header("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_from_header("abc.def"), None);
    }

    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    mod jwt {
        use super::super::*;
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde_json::json;

        fn options() -> SessionOptions {
            SessionOptions {
                secret: Some("session-secret".to_string()),
                ..SessionOptions::default()
            }
        }

        fn session_token(claims: serde_json::Value, secret: &str) -> String {
            encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(secret.as_bytes()),
            )
            .unwrap()
        }

        fn exp() -> i64 {
            chrono::Utc::now().timestamp() + 600
        }

        #[tokio::test]
        async fn resolves_valid_session_tokens() {
            let verifier = JwtSessionVerifier::new(options()).unwrap();
            let token = session_token(
                json!({
                    "sub": "456",
                    "role": "member",
                    "iss": "gymchat-auth",
                    "aud": ["gymchat-api"],
                    "exp": exp(),
                }),
                "session-secret",
            );

            let identity = verifier.resolve(&token).await.unwrap();
            assert_eq!(identity.user_id, UserId(456));
            assert_eq!(identity.role.as_deref(), Some("member"));
        }

        #[tokio::test]
        async fn rejects_wrong_secret_issuer_and_expired_tokens() {
            let verifier = JwtSessionVerifier::new(options()).unwrap();

            let wrong_secret = session_token(
                json!({"sub": "456", "iss": "gymchat-auth", "aud": ["gymchat-api"], "exp": exp()}),
                "other",
            );
            let wrong_issuer = session_token(
                json!({"sub": "456", "iss": "elsewhere", "aud": ["gymchat-api"], "exp": exp()}),
                "session-secret",
            );
            let expired = session_token(
                json!({"sub": "456", "iss": "gymchat-auth", "aud": ["gymchat-api"], "exp": 1_000}),
                "session-secret",
            );
            let not_a_user = session_token(
                json!({
                    "sub": "alice",
                    "iss": "gymchat-auth",
                    "aud": ["gymchat-api"],
                    "exp": exp(),
                }),
                "session-secret",
            );

            for token in [wrong_secret, wrong_issuer, expired, not_a_user] {
                assert!(matches!(
                    verifier.resolve(&token).await,
                    Err(ChatAuthError::NotAuthenticated(_))
                ));
            }
        }

        #[test]
        fn requires_a_secret() {
            assert!(JwtSessionVerifier::new(SessionOptions::default()).is_err());
        }
    }
}
