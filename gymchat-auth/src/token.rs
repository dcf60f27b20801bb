//! Chat credential issuance.
//!
//! A credential is a short-lived signed token scoped to exactly one gym.
//! Issuance runs the membership gate first, maps the user to the
//! provider's subject, derives the role claim and hands the claim set to
//! an opaque signer. Nothing is stored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use gymchat_core::{GymContext, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChatAuthError, ChatAuthResult};
use crate::identity::{ExternalSubject, IdentityMapper};
use crate::membership::{GymRole, MembershipGate};
use crate::options::JwtAlgorithm;
use crate::session::SessionIdentity;

/// Provider role granted inside a gym's channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleClaim(&'static str);

impl RoleClaim {
    /// The role every unrecognised gym role maps to.
    pub const LEAST_PRIVILEGED: RoleClaim = RoleClaim("user");
    pub const MODERATOR: RoleClaim = RoleClaim("channel_moderator");
    pub const ADMIN: RoleClaim = RoleClaim("admin");

    /// Total mapping from gym roles to provider roles.
    pub fn for_role(role: GymRole) -> RoleClaim {
        match role {
            GymRole::Member => Self::LEAST_PRIVILEGED,
            GymRole::Trainer => Self::MODERATOR,
            GymRole::Admin | GymRole::Owner => Self::ADMIN,
            GymRole::Unknown => {
                tracing::warn!("unknown gym role, issuing least-privileged chat role");
                Self::LEAST_PRIVILEGED
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Exactly the claims handed to the signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatClaims {
    /// External subject; the provider reads the user from this claim.
    pub user_id: String,
    pub internal_user_id: u64,
    pub gym_id: u64,
    /// Always `gym_{gym_id}`, never more than one gym.
    pub team: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// An issued credential. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatCredential {
    pub token: String,
    pub external_subject: ExternalSubject,
    pub internal_user_id: UserId,
    pub gym_id: gymchat_core::GymId,
    pub team_claim: String,
    pub role_claim: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signing capability supplied by the messaging provider integration.
/// The issuer never sees the key.
pub trait ChatTokenSigner: Send + Sync {
    fn sign(&self, claims: &ChatClaims) -> ChatAuthResult<String>;
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
pub(crate) fn jwt_algorithm(alg: JwtAlgorithm) -> jsonwebtoken::Algorithm {
    match alg {
        JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
        JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
        JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
    }
}

/// Signs chat claims as an HMAC JWT with the provider api secret.
#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
pub struct JwtChatSigner {
    algorithm: JwtAlgorithm,
    key: jsonwebtoken::EncodingKey,
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtChatSigner {
    pub fn new(algorithm: JwtAlgorithm, api_secret: &str) -> ChatAuthResult<Self> {
        if api_secret.trim().is_empty() {
            return Err(ChatAuthError::Configuration(
                "provider api secret is not configured".to_string(),
            ));
        }
        Ok(Self {
            algorithm,
            key: jsonwebtoken::EncodingKey::from_secret(api_secret.as_bytes()),
        })
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl ChatTokenSigner for JwtChatSigner {
    fn sign(&self, claims: &ChatClaims) -> ChatAuthResult<String> {
        let header = jsonwebtoken::Header::new(jwt_algorithm(self.algorithm));
        jsonwebtoken::encode(&header, claims, &self.key)
            .map_err(|e| ChatAuthError::Signing(e.to_string()))
    }
}

/// Stand-in used when no JWT backend feature is enabled.
#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
pub struct NoJwtSigner;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl ChatTokenSigner for NoJwtSigner {
    fn sign(&self, _claims: &ChatClaims) -> ChatAuthResult<String> {
        Err(ChatAuthError::Signing(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    gate: MembershipGate,
    mapper: IdentityMapper,
    signer: Arc<dyn ChatTokenSigner>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        gate: MembershipGate,
        mapper: IdentityMapper,
        signer: Arc<dyn ChatTokenSigner>,
        ttl: Duration,
    ) -> Self {
        Self {
            gate,
            mapper,
            signer,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a credential for the session's user in the session's
    /// selected gym.
    pub async fn issue(
        &self,
        session: &SessionIdentity,
        ctx: GymContext,
    ) -> ChatAuthResult<ChatCredential> {
        self.issue_at(session, ctx, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        session: &SessionIdentity,
        ctx: GymContext,
        now: DateTime<Utc>,
    ) -> ChatAuthResult<ChatCredential> {
        let membership = match self.gate.check_membership(session.user_id, ctx.gym_id).await {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(
                    user_id = %session.user_id,
                    gym_id = %ctx.gym_id,
                    error = %err,
                    "chat credential refused"
                );
                return Err(err);
            }
        };

        let subject = self.mapper.forward(membership.user_id())?;
        let role = RoleClaim::for_role(membership.role());

        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| ChatAuthError::Configuration("token ttl out of range".to_string()))?;
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl)
            .ok_or_else(|| ChatAuthError::Configuration("token expiry out of range".to_string()))?;
        let issued_at = Utc.timestamp_opt(iat, 0).single().unwrap_or(now);
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| ChatAuthError::Configuration("token expiry out of range".to_string()))?;

        let claims = ChatClaims {
            user_id: subject.as_str().to_string(),
            internal_user_id: membership.user_id().0,
            gym_id: membership.gym_id().0,
            team: membership.gym_id().team(),
            role: role.as_str().to_string(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = self.signer.sign(&claims)?;

        tracing::info!(
            user_id = %membership.user_id(),
            gym_id = %membership.gym_id(),
            role = role.as_str(),
            "chat credential issued"
        );

        Ok(ChatCredential {
            token,
            external_subject: subject,
            internal_user_id: membership.user_id(),
            gym_id: membership.gym_id(),
            team_claim: claims.team,
            role_claim: claims.role,
            issued_at,
            expires_at,
        })
    }
}
