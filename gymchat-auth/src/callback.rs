//! Runtime channel authorization.
//!
//! The provider asks, per channel access, whether a subject may enter a
//! channel. The answer is derived from the channel id alone (gym prefix)
//! and the same membership gate that credential issuance uses. Every
//! failure is a denial.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::identity::IdentityMapper;
use crate::membership::MembershipGate;

/// Body the provider sends to the callback endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// External subject.
    pub user_id: String,
    pub channel_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    UnmappedSubject,
    UnparseableChannel,
    CrossTenant,
    NotParticipant,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::UnmappedSubject => "unmapped subject",
            DenyReason::UnparseableChannel => "unparseable channel",
            DenyReason::CrossTenant => "cross-tenant access",
            DenyReason::NotParticipant => "not a participant",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny(DenyReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow)
    }
}

/// Wire form of a decision: `{"allow": bool, "reason"?: string}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub allow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<AuthorizationDecision> for AuthorizationResponse {
    fn from(decision: AuthorizationDecision) -> Self {
        match decision {
            AuthorizationDecision::Allow => Self {
                allow: true,
                reason: None,
            },
            AuthorizationDecision::Deny(reason) => Self {
                allow: false,
                reason: Some(reason.as_str().to_string()),
            },
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationCallback {
    mapper: IdentityMapper,
    gate: MembershipGate,
}

impl AuthorizationCallback {
    pub fn new(mapper: IdentityMapper, gate: MembershipGate) -> Self {
        Self { mapper, gate }
    }

    pub async fn authorize(&self, subject: &str, channel_id: &str) -> AuthorizationDecision {
        let decision = self.decide(subject, channel_id).await;
        match decision {
            AuthorizationDecision::Allow => {
                tracing::info!(subject, channel_id, "channel access allowed");
            }
            AuthorizationDecision::Deny(reason) => {
                tracing::warn!(
                    subject,
                    channel_id,
                    reason = reason.as_str(),
                    "channel access denied"
                );
            }
        }
        decision
    }

    async fn decide(&self, subject: &str, channel_id: &str) -> AuthorizationDecision {
        let Ok(user) = self.mapper.reverse(subject) else {
            return AuthorizationDecision::Deny(DenyReason::UnmappedSubject);
        };

        let Ok(channel) = ChannelId::parse(channel_id) else {
            return AuthorizationDecision::Deny(DenyReason::UnparseableChannel);
        };

        // Lookup failures deny too; there is no "unknown" outcome.
        if let Err(err) = self.gate.check_membership(user, channel.gym()).await {
            tracing::debug!(
                user_id = %user,
                gym_id = %channel.gym(),
                error = %err,
                "membership check failed"
            );
            return AuthorizationDecision::Deny(DenyReason::CrossTenant);
        }

        if !channel.admits(user) {
            return AuthorizationDecision::Deny(DenyReason::NotParticipant);
        }

        AuthorizationDecision::Allow
    }
}
