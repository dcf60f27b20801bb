// Chat authorization errors.

use std::fmt;

use gymchat_core::errors::ChatError;
use thiserror::Error;

/// Why a membership did not qualify. Only ever logged; clients see the
/// same message for every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipDenial {
    /// No row, or no gym selected.
    NotFound,
    Inactive,
    Suspended,
    /// The store answered with a row for another user or gym.
    Mismatched,
}

impl fmt::Display for MembershipDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MembershipDenial::NotFound => "not found",
            MembershipDenial::Inactive => "inactive",
            MembershipDenial::Suspended => "suspended",
            MembershipDenial::Mismatched => "mismatched row",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ChatAuthError {
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("no active membership ({0})")]
    NoMembership(MembershipDenial),

    #[error("membership lookup failed: {0}")]
    MembershipLookup(#[source] anyhow::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("signature mismatch")]
    BadSignature,

    #[error("identity mapping failed: {0}")]
    Mapping(String),

    #[error("unparseable channel id: {0}")]
    ChannelParse(String),

    #[error("cross-tenant access")]
    CrossTenant,

    #[error("credential signing failed: {0}")]
    Signing(String),

    #[error("invalid webhook event: {0}")]
    InvalidEvent(String),

    #[error("event dispatch failed: {0}")]
    Dispatch(#[source] anyhow::Error),

    #[error("event is still being handled by another delivery")]
    EventInFlight,
}

pub type ChatAuthResult<T> = std::result::Result<T, ChatAuthError>;

impl ChatAuthError {
    /// Map onto the transport error. Messages here are what a client may
    /// see, so none of them says whether a gym exists.
    pub fn to_chat_error(&self) -> ChatError {
        match self {
            ChatAuthError::NotAuthenticated(_) => {
                ChatError::not_authenticated("Invalid or expired session")
            }
            ChatAuthError::NoMembership(_) => {
                ChatError::forbidden("No active membership in the selected gym")
            }
            ChatAuthError::Mapping(_) => ChatError::forbidden("Unable to resolve chat identity"),
            ChatAuthError::CrossTenant => ChatError::forbidden("cross-tenant access"),
            ChatAuthError::ChannelParse(_) => ChatError::bad_request("unparseable channel"),
            ChatAuthError::BadSignature => ChatError::not_authenticated("Invalid signature"),
            ChatAuthError::InvalidEvent(_) => {
                ChatError::bad_request("Unsupported or malformed event")
            }
            ChatAuthError::Configuration(msg) => ChatError::general_error(msg.clone()),
            ChatAuthError::Signing(msg) => ChatError::bad_gateway(msg.clone()),
            ChatAuthError::MembershipLookup(e) => ChatError::unavailable(e.to_string()),
            ChatAuthError::Dispatch(e) => ChatError::general_error(e.to_string()),
            ChatAuthError::EventInFlight => ChatError::unavailable("Event is being processed"),
        }
    }

    pub fn into_anyhow(self) -> anyhow::Error {
        let chat = self.to_chat_error();
        chat.with_source(anyhow::Error::new(self)).into_anyhow()
    }
}

impl From<ChatAuthError> for ChatError {
    fn from(err: ChatAuthError) -> Self {
        let chat = err.to_chat_error();
        chat.with_source(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_denials_render_identically_to_clients() {
        let messages: Vec<String> = [
            MembershipDenial::NotFound,
            MembershipDenial::Inactive,
            MembershipDenial::Suspended,
            MembershipDenial::Mismatched,
        ]
        .into_iter()
        .map(|d| ChatAuthError::NoMembership(d).to_chat_error().message)
        .collect();

        assert!(messages.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (ChatAuthError::NotAuthenticated("x".into()), 401),
            (ChatAuthError::BadSignature, 401),
            (ChatAuthError::NoMembership(MembershipDenial::NotFound), 403),
            (ChatAuthError::Mapping("x".into()), 403),
            (ChatAuthError::CrossTenant, 403),
            (ChatAuthError::ChannelParse("x".into()), 400),
            (ChatAuthError::InvalidEvent("x".into()), 400),
            (ChatAuthError::Configuration("x".into()), 500),
            (ChatAuthError::Signing("x".into()), 502),
            (ChatAuthError::MembershipLookup(anyhow::anyhow!("db down")), 503),
            (ChatAuthError::EventInFlight, 503),
        ];
        for (err, code) in cases {
            assert_eq!(err.to_chat_error().code(), code, "{err}");
        }
    }

    #[test]
    fn anyhow_conversion_keeps_the_structured_error_findable() {
        let any = ChatAuthError::CrossTenant.into_anyhow();
        let chat = ChatError::from_anyhow(&any).map(|e| e.code());
        assert_eq!(chat, Some(403));
    }
}
