//! gymchat-auth: tenant-scoped chat authorization.
//!
//! Three independent isolation checks keep every client inside the gyms
//! it belongs to: the membership gate before issuance, the single `team`
//! claim inside each credential, and the gym prefix of every channel id
//! checked again by the authorization callback. Inbound provider calls
//! are authenticated by [`WebhookVerifier`] before anything is parsed.

pub mod callback;
pub mod channel;
pub mod error;
pub mod events;
pub mod identity;
pub mod membership;
pub mod options;
pub mod policy;
pub mod service;
pub mod session;
pub mod token;
pub mod webhook;

pub use callback::{
    AuthorizationCallback, AuthorizationDecision, AuthorizationRequest, AuthorizationResponse,
    DenyReason,
};
pub use channel::{ChannelId, ChannelKind};
pub use error::{ChatAuthError, ChatAuthResult, MembershipDenial};
pub use events::{
    DispatchOutcome, IdempotentHandler, LoggingHandler, ResolvedEvent, WebhookEvent,
    WebhookHandler,
};
pub use identity::{ExternalSubject, IdentityMapper};
pub use membership::{
    ActiveMembership, GymRole, InMemoryMembershipStore, MembershipGate, MembershipRecord,
    MembershipStore,
};
pub use options::{ChatAuthOptions, JwtAlgorithm, SessionOptions};
pub use policy::gym_access_policy;
pub use service::{ChatAuthService, TokenResponse, WebhookReceipt};
pub use session::{bearer_from_header, IdentityProvider, SessionIdentity};
pub use token::{ChatClaims, ChatCredential, ChatTokenSigner, RoleClaim, TokenIssuer};
pub use webhook::{compute_signature, Verified, WebhookVerifier, SIGNATURE_HEADERS};

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
pub use session::JwtSessionVerifier;
#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
pub use token::JwtChatSigner;
#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
pub use token::NoJwtSigner;
