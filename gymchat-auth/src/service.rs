// Chat authorization service: the three inbound operations wired together.

use std::sync::Arc;

use gymchat_core::GymContext;
use serde::{Deserialize, Serialize};

use crate::callback::{AuthorizationCallback, AuthorizationRequest, AuthorizationResponse};
use crate::error::{ChatAuthError, ChatAuthResult, MembershipDenial};
use crate::events::{
    DispatchOutcome, IdempotentHandler, ResolvedEvent, WebhookEvent, WebhookHandler,
};
use crate::identity::IdentityMapper;
use crate::membership::{MembershipGate, MembershipStore};
use crate::options::ChatAuthOptions;
use crate::session::IdentityProvider;
use crate::token::{ChatCredential, ChatTokenSigner, TokenIssuer};
use crate::webhook::{Verified, WebhookVerifier};

/// What the credential endpoint returns to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub api_key: String,
    pub internal_user_id: u64,
}

/// Acknowledgement for a handled webhook delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub ok: bool,
    pub duplicate: bool,
}

pub struct ChatAuthService {
    options: Arc<ChatAuthOptions>,
    sessions: Arc<dyn IdentityProvider>,
    issuer: TokenIssuer,
    verifier: WebhookVerifier,
    callback: AuthorizationCallback,
    mapper: IdentityMapper,
    dispatcher: IdempotentHandler<Arc<dyn WebhookHandler>>,
}

impl ChatAuthService {
    pub fn new(
        options: ChatAuthOptions,
        store: Arc<dyn MembershipStore>,
        sessions: Arc<dyn IdentityProvider>,
        signer: Arc<dyn ChatTokenSigner>,
        handler: Arc<dyn WebhookHandler>,
    ) -> ChatAuthResult<Self> {
        options.validate().map_err(ChatAuthError::Configuration)?;

        let mapper = IdentityMapper::new(&options.subject_prefix)?;
        let gate = MembershipGate::new(store);
        let issuer = TokenIssuer::new(gate.clone(), mapper.clone(), signer, options.token_ttl);
        let verifier = WebhookVerifier::new(options.webhook_secret.as_deref());
        let callback = AuthorizationCallback::new(mapper.clone(), gate);
        let dispatcher = IdempotentHandler::new(handler, options.dedup_window);

        if !verifier.is_configured() {
            tracing::warn!(
                "webhook secret is not configured; inbound provider calls will be rejected"
            );
        }

        Ok(Self {
            options: Arc::new(options),
            sessions,
            issuer,
            verifier,
            callback,
            mapper,
            dispatcher,
        })
    }

    /// Wire the JWT session verifier and the JWT credential signer from
    /// the options alone.
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    pub fn from_options(
        options: ChatAuthOptions,
        store: Arc<dyn MembershipStore>,
        handler: Arc<dyn WebhookHandler>,
    ) -> ChatAuthResult<Self> {
        let signer = crate::token::JwtChatSigner::new(options.algorithm, &options.api_secret)?;
        let sessions = crate::session::JwtSessionVerifier::new(options.session.clone())?;
        Self::new(options, store, Arc::new(sessions), Arc::new(signer), handler)
    }

    pub fn options(&self) -> &ChatAuthOptions {
        &self.options
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    /// Credential endpoint: authenticate the bearer, then issue for the
    /// gym the session has selected. The bearer is checked first so an
    /// anonymous caller learns nothing about gyms.
    pub async fn issue_token(
        &self,
        bearer: Option<&str>,
        gym: Option<GymContext>,
    ) -> ChatAuthResult<TokenResponse> {
        let credential = self.issue_credential(bearer, gym).await?;
        Ok(TokenResponse {
            token: credential.token,
            api_key: self.options.api_key.clone(),
            internal_user_id: credential.internal_user_id.0,
        })
    }

    pub async fn issue_credential(
        &self,
        bearer: Option<&str>,
        gym: Option<GymContext>,
    ) -> ChatAuthResult<ChatCredential> {
        let bearer = bearer
            .ok_or_else(|| ChatAuthError::NotAuthenticated("missing bearer token".to_string()))?;
        let session = self.sessions.resolve(bearer).await?;

        let Some(ctx) = gym else {
            tracing::warn!(user_id = %session.user_id, "chat credential refused: no gym selected");
            return Err(ChatAuthError::NoMembership(MembershipDenial::NotFound));
        };

        self.issuer.issue(&session, ctx).await
    }

    fn verify<'a>(&self, body: &'a [u8], signature: Option<&str>) -> ChatAuthResult<Verified<'a>> {
        self.verifier.verify(body, signature).inspect_err(|err| {
            tracing::warn!(error = %err, "inbound provider call rejected");
        })
    }

    /// Webhook endpoint: verify, decode, resolve, dispatch once.
    pub async fn receive_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> ChatAuthResult<WebhookReceipt> {
        let verified = self.verify(body, signature)?;
        let event = WebhookEvent::decode(verified)?;
        let resolved = ResolvedEvent::resolve(event, &self.mapper)?;

        let outcome = self
            .dispatcher
            .dispatch(&resolved)
            .await
            .map_err(ChatAuthError::Dispatch)?;

        match outcome {
            DispatchOutcome::Handled => Ok(WebhookReceipt {
                ok: true,
                duplicate: false,
            }),
            DispatchOutcome::Duplicate => Ok(WebhookReceipt {
                ok: true,
                duplicate: true,
            }),
            // Not acknowledged: the first delivery may still fail.
            DispatchOutcome::InFlight => Err(ChatAuthError::EventInFlight),
        }
    }

    /// Callback endpoint: verify, then answer with a decision. Only a
    /// verification failure or a malformed body is an error; everything
    /// else is a decision.
    pub async fn authorize_channel(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> ChatAuthResult<AuthorizationResponse> {
        let verified = self.verify(body, signature)?;
        let request: AuthorizationRequest = serde_json::from_slice(verified.body())
            .map_err(|e| ChatAuthError::InvalidEvent(format!("authorization request: {e}")))?;

        let decision = self
            .callback
            .authorize(&request.user_id, &request.channel_id)
            .await;
        Ok(decision.into())
    }
}
