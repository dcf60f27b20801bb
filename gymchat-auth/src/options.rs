// Chat authorization options and configuration.

use std::time::Duration;

use gymchat_core::ConfigSnapshot;
use serde::{Deserialize, Serialize};

use crate::error::ChatAuthError;

/// JWT signing algorithms supported for chat credentials and sessions.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl JwtAlgorithm {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

/// Main chat authorization configuration.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// component.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatAuthOptions {
    /// Public api key of the messaging provider, handed to clients.
    pub api_key: String,
    /// Provider-supplied secret the credential signer uses.
    pub api_secret: String,
    /// Shared secret for inbound webhook signatures. When absent every
    /// inbound call is rejected.
    pub webhook_secret: Option<String>,
    /// Lifetime of an issued chat credential.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    /// Template prefix of external subjects (`user_` -> `user_42`).
    pub subject_prefix: String,
    /// Algorithm for signing chat credentials.
    pub algorithm: JwtAlgorithm,
    /// Session (bearer) verification settings.
    pub session: SessionOptions,
    /// How many handled webhook event keys are remembered for dedup.
    pub dedup_window: usize,
}

/// Settings for verifying the bearer tokens of the app's own sessions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionOptions {
    pub secret: Option<String>,
    pub issuer: String,
    pub audience: Vec<String>,
    pub algorithm: JwtAlgorithm,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            secret: None,
            issuer: "gymchat-auth".to_string(),
            audience: vec!["gymchat-api".to_string()],
            algorithm: JwtAlgorithm::default(),
        }
    }
}

pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SUBJECT_PREFIX: &str = "user_";
pub const DEFAULT_DEDUP_WINDOW: usize = 10_000;

impl Default for ChatAuthOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            webhook_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            algorithm: JwtAlgorithm::default(),
            session: SessionOptions::default(),
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl ChatAuthOptions {
    /// Validate the configuration.
    ///
    /// A missing webhook secret is not an error here: the process may run
    /// and issue credentials, but the inbound endpoints refuse every call.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("Provider api key cannot be empty".to_string());
        }

        if self.api_secret.trim().is_empty() {
            return Err("Provider api secret cannot be empty".to_string());
        }

        if self.token_ttl.as_secs() == 0 {
            return Err("Chat token ttl must be greater than 0".to_string());
        }

        if self.subject_prefix.trim().is_empty() {
            return Err("Subject prefix cannot be empty".to_string());
        }

        if self.dedup_window == 0 {
            return Err("Webhook dedup window must be greater than 0".to_string());
        }

        if self.session.issuer.is_empty() {
            return Err("Session issuer cannot be empty".to_string());
        }

        if self.session.audience.is_empty() {
            return Err("Session audience cannot be empty".to_string());
        }

        Ok(())
    }

    /// Read options from a configuration snapshot.
    ///
    /// Keys: `provider.api_key`, `provider.api_secret`, `provider.algorithm`,
    /// `webhook.secret`, `auth.ttl`, `auth.subject_prefix`,
    /// `webhook.dedup_window`, `session.secret`, `session.issuer`,
    /// `session.audience` (comma separated), `session.algorithm`.
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, ChatAuthError> {
        let defaults = Self::default();

        let token_ttl = match snapshot.get_non_empty("auth.ttl") {
            Some(raw) => humantime_serde::re::humantime::parse_duration(&raw)
                .map_err(|e| ChatAuthError::Configuration(format!("auth.ttl: {e}")))?,
            None => defaults.token_ttl,
        };

        let algorithm = match snapshot.get_non_empty("provider.algorithm") {
            Some(raw) => JwtAlgorithm::parse(&raw).ok_or_else(|| {
                ChatAuthError::Configuration(format!("provider.algorithm: unsupported `{raw}`"))
            })?,
            None => defaults.algorithm,
        };

        let session_algorithm = match snapshot.get_non_empty("session.algorithm") {
            Some(raw) => JwtAlgorithm::parse(&raw).ok_or_else(|| {
                ChatAuthError::Configuration(format!("session.algorithm: unsupported `{raw}`"))
            })?,
            None => defaults.session.algorithm,
        };

        let audience = snapshot
            .get_non_empty("session.audience")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.session.audience);

        let options = Self {
            api_key: snapshot.get_non_empty("provider.api_key").unwrap_or_default(),
            api_secret: snapshot
                .get_non_empty("provider.api_secret")
                .unwrap_or_default(),
            webhook_secret: snapshot.get_non_empty("webhook.secret"),
            token_ttl,
            subject_prefix: snapshot
                .get_non_empty("auth.subject_prefix")
                .unwrap_or(defaults.subject_prefix),
            algorithm,
            session: SessionOptions {
                secret: snapshot.get_non_empty("session.secret"),
                issuer: snapshot
                    .get_non_empty("session.issuer")
                    .unwrap_or(defaults.session.issuer),
                audience,
                algorithm: session_algorithm,
            },
            dedup_window: snapshot
                .get_usize("webhook.dedup_window")
                .unwrap_or(defaults.dedup_window),
        };

        options.validate().map_err(ChatAuthError::Configuration)?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymchat_core::ConfigStore;

    fn base_store() -> ConfigStore {
        let mut store = ConfigStore::new();
        store.set("provider.api_key", "key-123");
        store.set("provider.api_secret", "provider-secret");
        store
    }

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let opts = ChatAuthOptions::from_snapshot(&base_store().snapshot()).unwrap();
        assert_eq!(opts.token_ttl, Duration::from_secs(3600));
        assert_eq!(opts.subject_prefix, "user_");
        assert_eq!(opts.algorithm, JwtAlgorithm::HS256);
        assert_eq!(opts.webhook_secret, None);
        assert_eq!(opts.dedup_window, DEFAULT_DEDUP_WINDOW);
    }

    #[test]
    fn reads_humantime_ttl_and_session_settings() {
        let mut store = base_store();
        store.set("auth.ttl", "15m");
        store.set("webhook.secret", "hook");
        store.set("session.audience", "web, mobile");
        store.set("session.algorithm", "hs512");

        let opts = ChatAuthOptions::from_snapshot(&store.snapshot()).unwrap();
        assert_eq!(opts.token_ttl, Duration::from_secs(900));
        assert_eq!(opts.webhook_secret.as_deref(), Some("hook"));
        assert_eq!(opts.session.audience, vec!["web", "mobile"]);
        assert_eq!(opts.session.algorithm, JwtAlgorithm::HS512);
    }

    #[test]
    fn missing_api_secret_is_a_startup_error() {
        let mut store = ConfigStore::new();
        store.set("provider.api_key", "key-123");
        let err = ChatAuthOptions::from_snapshot(&store.snapshot()).unwrap_err();
        assert!(matches!(err, ChatAuthError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_ttl_and_bad_algorithms() {
        let mut store = base_store();
        store.set("auth.ttl", "0s");
        assert!(ChatAuthOptions::from_snapshot(&store.snapshot()).is_err());

        let mut store = base_store();
        store.set("provider.algorithm", "RS256");
        assert!(ChatAuthOptions::from_snapshot(&store.snapshot()).is_err());
    }
}
