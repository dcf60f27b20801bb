//! Mapping between internal user ids and the provider's subject strings.
//!
//! The mapping is a fixed template, `"{prefix}{id}"`, so it needs no
//! storage and is the same on every node. `reverse` only accepts strings
//! that `forward` could have produced.

use std::fmt;

use gymchat_core::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{ChatAuthError, ChatAuthResult};
use crate::options::DEFAULT_SUBJECT_PREFIX;

/// The provider's identifier for a user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalSubject(String);

impl ExternalSubject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Characters the provider accepts in a subject id.
fn is_subject_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '@')
}

/// Parse an unsigned decimal in canonical form: digits only, no sign,
/// no leading zero (except `"0"` itself).
pub(crate) fn parse_canonical_u64(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse::<u64>().ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityMapper {
    prefix: String,
}

impl Default for IdentityMapper {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
        }
    }
}

impl IdentityMapper {
    /// Build a mapper for a template prefix.
    ///
    /// The prefix is lower-cased and any character the provider does not
    /// accept becomes `_`. An empty prefix is rejected.
    pub fn new(prefix: &str) -> ChatAuthResult<Self> {
        let prefix: String = prefix
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if is_subject_char(c) { c } else { '_' })
            .collect();

        if prefix.is_empty() {
            return Err(ChatAuthError::Configuration(
                "subject prefix cannot be empty".to_string(),
            ));
        }

        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Internal id -> external subject.
    ///
    /// Fails only for id `0`, which no persisted user has.
    pub fn forward(&self, id: UserId) -> ChatAuthResult<ExternalSubject> {
        if id.0 == 0 {
            return Err(ChatAuthError::Mapping("user id 0 is not mappable".to_string()));
        }
        Ok(ExternalSubject(format!("{}{}", self.prefix, id.0)))
    }

    /// External subject -> internal id.
    pub fn reverse(&self, subject: &str) -> ChatAuthResult<UserId> {
        let unmapped = || ChatAuthError::Mapping(format!("unrecognised subject `{subject}`"));

        let digits = subject.strip_prefix(self.prefix.as_str()).ok_or_else(unmapped)?;
        match parse_canonical_u64(digits) {
            Some(0) | None => Err(unmapped()),
            Some(id) => Ok(UserId(id)),
        }
    }
}
