//! Core multi-tenant types for GymChat.
//!
//! A tenant is a gym. Every chat operation is scoped to exactly one gym,
//! and both gyms and users are addressed by positive integer ids coming
//! from the persistence layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a gym (tenant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GymId(pub u64);

impl GymId {
    /// The team claim and channel prefix for this gym: `gym_{id}`.
    pub fn team(&self) -> String {
        format!("gym_{}", self.0)
    }
}

impl fmt::Display for GymId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal (database) identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried with every chat operation.
///
/// The gym is the one the authenticated session currently has selected.
/// It is taken from the session transport (a header), never from a
/// request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GymContext {
    pub gym_id: GymId,
}

impl GymContext {
    pub fn new(gym_id: u64) -> Self {
        Self {
            gym_id: GymId(gym_id),
        }
    }

    /// Parse a gym selector as sent by clients (`"123"`).
    ///
    /// Returns `None` for anything that is not a positive decimal.
    pub fn from_selector(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match raw.parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(Self::new(id)),
        }
    }
}
