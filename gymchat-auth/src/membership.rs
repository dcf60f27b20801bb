// Gym membership lookup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gymchat_core::{GymId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{ChatAuthError, ChatAuthResult};
use crate::policy::gym_access_policy;

/// Role of a user inside one gym, as stored by the persistence layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GymRole {
    Member,
    Trainer,
    Admin,
    Owner,
    /// Any role string this build does not know about.
    #[serde(other)]
    Unknown,
}

/// One membership row. Owned by the persistence layer; read-only here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub user_id: UserId,
    pub gym_id: GymId,
    pub role: GymRole,
    pub active: bool,
    pub suspended: bool,
}

/// Proof that a membership passed the access policy. Only
/// [`gym_access_policy`] constructs it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveMembership {
    user_id: UserId,
    gym_id: GymId,
    role: GymRole,
}

impl ActiveMembership {
    pub(crate) fn new(user_id: UserId, gym_id: GymId, role: GymRole) -> Self {
        Self {
            user_id,
            gym_id,
            role,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn gym_id(&self) -> GymId {
        self.gym_id
    }

    pub fn role(&self) -> GymRole {
        self.role
    }
}

/// Persistence contract: fetch the membership row of `user` in `gym`.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_membership(&self, user: UserId, gym: GymId) -> Result<Option<MembershipRecord>>;
}

/// Membership rows held in memory, fixed at construction.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMembershipStore {
    rows: HashMap<(UserId, GymId), MembershipRecord>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = MembershipRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| ((r.user_id, r.gym_id), r))
            .collect();
        Self { rows }
    }

    pub fn with(mut self, record: MembershipRecord) -> Self {
        self.rows.insert((record.user_id, record.gym_id), record);
        self
    }

    /// Load a JSON array of membership rows.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("reading memberships from {}", path.display()))?;
        let records: Vec<MembershipRecord> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing memberships from {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn get_membership(&self, user: UserId, gym: GymId) -> Result<Option<MembershipRecord>> {
        Ok(self.rows.get(&(user, gym)).cloned())
    }
}

/// First isolation check: is the user an active, unsuspended member of
/// the gym?
#[derive(Clone)]
pub struct MembershipGate {
    store: Arc<dyn MembershipStore>,
}

impl MembershipGate {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    pub async fn check_membership(
        &self,
        user: UserId,
        gym: GymId,
    ) -> ChatAuthResult<ActiveMembership> {
        let record = self
            .store
            .get_membership(user, gym)
            .await
            .map_err(ChatAuthError::MembershipLookup)?;

        gym_access_policy(user, gym, record.as_ref()).map_err(ChatAuthError::NoMembership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MembershipDenial;

    struct FailingStore;

    #[async_trait]
    impl MembershipStore for FailingStore {
        async fn get_membership(
            &self,
            _user: UserId,
            _gym: GymId,
        ) -> Result<Option<MembershipRecord>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    fn member(user: u64, gym: u64) -> MembershipRecord {
        MembershipRecord {
            user_id: UserId(user),
            gym_id: GymId(gym),
            role: GymRole::Member,
            active: true,
            suspended: false,
        }
    }

    #[tokio::test]
    async fn active_member_passes_only_in_their_gym() {
        let gate = MembershipGate::new(Arc::new(
            InMemoryMembershipStore::new().with(member(456, 123)),
        ));

        let ok = gate.check_membership(UserId(456), GymId(123)).await.unwrap();
        assert_eq!(ok.gym_id(), GymId(123));

        let err = gate.check_membership(UserId(456), GymId(456)).await.unwrap_err();
        assert!(matches!(
            err,
            ChatAuthError::NoMembership(MembershipDenial::NotFound)
        ));
    }

    #[tokio::test]
    async fn suspended_member_is_refused() {
        let mut row = member(9, 1);
        row.suspended = true;
        let gate = MembershipGate::new(Arc::new(InMemoryMembershipStore::from_records([row])));

        let err = gate.check_membership(UserId(9), GymId(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ChatAuthError::NoMembership(MembershipDenial::Suspended)
        ));
    }

    #[tokio::test]
    async fn store_failures_surface_as_lookup_errors() {
        let gate = MembershipGate::new(Arc::new(FailingStore));
        let err = gate.check_membership(UserId(1), GymId(1)).await.unwrap_err();
        assert!(matches!(err, ChatAuthError::MembershipLookup(_)));
    }

    #[test]
    fn unknown_role_strings_deserialize_as_unknown() {
        let row: MembershipRecord = serde_json::from_str(
            r#"{"user_id":1,"gym_id":2,"role":"janitor","active":true,"suspended":false}"#,
        )
        .unwrap();
        assert_eq!(row.role, GymRole::Unknown);
    }

    #[test]
    fn json_file_loads_rows() {
        let path = std::env::temp_dir().join(format!(
            "gymchat-memberships-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{"user_id":10,"gym_id":5,"role":"trainer","active":true,"suspended":false}]"#,
        )
        .unwrap();

        let store = InMemoryMembershipStore::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(store.len(), 1);
    }
}
