//! Canonical channel identifiers.
//!
//! Every channel id starts with its gym: `gym_{gym}_general`,
//! `gym_{gym}_event_{event}`, `gym_{gym}_direct_{low}_{high}`. The gym can
//! therefore be read off any well-formed id without a lookup, and `parse`
//! refuses every other shape.

use std::fmt;
use std::str::FromStr;

use gymchat_core::{GymId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{ChatAuthError, ChatAuthResult};
use crate::identity::parse_canonical_u64;

const GYM_PREFIX: &str = "gym_";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    General,
    Event { event_id: u64 },
    /// Participants are always stored with `low <= high`.
    Direct { low: UserId, high: UserId },
}

impl ChannelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelKind::General => "general",
            ChannelKind::Event { .. } => "event",
            ChannelKind::Direct { .. } => "direct",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId {
    gym: GymId,
    kind: ChannelKind,
}

impl ChannelId {
    /// Build a channel id. Direct participants are sorted, so the id does
    /// not depend on who opened the conversation.
    pub fn build(gym: GymId, kind: ChannelKind) -> Self {
        let kind = match kind {
            ChannelKind::Direct { low, high } if low > high => ChannelKind::Direct {
                low: high,
                high: low,
            },
            other => other,
        };
        Self { gym, kind }
    }

    pub fn general(gym: GymId) -> Self {
        Self::build(gym, ChannelKind::General)
    }

    pub fn event(gym: GymId, event_id: u64) -> Self {
        Self::build(gym, ChannelKind::Event { event_id })
    }

    pub fn direct(gym: GymId, a: UserId, b: UserId) -> Self {
        Self::build(gym, ChannelKind::Direct { low: a, high: b })
    }

    /// Parse a channel id. Anything that `build` cannot produce is an error,
    /// including non-canonical numbers and unsorted direct participants.
    pub fn parse(raw: &str) -> ChatAuthResult<Self> {
        let bad = || ChatAuthError::ChannelParse(raw.to_string());

        let rest = raw.strip_prefix(GYM_PREFIX).ok_or_else(bad)?;
        let segments: Vec<&str> = rest.split('_').collect();

        let (gym, kind) = match segments.as_slice() {
            [gym, "general"] => (*gym, ChannelKind::General),
            [gym, "event", event] => {
                let event_id = parse_canonical_u64(event).ok_or_else(bad)?;
                (*gym, ChannelKind::Event { event_id })
            }
            [gym, "direct", a, b] => {
                let low = parse_canonical_u64(a).ok_or_else(bad)?;
                let high = parse_canonical_u64(b).ok_or_else(bad)?;
                if low > high {
                    return Err(bad());
                }
                (
                    *gym,
                    ChannelKind::Direct {
                        low: UserId(low),
                        high: UserId(high),
                    },
                )
            }
            _ => return Err(bad()),
        };

        let gym = parse_canonical_u64(gym).ok_or_else(bad)?;
        Ok(Self {
            gym: GymId(gym),
            kind,
        })
    }

    pub fn gym(&self) -> GymId {
        self.gym
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// `"{low}_{high}"` for direct channels, the event id for event
    /// channels, nothing for the general channel.
    pub fn discriminator(&self) -> Option<String> {
        match self.kind {
            ChannelKind::General => None,
            ChannelKind::Event { event_id } => Some(event_id.to_string()),
            ChannelKind::Direct { low, high } => Some(format!("{low}_{high}")),
        }
    }

    pub fn participants(&self) -> Option<(UserId, UserId)> {
        match self.kind {
            ChannelKind::Direct { low, high } => Some((low, high)),
            _ => None,
        }
    }

    /// Whether the channel shape lets `user` in at all. Only direct
    /// channels restrict this further than gym membership.
    pub fn admits(&self, user: UserId) -> bool {
        match self.kind {
            ChannelKind::Direct { low, high } => user == low || user == high,
            _ => true,
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{GYM_PREFIX}{}_{}", self.gym, self.kind.name())?;
        if let Some(disc) = self.discriminator() {
            write!(f, "_{disc}")?;
        }
        Ok(())
    }
}

impl FromStr for ChannelId {
    type Err = ChatAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ChatAuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChannelId> for String {
    fn from(id: ChannelId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn renders_the_three_shapes() {
        assert_eq!(ChannelId::general(GymId(123)).to_string(), "gym_123_general");
        assert_eq!(
            ChannelId::event(GymId(456), 999).to_string(),
            "gym_456_event_999"
        );
        assert_eq!(
            ChannelId::direct(GymId(5), UserId(20), UserId(10)).to_string(),
            "gym_5_direct_10_20"
        );
    }

    #[test]
    fn both_participants_compute_the_same_direct_channel() {
        let from_ten = ChannelId::direct(GymId(5), UserId(10), UserId(20));
        let from_twenty = ChannelId::direct(GymId(5), UserId(20), UserId(10));
        assert_eq!(from_ten.to_string(), "gym_5_direct_10_20");
        assert_eq!(from_ten, from_twenty);
    }

    #[test]
    fn self_direct_channel_is_allowed() {
        let id = ChannelId::direct(GymId(1), UserId(7), UserId(7));
        assert_eq!(id.to_string(), "gym_1_direct_7_7");
        assert_eq!(ChannelId::parse("gym_1_direct_7_7").unwrap(), id);
    }

    #[test]
    fn parse_extracts_the_gym_without_lookup() {
        let id = ChannelId::parse("gym_456_event_999").unwrap();
        assert_eq!(id.gym(), GymId(456));
        assert_eq!(id.kind(), ChannelKind::Event { event_id: 999 });
        assert_eq!(id.discriminator().as_deref(), Some("999"));
    }

    #[test]
    fn parse_fails_closed_on_unknown_shapes() {
        for raw in [
            "",
            "gym_",
            "gym_123",
            "gym_123_",
            "gym__general",
            "gym_abc_general",
            "gym_+5_general",
            "gym_05_general",
            "gym_123_general_1",
            "gym_123_event",
            "gym_123_event_",
            "gym_123_event_x1",
            "gym_123_event_1_2",
            "gym_123_direct_10",
            "gym_123_direct_20_10",
            "gym_123_direct_10_20_30",
            "gym_123_private_1",
            "team_123_general",
            "GYM_123_general",
            "messaging:gym_123_general",
            "gym_123_general ",
        ] {
            assert!(
                matches!(ChannelId::parse(raw), Err(ChatAuthError::ChannelParse(_))),
                "accepted `{raw}`"
            );
        }
    }

    #[test]
    fn direct_channels_only_admit_participants() {
        let id = ChannelId::direct(GymId(5), UserId(10), UserId(20));
        assert!(id.admits(UserId(10)));
        assert!(id.admits(UserId(20)));
        assert!(!id.admits(UserId(30)));
        assert!(ChannelId::general(GymId(5)).admits(UserId(30)));
    }

    #[test]
    fn serde_uses_the_canonical_string() {
        let id = ChannelId::direct(GymId(5), UserId(20), UserId(10));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"gym_5_direct_10_20\"");

        let bad: Result<ChannelId, _> = serde_json::from_str("\"gym_5_direct_20_10\"");
        assert!(bad.is_err());
    }

    fn any_kind() -> impl Strategy<Value = ChannelKind> {
        prop_oneof![
            Just(ChannelKind::General),
            any::<u64>().prop_map(|event_id| ChannelKind::Event { event_id }),
            (any::<u64>(), any::<u64>()).prop_map(|(a, b)| ChannelKind::Direct {
                low: UserId(a),
                high: UserId(b),
            }),
        ]
    }

    proptest! {
        #[test]
        fn direct_ids_are_symmetric(gym in any::<u64>(), a in any::<u64>(), b in any::<u64>()) {
            prop_assert_eq!(
                ChannelId::direct(GymId(gym), UserId(a), UserId(b)).to_string(),
                ChannelId::direct(GymId(gym), UserId(b), UserId(a)).to_string()
            );
        }

        #[test]
        fn parse_is_a_left_inverse_of_build(gym in any::<u64>(), kind in any_kind()) {
            let built = ChannelId::build(GymId(gym), kind);
            let parsed = ChannelId::parse(&built.to_string()).unwrap();
            prop_assert_eq!(parsed.gym(), GymId(gym));
            prop_assert_eq!(parsed, built);
        }

        #[test]
        fn parsed_strings_render_back_identically(
            raw in "gym_[0-9]{1,4}_(general|event_[0-9]{1,4}|direct_[0-9]{1,3}_[0-9]{1,3})"
        ) {
            if let Ok(id) = ChannelId::parse(&raw) {
                prop_assert_eq!(id.to_string(), raw);
            }
        }
    }
}
