//! The gym isolation rule.
//!
//! Credential issuance and the runtime authorization callback both decide
//! "may this user act inside this gym?" with [`gym_access_policy`]. There
//! is no second copy of the rule.

use gymchat_core::{GymId, UserId};

use crate::error::MembershipDenial;
use crate::membership::{ActiveMembership, MembershipRecord};

/// Decide whether a persisted membership row grants access to `gym` for
/// `user`. `None` means the store had no row.
pub fn gym_access_policy(
    user: UserId,
    gym: GymId,
    record: Option<&MembershipRecord>,
) -> Result<ActiveMembership, MembershipDenial> {
    let Some(record) = record else {
        return Err(MembershipDenial::NotFound);
    };

    if record.user_id != user || record.gym_id != gym {
        return Err(MembershipDenial::Mismatched);
    }

    if !record.active {
        return Err(MembershipDenial::Inactive);
    }

    if record.suspended {
        return Err(MembershipDenial::Suspended);
    }

    Ok(ActiveMembership::new(record.user_id, record.gym_id, record.role))
}
