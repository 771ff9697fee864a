//! Dashboard token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupId, UserId};

/// JWT claims carried by a dashboard link.
///
/// A link is always bound to one chat group and the user who requested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (chat user ID).
    pub sub: i64,
    /// Chat group the dashboard is scoped to.
    pub grp: i64,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user in a group.
    #[must_use]
    pub fn new(user_id: UserId, group_id: GroupId, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.into_inner(),
            grp: group_id.into_inner(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId(self.sub)
    }

    /// Returns the group ID from claims.
    #[must_use]
    pub const fn group_id(&self) -> GroupId {
        GroupId(self.grp)
    }
}
