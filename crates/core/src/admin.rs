//! Admins, the owner, and private chat users.
//!
//! The owner is injected once at start-up and is never stored, removed, or
//! delegated. Admins are a process-wide set shared by every group.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;
use tracing::info;

use crate::ledger::error::LedgerError;
use crate::ledger::repository::LedgerRepository;
use crate::ledger::types::Operator;

/// An admin (or the owner, when listed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    /// Chat user id.
    pub user_id: UserId,
    /// `@handle`, if the user has one.
    pub username: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// True only for the configured owner.
    pub is_owner: bool,
    /// When the admin was added.
    pub created_at: DateTime<Utc>,
}

/// A user who has talked to the bot in private; broadcast recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateChatUser {
    /// Chat user id.
    pub user_id: UserId,
    /// `@handle`, if any.
    pub username: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Last private message.
    pub last_message_at: DateTime<Utc>,
}

/// A user being promoted, as seen on the replied-to message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Chat user id.
    pub id: UserId,
    /// `@handle`, if any.
    pub username: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// Permission checks and admin set maintenance.
#[derive(Clone)]
pub struct AdminRegistry {
    repo: Arc<dyn LedgerRepository>,
    owner_id: Option<UserId>,
}

impl std::fmt::Debug for AdminRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminRegistry")
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

impl AdminRegistry {
    /// Creates a registry with an optional owner.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>, owner_id: Option<UserId>) -> Self {
        Self { repo, owner_id }
    }

    /// The configured owner.
    #[must_use]
    pub const fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    /// True if `user_id` is the owner.
    #[must_use]
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }

    /// True if `user_id` is the owner or an admin.
    pub async fn is_authorized(&self, user_id: UserId) -> Result<bool, LedgerError> {
        if self.is_owner(user_id) {
            return Ok(true);
        }
        let admins = self.repo.list_admins().await?;
        Ok(admins.iter().any(|a| a.user_id == user_id))
    }

    /// Fails with `Permission` unless `operator` is the owner or an admin.
    pub async fn require_authorized(&self, operator: &Operator) -> Result<(), LedgerError> {
        if self.is_authorized(operator.id).await? {
            Ok(())
        } else {
            Err(LedgerError::Permission(operator.id))
        }
    }

    /// Fails with `OwnerOnly` unless `operator` is the owner.
    pub fn require_owner(&self, operator: &Operator) -> Result<(), LedgerError> {
        if self.is_owner(operator.id) {
            Ok(())
        } else {
            Err(LedgerError::OwnerOnly)
        }
    }

    /// Adds an admin. The requester must already be authorized.
    ///
    /// Returns false if the user was already an admin (or is the owner).
    pub async fn add_admin(
        &self,
        requester: &Operator,
        user: ChatUser,
    ) -> Result<bool, LedgerError> {
        self.require_authorized(requester).await?;
        if self.is_authorized(user.id).await? {
            return Ok(false);
        }

        let admin = Admin {
            user_id: user.id,
            username: user.username,
            display_name: user.display_name,
            is_owner: false,
            created_at: Utc::now(),
        };
        self.repo.save_admin(&admin).await?;
        info!(
            target: "audit",
            operator_id = %requester.id,
            admin_id = %admin.user_id,
            "admin added"
        );
        Ok(true)
    }

    /// Removes an admin. The owner can never be removed.
    pub async fn remove_admin(
        &self,
        requester: &Operator,
        user_id: UserId,
    ) -> Result<(), LedgerError> {
        self.require_authorized(requester).await?;
        if self.is_owner(user_id) {
            return Err(LedgerError::OwnerImmutable);
        }
        if !self.repo.delete_admin(user_id).await? {
            return Err(LedgerError::AdminNotFound(user_id));
        }
        info!(
            target: "audit",
            operator_id = %requester.id,
            admin_id = %user_id,
            "admin removed"
        );
        Ok(())
    }

    /// The owner (if configured) followed by every admin.
    pub async fn list(&self) -> Result<Vec<Admin>, LedgerError> {
        let mut admins = Vec::new();
        if let Some(owner) = self.owner_id {
            admins.push(Admin {
                user_id: owner,
                username: None,
                display_name: None,
                is_owner: true,
                created_at: DateTime::<Utc>::UNIX_EPOCH,
            });
        }
        admins.extend(
            self.repo
                .list_admins()
                .await?
                .into_iter()
                .filter(|a| Some(a.user_id) != self.owner_id),
        );
        Ok(admins)
    }

    /// Remembers a user who messaged the bot privately.
    pub async fn touch_private_user(&self, user: ChatUser) -> Result<(), LedgerError> {
        let record = PrivateChatUser {
            user_id: user.id,
            username: user.username,
            display_name: user.display_name,
            last_message_at: Utc::now(),
        };
        self.repo.save_private_user(&record).await
    }

    /// Broadcast recipients, excluding `sender`.
    pub async fn broadcast_recipients(&self, sender: UserId) -> Result<Vec<UserId>, LedgerError> {
        Ok(self
            .repo
            .list_private_users()
            .await?
            .into_iter()
            .map(|u| u.user_id)
            .filter(|id| *id != sender)
            .collect())
    }
}
