//! Persistence seam for the ledger.
//!
//! This trait is implemented by the db crate (PostgreSQL) and by
//! [`MemoryRepository`](super::memory::MemoryRepository). Implementations do
//! no business validation; callers hold the group lock around
//! read-modify-write sequences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};

use super::error::LedgerError;
use super::types::{NewTransaction, Transaction, TransactionKind};
use crate::admin::{Admin, PrivateChatUser};
use crate::rates::types::{CountryOverride, Group};

/// Repository trait for groups, rates, transactions, and admins.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    // ========== Groups & Rates ==========

    /// Find a group by chat id.
    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError>;

    /// Insert or replace a group.
    async fn save_group(&self, group: &Group) -> Result<(), LedgerError>;

    /// Ids of every known group.
    async fn list_group_ids(&self) -> Result<Vec<GroupId>, LedgerError>;

    /// Find a country override.
    async fn find_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<Option<CountryOverride>, LedgerError>;

    /// All overrides of a group, ordered by country.
    async fn list_country_overrides(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<CountryOverride>, LedgerError>;

    /// Insert or replace a country override.
    async fn save_country_override(&self, ov: &CountryOverride) -> Result<(), LedgerError>;

    /// Delete a country override. Returns false if there was none.
    async fn delete_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<bool, LedgerError>;

    // ========== Transactions ==========

    /// Append a transaction and assign its sequence id.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerError>;

    /// Find a transaction by id.
    async fn find_transaction(&self, id: TransactionId)
    -> Result<Option<Transaction>, LedgerError>;

    /// Exact correlation lookup within one group.
    async fn find_by_correlation(
        &self,
        group_id: GroupId,
        correlation_id: MessageId,
    ) -> Result<Option<Transaction>, LedgerError>;

    /// Set the correlation id of a transaction.
    async fn set_correlation(
        &self,
        id: TransactionId,
        correlation_id: MessageId,
    ) -> Result<Transaction, LedgerError>;

    /// Most recent transaction of a kind in a group (highest id).
    async fn latest_of_kind(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
    ) -> Result<Option<Transaction>, LedgerError>;

    /// Snapshot of a group's transactions with `from <= created_at < to`, any order.
    async fn list_transactions(
        &self,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// Delete transactions by id. Returns the number actually removed.
    async fn delete_transactions(&self, ids: &[TransactionId]) -> Result<u64, LedgerError>;

    // ========== Admins & Private Chats ==========

    /// All admins, owner excluded.
    async fn list_admins(&self) -> Result<Vec<Admin>, LedgerError>;

    /// Insert or replace an admin.
    async fn save_admin(&self, admin: &Admin) -> Result<(), LedgerError>;

    /// Remove an admin. Returns false if the user was not one.
    async fn delete_admin(&self, user_id: UserId) -> Result<bool, LedgerError>;

    /// Insert or refresh a private chat user.
    async fn save_private_user(&self, user: &PrivateChatUser) -> Result<(), LedgerError>;

    /// All private chat users.
    async fn list_private_users(&self) -> Result<Vec<PrivateChatUser>, LedgerError>;
}
