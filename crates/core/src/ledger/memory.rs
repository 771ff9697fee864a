//! In-memory repository.
//!
//! Used by tests and by store-less server runs. Reads clone out of the
//! state, so every read is a consistent snapshot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};
use tokio::sync::RwLock;

use super::error::LedgerError;
use super::repository::LedgerRepository;
use super::types::{NewTransaction, Transaction, TransactionKind};
use crate::admin::{Admin, PrivateChatUser};
use crate::rates::types::{CountryOverride, Group};

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<GroupId, Group>,
    overrides: BTreeMap<(GroupId, String), CountryOverride>,
    transactions: BTreeMap<TransactionId, Transaction>,
    admins: BTreeMap<UserId, Admin>,
    private_users: BTreeMap<UserId, PrivateChatUser>,
    last_id: i64,
}

/// Process-local [`LedgerRepository`].
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRepository {
    async fn find_group(&self, id: GroupId) -> Result<Option<Group>, LedgerError> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn save_group(&self, group: &Group) -> Result<(), LedgerError> {
        self.state
            .write()
            .await
            .groups
            .insert(group.id, group.clone());
        Ok(())
    }

    async fn list_group_ids(&self) -> Result<Vec<GroupId>, LedgerError> {
        Ok(self.state.read().await.groups.keys().copied().collect())
    }

    async fn find_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<Option<CountryOverride>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .overrides
            .get(&(group_id, country.to_string()))
            .cloned())
    }

    async fn list_country_overrides(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<CountryOverride>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .overrides
            .values()
            .filter(|ov| ov.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn save_country_override(&self, ov: &CountryOverride) -> Result<(), LedgerError> {
        self.state
            .write()
            .await
            .overrides
            .insert((ov.group_id, ov.country.clone()), ov.clone());
        Ok(())
    }

    async fn delete_country_override(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        Ok(state
            .overrides
            .remove(&(group_id, country.to_string()))
            .is_some())
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<Transaction, LedgerError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let stored = tx.with_id(TransactionId(state.last_id));
        state.transactions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn find_by_correlation(
        &self,
        group_id: GroupId,
        correlation_id: MessageId,
    ) -> Result<Option<Transaction>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .find(|t| t.group_id == group_id && t.correlation_id == Some(correlation_id))
            .cloned())
    }

    async fn set_correlation(
        &self,
        id: TransactionId,
        correlation_id: MessageId,
    ) -> Result<Transaction, LedgerError> {
        let mut state = self.state.write().await;
        let group_id = state
            .transactions
            .get(&id)
            .map(|t| t.group_id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        // Same guarantee as the partial unique index on (group_id, correlation_id).
        let taken = state.transactions.values().any(|t| {
            t.id != id && t.group_id == group_id && t.correlation_id == Some(correlation_id)
        });
        if taken {
            return Err(LedgerError::CorrelationConflict(correlation_id));
        }

        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        tx.correlation_id = Some(correlation_id);
        Ok(tx.clone())
    }

    async fn latest_of_kind(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
    ) -> Result<Option<Transaction>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .rev()
            .find(|t| t.group_id == group_id && t.kind == kind)
            .cloned())
    }

    async fn list_transactions(
        &self,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .transactions
            .values()
            .filter(|t| t.group_id == group_id && t.created_at >= from && t.created_at < to)
            .cloned()
            .collect())
    }

    async fn delete_transactions(&self, ids: &[TransactionId]) -> Result<u64, LedgerError> {
        let mut state = self.state.write().await;
        let removed = ids
            .iter()
            .filter(|id| state.transactions.remove(id).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, LedgerError> {
        Ok(self.state.read().await.admins.values().cloned().collect())
    }

    async fn save_admin(&self, admin: &Admin) -> Result<(), LedgerError> {
        self.state
            .write()
            .await
            .admins
            .insert(admin.user_id, admin.clone());
        Ok(())
    }

    async fn delete_admin(&self, user_id: UserId) -> Result<bool, LedgerError> {
        Ok(self.state.write().await.admins.remove(&user_id).is_some())
    }

    async fn save_private_user(&self, user: &PrivateChatUser) -> Result<(), LedgerError> {
        self.state
            .write()
            .await
            .private_users
            .insert(user.user_id, user.clone());
        Ok(())
    }

    async fn list_private_users(&self) -> Result<Vec<PrivateChatUser>, LedgerError> {
        Ok(self
            .state
            .read()
            .await
            .private_users
            .values()
            .cloned()
            .collect())
    }
}
