//! Undo and rollback of single transactions.
//!
//! Lookup is exact: a correlation id either names one transaction in the
//! group or nothing. A rolled-back record is gone, so a second rollback of
//! the same id fails with not-found; callers treat that as terminal.

use tally_shared::types::{GroupId, MessageId};

use super::engine::{DeletionCause, LedgerEngine};
use super::error::LedgerError;
use super::types::{Operator, Transaction, TransactionKind};

impl LedgerEngine {
    /// Removes the transaction whose correlation id is `correlation_id`.
    ///
    /// Returns the deleted record for confirmation display.
    ///
    /// # Errors
    ///
    /// - `Permission` if `operator` is neither an admin nor the owner, checked
    ///   before the lookup so unauthorized callers learn nothing about ids
    /// - `CorrelationNotFound` if no transaction in the group carries the id
    pub async fn rollback(
        &self,
        group_id: GroupId,
        correlation_id: MessageId,
        operator: &Operator,
    ) -> Result<Transaction, LedgerError> {
        self.admins().require_authorized(operator).await?;
        let _guard = self.locks.acquire(group_id).await;

        let tx = self
            .repo
            .find_by_correlation(group_id, correlation_id)
            .await?
            .ok_or(LedgerError::CorrelationNotFound {
                group_id,
                correlation_id,
            })?;

        self.delete_records(group_id, vec![tx.clone()], DeletionCause::Rollback(operator))
            .await?;
        Ok(tx)
    }

    /// Removes the most recent transaction of `kind` (`撤销入金` and friends).
    ///
    /// # Errors
    ///
    /// - `Permission` if `operator` is neither an admin nor the owner
    /// - `NothingToUndo` if the group has no transaction of that kind
    pub async fn undo_latest(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
        operator: &Operator,
    ) -> Result<Transaction, LedgerError> {
        self.admins().require_authorized(operator).await?;
        let _guard = self.locks.acquire(group_id).await;

        let tx = self
            .repo
            .latest_of_kind(group_id, kind)
            .await?
            .ok_or(LedgerError::NothingToUndo(kind.label()))?;

        self.delete_records(group_id, vec![tx.clone()], DeletionCause::Rollback(operator))
            .await?;
        Ok(tx)
    }
}
