//! Ledger engine.
//!
//! The engine is the sole mutator of transactions. Aggregates are never
//! stored; they are derived from whatever transactions exist, so deleting a
//! record is the whole of "reversing" it.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tally_shared::ZeroRatePolicy;
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};
use tracing::{info, warn};

use super::error::LedgerError;
use super::lock::GroupLocks;
use super::repository::LedgerRepository;
use super::types::{
    ClearSummary, DEFAULT_COUNTRY, NewTransaction, Operator, Transaction, TransactionKind,
};
use crate::admin::AdminRegistry;
use crate::conversion::convert;
use crate::rates::RateStore;

/// Largest raw amount or settlement a single transaction may carry.
///
/// Keeps every per-group total far inside both `Decimal` and `NUMERIC(28,2)`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Engine behaviour taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Owner user id, if configured.
    pub owner_id: Option<UserId>,
    /// Handling of all-zero rate pairs.
    pub zero_rate_policy: ZeroRatePolicy,
    /// Business timezone for `HH:MM` stamps and "today".
    pub timezone: Tz,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            owner_id: None,
            zero_rate_policy: ZeroRatePolicy::Reject,
            timezone: chrono_tz::Asia::Shanghai,
        }
    }
}

/// Who caused a deletion, for the audit trail.
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeletionCause<'a> {
    /// Single-record undo or rollback.
    Rollback(&'a Operator),
    /// Bulk clear of a time range.
    Clear(&'a Operator),
    /// Retention cleanup.
    Retention,
}

impl DeletionCause<'_> {
    const fn reason(self) -> &'static str {
        match self {
            Self::Rollback(_) => "rollback",
            Self::Clear(_) => "clear_range",
            Self::Retention => "retention",
        }
    }

    fn operator(self) -> (Option<UserId>, &'static str, String) {
        match self {
            Self::Rollback(op) | Self::Clear(op) => (Some(op.id), "operator", op.name.clone()),
            Self::Retention => (None, "system", String::new()),
        }
    }
}

/// Per-group ledger engine.
#[derive(Clone)]
pub struct LedgerEngine {
    pub(crate) repo: Arc<dyn LedgerRepository>,
    pub(crate) locks: Arc<GroupLocks>,
    rates: RateStore,
    admins: AdminRegistry,
    settings: LedgerSettings,
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// Create a new engine over a repository.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>, settings: LedgerSettings) -> Self {
        let locks = Arc::new(GroupLocks::new());
        Self {
            rates: RateStore::new(Arc::clone(&repo), Arc::clone(&locks)),
            admins: AdminRegistry::new(Arc::clone(&repo), settings.owner_id),
            repo,
            locks,
            settings,
        }
    }

    /// The rate store sharing this engine's locks.
    #[must_use]
    pub const fn rates(&self) -> &RateStore {
        &self.rates
    }

    /// The admin registry.
    #[must_use]
    pub const fn admins(&self) -> &AdminRegistry {
        &self.admins
    }

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Today's date in the business timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    /// UTC instant of local midnight starting `date`.
    #[must_use]
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(chrono::NaiveTime::MIN);
        self.settings
            .timezone
            .from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
    }

    /// Half-open UTC range covering the local dates `first..=last`.
    #[must_use]
    pub fn day_range(&self, first: NaiveDate, last: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = last.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        (self.day_start(first), self.day_start(end))
    }

    /// Records a transaction now. See [`record_at`](Self::record_at).
    pub async fn record(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
        amount: Decimal,
        country: Option<&str>,
        operator: &Operator,
    ) -> Result<Transaction, LedgerError> {
        self.record_at(group_id, kind, amount, country, operator, Utc::now())
            .await
    }

    /// Resolves the rate, converts, and appends a transaction created at `at`.
    ///
    /// The correlation id is attached later with
    /// [`attach_correlation`](Self::attach_correlation), once the chat
    /// confirmation has been sent.
    pub async fn record_at(
        &self,
        group_id: GroupId,
        kind: TransactionKind,
        amount: Decimal,
        country: Option<&str>,
        operator: &Operator,
        at: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "amount must be positive, got {amount}"
            )));
        }
        if amount > Decimal::from(MAX_AMOUNT) {
            return Err(LedgerError::validation(format!(
                "amount must not exceed {MAX_AMOUNT}, got {amount}"
            )));
        }
        let country = normalize_country(country)?;
        self.rates.ensure_group(group_id, "").await?;

        let _guard = self.locks.acquire(group_id).await;

        let (rate, fx) = match kind.direction() {
            Some(direction) => {
                let require = self.settings.zero_rate_policy == ZeroRatePolicy::Reject;
                let resolved = self
                    .rates
                    .resolve(group_id, direction, &country, require)
                    .await?;
                (resolved.fee_rate, resolved.exchange_rate)
            }
            None => (Decimal::ZERO, Decimal::ZERO),
        };
        let settlement = convert(amount, rate, fx, kind)?;
        if settlement > Decimal::from(MAX_AMOUNT) {
            return Err(LedgerError::validation(format!(
                "settlement {settlement} exceeds {MAX_AMOUNT}; check the exchange rate"
            )));
        }

        let tx = self
            .repo
            .insert_transaction(NewTransaction {
                group_id,
                kind,
                amount,
                rate,
                fx,
                settlement,
                country,
                timestamp: at
                    .with_timezone(&self.settings.timezone)
                    .format("%H:%M")
                    .to_string(),
                operator_id: operator.id,
                operator_name: operator.name.clone(),
                created_at: at,
            })
            .await?;

        info!(
            group_id = %group_id,
            transaction_id = %tx.id,
            kind = %kind,
            amount = %tx.amount,
            settlement = %tx.settlement,
            country = %tx.country,
            operator_id = %operator.id,
            "transaction recorded"
        );
        Ok(tx)
    }

    /// Completes the two-phase record by attaching the confirmation message id.
    pub async fn attach_correlation(
        &self,
        transaction_id: TransactionId,
        correlation_id: MessageId,
    ) -> Result<Transaction, LedgerError> {
        let group_id = self
            .repo
            .find_transaction(transaction_id)
            .await?
            .map(|t| t.group_id)
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;

        let _guard = self.locks.acquire(group_id).await;

        // Re-read under the lock: the record may have been undone meanwhile.
        let tx = self
            .repo
            .find_transaction(transaction_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(transaction_id))?;
        match tx.correlation_id {
            Some(existing) if existing == correlation_id => return Ok(tx),
            Some(existing) => return Err(LedgerError::CorrelationConflict(existing)),
            None => {}
        }
        if let Some(existing) = self
            .repo
            .find_by_correlation(group_id, correlation_id)
            .await?
        {
            warn!(
                group_id = %group_id,
                correlation_id = %correlation_id,
                holder = %existing.id,
                "correlation id already attached"
            );
            return Err(LedgerError::CorrelationConflict(correlation_id));
        }

        let tx = self
            .repo
            .set_correlation(transaction_id, correlation_id)
            .await?;
        info!(
            group_id = %group_id,
            transaction_id = %transaction_id,
            correlation_id = %correlation_id,
            "correlation attached"
        );
        Ok(tx)
    }

    /// Deletes every transaction of the group with `from <= created_at < to`.
    ///
    /// Requires an admin or the owner.
    pub async fn clear_range(
        &self,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        operator: &Operator,
    ) -> Result<ClearSummary, LedgerError> {
        if from > to {
            return Err(LedgerError::validation("range start is after its end"));
        }
        self.admins.require_authorized(operator).await?;

        let _guard = self.locks.acquire(group_id).await;
        let records = self.repo.list_transactions(group_id, from, to).await?;
        self.delete_records(group_id, records, DeletionCause::Clear(operator))
            .await
    }

    /// Retention cleanup: deletes every transaction created before `cutoff`, in every group.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<ClearSummary, LedgerError> {
        let mut total = ClearSummary::default();
        for group_id in self.repo.list_group_ids().await? {
            let _guard = self.locks.acquire(group_id).await;
            let records = self
                .repo
                .list_transactions(group_id, DateTime::<Utc>::UNIX_EPOCH, cutoff)
                .await?;
            let summary = self
                .delete_records(group_id, records, DeletionCause::Retention)
                .await?;
            total.merge(&summary);
        }
        info!(cutoff = %cutoff, deleted = total.count, "retention cleanup finished");
        Ok(total)
    }

    /// The single deletion path shared by rollback, undo, clear, and retention.
    ///
    /// Callers hold the group lock.
    pub(crate) async fn delete_records(
        &self,
        group_id: GroupId,
        records: Vec<Transaction>,
        cause: DeletionCause<'_>,
    ) -> Result<ClearSummary, LedgerError> {
        let mut summary = ClearSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }

        let ids: Vec<TransactionId> = records.iter().map(|t| t.id).collect();
        let removed = self.repo.delete_transactions(&ids).await?;
        if removed != ids.len() as u64 {
            warn!(
                group_id = %group_id,
                expected = ids.len(),
                removed,
                "some transactions were already gone"
            );
        }

        let (operator_id, actor, operator_name) = cause.operator();
        let deleted_at = Utc::now();
        for tx in &records {
            summary.add(tx);
            info!(
                target: "audit",
                reason = cause.reason(),
                actor,
                operator_id = ?operator_id.map(UserId::into_inner),
                operator_name = %operator_name,
                group_id = %group_id,
                transaction_id = %tx.id,
                correlation_id = ?tx.correlation_id.map(MessageId::into_inner),
                kind = %tx.kind,
                amount = %tx.amount,
                settlement = %tx.settlement,
                created_at = %tx.created_at,
                deleted_at = %deleted_at,
                "transaction deleted"
            );
        }
        Ok(summary)
    }
}

fn normalize_country(country: Option<&str>) -> Result<String, LedgerError> {
    match country.map(str::trim) {
        None | Some("") => Ok(DEFAULT_COUNTRY.to_string()),
        Some(label) if label.chars().any(char::is_whitespace) || label.chars().count() > 32 => {
            Err(LedgerError::validation(format!("malformed country label: {label:?}")))
        }
        Some(label) => Ok(label.to_string()),
    }
}
