//! Read-only views over a group's ledger.
//!
//! A query takes one snapshot from the repository and computes statistics over
//! exactly the records it returns, so the two always agree.

pub mod statistics;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_shared::types::GroupId;

use crate::ledger::engine::LedgerEngine;
use crate::ledger::error::LedgerError;
use crate::ledger::types::Transaction;

pub use statistics::{KindTotals, LedgerStatistics, OperatorStatistics};

/// Records plus the statistics computed over them.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Newest first; ties by ascending id.
    pub records: Vec<Transaction>,
    /// Aggregates over `records`.
    pub statistics: LedgerStatistics,
}

/// Newest first by creation instant, ties broken by ascending id.
pub fn sort_newest_first(records: &mut [Transaction]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

impl LedgerEngine {
    /// Lists a group's transactions with `from <= created_at < to`,
    /// optionally restricted to one country, with statistics.
    pub async fn query(
        &self,
        group_id: GroupId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        country: Option<&str>,
    ) -> Result<QueryResult, LedgerError> {
        if from > to {
            return Err(LedgerError::validation("range start is after its end"));
        }

        let mut records = self.repo.list_transactions(group_id, from, to).await?;
        if let Some(country) = country.map(str::trim).filter(|c| !c.is_empty()) {
            records.retain(|t| t.country == country);
        }
        sort_newest_first(&mut records);

        let statistics = LedgerStatistics::compute(&records)?;
        Ok(QueryResult {
            records,
            statistics,
        })
    }

    /// Today's records in the business timezone.
    pub async fn query_today(&self, group_id: GroupId) -> Result<QueryResult, LedgerError> {
        let today = self.today();
        let (from, to) = self.day_range(today, today);
        self.query(group_id, from, to, None).await
    }
}
