//! One-pass aggregate statistics over a transaction list.

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::UserId;

use crate::ledger::error::LedgerError;
use crate::ledger::types::{Transaction, TransactionKind};

fn overflow() -> LedgerError {
    LedgerError::Internal("ledger totals exceed the decimal range".to_string())
}

/// Count, raw total, and settlement total of one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    /// Number of transactions.
    pub count: u64,
    /// Sum of raw amounts.
    pub amount: Decimal,
    /// Sum of settlement amounts.
    pub settlement: Decimal,
}

impl KindTotals {
    fn add(&mut self, tx: &Transaction) -> Result<(), LedgerError> {
        self.amount = self.amount.checked_add(tx.amount).ok_or_else(overflow)?;
        self.settlement = self
            .settlement
            .checked_add(tx.settlement)
            .ok_or_else(overflow)?;
        self.count += 1;
        Ok(())
    }
}

/// Per-operator breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorStatistics {
    /// Operator user id.
    pub operator_id: UserId,
    /// Display name from the first listed transaction of this operator.
    pub operator_name: String,
    /// Deposits by this operator.
    pub deposits: KindTotals,
    /// Withdrawals by this operator.
    pub withdrawals: KindTotals,
    /// Disbursements by this operator.
    pub disbursements: KindTotals,
}

impl OperatorStatistics {
    fn totals_mut(&mut self, kind: TransactionKind) -> &mut KindTotals {
        match kind {
            TransactionKind::Deposit => &mut self.deposits,
            TransactionKind::Withdrawal => &mut self.withdrawals,
            TransactionKind::Disbursement => &mut self.disbursements,
        }
    }
}

/// Aggregate state derived from a set of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStatistics {
    /// Deposit totals.
    pub deposits: KindTotals,
    /// Withdrawal totals.
    pub withdrawals: KindTotals,
    /// Disbursement totals.
    pub disbursements: KindTotals,
    /// Deposits minus withdrawals, in settlement ("应下发").
    pub due: Decimal,
    /// Deposits minus withdrawals minus disbursements ("未下发").
    pub pending_to_disburse: Decimal,
    /// Breakdown per operator, ordered by operator id.
    pub by_operator: Vec<OperatorStatistics>,
}

impl LedgerStatistics {
    /// Computes statistics in a single pass.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a total leaves the decimal range.
    pub fn compute<'a>(
        records: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<Self, LedgerError> {
        let mut stats = Self::default();
        let mut operators: std::collections::BTreeMap<UserId, OperatorStatistics> =
            std::collections::BTreeMap::new();

        for tx in records {
            match tx.kind {
                TransactionKind::Deposit => stats.deposits.add(tx)?,
                TransactionKind::Withdrawal => stats.withdrawals.add(tx)?,
                TransactionKind::Disbursement => stats.disbursements.add(tx)?,
            }
            let entry = operators
                .entry(tx.operator_id)
                .or_insert_with(|| OperatorStatistics {
                    operator_id: tx.operator_id,
                    operator_name: tx.operator_name.clone(),
                    deposits: KindTotals::default(),
                    withdrawals: KindTotals::default(),
                    disbursements: KindTotals::default(),
                });
            entry.totals_mut(tx.kind).add(tx)?;
        }

        stats.due = stats
            .deposits
            .settlement
            .checked_sub(stats.withdrawals.settlement)
            .ok_or_else(overflow)?;
        stats.pending_to_disburse = stats
            .due
            .checked_sub(stats.disbursements.settlement)
            .ok_or_else(overflow)?;
        stats.by_operator = operators.into_values().collect();
        Ok(stats)
    }
}
