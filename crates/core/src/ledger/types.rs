//! Ledger domain types.
//!
//! A transaction is immutable once appended. The only later changes are the
//! correlation attach that follows the chat confirmation, and deletion.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};

/// Country label used when a command names none ("general").
pub const DEFAULT_COUNTRY: &str = "通用";

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money received from a customer (`+1000`).
    Deposit,
    /// Money paid out to a customer (`-1000`).
    Withdrawal,
    /// Settlement currency actually handed over (`下发35.04`).
    Disbursement,
}

impl TransactionKind {
    /// All kinds, in summary display order.
    pub const ALL: [Self; 3] = [Self::Deposit, Self::Withdrawal, Self::Disbursement];

    /// Stable lowercase name, as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Disbursement => "disbursement",
        }
    }

    /// Chat label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deposit => "入金",
            Self::Withdrawal => "出金",
            Self::Disbursement => "下发",
        }
    }

    /// Rate direction used to convert this kind, if any.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Deposit => Some(Direction::In),
            Self::Withdrawal => Some(Direction::Out),
            Self::Disbursement => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "disbursement" => Ok(Self::Disbursement),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Rate direction: the inbound pair applies to deposits, the outbound pair to withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Deposit side (`in_rate`, `in_fx`).
    In,
    /// Withdrawal side (`out_rate`, `out_fx`).
    Out,
}

impl Direction {
    /// Name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "deposit",
            Self::Out => "withdrawal",
        }
    }
}

/// The chat user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Chat user id.
    pub id: UserId,
    /// Display name at the time of the operation.
    pub name: String,
}

impl Operator {
    /// Creates an operator.
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned sequence id.
    pub id: TransactionId,
    /// Owning group.
    pub group_id: GroupId,
    /// Kind.
    pub kind: TransactionKind,
    /// Raw amount as typed in chat.
    pub amount: Decimal,
    /// Fee rate in percent that was applied. Zero for disbursements.
    pub rate: Decimal,
    /// Exchange rate that was applied. Zero for disbursements.
    pub fx: Decimal,
    /// Settlement amount (USDT).
    pub settlement: Decimal,
    /// Country label.
    pub country: String,
    /// `HH:MM` in the business timezone.
    pub timestamp: String,
    /// Chat message id of the confirmation message, once attached.
    pub correlation_id: Option<MessageId>,
    /// Operator user id.
    pub operator_id: UserId,
    /// Operator display name.
    pub operator_name: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// A transaction about to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Owning group.
    pub group_id: GroupId,
    /// Kind.
    pub kind: TransactionKind,
    /// Raw amount.
    pub amount: Decimal,
    /// Fee rate in percent.
    pub rate: Decimal,
    /// Exchange rate.
    pub fx: Decimal,
    /// Settlement amount.
    pub settlement: Decimal,
    /// Country label.
    pub country: String,
    /// `HH:MM` in the business timezone.
    pub timestamp: String,
    /// Operator user id.
    pub operator_id: UserId,
    /// Operator display name.
    pub operator_name: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Materializes the transaction with a store-assigned id.
    #[must_use]
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            group_id: self.group_id,
            kind: self.kind,
            amount: self.amount,
            rate: self.rate,
            fx: self.fx,
            settlement: self.settlement,
            country: self.country,
            timestamp: self.timestamp,
            correlation_id: None,
            operator_id: self.operator_id,
            operator_name: self.operator_name,
            created_at: self.created_at,
        }
    }
}

/// Count and settlement total of one kind of deleted transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTally {
    /// Number of transactions.
    pub count: u64,
    /// Settlement total.
    pub settlement: Decimal,
}

/// Result of a bulk deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    /// Number of deleted transactions.
    pub count: u64,
    /// Sum of the deleted settlements, regardless of kind.
    pub total_settlement: Decimal,
    /// Deleted deposits.
    pub deposits: KindTally,
    /// Deleted withdrawals.
    pub withdrawals: KindTally,
    /// Deleted disbursements.
    pub disbursements: KindTally,
}

impl ClearSummary {
    /// Folds one deleted transaction into the summary.
    ///
    /// Sums saturate: the records are already gone when this runs.
    pub fn add(&mut self, tx: &Transaction) {
        self.count += 1;
        self.total_settlement = self.total_settlement.saturating_add(tx.settlement);
        let tally = match tx.kind {
            TransactionKind::Deposit => &mut self.deposits,
            TransactionKind::Withdrawal => &mut self.withdrawals,
            TransactionKind::Disbursement => &mut self.disbursements,
        };
        tally.count += 1;
        tally.settlement = tally.settlement.saturating_add(tx.settlement);
    }

    /// Adds another summary into this one.
    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.total_settlement = self.total_settlement.saturating_add(other.total_settlement);
        for (mine, theirs) in [
            (&mut self.deposits, &other.deposits),
            (&mut self.withdrawals, &other.withdrawals),
            (&mut self.disbursements, &other.disbursements),
        ] {
            mine.count += theirs.count;
            mine.settlement = mine.settlement.saturating_add(theirs.settlement);
        }
    }
}
