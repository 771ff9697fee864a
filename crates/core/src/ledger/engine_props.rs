//! Property-based tests for the ledger engine.
//!
//! - Aggregates always equal an independently maintained running counter,
//!   over any interleaving of records and rollbacks
//! - Every stored settlement re-derives from its stored inputs

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{GroupId, MessageId, UserId};

use super::engine::{LedgerEngine, LedgerSettings};
use super::error::LedgerError;
use super::memory::MemoryRepository;
use super::types::{Direction, Operator, TransactionKind};
use crate::conversion::settlement_matches;
use crate::rates::RatePatch;

const GROUP: GroupId = GroupId(-5);

#[derive(Debug, Clone)]
enum Op {
    Record(TransactionKind, Decimal),
    Rollback(usize),
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![
        Just(TransactionKind::Deposit),
        Just(TransactionKind::Withdrawal),
        Just(TransactionKind::Disbursement),
    ]
}

/// Strategy to generate positive raw amounts (0.01 to 100,000.00).
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (kind_strategy(), amount_strategy()).prop_map(|(k, a)| Op::Record(k, a)),
        1 => (0usize..64).prop_map(Op::Rollback),
    ]
}

#[derive(Default)]
struct Model {
    deposits: Decimal,
    withdrawals: Decimal,
    disbursed: Decimal,
}

impl Model {
    fn apply(&mut self, kind: TransactionKind, settlement: Decimal, sign: Decimal) {
        match kind {
            TransactionKind::Deposit => self.deposits += sign * settlement,
            TransactionKind::Withdrawal => self.withdrawals += sign * settlement,
            TransactionKind::Disbursement => self.disbursed += sign * settlement,
        }
    }

    fn pending(&self) -> Decimal {
        self.deposits - self.withdrawals - self.disbursed
    }
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let owner = Operator::new(UserId(1), "owner");
    let engine = LedgerEngine::new(
        Arc::new(MemoryRepository::new()),
        LedgerSettings {
            owner_id: Some(owner.id),
            ..LedgerSettings::default()
        },
    );
    for (direction, fee, fx) in [
        (Direction::In, Decimal::new(75, 1), Decimal::new(1532, 1)),
        (Direction::Out, Decimal::new(2, 0), Decimal::new(137, 0)),
    ] {
        engine
            .rates()
            .set_rate(
                GROUP,
                direction,
                RatePatch {
                    fee_rate: Some(fee),
                    exchange_rate: Some(fx),
                },
            )
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
    }

    let start = engine.day_start(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap());
    let end = start + Duration::days(1);
    let mut at = start;

    let mut model = Model::default();
    let mut live: Vec<(MessageId, TransactionKind, Decimal)> = Vec::new();
    let mut next_message = 1i64;

    for op in ops {
        match op {
            Op::Record(kind, amount) => {
                at += Duration::seconds(1);
                let tx = engine
                    .record_at(GROUP, kind, amount, None, &owner, at)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert!(settlement_matches(&tx));

                let message = MessageId(next_message);
                next_message += 1;
                engine
                    .attach_correlation(tx.id, message)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                model.apply(kind, tx.settlement, Decimal::ONE);
                live.push((message, kind, tx.settlement));
            }
            Op::Rollback(index) if live.is_empty() => {
                let missing = MessageId(1_000_000 + i64::try_from(index).unwrap_or(0));
                let result = engine.rollback(GROUP, missing, &owner).await;
                let is_not_found = matches!(result, Err(LedgerError::CorrelationNotFound { .. }));
                prop_assert!(is_not_found);
            }
            Op::Rollback(index) => {
                let (message, kind, settlement) = live.remove(index % live.len());
                let removed = engine
                    .rollback(GROUP, message, &owner)
                    .await
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(removed.settlement, settlement);
                model.apply(kind, settlement, Decimal::NEGATIVE_ONE);

                let again = engine.rollback(GROUP, message, &owner).await;
                let is_not_found = matches!(again, Err(LedgerError::CorrelationNotFound { .. }));
                prop_assert!(is_not_found);
            }
        }

        let stats = engine
            .query(GROUP, start, end, None)
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .statistics;
        prop_assert_eq!(stats.deposits.settlement, model.deposits);
        prop_assert_eq!(stats.withdrawals.settlement, model.withdrawals);
        prop_assert_eq!(stats.disbursements.settlement, model.disbursed);
        prop_assert_eq!(stats.pending_to_disburse, model.pending());
        prop_assert_eq!(
            stats.deposits.count + stats.withdrawals.count + stats.disbursements.count,
            live.len() as u64
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_aggregates_match_running_counter(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run(ops))?;
    }
}
