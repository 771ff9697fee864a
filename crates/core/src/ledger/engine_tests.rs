//! Scenario tests for the ledger engine.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::ZeroRatePolicy;
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};

use super::engine::{LedgerEngine, LedgerSettings, MAX_AMOUNT};
use super::error::LedgerError;
use super::memory::MemoryRepository;
use super::types::{Direction, Operator, TransactionKind};
use crate::conversion::settlement_matches;
use crate::rates::RatePatch;

const GROUP: GroupId = GroupId(-1_001);
const OWNER: UserId = UserId(1);

fn settings(policy: ZeroRatePolicy) -> LedgerSettings {
    LedgerSettings {
        owner_id: Some(OWNER),
        zero_rate_policy: policy,
        timezone: chrono_tz::Asia::Shanghai,
    }
}

fn owner() -> Operator {
    Operator::new(OWNER, "owner")
}

async fn configured_engine() -> LedgerEngine {
    let engine = LedgerEngine::new(
        Arc::new(MemoryRepository::new()),
        settings(ZeroRatePolicy::Reject),
    );
    engine
        .rates()
        .set_rate(
            GROUP,
            Direction::In,
            RatePatch {
                fee_rate: Some(dec!(10)),
                exchange_rate: Some(dec!(153)),
            },
        )
        .await
        .unwrap();
    engine
        .rates()
        .set_rate(
            GROUP,
            Direction::Out,
            RatePatch {
                fee_rate: Some(dec!(2)),
                exchange_rate: Some(dec!(137)),
            },
        )
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_deposit_then_rollback_scenario() {
    let engine = configured_engine().await;
    let start = engine.day_start(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap());
    let end = start + Duration::days(1);

    let tx = engine
        .record_at(
            GROUP,
            TransactionKind::Deposit,
            dec!(1000),
            None,
            &owner(),
            start + Duration::hours(9),
        )
        .await
        .unwrap();
    assert_eq!(tx.settlement, dec!(5.88));
    assert_eq!(tx.rate, dec!(10));
    assert_eq!(tx.fx, dec!(153));
    assert_eq!(tx.country, "通用");
    assert_eq!(tx.timestamp, "09:00");
    assert!(settlement_matches(&tx));

    engine
        .attach_correlation(tx.id, MessageId(9001))
        .await
        .unwrap();
    let stats = engine.query(GROUP, start, end, None).await.unwrap().statistics;
    assert_eq!(stats.pending_to_disburse, dec!(5.88));

    engine
        .rollback(GROUP, MessageId(9001), &owner())
        .await
        .unwrap();
    let stats = engine.query(GROUP, start, end, None).await.unwrap().statistics;
    assert_eq!(stats.pending_to_disburse, dec!(0.00));
    assert_eq!(stats.deposits.count, 0);
}

#[tokio::test]
async fn test_clear_range_half_open() {
    let engine = configured_engine().await;
    let day = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
    let start = engine.day_start(day);

    for hour in [9, 10, 14] {
        engine
            .record_at(
                GROUP,
                TransactionKind::Deposit,
                dec!(1000),
                None,
                &owner(),
                start + Duration::hours(hour),
            )
            .await
            .unwrap();
    }

    let summary = engine
        .clear_range(GROUP, start, start + Duration::hours(12), &owner())
        .await
        .unwrap();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.total_settlement, dec!(11.76));
    assert_eq!(summary.deposits.count, 2);

    let left = engine
        .query(GROUP, start, start + Duration::days(1), None)
        .await
        .unwrap();
    assert_eq!(left.records.len(), 1);
    assert_eq!(left.records[0].timestamp, "14:00");
    assert_eq!(left.statistics.deposits.settlement, dec!(5.88));
    assert_eq!(left.statistics.pending_to_disburse, dec!(5.88));
}

#[tokio::test]
async fn test_clear_range_requires_admin() {
    let engine = configured_engine().await;
    let now = Utc::now();
    let err = engine
        .clear_range(
            GROUP,
            now - Duration::hours(1),
            now,
            &Operator::new(UserId(55), "nobody"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Permission(_)));
}

#[tokio::test]
async fn test_unconfigured_rates_by_policy() {
    let strict = LedgerEngine::new(
        Arc::new(MemoryRepository::new()),
        settings(ZeroRatePolicy::Reject),
    );
    let err = strict
        .record(GROUP, TransactionKind::Deposit, dec!(100), None, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnconfiguredRate { .. }));

    // Warn lets the zero pair through to conversion, which refuses a zero fx.
    let lenient = LedgerEngine::new(
        Arc::new(MemoryRepository::new()),
        settings(ZeroRatePolicy::Warn),
    );
    let err = lenient
        .record(GROUP, TransactionKind::Deposit, dec!(100), None, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Configuration(_)));

    // Disbursements need no rate at all.
    let tx = strict
        .record(GROUP, TransactionKind::Disbursement, dec!(35.04), None, &owner())
        .await
        .unwrap();
    assert_eq!(tx.settlement, dec!(35.04));
    assert_eq!(tx.rate, Decimal::ZERO);
    assert_eq!(tx.fx, Decimal::ZERO);
}

#[tokio::test]
async fn test_rate_change_does_not_touch_recorded_transactions() {
    let engine = configured_engine().await;
    let before = engine
        .record(GROUP, TransactionKind::Withdrawal, dec!(10000), None, &owner())
        .await
        .unwrap();
    assert_eq!(before.settlement, dec!(74.45));

    engine
        .rates()
        .set_rate(GROUP, Direction::Out, RatePatch::fx(dec!(100)))
        .await
        .unwrap();
    let after = engine
        .record(GROUP, TransactionKind::Withdrawal, dec!(10000), None, &owner())
        .await
        .unwrap();
    assert_eq!(after.settlement, dec!(102.00));

    let now = Utc::now();
    let records = engine
        .query(GROUP, now - Duration::days(1), now + Duration::days(1), None)
        .await
        .unwrap()
        .records;
    let old = records.iter().find(|t| t.id == before.id).unwrap();
    assert_eq!(old.fx, dec!(137));
    assert!(records.iter().all(settlement_matches));
}

#[tokio::test]
async fn test_invalid_inputs_are_validation_errors() {
    let engine = configured_engine().await;
    for amount in [dec!(0), dec!(-5)] {
        let err = engine
            .record(GROUP, TransactionKind::Deposit, amount, None, &owner())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
    let err = engine
        .record(GROUP, TransactionKind::Disbursement, dec!(-35.04), None, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = engine
        .record(
            GROUP,
            TransactionKind::Deposit,
            dec!(1),
            Some("日 本"),
            &owner(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_oversized_amounts_are_refused() {
    let engine = configured_engine().await;
    let err = engine
        .record(
            GROUP,
            TransactionKind::Disbursement,
            Decimal::from(MAX_AMOUNT) + dec!(0.01),
            None,
            &owner(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    // A tiny exchange rate must not smuggle in a huge settlement.
    engine
        .rates()
        .set_rate(GROUP, Direction::Out, RatePatch::fx(dec!(0.0000001)))
        .await
        .unwrap();
    let err = engine
        .record(GROUP, TransactionKind::Withdrawal, dec!(1000000000), None, &owner())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_largest_amounts_still_aggregate() {
    let engine = configured_engine().await;
    let at = engine.day_start(NaiveDate::from_ymd_opt(2026, 5, 20).unwrap());
    for _ in 0..2 {
        engine
            .record_at(
                GROUP,
                TransactionKind::Disbursement,
                Decimal::from(MAX_AMOUNT),
                None,
                &owner(),
                at,
            )
            .await
            .unwrap();
    }

    let stats = engine
        .query(GROUP, at, at + Duration::days(1), None)
        .await
        .unwrap()
        .statistics;
    assert_eq!(stats.disbursements.count, 2);
    assert_eq!(
        stats.pending_to_disburse,
        -Decimal::from(MAX_AMOUNT) * dec!(2)
    );
}

#[tokio::test]
async fn test_attach_correlation_conflicts() {
    let engine = configured_engine().await;
    let a = engine
        .record(GROUP, TransactionKind::Deposit, dec!(100), None, &owner())
        .await
        .unwrap();
    let b = engine
        .record(GROUP, TransactionKind::Deposit, dec!(100), None, &owner())
        .await
        .unwrap();

    engine.attach_correlation(a.id, MessageId(1)).await.unwrap();
    // Re-attaching the same id is a no-op.
    engine.attach_correlation(a.id, MessageId(1)).await.unwrap();

    assert!(matches!(
        engine.attach_correlation(b.id, MessageId(1)).await,
        Err(LedgerError::CorrelationConflict(MessageId(1)))
    ));
    assert!(matches!(
        engine.attach_correlation(a.id, MessageId(2)).await,
        Err(LedgerError::CorrelationConflict(MessageId(1)))
    ));
    assert!(matches!(
        engine
            .attach_correlation(TransactionId(999), MessageId(3))
            .await,
        Err(LedgerError::TransactionNotFound(_))
    ));
}

#[tokio::test]
async fn test_purge_before_spans_groups() {
    let engine = configured_engine().await;
    let other = GroupId(-2_002);
    engine
        .rates()
        .set_rate(
            other,
            Direction::In,
            RatePatch {
                fee_rate: Some(dec!(0)),
                exchange_rate: Some(dec!(7)),
            },
        )
        .await
        .unwrap();

    let now = Utc::now();
    let old = now - Duration::days(40);
    for group in [GROUP, other] {
        engine
            .record_at(group, TransactionKind::Deposit, dec!(700), None, &owner(), old)
            .await
            .unwrap();
        engine
            .record_at(group, TransactionKind::Deposit, dec!(700), None, &owner(), now)
            .await
            .unwrap();
    }

    let summary = engine
        .purge_before(now - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(summary.count, 2);

    for group in [GROUP, other] {
        let left = engine
            .query(group, old - Duration::days(1), now + Duration::days(1), None)
            .await
            .unwrap();
        assert_eq!(left.records.len(), 1);
    }
}

#[tokio::test]
async fn test_concurrent_records_in_one_group() {
    let engine = Arc::new(configured_engine().await);
    let mut handles = Vec::new();
    for i in 0..32i64 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .record(
                    GROUP,
                    TransactionKind::Deposit,
                    dec!(1000),
                    None,
                    &Operator::new(UserId(i), format!("op{i}")),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let now = Utc::now();
    let result = engine
        .query(GROUP, now - Duration::days(1), now + Duration::days(1), None)
        .await
        .unwrap();
    assert_eq!(result.records.len(), 32);
    assert_eq!(result.statistics.deposits.settlement, dec!(5.88) * dec!(32));
    assert_eq!(result.statistics.by_operator.len(), 32);
}
