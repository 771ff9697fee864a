//! Property-based tests for settlement conversion.
//!
//! - Deposits never settle above the exact quotient
//! - Withdrawals stay within half a cent of the exact quotient
//! - Every result carries at most two decimal places

use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::conversion::convert;
use crate::ledger::types::TransactionKind;

/// Strategy to generate raw amounts (0.01 to 10,000,000.00).
fn raw_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate fee percentages (0.0 to 30.0).
fn fee_percent() -> impl Strategy<Value = Decimal> {
    (0i64..=300i64).prop_map(|v| Decimal::new(v, 1))
}

/// Strategy to generate exchange rates (0.01 to 1000.00).
fn exchange_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|v| Decimal::new(v, 2))
}

fn exact(amount: Decimal, fee: Decimal, fx: Decimal, kind: TransactionKind) -> Decimal {
    let factor = match kind {
        TransactionKind::Deposit => Decimal::ONE_HUNDRED - fee,
        _ => Decimal::ONE_HUNDRED + fee,
    };
    amount * factor / (fx * Decimal::ONE_HUNDRED)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_deposit_never_rounds_up(
        amount in raw_amount(),
        fee in fee_percent(),
        fx in exchange_rate(),
    ) {
        let settled = convert(amount, fee, fx, TransactionKind::Deposit).unwrap();
        let exact = exact(amount, fee, fx, TransactionKind::Deposit);

        prop_assert!(settled <= exact);
        prop_assert!(exact - settled < Decimal::new(1, 2));
        prop_assert!(settled.scale() <= 2);
    }

    #[test]
    fn prop_withdrawal_within_half_cent(
        amount in raw_amount(),
        fee in fee_percent(),
        fx in exchange_rate(),
    ) {
        let settled = convert(amount, fee, fx, TransactionKind::Withdrawal).unwrap();
        let exact = exact(amount, fee, fx, TransactionKind::Withdrawal);

        prop_assert!((settled - exact).abs() <= Decimal::new(5, 3));
        prop_assert!(settled.scale() <= 2);
    }

    #[test]
    fn prop_disbursement_is_identity_on_cents(amount in raw_amount()) {
        let settled = convert(amount, Decimal::ZERO, Decimal::ZERO, TransactionKind::Disbursement).unwrap();
        prop_assert_eq!(settled, amount);
    }
}
