//! Settlement conversion.
//!
//! CRITICAL: Rounding strategy differs per direction:
//! - Deposits truncate toward zero at 2 decimal places (never credit more than received)
//! - Withdrawals round half away from zero at 2 decimal places
//! - Disbursements are already in the settlement currency and only truncated to 2 places
//!
//! All arithmetic is `rust_decimal`; the fee is divided out once at the end so
//! the only inexact step is the final division.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{Transaction, TransactionKind};

/// Decimal places of the settlement currency.
pub const SETTLEMENT_DECIMAL_PLACES: u32 = 2;

/// Converts a raw amount into the settlement currency.
///
/// * deposit: `truncate_2dp(amount × (1 − fee/100) / fx)`
/// * withdrawal: `round_half_up_2dp(amount × (1 + fee/100) / fx)`
/// * disbursement: `truncate_2dp(amount)`; rates are ignored
///
/// # Errors
///
/// Returns `LedgerError::Configuration` if the exchange rate is zero or negative
/// for a deposit or withdrawal, and `LedgerError::Validation` if the
/// intermediate product overflows.
pub fn convert(
    amount: Decimal,
    fee_rate_percent: Decimal,
    exchange_rate: Decimal,
    kind: TransactionKind,
) -> Result<Decimal, LedgerError> {
    let factor = match kind {
        TransactionKind::Disbursement => {
            return Ok(amount
                .round_dp_with_strategy(SETTLEMENT_DECIMAL_PLACES, RoundingStrategy::ToZero));
        }
        TransactionKind::Deposit => Decimal::ONE_HUNDRED.checked_sub(fee_rate_percent),
        TransactionKind::Withdrawal => Decimal::ONE_HUNDRED.checked_add(fee_rate_percent),
    };

    if exchange_rate <= Decimal::ZERO {
        return Err(LedgerError::Configuration(format!(
            "exchange rate must be positive, got {exchange_rate}"
        )));
    }

    let overflow = || LedgerError::validation(format!("amount {amount} is too large"));
    let numerator = factor
        .and_then(|f| amount.checked_mul(f))
        .ok_or_else(overflow)?;
    let denominator = exchange_rate
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(overflow)?;
    let settlement = numerator.checked_div(denominator).ok_or_else(overflow)?;

    let strategy = match kind {
        TransactionKind::Withdrawal => RoundingStrategy::MidpointAwayFromZero,
        _ => RoundingStrategy::ToZero,
    };
    Ok(settlement.round_dp_with_strategy(SETTLEMENT_DECIMAL_PLACES, strategy))
}

/// Re-derives a transaction's settlement from its stored inputs and compares.
#[must_use]
pub fn settlement_matches(tx: &Transaction) -> bool {
    convert(tx.amount, tx.rate, tx.fx, tx.kind).is_ok_and(|s| s == tx.settlement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deposit_truncates() {
        // 1000 * 0.9 / 153 = 5.882352...
        let result = convert(dec!(1000), dec!(10), dec!(153), TransactionKind::Deposit).unwrap();
        assert_eq!(result, dec!(5.88));

        // 100 * 0.9 / 153 = 0.588235... -> never rounds up to 0.59
        let result = convert(dec!(100), dec!(10), dec!(153), TransactionKind::Deposit).unwrap();
        assert_eq!(result, dec!(0.58));
    }

    #[test]
    fn test_withdrawal_rounds_half_up() {
        // 100 * 1.1 / 153 = 0.718954... -> 0.72
        let result = convert(dec!(100), dec!(10), dec!(153), TransactionKind::Withdrawal).unwrap();
        assert_eq!(result, dec!(0.72));

        // 1 * 1.0 / 8 = 0.125 -> 0.13 (away from zero, not banker's 0.12)
        let result = convert(dec!(1), dec!(0), dec!(8), TransactionKind::Withdrawal).unwrap();
        assert_eq!(result, dec!(0.13));
    }

    #[rstest]
    #[case(dec!(10000), dec!(2), dec!(137), dec!(74.45))]
    #[case(dec!(20000), dec!(0), dec!(100), dec!(200.00))]
    #[case(dec!(1370), dec!(0), dec!(137), dec!(10.00))]
    fn test_withdrawal_cases(
        #[case] amount: Decimal,
        #[case] fee: Decimal,
        #[case] fx: Decimal,
        #[case] expected: Decimal,
    ) {
        let result = convert(amount, fee, fx, TransactionKind::Withdrawal).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_disbursement_ignores_rates() {
        let result = convert(dec!(35.04), dec!(0), dec!(0), TransactionKind::Disbursement).unwrap();
        assert_eq!(result, dec!(35.04));

        let result =
            convert(dec!(35.049), dec!(10), dec!(153), TransactionKind::Disbursement).unwrap();
        assert_eq!(result, dec!(35.04));
    }

    #[test]
    fn test_zero_fx_is_configuration_error() {
        let result = convert(dec!(100), dec!(10), dec!(0), TransactionKind::Deposit);
        assert!(matches!(result, Err(LedgerError::Configuration(_))));

        let result = convert(dec!(100), dec!(0), dec!(-1), TransactionKind::Withdrawal);
        assert!(matches!(result, Err(LedgerError::Configuration(_))));
    }

    #[test]
    fn test_overflow_is_validation_error() {
        let result = convert(Decimal::MAX, dec!(10), dec!(1), TransactionKind::Withdrawal);
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_full_fee_deposit_settles_to_zero() {
        let result = convert(dec!(500), dec!(100), dec!(7), TransactionKind::Deposit).unwrap();
        assert_eq!(result, Decimal::ZERO);
    }
}
