//! Ledger error types.
//!
//! Every failure a chat command or dashboard request can hit while touching
//! rates, transactions, or admins ends up as one of these variants.

use tally_shared::AppError;
use tally_shared::types::{GroupId, MessageId, TransactionId, UserId};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Configuration Errors ==========
    /// Rates cannot be used for conversion (e.g. a zero exchange rate).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The effective fee/exchange pair is all-zero and a configured pair is required.
    #[error("No {direction} rate configured for country {country}")]
    UnconfiguredRate {
        /// `deposit` or `withdrawal`.
        direction: &'static str,
        /// Country label the lookup was made for.
        country: String,
    },

    // ========== Lookup Errors ==========
    /// No transaction in the group carries this correlation id.
    #[error("No transaction with correlation id {correlation_id} in group {group_id}")]
    CorrelationNotFound {
        /// Group searched.
        group_id: GroupId,
        /// Correlation id searched for.
        correlation_id: MessageId,
    },

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Nothing of the requested kind is left to undo.
    #[error("No {0} to undo")]
    NothingToUndo(&'static str),

    /// Country override not found.
    #[error("No rate override for country {0}")]
    CountryNotFound(String),

    /// Admin not found.
    #[error("User {0} is not an admin")]
    AdminNotFound(UserId),

    // ========== Permission Errors ==========
    /// Operator is neither an admin nor the owner.
    #[error("User {0} is not allowed to perform this operation")]
    Permission(UserId),

    /// Operation reserved for the owner.
    #[error("Only the owner may perform this operation")]
    OwnerOnly,

    /// The owner cannot be removed from the admin set.
    #[error("The owner cannot be removed")]
    OwnerImmutable,

    // ========== Validation Errors ==========
    /// Input rejected before touching the ledger.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rates must be zero or positive.
    #[error("Rate cannot be negative: {0}")]
    NegativeRate(rust_decimal::Decimal),

    // ========== Conflict Errors ==========
    /// The correlation id is already attached to another transaction in the group.
    #[error("Correlation id {0} is already attached")]
    CorrelationConflict(MessageId),

    // ========== Storage Errors ==========
    /// Persistence backend unavailable.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Create a storage error.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::UnconfiguredRate { .. } => "UNCONFIGURED_RATE",
            Self::CorrelationNotFound { .. } => "CORRELATION_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::NothingToUndo(_) => "NOTHING_TO_UNDO",
            Self::CountryNotFound(_) => "COUNTRY_NOT_FOUND",
            Self::AdminNotFound(_) => "ADMIN_NOT_FOUND",
            Self::Permission(_) => "PERMISSION_DENIED",
            Self::OwnerOnly => "OWNER_ONLY",
            Self::OwnerImmutable => "OWNER_IMMUTABLE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NegativeRate(_) => "NEGATIVE_RATE",
            Self::CorrelationConflict(_) => "CORRELATION_CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) | Self::NegativeRate(_) => 400,

            // 403 Forbidden - permission errors
            Self::Permission(_) | Self::OwnerOnly | Self::OwnerImmutable => 403,

            // 404 Not Found
            Self::CorrelationNotFound { .. }
            | Self::TransactionNotFound(_)
            | Self::NothingToUndo(_)
            | Self::CountryNotFound(_)
            | Self::AdminNotFound(_) => 404,

            // 409 Conflict
            Self::CorrelationConflict(_) => 409,

            // 422 Unprocessable - rates not usable
            Self::Configuration(_) | Self::UnconfiguredRate { .. } => 422,

            // 503 Service Unavailable
            Self::Storage(_) => 503,

            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Not-found is terminal: a second rollback of the same id must not be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::Configuration(_) | LedgerError::UnconfiguredRate { .. } => {
                Self::Configuration(msg)
            }
            LedgerError::CorrelationNotFound { .. }
            | LedgerError::TransactionNotFound(_)
            | LedgerError::NothingToUndo(_)
            | LedgerError::CountryNotFound(_)
            | LedgerError::AdminNotFound(_) => Self::NotFound(msg),
            LedgerError::Permission(_) | LedgerError::OwnerOnly | LedgerError::OwnerImmutable => {
                Self::Forbidden(msg)
            }
            LedgerError::Validation(_) | LedgerError::NegativeRate(_) => Self::Validation(msg),
            LedgerError::CorrelationConflict(_) => Self::Conflict(msg),
            LedgerError::Storage(_) => Self::Storage(msg),
            LedgerError::Internal(_) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::Configuration("fx".into()).error_code(),
            "CONFIGURATION_ERROR"
        );
        assert_eq!(
            LedgerError::UnconfiguredRate {
                direction: "deposit",
                country: "通用".into(),
            }
            .error_code(),
            "UNCONFIGURED_RATE"
        );
        assert_eq!(LedgerError::Permission(UserId(7)).error_code(), "PERMISSION_DENIED");
        assert_eq!(LedgerError::NegativeRate(dec!(-1)).error_code(), "NEGATIVE_RATE");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::validation("bad").http_status_code(), 400);
        assert_eq!(LedgerError::Permission(UserId(7)).http_status_code(), 403);
        assert_eq!(
            LedgerError::CorrelationNotFound {
                group_id: GroupId(1),
                correlation_id: MessageId(2),
            }
            .http_status_code(),
            404
        );
        assert_eq!(LedgerError::CorrelationConflict(MessageId(2)).http_status_code(), 409);
        assert_eq!(LedgerError::storage("down").http_status_code(), 503);
    }

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(LedgerError::storage("down").is_retryable());
        assert!(!LedgerError::TransactionNotFound(TransactionId(1)).is_retryable());
        assert!(!LedgerError::OwnerOnly.is_retryable());
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::Permission(UserId(9)).into();
        assert_eq!(app.status_code(), 403);

        let app: AppError = LedgerError::storage("pool closed").into();
        assert!(app.is_retryable());

        let app: AppError = LedgerError::NothingToUndo("deposit").into();
        assert_eq!(app.error_code(), "NOT_FOUND");
    }
}
