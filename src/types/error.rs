//! Error types for the ledger engine
//!
//! This module defines every error the engine, the stores, and the CLI can
//! report. The engine exposes only the error kind; mapping to transport
//! responses is the façade's job (see [`LedgerError::rejection_reason`]).
//!
//! # Error Categories
//!
//! - **Client errors**: unknown account, invalid kind/amount/description
//! - **Business rejections**: insufficient funds, arithmetic overflow
//! - **Transient failures**: lock timeout, store unavailable (retryable)
//! - **Setup errors**: seeding, file I/O, CSV parsing

use super::account::AccountId;
use thiserror::Error;

/// Main error type for the ledger engine
///
/// Every failure inside a unit of work is returned only after the unit of
/// work has been rolled back, so an error never comes with partial writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The referenced account does not exist
    ///
    /// A client error; never retried automatically.
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The account that was requested
        account: AccountId,
    },

    /// Debit would push the balance below `-limit`
    ///
    /// A definitive business rejection. The account is left exactly as it
    /// was before the call.
    #[error(
        "Insufficient funds for account {account}: balance {balance}, limit {limit}, requested {requested}"
    )]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        limit: i64,
        requested: i64,
    },

    /// The kind code is neither `c` nor `d`
    #[error("Invalid transaction type '{kind}'")]
    InvalidTransactionType {
        /// The code that was received
        kind: String,
    },

    /// The amount is zero or negative
    #[error("Invalid amount {amount}: must be a positive integer")]
    InvalidAmount { amount: i64 },

    /// Description is empty or longer than ten characters
    #[error("Invalid description length {length}: must be between 1 and 10 characters")]
    InvalidDescription { length: usize },

    /// Balance arithmetic would not fit in an i64
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// The account lock could not be acquired before the deadline
    ///
    /// Retryable. Nothing was written.
    #[error("Timed out after {waited_ms}ms waiting for the lock on account {account}")]
    LockTimeout { account: AccountId, waited_ms: u64 },

    /// The persistence layer failed
    ///
    /// Retryable. The unit of work made no partial writes.
    #[error("Ledger store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Seeding an account whose id already exists
    #[error("Account {account} already exists")]
    DuplicateAccount { account: AccountId },

    /// Seed data that would violate the account invariants
    #[error("Invalid seed for account {account}: {reason}")]
    InvalidAccountSeed { account: AccountId, reason: String },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        if error.is_io_error() {
            return LedgerError::IoError {
                message: error.to_string(),
            };
        }

        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        LedgerError::StoreUnavailable {
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    pub fn account_not_found(account: AccountId) -> Self {
        LedgerError::AccountNotFound { account }
    }

    pub fn insufficient_funds(account: AccountId, balance: i64, limit: i64, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            limit,
            requested,
        }
    }

    pub fn invalid_transaction_type(kind: &str) -> Self {
        LedgerError::InvalidTransactionType {
            kind: kind.to_string(),
        }
    }

    pub fn invalid_amount(amount: i64) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    pub fn invalid_description(length: usize) -> Self {
        LedgerError::InvalidDescription { length }
    }

    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    pub fn lock_timeout(account: AccountId, waited_ms: u64) -> Self {
        LedgerError::LockTimeout { account, waited_ms }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        LedgerError::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn duplicate_account(account: AccountId) -> Self {
        LedgerError::DuplicateAccount { account }
    }

    pub fn invalid_account_seed(account: AccountId, reason: &str) -> Self {
        LedgerError::InvalidAccountSeed {
            account,
            reason: reason.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::LockTimeout { .. } | LedgerError::StoreUnavailable { .. }
        )
    }

    /// Short, transport-neutral reason a façade reports to its client
    pub fn rejection_reason(&self) -> &'static str {
        match self {
            LedgerError::AccountNotFound { .. } => "no such account",
            LedgerError::InsufficientFunds { .. } => "rejected, would exceed overdraft limit",
            LedgerError::InvalidTransactionType { .. } => "unrecognized kind",
            LedgerError::InvalidAmount { .. } | LedgerError::InvalidDescription { .. } => {
                "invalid request"
            }
            LedgerError::ArithmeticOverflow { .. } => "rejected, amount out of range",
            LedgerError::LockTimeout { .. } | LedgerError::StoreUnavailable { .. } => {
                "temporarily unavailable, retry"
            }
            LedgerError::DuplicateAccount { .. } | LedgerError::InvalidAccountSeed { .. } => {
                "invalid account setup"
            }
            LedgerError::FileNotFound { .. }
            | LedgerError::IoError { .. }
            | LedgerError::ParseError { .. } => "input error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::account_not_found(
        LedgerError::account_not_found(6),
        "Account 6 not found"
    )]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds(2, -80000, 80000, 1),
        "Insufficient funds for account 2: balance -80000, limit 80000, requested 1"
    )]
    #[case::invalid_transaction_type(
        LedgerError::invalid_transaction_type("x"),
        "Invalid transaction type 'x'"
    )]
    #[case::invalid_amount(
        LedgerError::invalid_amount(0),
        "Invalid amount 0: must be a positive integer"
    )]
    #[case::invalid_description(
        LedgerError::invalid_description(11),
        "Invalid description length 11: must be between 1 and 10 characters"
    )]
    #[case::lock_timeout(
        LedgerError::lock_timeout(1, 50),
        "Timed out after 50ms waiting for the lock on account 1"
    )]
    #[case::parse_error_with_line(
        LedgerError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        LedgerError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::not_found(LedgerError::account_not_found(1), "no such account")]
    #[case::insufficient(
        LedgerError::insufficient_funds(1, 0, 0, 1),
        "rejected, would exceed overdraft limit"
    )]
    #[case::kind(LedgerError::invalid_transaction_type("z"), "unrecognized kind")]
    #[case::amount(LedgerError::invalid_amount(-1), "invalid request")]
    #[case::timeout(LedgerError::lock_timeout(1, 10), "temporarily unavailable, retry")]
    fn test_rejection_reason(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.rejection_reason(), expected);
    }

    #[rstest]
    #[case::lock_timeout(LedgerError::lock_timeout(1, 10), true)]
    #[case::store_unavailable(LedgerError::store_unavailable("connection reset"), true)]
    #[case::insufficient_funds(LedgerError::insufficient_funds(1, 0, 0, 1), false)]
    #[case::not_found(LedgerError::account_not_found(1), false)]
    fn test_is_retryable(#[case] error: LedgerError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LedgerError = io_error.into();
        assert!(matches!(error, LedgerError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_csv_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::Other, "Is a directory");
        let error: LedgerError = csv::Error::from(io_error).into();
        assert!(matches!(error, LedgerError::IoError { .. }));
    }

    #[test]
    fn test_sqlx_error_conversion_is_retryable() {
        let error: LedgerError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, LedgerError::StoreUnavailable { .. }));
        assert!(error.is_retryable());
    }
}
