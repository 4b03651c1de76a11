//! Transaction-related types for the ledger engine
//!
//! This module defines the raw request handed over by the façade, its
//! validated form ([`LedgerEntry`]), the immutable stored [`Transaction`],
//! and the [`Statement`] snapshot returned by the read path.
//!
//! Amounts are always stored as a positive magnitude; the direction of the
//! movement is carried by [`TransactionKind`], never by the sign.

use super::account::{AccountBalance, AccountId};
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier
///
/// Assigned monotonically by the store when the row is committed.
pub type TransactionId = i64;

/// Maximum description length, in characters
pub const MAX_DESCRIPTION_LEN: usize = 10;

/// Direction of a balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Adds the amount to the balance
    Credit,

    /// Subtracts the amount from the balance
    ///
    /// Rejected when the resulting balance would fall below `-balance_limit`.
    Debit,
}

impl TransactionKind {
    /// Single-letter wire code (`c` or `d`)
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "c",
            TransactionKind::Debit => "d",
        }
    }

    /// Parse a wire code
    ///
    /// Only the two literal codes are accepted; anything else fails with
    /// [`LedgerError::InvalidTransactionType`].
    pub fn from_code(code: &str) -> Result<Self, LedgerError> {
        match code {
            "c" => Ok(TransactionKind::Credit),
            "d" => Ok(TransactionKind::Debit),
            other => Err(LedgerError::invalid_transaction_type(other)),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Strictly positive magnitude of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Validate a raw amount
    ///
    /// # Returns
    ///
    /// * `Ok(Amount)` if `value > 0`
    /// * `Err(LedgerError::InvalidAmount)` otherwise
    pub fn new(value: i64) -> Result<Self, LedgerError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(LedgerError::invalid_amount(value))
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

/// Free-text description, 1 to 10 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Description(String);

impl Description {
    /// Validate a raw description
    ///
    /// Length is counted in characters, not bytes, so multi-byte text such
    /// as "padaria ç" is measured the way a client would count it.
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        let length = value.chars().count();
        if (1..=MAX_DESCRIPTION_LEN).contains(&length) {
            Ok(Self(value))
        } else {
            Err(LedgerError::invalid_description(length))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw transaction request as handed over by the façade
///
/// Nothing here has been validated yet: `kind` is the literal wire code and
/// `amount` may be zero or negative. [`TransactionRequest::validate`] turns
/// it into a [`LedgerEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// The account to move money on
    pub account_id: AccountId,

    /// Requested magnitude
    pub amount: i64,

    /// Wire code of the movement (`c` or `d`)
    pub kind: String,

    /// Free-text description
    pub description: String,
}

impl TransactionRequest {
    pub fn new(account_id: AccountId, amount: i64, kind: &str, description: &str) -> Self {
        Self {
            account_id,
            amount,
            kind: kind.to_string(),
            description: description.to_string(),
        }
    }

    /// Shorthand for a credit request
    pub fn credit(account_id: AccountId, amount: i64, description: &str) -> Self {
        Self::new(account_id, amount, TransactionKind::Credit.code(), description)
    }

    /// Shorthand for a debit request
    pub fn debit(account_id: AccountId, amount: i64, description: &str) -> Self {
        Self::new(account_id, amount, TransactionKind::Debit.code(), description)
    }

    /// Validate the request
    ///
    /// The kind is checked first so that an unknown code is always reported
    /// as [`LedgerError::InvalidTransactionType`], whatever else is wrong.
    pub fn validate(&self) -> Result<LedgerEntry, LedgerError> {
        let kind = TransactionKind::from_code(&self.kind)?;
        let amount = Amount::new(self.amount)?;
        let description = Description::new(self.description.as_str())?;

        Ok(LedgerEntry {
            account_id: self.account_id,
            kind,
            amount,
            description,
        })
    }
}

/// Validated movement, ready to be applied under lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub description: Description,
}

impl LedgerEntry {
    /// Balance after applying this entry to `balance`
    ///
    /// Uses checked arithmetic; `None` means the result does not fit in an
    /// `i64`.
    pub fn apply_to(&self, balance: i64) -> Option<i64> {
        match self.kind {
            TransactionKind::Credit => balance.checked_add(self.amount.get()),
            TransactionKind::Debit => balance.checked_sub(self.amount.get()),
        }
    }
}

/// Immutable transaction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time view of an account and its most recent activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub account_id: AccountId,

    /// Balance and limit as of the snapshot
    pub balance: AccountBalance,

    /// When the snapshot was produced (display only)
    pub as_of: DateTime<Utc>,

    /// Most recent transactions, newest first
    pub recent_transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::credit("c", TransactionKind::Credit)]
    #[case::debit("d", TransactionKind::Debit)]
    fn test_kind_from_code(#[case] code: &str, #[case] expected: TransactionKind) {
        assert_eq!(TransactionKind::from_code(code).unwrap(), expected);
        assert_eq!(expected.code(), code);
    }

    #[rstest]
    #[case::uppercase("C")]
    #[case::word("credit")]
    #[case::empty("")]
    #[case::padded(" d")]
    fn test_kind_rejects_unknown_codes(#[case] code: &str) {
        let err = TransactionKind::from_code(code).unwrap_err();
        assert_eq!(err, LedgerError::invalid_transaction_type(code));
    }

    #[rstest]
    #[case::one(1, true)]
    #[case::large(80_000, true)]
    #[case::zero(0, false)]
    #[case::negative(-5, false)]
    fn test_amount_validation(#[case] value: i64, #[case] valid: bool) {
        assert_eq!(Amount::new(value).is_ok(), valid);
    }

    #[rstest]
    #[case::single_char("a", true)]
    #[case::ten_chars("abcdefghij", true)]
    #[case::eleven_chars("abcdefghijk", false)]
    #[case::empty("", false)]
    #[case::multibyte_ten("çççççççççç", true)]
    fn test_description_validation(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(Description::new(value).is_ok(), valid);
    }

    #[test]
    fn test_validate_reports_kind_before_amount() {
        let request = TransactionRequest::new(1, 0, "x", "");
        assert_eq!(
            request.validate().unwrap_err(),
            LedgerError::invalid_transaction_type("x")
        );
    }

    #[test]
    fn test_validate_builds_entry() {
        let entry = TransactionRequest::debit(2, 500, "rent").validate().unwrap();
        assert_eq!(entry.account_id, 2);
        assert_eq!(entry.kind, TransactionKind::Debit);
        assert_eq!(entry.amount.get(), 500);
        assert_eq!(entry.description.as_str(), "rent");
    }

    #[rstest]
    #[case::credit(TransactionKind::Credit, 100, 50, Some(150))]
    #[case::debit(TransactionKind::Debit, 100, 150, Some(-50))]
    #[case::credit_overflow(TransactionKind::Credit, i64::MAX, 1, None)]
    #[case::debit_overflow(TransactionKind::Debit, i64::MIN, 1, None)]
    fn test_apply_to(
        #[case] kind: TransactionKind,
        #[case] balance: i64,
        #[case] amount: i64,
        #[case] expected: Option<i64>,
    ) {
        let entry = LedgerEntry {
            account_id: 1,
            kind,
            amount: Amount::new(amount).unwrap(),
            description: Description::new("x").unwrap(),
        };
        assert_eq!(entry.apply_to(balance), expected);
    }
}
