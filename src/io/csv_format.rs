//! CSV format handling for transaction requests and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization of request rows
//! - Conversion from CSV records to [`TransactionRequest`]s
//! - Account table and statement serialization
//!
//! All functions are pure (no file I/O) for easy testing.
//!
//! # Formats
//!
//! ```text
//! input:       account,kind,amount,description
//! accounts:    account,balance,limit
//! statements:  account,balance,limit,tx,kind,amount,description,created_at
//! ```

use std::io::Write;

use chrono::SecondsFormat;
use csv::Writer;
use serde::Deserialize;

use crate::types::{Account, AccountId, LedgerError, Statement, TransactionRequest};

/// CSV record structure for deserialization
///
/// `kind` and `description` are kept verbatim so that the engine, not the
/// parser, decides whether they are acceptable. Only a non-integer amount
/// makes a row unusable.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    pub account: AccountId,
    pub kind: String,
    pub amount: String,
    #[serde(default)]
    pub description: String,
}

/// Convert a CsvRecord to a TransactionRequest
///
/// # Returns
///
/// * `Ok(TransactionRequest)` - The raw request, not yet validated
/// * `Err(String)` - The amount is not an integer
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<TransactionRequest, String> {
    let amount = csv_record.amount.trim().parse::<i64>().map_err(|_| {
        format!(
            "Invalid amount '{}' for account {}",
            csv_record.amount, csv_record.account
        )
    })?;

    Ok(TransactionRequest {
        account_id: csv_record.account,
        amount,
        kind: csv_record.kind,
        description: csv_record.description,
    })
}

fn write_error(what: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::IoError {
        message: format!("Failed to write {}: {}", what, e),
    }
}

/// Write the account table
///
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "balance", "limit"])
        .map_err(|e| write_error("CSV header", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.balance.to_string(),
                account.balance_limit.to_string(),
            ])
            .map_err(|e| write_error("account record", e))?;
    }

    writer.flush().map_err(|e| write_error("output", e))?;

    Ok(())
}

/// Write one row per recent transaction of every statement
///
/// Statements are sorted by account id; transactions keep their newest-first
/// order. An account without history gets a single row whose transaction
/// columns are empty.
pub fn write_statements_csv(
    statements: &[Statement],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "account",
            "balance",
            "limit",
            "tx",
            "kind",
            "amount",
            "description",
            "created_at",
        ])
        .map_err(|e| write_error("CSV header", e))?;

    let mut sorted: Vec<&Statement> = statements.iter().collect();
    sorted.sort_by_key(|statement| statement.account_id);

    for statement in sorted {
        let prefix = [
            statement.account_id.to_string(),
            statement.balance.balance.to_string(),
            statement.balance.balance_limit.to_string(),
        ];

        if statement.recent_transactions.is_empty() {
            writer
                .write_record(prefix.iter().map(String::as_str).chain([""; 5]))
                .map_err(|e| write_error("statement record", e))?;
            continue;
        }

        for transaction in &statement.recent_transactions {
            let created_at = transaction
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true);
            let tx = transaction.id.to_string();
            let amount = transaction.amount.to_string();
            writer
                .write_record(prefix.iter().map(String::as_str).chain([
                    tx.as_str(),
                    transaction.kind.code(),
                    amount.as_str(),
                    transaction.description.as_str(),
                    created_at.as_str(),
                ]))
                .map_err(|e| write_error("statement record", e))?;
        }
    }

    writer.flush().map_err(|e| write_error("output", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountBalance, Transaction, TransactionKind};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn record(account: AccountId, kind: &str, amount: &str, description: &str) -> CsvRecord {
        CsvRecord {
            account,
            kind: kind.to_string(),
            amount: amount.to_string(),
            description: description.to_string(),
        }
    }

    #[rstest]
    #[case::credit(record(1, "c", "100", "salary"), TransactionRequest::credit(1, 100, "salary"))]
    #[case::debit(record(2, "d", " 50 ", "rent"), TransactionRequest::debit(2, 50, "rent"))]
    // Left for the engine to reject
    #[case::unknown_kind(record(3, "x", "5", "odd"), TransactionRequest::new(3, 5, "x", "odd"))]
    #[case::negative_amount(record(3, "c", "-5", "neg"), TransactionRequest::credit(3, -5, "neg"))]
    #[case::empty_description(record(3, "c", "5", ""), TransactionRequest::credit(3, 5, ""))]
    fn test_convert_csv_record(#[case] input: CsvRecord, #[case] expected: TransactionRequest) {
        assert_eq!(convert_csv_record(input).unwrap(), expected);
    }

    #[rstest]
    #[case::fractional("1.5")]
    #[case::text("lots")]
    #[case::empty("")]
    fn test_convert_csv_record_bad_amount(#[case] amount: &str) {
        let result = convert_csv_record(record(1, "c", amount, "x"));

        assert!(result.unwrap_err().contains("Invalid amount"));
    }

    fn account(id: AccountId, balance: i64, balance_limit: i64) -> Account {
        Account {
            id,
            name: format!("account {}", id),
            balance,
            balance_limit,
        }
    }

    #[rstest]
    #[case::empty(vec![], "account,balance,limit\n")]
    #[case::overdrawn(vec![account(2, -500, 1000)], "account,balance,limit\n2,-500,1000\n")]
    #[case::sorted_by_id(
        vec![account(3, 0, 10), account(1, 7, 0), account(2, -1, 5)],
        "account,balance,limit\n1,7,0\n2,-1,5\n3,0,10\n"
    )]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected: &str) {
        let mut output = Vec::new();

        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_statements_csv() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let transaction = |id, kind, amount, description: &str| Transaction {
            id,
            account_id: 1,
            amount,
            kind,
            description: description.to_string(),
            created_at: at,
        };
        let statements = vec![
            Statement {
                account_id: 2,
                balance: AccountBalance::new(0, 80_000),
                as_of: at,
                recent_transactions: vec![],
            },
            Statement {
                account_id: 1,
                balance: AccountBalance::new(50, 1000),
                as_of: at,
                recent_transactions: vec![
                    transaction(2, TransactionKind::Debit, 50, "rent"),
                    transaction(1, TransactionKind::Credit, 100, "pay, day"),
                ],
            },
        ];
        let mut output = Vec::new();

        write_statements_csv(&statements, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,balance,limit,tx,kind,amount,description,created_at\n\
             1,50,1000,2,d,50,rent,2024-01-02T03:04:05.000000Z\n\
             1,50,1000,1,c,100,\"pay, day\",2024-01-02T03:04:05.000000Z\n\
             2,0,80000,,,,,\n"
        );
    }
}
