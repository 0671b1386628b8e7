//! CSV format handling for account seeds, transfers and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `AccountCsvRecord` / `TransferCsvRecord` structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, AccountSeed, LedgerError, OwnerId, TransferRecord};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Account seed row: `owner,initial_deposit[,balance]`
///
/// The balance column is optional; when absent or empty the account opens
/// with its balance equal to the initial deposit.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub owner: OwnerId,
    pub initial_deposit: String,
    #[serde(default)]
    pub balance: Option<String>,
}

/// Transfer row: `from,to,amount`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferCsvRecord {
    pub from: OwnerId,
    pub to: OwnerId,
    pub amount: String,
}

fn parse_decimal(value: &str, what: &str) -> Result<Decimal, LedgerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LedgerError::ParseError {
            line: None,
            message: format!("Missing {}", what),
        });
    }
    Decimal::from_str(value).map_err(|_| LedgerError::ParseError {
        line: None,
        message: format!("Invalid {} '{}'", what, value),
    })
}

/// Convert an `AccountCsvRecord` to an `AccountSeed`
///
/// Only parses; range and precision checks happen when the store opens the
/// account.
pub fn convert_account_record(csv_record: AccountCsvRecord) -> Result<AccountSeed, LedgerError> {
    let initial_deposit = parse_decimal(&csv_record.initial_deposit, "initial deposit")?;

    let balance = match csv_record.balance {
        Some(balance) if !balance.trim().is_empty() => parse_decimal(&balance, "balance")?,
        _ => initial_deposit,
    };

    Ok(AccountSeed {
        owner: csv_record.owner,
        initial_deposit,
        balance,
    })
}

/// Convert a `TransferCsvRecord` to a `TransferRecord`
pub fn convert_transfer_record(
    csv_record: TransferCsvRecord,
) -> Result<TransferRecord, LedgerError> {
    let amount = parse_decimal(&csv_record.amount, "amount")?;
    Ok(TransferRecord::new(csv_record.from, csv_record.to, amount))
}

/// A domain type that can be read from one CSV row
pub trait CsvRow: Sized {
    /// Raw row layout as deserialized by serde
    type Raw: DeserializeOwned;

    fn from_raw(raw: Self::Raw) -> Result<Self, LedgerError>;
}

impl CsvRow for AccountSeed {
    type Raw = AccountCsvRecord;

    fn from_raw(raw: AccountCsvRecord) -> Result<Self, LedgerError> {
        convert_account_record(raw)
    }
}

impl CsvRow for TransferRecord {
    type Raw = TransferCsvRecord;

    fn from_raw(raw: TransferCsvRecord) -> Result<Self, LedgerError> {
        convert_transfer_record(raw)
    }
}

/// Attach a line number to a parse error
pub(crate) fn at_line(error: LedgerError, line: u64) -> LedgerError {
    match error {
        LedgerError::ParseError { message, .. } => LedgerError::ParseError {
            line: Some(line),
            message,
        },
        other => other,
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: account, owner, balance, initial_deposit.
/// Accounts are sorted by account id for deterministic output and money is
/// printed with exactly 2 decimal places.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "owner", "balance", "initial_deposit"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(Account::id);

    for account in sorted_accounts {
        writer.write_record(&[
            account.id().to_string(),
            account.owner().to_string(),
            format!("{:.2}", account.balance()),
            format!("{:.2}", account.initial_deposit()),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
