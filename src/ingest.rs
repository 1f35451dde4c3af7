//! Bulk import of already-parsed SMS evidence from a CSV file.
//!
//! The file has a header row. `address` and `body` are required; every other column is optional
//! and may be left empty:
//!
//! | column                   | meaning                                                      |
//! |--------------------------|--------------------------------------------------------------|
//! | `timestamp`              | when the message was received, RFC 3339 or epoch millis      |
//! | `display_amount`         | amount text as shown in the message                          |
//! | `numeric_amount`         | amount detected by the parser                                |
//! | `source_account`         | detected source account                                      |
//! | `recipient_contact`      | detected recipient name                                      |
//! | `recipient_phone_number` | detected recipient phone                                     |
//! | `provider`               | provider label                                               |
//! | `amount`                 | the transaction amount; falls back to the detected amount    |
//! | `is_income`              | `true` or `false`, defaults to `false`                       |
//! | `date`                   | event date, used only when `timestamp` is empty              |
//! | `contact_name`           | overrides `recipient_contact`                                |
//! | `account_info`           | overrides `source_account`                                   |
//! | `description`            | free text                                                    |
//! | `category_id`            | category to assign                                           |
//!
//! Importing the same file twice leaves the ledger as it was after the first import, except that
//! a category assigned in between is kept when the row itself carries none.

use crate::model::{Amount, CategoryId, Evidence, Transaction};
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// The outcome of an import.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Rows whose id was not yet in the ledger.
    pub inserted: usize,
    /// Rows that replaced a stored record with the same id.
    pub replaced: usize,
    /// The database backup taken before writing, `None` when the file had no rows.
    pub backup: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ImportRow {
    address: String,
    body: String,
    timestamp: Option<String>,
    display_amount: Option<String>,
    numeric_amount: Option<f64>,
    source_account: Option<String>,
    recipient_contact: Option<String>,
    recipient_phone_number: Option<String>,
    provider: Option<String>,
    amount: Option<String>,
    is_income: Option<bool>,
    date: Option<String>,
    contact_name: Option<String>,
    account_info: Option<String>,
    description: Option<String>,
    category_id: Option<String>,
}

impl ImportRow {
    fn into_transaction(self, user_id: Option<&str>) -> Result<Transaction> {
        let timestamp = self
            .timestamp
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("Bad timestamp")?;
        let explicit_date = self
            .date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("Bad date")?;

        let evidence = Evidence {
            address: self.address,
            body: self.body,
            display_amount: self.display_amount,
            numeric_amount: self.numeric_amount,
            timestamp,
            source_account: self.source_account,
            recipient_contact: self.recipient_contact,
            recipient_phone_number: self.recipient_phone_number,
            provider: self.provider,
        };

        let amount = match self.amount.as_deref() {
            Some(text) => Amount::from_str(text)
                .with_context(|| format!("Bad amount '{text}'"))?,
            None => evidence.detected_amount().unwrap_or(Amount::ZERO),
        };
        let date = timestamp
            .or(explicit_date)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let mut transaction =
            Transaction::new(evidence, date, amount, self.is_income.unwrap_or(false))
                .with_description(self.description)
                .with_user_id(user_id.map(str::to_string))
                .with_category_id(self.category_id.map(CategoryId::from_stored));
        if self.contact_name.is_some() {
            transaction = transaction.with_contact_name(self.contact_name);
        }
        if self.account_info.is_some() {
            transaction = transaction.with_account_info(self.account_info);
        }
        Ok(transaction)
    }
}

/// Accepts RFC 3339 or an integer count of milliseconds since the Unix epoch.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(millis) = s.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(millis)
            .with_context(|| format!("Timestamp {millis} is out of range"));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("'{s}' is neither RFC 3339 nor epoch milliseconds"))
}

/// Reads every row of the CSV at `path` into a `Transaction`. Nothing is written.
async fn read_rows(path: &Path, user_id: Option<&str>) -> Result<Vec<Transaction>> {
    let content = utils::read(path).await?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let mut transactions = Vec::new();
    for (i, result) in reader.deserialize::<ImportRow>().enumerate() {
        // Row 1 is the header.
        let row_number = i + 2;
        let row = result.with_context(|| format!("Unable to read row {row_number}"))?;
        let transaction = row
            .into_transaction(user_id)
            .with_context(|| format!("Invalid row {row_number}"))?;
        transactions.push(transaction);
    }
    Ok(transactions)
}

/// Imports the CSV file at `path` into the ledger of `config`.
///
/// All rows are validated before anything is written, then written in one database transaction.
/// When at least one row is present the database is backed up first.
pub(crate) async fn import_csv(config: &Config, path: &Path) -> Result<ImportReport> {
    let transactions = read_rows(path, config.user_id()).await?;
    if transactions.is_empty() {
        info!("No rows found in {}", path.display());
        return Ok(ImportReport::default());
    }

    let backup = config.backup().copy_sqlite().await?;
    debug!("Backed up the ledger to {}", backup.display());
    let (inserted, replaced) = config.db().import_transactions(&transactions).await?;

    info!(
        "Imported {inserted} new and {replaced} replaced transaction(s) from {}",
        path.display()
    );
    Ok(ImportReport {
        inserted,
        replaced,
        backup: Some(backup),
    })
}
