//! Command handlers for the sms-ledger CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod accounts;
mod categories;
mod import;
mod init;
mod summary;
mod transactions;
mod watch;

use crate::model::Transaction;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use accounts::list_accounts;
pub use categories::{add_category, delete_categories, list_categories, update_category};
pub use import::import;
pub use init::init;
pub use summary::{summary, SummaryReport};
pub use transactions::{
    categorize_transaction, delete_transactions, get_transaction, list_transactions,
};
pub use watch::watch;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// `"1 transaction"`, `"2 transactions"`.
fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

/// One line per transaction for terminal output.
fn transaction_line(t: &Transaction) -> String {
    let sign = if t.is_income() { '+' } else { '-' };
    let category = t.category_id().map(|c| c.as_str()).unwrap_or("-");
    let message = t.original_message();
    format!(
        "{}  {}  {sign}{}  [{category}]  {}: {}",
        t.date().format("%Y-%m-%d %H:%M"),
        t.id(),
        t.amount(),
        message.address.trim(),
        message.body.trim()
    )
}

/// A header line followed by one line per transaction.
fn transactions_message(header: &str, transactions: &[Transaction]) -> String {
    let mut message = format!(
        "{header}: {}",
        plural(transactions.len(), "transaction", "transactions")
    );
    for t in transactions {
        message.push('\n');
        message.push_str(&transaction_line(t));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{transaction_on, utc};

    #[test]
    fn test_plural() {
        assert_eq!(plural(0, "category", "categories"), "0 categories");
        assert_eq!(plural(1, "category", "categories"), "1 category");
    }

    #[test]
    fn test_transaction_line() {
        let t = transaction_on("BANK", " Pagaste $12.50 ", utc(2024, 1, 2));
        let line = transaction_line(&t);
        assert!(line.starts_with("2024-01-02 00:00"));
        assert!(line.contains("-$12.50"));
        assert!(line.contains("[-]"));
        assert!(line.ends_with("BANK: Pagaste $12.50"));
    }

    #[test]
    fn test_out_from_message() {
        let out: Out<()> = "done".into();
        assert_eq!(out.message(), "done");
        assert!(out.structure().is_none());
    }
}
