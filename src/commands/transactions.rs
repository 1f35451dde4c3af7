//! Transaction command handlers.

use crate::args::{CategorizeArgs, DeleteTransactionsArgs, ListTransactionsArgs, TransactionIdArg};
use crate::commands::{plural, transaction_line, transactions_message, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{CategoryId, Transaction, TransactionId};
use crate::store::{CategoryStore, TransactionStore};
use crate::{Config, Result};
use anyhow::anyhow;
use tracing::debug;

/// Lists transactions, newest first, narrowed by date range, by category or to the uncategorized
/// ones.
pub async fn list_transactions(
    config: Config,
    args: &ListTransactionsArgs,
) -> Result<Out<Vec<Transaction>>> {
    let db = config.db();
    let selection = args.selection();
    let result = if args.uncategorized() {
        db.list_uncategorized_transactions().await
    } else if let Some((start, end)) = selection.range() {
        db.list_transactions_between(start, end).await
    } else if let Some(category) = selection.category() {
        db.list_transactions_by_category(&CategoryId::from_stored(category))
            .await
    } else {
        db.list_transactions().await
    };
    let transactions = result.pub_result(ErrorType::Database)?;

    Ok(Out::new(
        transactions_message("Found", &transactions),
        transactions,
    ))
}

/// Shows a single transaction. An unknown id is reported, not treated as an error.
pub async fn get_transaction(config: Config, args: &TransactionIdArg) -> Result<Out<Transaction>> {
    let id = TransactionId::from_stored(args.id());
    let found = config
        .db()
        .get_transaction(&id)
        .await
        .pub_result(ErrorType::Database)?;
    Ok(match found {
        Some(t) => {
            let mut message = transaction_line(&t);
            if let Some(description) = t.description() {
                message.push_str(&format!("\n  description: {description}"));
            }
            if let Some(provider) = t.provider() {
                message.push_str(&format!("\n  provider: {provider}"));
            }
            if let Some(contact) = t.contact_name() {
                message.push_str(&format!("\n  contact: {contact}"));
            }
            if let Some(account) = t.account_info() {
                message.push_str(&format!("\n  account: {account}"));
            }
            Out::new(message, t)
        }
        None => format!("Transaction {id} not found").into(),
    })
}

/// Deletes transactions by id. Ids that are not stored are skipped.
pub async fn delete_transactions(
    config: Config,
    args: &DeleteTransactionsArgs,
) -> Result<Out<Vec<String>>> {
    let db = config.db();
    let mut deleted = Vec::new();
    for id in args.ids() {
        let id = TransactionId::from_stored(id.as_str());
        if db
            .delete_transaction_by_id(&id)
            .await
            .pub_result(ErrorType::Database)?
        {
            deleted.push(id.to_string());
        } else {
            debug!("Transaction {id} was not present");
        }
    }

    let message = format!(
        "Deleted {}",
        plural(deleted.len(), "transaction", "transactions")
    );
    Ok(Out::new(message, deleted))
}

/// Assigns a category to a transaction, or clears its category.
///
/// # Errors
/// - A `request` error if the category does not exist.
pub async fn categorize_transaction(config: Config, args: &CategorizeArgs) -> Result<Out<()>> {
    let db = config.db();
    let id = TransactionId::from_stored(args.id());
    let category_id = args.category().map(CategoryId::from_stored);

    if let Some(category_id) = &category_id {
        let exists = db
            .get_category(category_id)
            .await
            .pub_result(ErrorType::Database)?
            .is_some();
        if !exists {
            return Err(anyhow!("Category {category_id} does not exist"))
                .pub_result(ErrorType::Request);
        }
    }

    let updated = db
        .assign_category(&id, category_id.as_ref())
        .await
        .pub_result(ErrorType::Database)?;
    Ok(match (updated, &category_id) {
        (false, _) => format!("Transaction {id} not found").into(),
        (true, Some(category_id)) => {
            format!("Assigned category {category_id} to transaction {id}").into()
        }
        (true, None) => format!("Cleared the category of transaction {id}").into(),
    })
}
