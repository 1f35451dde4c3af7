//! The contracts a storage backend must satisfy.
//!
//! Lookups that find nothing return `None`, an empty `Vec` or `false`. Only storage faults are
//! errors. Writes are insert-or-replace keyed by id, because re-ingesting the same evidence must
//! reconcile to the same record rather than fail or duplicate it.
//!
//! The `watch_*` methods return a `Live` stream: it yields the current result set when first
//! polled and then a fresh result set after every committed change to the underlying table. The
//! stream never ends on its own; drop it to unsubscribe.

use crate::model::{AccountInfo, Category, CategoryId, Transaction, TransactionId};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

/// A continuously updating query result.
pub type Live<T> = BoxStream<'static, Result<Vec<T>>>;

#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    /// Total number of stored transactions.
    async fn count_transactions(&self) -> Result<u64>;

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    fn watch_transactions(&self) -> Live<Transaction>;

    /// Transactions whose `date` lies in `[start, end]`. Empty when `start > end`.
    async fn list_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;

    fn watch_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Live<Transaction>;

    /// Transactions whose category is exactly `category_id`. Uncategorized transactions never
    /// match; use `list_uncategorized_transactions` for those.
    async fn list_transactions_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Transaction>>;

    fn watch_transactions_by_category(&self, category_id: &CategoryId) -> Live<Transaction>;

    async fn list_uncategorized_transactions(&self) -> Result<Vec<Transaction>>;

    /// The earliest transaction date, `None` when the store is empty.
    async fn min_date(&self) -> Result<Option<DateTime<Utc>>>;

    /// The latest transaction date, `None` when the store is empty.
    async fn max_date(&self) -> Result<Option<DateTime<Utc>>>;

    /// Inserts `transaction`, or replaces every field of the stored record with the same id.
    async fn upsert_transaction(&self, transaction: &Transaction) -> Result<()>;

    /// Removes the record with the id of `transaction`. Returns `false`, and changes nothing, when
    /// there is no such record.
    async fn delete_transaction(&self, transaction: &Transaction) -> Result<bool> {
        self.delete_transaction_by_id(transaction.id()).await
    }

    async fn delete_transaction_by_id(&self, id: &TransactionId) -> Result<bool>;

    /// Sets or clears the category of a stored transaction. Returns `false` when `id` is unknown.
    async fn assign_category(
        &self,
        id: &TransactionId,
        category_id: Option<&CategoryId>,
    ) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait CategoryStore: Send + Sync {
    async fn count_categories(&self) -> Result<u64>;

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    fn watch_categories(&self) -> Live<Category>;

    async fn upsert_category(&self, category: &Category) -> Result<()>;

    /// Removes `category`. Transactions that reference it keep their `category_id`.
    async fn delete_category(&self, category: &Category) -> Result<bool> {
        self.delete_category_by_id(category.id()).await
    }

    async fn delete_category_by_id(&self, id: &CategoryId) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>>;

    /// Inserts or replaces the account keyed by `(document_id, user_id)`.
    async fn upsert_account(&self, account: &AccountInfo) -> Result<()>;

    async fn delete_account(&self, document_id: &str, user_id: &str) -> Result<bool>;
}
