//! This module is responsible for reading, writing and managing the SQLite database

mod live;
mod migrations;

pub use live::Table;
pub(crate) use live::ChangeFeed;

use crate::db::live::{live, AllCategories, TransactionQuery};
use crate::model::{
    default_categories, AccountInfo, Amount, Category, CategoryId, Color, Evidence, Transaction,
    TransactionId,
};
use crate::store::{AccountStore, CategoryStore, Live, TransactionStore};
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;
type TransactionQueryAs<'q> = QueryAs<'q, Sqlite, TransactionRow, SqliteArguments<'q>>;

const TRANSACTION_COLUMNS: &str = "id, date, amount, is_income, original_message, description, \
    provider, contact_name, account_info, user_id, category_id";

/// A handle to the ledger database. Clones share the connection pool and the change feed.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl Db {
    /// - Validates that there is a SQLite file at `path`
    /// - Opens a connection pool
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing: {}", path.display());
        }
        let db = Self::connect(path, false).await?;
        let version = migrations::current_version(&db.pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this program supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&db.pool, version, migrations::CURRENT_VERSION).await?;
        debug!("Loaded the database at {}", path.display());
        Ok(db)
    }

    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Seeds the default categories
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at {}", path.display());
        }
        let db = Self::connect(path, true).await?;
        migrations::bootstrap(&db.pool).await?;
        migrations::run(&db.pool, 0, migrations::CURRENT_VERSION).await?;

        if db.count_categories().await? == 0 {
            let defaults = default_categories();
            let count = defaults.len();
            for category in &defaults {
                db.upsert_category(category).await?;
            }
            info!("Seeded {count} default categories");
        }
        Ok(db)
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open the database at {}", path.display()))?;
        Ok(Self {
            pool,
            changes: ChangeFeed::new(),
        })
    }

    pub(crate) fn changes(&self) -> &ChangeFeed {
        &self.changes
    }

    /// The change counter of `table`. Triggers bump it for every row written through any
    /// connection, so it also moves when another process writes.
    pub(crate) async fn table_version(&self, table: Table) -> Result<i64> {
        sqlx::query_scalar("SELECT version FROM table_versions WHERE name = ?")
            .bind(table.to_string())
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to read the change counter of {table}"))
    }

    /// Writes a transactionally consistent copy of the database to `path`, which must not exist.
    pub(crate) async fn snapshot_into(&self, path: &Path) -> Result<()> {
        sqlx::query("VACUUM INTO ?")
            .bind(path.to_string_lossy().to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to copy the database to {}", path.display()))?;
        Ok(())
    }

    async fn fetch_transactions(&self, query: TransactionQueryAs<'_>) -> Result<Vec<Transaction>> {
        query
            .fetch_all(&self.pool)
            .await
            .context("Failed to query transactions")?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    async fn date_bound(&self, sql: &str) -> Result<Option<DateTime<Utc>>> {
        let millis: Option<i64> = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .context("Failed to query the transaction date range")?;
        millis.map(from_millis).transpose()
    }

    /// Writes `transactions` in one database transaction, so either all of them are stored or
    /// none are. A record that already exists is replaced, except that its category is kept when
    /// the incoming transaction has none. Returns the number of inserted and replaced records.
    pub(crate) async fn import_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Result<(usize, usize)> {
        let insert = format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO NOTHING"
        );
        // Parameters are numbered in TRANSACTION_COLUMNS order.
        let replace = "UPDATE transactions SET \
                date = ?2, \
                amount = ?3, \
                is_income = ?4, \
                original_message = ?5, \
                description = ?6, \
                provider = ?7, \
                contact_name = ?8, \
                account_info = ?9, \
                user_id = ?10, \
                category_id = COALESCE(?11, category_id) \
             WHERE id = ?1";

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin the import transaction")?;
        let (mut inserted, mut replaced) = (0, 0);
        for transaction in transactions {
            let result = bind_transaction(sqlx::query(&insert), transaction)?
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to write transaction {}", transaction.id()))?;
            if result.rows_affected() > 0 {
                inserted += 1;
                continue;
            }
            bind_transaction(sqlx::query(replace), transaction)?
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to replace transaction {}", transaction.id()))?;
            replaced += 1;
        }
        tx.commit()
            .await
            .context("Failed to commit the import transaction")?;

        if !transactions.is_empty() {
            self.changes.publish(Table::Transactions);
        }
        Ok((inserted, replaced))
    }
}

/// Binds the fields of `transaction` to `query` in `TRANSACTION_COLUMNS` order.
fn bind_transaction<'q>(
    query: SqliteQuery<'q>,
    transaction: &'q Transaction,
) -> Result<SqliteQuery<'q>> {
    let original_message = serde_json::to_string(transaction.original_message())
        .context("Unable to serialize the original message")?;
    Ok(query
        .bind(transaction.id().as_str())
        .bind(transaction.date().timestamp_millis())
        .bind(transaction.amount().value().to_string())
        .bind(transaction.is_income())
        .bind(original_message)
        .bind(transaction.description())
        .bind(transaction.provider())
        .bind(transaction.contact_name())
        .bind(transaction.account_info())
        .bind(transaction.user_id())
        .bind(transaction.category_id().map(CategoryId::as_str)))
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    date: i64,
    amount: String,
    is_income: bool,
    original_message: String,
    description: Option<String>,
    provider: Option<String>,
    contact_name: Option<String>,
    account_info: Option<String>,
    user_id: Option<String>,
    category_id: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let amount: Amount = row
            .amount
            .parse()
            .with_context(|| format!("Bad amount stored for transaction {}", row.id))?;
        let evidence: Evidence = serde_json::from_str(&row.original_message)
            .with_context(|| format!("Bad original message stored for transaction {}", row.id))?;
        Ok(Transaction::from_parts(
            TransactionId::from_stored(row.id),
            from_millis(row.date)?,
            amount,
            row.is_income,
            evidence,
            row.description,
            row.provider,
            row.contact_name,
            row.account_info,
            row.user_id,
            row.category_id.map(CategoryId::from_stored),
        ))
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    user_id: Option<String>,
    name: String,
    color: i64,
}

impl TryFrom<CategoryRow> for Category {
    type Error = anyhow::Error;

    fn try_from(row: CategoryRow) -> Result<Self> {
        let color = u32::try_from(row.color)
            .with_context(|| format!("Bad color {} stored for category {}", row.color, row.id))?;
        Ok(Category::from_parts(
            CategoryId::from_stored(row.id),
            row.user_id,
            row.name,
            Color::argb(color),
        ))
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    document_id: String,
    user_id: String,
    contact_name: String,
    phone_number: String,
    account_number: String,
    bank_name: String,
}

impl From<AccountRow> for AccountInfo {
    fn from(row: AccountRow) -> Self {
        AccountInfo {
            document_id: row.document_id,
            user_id: row.user_id,
            contact_name: row.contact_name,
            phone_number: row.phone_number,
            account_number: row.account_number,
            bank_name: row.bank_name,
        }
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .with_context(|| format!("Stored date {millis} is out of range"))
}

#[async_trait::async_trait]
impl TransactionStore for Db {
    async fn count_transactions(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;
        Ok(count as u64)
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch transaction {id}"))?;
        row.map(Transaction::try_from).transpose()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY date DESC, id");
        self.fetch_transactions(sqlx::query_as(&sql)).await
    }

    fn watch_transactions(&self) -> Live<Transaction> {
        live(self.clone(), TransactionQuery::All)
    }

    async fn list_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE date >= ? AND date <= ? ORDER BY date DESC, id"
        );
        let query = sqlx::query_as(&sql)
            .bind(start.timestamp_millis())
            .bind(end.timestamp_millis());
        self.fetch_transactions(query).await
    }

    fn watch_transactions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Live<Transaction> {
        live(self.clone(), TransactionQuery::Between(start, end))
    }

    async fn list_transactions_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE category_id = ? ORDER BY date DESC, id"
        );
        let query = sqlx::query_as(&sql).bind(category_id.as_str());
        self.fetch_transactions(query).await
    }

    fn watch_transactions_by_category(&self, category_id: &CategoryId) -> Live<Transaction> {
        live(
            self.clone(),
            TransactionQuery::ByCategory(category_id.clone()),
        )
    }

    async fn list_uncategorized_transactions(&self) -> Result<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE category_id IS NULL ORDER BY date DESC, id"
        );
        self.fetch_transactions(sqlx::query_as(&sql)).await
    }

    async fn min_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.date_bound("SELECT MIN(date) FROM transactions").await
    }

    async fn max_date(&self) -> Result<Option<DateTime<Utc>>> {
        self.date_bound("SELECT MAX(date) FROM transactions").await
    }

    async fn upsert_transaction(&self, transaction: &Transaction) -> Result<()> {
        let sql = format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                date = excluded.date, \
                amount = excluded.amount, \
                is_income = excluded.is_income, \
                original_message = excluded.original_message, \
                description = excluded.description, \
                provider = excluded.provider, \
                contact_name = excluded.contact_name, \
                account_info = excluded.account_info, \
                user_id = excluded.user_id, \
                category_id = excluded.category_id"
        );
        bind_transaction(sqlx::query(&sql), transaction)?
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to write transaction {}", transaction.id()))?;
        self.changes.publish(Table::Transactions);
        Ok(())
    }

    async fn delete_transaction_by_id(&self, id: &TransactionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete transaction {id}"))?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            self.changes.publish(Table::Transactions);
        }
        Ok(deleted)
    }

    async fn assign_category(
        &self,
        id: &TransactionId,
        category_id: Option<&CategoryId>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE transactions SET category_id = ? WHERE id = ?")
            .bind(category_id.map(CategoryId::as_str))
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to set the category of transaction {id}"))?;
        let updated = result.rows_affected() > 0;
        if updated {
            self.changes.publish(Table::Transactions);
        }
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl CategoryStore for Db {
    async fn count_categories(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count categories")?;
        Ok(count as u64)
    }

    async fn get_category(&self, id: &CategoryId) -> Result<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, user_id, name, color FROM categories WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Failed to fetch category {id}"))?;
        row.map(Category::try_from).transpose()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, user_id, name, color FROM categories ORDER BY name, id")
                .fetch_all(&self.pool)
                .await
                .context("Failed to query categories")?;
        rows.into_iter().map(Category::try_from).collect()
    }

    fn watch_categories(&self) -> Live<Category> {
        live(self.clone(), AllCategories)
    }

    async fn upsert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, user_id, name, color) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                user_id = excluded.user_id, name = excluded.name, color = excluded.color",
        )
        .bind(category.id().as_str())
        .bind(category.user_id())
        .bind(category.name())
        .bind(i64::from(category.color().value()))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write category {}", category.id()))?;
        self.changes.publish(Table::Categories);
        Ok(())
    }

    async fn delete_category_by_id(&self, id: &CategoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete category {id}"))?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            self.changes.publish(Table::Categories);
        }
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl AccountStore for Db {
    async fn list_accounts(&self) -> Result<Vec<AccountInfo>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT document_id, user_id, contact_name, phone_number, account_number, bank_name \
             FROM accounts ORDER BY bank_name, account_number",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query accounts")?;
        Ok(rows.into_iter().map(AccountInfo::from).collect())
    }

    async fn upsert_account(&self, account: &AccountInfo) -> Result<()> {
        sqlx::query(
            "INSERT INTO accounts \
                (document_id, user_id, contact_name, phone_number, account_number, bank_name) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(document_id, user_id) DO UPDATE SET \
                contact_name = excluded.contact_name, \
                phone_number = excluded.phone_number, \
                account_number = excluded.account_number, \
                bank_name = excluded.bank_name",
        )
        .bind(&account.document_id)
        .bind(&account.user_id)
        .bind(&account.contact_name)
        .bind(&account.phone_number)
        .bind(&account.account_number)
        .bind(&account.bank_name)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write account {}", account.document_id))?;
        self.changes.publish(Table::Accounts);
        Ok(())
    }

    async fn delete_account(&self, document_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE document_id = ? AND user_id = ?")
            .bind(document_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete account {document_id}"))?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            self.changes.publish(Table::Accounts);
        }
        Ok(deleted)
    }
}
