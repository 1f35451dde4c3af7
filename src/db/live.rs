//! Change notification and live queries.
//!
//! Every committed write publishes the `Table` it touched on a broadcast channel. A live query
//! subscribes to that channel before it takes its first snapshot, so a write that lands between
//! subscribing and the first read still produces a later emission.
//!
//! The broadcast channel only carries writes made through the same `Db`. Writes from other
//! processes are noticed by polling the table's change counter (see `Db::table_version`) every
//! `POLL_INTERVAL`.

use crate::db::Db;
use crate::model::{Category, CategoryId, Transaction};
use crate::store::{CategoryStore, Live, TransactionStore};
use crate::Result;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Buffered change events per subscriber before it is considered lagging.
const CHANGE_CAPACITY: usize = 256;

/// How often a live query checks for writes made outside this process.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The tables whose changes are published.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Transactions,
    Categories,
    Accounts,
}

serde_plain::derive_display_from_serialize!(Table);

/// The sending half of the change feed, shared by every clone of a `Db`.
#[derive(Debug, Clone)]
pub(crate) struct ChangeFeed {
    sender: broadcast::Sender<Table>,
}

impl ChangeFeed {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { sender }
    }

    /// Announces a committed change to `table`. Having no subscribers is normal.
    pub(crate) fn publish(&self, table: Table) {
        let receivers = self.sender.send(table).unwrap_or(0);
        trace!("Published change to {table} to {receivers} subscriber(s)");
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Table> {
        self.sender.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A query that can be re-run whenever the table it reads from changes.
#[async_trait::async_trait]
pub(crate) trait LiveQuery: Send + Sync + 'static {
    type Item: Send + 'static;

    fn table(&self) -> Table;

    async fn run(&self, db: &Db) -> Result<Vec<Self::Item>>;
}

#[derive(Debug, Clone)]
pub(crate) enum TransactionQuery {
    All,
    Between(DateTime<Utc>, DateTime<Utc>),
    ByCategory(CategoryId),
}

#[async_trait::async_trait]
impl LiveQuery for TransactionQuery {
    type Item = Transaction;

    fn table(&self) -> Table {
        Table::Transactions
    }

    async fn run(&self, db: &Db) -> Result<Vec<Transaction>> {
        match self {
            TransactionQuery::All => db.list_transactions().await,
            TransactionQuery::Between(start, end) => {
                db.list_transactions_between(*start, *end).await
            }
            TransactionQuery::ByCategory(category_id) => {
                db.list_transactions_by_category(category_id).await
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AllCategories;

#[async_trait::async_trait]
impl LiveQuery for AllCategories {
    type Item = Category;

    fn table(&self) -> Table {
        Table::Categories
    }

    async fn run(&self, db: &Db) -> Result<Vec<Category>> {
        db.list_categories().await
    }
}

struct Subscription<Q> {
    db: Db,
    query: Q,
    receiver: broadcast::Receiver<Table>,
    poll: Interval,
    /// The change counter read just before the latest snapshot.
    seen: Option<i64>,
    primed: bool,
}

impl<Q: LiveQuery> Subscription<Q> {
    /// Waits for the next change that concerns this query. Returns `false` if the feed is gone.
    async fn changed(&mut self) -> bool {
        let table = self.query.table();
        loop {
            tokio::select! {
                biased;
                received = self.receiver.recv() => match received {
                    Ok(changed) if changed == table => return true,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        // The next snapshot covers every skipped change.
                        debug!("Live query on {table} lagged by {skipped} change(s)");
                        return true;
                    }
                    Err(RecvError::Closed) => return false,
                },
                _ = self.poll.tick() => match self.db.table_version(table).await {
                    Ok(version) if self.seen != Some(version) => {
                        debug!("{table} changed outside this process");
                        return true;
                    }
                    Ok(_) => continue,
                    Err(e) => warn!("Unable to poll {table} for changes: {e:#}"),
                },
            }
        }
    }

    async fn snapshot(&mut self) -> Result<Vec<Q::Item>> {
        // Counter first: a write landing between the two reads triggers one more snapshot.
        self.seen = self.db.table_version(self.query.table()).await.ok();
        self.query.run(&self.db).await
    }
}

/// Turns `query` into a `Live` stream over `db`.
pub(crate) fn live<Q: LiveQuery>(db: Db, query: Q) -> Live<Q::Item> {
    let receiver = db.changes().subscribe();
    let mut poll = interval_at(Instant::now() + POLL_INTERVAL, POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let subscription = Subscription {
        db,
        query,
        receiver,
        poll,
        seen: None,
        primed: false,
    };
    futures::stream::unfold(subscription, |mut sub| async move {
        if sub.primed && !sub.changed().await {
            return None;
        }
        sub.primed = true;
        let snapshot = sub.snapshot().await;
        Some((snapshot, sub))
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Color, Evidence};
    use crate::test::TestEnv;
    use crate::test::{transaction_on, utc};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_publish_without_subscribers() {
        let feed = ChangeFeed::new();
        feed.publish(Table::Transactions);
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_table() {
        let feed = ChangeFeed::new();
        let mut receiver = feed.subscribe();
        feed.publish(Table::Categories);
        assert_eq!(receiver.recv().await.unwrap(), Table::Categories);
    }

    #[tokio::test]
    async fn test_watch_emits_initial_snapshot_then_changes() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let mut stream = db.watch_transactions();

        let initial = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert!(initial.is_empty());

        let t = transaction_on("BANK", "first", utc(2024, 1, 1));
        db.upsert_transaction(&t).await.unwrap();

        let after_insert = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(after_insert, vec![t.clone()]);

        db.delete_transaction(&t).await.unwrap();
        let after_delete = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert!(after_delete.is_empty());
    }

    #[tokio::test]
    async fn test_watch_ignores_other_tables() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let mut stream = db.watch_transactions();
        let _initial = stream.next().await.unwrap().unwrap();

        db.upsert_category(&Category::new("Gifts", Color::argb(0xFF000000)))
            .await
            .unwrap();
        let t = transaction_on("BANK", "after category", utc(2024, 3, 1));
        db.upsert_transaction(&t).await.unwrap();

        // The category write must not produce an emission of its own, so the very next item is
        // the snapshot that contains the transaction.
        let next = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_between_reflects_range() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let mut stream = db.watch_transactions_between(utc(2024, 2, 1), utc(2024, 2, 28));
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        db.upsert_transaction(&transaction_on("BANK", "out of range", utc(2024, 1, 1)))
            .await
            .unwrap();
        let next = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert!(next.is_empty());

        db.upsert_transaction(&transaction_on("BANK", "in range", utc(2024, 2, 15)))
            .await
            .unwrap();
        let next = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].original_message().body, "in range");
    }

    #[tokio::test]
    async fn test_watch_by_category_follows_assignment() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let food = CategoryId::from_stored("food");
        let mut stream = db.watch_transactions_by_category(&food);
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        let t = transaction_on("BANK", "lunch", utc(2024, 5, 5));
        db.upsert_transaction(&t).await.unwrap();
        let _ = stream.next().await.unwrap().unwrap();

        assert!(db.assign_category(t.id(), Some(&food)).await.unwrap());
        let next = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].category_id(), Some(&food));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_still_sees_latest_state() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let mut stream = db.watch_transactions();
        let _ = stream.next().await.unwrap().unwrap();

        for i in 0..(CHANGE_CAPACITY + 10) {
            let evidence = Evidence::new("BANK", format!("message {i}"));
            let t = Transaction::new(evidence, utc(2024, 1, 1), Amount::ZERO, false);
            db.upsert_transaction(&t).await.unwrap();
        }

        let next = timeout(WAIT, stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next.len(), CHANGE_CAPACITY + 10);
    }

    #[tokio::test]
    async fn test_watch_sees_writes_from_another_connection() {
        let env = TestEnv::new().await;
        let watcher = env.config().db().clone();
        let writer = crate::Config::load(env.config().root()).await.unwrap();
        let mut transactions = watcher.watch_transactions();
        let mut categories = watcher.watch_categories();
        assert!(transactions.next().await.unwrap().unwrap().is_empty());
        let seeded = categories.next().await.unwrap().unwrap().len();

        let t = transaction_on("BANK", "from elsewhere", utc(2024, 6, 1));
        writer.db().upsert_transaction(&t).await.unwrap();
        let next = timeout(WAIT, transactions.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next, vec![t]);

        writer
            .db()
            .upsert_category(&Category::new("Gifts", Color::argb(0xFF000000)))
            .await
            .unwrap();
        let next = timeout(WAIT, categories.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(next.len(), seeded + 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let stream = db.watch_categories();
        assert_eq!(db.changes().subscriber_count(), 1);
        drop(stream);
        assert_eq!(db.changes().subscriber_count(), 0);

        // The store is unaffected by the subscription going away.
        db.upsert_category(&Category::new("Travel", Color::argb(0)))
            .await
            .unwrap();
        assert!(db.count_categories().await.unwrap() > 0);
    }
}
