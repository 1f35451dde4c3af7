use crate::args::WatchArgs;
use crate::commands::{transactions_message, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{CategoryId, Transaction};
use crate::store::{Live, TransactionStore};
use crate::{Config, Result};
use futures::StreamExt;
use std::future::Future;
use tracing::{debug, info};

/// Prints the selected transactions, then prints them again after every change, until Ctrl-C.
pub async fn watch(config: Config, args: &WatchArgs) -> Result<Out<()>> {
    let db = config.db();
    let selection = args.selection();
    let stream = if let Some((start, end)) = selection.range() {
        db.watch_transactions_between(start, end)
    } else if let Some(category) = selection.category() {
        db.watch_transactions_by_category(&CategoryId::from_stored(category))
    } else {
        db.watch_transactions()
    };

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            debug!("Unable to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let updates = follow(stream, stop, |snapshot| {
        info!("{}", transactions_message("Now", snapshot))
    })
    .await
    .pub_result(ErrorType::Database)?;

    Ok(format!("Stopped watching after {updates} update(s)").into())
}

/// Hands every snapshot of `stream` to `on_snapshot` until `stop` completes or the stream ends.
/// Returns how many snapshots were delivered.
async fn follow<F>(
    mut stream: Live<Transaction>,
    stop: impl Future<Output = ()>,
    mut on_snapshot: F,
) -> Result<usize>
where
    F: FnMut(&[Transaction]),
{
    tokio::pin!(stop);
    let mut updates = 0;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            next = stream.next() => match next {
                Some(snapshot) => {
                    on_snapshot(&snapshot?);
                    updates += 1;
                }
                None => break,
            },
        }
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{transaction_on, utc, TestEnv};
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_follow_until_stopped() {
        let env = TestEnv::new().await;
        let db = env.config().db().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel::<usize>();
        let sizes = Arc::new(Mutex::new(Vec::new()));

        let recorded = sizes.clone();
        let follower = tokio::spawn(follow(
            db.watch_transactions(),
            async move {
                let _ = stop_rx.await;
            },
            move |snapshot| {
                recorded.lock().unwrap().push(snapshot.len());
                let _ = seen_tx.send(snapshot.len());
            },
        ));

        assert_eq!(seen_rx.recv().await, Some(0));
        db.upsert_transaction(&transaction_on("BANK", "one", utc(2024, 1, 1)))
            .await
            .unwrap();
        assert_eq!(seen_rx.recv().await, Some(1));

        stop_tx.send(()).unwrap();
        let updates = follower.await.unwrap().unwrap();
        assert_eq!(updates, 2);
        assert_eq!(*sizes.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_follow_sees_writes_from_another_process() {
        let env = TestEnv::new().await;
        let watcher = env.config();
        let writer = Config::load(watcher.root()).await.unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel::<usize>();

        let follower = tokio::spawn(follow(
            watcher.db().watch_transactions(),
            async move {
                let _ = stop_rx.await;
            },
            move |snapshot| {
                let _ = seen_tx.send(snapshot.len());
            },
        ));

        assert_eq!(seen_rx.recv().await, Some(0));
        writer
            .db()
            .upsert_transaction(&transaction_on("BANK", "elsewhere", utc(2024, 1, 1)))
            .await
            .unwrap();
        let next = tokio::time::timeout(std::time::Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap();
        assert_eq!(next, Some(1));

        stop_tx.send(()).unwrap();
        assert_eq!(follower.await.unwrap().unwrap(), 2);
    }
}
