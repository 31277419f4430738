//! Bounded fan-out of downloads into a single [`ContentStream`].
//!
//! A fixed number of workers claim items from a shared, read-only work list
//! and push one [`Content`] per item into the output channel. The channel
//! closes once every worker has been joined.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::task::JoinSet;

use crate::content::{Content, ContentSender, ContentStream};

/// Download every element of `items` with at most `workers` in flight.
///
/// `download` turns one work item into its [`Content`]; failures belong in
/// [`Content::error`] and never take a worker out of service. Workers stop
/// early once the returned stream is dropped.
pub fn fan_out<T, F, Fut>(items: Vec<T>, workers: usize, download: F) -> ContentStream
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Content> + Send,
{
    let workers = workers.max(1).min(items.len().max(1));
    let (tx, stream) = ContentStream::channel(workers);

    let queue: Arc<[T]> = items.into();
    let cursor = Arc::new(AtomicUsize::new(0));
    let download = Arc::new(download);

    let mut set = JoinSet::new();
    for id in 0..workers {
        let queue = Arc::clone(&queue);
        let cursor = Arc::clone(&cursor);
        let download = Arc::clone(&download);
        let tx = tx.clone();
        set.spawn(async move { work(id, &queue, &cursor, download.as_ref(), &tx).await });
    }
    drop(tx);

    tokio::spawn(async move {
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "download worker failed");
            }
        }
        tracing::trace!("all download workers joined");
    });

    stream
}

async fn work<T, F, Fut>(
    id: usize,
    queue: &[T],
    cursor: &AtomicUsize,
    download: &F,
    tx: &ContentSender,
) where
    F: Fn(&T) -> Fut,
    Fut: Future<Output = Content>,
{
    let mut done = 0usize;
    loop {
        let next = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(item) = queue.get(next) else {
            break;
        };

        let content = download(item).await;
        if let Some(e) = &content.error {
            tracing::warn!(worker = id, path = %content.path, error = %e, "download failed");
        }
        if !tx.send(content).await {
            tracing::debug!(worker = id, "consumer went away, stopping");
            return;
        }
        done += 1;
    }
    tracing::trace!(worker = id, done, "worker drained queue");
}
