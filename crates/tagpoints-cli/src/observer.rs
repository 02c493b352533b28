//! Debounced re-capture of a checkout page as its content changes.
//!
//! Page snapshots arrive over a channel. Capture runs once the stream has
//! been quiet for the debounce period, always on the latest snapshot. Running
//! it more than once for the same page is harmless: capture overwrites the
//! one stored session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tagpoints_core::KeyValueStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::capture_checkout;

/// One rendering of a checkout page.
#[derive(Debug, Clone)]
pub(crate) struct PageSnapshot {
    pub(crate) url: String,
    pub(crate) html: String,
}

pub(crate) struct CheckoutObserver {
    tx: mpsc::Sender<PageSnapshot>,
    task: JoinHandle<usize>,
}

impl CheckoutObserver {
    /// Spawns the observer task.
    pub(crate) fn spawn<S: KeyValueStore + 'static>(store: Arc<S>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(observe(store, rx, debounce));
        Self { tx, task }
    }

    /// Queues a snapshot. Returns `false` if the observer has stopped.
    pub(crate) async fn notify(&self, snapshot: PageSnapshot) -> bool {
        self.tx.send(snapshot).await.is_ok()
    }

    /// Closes the snapshot stream, lets any pending capture run, and returns
    /// how many captures were performed.
    pub(crate) async fn finish(self) -> usize {
        drop(self.tx);
        match self.task.await {
            Ok(captures) => captures,
            Err(e) => {
                tracing::error!(error = %e, "checkout observer task failed");
                0
            }
        }
    }
}

async fn observe<S: KeyValueStore>(
    store: Arc<S>,
    mut rx: mpsc::Receiver<PageSnapshot>,
    debounce: Duration,
) -> usize {
    let mut captures = 0usize;

    while let Some(mut latest) = rx.recv().await {
        let mut closed = false;
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(next)) => latest = next,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        match capture_checkout(store.as_ref(), &latest.url, &latest.html, Utc::now()).await {
            Ok(_) => captures += 1,
            Err(e) => tracing::warn!(error = %e, url = %latest.url, "checkout capture failed"),
        }

        if closed {
            break;
        }
    }

    captures
}

#[cfg(test)]
mod tests {
    use tagpoints_core::session::load_live_session_at;
    use tagpoints_core::MemoryStore;

    use super::*;

    const URL: &str = "https://www.amazon.com/gp/buy/spc/handlers/display.html";

    fn snapshot(total: &str) -> PageSnapshot {
        PageSnapshot {
            url: URL.to_owned(),
            html: format!(
                r#"<div data-testid="item-title">Desk Lamp</div><div>Order Total: {total}</div>"#
            ),
        }
    }

    #[tokio::test]
    async fn burst_of_snapshots_is_captured_once_with_latest() {
        let store = Arc::new(MemoryStore::new());
        let observer = CheckoutObserver::spawn(Arc::clone(&store), Duration::from_millis(200));
        for total in ["$10.00", "$12.00", "$19.99"] {
            assert!(observer.notify(snapshot(total)).await);
        }
        assert_eq!(observer.finish().await, 1);

        let session = load_live_session_at(store.as_ref(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.order_total, Some(19.99));
    }

    #[tokio::test]
    async fn quiet_period_separates_captures() {
        let store = Arc::new(MemoryStore::new());
        let observer = CheckoutObserver::spawn(Arc::clone(&store), Duration::from_millis(20));
        observer.notify(snapshot("$10.00")).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        observer.notify(snapshot("$11.00")).await;
        assert_eq!(observer.finish().await, 2);
    }

    #[tokio::test]
    async fn no_snapshots_means_no_capture() {
        let store = Arc::new(MemoryStore::new());
        let observer = CheckoutObserver::spawn(store, Duration::from_millis(10));
        assert_eq!(observer.finish().await, 0);
    }
}
