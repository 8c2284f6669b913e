//! Debounced background upload of the task document.
//!
//! Every commit hands the full snapshot to [`DebouncedPusher::schedule`].
//! Snapshots replace each other while the remote is quiet, so only the most
//! recent one is written once no new snapshot has arrived for the delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::RemoteStore;
use crate::document::Document;

pub struct DebouncedPusher {
    tx: watch::Sender<Option<Document>>,
    handle: JoinHandle<()>,
}

impl DebouncedPusher {
    /// Start the push loop on the current tokio runtime.
    pub fn spawn<R>(remote: Arc<R>, delay: Duration) -> Self
    where
        R: RemoteStore + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(push_loop(remote, rx, delay));
        Self { tx, handle }
    }

    /// Replace the pending snapshot and restart the quiet period.
    pub fn schedule(&self, document: Document) {
        self.tx.send_replace(Some(document));
    }

    /// Flush the pending snapshot, if any, and stop the loop.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            log::error!("Push task ended abnormally: {}", e);
        }
    }
}

async fn push_loop<R: RemoteStore>(
    remote: Arc<R>,
    mut rx: watch::Receiver<Option<Document>>,
    delay: Duration,
) {
    loop {
        if rx.changed().await.is_err() {
            break;
        }

        let mut closed = false;
        loop {
            match tokio::time::timeout(delay, rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        let pending = rx.borrow_and_update().clone();
        if let Some(document) = pending {
            match remote.write_document(&document).await {
                Ok(()) => log::info!("Pushed {} task(s) to remote", document.tasks.len()),
                Err(e) => log::error!("Failed to push tasks to remote: {}", e),
            }
        }

        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemoryRemote;
    use chrono::Utc;

    fn snapshot(version: &str) -> Document {
        let mut doc = Document::new(Vec::new(), Utc::now());
        doc.version = version.to_string();
        doc
    }

    #[tokio::test]
    async fn rapid_snapshots_collapse_into_one_write() {
        let remote = Arc::new(MemoryRemote::default());
        let pusher = DebouncedPusher::spawn(remote.clone(), Duration::from_secs(30));
        pusher.schedule(snapshot("a"));
        pusher.schedule(snapshot("b"));
        pusher.schedule(snapshot("c"));
        pusher.shutdown().await;

        let writes = remote.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].version, "c");
    }

    #[tokio::test]
    async fn writes_after_quiet_period() {
        let remote = Arc::new(MemoryRemote::default());
        let pusher = DebouncedPusher::spawn(remote.clone(), Duration::from_millis(20));
        pusher.schedule(snapshot("a"));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(remote.writes().len(), 1);

        pusher.shutdown().await;
        assert_eq!(remote.writes().len(), 1);
    }

    #[tokio::test]
    async fn nothing_scheduled_means_nothing_written() {
        let remote = Arc::new(MemoryRemote::default());
        let pusher = DebouncedPusher::spawn(remote.clone(), Duration::from_millis(20));
        pusher.shutdown().await;
        assert!(remote.writes().is_empty());
    }

    #[tokio::test]
    async fn push_failure_is_not_fatal() {
        let remote = Arc::new(MemoryRemote::failing());
        let pusher = DebouncedPusher::spawn(remote.clone(), Duration::from_millis(20));
        pusher.schedule(snapshot("a"));
        pusher.shutdown().await;
        assert!(remote.writes().is_empty());
    }
}
