pub mod merge;
pub mod pusher;
pub mod webdav;

#[cfg(test)]
pub(crate) mod memory;

use std::future::Future;

use chrono::{DateTime, Local, Utc};
use thiserror::Error;

use crate::document::local::LocalFile;
use crate::document::reconcile::reconcile;
use crate::document::{Document, DocumentError, RawDocument};
use merge::merge_documents;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("malformed remote document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Local(#[from] DocumentError),
}

/// Current sync status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Error(String),
    LastSynced(String), // formatted timestamp
}

/// Where the shared copy of the task document lives.
pub trait RemoteStore {
    fn read_document(&self) -> impl Future<Output = Result<RawDocument, SyncError>> + Send;

    fn write_document(
        &self,
        document: &Document,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// One-shot reconciliation of the local document with the remote copy.
pub struct SyncEngine<R> {
    remote: R,
    local: LocalFile,
    status: SyncStatus,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, local: LocalFile) -> Self {
        Self {
            remote,
            local,
            status: SyncStatus::Idle,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    /// Pull, merge with `local`, and write the result to both sides.
    pub async fn sync(&mut self, local: &Document, now: DateTime<Local>) -> Result<Document, SyncError> {
        self.status = SyncStatus::Syncing;
        let result = self.exchange(local, now).await;
        self.status = match &result {
            Ok(_) => SyncStatus::LastSynced(now.format("%Y-%m-%d %H:%M").to_string()),
            Err(e) => {
                log::error!("Sync failed: {}", e);
                SyncStatus::Error(e.to_string())
            }
        };
        result
    }

    async fn exchange(&self, local: &Document, now: DateTime<Local>) -> Result<Document, SyncError> {
        let (remote, _) = reconcile(self.remote.read_document().await?, now);
        let now_utc = now.with_timezone(&Utc);

        let mut document = if local.is_empty() {
            log::info!("No local tasks, taking {} remote task(s)", remote.tasks.len());
            remote
        } else if remote.is_empty() {
            log::info!("Remote is empty, uploading {} local task(s)", local.tasks.len());
            local.clone()
        } else {
            merge_documents(local, &remote, now_utc)
        };
        document.last_sync = Some(now_utc);

        self.local.write(&document)?;
        self.remote.write_document(&document).await?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryRemote;
    use super::*;
    use crate::core::bucket::Bucket;
    use crate::core::recurrence::Recurrence;
    use crate::core::task::Task;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str, hour: u32) -> Task {
        let at = Utc.with_ymd_and_hms(2026, 3, 3, hour, 0, 0).unwrap();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            due_date: None,
            bucket: Bucket::Someday,
            order: 10000,
            tags: Vec::new(),
            recurring: Recurrence::Off,
            flagged: false,
            completed: false,
            completed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn engine(remote: MemoryRemote) -> (SyncEngine<MemoryRemote>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalFile::new(dir.path().join("tasks.json"));
        (SyncEngine::new(remote, local), dir)
    }

    #[tokio::test]
    async fn empty_local_takes_remote() {
        let remote = MemoryRemote::with(Document::new(vec![task("r", "remote", 9)], Utc::now()));
        let (mut engine, _dir) = engine(remote);

        let doc = engine.sync(&Document::new(Vec::new(), Utc::now()), now()).await.unwrap();
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].id, "r");
        assert!(engine.local.read().unwrap().is_some());
        assert!(matches!(engine.status(), SyncStatus::LastSynced(_)));
    }

    #[tokio::test]
    async fn empty_remote_receives_local() {
        let (mut engine, _dir) = engine(MemoryRemote::default());
        let local = Document::new(vec![task("l", "local", 9)], Utc::now());

        engine.sync(&local, now()).await.unwrap();
        let written = engine.remote().writes();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].tasks[0].id, "l");
    }

    #[tokio::test]
    async fn both_sides_are_merged() {
        let remote = MemoryRemote::with(Document::new(
            vec![task("s", "remote", 8), task("r", "remote only", 8)],
            Utc::now(),
        ));
        let (mut engine, _dir) = engine(remote);
        let local = Document::new(vec![task("s", "local", 9)], Utc::now());

        let doc = engine.sync(&local, now()).await.unwrap();
        assert_eq!(doc.tasks.len(), 2);
        assert_eq!(doc.tasks[0].title, "local");
        assert_eq!(doc.last_sync, Some(now().with_timezone(&Utc)));
    }

    #[tokio::test]
    async fn failure_is_recorded_in_status() {
        let (mut engine, _dir) = engine(MemoryRemote::failing());
        let local = Document::new(vec![task("l", "local", 9)], Utc::now());

        assert!(engine.sync(&local, now()).await.is_err());
        assert!(matches!(engine.status(), SyncStatus::Error(_)));
    }
}
