//! A task store wired to its persistence.

use crate::core::clock::{Clock, SystemClock};
use crate::core::store::TaskStore;
use crate::document::local::LocalFile;
use crate::document::reconcile::load_store;
use crate::document::{Document, DocumentError};
use crate::sync::pusher::DebouncedPusher;

pub struct Session<C: Clock = SystemClock> {
    store: TaskStore<C>,
    local: LocalFile,
    pusher: Option<DebouncedPusher>,
}

impl<C: Clock> Session<C> {
    /// Load and reconcile the local document, advancing stale day buckets.
    pub fn open(local: LocalFile, clock: C) -> Result<Self, DocumentError> {
        let store = match local.read()? {
            Some(raw) => load_store(raw, clock).0,
            None => {
                log::info!("No saved tasks at {}, starting empty", local.path().display());
                TaskStore::with_clock(clock)
            }
        };
        Ok(Self {
            store,
            local,
            pusher: None,
        })
    }

    pub fn with_pusher(mut self, pusher: DebouncedPusher) -> Self {
        self.pusher = Some(pusher);
        self
    }

    pub fn store(&self) -> &TaskStore<C> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TaskStore<C> {
        &mut self.store
    }

    pub fn local(&self) -> &LocalFile {
        &self.local
    }

    /// Persist the current snapshot after a batch of mutations.
    pub fn commit(&mut self) -> Result<(), DocumentError> {
        self.store.advance_day_buckets();
        let document = self.store.to_document();
        self.local.write(&document)?;
        if let Some(pusher) = &self.pusher {
            pusher.schedule(document);
        }
        Ok(())
    }

    /// Adopt a document produced by a sync. Saved locally only.
    pub fn replace(&mut self, document: Document) -> Result<(), DocumentError> {
        self.store.replace(document.tasks);
        self.local.write(&self.store.to_document())
    }

    /// Flush any pending remote push.
    pub async fn close(self) {
        if let Some(pusher) = self.pusher {
            pusher.shutdown().await;
        }
    }
}
