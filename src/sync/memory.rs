//! In-memory remote store for tests.

use std::sync::Mutex;

use super::{RemoteStore, SyncError};
use crate::document::{Document, RawDocument};

#[derive(Default)]
pub(crate) struct MemoryRemote {
    current: Mutex<Option<Document>>,
    writes: Mutex<Vec<Document>>,
    failing: bool,
}

impl MemoryRemote {
    pub(crate) fn with(document: Document) -> Self {
        Self {
            current: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn writes(&self) -> Vec<Document> {
        self.writes.lock().unwrap().clone()
    }
}

impl RemoteStore for MemoryRemote {
    async fn read_document(&self) -> Result<RawDocument, SyncError> {
        if self.failing {
            return Err(SyncError::Protocol("remote unavailable".to_string()));
        }
        let current = self.current.lock().unwrap().clone();
        match current {
            Some(document) => Ok(RawDocument::from_document(&document)?),
            None => Ok(RawDocument::default()),
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), SyncError> {
        if self.failing {
            return Err(SyncError::Protocol("remote unavailable".to_string()));
        }
        *self.current.lock().unwrap() = Some(document.clone());
        self.writes.lock().unwrap().push(document.clone());
        Ok(())
    }
}
