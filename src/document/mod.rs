//! The task document persisted locally and on the remote store.

pub mod local;
pub mod reconcile;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::task::Task;

pub const DOCUMENT_VERSION: &str = "1.0";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed task document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
}

impl Document {
    pub fn new(tasks: Vec<Task>, now: DateTime<Utc>) -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            last_sync: Some(now),
            tasks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A document as found on disk or on the wire, before reconciliation.
///
/// Task records are kept as raw JSON so one bad record cannot fail the load.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_sync: Option<serde_json::Value>,
    #[serde(default)]
    pub tasks: Option<Vec<serde_json::Value>>,
}

impl RawDocument {
    pub fn parse(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(serde_json::from_value(serde_json::to_value(document)?)?)
    }
}
