use reqwest::{Client, Method, StatusCode};

use super::{RemoteStore, SyncError};
use crate::config::RemoteConfig;
use crate::document::{Document, RawDocument};

/// The task document stored as a single JSON file in a WebDAV collection.
pub struct WebDavStore {
    base_url: String,
    file_name: String,
    username: String,
    password: String,
    http: Client,
}

impl WebDavStore {
    pub fn new(
        base_url: &str,
        file_name: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, SyncError> {
        let http = Client::builder().build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            file_name: file_name.trim_start_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    pub fn from_config(remote: &RemoteConfig, password: &str) -> Result<Self, SyncError> {
        Self::new(&remote.url, &remote.file_name, &remote.username, password)
    }

    fn file_url(&self) -> String {
        format!("{}/{}", self.base_url, self.file_name)
    }

    /// Ensure the remote collection exists (MKCOL, 405 means it already does).
    pub async fn ensure_collection(&self) -> Result<(), SyncError> {
        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|e| SyncError::Protocol(format!("MKCOL method: {}", e)))?;
        let resp = self
            .http
            .request(mkcol, &self.base_url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => {
                log::info!("Created remote collection {}", self.base_url);
                Ok(())
            }
            StatusCode::METHOD_NOT_ALLOWED => Ok(()),
            status => Err(SyncError::Status {
                method: "MKCOL",
                url: self.base_url.clone(),
                status,
            }),
        }
    }
}

impl RemoteStore for WebDavStore {
    /// GET the document. A missing file is an empty document.
    async fn read_document(&self) -> Result<RawDocument, SyncError> {
        let url = self.file_url();
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                log::info!("No remote document at {}", url);
                return Ok(RawDocument::default());
            }
            status if !status.is_success() => {
                return Err(SyncError::Status {
                    method: "GET",
                    url,
                    status,
                });
            }
            _ => {}
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(RawDocument::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn write_document(&self, document: &Document) -> Result<(), SyncError> {
        let url = self.file_url();
        let body = serde_json::to_string_pretty(document)?;
        let resp = self
            .http
            .put(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "application/json; charset=utf-8")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SyncError::Status {
                method: "PUT",
                url,
                status: resp.status(),
            });
        }
        log::debug!("Wrote {} task(s) to {}", document.tasks.len(), url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_url_joins_cleanly() {
        let store = WebDavStore::new("https://dav.example.com/tasks/", "/tasks.json", "me", "pw").unwrap();
        assert_eq!(store.file_url(), "https://dav.example.com/tasks/tasks.json");
    }

    #[test]
    fn builds_from_config() {
        let remote = RemoteConfig {
            url: "https://dav.example.com/daybucket".to_string(),
            username: "me".to_string(),
            file_name: "mine.json".to_string(),
        };
        let store = WebDavStore::from_config(&remote, "pw").unwrap();
        assert_eq!(store.file_url(), "https://dav.example.com/daybucket/mine.json");
    }
}
