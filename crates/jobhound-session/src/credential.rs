//! Cookie persistence between runs.

use crate::error::Result;
use chrono::{DateTime, Utc};
use jobhound_browser::BrowserCookie;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Authentication state captured from the browser.
///
/// Expiry is never checked here: a stale credential shows up as a failed
/// login probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCredential {
    /// Cookies of the logged-in browser
    pub cookies: Vec<BrowserCookie>,
    /// When the cookies were captured
    pub saved_at: DateTime<Utc>,
}

/// Reads and writes a [`SessionCredential`] at a fixed path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// A missing file yields `None`. So does an unreadable or corrupt one,
    /// after a warning, since the login flow can always start from scratch.
    pub async fn load(&self) -> Option<SessionCredential> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No stored credential at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Cannot read credential {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<SessionCredential>(&contents) {
            Ok(credential) => {
                tracing::debug!(
                    "Loaded {} cookies saved at {}",
                    credential.cookies.len(),
                    credential.saved_at
                );
                Some(credential)
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt credential {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist `cookies`, creating parent directories as needed.
    pub async fn save(&self, cookies: Vec<BrowserCookie>) -> Result<SessionCredential> {
        let credential = SessionCredential {
            cookies,
            saved_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&credential)?;
        tokio::fs::write(&self.path, contents).await?;

        tracing::info!(
            "Saved {} cookies to {}",
            credential.cookies.len(),
            self.path.display()
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cookie(name: &str) -> BrowserCookie {
        BrowserCookie {
            name: name.to_string(),
            value: "v".to_string(),
            domain: ".zhipin.com".to_string(),
            path: "/".to_string(),
            expires: Some(1_900_000_000.0),
            http_only: true,
            secure: true,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().expect("create temp dir");
        let store = CredentialStore::new(dir.path().join("cookies.json"));
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().expect("create temp dir");
        let store = CredentialStore::new(dir.path().join("nested/state/cookies.json"));

        let saved = store
            .save(vec![cookie("wt2"), cookie("zp_token")])
            .await
            .expect("save credential");
        let loaded = store.load().await.expect("credential present");

        assert_eq!(loaded, saved);
        assert_eq!(loaded.cookies[1].name, "zp_token");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("cookies.json");
        tokio::fs::write(&path, "{ not json").await.expect("write");

        let store = CredentialStore::new(&path);
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn test_saved_format() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("cookies.json");
        CredentialStore::new(&path)
            .save(vec![cookie("wt2")])
            .await
            .expect("save credential");

        let raw = tokio::fs::read_to_string(&path).await.expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["cookies"][0]["name"], "wt2");
        assert!(value["saved_at"].as_str().is_some_and(|s| s.contains('T')));
    }
}
