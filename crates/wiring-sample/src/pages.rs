//! In-memory page store, filled from a directory of markdown files when it starts.

use crate::model::{PagesConfig, WikiError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use wiring::{BoxError, Service};

pub struct PageStore {
    root: PathBuf,
    pages: RwLock<BTreeMap<String, Arc<str>>>,
}

impl PageStore {
    pub fn new(config: &PagesConfig) -> Self {
        Self {
            root: config.root.clone(),
            pages: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<str>, WikiError> {
        self.pages
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| WikiError::PageNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.pages.read().keys().cloned().collect()
    }

    pub fn insert(&self, name: impl Into<String>, body: &str) {
        self.pages.write().insert(name.into(), Arc::from(body));
    }

    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }

    /// Reads every `*.md` file under the root; the page name is the file stem.
    async fn load(&self) -> Result<usize, WikiError> {
        let io = |source: std::io::Error| WikiError::Io {
            path: self.root.clone(),
            source,
        };

        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(io)?;
        let mut loaded = BTreeMap::new();
        while let Some(entry) = dir.next_entry().await.map_err(io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = tokio::fs::read_to_string(&path).await.map_err(io)?;
            loaded.insert(name.to_string(), Arc::from(body));
        }

        let count = loaded.len();
        self.pages.write().extend(loaded);
        Ok(count)
    }
}

#[async_trait]
impl Service for PageStore {
    async fn up(&self) -> Result<(), BoxError> {
        let count = self.load().await?;
        info!(pages = count, root = %self.root.display(), "Page store opened");
        Ok(())
    }

    async fn down(&self) -> Result<(), BoxError> {
        self.pages.write().clear();
        info!("Page store closed");
        Ok(())
    }
}
