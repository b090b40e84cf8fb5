//! Config models and shared data types of the sample wiki.

use serde::Deserialize;
use std::path::PathBuf;

/// Decoded from the application config file next to the framework's own keys.
#[derive(Debug, Clone, Deserialize)]
pub struct WikiConfig {
    pub pages: PagesConfig,
    #[serde(default)]
    pub thumbs: ThumbsConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagesConfig {
    /// Directory holding `*.md` pages.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThumbsConfig {
    pub capacity: usize,
    /// Maximum excerpt length in characters.
    pub excerpt: usize,
}

impl Default for ThumbsConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            excerpt: 80,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerConfig {
    pub interval_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { interval_ms: 5_000 }
    }
}

/// Short preview of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub page: String,
    pub title: String,
    pub excerpt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error("read pages from [{}]: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("page [{0}] not found")]
    PageNotFound(String),
    #[error("ticker task failed: {0}")]
    Ticker(#[from] tokio::task::JoinError),
}
