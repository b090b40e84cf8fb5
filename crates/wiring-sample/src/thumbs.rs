//! Bounded cache of page previews.
//!
//! A thumbnail is the page's first heading plus the start of its text. Entries are
//! evicted oldest first once the cache holds `capacity` of them.

use crate::model::{Thumbnail, ThumbsConfig, WikiError};
use crate::pages::PageStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};
use wiring::{BoxError, Service};

#[derive(Default)]
struct Entries {
    by_page: HashMap<String, Arc<Thumbnail>>,
    order: VecDeque<String>,
}

pub struct ThumbnailCache {
    pages: Arc<PageStore>,
    capacity: usize,
    excerpt: usize,
    entries: Mutex<Entries>,
}

impl ThumbnailCache {
    pub fn new(pages: Arc<PageStore>, config: &ThumbsConfig) -> Self {
        Self {
            pages,
            capacity: config.capacity.max(1),
            excerpt: config.excerpt,
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn thumbnail(&self, page: &str) -> Result<Arc<Thumbnail>, WikiError> {
        if let Some(hit) = self.entries.lock().by_page.get(page) {
            return Ok(Arc::clone(hit));
        }

        let body = self.pages.get(page)?;
        let thumb = Arc::new(render(page, &body, self.excerpt));
        debug!(page, "Thumbnail rendered");

        let mut entries = self.entries.lock();
        if let Some(raced) = entries.by_page.get(page) {
            return Ok(Arc::clone(raced));
        }
        if entries.by_page.len() >= self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.by_page.remove(&oldest);
            }
        }
        entries.order.push_back(page.to_string());
        entries.by_page.insert(page.to_string(), Arc::clone(&thumb));
        Ok(thumb)
    }

    /// Renders every page that is not cached yet; returns how many were added.
    pub fn warm(&self) -> usize {
        self.pages
            .names()
            .iter()
            .filter(|page| !self.entries.lock().by_page.contains_key(*page))
            .filter(|page| self.thumbnail(page).is_ok())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_page.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the preview of one page: title from the first `#` heading (or the page name),
/// excerpt from the remaining text, cut to `limit` characters.
pub fn render(page: &str, body: &str, limit: usize) -> Thumbnail {
    let mut title = None;
    let mut text = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix('#') {
            Some(heading) if title.is_none() => {
                title = Some(heading.trim_start_matches('#').trim().to_string());
            }
            Some(_) => {}
            None => text.push(line),
        }
    }

    let joined = text.join(" ");
    let excerpt = match joined.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", joined[..cut].trim_end()),
        None => joined,
    };

    Thumbnail {
        page: page.to_string(),
        title: title.unwrap_or_else(|| page.to_string()),
        excerpt,
    }
}

#[async_trait]
impl Service for ThumbnailCache {
    async fn up(&self) -> Result<(), BoxError> {
        info!(capacity = self.capacity, pages = self.pages.len(), "Thumbnail cache ready");
        Ok(())
    }

    async fn down(&self) -> Result<(), BoxError> {
        let mut entries = self.entries.lock();
        info!(cached = entries.by_page.len(), "Thumbnail cache dropped");
        entries.by_page.clear();
        entries.order.clear();
        Ok(())
    }
}
