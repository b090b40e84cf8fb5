//! # Wiki Wiring
//!
//! Declares the sample's services for the container. The order below is irrelevant; the
//! container derives it from the factory parameters:
//!
//! ```text
//! WikiConfig -> PageStore -> ThumbnailCache -> Ticker
//! ```
//!
//! which is also the start order. Shutdown runs the other way round, so the ticker stops
//! before the cache it writes to, and the cache before the store it reads from.

use crate::model::WikiConfig;
use crate::pages::PageStore;
use crate::thumbs::ThumbnailCache;
use crate::ticker::Ticker;
use std::sync::Arc;
use wiring::{Declaration, Modules};

pub fn modules() -> Modules {
    Modules::new()
        .with(
            Declaration::factory(|cache: Arc<ThumbnailCache>, config: Arc<WikiConfig>| {
                Ticker::new(cache, &config.ticker)
            })
            .context_service(),
        )
        .with(
            Declaration::factory(|pages: Arc<PageStore>, config: Arc<WikiConfig>| {
                ThumbnailCache::new(pages, &config.thumbs)
            })
            .service(),
        )
        .with(
            Declaration::factory(|config: Arc<WikiConfig>| PageStore::new(&config.pages))
                .service(),
        )
}
