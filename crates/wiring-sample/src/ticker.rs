//! Background task that keeps the thumbnail cache warm.
//!
//! The ticker is a [`ContextService`]: its loop runs on a child of the application
//! context, so closing the application stops it even before `down` is called.

use crate::model::{TickerConfig, WikiError};
use crate::thumbs::ThumbnailCache;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wiring::{AppContext, BoxError, ContextService};

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Ticker {
    cache: Arc<ThumbnailCache>,
    interval: Duration,
    ticks: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl Ticker {
    pub fn new(cache: Arc<ThumbnailCache>, config: &TickerConfig) -> Self {
        Self {
            cache,
            interval: Duration::from_millis(config.interval_ms.max(1)),
            ticks: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.running.lock().await, Some(r) if !r.handle.is_finished())
    }
}

#[async_trait]
impl ContextService for Ticker {
    async fn up(&self, ctx: &AppContext) -> Result<(), BoxError> {
        let token = ctx.token();
        let cache = Arc::clone(&self.cache);
        let ticks = Arc::clone(&self.ticks);
        let mut interval = tokio::time::interval(self.interval);

        let stop = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = interval.tick() => {
                        let added = cache.warm();
                        let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(tick = n, added, "Thumbnail cache warmed");
                    }
                }
            }
        });

        *self.running.lock().await = Some(Running { token, handle });
        info!(interval_ms = self.interval.as_millis() as u64, "Ticker started");
        Ok(())
    }

    async fn down(&self) -> Result<(), BoxError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };
        running.token.cancel();
        running.handle.await.map_err(WikiError::from)?;
        info!(ticks = self.ticks(), "Ticker stopped");
        Ok(())
    }
}
