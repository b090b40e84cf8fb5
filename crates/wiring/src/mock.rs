//! # Test Doubles
//!
//! In-memory services for exercising the container and the orchestrator without real
//! listeners or workers. Every mock writes what happens to it into a shared [`Journal`],
//! so a test can assert on the exact start/stop sequence across several services.
//!
//! Failures are injected the same way for every mock: `fail_up` / `fail_down` make the
//! corresponding call return an error after it has been journaled.
//!
//! ```rust
//! use wiring::mock::{Journal, MockService};
//! use wiring::{AppContext, ServiceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let journal = Journal::new();
//!     let cache = MockService::new("cache", &journal).fail_down("flush failed");
//!
//!     let manager = ServiceManager::new(AppContext::new());
//!     manager.make_as_up().unwrap();
//!     manager.add_and_run(cache.name(), cache.lifecycle()).await.unwrap();
//!
//!     assert!(manager.down().await.is_err());
//!     assert_eq!(journal.joined(), "up:cache,down:cache");
//! }
//! ```

use crate::context::AppContext;
use crate::error::BoxError;
use crate::service::{ContextService, Lifecycle, Service};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Ordered, shareable event log.
#[derive(Clone, Default, Debug)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries joined with commas, e.g. `"A,B,C"`.
    pub fn joined(&self) -> String {
        self.0.lock().join(",")
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Clone, Debug, Default)]
struct Faults {
    up: Option<String>,
    down: Option<String>,
}

fn outcome(fault: &Option<String>) -> Result<(), BoxError> {
    match fault {
        Some(message) => Err(message.clone().into()),
        None => Ok(()),
    }
}

/// A [`Service`] that journals `up:<name>` and `down:<name>`.
///
/// The type parameter only gives the mock a distinct type, so several mocks can be
/// registered in one container (`MockService::<Db>::tagged(..)`, `MockService::<Cache>::tagged(..)`).
pub struct MockService<K = ()> {
    name: String,
    journal: Journal,
    faults: Faults,
    kind: PhantomData<fn() -> K>,
}

impl MockService {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self::tagged(name, journal)
    }
}

impl<K: 'static> MockService<K> {
    pub fn tagged(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            faults: Faults::default(),
            kind: PhantomData,
        }
    }

    pub fn fail_up(mut self, message: impl Into<String>) -> Self {
        self.faults.up = Some(message.into());
        self
    }

    pub fn fail_down(mut self, message: impl Into<String>) -> Self {
        self.faults.down = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Plain(Arc::new(self.clone()))
    }
}

impl<K> Clone for MockService<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            journal: self.journal.clone(),
            faults: self.faults.clone(),
            kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for MockService<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockService").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<K: 'static> Service for MockService<K> {
    async fn up(&self) -> Result<(), BoxError> {
        self.journal.record(format!("up:{}", self.name));
        outcome(&self.faults.up)
    }

    async fn down(&self) -> Result<(), BoxError> {
        self.journal.record(format!("down:{}", self.name));
        outcome(&self.faults.down)
    }
}

/// A [`ContextService`] that keeps the context it was started with.
pub struct MockContextService<K = ()> {
    name: String,
    journal: Journal,
    faults: Faults,
    context: Arc<Mutex<Option<AppContext>>>,
    kind: PhantomData<fn() -> K>,
}

impl MockContextService {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self::tagged(name, journal)
    }
}

impl<K: 'static> MockContextService<K> {
    pub fn tagged(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            faults: Faults::default(),
            context: Arc::new(Mutex::new(None)),
            kind: PhantomData,
        }
    }

    pub fn fail_up(mut self, message: impl Into<String>) -> Self {
        self.faults.up = Some(message.into());
        self
    }

    pub fn fail_down(mut self, message: impl Into<String>) -> Self {
        self.faults.down = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context passed to `up`, if it was started.
    pub fn context(&self) -> Option<AppContext> {
        self.context.lock().clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Contextual(Arc::new(self.clone()))
    }
}

impl<K> Clone for MockContextService<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            journal: self.journal.clone(),
            faults: self.faults.clone(),
            context: Arc::clone(&self.context),
            kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for MockContextService<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockContextService")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<K: 'static> ContextService for MockContextService<K> {
    async fn up(&self, ctx: &AppContext) -> Result<(), BoxError> {
        self.journal.record(format!("up:{}", self.name));
        *self.context.lock() = Some(ctx.clone());
        outcome(&self.faults.up)
    }

    async fn down(&self) -> Result<(), BoxError> {
        self.journal.record(format!("down:{}", self.name));
        outcome(&self.faults.down)
    }
}
