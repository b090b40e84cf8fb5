//! # Service Lifecycle
//!
//! Values that need to be started and stopped implement [`Service`] or, when they want the
//! shared [`AppContext`], [`ContextService`]. Whether an output is lifecycle-bearing is
//! decided when it is registered (see [`FactoryDecl::service`](crate::FactoryDecl::service)),
//! not by inspecting values at runtime.
//!
//! The [`ServiceManager`] keeps the services it started as a stack. A service is pushed
//! and started as soon as the container constructs it, which means dependencies are always
//! up before their dependents. [`ServiceManager::down`] pops the stack, so shutdown runs
//! in exact reverse start order.
//!
//! ```rust
//! use wiring::{AppContext, BoxError, Lifecycle, Service, ServiceManager};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Listener;
//!
//! #[async_trait]
//! impl Service for Listener {
//!     async fn up(&self) -> Result<(), BoxError> { Ok(()) }
//!     async fn down(&self) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = ServiceManager::new(AppContext::new());
//!     manager.make_as_up().unwrap();
//!     manager
//!         .add_and_run("Listener", Lifecycle::Plain(Arc::new(Listener)))
//!         .await
//!         .unwrap();
//!     manager.down().await.unwrap();
//! }
//! ```

use crate::context::AppContext;
use crate::error::{BoxError, ContainerError, ShutdownErrors, StopFailure};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A component with a start/stop lifecycle.
///
/// `down` is always called during teardown, even if the service already stopped on its
/// own, so it must tolerate being called in any state.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    async fn up(&self) -> Result<(), BoxError>;
    async fn down(&self) -> Result<(), BoxError>;
}

/// A [`Service`] that receives the shared application context on start.
#[async_trait]
pub trait ContextService: Send + Sync + 'static {
    async fn up(&self, ctx: &AppContext) -> Result<(), BoxError>;
    async fn down(&self) -> Result<(), BoxError>;
}

/// A started (or starting) service, in one of its two flavours.
#[derive(Clone)]
pub enum Lifecycle {
    Plain(Arc<dyn Service>),
    Contextual(Arc<dyn ContextService>),
}

impl Lifecycle {
    async fn up(&self, ctx: &AppContext) -> Result<(), BoxError> {
        match self {
            Lifecycle::Plain(service) => service.up().await,
            Lifecycle::Contextual(service) => service.up(ctx).await,
        }
    }

    async fn down(&self) -> Result<(), BoxError> {
        match self {
            Lifecycle::Plain(service) => service.down().await,
            Lifecycle::Contextual(service) => service.down().await,
        }
    }
}

struct Record {
    name: String,
    lifecycle: Lifecycle,
}

const STATUS_DOWN: u32 = 0;
const STATUS_UP: u32 = 1;

pub struct ServiceManager {
    status: AtomicU32,
    started: Mutex<Vec<Record>>,
    ctx: AppContext,
}

impl ServiceManager {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            status: AtomicU32::new(STATUS_DOWN),
            started: Mutex::new(Vec::new()),
            ctx,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.load(Ordering::SeqCst) == STATUS_UP
    }

    /// Moves the manager from down to up. Fails if it is already up.
    pub fn make_as_up(&self) -> Result<(), ContainerError> {
        self.status
            .compare_exchange(STATUS_DOWN, STATUS_UP, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| ContainerError::AlreadyRunning)
    }

    /// Records the service and starts it.
    ///
    /// The record is kept even when `up` fails, so the following teardown also calls
    /// `down` on the half-started service.
    pub async fn add_and_run(
        &self,
        name: impl Into<String>,
        lifecycle: Lifecycle,
    ) -> Result<(), ContainerError> {
        if !self.is_up() {
            return Err(ContainerError::NotRunning);
        }
        let name = name.into();
        self.started.lock().push(Record {
            name: name.clone(),
            lifecycle: lifecycle.clone(),
        });

        debug!(service = %name, "Starting service");
        lifecycle
            .up(&self.ctx)
            .await
            .map_err(|source| ContainerError::ServiceStart {
                service: name.clone(),
                source,
            })?;
        info!(service = %name, "Service started");
        Ok(())
    }

    /// Stops every started service, newest first.
    ///
    /// A failing `down` does not stop the walk; all failures come back together as
    /// [`ContainerError::Shutdown`].
    pub async fn down(&self) -> Result<(), ContainerError> {
        self.status
            .compare_exchange(STATUS_UP, STATUS_DOWN, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ContainerError::NotRunning)?;

        let mut failures = ShutdownErrors::default();
        loop {
            let next = self.started.lock().pop();
            let Some(record) = next else {
                break;
            };
            match record.lifecycle.down().await {
                Ok(()) => info!(service = %record.name, "Service stopped"),
                Err(source) => {
                    warn!(service = %record.name, error = %source, "Service stop failed");
                    failures.0.push(StopFailure {
                        service: record.name,
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.into())
        }
    }

    /// Names of the services currently on the stack, in start order.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().iter().map(|r| r.name.clone()).collect()
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }
}
