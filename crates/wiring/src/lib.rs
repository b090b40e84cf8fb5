//! # Wiring
//!
//! A dependency-injection container with an ordered service lifecycle. Applications hand
//! it values and factory closures; the container works out the construction order from the
//! closures' parameter types, builds every value exactly once, starts the values that are
//! services as soon as they exist, and stops them again in exact reverse order.
//!
//! ## Architecture Overview
//!
//! Data flows one direction only:
//!
//! ```text
//! declarations -> graph edges -> topological order -> values -> started services
//! ```
//!
//! 1. **Declarations** ([`Declaration`], [`Modules`]) describe what exists and how to make it.
//! 2. **Registry** ([`Registry`]) maps each type [`Identity`] to a value, a factory or a
//!    placeholder.
//! 3. **Graph** ([`Graph`]) orders identities so every input is built before its consumers.
//! 4. **Container** ([`Container`]) walks that order, runs factories and hands services to
//!    the [`ServiceManager`].
//! 5. **App** ([`App`]) wraps it all in config loading, logging, signal handling and an exit
//!    code.
//!
//! ## Declaring Dependencies
//!
//! A factory is an ordinary closure. Every parameter is an `Arc<T>` the container supplies;
//! the return value is what the factory provides.
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use wiring::{AppContext, BoxError, Container, Declaration, Service};
//!
//! struct Settings { addr: String }
//!
//! struct Server { addr: String }
//!
//! #[async_trait]
//! impl Service for Server {
//!     async fn up(&self) -> Result<(), BoxError> {
//!         println!("listening on {}", self.addr);
//!         Ok(())
//!     }
//!     async fn down(&self) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let container = Container::new(AppContext::new());
//!     container
//!         .register([
//!             Declaration::factory(|s: Arc<Settings>| Server { addr: s.addr.clone() }).service(),
//!             Declaration::value(Settings { addr: "127.0.0.1:8080".into() }),
//!         ])
//!         .unwrap();
//!
//!     container.build().await.unwrap();
//!     assert_eq!(container.services().started().len(), 1);
//!     container.down().await.unwrap();
//! }
//! ```
//!
//! Declaration order does not matter; only the parameter types do.
//!
//! ## Lifecycle Guarantees
//!
//! - A factory runs at most once per build.
//! - A service is started before anything that depends on it is constructed.
//! - Teardown stops services newest first and visits every one of them, even when some
//!   fail to stop. A service whose start failed is stopped too.
//! - `build` twice without `down` in between, or `down` without a build, is reported as
//!   [`ContainerError::AlreadyRunning`] / [`ContainerError::NotRunning`].
//!
//! ## Testing
//!
//! The [`mock`] module has a shared [`Journal`](mock::Journal) and mock services with
//! injectable start/stop failures, so a test can assert the exact lifecycle sequence.

pub mod app;
pub mod config;
pub mod container;
pub mod context;
pub mod declaration;
pub mod error;
pub mod graph;
pub mod identity;
pub mod logging;
pub mod mock;
pub mod registry;
pub mod service;

// Re-export core types for convenience
pub use app::{App, Exit};
pub use config::{ConfigError, Env, LogConfig, Sources};
pub use container::Container;
pub use context::AppContext;
pub use declaration::{
    Constructor, Declaration, Factory, FactoryDecl, Inject, Modules, Outputs, TupleDecl,
};
pub use error::{BoxError, ContainerError, GraphError, ShutdownErrors, StopFailure};
pub use graph::Graph;
pub use identity::Identity;
pub use logging::{setup_tracing, setup_tracing_with};
pub use registry::{Registry, Stored, Tag, Value};
pub use service::{ContextService, Lifecycle, Service, ServiceManager};
