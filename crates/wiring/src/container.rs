//! # Dependency Container
//!
//! The container owns the [`Registry`] and the [`ServiceManager`] and runs the three
//! stages that turn declarations into a running system:
//!
//! 1. **Register**: declarations go into the registry. Factory outputs are tagged
//!    `Fresh`; every factory input that nobody has declared yet gets a `FreshIfAbsent`
//!    placeholder so the graph stays well formed. A missing provider is only reported when
//!    something actually needs the value.
//! 2. **Calculate**: one edge per factory input (`input -> output`); factories without
//!    inputs and ready values hang off the sentinel identity. The graph is sorted from
//!    scratch on every build.
//! 3. **Execute**: identities are visited in topological order. Anything `Existing` is
//!    skipped, placeholders are skipped, and each remaining factory runs exactly once.
//!    Its outputs are started (if registered as services) and stored as `Existing`.
//!
//! ```rust
//! use std::sync::Arc;
//! use wiring::{AppContext, Container, Declaration};
//!
//! struct Greeting(String);
//! struct Banner(String);
//!
//! #[tokio::main]
//! async fn main() {
//!     let container = Container::new(AppContext::new());
//!     container
//!         .register([
//!             Declaration::factory(|g: Arc<Greeting>| Banner(format!("*** {} ***", g.0))).into(),
//!             Declaration::value(Greeting("hello".into())),
//!         ])
//!         .unwrap();
//!
//!     container.build().await.unwrap();
//!     let banner = container.registry().resolve::<Banner>().unwrap();
//!     assert_eq!(banner.0, "*** hello ***");
//!     container.down().await.unwrap();
//! }
//! ```

use crate::context::AppContext;
use crate::declaration::{Constructor, Declaration, Kind};
use crate::error::ContainerError;
use crate::graph::Graph;
use crate::identity::Identity;
use crate::registry::{Registry, Stored, Tag};
use crate::service::ServiceManager;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct Container {
    registry: Arc<Registry>,
    services: ServiceManager,
}

impl Container {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            services: ServiceManager::new(ctx),
        }
    }

    /// Shared handle to the registry, for services that resolve values from their tasks.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn services(&self) -> &ServiceManager {
        &self.services
    }

    pub fn is_up(&self) -> bool {
        self.services.is_up()
    }

    /// Adds declarations. Only allowed while the container is down.
    pub fn register(
        &self,
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> Result<(), ContainerError> {
        if self.services.is_up() {
            return Err(ContainerError::RegistrationClosed);
        }

        for declaration in declarations {
            match declaration.kind {
                Kind::Value { identity, value } => {
                    debug!(identity = %identity, "Register value");
                    self.registry
                        .add(identity, Stored::Value(value), Tag::Existing)?;
                }
                Kind::Factory(factory) => {
                    if let Some(identity) = factory.strays().first() {
                        return Err(ContainerError::NotAnOutput {
                            factory: factory.name(),
                            identity: identity.clone(),
                        });
                    }
                    for input in factory.inputs() {
                        self.registry
                            .add(input.clone(), Stored::Placeholder, Tag::FreshIfAbsent)?;
                    }
                    for output in factory.outputs() {
                        debug!(identity = %output.identity(), factory = factory.name(), "Register factory");
                        self.registry.add(
                            output.identity().clone(),
                            Stored::Factory(Arc::clone(&factory)),
                            Tag::Fresh,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Builds every registered declaration and starts the services among them.
    ///
    /// Fails with [`ContainerError::AlreadyRunning`] if called again before
    /// [`down`](Self::down). On failure the container stays up so that `down` can stop
    /// whatever was started before the error.
    #[instrument(skip(self))]
    pub async fn build(&self) -> Result<(), ContainerError> {
        self.services.make_as_up()?;
        let graph = self.calculate()?;
        self.exec(graph.result(), None).await?;
        info!(services = self.services.started().len(), "Dependencies built");
        Ok(())
    }

    /// Registers `target` and builds only what it needs, then runs it.
    ///
    /// Declarations that `target` does not depend on, directly or transitively, are left
    /// untouched, so services unrelated to the invocation never start.
    #[instrument(skip_all, fields(target = %target.identity()))]
    pub async fn invoke(&self, target: Declaration) -> Result<(), ContainerError> {
        let identity = target.identity().clone();
        self.register([target])?;
        self.services.make_as_up()?;

        let graph = self.calculate()?;
        let path = graph.ancestors(&identity);
        self.exec(graph.result(), Some(&path)).await
    }

    /// Calls `ctor` with values that are already built, without registering anything.
    pub fn inject<Args, C>(&self, ctor: C) -> Result<C::Output, ContainerError>
    where
        C: Constructor<Args>,
    {
        ctor.construct(&self.registry)
    }

    /// Stops every started service in reverse start order.
    pub async fn down(&self) -> Result<(), ContainerError> {
        self.services.down().await
    }

    fn calculate(&self) -> Result<Graph, ContainerError> {
        let mut graph = Graph::new();
        let mut add = |from: &Identity, to: &Identity| {
            graph
                .add_edge(from.clone(), to.clone())
                .map_err(|source| ContainerError::Edge {
                    from: from.clone(),
                    to: to.clone(),
                    source,
                })
        };

        let sentinel = Identity::none();
        for (identity, stored) in self.registry.snapshot() {
            match stored {
                Stored::Value(_) => add(&sentinel, &identity)?,
                Stored::Factory(factory) => {
                    if factory.inputs().is_empty() {
                        add(&sentinel, &identity)?;
                    }
                    for input in factory.inputs() {
                        add(input, &identity)?;
                    }
                }
                // Placeholders only show up as the source of their consumers' edges.
                Stored::Placeholder => {}
            }
        }

        graph.build()?;
        debug!(nodes = graph.result().len(), edges = graph.edge_count(), "Dependency graph sorted");
        Ok(graph)
    }

    async fn exec(
        &self,
        order: &[Identity],
        scope: Option<&HashSet<Identity>>,
    ) -> Result<(), ContainerError> {
        for identity in order {
            if identity.is_none() || scope.is_some_and(|s| !s.contains(identity)) {
                continue;
            }
            if self.registry.has_tag(identity, Tag::Existing) {
                continue;
            }

            let factory = match self.registry.get(identity)? {
                Stored::Factory(factory) => factory,
                Stored::Placeholder => {
                    debug!(identity = %identity, "No provider declared");
                    continue;
                }
                Stored::Value(_) => continue,
            };

            debug!(identity = identity.short(), factory = factory.name(), "Initializing");
            let values = factory
                .call(&self.registry)
                .map_err(|e| e.initializing(identity))?;

            for (output, value) in factory.outputs().iter().zip(values) {
                if let Some(lifecycle) = output.lifecycle(&value) {
                    self.services
                        .add_and_run(output.identity().to_string(), lifecycle)
                        .await?;
                }
                self.registry
                    .materialize(output.identity().clone(), value)
                    .map_err(|e| e.initializing(output.identity()))?;
            }
        }
        Ok(())
    }
}
