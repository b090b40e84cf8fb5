//! # Container Errors
//!
//! This module defines the error types used throughout the container. Graph problems,
//! registry conflicts, factory and service failures all surface as [`ContainerError`],
//! each variant carrying the identity it concerns so the orchestrator can log one line
//! that says what broke and where.

use crate::identity::Identity;
use std::fmt;

/// Error type carried out of user factories and services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by the topological sorter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("edge [{0}->{0}] points at itself")]
    SelfReference(Identity),
    #[error("can't do topological sorting, unsatisfiable dependencies: {}", join(.remaining))]
    Unsatisfiable { remaining: Vec<Identity> },
    #[error("can't do topological sorting, graph has no edges")]
    Empty,
}

/// Errors that can occur while registering, building or tearing down dependencies.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("dependency [{0}] already initiated")]
    AlreadyInitiated(Identity),
    #[error("dependency [{0}] not initiated")]
    NotInitiated(Identity),
    #[error("dependency [{identity}] is not a {expected}")]
    TypeMismatch {
        identity: Identity,
        expected: &'static str,
    },
    #[error("can't add [{from}->{to}] to graph: {source}")]
    Edge {
        from: Identity,
        to: Identity,
        #[source]
        source: GraphError,
    },
    #[error("dependency graph calculation: {0}")]
    Graph(#[from] GraphError),
    #[error("initialize error [{identity}]: {source}")]
    Initialize {
        identity: Identity,
        #[source]
        source: Box<ContainerError>,
    },
    #[error("{0}")]
    Factory(BoxError),
    #[error("service initialization error [{service}]: {source}")]
    ServiceStart {
        service: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Shutdown(#[from] ShutdownErrors),
    #[error("dependencies builder is already running")]
    AlreadyRunning,
    #[error("dependencies are not running yet")]
    NotRunning,
    #[error("dependencies builder is running, registration is closed")]
    RegistrationClosed,
    #[error("factory [{factory}] marks [{identity}] as a service but does not return it")]
    NotAnOutput {
        factory: &'static str,
        identity: Identity,
    },
}

impl ContainerError {
    /// Wraps `self` with the identity whose initialization failed.
    pub(crate) fn initializing(self, identity: &Identity) -> Self {
        ContainerError::Initialize {
            identity: identity.clone(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `Initialize` wrappers.
    pub fn root(&self) -> &ContainerError {
        match self {
            ContainerError::Initialize { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for the unsatisfiable-graph family (cycles and self references).
    pub fn is_cycle(&self) -> bool {
        matches!(
            self.root(),
            ContainerError::Graph(GraphError::Unsatisfiable { .. })
                | ContainerError::Edge {
                    source: GraphError::SelfReference(_),
                    ..
                }
        )
    }
}

/// A single service that failed to stop.
#[derive(Debug)]
pub struct StopFailure {
    pub service: String,
    pub source: BoxError,
}

/// Every stop failure collected during one teardown, in stop order.
#[derive(Debug, Default)]
pub struct ShutdownErrors(pub Vec<StopFailure>);

impl ShutdownErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "down [{}] service error: {}", failure.service, failure.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownErrors {}

fn join(ids: &[Identity]) -> String {
    ids.iter()
        .map(Identity::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
