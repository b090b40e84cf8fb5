//! # Application Context
//!
//! The root cancellation handle shared by the orchestrator and every context-aware service.
//! Closing it is the single "time to stop" signal of the process; it can be closed from a
//! signal handler, from a service that hit a fatal condition, or from a test.

use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct AppContext {
    token: CancellationToken,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the context. Later calls do nothing.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context has been closed.
    pub async fn done(&self) {
        self.token.cancelled().await
    }

    /// A child token for background tasks; cancelled together with this context.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }
}
