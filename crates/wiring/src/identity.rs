//! # Identities
//!
//! Every value the container produces or consumes is keyed by an [`Identity`]. For named
//! types this is the fully-qualified type name, so `Arc<Config>` in a factory signature and
//! a registered `Config` value meet under the same key. Closures that produce nothing
//! (tasks, invocations) have no nameable output type; they get an anonymous identity made
//! of a random token and the closure's signature, unique per registration.

use std::fmt;
use std::sync::Arc;

/// Key under which a declaration is registered and looked up.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(Arc<str>);

/// Reserved source of the edge given to declarations without inputs.
const NO_DEPENDENCY: &str = "<none>";

impl Identity {
    /// Identity of the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Arc::from(std::any::type_name::<T>()))
    }

    /// A fresh identity for a declaration that has no output type of its own.
    pub fn anonymous(signature: &str) -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(Arc::from(format!("{token}.{signature}")))
    }

    /// The sentinel "no dependency" identity.
    pub fn none() -> Self {
        Self(Arc::from(NO_DEPENDENCY))
    }

    pub fn is_none(&self) -> bool {
        &*self.0 == NO_DEPENDENCY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, for log lines (`app::db::Pool` -> `Pool`).
    pub fn short(&self) -> &str {
        let full: &str = &self.0;
        let name = full.split('<').next().unwrap_or(full);
        name.rsplit("::").next().unwrap_or(name)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}
