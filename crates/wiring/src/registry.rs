//! # Type Registry
//!
//! Concurrency-safe map from [`Identity`] to what is known about it: a materialized value,
//! the factory that will produce it, or a placeholder standing in for an input nobody has
//! declared yet. Each entry carries a [`Tag`] recording its provenance.
//!
//! The build path is the only writer. Services started during a build may hand the
//! registry to their own tasks and read from it while later stages are still running, so
//! every access goes through an `RwLock`.

use crate::declaration::Factory;
use crate::error::ContainerError;
use crate::identity::Identity;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A materialized, shareable value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Provenance of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Declared by a factory that has not run yet.
    Fresh,
    /// Placeholder for an input; yields to any real declaration.
    FreshIfAbsent,
    /// Holds a constructed value.
    Existing,
}

#[derive(Clone)]
pub enum Stored {
    Value(Value),
    Factory(Arc<Factory>),
    Placeholder,
}

impl std::fmt::Debug for Stored {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stored::Value(_) => f.write_str("Value"),
            Stored::Factory(factory) => write!(f, "Factory({})", factory.name()),
            Stored::Placeholder => f.write_str("Placeholder"),
        }
    }
}

struct Entry {
    stored: Stored,
    tag: Tag,
}

#[derive(Default)]
pub struct Registry {
    data: RwLock<HashMap<Identity, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `stored` under `identity`.
    ///
    /// A placeholder (`FreshIfAbsent`) never replaces anything and never fails. Any other
    /// tag fails with [`ContainerError::AlreadyInitiated`] when a real declaration or value
    /// already occupies the identity, and replaces a placeholder otherwise.
    pub fn add(&self, identity: Identity, stored: Stored, tag: Tag) -> Result<(), ContainerError> {
        let mut data = self.data.write();
        if let Some(current) = data.get(&identity) {
            if tag == Tag::FreshIfAbsent {
                return Ok(());
            }
            if current.tag != Tag::FreshIfAbsent {
                return Err(ContainerError::AlreadyInitiated(identity));
            }
        }
        data.insert(identity, Entry { stored, tag });
        Ok(())
    }

    /// Records the value a factory produced, turning the entry `Existing`.
    pub(crate) fn materialize(&self, identity: Identity, value: Value) -> Result<(), ContainerError> {
        let mut data = self.data.write();
        if matches!(data.get(&identity), Some(entry) if entry.tag == Tag::Existing) {
            return Err(ContainerError::AlreadyInitiated(identity));
        }
        data.insert(
            identity,
            Entry {
                stored: Stored::Value(value),
                tag: Tag::Existing,
            },
        );
        Ok(())
    }

    pub fn get(&self, identity: &Identity) -> Result<Stored, ContainerError> {
        self.data
            .read()
            .get(identity)
            .map(|entry| entry.stored.clone())
            .ok_or_else(|| ContainerError::NotInitiated(identity.clone()))
    }

    /// The materialized value under `identity`; declarations that have not run yet and
    /// placeholders count as not initiated.
    pub fn value(&self, identity: &Identity) -> Result<Value, ContainerError> {
        match self.get(identity)? {
            Stored::Value(value) => Ok(value),
            _ => Err(ContainerError::NotInitiated(identity.clone())),
        }
    }

    /// Typed lookup of a materialized `T`.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let identity = Identity::of::<T>();
        self.value(&identity)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                identity,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn has_tag(&self, identity: &Identity, tag: Tag) -> bool {
        self.tag(identity) == Some(tag)
    }

    pub fn tag(&self, identity: &Identity) -> Option<Tag> {
        self.data.read().get(identity).map(|entry| entry.tag)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.data.read().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Every entry, copied out under one read lock.
    pub(crate) fn snapshot(&self) -> Vec<(Identity, Stored)> {
        self.data
            .read()
            .iter()
            .map(|(identity, entry)| (identity.clone(), entry.stored.clone()))
            .collect()
    }
}
