//! Interface table shared by containers and robots.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::errors::{EndpointError, EndpointResult};
use super::interface::{Interface, InterfaceSpec};

/// Outcome of [`InterfaceTable::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new interface was created.
    Created,
    /// An identical interface already existed.
    Unchanged,
}

/// Tag-keyed interfaces of one endpoint.
#[derive(Debug, Default)]
pub struct InterfaceTable {
    interfaces: Mutex<HashMap<String, Arc<Interface>>>,
}

impl InterfaceTable {
    /// Insert a new interface built by `build`, or accept an identical
    /// re-add.
    ///
    /// `build` runs under the table lock and only when the tag is free, so
    /// side effects such as address reservation happen exactly once.
    pub fn insert(
        &self,
        spec: &InterfaceSpec,
        build: impl FnOnce() -> EndpointResult<Interface>,
    ) -> EndpointResult<Insertion> {
        let mut interfaces = self.interfaces.lock();

        if let Some(existing) = interfaces.get(&spec.tag) {
            if !existing.validate(spec) {
                return Err(EndpointError::DuplicateInterface(spec.tag.clone()));
            }
            info!(interface = %existing.reference(), "Tried to add the same interface twice");
            return Ok(Insertion::Unchanged);
        }

        let interface = Arc::new(build()?);
        interfaces.insert(spec.tag.clone(), interface);
        Ok(Insertion::Created)
    }

    /// Remove and detach an interface.
    pub fn remove(&self, tag: &str) -> EndpointResult<Arc<Interface>> {
        let interface = self
            .interfaces
            .lock()
            .remove(tag)
            .ok_or_else(|| EndpointError::InterfaceNotFound(tag.to_string()))?;
        interface.detach();
        Ok(interface)
    }

    /// Look up an interface.
    pub fn get(&self, tag: &str) -> Option<Arc<Interface>> {
        self.interfaces.lock().get(tag).cloned()
    }

    /// Sorted tags of all interfaces.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.interfaces.lock().keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Remove and detach every interface.
    pub fn clear(&self) {
        let drained: Vec<Arc<Interface>> = self.interfaces.lock().drain().map(|(_, i)| i).collect();
        for interface in drained {
            interface.detach();
        }
    }

    /// Number of interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.lock().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.interfaces.lock().is_empty()
    }
}
