//! Address reservation.
//!
//! Inside one container an address may be claimed by at most one live
//! interface. The claim is held as an [`AddressLease`]; releasing the lease
//! frees the address.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{EndpointError, EndpointResult};

/// Set of addresses reserved inside one container.
#[derive(Debug, Default)]
pub struct AddressRegistry {
    reserved: Mutex<HashSet<String>>,
}

impl AddressRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reserve `address`. Callers outside the crate go through
    /// [`AddressLease::acquire`].
    ///
    /// # Errors
    ///
    /// `AddressInUse` if the address is already reserved.
    pub(crate) fn reserve(&self, address: &str) -> EndpointResult<()> {
        if !self.reserved.lock().insert(address.to_string()) {
            return Err(EndpointError::AddressInUse(address.to_string()));
        }
        debug!(address, "Address reserved");
        Ok(())
    }

    /// Free `address`. Only a dropped lease releases a reservation; freeing an
    /// address that is not reserved is logged and otherwise ignored.
    pub(crate) fn release(&self, address: &str) {
        if self.reserved.lock().remove(address) {
            debug!(address, "Address freed");
        } else {
            warn!(address, "Tried to free an address which was not reserved");
        }
    }

    /// Whether `address` is reserved.
    pub fn is_reserved(&self, address: &str) -> bool {
        self.reserved.lock().contains(address)
    }

    /// Number of reserved addresses.
    pub fn len(&self) -> usize {
        self.reserved.lock().len()
    }

    /// Whether no address is reserved.
    pub fn is_empty(&self) -> bool {
        self.reserved.lock().is_empty()
    }
}

/// Reservation of one address, freed on release or drop.
#[derive(Debug)]
pub struct AddressLease {
    registry: Arc<AddressRegistry>,
    address: String,
}

impl AddressLease {
    /// Reserve `address` in `registry`.
    pub fn acquire(registry: &Arc<AddressRegistry>, address: &str) -> EndpointResult<Self> {
        registry.reserve(address)?;
        Ok(Self {
            registry: Arc::clone(registry),
            address: address.to_string(),
        })
    }

    /// The reserved address.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for AddressLease {
    fn drop(&mut self) {
        self.registry.release(&self.address);
    }
}
