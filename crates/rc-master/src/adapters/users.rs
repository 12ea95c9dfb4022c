//! In-memory credential store.
//!
//! Passwords are kept as `hex(sha256(salt || password))` with a random
//! per-user salt.

use parking_lot::RwLock;
use rc_03_rpc_gateway::{UserError, UserRegistry};
use sha2::{Digest, Sha256};
use shared_types::is_legal_base_name;
use std::collections::BTreeMap;

struct Credential {
    salt: String,
    digest: String,
}

impl Credential {
    fn new(password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let digest = digest(&salt, password);
        Self { salt, digest }
    }

    fn matches(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.digest
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// User registry held in process memory.
#[derive(Default)]
pub struct InMemoryUserRegistry {
    users: RwLock<BTreeMap<String, Credential>>,
}

impl InMemoryUserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn check(name: &str, password: &str) -> Result<(), UserError> {
        if !is_legal_base_name(name) {
            return Err(UserError::IllegalName(name.to_string()));
        }
        if password.is_empty() {
            return Err(UserError::EmptyPassword);
        }
        Ok(())
    }
}

impl UserRegistry for InMemoryUserRegistry {
    fn list_users(&self) -> Vec<String> {
        self.users.read().keys().cloned().collect()
    }

    fn add_user(&self, name: &str, password: &str) -> Result<(), UserError> {
        Self::check(name, password)?;
        let mut users = self.users.write();
        if users.contains_key(name) {
            return Err(UserError::AlreadyExists(name.to_string()));
        }
        users.insert(name.to_string(), Credential::new(password));
        Ok(())
    }

    fn remove_user(&self, name: &str) -> Result<(), UserError> {
        self.users
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| UserError::UnknownUser(name.to_string()))
    }

    fn update_user(&self, name: &str, password: &str) -> Result<(), UserError> {
        Self::check(name, password)?;
        match self.users.write().get_mut(name) {
            Some(credential) => {
                *credential = Credential::new(password);
                Ok(())
            }
            None => Err(UserError::UnknownUser(name.to_string())),
        }
    }

    fn verify(&self, name: &str, password: &str) -> bool {
        self.users
            .read()
            .get(name)
            .is_some_and(|c| c.matches(password))
    }
}
