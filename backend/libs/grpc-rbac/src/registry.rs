//! RBAC registry: identity -> public key + roles
//!
//! Built once during startup through [`RbacRegistryBuilder`], then frozen.
//! The registry is shared behind an `Arc` by every call and never mutated,
//! so lookups need no locking.

use crate::error::ConfigError;
use crypto_core::jwt::KeyResolver;
use crypto_core::keys;
use jsonwebtoken::DecodingKey;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One registered identity
#[derive(Clone)]
pub struct KeyEntry {
    identity: String,
    key_file: Option<PathBuf>,
    key: DecodingKey,
    roles: HashSet<String>,
}

impl KeyEntry {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// File the key was loaded from, if any
    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }

    pub fn key(&self) -> &DecodingKey {
        &self.key
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEntry")
            .field("identity", &self.identity)
            .field("key_file", &self.key_file)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Immutable identity registry
#[derive(Debug, Clone, Default)]
pub struct RbacRegistry {
    entries: HashMap<String, KeyEntry>,
}

impl RbacRegistry {
    pub fn builder() -> RbacRegistryBuilder {
        RbacRegistryBuilder::default()
    }

    pub fn lookup(&self, identity: &str) -> Option<&KeyEntry> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities, sorted for stable log output
    pub fn identities(&self) -> Vec<&str> {
        let mut identities: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        identities.sort_unstable();
        identities
    }
}

impl KeyResolver for RbacRegistry {
    fn resolve(&self, identity: &str) -> Option<&DecodingKey> {
        self.lookup(identity).map(KeyEntry::key)
    }
}

/// Startup-time registry assembly
///
/// Keys must be registered before roles are assigned to an identity.
/// Registering a key twice for the same identity replaces the key and keeps
/// its roles.
#[derive(Debug, Default)]
pub struct RbacRegistryBuilder {
    entries: HashMap<String, KeyEntry>,
}

impl RbacRegistryBuilder {
    /// Load an identity's PEM public key from disk
    pub fn register_key_file(
        &mut self,
        identity: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<&mut Self, ConfigError> {
        let identity = identity.into();
        let path = path.as_ref();
        let key = keys::load_public_key(path).map_err(|source| ConfigError::Key {
            identity: identity.clone(),
            source,
        })?;

        debug!(identity = %identity, key_file = %path.display(), "registered public key");
        self.insert_key(identity, Some(path.to_path_buf()), key);
        Ok(self)
    }

    /// Register an identity's public key from in-memory PEM
    pub fn register_key_pem(
        &mut self,
        identity: impl Into<String>,
        pem: &[u8],
    ) -> Result<&mut Self, ConfigError> {
        let identity = identity.into();
        let key = keys::parse_public_key_pem(pem).map_err(|source| ConfigError::Key {
            identity: identity.clone(),
            source,
        })?;

        self.insert_key(identity, None, key);
        Ok(self)
    }

    /// Grant a role to an already registered identity
    pub fn assign_role(
        &mut self,
        identity: &str,
        role: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        let role = role.into();
        match self.entries.get_mut(identity) {
            Some(entry) => {
                entry.roles.insert(role);
                Ok(self)
            }
            None => Err(ConfigError::UnknownIdentity {
                identity: identity.to_string(),
                role,
            }),
        }
    }

    /// Key file plus roles in one step
    pub fn register<I, R>(
        &mut self,
        identity: &str,
        public_key_file: impl AsRef<Path>,
        roles: I,
    ) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.register_key_file(identity, public_key_file)?;
        for role in roles {
            self.assign_role(identity, role)?;
        }
        Ok(self)
    }

    pub fn build(&mut self) -> RbacRegistry {
        RbacRegistry {
            entries: std::mem::take(&mut self.entries),
        }
    }

    fn insert_key(&mut self, identity: String, key_file: Option<PathBuf>, key: DecodingKey) {
        match self.entries.get_mut(&identity) {
            Some(entry) => {
                entry.key = key;
                entry.key_file = key_file;
            }
            None => {
                self.entries.insert(
                    identity.clone(),
                    KeyEntry {
                        identity,
                        key_file,
                        key,
                        roles: HashSet::new(),
                    },
                );
            }
        }
    }
}
