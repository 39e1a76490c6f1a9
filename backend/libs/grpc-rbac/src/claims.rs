//! Authorized principal
//!
//! The gate stores an [`AuthContext`] in the request extensions once a call
//! has passed every check, so handlers can see who is calling.

use crate::registry::KeyEntry;
use std::collections::HashSet;

/// Identity and roles of an authorized caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Identity named by the verified token
    pub identity: String,

    /// Roles registered for that identity
    pub roles: HashSet<String>,
}

impl AuthContext {
    /// Build the context from the registry entry the token verified against
    pub fn from_entry(entry: &KeyEntry) -> Self {
        Self {
            identity: entry.identity().to_string(),
            roles: entry.roles().clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RbacRegistry;

    const JOE_PUBLIC_KEY: &str = include_str!("../tests/fixtures/joe_id.pub.pem");

    #[test]
    fn test_from_entry() {
        let registry = RbacRegistry::builder()
            .register_key_pem("joe", JOE_PUBLIC_KEY.as_bytes())
            .unwrap()
            .assign_role("joe", "reader")
            .unwrap()
            .build();

        let context = AuthContext::from_entry(registry.lookup("joe").unwrap());
        assert_eq!(context.identity, "joe");
        assert!(context.has_role("reader"));
        assert!(!context.has_role("writer"));
    }
}
