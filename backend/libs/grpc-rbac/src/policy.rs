//! Method policy table: gRPC method path -> roles allowed to call it
//!
//! Keys are full transport paths (`/package.Service/Method`). A method that is
//! not in the table has no policy and is refused by the gate, whatever the
//! caller's roles.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct MethodPolicyTable {
    policies: HashMap<String, HashSet<String>>,
}

impl MethodPolicyTable {
    pub fn builder() -> MethodPolicyTableBuilder {
        MethodPolicyTableBuilder::default()
    }

    /// Roles permitted to invoke `method`, or `None` if unconfigured
    pub fn required_roles(&self, method: &str) -> Option<&HashSet<String>> {
        self.policies.get(method)
    }

    /// Configured method paths, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MethodPolicyTableBuilder {
    policies: HashMap<String, HashSet<String>>,
}

impl MethodPolicyTableBuilder {
    /// Allow `roles` to call `method`. Repeated calls for one method accumulate.
    pub fn allow<I, R>(mut self, method: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.policies
            .entry(method.into())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> MethodPolicyTable {
        MethodPolicyTable {
            policies: self.policies,
        }
    }
}

/// At least one role in common (not subset semantics)
pub fn roles_match(have: &HashSet<String>, required: &HashSet<String>) -> bool {
    !have.is_disjoint(required)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(roles: &[&str]) -> HashSet<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_required_roles() {
        let table = MethodPolicyTable::builder()
            .allow("/example.Example/GetServiceValue", ["reader", "writer"])
            .allow("/example.Example/SetServiceValue", ["writer"])
            .build();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.required_roles("/example.Example/GetServiceValue"),
            Some(&set(&["reader", "writer"]))
        );
        assert!(table.required_roles("/example.Example/DeleteEverything").is_none());
    }

    #[test]
    fn test_allow_accumulates() {
        let table = MethodPolicyTable::builder()
            .allow("/svc.S/M", ["a"])
            .allow("/svc.S/M", ["b"])
            .build();

        assert_eq!(table.required_roles("/svc.S/M"), Some(&set(&["a", "b"])));
        assert_eq!(table.methods(), vec!["/svc.S/M"]);
    }

    #[test]
    fn test_method_keys_are_verbatim() {
        let table = MethodPolicyTable::builder()
            .allow("/example.Example/GetServiceValue", ["reader"])
            .build();

        assert!(table.required_roles("example.Example/GetServiceValue").is_none());
        assert!(table.required_roles("/example.example/getservicevalue").is_none());
    }

    #[test]
    fn test_roles_match_any_overlap() {
        assert!(roles_match(&set(&["reader"]), &set(&["reader", "writer"])));
        assert!(roles_match(&set(&["reader", "admin"]), &set(&["admin"])));
        assert!(!roles_match(&set(&["writer"]), &set(&["reader"])));
        assert!(!roles_match(&set(&[]), &set(&["reader"])));
        assert!(!roles_match(&set(&["reader"]), &set(&[])));
    }
}
