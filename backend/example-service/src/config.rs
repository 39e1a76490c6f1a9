//! Configuration for the example server and client
//!
//! Both binaries read environment variables (a `.env` file is honoured in
//! development) and fall back to the demo defaults: joe is a reader, mary a
//! writer, keys live under `keys/`.

use anyhow::{Context, Result};
use grpc_rbac::ConfigError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:2222";
pub const DEFAULT_USERS: &str = "joe:keys/joe_id.pub.pem,mary:keys/mary_id.pub.pem";
pub const DEFAULT_READERS: &str = "joe";
pub const DEFAULT_WRITERS: &str = "mary";

pub const DEFAULT_SERVER_ADDR: &str = "http://127.0.0.1:2222";
pub const DEFAULT_CLIENT_UID: &str = "joe";
pub const DEFAULT_CLIENT_KEY: &str = "keys/joe_id.pem";
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 5;

/// One `uid:public_key_file` entry of `RBAC_USERS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub identity: String,
    pub public_key_file: PathBuf,
}

/// Parse `uid:key_file`, splitting on the first `:`
pub fn parse_user_spec(spec: &str) -> Result<UserSpec, ConfigError> {
    let (identity, key_file) = spec
        .split_once(':')
        .ok_or_else(|| ConfigError::InvalidUserSpec(spec.to_string()))?;

    let identity = identity.trim();
    let key_file = key_file.trim();
    if identity.is_empty() || key_file.is_empty() {
        return Err(ConfigError::InvalidUserSpec(spec.to_string()));
    }

    Ok(UserSpec {
        identity: identity.to_string(),
        public_key_file: PathBuf::from(key_file),
    })
}

/// Comma separated list of user specs; blank entries are skipped
pub fn parse_user_specs(list: &str) -> Result<Vec<UserSpec>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|spec| !spec.is_empty())
        .map(parse_user_spec)
        .collect()
}

/// Comma separated identities; blank entries are skipped
pub fn parse_identity_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|identity| !identity.is_empty())
        .map(str::to_string)
        .collect()
}

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Address the gRPC server binds to
    pub listen_addr: SocketAddr,

    /// Registered identities and their public key files
    pub users: Vec<UserSpec>,

    /// Identities granted the `reader` role
    pub readers: Vec<String>,

    /// Identities granted the `writer` role
    pub writers: Vec<String>,
}

impl ServerSettings {
    /// Load from `RBAC_LISTEN_ADDR`, `RBAC_USERS`, `RBAC_READERS` and
    /// `RBAC_WRITERS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("RBAC_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .with_context(|| format!("Invalid RBAC_LISTEN_ADDR '{listen_addr}'"))?;

        let users = lookup("RBAC_USERS").unwrap_or_else(|| DEFAULT_USERS.to_string());
        let users = parse_user_specs(&users).context("Invalid RBAC_USERS")?;

        Ok(Self {
            listen_addr,
            users,
            readers: parse_identity_list(
                &lookup("RBAC_READERS").unwrap_or_else(|| DEFAULT_READERS.to_string()),
            ),
            writers: parse_identity_list(
                &lookup("RBAC_WRITERS").unwrap_or_else(|| DEFAULT_WRITERS.to_string()),
            ),
        })
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_addr: String,
    pub identity: String,
    pub private_key_file: PathBuf,
    /// Call SetServiceValue instead of GetServiceValue
    pub write: bool,
    pub timeout: Duration,
}

impl ClientSettings {
    /// Load from `RBAC_SERVER_ADDR`, `RBAC_CLIENT_UID`, `RBAC_CLIENT_KEY`,
    /// `RBAC_CLIENT_WRITE` and `RBAC_CLIENT_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let write = lookup("RBAC_CLIENT_WRITE")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        let timeout_secs = match lookup("RBAC_CLIENT_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid RBAC_CLIENT_TIMEOUT_SECS '{raw}'"))?,
            None => DEFAULT_CLIENT_TIMEOUT_SECS,
        };

        Ok(Self {
            server_addr: lookup("RBAC_SERVER_ADDR")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            identity: lookup("RBAC_CLIENT_UID").unwrap_or_else(|| DEFAULT_CLIENT_UID.to_string()),
            private_key_file: lookup("RBAC_CLIENT_KEY")
                .unwrap_or_else(|| DEFAULT_CLIENT_KEY.to_string())
                .into(),
            write,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_user_spec() {
        let spec = parse_user_spec("joe:keys/joe_id.pub.pem").unwrap();
        assert_eq!(spec.identity, "joe");
        assert_eq!(spec.public_key_file, PathBuf::from("keys/joe_id.pub.pem"));
    }

    #[test]
    fn test_parse_user_spec_splits_on_first_colon() {
        let spec = parse_user_spec("joe:C:/keys/joe.pem").unwrap();
        assert_eq!(spec.identity, "joe");
        assert_eq!(spec.public_key_file, PathBuf::from("C:/keys/joe.pem"));
    }

    #[test]
    fn test_parse_user_spec_invalid() {
        for spec in ["joe", ":keys/joe.pem", "joe:", ""] {
            let err = parse_user_spec(spec).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidUserSpec(_)), "{spec}");
        }
    }

    #[test]
    fn test_parse_user_specs_reports_bad_entry() {
        let err = parse_user_specs("joe:joe.pem,mary").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUserSpec(ref s) if s == "mary"));
    }

    #[test]
    fn test_parse_identity_list() {
        assert_eq!(parse_identity_list("joe, mary,,"), vec!["joe", "mary"]);
        assert!(parse_identity_list("").is_empty());
    }

    #[test]
    fn test_server_defaults() {
        let settings = ServerSettings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings.listen_addr, "127.0.0.1:2222".parse().unwrap());
        assert_eq!(settings.users.len(), 2);
        assert_eq!(settings.users[1].identity, "mary");
        assert_eq!(settings.readers, vec!["joe"]);
        assert_eq!(settings.writers, vec!["mary"]);
    }

    #[test]
    fn test_server_overrides() {
        let settings = ServerSettings::from_lookup(lookup(&[
            ("RBAC_LISTEN_ADDR", "0.0.0.0:50051"),
            ("RBAC_USERS", "ann:ann.pub.pem"),
            ("RBAC_READERS", "ann"),
            ("RBAC_WRITERS", ""),
        ]))
        .unwrap();

        assert_eq!(settings.listen_addr.port(), 50051);
        assert_eq!(settings.users[0].identity, "ann");
        assert_eq!(settings.readers, vec!["ann"]);
        assert!(settings.writers.is_empty());
    }

    #[test]
    fn test_server_invalid_user_spec_is_fatal() {
        let err = ServerSettings::from_lookup(lookup(&[("RBAC_USERS", "joe")])).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_server_invalid_listen_addr() {
        assert!(ServerSettings::from_lookup(lookup(&[("RBAC_LISTEN_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_client_defaults() {
        let settings = ClientSettings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings.server_addr, "http://127.0.0.1:2222");
        assert_eq!(settings.identity, "joe");
        assert_eq!(settings.private_key_file, PathBuf::from("keys/joe_id.pem"));
        assert!(!settings.write);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_overrides() {
        let settings = ClientSettings::from_lookup(lookup(&[
            ("RBAC_CLIENT_UID", "mary"),
            ("RBAC_CLIENT_KEY", "keys/mary_id.pem"),
            ("RBAC_CLIENT_WRITE", "true"),
            ("RBAC_CLIENT_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();

        assert_eq!(settings.identity, "mary");
        assert!(settings.write);
        assert_eq!(settings.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_client_invalid_timeout() {
        let err = ClientSettings::from_lookup(lookup(&[("RBAC_CLIENT_TIMEOUT_SECS", "soon")]));
        assert!(err.is_err());
    }
}
