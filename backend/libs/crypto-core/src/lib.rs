//! Key material and token codec shared by the RBAC gRPC stack.
//!
//! - [`keys`]: PEM loading for RSA signing and verification keys
//! - [`jwt`]: RS256 token issuance and the two-phase (claim, then signature)
//!   verification used by the server gate

pub mod jwt;
pub mod keys;

pub use jwt::{Claim, KeyResolver, TokenError};
pub use keys::KeyError;
