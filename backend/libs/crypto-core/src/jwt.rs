//! Identity token codec for the RBAC gRPC layer
//!
//! Tokens are compact RS256 JWTs carrying a single `uid` claim. Each identity
//! signs with its own private key; the server holds one public key per
//! identity, so verification is a two-phase affair:
//!
//! 1. read the claim without trusting it ([`decode_unverified`])
//! 2. look up the key registered for exactly that identity and check the
//!    signature against it ([`verify_signature`])
//!
//! [`verify`] composes both phases around a [`KeyResolver`].
//!
//! ## Security Design
//!
//! - **RS256 ONLY**: header `alg` must be RS256, anything else is rejected
//! - **Claim before key**: an empty identity fails before any key lookup
//! - **No expiry**: tokens carry no `exp`; callers re-issue by restarting
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crypto_core::jwt;
//! use std::collections::HashMap;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let signing_key = crypto_core::keys::load_private_key("joe_id.pem")?;
//! let token = jwt::issue("joe", &signing_key)?;
//!
//! let mut keys = HashMap::new();
//! keys.insert("joe".to_string(), crypto_core::keys::load_public_key("joe_id.pub.pem")?);
//!
//! let claim = jwt::verify(&token, &keys)?;
//! assert_eq!(claim.uid, "joe");
//! # Ok(())
//! # }
//! ```

use crate::keys::{self, KeyError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// JWT algorithm - the only one accepted on either side
const JWT_ALGORITHM: Algorithm = Algorithm::RS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Claim carried by an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Identity the bearer claims to be. Missing in the payload means empty.
    #[serde(default)]
    pub uid: String,
}

impl Claim {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    /// A claim is only usable when it names an identity
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.uid.is_empty() {
            return Err(TokenError::EmptyIdentity);
        }
        Ok(())
    }
}

/// Token issuance and verification failures
///
/// Every variant means "not authorized" to a remote caller. The distinction
/// only exists so the server can log why.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid signing key: {0}")]
    Key(#[from] KeyError),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("token claims no identity")]
    EmptyIdentity,

    #[error("no key registered for identity '{0}'")]
    UnknownIdentity(String),

    #[error("signature verification failed: {0}")]
    BadSignature(#[source] jsonwebtoken::errors::Error),
}

// ============================================================================
// Key Resolution
// ============================================================================

/// Maps a claimed identity to the public key registered for it
pub trait KeyResolver {
    fn resolve(&self, identity: &str) -> Option<&DecodingKey>;
}

impl KeyResolver for HashMap<String, DecodingKey> {
    fn resolve(&self, identity: &str) -> Option<&DecodingKey> {
        self.get(identity)
    }
}

impl<R: KeyResolver + ?Sized> KeyResolver for &R {
    fn resolve(&self, identity: &str) -> Option<&DecodingKey> {
        (**self).resolve(identity)
    }
}

// ============================================================================
// Token Generation
// ============================================================================

/// Sign an identity token
///
/// ## Returns
///
/// Compact JWT string (`header.payload.signature`) encoded with RS256
pub fn issue(identity: &str, signing_key: &EncodingKey) -> Result<String, TokenError> {
    let claim = Claim::new(identity);
    encode(&Header::new(JWT_ALGORITHM), &claim, signing_key).map_err(TokenError::Signing)
}

/// Sign an identity token with a PEM-encoded RSA private key
///
/// ## Errors
///
/// `TokenError::Key` if the PEM is not an RSA private key
pub fn issue_with_pem(identity: &str, private_key_pem: &[u8]) -> Result<String, TokenError> {
    let signing_key = keys::parse_private_key_pem(private_key_pem)?;
    issue(identity, &signing_key)
}

// ============================================================================
// Token Validation
// ============================================================================

/// Read the claim of a token WITHOUT checking its signature
///
/// Only use the result to pick the verification key. Never trust it for
/// anything else.
pub fn decode_unverified(token: &str) -> Result<Claim, TokenError> {
    let mut validation = base_validation();
    validation.insecure_disable_signature_validation();

    // The key is never consulted once signature validation is disabled
    decode::<Claim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(TokenError::Malformed)
}

/// Check the token signature against one specific public key
///
/// ## Errors
///
/// - `TokenError::BadSignature` if the signature or algorithm does not match
/// - `TokenError::Malformed` if the token cannot be parsed
pub fn verify_signature(token: &str, verifying_key: &DecodingKey) -> Result<Claim, TokenError> {
    decode::<Claim>(token, verifying_key, &base_validation())
        .map(|data| data.claims)
        .map_err(|e| {
            if is_signature_failure(e.kind()) {
                TokenError::BadSignature(e)
            } else {
                TokenError::Malformed(e)
            }
        })
}

/// Verify a token against the key registered for the identity it claims
///
/// The claim is validated before the resolver is consulted, so an empty
/// identity never reaches a key lookup.
pub fn verify<R: KeyResolver + ?Sized>(token: &str, resolver: &R) -> Result<Claim, TokenError> {
    let claimed = decode_unverified(token)?;
    claimed.validate()?;

    let verifying_key = resolver
        .resolve(&claimed.uid)
        .ok_or_else(|| TokenError::UnknownIdentity(claimed.uid.clone()))?;

    let claim = verify_signature(token, verifying_key)?;
    debug!(uid = %claim.uid, "token signature verified");
    Ok(claim)
}

/// RS256 only, and no registered claim is mandatory (tokens carry no `exp`)
fn base_validation() -> Validation {
    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation
}

fn is_signature_failure(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidRsaKey(_)
    )
}

// ============================================================================
// Tests
// ============================================================================
