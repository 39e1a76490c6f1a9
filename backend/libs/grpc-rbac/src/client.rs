//! Client-side token attacher
//!
//! Signs one identity token when the interceptor is built and injects it
//! into the metadata of every outgoing gRPC request.

use crate::JWT_METADATA_KEY;
use crypto_core::jwt;
use crypto_core::keys;
use crypto_core::TokenError;
use std::path::Path;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::debug;

/// A signed token and the identity it claims
///
/// Created once per client instance and shared by all of its calls.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    identity: String,
    token: AsciiMetadataValue,
}

impl IssuedToken {
    /// Sign a token for `identity` with the given private key file
    ///
    /// ## Errors
    ///
    /// `TokenError::Key` if the key file is unreadable or not an RSA private
    /// key in PEM form, `TokenError::Signing` if signing fails.
    pub fn from_key_file(
        identity: impl Into<String>,
        private_key_file: impl AsRef<Path>,
    ) -> Result<Self, TokenError> {
        let identity = identity.into();
        let signing_key = keys::load_private_key(private_key_file)?;
        let token = jwt::issue(&identity, &signing_key)?;
        Self::from_parts(identity, token)
    }

    /// Sign a token for `identity` with an in-memory PEM private key
    pub fn from_pem(identity: impl Into<String>, private_key_pem: &[u8]) -> Result<Self, TokenError> {
        let identity = identity.into();
        let token = jwt::issue_with_pem(&identity, private_key_pem)?;
        Self::from_parts(identity, token)
    }

    fn from_parts(identity: String, token: String) -> Result<Self, TokenError> {
        // Compact JWS is base64url plus dots, always valid ASCII metadata
        let token = AsciiMetadataValue::try_from(token.as_str()).map_err(|_| {
            TokenError::Malformed(jsonwebtoken::errors::ErrorKind::InvalidToken.into())
        })?;
        Ok(Self { identity, token })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn token(&self) -> &AsciiMetadataValue {
        &self.token
    }
}

/// Client-side interceptor that attaches the identity token
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_rbac::RbacClientInterceptor;
/// use tonic::transport::Channel;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let interceptor = RbacClientInterceptor::new("joe", "keys/joe_id.pem")?;
///
/// let channel = Channel::from_static("http://127.0.0.1:2222")
///     .connect()
///     .await?;
///
/// // Attach to any generated client
/// // let mut client = ExampleClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RbacClientInterceptor {
    issued: IssuedToken,
}

impl RbacClientInterceptor {
    /// Read the private key once and sign the token every call will carry
    pub fn new(
        identity: impl Into<String>,
        private_key_file: impl AsRef<Path>,
    ) -> Result<Self, TokenError> {
        let issued = IssuedToken::from_key_file(identity, private_key_file)?;
        debug!(identity = %issued.identity, "issued client identity token");
        Ok(Self { issued })
    }

    pub fn from_pem(identity: impl Into<String>, private_key_pem: &[u8]) -> Result<Self, TokenError> {
        Ok(Self {
            issued: IssuedToken::from_pem(identity, private_key_pem)?,
        })
    }

    pub fn from_token(issued: IssuedToken) -> Self {
        Self { issued }
    }

    pub fn issued_token(&self) -> &IssuedToken {
        &self.issued
    }
}

impl Interceptor for RbacClientInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(JWT_METADATA_KEY, self.issued.token.clone());

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const JOE_PRIVATE_KEY: &str = include_str!("../tests/fixtures/joe_id.pem");

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_new_interceptor_signs_once() {
        let interceptor = RbacClientInterceptor::new("joe", fixture("joe_id.pem")).unwrap();
        let issued = interceptor.issued_token();

        assert_eq!(issued.identity(), "joe");
        let claim = jwt::decode_unverified(issued.token().to_str().unwrap()).unwrap();
        assert_eq!(claim.uid, "joe");
    }

    #[test]
    fn test_interceptor_injects_token() {
        let mut interceptor = RbacClientInterceptor::from_pem("joe", JOE_PRIVATE_KEY.as_bytes()).unwrap();
        let expected = interceptor.issued_token().token().clone();

        let request = interceptor.call(Request::new(())).unwrap();

        let token = request.metadata().get(JWT_METADATA_KEY);
        assert_eq!(token, Some(&expected));
        assert!(request.metadata().get("authorization").is_none());
    }

    #[test]
    fn test_every_call_carries_the_same_token() {
        let mut interceptor = RbacClientInterceptor::from_pem("joe", JOE_PRIVATE_KEY.as_bytes()).unwrap();
        let mut cloned = interceptor.clone();

        let first = interceptor.call(Request::new(())).unwrap();
        let second = interceptor.call(Request::new(())).unwrap();
        let third = cloned.call(Request::new(())).unwrap();

        let first = first.metadata().get(JWT_METADATA_KEY).unwrap();
        assert_eq!(Some(first), second.metadata().get(JWT_METADATA_KEY));
        assert_eq!(Some(first), third.metadata().get(JWT_METADATA_KEY));
    }

    #[test]
    fn test_missing_key_file() {
        let err = RbacClientInterceptor::new("joe", fixture("nobody_id.pem")).unwrap_err();
        assert!(matches!(err, TokenError::Key(_)));
    }

    #[test]
    fn test_malformed_key() {
        let err = RbacClientInterceptor::from_pem("joe", b"-----BEGIN GARBAGE-----").unwrap_err();
        assert!(matches!(err, TokenError::Key(_)));
    }
}
