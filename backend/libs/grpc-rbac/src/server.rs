//! Server-side authorization gate
//!
//! [`AuthGate`] decides a single call: metadata -> token -> signature ->
//! method policy -> role match, stopping at the first failure. [`RbacLayer`]
//! runs the gate in front of every request reaching a tonic router and either
//! forwards the request (with an [`AuthContext`] in its extensions) or answers
//! with the uniform rejection status without touching the handler.
//!
//! A tower layer is used rather than a `tonic::service::Interceptor` because
//! interceptors never see the request path, and the policy is per method.

use crate::claims::AuthContext;
use crate::error::{rejection_status, AuthError};
use crate::policy::{roles_match, MethodPolicyTable};
use crate::registry::RbacRegistry;
use crate::JWT_METADATA_KEY;
use crypto_core::jwt;
use crypto_core::TokenError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tonic::body::BoxBody;
use tonic::codegen::{empty_body, http};
use tonic::metadata::{MetadataMap, GRPC_CONTENT_TYPE};
use tonic::Status;
use tower::{Layer, Service};
use tracing::{error, info, warn};

/// Per-call authorization against a frozen registry and policy table
///
/// Cheap to clone; both tables sit behind `Arc` and are only read.
#[derive(Debug, Clone)]
pub struct AuthGate {
    registry: Arc<RbacRegistry>,
    policies: Arc<MethodPolicyTable>,
}

impl AuthGate {
    pub fn new(registry: RbacRegistry, policies: MethodPolicyTable) -> Self {
        Self::from_shared(Arc::new(registry), Arc::new(policies))
    }

    pub fn from_shared(registry: Arc<RbacRegistry>, policies: Arc<MethodPolicyTable>) -> Self {
        Self { registry, policies }
    }

    pub fn registry(&self) -> &RbacRegistry {
        &self.registry
    }

    pub fn policies(&self) -> &MethodPolicyTable {
        &self.policies
    }

    /// Run every check for one call and report the precise outcome
    ///
    /// ## Errors
    ///
    /// - `AuthError::NoMetadata` if the call carries no metadata
    /// - `AuthError::NoToken` if the `jwt` entry is absent
    /// - `AuthError::InvalidToken` for a malformed token, empty or unknown
    ///   identity, or a bad signature
    /// - `AuthError::MethodNotConfigured` if `method` has no policy
    /// - `AuthError::InsufficientRole` if no role overlaps the policy
    pub fn authorize(
        &self,
        metadata: Option<&MetadataMap>,
        method: &str,
    ) -> Result<AuthContext, AuthError> {
        let metadata = metadata.ok_or(AuthError::NoMetadata)?;

        let token = metadata.get(JWT_METADATA_KEY).ok_or(AuthError::NoToken)?;
        let token = token.to_str().map_err(|_| {
            TokenError::Malformed(jsonwebtoken::errors::ErrorKind::InvalidToken.into())
        })?;

        let claim = jwt::verify(token, self.registry.as_ref())?;
        let entry = self
            .registry
            .lookup(&claim.uid)
            .ok_or_else(|| TokenError::UnknownIdentity(claim.uid.clone()))?;

        let required = self
            .policies
            .required_roles(method)
            .ok_or(AuthError::MethodNotConfigured)?;

        if !roles_match(entry.roles(), required) {
            return Err(AuthError::InsufficientRole {
                identity: claim.uid,
            });
        }

        Ok(AuthContext::from_entry(entry))
    }

    /// [`authorize`](Self::authorize) plus logging, with the failure reason
    /// replaced by the uniform rejection status
    pub fn check(&self, metadata: Option<&MetadataMap>, method: &str) -> Result<AuthContext, Status> {
        info!(method = %method, "AUTHORIZE");

        match self.authorize(metadata, method) {
            Ok(context) => {
                info!(identity = %context.identity, method = %method, "AUTHORIZED");
                #[cfg(feature = "metrics")]
                crate::metrics::record_decision(self.method_label(method), "allowed");
                Ok(context)
            }
            Err(err) => {
                warn!(method = %method, reason = err.reason(), error = %err, "REJECT");
                #[cfg(feature = "metrics")]
                crate::metrics::record_decision(self.method_label(method), err.reason());
                Err(err.into_status())
            }
        }
    }

    /// Label for per-method metrics
    ///
    /// The path comes from the caller before authentication, so only paths
    /// with a policy are used verbatim; every other path shares
    /// [`UNCONFIGURED_METHOD_LABEL`].
    pub fn method_label<'a>(&self, method: &'a str) -> &'a str {
        if self.policies.required_roles(method).is_some() {
            method
        } else {
            UNCONFIGURED_METHOD_LABEL
        }
    }
}

/// Metrics label shared by every method path without a policy
pub const UNCONFIGURED_METHOD_LABEL: &str = "unconfigured";

/// Tower layer that puts an [`AuthGate`] in front of a gRPC router
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_rbac::{AuthGate, MethodPolicyTable, RbacLayer, RbacRegistry};
/// use tonic::transport::Server;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = RbacRegistry::builder()
///     .register("joe", "keys/joe_id.pub.pem", ["reader"])?
///     .build();
/// let policies = MethodPolicyTable::builder()
///     .allow("/example.Example/GetServiceValue", ["reader", "writer"])
///     .build();
///
/// let layer = RbacLayer::new(AuthGate::new(registry, policies));
/// // Server::builder().layer(layer).add_service(ExampleServer::new(svc)).serve(addr).await?;
/// # let _ = (layer, Server::builder());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RbacLayer {
    gate: AuthGate,
}

impl RbacLayer {
    pub fn new(gate: AuthGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for RbacLayer {
    type Service = RbacService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RbacService {
            inner: service,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RbacService<S> {
    inner: S,
    gate: AuthGate,
}

impl<S, B> Service<http::Request<B>> for RbacService<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        let method = request.uri().path().to_string();
        let metadata = MetadataMap::from_headers(request.headers().clone());

        match self.gate.check(Some(&metadata), &method) {
            Ok(context) => {
                request.extensions_mut().insert(context);

                // The readied service handles this call, a fresh clone takes its slot
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(async move { inner.call(request).await })
            }
            Err(_) => {
                let response = rejection_response();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

/// Trailers-only gRPC response carrying the uniform rejection status
fn rejection_response() -> http::Response<BoxBody> {
    let mut response = http::Response::new(empty_body());
    let headers = response.headers_mut();
    headers.insert(http::header::CONTENT_TYPE, GRPC_CONTENT_TYPE);

    if let Err(err) = rejection_status().add_header(headers) {
        error!(error = %err, "failed to encode rejection status");
    }

    response
}
