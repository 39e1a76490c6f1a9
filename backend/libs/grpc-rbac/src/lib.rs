//! Token authentication and role-based authorization for tonic services
//!
//! A client signs one RS256 identity token with its private key and sends it
//! as `jwt` metadata on every call. The server verifies it against the public
//! key registered for the claimed identity and checks the identity's roles
//! against the roles the invoked method requires.
//!
//! ## Core Components
//!
//! - **RbacRegistry**: identity -> public key + roles, frozen after startup
//! - **MethodPolicyTable**: method path -> roles allowed to call it
//! - **RbacClientInterceptor**: attaches the identity token to outgoing calls
//! - **AuthGate / RbacLayer**: verifies, authorizes and forwards (or rejects)
//!   every incoming call
//! - **AuthContextExt**: handler access to the authorized caller
//!
//! ## Usage Example
//!
//! ### Client Side
//!
//! ```rust,no_run
//! use grpc_rbac::RbacClientInterceptor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let interceptor = RbacClientInterceptor::new("joe", "keys/joe_id.pem")?;
//! let channel = tonic::transport::Channel::from_static("http://127.0.0.1:2222")
//!     .connect()
//!     .await?;
//!
//! // let mut client = ExampleClient::with_interceptor(channel, interceptor);
//! # let _ = (interceptor, channel);
//! # Ok(())
//! # }
//! ```
//!
//! ### Server Side
//!
//! ```rust,no_run
//! use grpc_rbac::{AuthGate, MethodPolicyTable, RbacLayer, RbacRegistry};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = RbacRegistry::builder()
//!     .register("joe", "keys/joe_id.pub.pem", ["reader"])?
//!     .register("mary", "keys/mary_id.pub.pem", ["writer"])?
//!     .build();
//!
//! let policies = MethodPolicyTable::builder()
//!     .allow("/example.Example/GetServiceValue", ["reader", "writer"])
//!     .allow("/example.Example/SetServiceValue", ["writer"])
//!     .build();
//!
//! let layer = RbacLayer::new(AuthGate::new(registry, policies));
//! // tonic::transport::Server::builder().layer(layer).add_service(...)
//! # let _ = layer;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Guarantees
//!
//! - Signature checked with the key of exactly the claimed identity
//! - Methods without a policy are refused (default deny)
//! - Every rejection is `Status::unauthenticated("not authorized")`; the
//!   reason is only logged on the server

mod claims;
mod client;
mod error;
mod extensions;
mod policy;
mod registry;
mod server;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use claims::AuthContext;
pub use client::{IssuedToken, RbacClientInterceptor};
pub use error::{AuthError, ConfigError, REJECTION_MESSAGE};
pub use extensions::AuthContextExt;
pub use policy::{roles_match, MethodPolicyTable, MethodPolicyTableBuilder};
pub use registry::{KeyEntry, RbacRegistry, RbacRegistryBuilder};
pub use server::{AuthGate, RbacLayer, RbacService, UNCONFIGURED_METHOD_LABEL};

// Re-export tonic Status for convenience
pub use tonic::Status;

/// Metadata key carrying the identity token
pub const JWT_METADATA_KEY: &str = "jwt";
