//! Demo `example.Example` service protected by grpc-rbac
//!
//! Two unary methods, both `Empty -> Empty`:
//! - `GetServiceValue`: readers and writers
//! - `SetServiceValue`: writers only

pub mod config;

use anyhow::Context;
use config::{ClientSettings, ServerSettings};
use grpc_rbac::{
    AuthContextExt, AuthGate, ConfigError, MethodPolicyTable, RbacClientInterceptor, RbacRegistry,
};
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};
use tracing::info;

/// Generated server and client for `example.Example`
pub mod proto {
    /// google.protobuf.Empty
    pub type Empty = ();

    include!(concat!(env!("OUT_DIR"), "/example.Example.rs"));
}

pub use proto::example_client::ExampleClient;
pub use proto::example_server::{Example, ExampleServer};

pub const ROLE_READER: &str = "reader";
pub const ROLE_WRITER: &str = "writer";

pub const GET_SERVICE_VALUE: &str = "/example.Example/GetServiceValue";
pub const SET_SERVICE_VALUE: &str = "/example.Example/SetServiceValue";

/// Method -> roles allowed to call it
pub fn default_policies() -> MethodPolicyTable {
    MethodPolicyTable::builder()
        .allow(GET_SERVICE_VALUE, [ROLE_READER, ROLE_WRITER])
        .allow(SET_SERVICE_VALUE, [ROLE_WRITER])
        .build()
}

/// Register every configured user's key, then grant reader and writer roles
///
/// ## Errors
///
/// - `ConfigError::Key` if a public key file cannot be loaded
/// - `ConfigError::UnknownIdentity` if a reader or writer has no key
pub fn build_registry(settings: &ServerSettings) -> Result<RbacRegistry, ConfigError> {
    let mut builder = RbacRegistry::builder();

    for user in &settings.users {
        builder.register_key_file(user.identity.as_str(), &user.public_key_file)?;
    }
    for reader in &settings.readers {
        builder.assign_role(reader, ROLE_READER)?;
    }
    for writer in &settings.writers {
        builder.assign_role(writer, ROLE_WRITER)?;
    }

    Ok(builder.build())
}

/// Registry from `settings` plus the default policy table
pub fn build_gate(settings: &ServerSettings) -> Result<AuthGate, ConfigError> {
    Ok(AuthGate::new(build_registry(settings)?, default_policies()))
}

/// Client that stamps every call with the caller's identity token
pub type AuthenticatedClient = ExampleClient<InterceptedService<Channel, RbacClientInterceptor>>;

/// Sign the identity token and open a channel to the server
///
/// The token is signed once here and reused for every call on the client.
pub async fn connect(settings: &ClientSettings) -> anyhow::Result<AuthenticatedClient> {
    let interceptor =
        RbacClientInterceptor::new(settings.identity.as_str(), &settings.private_key_file)
            .with_context(|| {
                format!(
                    "Failed to sign identity token for '{}' with {}",
                    settings.identity,
                    settings.private_key_file.display()
                )
            })?;

    let channel = Endpoint::from_shared(settings.server_addr.clone())
        .with_context(|| format!("Invalid server address '{}'", settings.server_addr))?
        .connect_timeout(settings.timeout)
        .timeout(settings.timeout)
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", settings.server_addr))?;

    Ok(ExampleClient::with_interceptor(channel, interceptor))
}

/// One call: SetServiceValue when `write`, GetServiceValue otherwise
pub async fn invoke(client: &mut AuthenticatedClient, write: bool) -> Result<(), Status> {
    if write {
        client.set_service_value(()).await?;
    } else {
        client.get_service_value(()).await?;
    }
    Ok(())
}

/// Install the JSON tracing subscriber used by both binaries
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "example_service=info,grpc_rbac=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();
}

/// Handlers only log; authorization already happened in the layer
#[derive(Debug, Default, Clone)]
pub struct ExampleService;

#[tonic::async_trait]
impl Example for ExampleService {
    async fn get_service_value(&self, request: Request<()>) -> Result<Response<()>, Status> {
        let caller = request.auth_context()?;
        info!(identity = %caller.identity, "GetServiceValue invoked");
        Ok(Response::new(()))
    }

    async fn set_service_value(&self, request: Request<()>) -> Result<Response<()>, Status> {
        let caller = request.auth_context()?;
        info!(identity = %caller.identity, "SetServiceValue invoked");
        Ok(Response::new(()))
    }
}
