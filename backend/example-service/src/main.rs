/// Example Server Entry Point
///
/// Loads the user registry from the environment and serves example.Example
/// behind the RBAC layer until Ctrl+C or SIGTERM.
use anyhow::{Context, Result};
use example_service::{build_gate, config::ServerSettings, init_tracing, ExampleServer, ExampleService};
use grpc_rbac::RbacLayer;
use tokio::signal;
use tonic::transport::Server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Example Service");

    let settings = ServerSettings::from_env().context("Failed to load configuration")?;

    let gate = build_gate(&settings).context("Failed to build RBAC registry")?;
    for identity in gate.registry().identities() {
        if let Some(entry) = gate.registry().lookup(identity) {
            let mut roles: Vec<_> = entry.roles().iter().map(String::as_str).collect();
            roles.sort_unstable();
            info!(
                identity = %identity,
                key_file = ?entry.key_file(),
                roles = ?roles,
                "registered user"
            );
        }
    }
    for method in gate.policies().methods() {
        info!(method = %method, "method secured");
    }

    info!("Starting gRPC server on {}", settings.listen_addr);

    Server::builder()
        .layer(RbacLayer::new(gate))
        .add_service(ExampleServer::new(ExampleService))
        .serve_with_shutdown(settings.listen_addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("Example service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
