/// Example Client
///
/// Signs an identity token, calls GetServiceValue (or SetServiceValue when
/// RBAC_CLIENT_WRITE is set) once and exits non-zero if the call fails.
use anyhow::{anyhow, Context, Result};
use example_service::{config::ClientSettings, connect, init_tracing, invoke};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = ClientSettings::from_env().context("Failed to load configuration")?;
    let method = if settings.write {
        "SetServiceValue"
    } else {
        "GetServiceValue"
    };

    let mut client = connect(&settings).await?;

    match invoke(&mut client, settings.write).await {
        Ok(()) => {
            info!(identity = %settings.identity, method = %method, "SUCCESS");
            Ok(())
        }
        Err(status) => {
            error!(
                identity = %settings.identity,
                method = %method,
                code = ?status.code(),
                message = %status.message(),
                "call failed"
            );
            Err(anyhow!("{method} failed: {}", status.message()))
        }
    }
}
