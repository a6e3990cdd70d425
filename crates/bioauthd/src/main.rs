use anyhow::{Context, Result};
use bioauth_core::{bus, SqlitePersistence};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod worker;

use config::{BusKind, Config};
use dbus_interface::RegistryService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("bioauthd starting");

    let config = Config::from_env();
    tracing::info!(
        db = %config.db_path.display(),
        bus = ?config.bus,
        "configuration loaded"
    );

    let persistence = SqlitePersistence::open(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let handle = worker::spawn_registry(persistence, config.registry_config())?;

    let builder = match config.bus {
        BusKind::Session => zbus::connection::Builder::session()?,
        BusKind::System => zbus::connection::Builder::system()?,
    };
    let _connection = builder
        .name(bus::SERVICE_NAME)?
        .serve_at(bus::OBJECT_PATH, RegistryService::new(handle))?
        .build()
        .await
        .context("registering on D-Bus")?;

    tracing::info!(name = bus::SERVICE_NAME, "bioauthd ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("bioauthd shutting down");

    Ok(())
}
