//! Couponly Server — application entry point.

use couponly_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("couponly=info".parse()?),
        )
        .json()
        .init();

    tracing::info!("Starting Couponly server...");

    let config = DbConfig::from_env();
    let db = DbManager::connect(&config).await?;
    couponly_db::run_migrations(db.client()).await?;

    // TODO: Mount the HTTP router (admin dashboard + public form API)
    //       once the transport layer lands.

    tracing::info!("Couponly server stopped.");
    Ok(())
}
