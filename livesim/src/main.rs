mod server;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use livesim_core::{
    catalog::Catalog, config::Config, entropy::ThreadRngEntropy, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration: optional file via LIVESIM_CONFIG, environment
    // overrides on top.
    let config = match std::env::var("LIVESIM_CONFIG") {
        Ok(path) => Config::from_file(&path)?,
        Err(_) => Config::from_env()?,
    };

    // 2. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 3. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("livesim origin starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Base URL: {}", config.base_url());

    // 4. Build the catalog; the shared start reference anchors every
    // rendition's timeline.
    let started_at = chrono::Utc::now().timestamp_millis();
    let catalog = Arc::new(Catalog::new(
        &config.catalog,
        started_at,
        Arc::new(ThreadRngEntropy),
    )?);
    info!(renditions = catalog.len(), "Catalog initialized");

    // 5. Serve until shutdown
    server::run(config, catalog).await
}
