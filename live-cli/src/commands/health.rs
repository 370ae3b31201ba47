//! Probe the events API.

use anyhow::{Context, Result};
use livewatch_client::{EventSource, HttpEventSource, LiveConfig};

/// Run the health command. Fails when the API is unreachable.
pub async fn run(config: &LiveConfig) -> Result<()> {
    let source = HttpEventSource::from_config(&config.api).context("Invalid API configuration")?;

    if source.check_health().await {
        println!("{}: reachable", source.health_url());
        Ok(())
    } else {
        println!("{}: unreachable", source.health_url());
        anyhow::bail!("events API is unreachable")
    }
}
