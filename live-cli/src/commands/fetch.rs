//! One-shot event retrieval.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use livewatch_client::{EventSource, HttpEventSource, LiveConfig};
use livewatch_types::{EventsQuery, Timestamp};
use std::io::Write;

/// Run the fetch command.
pub async fn run(config: &LiveConfig, since: Option<&str>, limit: Option<u32>) -> Result<()> {
    let since = since.map(parse_since).transpose()?;
    let limit = limit.unwrap_or(config.sync.page_size);

    let source = HttpEventSource::from_config(&config.api).context("Invalid API configuration")?;
    let events = source
        .fetch_events(&EventsQuery::new(limit, since))
        .await
        .with_context(|| format!("Failed to fetch events from {}", source.events_url()))?;
    tracing::debug!(count = events.len(), "events fetched");

    let mut stdout = std::io::stdout().lock();
    for event in &events {
        serde_json::to_writer(&mut stdout, event)?;
        writeln!(stdout)?;
    }

    Ok(())
}

/// Parse a `--since` value.
pub fn parse_since(value: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Invalid --since '{}', expected RFC 3339", value))
}
