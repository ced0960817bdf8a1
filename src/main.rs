// Reads inbound chat events as JSON lines on stdin and writes render records to stdout

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use chatline::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging (stderr, stdout carries records)
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting chatline v{}", chatline::VERSION);

    let config_dir = env::var("CHATLINE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let mut config = EngineConfig::load_or_create(&config_dir).await?;
    config.apply_env_overrides();
    config.validate()?;

    if config.identity.username.is_empty() {
        warn!("No login configured, self-mention detection is disabled");
    }

    let fetcher = Arc::new(TwitchResourceFetcher::new(config.endpoints.clone())?);
    let cache = Arc::new(ResourceCache::new(fetcher));

    let mut cache_events = cache.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = cache_events.recv().await {
            match event {
                CacheEvent::Populated { scope, kind, entries } => {
                    debug!("Cache ready: {} {} ({} entries)", scope, kind, entries);
                }
                CacheEvent::PopulationFailed { scope, kind, error } => {
                    warn!("Cache for {} {} stays empty: {}", scope, kind, error);
                }
            }
        }
    });

    cache.spawn_load_globals();

    let identity = Arc::new(StaticIdentity::new(config.identity.username.clone()));
    let parser = MessageParser::from_config(Arc::clone(&cache), identity, &config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut processed: u64 = 0;

    info!("Reading chat events from stdin");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let raw: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Skipping line that is not JSON: {}", e);
                continue;
            }
        };

        for record in parser.classify_value(&raw).await {
            let mut out = serde_json::to_string(&record)?;
            out.push('\n');
            stdout.write_all(out.as_bytes()).await?;
        }
        stdout.flush().await?;
        processed += 1;
    }

    info!("Processed {} chat events", processed);
    Ok(())
}
