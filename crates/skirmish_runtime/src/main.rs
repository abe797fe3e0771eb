//! Skirmish Runtime
//!
//! Headless host: boots logging, loads settings and content, then runs the
//! demo encounter. Usage: `skirmish [data-dir]`.

mod demo;

use anyhow::{Context, Result};
use skirmish_battle::ExpressionEvaluator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn data_dir() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"))
}

fn main() -> Result<()> {
    let data = data_dir();
    let settings = skirmish_services::load_settings(data.join("settings.json"))
        .context("loading settings")?;

    // RUST_LOG wins over the settings file
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.logging.filter)
            .with_context(|| format!("invalid log filter '{}'", settings.logging.filter))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Skirmish kernel v{}", skirmish_core::VERSION);
    // skipped entries are logged by the loader
    let (catalog, _) =
        skirmish_services::load_catalog(data.join("catalog.json"), &ExpressionEvaluator)
            .context("loading catalog")?;

    let summary = demo::run(&settings, catalog)?;
    match summary.winner {
        Some(team) => tracing::info!(ticks = summary.ticks, %team, messages = summary.messages, "encounter won"),
        None => tracing::info!(ticks = summary.ticks, messages = summary.messages, "encounter ended without a winner"),
    }
    Ok(())
}
