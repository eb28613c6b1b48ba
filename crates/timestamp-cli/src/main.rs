//! tsnotes: command-line access to the video timestamp core.
//!
//! Resolves clipboard-style paths into locators, converts timestamps, lists the
//! markers embedded in a note and fetches media into local handles.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use timestamp_core::handle::{HandleStore, HttpFetcher, ResourceFetcher};
use timestamp_core::locator::{Locator, Resolver};
use timestamp_core::markers::{self, Marker};
use timestamp_core::settings::SettingsStore;
use timestamp_core::{MediaError, timestamp};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,timestamp_core=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cfg = match args.config.as_deref() {
        Some(path) => config::CliConfig::load(path)?,
        None => config::CliConfig::default(),
    };
    let data_file = cfg.data_file(args.data.as_deref());
    let vault_root = cfg.vault_root(args.vault.as_deref())?;

    match &args.cmd {
        cli::Command::Resolve { raw, bridge } => {
            let store = SettingsStore::open(&data_file)?;
            let resolver = Resolver::from_settings(vault_root, &store.settings());
            let locator = resolve(&resolver, raw, *bridge)?;
            println!("{locator}");
        }
        cli::Command::Encode { seconds } => {
            println!("{}", timestamp::encode(*seconds));
        }
        cli::Command::Decode { text } => {
            println!("{}", timestamp::decode(text)?);
        }
        cli::Command::Markers { file } => {
            let note = std::fs::read_to_string(file)
                .with_context(|| format!("read note {:?}", file))?;
            for marker in markers::scan_document(&note) {
                match marker {
                    Marker::Timestamp(m) => println!("timestamp\t{}\t{}", m.label, m.seconds),
                    Marker::Video(v) => println!("video\t{}\t{}", v.label, v.locator),
                }
            }
        }
        cli::Command::Fetch { raw, bridge } => {
            let store = SettingsStore::open(&data_file)?;
            let resolver = Resolver::from_settings(vault_root, &store.settings());
            let locator = resolve(&resolver, raw, *bridge)?;
            let bytes = HttpFetcher::new().fetch(&locator).await?;
            let handles = HandleStore::new();
            let handle = handles.create(locator, bytes);
            tracing::info!(origin = %handle.origin(), bytes = handle.len(), "fetched");
            println!("{}\t{}", handle.url(), handle.len());
        }
        cli::Command::Settings => {
            let store = SettingsStore::open(&data_file)?;
            let body = serde_json::to_string_pretty(&store.settings())
                .context("serialize settings")?;
            println!("{body}");
        }
    }

    Ok(())
}

fn resolve(resolver: &Resolver, raw: &str, bridge: bool) -> Result<Locator> {
    let resolved = if bridge {
        resolver.resolve_for_bridge(raw)
    } else {
        resolver.resolve(raw)
    };
    resolved.map_err(|err: MediaError| {
        if let Some(callout) = err.callout() {
            eprintln!("{callout}");
        }
        err.into()
    })
}
