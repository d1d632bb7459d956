//! offcache command-line host.
//!
//! Drives the interception engine the way an embedding client would: one
//! intercepted request per invocation, with connectivity supplied by flags.
//! Logging goes to stderr so stdout carries only the JSON summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use offcache_core::{AppConfig, CacheKey, CachePolicy, ContentStore, ManualConnectivity, RequestDescriptor};
use offcache_engine::InterceptionEngine;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "offcache", version, about = "Offline-first caching intermediary for resource fetches")]
struct Cli {
    /// Override the configured cache directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Intercept one request through the engine.
    Fetch(FetchArgs),
    /// Show the stored entry for a URL without touching the network.
    Get { url: String },
    /// Print the cache key and artifact paths for a URL.
    Key { url: String },
}

#[derive(Debug, Args)]
struct FetchArgs {
    url: String,

    /// HTTP method to forward.
    #[arg(long, default_value = "GET")]
    method: String,

    /// Request header as `Name: value`; may be repeated.
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Treat the network as unavailable.
    #[arg(long)]
    offline: bool,

    /// Bypass the cache for this request.
    #[arg(long)]
    force_reload: bool,

    /// Override the configured policy.
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Write the response body to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Time to keep running so a background refresh can land.
    #[arg(long, default_value_t = 1_500)]
    linger_ms: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    OnlineFirst,
    CacheFirst,
}

impl From<PolicyArg> for CachePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::OnlineFirst => CachePolicy::OnlineFirst,
            PolicyArg::CacheFirst => CachePolicy::CacheFirst,
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Debug, Serialize)]
struct FetchSummary {
    url: String,
    key: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<ResponseSummary>,
}

#[derive(Debug, Serialize)]
struct ResponseSummary {
    status_code: u16,
    reason_phrase: String,
    media_type: String,
    encoding: String,
    source: offcache_core::ResponseSource,
    bytes: usize,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct EntrySummary {
    url: String,
    key: String,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
}

#[derive(Debug, Serialize)]
struct KeySummary {
    url: String,
    key: String,
    body_path: PathBuf,
    media_type_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }

    match cli.command {
        Command::Fetch(args) => fetch(config, args).await,
        Command::Get { url } => get(&config, url).await,
        Command::Key { url } => key(&config, url).await,
    }
}

async fn fetch(mut config: AppConfig, args: FetchArgs) -> Result<()> {
    if let Some(policy) = args.policy {
        config.policy = policy.into();
    }

    let connectivity = Arc::new(ManualConnectivity::new(!args.offline));
    let engine = InterceptionEngine::from_config(&config, connectivity).await?;
    if args.force_reload {
        engine.notify_force_reload(true);
    }

    let descriptor = args
        .headers
        .into_iter()
        .fold(RequestDescriptor::new(args.method, &args.url), |d, (name, value)| d.with_header(name, value));
    let key = CacheKey::for_url(descriptor.url());

    tracing::info!(url = %args.url, policy = ?engine.policy(), online = engine.is_network_available(), "intercepting");

    let response = engine.intercept_request(&descriptor).await;

    if let (Some(path), Some(response)) = (&args.output, &response) {
        tokio::fs::write(path, &response.body)
            .await
            .with_context(|| format!("writing body to {}", path.display()))?;
    }

    let summary = FetchSummary {
        url: args.url,
        key: key.to_string(),
        outcome: if response.is_some() { "served" } else { "unavailable" },
        response: response.map(|r| ResponseSummary {
            status_code: r.status_code,
            reason_phrase: r.reason_phrase,
            media_type: r.media_type,
            encoding: r.encoding,
            source: r.source,
            bytes: r.body.len(),
            headers: r.headers,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.linger_ms > 0 {
        tokio::time::sleep(Duration::from_millis(args.linger_ms)).await;
    }

    Ok(())
}

async fn get(config: &AppConfig, url: String) -> Result<()> {
    let store = ContentStore::open(&config.cache_dir).await?;
    let key = CacheKey::for_url(&url);
    let entry = store.get(&key).await;

    let summary = EntrySummary {
        url,
        key: key.to_string(),
        present: entry.is_some(),
        media_type: entry.as_ref().map(|e| e.media_type.clone()),
        bytes: entry.as_ref().map(|e| e.body.len()),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn key(config: &AppConfig, url: String) -> Result<()> {
    let store = ContentStore::open(&config.cache_dir).await?;
    let key = CacheKey::for_url(&url);

    let summary = KeySummary {
        url,
        key: key.to_string(),
        body_path: store.body_path(&key),
        media_type_path: store.media_type_path(&key),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
