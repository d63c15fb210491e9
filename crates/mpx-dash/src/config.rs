use anyhow::{Context, Result};
use clap::Parser;
use mpx_core::poller::{PollerConfig, DEFAULT_REFRESH_PERIOD};
use mpx_core::Endpoints;
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Default, Parser)]
#[command(name = "mpx-dash", about = "Live terminal dashboard for moproxy server health")]
pub struct Args {
    /// Address of the moproxy web endpoint; a `#tag` fragment preselects a server
    #[arg(long)]
    pub base_url: Option<String>,

    /// Status document location, absolute or relative to the base address
    #[arg(long)]
    pub status_url: Option<String>,

    /// Version endpoint location, absolute or relative to the base address
    #[arg(long)]
    pub version_url: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Start with auto-refresh off
    #[arg(long)]
    pub no_auto_refresh: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Initial address; its fragment seeds the selection.
    pub address: Url,
    pub endpoints: Endpoints,
    pub poller: PollerConfig,
    pub timeout: Duration,
}

pub fn load_config(args: Args) -> Result<Config> {
    resolve_config(args, |key| std::env::var(key).ok())
}

/// Command line values win over `MPX_*` environment variables, which win
/// over defaults.
pub(crate) fn resolve_config(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let raw_address = args
        .base_url
        .or_else(|| env("MPX_BASE_URL"))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let address = Url::parse(raw_address.trim())
        .with_context(|| format!("invalid base url {raw_address:?}"))?;

    let status = args.status_url.or_else(|| env("MPX_STATUS_URL"));
    let version = args.version_url.or_else(|| env("MPX_VERSION_URL"));
    let endpoints = Endpoints::resolve(&address, status.as_deref(), version.as_deref())
        .context("invalid status or version endpoint")?;

    let period = args
        .refresh_ms
        .or_else(|| env("MPX_REFRESH_MS").and_then(|value| value.trim().parse().ok()))
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_REFRESH_PERIOD);
    let timeout = args
        .timeout_ms
        .or_else(|| env("MPX_TIMEOUT_MS").and_then(|value| value.trim().parse().ok()))
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));
    let auto_refresh = if args.no_auto_refresh {
        false
    } else {
        env("MPX_AUTO_REFRESH")
            .and_then(|value| parse_bool_flag(&value))
            .unwrap_or(true)
    };

    Ok(Config {
        address,
        endpoints,
        poller: PollerConfig {
            period,
            auto_refresh,
        },
        timeout,
    })
}

pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn log_stdout_enabled() -> bool {
    std::env::var("MPX_LOG_STDOUT")
        .ok()
        .and_then(|value| parse_bool_flag(&value))
        .unwrap_or(false)
}
