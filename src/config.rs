use anyhow::{Context, Result};
use clap::Parser;
use std::{env, time::Duration};

const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Base URL advertised in resumable upload `Location` headers.
    pub public_url: String,

    /// Idle time after which an unfinished resumable upload is dropped.
    /// Zero disables expiry.
    pub session_ttl: Duration,

    /// Buckets created at startup.
    pub buckets: Vec<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Object storage emulator upload API")]
pub struct Args {
    /// Host to bind to (overrides STORAGE_EMULATOR_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides STORAGE_EMULATOR_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Externally reachable base URL (overrides STORAGE_EMULATOR_PUBLIC_URL)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Resumable session idle timeout in seconds, 0 = never
    /// (overrides STORAGE_EMULATOR_SESSION_TTL_SECS)
    #[arg(long)]
    pub session_ttl_secs: Option<u64>,

    /// Bucket to create at startup; repeatable (adds to STORAGE_EMULATOR_BUCKETS)
    #[arg(long = "bucket")]
    pub buckets: Vec<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("STORAGE_EMULATOR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("STORAGE_EMULATOR_PORT")?.unwrap_or(4443);
        let env_ttl =
            parse_env("STORAGE_EMULATOR_SESSION_TTL_SECS")?.unwrap_or(DEFAULT_SESSION_TTL_SECS);
        let env_public_url = env::var("STORAGE_EMULATOR_PUBLIC_URL").ok();
        let env_buckets = env::var("STORAGE_EMULATOR_BUCKETS").unwrap_or_default();

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let public_url = args
            .public_url
            .or(env_public_url)
            .unwrap_or_else(|| format!("http://{}:{}", host, port));

        let mut buckets: Vec<String> = env_buckets
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        buckets.extend(args.buckets);

        Ok(Self {
            host,
            port,
            public_url,
            session_ttl: Duration::from_secs(args.session_ttl_secs.unwrap_or(env_ttl)),
            buckets,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read and parse an optional numeric environment variable.
fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
