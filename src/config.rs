use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

use crate::services::retention::RetentionPolicy;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub compress_after_days: u32,
    pub delete_after_days: u32,
    pub schedule_interval_hours: u32,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Media bucket lifecycle worker")]
pub struct Args {
    /// Host to bind to (overrides MEDIA_LIFECYCLE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MEDIA_LIFECYCLE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides MEDIA_LIFECYCLE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides MEDIA_LIFECYCLE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Days before an object is relocated to long-term storage
    /// (overrides MEDIA_LIFECYCLE_COMPRESS_AFTER_DAYS)
    #[arg(long)]
    pub compress_after_days: Option<u32>,

    /// Days before an object is deleted outright
    /// (overrides MEDIA_LIFECYCLE_DELETE_AFTER_DAYS)
    #[arg(long)]
    pub delete_after_days: Option<u32>,

    /// Hours between scheduled runs; 0 disables the scheduler
    /// (overrides MEDIA_LIFECYCLE_SCHEDULE_INTERVAL_HOURS)
    #[arg(long)]
    pub schedule_interval_hours: Option<u32>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is absent.
fn env_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {name} value `{value}`")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).context(format!("reading {name}")),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("MEDIA_LIFECYCLE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parsed("MEDIA_LIFECYCLE_PORT", 3000u16)?;
        let env_storage =
            env::var("MEDIA_LIFECYCLE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("MEDIA_LIFECYCLE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/media_lifecycle.db".into());
        let env_compress = env_parsed("MEDIA_LIFECYCLE_COMPRESS_AFTER_DAYS", 30u32)?;
        let env_delete = env_parsed("MEDIA_LIFECYCLE_DELETE_AFTER_DAYS", 365u32)?;
        let env_schedule = env_parsed("MEDIA_LIFECYCLE_SCHEDULE_INTERVAL_HOURS", 24u32)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            compress_after_days: args.compress_after_days.unwrap_or(env_compress),
            delete_after_days: args.delete_after_days.unwrap_or(env_delete),
            schedule_interval_hours: args.schedule_interval_hours.unwrap_or(env_schedule),
        };

        if cfg.delete_after_days <= cfg.compress_after_days {
            bail!(
                "delete_after_days ({}) must be greater than compress_after_days ({})",
                cfg.delete_after_days,
                cfg.compress_after_days
            );
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            compress_after_days: self.compress_after_days,
            delete_after_days: self.delete_after_days,
        }
    }
}
