//! Configuration — CLI flags, environment variables, config file.

use clap::Parser;
use prometheus::core::Desc;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// pgpool-exporter — Prometheus metrics for PostgreSQL connection pools
#[derive(Parser, Debug, Default)]
#[command(name = "pgpool-exporter", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(long, default_value = "pgpool-exporter.toml")]
    pub config: String,

    /// Metrics listen port
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Metrics bind address
    #[arg(long)]
    pub listen_host: Option<String>,

    /// Log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Const label attached to every pool metric (name=value, repeatable)
    #[arg(long = "label")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_host: String,
    pub listen_port: u16,
    pub log_level: String,
    pub labels: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".into(),
            listen_port: 9188,
            log_level: "info".into(),
            labels: HashMap::new(),
        }
    }
}

/// On-disk form of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    listen_host: Option<String>,
    #[serde(alias = "port")]
    listen_port: Option<u16>,
    log_level: Option<String>,
    labels: Option<HashMap<String, String>>,
}

impl Config {
    /// Load configuration: defaults → config file → env vars → CLI flags.
    pub fn load() -> Result<Self> {
        Self::load_from(Cli::parse(), |key| std::env::var(key).ok())
    }

    /// Same as `load`, with the CLI and environment supplied by the caller.
    pub fn load_from(cli: Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        // 1. Config file
        let config_path = Path::new(&cli.config);
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            apply_config_file(&mut config, &content)?;
        }

        // 2. Environment variables
        apply_env(&mut config, env)?;

        // 3. CLI flags (highest priority)
        if let Some(v) = cli.port {
            config.listen_port = v;
        }
        if let Some(v) = cli.listen_host {
            config.listen_host = v;
        }
        if let Some(v) = cli.log_level {
            config.log_level = v;
        }
        for entry in &cli.labels {
            let (name, value) = parse_label(entry).map_err(Error::Config)?;
            config.labels.insert(name, value);
        }

        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Validate configuration. Returns an error message if invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.listen_port == 0 {
            return Err("listen_port must be > 0".into());
        }
        if self.listen_host.is_empty() {
            return Err("listen_host must not be empty".into());
        }
        if self.labels.keys().any(|name| name.is_empty()) {
            return Err("label names must not be empty".into());
        }
        // Same checks the collector's descriptors run at construction.
        Desc::new(
            "pgxpool_label_check".into(),
            "label validation".into(),
            Vec::new(),
            self.labels.clone(),
        )
        .map_err(|e| format!("invalid labels: {e}"))?;
        Ok(())
    }

    /// `host:port` for the metrics listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}

fn apply_config_file(config: &mut Config, content: &str) -> Result<()> {
    let file: FileConfig = toml::from_str(content)?;

    if let Some(v) = file.listen_host {
        config.listen_host = v;
    }
    if let Some(v) = file.listen_port {
        config.listen_port = v;
    }
    if let Some(v) = file.log_level {
        config.log_level = v;
    }
    if let Some(labels) = file.labels {
        config.labels.extend(labels);
    }
    Ok(())
}

fn apply_env(config: &mut Config, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(v) = env("PGPOOL_EXPORTER_HOST") {
        config.listen_host = v;
    }
    if let Some(v) = env("PGPOOL_EXPORTER_PORT") {
        config.listen_port = v
            .parse()
            .map_err(|_| Error::Config(format!("PGPOOL_EXPORTER_PORT: invalid port '{v}'")))?;
    }
    if let Some(v) = env("PGPOOL_EXPORTER_LOG_LEVEL") {
        config.log_level = v;
    }
    if let Some(v) = env("PGPOOL_EXPORTER_LABELS") {
        for entry in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = parse_label(entry).map_err(Error::Config)?;
            config.labels.insert(name, value);
        }
    }
    Ok(())
}

/// Parse a `name=value` label entry.
fn parse_label(entry: &str) -> std::result::Result<(String, String), String> {
    let Some((name, value)) = entry.split_once('=') else {
        return Err(format!("label '{entry}' must be name=value"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("label '{entry}' has an empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
