//! Server configuration: command line with environment fallbacks, plus an
//! optional JSON file holding the dispatch tuning knobs.

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dispatch_core::config::DispatchConfig;
use dispatch_core::DispatchError;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "dispatchd", about = "Ride dispatch and lifecycle server")]
pub struct ServerConfig {
    /// Address for the HTTP and WebSocket listener.
    #[arg(long, env = "DISPATCH_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// JSON file with dispatch settings; every field is optional.
    #[arg(long, env = "DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tracing filter directive, e.g. `info,dispatch_core=debug`.
    #[arg(long, env = "RUST_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    #[arg(long, env = "DISPATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Overrides `match_radius_km` from the config file.
    #[arg(long, env = "DISPATCH_MATCH_RADIUS_KM")]
    pub match_radius_km: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid dispatch configuration: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ServerConfig {
    /// Load the dispatch settings, applying command-line overrides last.
    pub fn dispatch_config(&self) -> Result<DispatchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                DispatchConfig::from_json_str(&raw)?
            }
            None => DispatchConfig::default(),
        };
        if let Some(radius_km) = self.match_radius_km {
            config = config.with_match_radius_km(radius_km);
        }
        config.validate()?;
        Ok(config)
    }
}
