use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{TrailError, TrailResult};
use crate::source::DataSource;

/// Runtime configuration shared by the CLI runner and the HTTP server.
///
/// # Configuration Locations
///
/// Values are layered, later sources overriding earlier ones:
/// 1. Global `$CONFIG_DIR/trailfinder/config.yaml`
/// 2. Local `.trailfinder.yaml` in the current directory
/// 3. A file passed with `--config`
///
/// Command-line flags are applied last through [`FinderConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # CSV path or http(s) URL; omit to use the bundled dataset
/// data_source: "https://example.com/trailheads.csv"
///
/// # HTTP server
/// bind_address: "0.0.0.0"
/// port: 8080
/// server_workers: 4
///
/// # Trails per parsed batch
/// batch_size: 100
///
/// # Filter threads (default: CPU cores)
/// thread_count: 4
///
/// # Give up on slow downloads after this many seconds (default: never)
/// fetch_timeout_secs: 30
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinderConfig {
    /// CSV path or URL; `None` selects the embedded dataset
    #[serde(default)]
    pub data_source: Option<String>,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum trails per batch handed from the parser to the filter
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,

    /// Threads in the filter pool
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Threads accepting HTTP requests
    #[serde(default = "default_server_workers")]
    pub server_workers: NonZeroUsize,

    /// Timeout for fetching a URL data source
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN)
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_server_workers() -> NonZeroUsize {
    NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            data_source: None,
            bind_address: default_bind_address(),
            port: default_port(),
            batch_size: default_batch_size(),
            thread_count: default_thread_count(),
            server_workers: default_server_workers(),
            fetch_timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` leaves the file value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub data_source: Option<String>,
    pub port: Option<u16>,
    pub batch_size: Option<usize>,
    pub thread_count: Option<usize>,
    pub log_level: Option<String>,
}

impl FinderConfig {
    /// Loads configuration from the default locations
    pub fn load() -> TrailResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> TrailResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("trailfinder/config.yaml")),
            Some(PathBuf::from(".trailfinder.yaml")),
        ];
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Applies command-line values on top of file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> TrailResult<Self> {
        if let Some(source) = cli.data_source {
            self.data_source = Some(source);
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(size) = cli.batch_size {
            self.batch_size = NonZeroUsize::new(size)
                .ok_or_else(|| TrailError::config_error("batch size must be at least 1"))?;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = NonZeroUsize::new(threads)
                .ok_or_else(|| TrailError::config_error("thread count must be at least 1"))?;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        Ok(self)
    }

    /// The configured data source
    pub fn source(&self) -> DataSource {
        DataSource::resolve(self.data_source.as_deref())
    }

    /// Download timeout for URL sources
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// `bind_address:port`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
