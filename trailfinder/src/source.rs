use reqwest::blocking::Client;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{TrailError, TrailResult};

/// The trailheads dataset bundled into the binary
pub static EMBEDDED_TRAILHEADS: &[u8] = include_bytes!("../data/trailheads.csv");

/// Byte stream handed to the parser
pub type SourceReader = Box<dyn Read + Send>;

/// Where the CSV comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// The bundled dataset
    Embedded,
    /// A local CSV file
    File(PathBuf),
    /// A CSV fetched with a plain GET
    Url(String),
}

impl DataSource {
    /// Picks a source for a `--csv` style location.
    ///
    /// Nothing (or an empty string) selects the embedded dataset, anything that
    /// looks like a URL is fetched, everything else is a file path.
    pub fn resolve(location: Option<&str>) -> Self {
        match location.map(str::trim) {
            None | Some("") => DataSource::Embedded,
            Some(loc) if is_url(loc) => DataSource::Url(loc.to_string()),
            Some(loc) => DataSource::File(PathBuf::from(loc)),
        }
    }

    /// Opens the source. `timeout` only applies to URLs; `None` waits forever.
    pub fn open(&self, timeout: Option<Duration>) -> TrailResult<SourceReader> {
        match self {
            DataSource::Embedded => {
                debug!(
                    "Reading embedded dataset ({} bytes)",
                    EMBEDDED_TRAILHEADS.len()
                );
                Ok(Box::new(Cursor::new(EMBEDDED_TRAILHEADS)))
            }
            DataSource::File(path) => {
                debug!("Opening CSV file: {}", path.display());
                let file = File::open(path).map_err(|e| TrailError::from_open(path, e))?;
                Ok(Box::new(BufReader::new(file)))
            }
            DataSource::Url(url) => fetch(url, timeout),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Embedded => f.write_str("embedded trailheads.csv"),
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// True for locations that should be fetched over HTTP(S)
pub fn is_url(location: &str) -> bool {
    location.len() > 4 && location.starts_with("http")
}

fn fetch(url: &str, timeout: Option<Duration>) -> TrailResult<SourceReader> {
    info!("Fetching CSV from {}", url);

    let client = Client::builder()
        .timeout(timeout)
        .user_agent(format!("trailfinder/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TrailError::fetch_error(url, e))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| TrailError::fetch_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        let message = format!("HTTP status {}", status);
        return Err(TrailError::fetch_error(url, message));
    }

    debug!("Fetched {} with status {}", url, status);
    Ok(Box::new(response))
}
