/// Error types for trailfinder.
///
/// Every failure the pipeline can surface is a `TrailError`. Failures raised on
/// the parser thread travel to the consumer as a single value on the status
/// channel, so every variant is `Send` and carries an owned message.
///
/// # Taxonomy
///
/// 1. **Source acquisition** (`FileNotFound`, `PermissionDenied`, `Fetch`, `Io`):
///    the CSV could not be opened at all.
/// 2. **Header** (`Header`): the first row could not be read.
/// 3. **Record** (`Record`): a data row was unreadable (bad quoting, invalid UTF-8).
///    Rows with the wrong field count are not errors and never reach this type.
/// 4. **Configuration / serving** (`ConfigError`, `Server`, `Json`).
///
/// ```rust,ignore
/// match find_trails(&config, &criteria) {
///     Ok(trails) => render(trails),
///     Err(TrailError::Fetch { url, .. }) => eprintln!("could not download {url}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for trailfinder operations
pub type TrailResult<T> = Result<T, TrailError>;

/// Errors that can occur while loading, parsing or serving trail data
#[derive(Error, Debug)]
pub enum TrailError {
    #[error("error opening CSV file: file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("error opening CSV file: permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("error fetching CSV from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("error reading CSV header: {0}")]
    Header(String),
    #[error("error reading CSV record: {0}")]
    Record(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrailError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn fetch_error(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn header_error(msg: impl ToString) -> Self {
        Self::Header(msg.to_string())
    }

    pub fn record_error(msg: impl ToString) -> Self {
        Self::Record(msg.to_string())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn server_error(msg: impl ToString) -> Self {
        Self::Server(msg.to_string())
    }

    /// Maps an I/O failure on `path` onto the most specific variant
    pub fn from_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::Io(err),
        }
    }
}

impl From<config::ConfigError> for TrailError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
