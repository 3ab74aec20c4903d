pub mod config;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod parser;
pub mod server;
pub mod source;
pub mod trail;

pub use crate::config::{CliOverrides, FinderConfig};
pub use crate::engine::{find_trails, TrailFinder};
pub use crate::errors::{TrailError, TrailResult};
pub use crate::filters::{filter_trails_parallel, matches_partial, Criteria};
pub use crate::parser::{parse_csv_concurrently, spawn_parser, Batch, BatchChannels};
pub use crate::server::{TrailServer, NO_MATCHES_MESSAGE};
pub use crate::source::DataSource;
pub use crate::trail::{Field, Trail};
