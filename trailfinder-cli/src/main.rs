use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trailfinder::{
    CliOverrides, Criteria, FinderConfig, Trail, TrailFinder, TrailResult, TrailServer,
    NO_MATCHES_MESSAGE,
};

const DIVIDER: &str = "----------------------------";

/// TrailFinder helps you find trails based on various criteria
#[derive(Parser, Debug)]
#[command(name = "trailfinder", author, version, about, long_about = None)]
struct Cli {
    /// Run in server mode
    #[arg(short, long)]
    server: bool,

    /// Path or URL of the trailheads CSV file (default: embedded trailheads.csv)
    #[arg(short, long)]
    csv: Option<String>,

    /// Port for the HTTP server (default: 8080)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trails per parsed batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of filter threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format for matching trails
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Filter by restrooms availability
    #[arg(long, default_value = "")]
    restrooms: String,
    /// Filter by picnic areas
    #[arg(long, default_value = "")]
    picnic: String,
    /// Filter by fishing availability
    #[arg(long, default_value = "")]
    fishing: String,
    /// Filter by fee availability
    #[arg(long, default_value = "")]
    fee: String,
    /// Filter by bike rack availability
    #[arg(long, default_value = "")]
    bikerack: String,
    /// Filter by bike trail availability
    #[arg(long, default_value = "")]
    biketrail: String,
    /// Filter by dog tube availability
    #[arg(long, default_value = "")]
    dogtube: String,
    /// Filter by grill availability
    #[arg(long, default_value = "")]
    grills: String,
    /// Filter by ADA toilet availability
    #[arg(long, default_value = "")]
    adatoilet: String,
    /// Filter by ADA fishing availability
    #[arg(long, default_value = "")]
    adafishing: String,
    /// Filter by ADA camping availability
    #[arg(long, default_value = "")]
    adacamping: String,
    /// Filter by ADA picnic availability
    #[arg(long, default_value = "")]
    adapicnic: String,
    /// Filter by ADA trail availability
    #[arg(long, default_value = "")]
    adatrail: String,
    /// Filter by ADA parking availability
    #[arg(long, default_value = "")]
    adaparking: String,
    /// Filter by ADA facility availability
    #[arg(long, default_value = "")]
    adafacilit: String,
    /// Filter by horse trail availability
    #[arg(long, default_value = "")]
    horsetrail: String,
    /// Filter by recycle bin availability
    #[arg(long, default_value = "")]
    recyclebin: String,
    /// Filter by dog compost availability
    #[arg(long, default_value = "")]
    dogcompost: String,
    /// Filter by access name
    #[arg(long, default_value = "")]
    accessname: String,
    /// Filter by trailhead leash rules
    #[arg(long, default_value = "")]
    thleash: String,
}

impl FilterArgs {
    fn criteria(&self) -> Criteria {
        Criteria::from_query_pairs([
            ("restrooms", &self.restrooms),
            ("picnic", &self.picnic),
            ("fishing", &self.fishing),
            ("fee", &self.fee),
            ("bikerack", &self.bikerack),
            ("biketrail", &self.biketrail),
            ("dogtube", &self.dogtube),
            ("grills", &self.grills),
            ("adatoilet", &self.adatoilet),
            ("adafishing", &self.adafishing),
            ("adacamping", &self.adacamping),
            ("adapicnic", &self.adapicnic),
            ("adatrail", &self.adatrail),
            ("adaparking", &self.adaparking),
            ("adafacilit", &self.adafacilit),
            ("horsetrail", &self.horsetrail),
            ("recyclebin", &self.recyclebin),
            ("dogcompost", &self.dogcompost),
            ("accessname", &self.accessname),
            ("thleash", &self.thleash),
        ])
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = FinderConfig::load_from(cli.config.as_deref())
        .and_then(|config| {
            config.merge_with_cli(CliOverrides {
                data_source: cli.csv.clone(),
                port: cli.port,
                batch_size: cli.batch_size,
                thread_count: cli.threads,
                log_level: cli.log_level.clone(),
            })
        })
        .context("failed to load configuration")?;

    init_logging(&config.log_level);
    tracing::debug!("Loaded configuration: {:?}", config);
    run(&cli, config)?;
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: FinderConfig) -> TrailResult<()> {
    let finder = TrailFinder::new(config)?;

    if cli.server {
        let server = TrailServer::bind(finder)?;
        return server.run();
    }

    let trails = finder.find(&cli.filters.criteria())?;
    match cli.format {
        OutputFormat::Text => print!("{}", render_text(&trails)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trails)?),
    }
    Ok(())
}

fn render_text(trails: &[Trail]) -> String {
    let mut out = String::new();
    if trails.is_empty() {
        let _ = writeln!(out, "{}", NO_MATCHES_MESSAGE);
        return out;
    }

    let _ = writeln!(out, "{}", "Trails matching the criteria:".bold());
    for trail in trails {
        for (field, value) in trail.entries() {
            let _ = writeln!(out, "{}: {}", field, value);
        }
        let _ = writeln!(out, "{}", DIVIDER.dimmed());
    }
    out
}
