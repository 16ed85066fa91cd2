#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the sweeping-enforcement pipeline.
//!
//! Each pipeline stage is a subcommand over CSV files; `run` chains
//! the offline stages in one pass. Per-record problems (bad rows,
//! unmatched citations, thin samples) are logged and skipped, never
//! fatal; a non-zero exit means an environment failure such as a bad
//! path or unreadable header.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use sweepcast_aggregate::AggregateConfig;
use sweepcast_geocoder::nominatim::NominatimGeocoder;
use sweepcast_geocoder::progress::ProgressStore;
use sweepcast_geocoder::{worker, GeocoderConfig};
use sweepcast_matcher::{DistanceMethod, MatchConfig, Matcher};
use sweepcast_models::ConfidenceTier;

#[derive(Parser)]
#[command(name = "sweepcast", about = "Street sweeping enforcement estimator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collapse a raw schedule CSV into canonical cleaning rules
    Canonicalize {
        /// Raw schedule CSV (API or export field names)
        #[arg(long)]
        schedule: PathBuf,
        /// Output rules CSV
        #[arg(long)]
        out: PathBuf,
    },
    /// Geocode a citations CSV through Nominatim, resumably
    Geocode {
        /// Raw citations CSV
        #[arg(long)]
        citations: PathBuf,
        /// Output geocoded citations CSV
        #[arg(long)]
        out: PathBuf,
        /// Append-only progress store; reruns skip recorded ids
        #[arg(long)]
        progress: PathBuf,
        /// Concurrent in-flight requests
        #[arg(long, default_value = "4")]
        workers: usize,
        /// Minimum spacing between requests in milliseconds
        #[arg(long, default_value = "1000")]
        rate_limit_ms: u64,
        /// Retries per address on transport failure
        #[arg(long, default_value = "3")]
        max_retries: u32,
        /// Nominatim search endpoint
        #[arg(long, default_value = NominatimGeocoder::DEFAULT_BASE_URL)]
        base_url: String,
        /// Suffix appended to every address query
        #[arg(long, default_value = ", San Francisco, CA")]
        query_suffix: String,
    },
    /// Match geocoded citations against canonical rules
    Match {
        /// Canonical rules CSV
        #[arg(long)]
        rules: PathBuf,
        /// Geocoded citations CSV
        #[arg(long)]
        citations: PathBuf,
        /// Output matches CSV
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        match_args: MatchArgs,
    },
    /// Fold matches into per-location arrival estimates
    Aggregate {
        /// Matches CSV
        #[arg(long)]
        matches: PathBuf,
        /// Canonical rules CSV
        #[arg(long)]
        rules: PathBuf,
        /// Output estimates CSV
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        aggregate_args: AggregateArgs,
    },
    /// Canonicalize, match, and aggregate in one pass
    Run {
        /// Raw schedule CSV
        #[arg(long)]
        schedule: PathBuf,
        /// Geocoded citations CSV
        #[arg(long)]
        citations: PathBuf,
        /// Output directory for rules.csv, matches.csv, estimates.csv
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        match_args: MatchArgs,
        #[command(flatten)]
        aggregate_args: AggregateArgs,
    },
}

#[derive(clap::Args)]
struct MatchArgs {
    /// Grid cell edge length in meters
    #[arg(long, default_value = "100")]
    cell_size_meters: f64,
    /// Grid query radius in cells
    #[arg(long, default_value = "1")]
    grid_search_radius: i64,
    /// Maximum citation-to-geometry distance in meters
    #[arg(long, default_value = "200")]
    max_distance_meters: f64,
    /// Lowest confidence tier admitted (HIGH, MEDIUM, LOW)
    #[arg(long, default_value = "MEDIUM")]
    min_tier: String,
    /// Use exact segment projection instead of five-point sampling
    #[arg(long)]
    projected: bool,
}

impl MatchArgs {
    fn to_config(&self) -> Result<MatchConfig, Box<dyn std::error::Error>> {
        let min_tier: ConfidenceTier = self
            .min_tier
            .parse()
            .map_err(|_| format!("Unknown confidence tier: {}", self.min_tier))?;
        Ok(MatchConfig {
            cell_size_meters: self.cell_size_meters,
            grid_search_radius: self.grid_search_radius,
            max_distance_meters: self.max_distance_meters,
            min_tier,
            distance_method: if self.projected {
                DistanceMethod::Projected
            } else {
                DistanceMethod::FivePointSample
            },
        })
    }
}

#[derive(clap::Args)]
struct AggregateArgs {
    /// Minimum citations inside the window before statistics are kept
    #[arg(long, default_value = "3")]
    min_sample: usize,
    /// Hours after the window closes that still count as enforcement
    #[arg(long, default_value = "2.0")]
    late_grace_hours: f64,
}

impl AggregateArgs {
    fn to_config(&self) -> AggregateConfig {
        AggregateConfig {
            min_sample: self.min_sample,
            late_grace_hours: self.late_grace_hours,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Canonicalize { schedule, out } => {
            let start = Instant::now();
            let raw = sweepcast_schedule::io::read_raw_rows(&schedule)?;
            let rows: Vec<_> = raw
                .iter()
                .map(sweepcast_schedule::NormalizedRow::from_raw)
                .collect();
            let rules = sweepcast_schedule::canonicalize(&rows);
            sweepcast_schedule::io::write_rules(&out, &rules)?;
            log::info!("Canonicalized in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::Geocode {
            citations,
            out,
            progress,
            workers,
            rate_limit_ms,
            max_retries,
            base_url,
            query_suffix,
        } => {
            let start = Instant::now();
            let raw = sweepcast_geocoder::io::read_citations(&citations)?;
            let client = reqwest::Client::builder()
                .user_agent(concat!("sweepcast/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let geocoder = Arc::new(NominatimGeocoder::new(client, base_url));
            let config = GeocoderConfig {
                max_workers: workers,
                rate_limit: Duration::from_millis(rate_limit_ms),
                max_retries,
                query_suffix,
            };
            let store = ProgressStore::open(progress);
            let records = worker::geocode_all(geocoder, &config, &store, &raw).await?;
            sweepcast_geocoder::io::write_records(&out, &records)?;
            log::info!("Geocoded in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::Match {
            rules,
            citations,
            out,
            match_args,
        } => {
            let start = Instant::now();
            let rules = sweepcast_schedule::io::read_rules(&rules)?;
            let citations = sweepcast_geocoder::io::read_records(&citations)?;
            let matcher = Matcher::new(rules, match_args.to_config()?);
            let matches = matcher.match_all(&citations);
            sweepcast_matcher::io::write_matches(&out, &matches)?;
            log::info!("Matched in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::Aggregate {
            matches,
            rules,
            out,
            aggregate_args,
        } => {
            let start = Instant::now();
            let matches = sweepcast_matcher::io::read_matches(&matches)?;
            let rules = sweepcast_schedule::io::read_rules(&rules)?;
            let estimates =
                sweepcast_aggregate::aggregate(&matches, &rules, &aggregate_args.to_config());
            sweepcast_aggregate::rows::write_estimates(&out, &estimates)?;
            log::info!("Aggregated in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::Run {
            schedule,
            citations,
            out_dir,
            match_args,
            aggregate_args,
        } => {
            let start = Instant::now();
            std::fs::create_dir_all(&out_dir)?;

            let raw = sweepcast_schedule::io::read_raw_rows(&schedule)?;
            let rows: Vec<_> = raw
                .iter()
                .map(sweepcast_schedule::NormalizedRow::from_raw)
                .collect();
            let rules = sweepcast_schedule::canonicalize(&rows);
            sweepcast_schedule::io::write_rules(&out_dir.join("rules.csv"), &rules)?;

            let citations = sweepcast_geocoder::io::read_records(&citations)?;
            let matcher = Matcher::new(rules, match_args.to_config()?);
            let matches = matcher.match_all(&citations);
            sweepcast_matcher::io::write_matches(&out_dir.join("matches.csv"), &matches)?;

            let estimates = sweepcast_aggregate::aggregate(
                &matches,
                matcher.rules(),
                &aggregate_args.to_config(),
            );
            sweepcast_aggregate::rows::write_estimates(&out_dir.join("estimates.csv"), &estimates)?;

            log::info!("Pipeline complete in {:.1}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
