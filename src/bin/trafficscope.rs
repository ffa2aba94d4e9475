//! trafficscope - nearby traffic density report
//!
//! One invocation answers one request:
//! 1. Loads configuration (file named by TRAFFICSCOPE_CONFIG, env overrides)
//! 2. Loads the cascade model; a missing model aborts startup
//! 3. Runs the aggregation pipeline against the live feed and the catalog
//! 4. Prints the ranked records as JSON on stdout
//!
//! Latitude and longitude are accepted as raw strings to mirror the web
//! form contract: a coordinate is used only when both are non-empty.

use anyhow::{Context, Result};
use clap::Parser;

use trafficscope::{Pipeline, QueryCoordinate, TrafficscopeConfig};

#[derive(Parser, Debug)]
#[command(name = "trafficscope", about = "Rank nearby traffic cameras by vehicle density")]
struct Args {
    /// Caller latitude in decimal degrees; empty or omitted disables ranking.
    #[arg(long, default_value = "")]
    latitude: String,
    /// Caller longitude in decimal degrees; empty or omitted disables ranking.
    #[arg(long, default_value = "")]
    longitude: String,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let query = parse_query(&args.latitude, &args.longitude)?;

    let cfg = TrafficscopeConfig::load()?;
    log::info!(
        "feed={} catalog={} model={} workers={}",
        cfg.feed_url,
        cfg.catalog_path,
        cfg.model_path,
        cfg.concurrency
    );

    // Model load happens here; without it the process never serves.
    let pipeline = Pipeline::from_config(&cfg).context("pipeline startup")?;

    let records = pipeline.run(query).context("pipeline run")?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&records)?
    } else {
        serde_json::to_string(&records)?
    };
    println!("{}", json);
    Ok(())
}

/// Both-non-empty rule: a query coordinate exists only when latitude and
/// longitude were both supplied.
fn parse_query(latitude: &str, longitude: &str) -> Result<Option<QueryCoordinate>> {
    let (latitude, longitude) = (latitude.trim(), longitude.trim());
    if latitude.is_empty() || longitude.is_empty() {
        return Ok(None);
    }
    let latitude: f64 = latitude
        .parse()
        .with_context(|| format!("latitude '{}' is not a number", latitude))?;
    let longitude: f64 = longitude
        .parse()
        .with_context(|| format!("longitude '{}' is not a number", longitude))?;
    Ok(Some(QueryCoordinate::new(latitude, longitude)))
}
