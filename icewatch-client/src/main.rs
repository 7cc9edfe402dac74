//! icewatch - command-line client for crowdsourced ice sightings
//!
//! Lists nearby sightings with their recency tier, and submits new reports
//! (description + photo + position) to the configured backend.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use icewatch_client::config::{ClientConfig, ConfigOverrides};
use icewatch_client::models::{Coordinate, SightingId};
use icewatch_client::platform::desktop::desktop_platform;
use icewatch_client::platform::ImageSource;
use icewatch_client::services::recency;
use icewatch_client::session::PickOutcome;
use icewatch_client::IcewatchClient;
use icewatch_common::config::load_config_or_default;
use icewatch_common::time::format_age;

/// Command-line arguments for icewatch
#[derive(Parser, Debug)]
#[command(name = "icewatch")]
#[command(about = "View and report ice sightings")]
#[command(version)]
struct Args {
    /// Backend base URL (overrides ICEWATCH_API_URL / API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Reporter device id (overrides ICEWATCH_DEVICE_ID and the config file)
    #[arg(long, global = true)]
    device_id: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and list current sightings
    List {
        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a new sighting
    Report {
        #[arg(long)]
        description: String,

        /// Photo to attach
        #[arg(long)]
        image: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },

    /// Show the map viewport for a position, optionally zoomed on a sighting
    Region {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Sighting id to focus
        #[arg(long)]
        focus: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_config_or_default(args.config.as_deref()).context("Failed to load config file")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "icewatch_client={level},icewatch_common={level}",
                    level = toml_config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let overrides = ConfigOverrides {
        api_url: args.api_url.clone(),
        device_id: args.device_id.clone(),
    };
    let config = ClientConfig::from_sources(&overrides, &toml_config)?;

    info!("Starting icewatch {}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::List { json } => list(config, json).await,
        Command::Report {
            description,
            image,
            lat,
            lng,
        } => report(config, description, image, Coordinate::new(lat, lng)).await,
        Command::Region { lat, lng, focus } => region(config, Coordinate::new(lat, lng), focus).await,
    }
}

async fn list(config: ClientConfig, json: bool) -> Result<()> {
    let client = IcewatchClient::new(config, desktop_platform(None, None))?;
    let snapshot = client.repository.refresh().await?;
    let now = client.classifier.now();

    if json {
        let rows: Vec<_> = snapshot
            .iter()
            .map(|s| {
                serde_json::json!({
                    "sighting": s,
                    "tier": recency::classify(s.timestamp, now),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("No sightings near you. Report if you see any!");
        return Ok(());
    }

    for s in snapshot.iter() {
        let tier = recency::classify(s.timestamp, now);
        println!(
            "{:<8} {:<10} {:>8} ago  ({:.5}, {:.5})  {}{}",
            s.id,
            tier.pin_color(),
            format_age(recency::age(s.timestamp, now)),
            s.lat,
            s.lng,
            s.description,
            if s.image_url.is_some() { "  [image]" } else { "" }
        );
    }
    Ok(())
}

async fn report(
    config: ClientConfig,
    description: String,
    image: PathBuf,
    location: Coordinate,
) -> Result<()> {
    let client = IcewatchClient::new(config, desktop_platform(Some(location), Some(image.clone())))?;
    let session = client.report_session();

    session.set_description(description);
    if let PickOutcome::Cancelled | PickOutcome::NotPermitted(_) =
        session.pick_image(ImageSource::Library).await
    {
        bail!("Image not found: {}", image.display());
    }
    session.capture_position().await?;

    let ack = session.submit().await?;
    match ack.server_id {
        Some(id) => println!("Sighting submitted (id {})", id),
        None => println!("Sighting submitted"),
    }
    println!("{} sightings now listed", client.repository.current().len());
    Ok(())
}

async fn region(config: ClientConfig, location: Coordinate, focus: Option<String>) -> Result<()> {
    let client = IcewatchClient::new(config, desktop_platform(Some(location), None))?;
    let session = client.map_session();

    let activation = session.activate().await;
    activation.sightings?;
    activation.position?;

    if let Some(id) = focus {
        if session.select(&SightingId::new(id.clone())).is_none() {
            bail!("No sighting with id {}", id);
        }
    }

    let Some(region) = session.region() else {
        bail!("No viewport could be computed");
    };
    println!(
        "center ({:.5}, {:.5})  span {:.4} x {:.4}",
        region.center.lat, region.center.lng, region.span.lat_delta, region.span.lng_delta
    );

    let visible = session
        .markers()
        .into_iter()
        .filter(|m| region.contains(m.sighting.coordinate()))
        .collect::<Vec<_>>();
    println!("{} sightings in view", visible.len());
    for marker in visible {
        println!("  {:<8} {:<10} {}", marker.sighting.id, marker.tier, marker.sighting.description);
    }

    session.deactivate();
    Ok(())
}
