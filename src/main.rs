// src/main.rs v4
//! nav-engine - command line front end for the navigation engine core

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use nav_engine::{
    geo::{self, decode_ge0_url},
    region::{load_countries, RegionIndex},
    Coordinate, Engine, EngineConfig, Fix, RoutingEvent, Units,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Navigation engine tools: geometry, formatting, share links and routing
#[derive(Parser, Debug)]
#[command(name = "nav-engine", version, about)]
struct Args {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print distances, speeds and altitudes in imperial units
    #[arg(long, global = true)]
    imperial: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Distance and azimuth of a point as seen from a center point
    Distance {
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        point: Coordinate,
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        center: Coordinate,
        /// Map rotation subtracted from the azimuth, in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        north: f64,
    },
    /// Format a coordinate in decimal or degrees-minutes-seconds
    Format {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        dms: bool,
    },
    /// Parse a formatted coordinate back to decimal degrees
    Parse { text: String },
    /// Dead-reckon a position forward in time
    Predict {
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        position: Coordinate,
        #[arg(long, default_value_t = 10.0)]
        accuracy: f64,
        #[arg(long)]
        bearing: Option<f64>,
        #[arg(long, default_value_t = 0.0)]
        speed: f64,
        #[arg(long, default_value_t = 1.0)]
        elapsed: f64,
    },
    /// Make a ge0 share link for a position
    Link {
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        position: Coordinate,
        #[arg(long, default_value_t = 16.0)]
        zoom: f64,
        #[arg(long, default_value = "")]
        name: String,
        /// Produce an http://ge0.me/ link instead of ge0://
        #[arg(long)]
        http: bool,
    },
    /// Decode a ge0 share link
    Decode { url: String },
    /// Build a route and print a summary
    Route {
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        from: Coordinate,
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        to: Coordinate,
        /// Country list; without it the whole world is one downloaded region
        #[arg(long)]
        countries: Option<PathBuf>,
        /// Region names to treat as downloaded (repeatable)
        #[arg(long = "present")]
        present: Vec<String>,
    },
}

fn parse_point(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = geo::parse_lat_lon(s).map_err(|e| e.to_string())?;
    Coordinate::new(lat, lon).map_err(|e| e.to_string())
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::load().unwrap_or_default(),
    };
    if args.imperial {
        config.update_units(Units::Imperial);
    }
    Ok(config)
}

/// Coarse level for the single-region fallback index
const WORLD_LEVEL: u8 = 4;

fn world_index() -> anyhow::Result<RegionIndex> {
    let index = RegionIndex::new(WORLD_LEVEL)?;
    let world = index.add_region("World", None, 0);
    index.cover_rect(world, -85.0, -180.0, 85.0, 180.0)?;
    index.mark_downloaded(world, 0)?;
    Ok(index)
}

fn print_event(engine: &Engine, event: &RoutingEvent) {
    if event.is_success() {
        println!("Route built (request {})", event.request_id);
        return;
    }

    println!("Routing failed: {} (code {})", event.error, event.error.code());
    if !event.missing_regions.is_empty() {
        let names: Vec<String> = event
            .missing_regions
            .iter()
            .map(|id| engine.regions().name(*id).unwrap_or_else(|| id.to_string()))
            .collect();
        println!("Download first: {}", names.join(", "));
    }
}

async fn run_route(
    config: EngineConfig,
    from: Coordinate,
    to: Coordinate,
    countries: Option<PathBuf>,
    present: Vec<String>,
) -> anyhow::Result<()> {
    let index = match countries {
        Some(path) => load_countries(&path, config.region_cell_level)
            .with_context(|| format!("loading country list {}", path.display()))?,
        None => world_index()?,
    };
    for name in &present {
        let Some(id) = index.find_by_name(name) else {
            bail!("unknown region '{}'", name);
        };
        index.mark_downloaded(id, index.data_version())?;
    }

    let engine = Engine::new(config, Arc::new(index))?;
    engine.on_location_update(Fix::stationary(from, 0.0));

    let event = engine.build_route(to.lat(), to.lon())?.wait().await;
    print_event(&engine, &event);

    if let Some(route) = engine.routing().route() {
        println!("Distance: {}", engine.format_distance(route.total_distance_m()));
        println!("Time:     {:.0} min", route.total_time_s() / 60.0);
        println!("Turns:    {}", route.turns().len());
    }
    engine.close_routing();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(units = ?config.units, "configuration loaded");

    match args.command {
        Command::Distance { point, center, north } => {
            let result = geo::distance_and_azimuth(point, center, north);
            println!("Distance: {}", geo::format_distance(result.distance_m, config.units));
            println!("Azimuth:  {:.2}°", result.azimuth_deg);
        }
        Command::Format { lat, lon, dms } => {
            let c = Coordinate::new(lat, lon)?;
            println!("{}", geo::format_lat_lon(c.lat(), c.lon(), dms));
        }
        Command::Parse { text } => {
            let (lat, lon) = geo::parse_lat_lon(&text)?;
            println!("{:.6}, {:.6}", lat, lon);
        }
        Command::Predict {
            position,
            accuracy,
            bearing,
            speed,
            elapsed,
        } => {
            let fix = Fix::new(position, accuracy, bearing, speed, chrono::Utc::now())?;
            let predictor = nav_engine::predict::LocationPredictor::new((&config).into())?;
            let p = predictor.predict(&fix, elapsed);
            println!("{}", geo::format_lat_lon(p.coordinate.lat(), p.coordinate.lon(), false));
            println!("Accuracy: {}", geo::format_distance(p.accuracy_m, config.units));
            if !p.extrapolated {
                println!("(position held)");
            }
        }
        Command::Link {
            position,
            zoom,
            name,
            http,
        } => {
            let url = if http {
                geo::http_ge0_url(position.lat(), position.lon(), zoom, &name)
            } else {
                geo::generate_ge0_url(position.lat(), position.lon(), zoom, &name)
            };
            println!("{}", url);
        }
        Command::Decode { url } => {
            let link = decode_ge0_url(&url)?;
            println!("{}", geo::format_lat_lon(link.lat, link.lon, false));
            println!("Zoom: {}", link.zoom);
            if !link.name.is_empty() {
                println!("Name: {}", link.name);
            }
        }
        Command::Route {
            from,
            to,
            countries,
            present,
        } => run_route(config, from, to, countries, present).await?,
    }

    Ok(())
}
