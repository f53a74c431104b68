pub mod chart;
pub mod color;
pub mod config;
pub mod controller;
pub mod data;
pub mod join;
pub mod legend;
pub mod map;
pub mod projection;
pub mod render;
pub mod scale;
pub mod scene;
pub mod server;
pub mod state;
pub mod svg;
pub mod topojson;
pub mod transition;
pub mod types;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the map, chart and legend to one SVG per attribute
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Render only this attribute instead of every configured one
        #[arg(short, long)]
        attribute: Option<String>,
        /// Outline the country with this key on both map and chart
        #[arg(long, value_name = "KEY")]
        highlight: Option<String>,
    },
    /// Write the frames of the transition between two attributes
    Animate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Attribute shown before the change (defaults to the first configured one)
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: String,
        #[arg(long, default_value_t = 30)]
        fps: u32,
    },
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render {
            config,
            attribute,
            highlight,
        } => {
            let (app_config, dataset) = load(&config).await?;

            let attributes = match attribute {
                Some(name) => {
                    ensure_attribute(&app_config, &name)?;
                    vec![name]
                }
                None => app_config.attributes.names.clone(),
            };

            let palette = color::Palette::from_config(&app_config.colors)?;
            let canvas = map::MapCanvas::project(&dataset.features, &app_config.map);
            let paths = render::generate_documents(
                &app_config,
                &dataset,
                &canvas,
                &palette,
                &attributes,
                highlight.as_deref(),
            )?;
            for path in &paths {
                info!("Wrote {:?}", path);
            }
        }
        Commands::Animate {
            config,
            from,
            to,
            fps,
        } => {
            let (app_config, dataset) = load(&config).await?;
            let from = from.unwrap_or_else(|| app_config.default_attribute().to_string());
            ensure_attribute(&app_config, &from)?;
            ensure_attribute(&app_config, &to)?;

            let mut controller = controller::Controller::new(app_config.clone(), dataset)?;
            render::write_frames(&app_config, &mut controller, &from, &to, fps)?;
        }
        Commands::Serve { config } => {
            let (app_config, dataset) = load(&config).await?;
            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}

/// Reads the config, loads both inputs and joins them. Any failure aborts before rendering.
async fn load(path: &Path) -> Result<(config::AppConfig, types::Dataset)> {
    info!("Using config {:?}", path);
    let app_config = config::AppConfig::load_from_file(path)?;
    info!(
        attributes = ?app_config.attributes.names,
        buckets = app_config.bucket_count(),
        "Configuration loaded"
    );

    // 1. Load data
    let mut dataset = data::load_data(&app_config).await?;

    // 2. Join CSV attributes onto the features
    let matched = join::join_records(
        &mut dataset.features,
        &dataset.records,
        &app_config.attributes.names,
    );
    info!(
        "Joined {} of {} features to CSV records",
        matched,
        dataset.features.len()
    );

    Ok((app_config, dataset))
}

fn ensure_attribute(config: &config::AppConfig, name: &str) -> Result<()> {
    if !config.attributes.names.iter().any(|a| a == name) {
        bail!(
            "Unknown attribute '{}'; expected one of {:?}",
            name,
            config.attributes.names
        );
    }
    Ok(())
}
