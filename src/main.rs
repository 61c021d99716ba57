extern crate log;
pub mod config;
pub mod crs;
pub mod form;
pub mod geofile;
pub mod inventory;
use crate::config::Config;
use crate::crs::crs_utils::{ProjReprojector, EPSG_CS2000_ZONE_7};
use crate::form::generate_form;
use crate::inventory::portal::{PortalClient, RetryingThemeSource};
use crate::inventory::trees::TreesDownloader;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collects the city tree inventory and prepares natural monument applications.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file. Built-in defaults are used for anything it leaves out.
    #[arg(short, long, global = true)]
    config_filepath: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download all tree themes and extract potential monuments.
    DownloadTrees {
        /// Query the portal even when a cached response exists.
        #[arg(long)]
        no_cache: bool,
    },
    /// Write the monument application PDF for the configured tree.
    GenerateForm,
}

fn download_trees(config: &Config, no_cache: bool) -> anyhow::Result<()> {
    let mut inventory_config = config.inventory.clone();
    if no_cache {
        inventory_config.cache_enabled = false;
    }
    let reprojector = ProjReprojector::new(EPSG_CS2000_ZONE_7)?;
    let portal = RetryingThemeSource::new(
        PortalClient::new(inventory_config.portal.clone())?,
        inventory_config.portal.retries,
    );
    let trees_downloader = TreesDownloader::new(portal, &reprojector, &inventory_config)?;
    let summary = trees_downloader.download_trees()?;
    log::info!("{:?}", summary);
    if summary.tiles_failed > 0 {
        log::warn!(
            "{} of {} tile requests failed; rerun to fill the gaps from the cache",
            summary.tiles_failed,
            summary.tiles_requested
        );
    }
    Ok(())
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config_filepath {
        Some(config_filepath) => Config::from_file(config_filepath)?,
        None => Config::default(),
    };

    match args.command {
        Command::DownloadTrees { no_cache } => download_trees(&config, no_cache),
        Command::GenerateForm => {
            generate_form(&config.form, chrono::Local::now().date_naive())
        }
    }
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
