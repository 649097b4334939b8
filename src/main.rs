//! Miyobi: dims the screen while the viewer sits too close to it.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use miyobi::{app::MiyobiApp, cli::Args, config::Config, Error};

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Welcome to Miyobi!");
    debug!("Built for {}", env!("BUILD_TARGET"));

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    args.apply_to(&mut config);

    if let Some(path) = &args.dump_config {
        config
            .to_file(path)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let mut app = match MiyobiApp::new(&config) {
        Ok(app) => app,
        Err(Error::NoCameraFound(reason)) => {
            error!("No working camera found: {}", reason);
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("failed to start"),
    };

    let summary = app.run()?;
    info!("Stopped: {:?}", summary.stop_reason);

    Ok(())
}
