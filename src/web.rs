#![cfg(not(tarpaulin_include))]

use minidesk::app;
use minidesk::config::{self, Config, DEFAULT_ENV_FILE};
use std::env;
use std::path::Path;

/// Main entry point for the web application
///
/// Reads configuration from the environment, topped up from a `.env` file in
/// the working directory; an optional first argument overrides the bind
/// address, e.g. `website 0.0.0.0:8080`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = config::load_env_file(Path::new(DEFAULT_ENV_FILE));
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match env_file {
        Ok(Some(path)) => log::debug!("Loaded environment from {}", path.display()),
        Ok(None) => log::debug!("No {} file found", DEFAULT_ENV_FILE),
        Err(e) => log::warn!("Ignoring unreadable {} file: {}", DEFAULT_ENV_FILE, e),
    }

    let mut config = Config::from_env()?;
    if let Some(addr) = env::args().nth(1) {
        config = config.with_bind_addr(&addr)?;
    }

    log::info!(
        "Starting web server; projects file {}",
        config.projects_file.display()
    );
    app::run(config).await?;

    Ok(())
}
