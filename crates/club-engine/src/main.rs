//! Session runner for the climate club turn engine.
//!
//! Loads configuration and the project/event/country catalog, opens the
//! JSON state document, and plays a bot-driven session of quarterly turns
//! through [`ClubEngine`].
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `club-config.yaml` (or `CLUB_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the catalog and GDP table
//! 4. Open the state store and the engine
//! 5. Seat the bot players
//! 6. Play the configured number of rounds
//! 7. Log the result

mod bots;
mod error;

use std::path::{Path, PathBuf};

use club_core::ClubEngine;
use club_core::catalog::CatalogFile;
use club_core::config::{ClubConfig, LogFormat, LoggingConfig};
use club_core::coordination;
use club_store::JsonFileStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the session runner.
///
/// # Errors
///
/// Returns an error if any initialization step or the session fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        path = %config_path.display(),
        start_year = config.game.start_year,
        end_year = config.game.end_year,
        seed = ?config.game.seed,
        "club-engine starting"
    );

    // 3. Load the catalog.
    let (catalog, gdp) = load_catalog(Path::new(&config.storage.catalog_path))?.into_parts();
    info!(
        catalog = %config.storage.catalog_path,
        countries = gdp.len(),
        "Catalog loaded"
    );

    // 4. Open the store and the engine.
    let store = JsonFileStore::new(&config.storage.state_path);
    info!(path = %store.path().display(), "State store opened");
    let rounds = config.session.rounds;
    let countries = config.session.countries.clone();
    let bot_seed = config.game.seed.map(|s| s.wrapping_add(1));
    let engine = ClubEngine::open(config, catalog, gdp, store);
    let state = engine.snapshot().await;
    info!(
        turn = state.turn,
        year = state.year,
        quarter = state.quarter,
        floor = state.floor,
        market = state.market,
        "Engine ready"
    );

    // 5. Seat the bots.
    let seated = bots::seat_bots(&countries);
    bots::seat_in_club(&engine, &seated).await?;
    info!(bots = seated.len(), "Bots seated");

    // 6. Play the session.
    let mut rng = bot_seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
    let summary = bots::play_session(&engine, &seated, rounds, &mut rng).await?;

    // 7. Log results.
    let state = engine.snapshot().await;
    let index = coordination::breakdown(&state);
    info!(
        rounds = summary.rounds_played,
        floor_changes = summary.floor_changes,
        guidance_breaks = summary.guidance_breaks,
        interventions = summary.interventions,
        dividends = summary.dividends,
        "Session complete"
    );
    info!(
        turn = state.turn,
        floor = state.floor,
        market = state.market,
        credibility = state.credibility,
        private_share = state.private_share,
        cumulative_xcr = state.cumulative_xcr,
        total_mitigation = state.total_mitigation,
        coordination = index.total,
        coordination_level = index.description,
        "club-engine shutdown complete"
    );
    Ok(())
}

/// Config file location: `CLUB_CONFIG`, else `club-config.yaml`.
fn config_path() -> PathBuf {
    std::env::var_os("CLUB_CONFIG").map_or_else(|| PathBuf::from("club-config.yaml"), PathBuf::from)
}

/// Load the configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<ClubConfig, EngineError> {
    if path.exists() {
        Ok(ClubConfig::from_file(path)?)
    } else {
        Ok(ClubConfig::parse("")?)
    }
}

/// Load the catalog, falling back to an empty one when the file is absent.
fn load_catalog(path: &Path) -> Result<CatalogFile, EngineError> {
    if path.exists() {
        Ok(CatalogFile::from_file(path)?)
    } else {
        warn!(path = %path.display(), "Catalog file not found, playing without projects or events");
        Ok(CatalogFile::default())
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
