pub mod death;
pub mod roll;
pub mod state;

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use rk_mechanics::{Engine, EngineConfig, JsonFileBackend, RngRoller, StateStore, StoreError};
use serde::Serialize;

/// Options shared by every subcommand.
#[derive(Args)]
pub struct Session {
    /// State file holding every user's record
    #[arg(long, global = true, default_value = "rollkeeper-state.json")]
    pub state: PathBuf,

    /// TOML file with thresholds, limits, and distinguished users
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// RNG seed for reproducible rolls
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

impl Session {
    /// Load config and state and build an engine.
    pub fn engine(&self) -> Result<Engine, String> {
        let config = match &self.config {
            Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
            None => EngineConfig::default(),
        };
        let store =
            StateStore::open(JsonFileBackend::new(&self.state)).map_err(|e| e.to_string())?;
        let roller = match self.seed {
            Some(seed) => RngRoller::seeded(seed),
            None => RngRoller::from_entropy(),
        };
        Ok(Engine::new(config, store, roller))
    }
}

/// Print a value as pretty JSON.
fn print_json(value: &impl Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

/// Tell the user a change was kept in memory only.
fn report_unsaved(warning: Option<&StoreError>) {
    if let Some(e) = warning {
        eprintln!("{} state not saved: {e}", "warning:".yellow());
    }
}
