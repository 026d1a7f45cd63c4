// src/persistence.rs
//! Game-directory persistence. One directory per game:
//!
//! ```text
//! games/<id>/config.json          balance tables snapshotted at start
//! games/<id>/state.json           the whole GameState, pretty JSON
//! games/<id>/packets/turn_N.json  command packets submitted for turn N
//! games/<id>/events/turn_N.json   event log produced by turn N
//! games/<id>/reports/turn_N.json  combat reports produced by turn N
//! games/<id>/stopped              marker; resolve refuses while present
//! ```
//!
//! The engine itself has no side effects; everything here is caller
//! plumbing around `advance`. Round-trip law: a state saved and reloaded
//! resolves identically to the original.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigError};
use crate::core::events::{CombatReport, GameEvent};
use crate::core::orders::CommandPacket;
use crate::core::GameState;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("game database not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt game file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct GameDir {
    root: PathBuf,
}

impl GameDir {
    pub fn new(games_dir: &Path, game_id: &str) -> Self {
        Self {
            root: games_dir.join(game_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.join("state.json").exists()
    }

    /// Create the directory skeleton and write the initial state plus a
    /// config snapshot.
    pub fn create(&self, state: &GameState, config: &Config) -> Result<(), PersistenceError> {
        fs::create_dir_all(self.root.join("packets"))?;
        fs::create_dir_all(self.root.join("events"))?;
        fs::create_dir_all(self.root.join("reports"))?;
        config.save(self.root.join("config.json"))?;
        self.save_state(state)?;
        Ok(())
    }

    pub fn load_config(&self) -> Result<Config, PersistenceError> {
        Ok(Config::load(self.root.join("config.json"))?)
    }

    pub fn save_state(&self, state: &GameState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state)?;
        // Write-then-rename so a crash cannot leave a torn state file.
        let tmp = self.root.join("state.json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(tmp, self.root.join("state.json"))?;
        Ok(())
    }

    pub fn load_state(&self) -> Result<GameState, PersistenceError> {
        let path = self.root.join("state.json");
        if !path.exists() {
            return Err(PersistenceError::NotFound(
                self.root.to_string_lossy().into_owned(),
            ));
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Packets submitted for `turn`; an absent file is an empty submission
    /// round (every house goes MIA-counting).
    pub fn load_packets(&self, turn: u32) -> Result<Vec<CommandPacket>, PersistenceError> {
        let path = self.root.join("packets").join(format!("turn_{}.json", turn));
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_events(&self, turn: u32, events: &[GameEvent]) -> Result<(), PersistenceError> {
        let path = self.root.join("events").join(format!("turn_{}.json", turn));
        fs::write(path, serde_json::to_string_pretty(events)?)?;
        Ok(())
    }

    pub fn save_reports(&self, turn: u32, reports: &[CombatReport]) -> Result<(), PersistenceError> {
        let path = self
            .root
            .join("reports")
            .join(format!("turn_{}.json", turn));
        fs::write(path, serde_json::to_string_pretty(reports)?)?;
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.root.join("stopped").exists()
    }

    pub fn mark_stopped(&self) -> Result<(), PersistenceError> {
        fs::write(self.root.join("stopped"), b"stopped\n")?;
        Ok(())
    }

    pub fn clear_stopped(&self) -> Result<(), PersistenceError> {
        let path = self.root.join("stopped");
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// All game ids under the games directory, sorted.
pub fn list_games(games_dir: &Path) -> Result<Vec<String>, PersistenceError> {
    let mut out = Vec::new();
    if !games_dir.exists() {
        return Ok(out);
    }
    for entry in fs::read_dir(games_dir)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if entry.path().join("state.json").exists() {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    out.sort();
    Ok(out)
}
