// src/main.rs
//! Operational CLI around the engine library. Exit codes: 0 success,
//! 1 game database not found, 2 invalid configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use stellar_throne::config::{Config, ConfigError};
use stellar_throne::core::rng::TurnRng;
use stellar_throne::core::setup::{self, NewGameParams};
use stellar_throne::persistence::{self, GameDir, PersistenceError};
use stellar_throne::systems::DefaultCombatResolver;

#[derive(Parser)]
#[command(name = "stellar-throne", about = "Deterministic turn-resolution engine")]
struct Cli {
    /// Directory holding the per-game databases.
    #[arg(long, default_value = "games")]
    games_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new game database.
    Start {
        /// Game identifier (directory name).
        game_id: String,
        /// Balance config file; compiled-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 4)]
        houses: u8,
        #[arg(long, default_value_t = 24)]
        systems: u16,
    },
    /// Resolve one turn of an existing game.
    Resolve { game_id: String },
    /// Show the games on disk and where they stand.
    Status,
    /// Stop a game; resolve refuses until it is started again.
    Stop { game_id: String },
    /// Print the engine version.
    Version,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::NotFound(msg)) => {
            eprintln!("error: {}", msg);
            ExitCode::from(1)
        }
        Err(AppError::Config(e)) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
        Err(AppError::Other(msg)) => {
            eprintln!("error: {}", msg);
            ExitCode::FAILURE
        }
    }
}

enum AppError {
    NotFound(String),
    Config(ConfigError),
    Other(String),
}

impl From<PersistenceError> for AppError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::NotFound(path) => {
                AppError::NotFound(format!("game database not found: {}", path))
            }
            PersistenceError::Config(c) => AppError::Config(c),
            other => AppError::Other(other.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Start {
            game_id,
            config,
            seed,
            houses,
            systems,
        } => {
            let config = match config {
                Some(path) => Config::load(path)?,
                None => Config::builtin(),
            };
            let params = NewGameParams {
                seed,
                houses,
                systems,
            };
            let state = setup::new_game(&config, &params)
                .map_err(|e| AppError::Other(e.to_string()))?;
            let dir = GameDir::new(&cli.games_dir, &game_id);
            if dir.exists() {
                return Err(AppError::Other(format!("game '{}' already exists", game_id)));
            }
            dir.create(&state, &config)?;
            dir.clear_stopped()?;
            println!(
                "started game '{}': {} houses, {} systems, seed {}",
                game_id,
                houses,
                state.starmap.len(),
                seed
            );
            Ok(())
        }
        Command::Resolve { game_id } => {
            let dir = GameDir::new(&cli.games_dir, &game_id);
            if !dir.exists() {
                return Err(AppError::NotFound(format!(
                    "game database not found: {}",
                    dir.path().display()
                )));
            }
            if dir.is_stopped() {
                return Err(AppError::Other(format!("game '{}' is stopped", game_id)));
            }
            let config = dir.load_config()?;
            let mut state = dir.load_state()?;
            let packets = dir.load_packets(state.turn)?;
            let turn = state.turn;
            let seed = TurnRng::turn_seed(state.game_seed, turn);
            let mut resolver = DefaultCombatResolver::new();
            let output = state.advance(&packets, seed, &config, &mut resolver);
            dir.save_events(turn, &output.events)?;
            dir.save_reports(turn, &output.reports)?;
            dir.save_state(&state)?;
            println!(
                "resolved turn {} of '{}': {} events, {} combat reports",
                turn,
                game_id,
                output.events.len(),
                output.reports.len()
            );
            Ok(())
        }
        Command::Status => {
            let games = persistence::list_games(&cli.games_dir)?;
            if games.is_empty() {
                println!("no games in {}", cli.games_dir.display());
                return Ok(());
            }
            for id in games {
                let dir = GameDir::new(&cli.games_dir, &id);
                match dir.load_state() {
                    Ok(state) => {
                        let stopped = if dir.is_stopped() { " [stopped]" } else { "" };
                        println!(
                            "{}: turn {}, {} houses, {} colonies, {} fleets{}",
                            id,
                            state.turn,
                            state.houses.len(),
                            state.colonies.len(),
                            state.fleets.len(),
                            stopped
                        );
                    }
                    Err(e) => println!("{}: unreadable ({})", id, e),
                }
            }
            Ok(())
        }
        Command::Stop { game_id } => {
            let dir = GameDir::new(&cli.games_dir, &game_id);
            if !dir.exists() {
                return Err(AppError::NotFound(format!(
                    "game database not found: {}",
                    dir.path().display()
                )));
            }
            dir.mark_stopped()?;
            println!("stopped game '{}'", game_id);
            Ok(())
        }
        Command::Version => {
            println!("stellar-throne {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
