//! # Stellar Throne Engine
//!
//! Deterministic turn-resolution engine for a 4X grand-strategy game:
//! spaceborne feudal houses competing over a star map. Players submit one
//! command packet per turn; the engine consumes all packets and advances
//! the world atomically through a fixed four-phase pipeline.
//!
//! ## Architecture Overview
//!
//! - [`GameState`]: the whole world, owner of the entity managers and the
//!   pending inter-phase queues
//! - **Managers**: arena-style entity stores with validated CRUD
//!   operations (houses, colonies + facilities, fleets, spy scouts)
//! - **Systems**: the phase orchestrators and domain resolvers
//! - [`Config`]: read-only balance tables, loaded once at startup
//!
//! ## Phase Order
//!
//! Each turn runs exactly:
//! 1. Conflict (combat, blockades, invasions, colonization, espionage)
//! 2. Command (commissioning, player packets, research, build submission)
//! 3. Income (colonial output, taxes, prestige, population growth)
//! 4. Maintenance (queues, order activation, upkeep, capacity)
//!
//! The same `(state, packets, rng_seed)` triple always yields the same
//! `(state', events, reports)`, across runs, machines and process
//! restarts. Validation failures never abort a turn; they surface as
//! [`GameEvent::EngineWarning`] entries in the ordered event log.
//!
//! ## Quick Start
//!
//! ```rust
//! use stellar_throne::config::Config;
//! use stellar_throne::core::rng::TurnRng;
//! use stellar_throne::core::setup::{self, NewGameParams};
//! use stellar_throne::systems::DefaultCombatResolver;
//!
//! let config = Config::builtin();
//! let mut state = setup::new_game(&config, &NewGameParams::default()).unwrap();
//! let mut resolver = DefaultCombatResolver::new();
//! let seed = TurnRng::turn_seed(state.game_seed, state.turn);
//! let output = state.advance(&[], seed, &config, &mut resolver);
//! assert_eq!(state.turn, 2);
//! assert!(!output.events.is_empty());
//! ```

pub mod config;
pub mod core;
pub mod managers;
pub mod persistence;
pub mod systems;

pub use crate::config::Config;
pub use crate::core::{
    CombatReport, CommandPacket, GameError, GameEvent, GameResult, GameState, TurnOutput,
};

/// Engine version, from the crate manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
