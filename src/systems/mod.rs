// src/systems/mod.rs
//! Phase orchestrators and domain resolvers. The turn driver runs the four
//! phases in fixed order; each phase mutates the world state through the
//! managers and appends to the ordered event log. No state flows around a
//! phase: everything inter-phase lives in committed fields on `GameState`.

pub mod combat;
pub mod command;
pub mod commissioning;
pub mod conflict;
pub mod construction;
pub mod espionage;
pub mod income;
pub mod maintenance;
pub mod orders_exec;
pub mod simultaneous;

pub use combat::{CombatResolver, DefaultCombatResolver};

use crate::config::Config;
use crate::core::events::{CombatReport, GameEvent};
use crate::core::rng::TurnRng;

/// Per-turn working set threaded through the phases: the RNG stream, the
/// event log and the combat reports. Dropped commands become warnings here
/// instead of aborting the turn.
pub struct TurnContext<'a> {
    pub config: &'a Config,
    pub rng: TurnRng,
    pub events: Vec<GameEvent>,
    pub reports: Vec<CombatReport>,
    pub turn: u32,
}

impl<'a> TurnContext<'a> {
    pub fn new(config: &'a Config, rng: TurnRng, turn: u32) -> Self {
        Self {
            config,
            rng,
            events: Vec::new(),
            reports: Vec::new(),
            turn,
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.events.push(GameEvent::EngineWarning { message });
    }
}
