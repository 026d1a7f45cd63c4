// src/systems/income.rs
//! Income phase: gross colonial output, tax collection, the tax-rate
//! prestige policy and population growth.
//!
//! GCO = PU * RAW_INDEX(class, resources)
//!     + IU * EL_MOD(EL) * (1 + PROD_GROWTH(tax)),
//! then scaled by surviving infrastructure and, for blockaded colonies,
//! the blockade factor.

use crate::config::Config;
use crate::core::entities::Colony;
use crate::core::events::GameEvent;
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::TurnContext;

pub fn run(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    collect_taxes(state, ctx);
    apply_tax_prestige(state, ctx);
    grow_population(state, ctx);
}

/// PROD_GROWTH = (50 - tax) / 500. High taxes smother the industrial term.
fn prod_growth(tax: u8) -> f64 {
    (50.0 - f64::from(tax)) / 500.0
}

pub fn effective_tax(colony: &Colony, house_rate: u8) -> u8 {
    colony.tax_override.unwrap_or(house_rate)
}

/// Pre-tax output of one colony in PP.
pub fn gross_colony_output(colony: &Colony, tech: &TechLevels, tax: u8, config: &Config) -> f64 {
    let raw = config.raw_index(colony.planet_class, colony.resources);
    let el_mod = 1.0 + config.economy.el_mod_per_level * f64::from(tech.economic.saturating_sub(1));
    let mut gco = colony.pu as f64 * raw + colony.iu as f64 * el_mod * (1.0 + prod_growth(tax));
    gco *= 1.0 - colony.infrastructure_damage;
    if colony.blockaded {
        gco *= config.economy.blockade_output_factor;
    }
    gco.max(0.0)
}

/// GHO: the sum over all owned colonies, used to price research points.
pub fn gross_house_output(state: &GameState, house: HouseId, config: &Config) -> i64 {
    let Ok(h) = state.houses.get(house) else {
        return 0;
    };
    let mut total = 0.0;
    for id in state.colonies.ids_of_house(house) {
        if let Ok(colony) = state.colonies.get(id) {
            let tax = effective_tax(colony, h.tax_rate);
            total += gross_colony_output(colony, &h.tech, tax, config);
        }
    }
    total.floor() as i64
}

/// PP-to-RP conversion: the price of a research point rises with house
/// output and the current level of the field being funded.
pub fn pp_to_rp(pp: i64, gho: i64, level: u8, config: &Config) -> i64 {
    if pp <= 0 {
        return 0;
    }
    let cost_per_rp = (gho / config.research.gho_divisor).max(1) * i64::from(level.max(1));
    pp / cost_per_rp
}

fn collect_taxes(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for house_id in state.houses.ids() {
        let Ok(house) = state.houses.get(house_id) else {
            continue;
        };
        if house.is_eliminated() {
            continue;
        }
        let (rate, tech) = (house.tax_rate, house.tech);
        let mut ncv_total = 0i64;
        for colony_id in state.colonies.ids_of_house(house_id) {
            let Ok(colony) = state.colonies.get(colony_id) else {
                continue;
            };
            let tax = effective_tax(colony, rate);
            let gco = gross_colony_output(colony, &tech, tax, ctx.config);
            ncv_total += (gco * f64::from(tax) / 100.0).floor() as i64;
        }
        if ncv_total > 0 {
            let _ = state.houses.credit(house_id, ncv_total);
        }
        if let Ok(h) = state.houses.get_mut(house_id) {
            h.telemetry.income_collected = ncv_total;
        }
        ctx.push(GameEvent::IncomeCollected {
            house: house_id,
            amount: ncv_total,
        });
    }
}

/// Prestige from tax policy: a sustained high average bleeds prestige, a
/// gentle current rate earns a small bonus per colony.
fn apply_tax_prestige(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let policy = ctx.config.prestige.clone();
    for house_id in state.houses.ids() {
        let Ok(house) = state.houses.get_mut(house_id) else {
            continue;
        };
        if house.is_eliminated() {
            continue;
        }
        // Maintain the 6-turn rolling window.
        house.tax_history.push_back(house.tax_rate);
        while house.tax_history.len() > 6 {
            house.tax_history.pop_front();
        }
        let average = house.average_tax_rate();
        let current = house.tax_rate;

        if average >= policy.high_tax_threshold {
            let over = u32::from(average - policy.high_tax_threshold);
            let penalty = (1 + (over / u32::from(policy.high_tax_step.max(1))) as i32)
                .min(policy.high_tax_max_penalty);
            house.prestige -= penalty;
            ctx.push(GameEvent::PrestigeAdjusted {
                house: house_id,
                delta: -penalty,
                reason: "punitive taxation".into(),
            });
        }

        let per_colony = policy
            .colony_bonus_bands
            .iter()
            .find(|(max_rate, _)| current <= *max_rate)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0);
        if per_colony > 0 {
            let colonies = state.colonies.count_of_house(house_id) as i32;
            let bonus = per_colony * colonies;
            if bonus > 0 {
                if let Ok(h) = state.houses.get_mut(house_id) {
                    h.prestige += bonus;
                }
                ctx.push(GameEvent::PrestigeAdjusted {
                    house: house_id,
                    delta: bonus,
                    reason: "light taxation".into(),
                });
            }
        }
    }
}

/// Logistic growth toward the planet's carrying capacity, scaled by the
/// same (50 - tax)/500 multiplier that drives the industrial term.
fn grow_population(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    let growth_rate = ctx.config.population.growth_rate;
    let spu = ctx.config.economy.souls_per_pu;
    for colony_id in state.colonies.ids() {
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        let Ok(house) = state.houses.get(colony.house) else {
            continue;
        };
        if house.is_eliminated() {
            continue;
        }
        let tax = effective_tax(colony, house.tax_rate);
        let capacity = ctx.config.population.max_souls[colony.planet_class.index()];
        let souls = colony.souls;
        if souls <= 0 || capacity <= 0 {
            continue;
        }
        let logistic = 1.0 - souls as f64 / capacity as f64;
        let multiplier = 1.0 + prod_growth(tax);
        let growth = (souls as f64 * growth_rate * logistic.max(0.0) * multiplier).floor() as i64;
        if growth == 0 {
            continue;
        }
        if let Ok(colony) = state.colonies.get_mut(colony_id) {
            colony.souls += growth;
            colony.pu = colony.souls / spu;
        }
        ctx.push(GameEvent::PopulationGrowth {
            colony: colony_id,
            souls: growth,
        });
    }
}
