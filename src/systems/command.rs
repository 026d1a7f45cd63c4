// src/systems/command.rs
//! Command phase: apply the player packets in canonical step order.
//! Everything here is per-command recoverable: a bad command turns into an
//! `EngineWarning` and the rest of the packet still executes.

use std::collections::BTreeMap;

use crate::core::entities::{Cargo, GroundUnit, RepairTarget, TerraformProject};
use crate::core::events::GameEvent;
use crate::core::orders::{
    AdminCommand, CargoSpec, ColonyControl, CommandPacket, PopulationTransfer, QueuedCovertAction,
    ScrapCommand,
};
use crate::core::types::*;
use crate::core::GameState;
use crate::systems::{commissioning, construction, income, orders_exec, TurnContext};

pub fn run(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    track_missing_packets(state, packets, ctx);
    cleanup_finished_orders(state);
    commissioning::commission_military(state, ctx);
    colony_automation(state, ctx);
    admin_commands(state, packets, ctx);
    store_fleet_orders(state, packets, ctx);
    allocate_research(state, packets, ctx);
    submissions(state, packets, ctx);
}

/// MIA bookkeeping. Three silent turns put a house on autopilot; a packet
/// brings it back.
fn track_missing_packets(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    let threshold = ctx.config.mia_threshold;
    for id in state.houses.ids() {
        let Ok(house) = state.houses.get_mut(id) else {
            continue;
        };
        if house.status == HouseStatus::DefensiveCollapse {
            continue;
        }
        if packets.contains_key(&id) {
            house.turns_without_orders = 0;
            if house.status == HouseStatus::Autopilot {
                house.status = HouseStatus::Active;
                ctx.push(GameEvent::HouseStatusChanged {
                    house: id,
                    status: HouseStatus::Active,
                });
            }
        } else {
            house.turns_without_orders += 1;
            if house.turns_without_orders >= threshold && house.status == HouseStatus::Active {
                house.status = HouseStatus::Autopilot;
                log::info!("house {} went autopilot (MIA)", id);
                ctx.push(GameEvent::HouseStatusChanged {
                    house: id,
                    status: HouseStatus::Autopilot,
                });
            }
        }
    }
}

/// Step 0: last turn's completions, failures and aborts clear their stored
/// orders.
fn cleanup_finished_orders(state: &mut GameState) {
    let last = std::mem::take(&mut state.last_turn_events);
    for event in &last {
        let fleet = match event {
            GameEvent::OrderCompleted { fleet, .. }
            | GameEvent::OrderFailed { fleet, .. }
            | GameEvent::OrderAborted { fleet, .. } => *fleet,
            _ => continue,
        };
        state.fleet_orders.remove(&fleet);
    }
    state.last_turn_events = last;
}

/// Step 2: per-colony automation. Auto-load pushes fresh fighters onto
/// carriers; auto-repair sweeps every crippled friendly hull into the
/// shipyard queue (all of them; the queue absorbs overflow FIFO).
fn colony_automation(state: &mut GameState, ctx: &mut TurnContext<'_>) {
    for colony_id in state.colonies.ids() {
        let Ok(colony) = state.colonies.get(colony_id) else {
            continue;
        };
        let (auto_load, auto_repair) = (colony.auto_load_fighters, colony.auto_repair);
        if auto_load {
            commissioning::auto_load_fighters(state, colony_id, ctx);
        }
        if auto_repair {
            auto_repair_colony(state, colony_id, ctx);
        }
    }
}

fn auto_repair_colony(state: &mut GameState, colony_id: ColonyId, ctx: &mut TurnContext<'_>) {
    let Ok(colony) = state.colonies.get(colony_id) else {
        return;
    };
    let house = colony.house;
    let system = colony.system;
    // Spaceports cannot repair; without a shipyard the sweep is a no-op.
    let Some(&shipyard) = colony.shipyards.first() else {
        return;
    };
    let starbases = colony.starbases.clone();

    let mut fleet_ids = state.fleets.ids_at_system(system);
    fleet_ids.retain(|&id| {
        state
            .fleets
            .get(id)
            .map(|f| f.house == house)
            .unwrap_or(false)
    });
    fleet_ids.sort_unstable();

    for fleet_id in fleet_ids {
        let Ok(fleet) = state.fleets.get(fleet_id) else {
            continue;
        };
        let mut crippled: Vec<(ShipId, i64)> = fleet
            .ships()
            .filter(|s| s.crippled)
            .map(|s| (s.id, s.cost_paid))
            .collect();
        crippled.sort_unstable();
        for (ship, cost_paid) in crippled {
            if repair_already_queued(state, colony_id, RepairTarget::Ship { fleet: fleet_id, ship })
            {
                continue;
            }
            let cost = (cost_paid as f64 * ctx.config.construction.repair_cost_rate).ceil() as i64;
            if state.houses.debit(house, cost).is_err() {
                log::debug!("auto-repair at colony {} skipped, treasury dry", colony_id);
                continue;
            }
            if let Ok(h) = state.houses.get_mut(house) {
                h.telemetry.build_spent += cost;
            }
            ctx.push(GameEvent::BuildCharged {
                house,
                amount: cost,
            });
            let _ = construction::enqueue_repair(
                state,
                shipyard,
                RepairTarget::Ship { fleet: fleet_id, ship },
                cost,
                ctx.config.construction.repair_turns,
            );
        }
    }

    // Starbase auto-repair mirrors the ship sweep.
    for sb in starbases {
        let crippled = state
            .colonies
            .facility(sb)
            .map(|f| f.crippled)
            .unwrap_or(false);
        if !crippled {
            continue;
        }
        let target = RepairTarget::Starbase {
            colony: colony_id,
            facility: sb,
        };
        if repair_already_queued(state, colony_id, target) {
            continue;
        }
        let cost_paid = state
            .colonies
            .facility(sb)
            .map(|f| f.cost_paid)
            .unwrap_or(0);
        let cost = (cost_paid as f64 * ctx.config.construction.repair_cost_rate).ceil() as i64;
        if state.houses.debit(house, cost).is_err() {
            continue;
        }
        if let Ok(h) = state.houses.get_mut(house) {
            h.telemetry.build_spent += cost;
        }
        ctx.push(GameEvent::BuildCharged {
            house,
            amount: cost,
        });
        let _ = construction::enqueue_repair(
            state,
            shipyard,
            target,
            cost,
            ctx.config.construction.repair_turns,
        );
    }
}

fn repair_already_queued(state: &GameState, colony_id: ColonyId, target: RepairTarget) -> bool {
    let Ok(colony) = state.colonies.get(colony_id) else {
        return false;
    };
    colony
        .shipyards
        .iter()
        .chain(colony.drydocks.iter())
        .filter_map(|&id| state.colonies.facility(id).ok())
        .any(|f| {
            f.active_repairs.iter().any(|r| r.target == target)
                || f.repair_queue.iter().any(|r| r.target == target)
        })
}

/// Steps 3–4: zero-turn commands, fleet-administrative first, then the
/// house-level instructions, per house in id order.
fn admin_commands(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    for (&house, packet) in packets {
        for cmd in &packet.admin_commands {
            if let Err(e) = apply_admin(state, house, cmd, ctx) {
                ctx.warn(format!("house {}: admin command dropped: {}", house, e));
            }
        }
        house_level_commands(state, house, packet, ctx);
    }
}

fn apply_admin(
    state: &mut GameState,
    house: HouseId,
    cmd: &AdminCommand,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    match cmd {
        AdminCommand::MergeFleets { from, into } => {
            check_fleet_owner(state, house, *from)?;
            check_fleet_owner(state, house, *into)?;
            state.fleets.merge(*from, *into)?;
            ctx.push(GameEvent::FleetMerged {
                into: *into,
                from: *from,
            });
            state.fleet_orders.remove(from);
            Ok(())
        }
        AdminCommand::DetachShips { fleet, ships } => {
            check_fleet_owner(state, house, *fleet)?;
            state.fleets.detach_ships(*fleet, ships, &mut state.ids)?;
            if state.fleets.get(*fleet).map(|f| f.is_empty()).unwrap_or(false) {
                state.destroy_fleet(*fleet, "emptied by detachment", &mut ctx.events);
            }
            Ok(())
        }
        AdminCommand::TransferShips { from, to, ships } => {
            check_fleet_owner(state, house, *from)?;
            check_fleet_owner(state, house, *to)?;
            state.fleets.transfer_ships(*from, *to, ships, &mut state.ids)?;
            if state.fleets.get(*from).map(|f| f.is_empty()).unwrap_or(false) {
                state.destroy_fleet(*from, "emptied by transfer", &mut ctx.events);
            }
            Ok(())
        }
        AdminCommand::LoadCargo { fleet, cargo } => load_cargo(state, house, *fleet, *cargo, ctx),
        AdminCommand::UnloadCargo { fleet } => unload_cargo(state, house, *fleet, ctx),
        AdminCommand::LoadFighters { fleet } => {
            let colony_id = fleet_home_colony(state, house, *fleet)?;
            commissioning::auto_load_fighters(state, colony_id, ctx);
            Ok(())
        }
        AdminCommand::UnloadFighters { fleet } => unload_fighters(state, house, *fleet),
        AdminCommand::TransferShipBetweenSquadrons {
            fleet,
            from_squadron,
            to_squadron,
            ship,
        } => {
            check_fleet_owner(state, house, *fleet)?;
            state
                .fleets
                .transfer_ship_between_squadrons(*fleet, *from_squadron, *to_squadron, *ship)
        }
        AdminCommand::AssignSquadronToFleet {
            from_fleet,
            squadron,
            to_fleet,
        } => {
            check_fleet_owner(state, house, *from_fleet)?;
            check_fleet_owner(state, house, *to_fleet)?;
            state.fleets.transfer_squadron(*from_fleet, *squadron, *to_fleet)?;
            if state
                .fleets
                .get(*from_fleet)
                .map(|f| f.is_empty())
                .unwrap_or(false)
            {
                state.destroy_fleet(*from_fleet, "emptied by squadron transfer", &mut ctx.events);
            }
            Ok(())
        }
    }
}

fn check_fleet_owner(state: &GameState, house: HouseId, fleet: FleetId) -> GameResult<()> {
    let f = state.fleets.get(fleet)?;
    if f.house != house {
        return Err(GameError::NotOwner(format!("fleet {}", fleet)));
    }
    Ok(())
}

/// The fleet must be parked at a friendly colony for cargo work.
fn fleet_home_colony(state: &GameState, house: HouseId, fleet: FleetId) -> GameResult<ColonyId> {
    let f = state.fleets.get(fleet)?;
    if f.house != house {
        return Err(GameError::NotOwner(format!("fleet {}", fleet)));
    }
    let colony_id = state
        .colonies
        .colony_in_system(f.system)
        .ok_or(GameError::NoColonyInSystem(f.system))?;
    let colony = state.colonies.get(colony_id)?;
    if colony.house != house {
        return Err(GameError::NotOwner(format!("colony {}", colony_id)));
    }
    Ok(colony_id)
}

fn load_cargo(
    state: &mut GameState,
    house: HouseId,
    fleet_id: FleetId,
    cargo: CargoSpec,
    ctx: &TurnContext<'_>,
) -> GameResult<()> {
    let colony_id = fleet_home_colony(state, house, fleet_id)?;
    match cargo {
        CargoSpec::Marines { units } => {
            if units <= 0 {
                return Err(GameError::InvalidCommand("nothing to load".into()));
            }
            let available = state
                .colonies
                .get(colony_id)?
                .ground_strength(GroundUnitKind::Marine);
            if available < units {
                return Err(GameError::InvalidCommand(format!(
                    "colony {} has only {} marine strength",
                    colony_id, available
                )));
            }
            let loaded = fill_spacelift(state, fleet_id, ShipClass::TroopTransport, units, ctx)?;
            remove_marine_strength(state, colony_id, loaded);
            Ok(())
        }
        CargoSpec::Colonists { ptu } => {
            if ptu <= 0 {
                return Err(GameError::InvalidCommand("nothing to load".into()));
            }
            let souls = ptu * ctx.config.economy.ptu_souls;
            let colony_souls = state.colonies.get(colony_id)?.souls;
            if colony_souls - souls < ctx.config.economy.min_viable_souls {
                return Err(GameError::PopulationTooLow {
                    colony: colony_id,
                    required: souls + ctx.config.economy.min_viable_souls,
                    available: colony_souls,
                });
            }
            let loaded = fill_spacelift(state, fleet_id, ShipClass::Etac, ptu, ctx)?;
            let spu = ctx.config.economy.souls_per_pu;
            if let Ok(colony) = state.colonies.get_mut(colony_id) {
                colony.souls -= loaded * ctx.config.economy.ptu_souls;
                colony.pu = colony.souls / spu;
            }
            Ok(())
        }
    }
}

/// Distributes `amount` over the fleet's transports of `class`, lowest hull
/// id first, bounded by per-hull cargo capacity. Returns the amount that
/// actually found room.
fn fill_spacelift(
    state: &mut GameState,
    fleet_id: FleetId,
    class: ShipClass,
    amount: i64,
    ctx: &TurnContext<'_>,
) -> GameResult<i64> {
    let capacity = ctx.config.ship(class).cargo_capacity;
    let fleet = state.fleets.get_mut(fleet_id)?;
    let mut remaining = amount;
    let mut ship_ids: Vec<ShipId> = fleet
        .spacelift
        .iter()
        .filter(|s| s.class == class)
        .map(|s| s.id)
        .collect();
    ship_ids.sort_unstable();
    if ship_ids.is_empty() {
        return Err(GameError::MissingPrerequisite(format!(
            "fleet {} has no {:?}",
            fleet_id, class
        )));
    }
    for id in ship_ids {
        if remaining <= 0 {
            break;
        }
        let Some(ship) = fleet.spacelift.iter_mut().find(|s| s.id == id) else {
            continue;
        };
        let used = match &ship.cargo {
            Cargo::Marines { units } => *units,
            Cargo::Colonists { ptu } => *ptu,
            _ => 0,
        };
        let room = (capacity - used).max(0);
        if room == 0 {
            continue;
        }
        let take = remaining.min(room);
        ship.cargo = match (class, &ship.cargo) {
            (ShipClass::TroopTransport, Cargo::Marines { units }) => Cargo::Marines {
                units: units + take,
            },
            (ShipClass::TroopTransport, _) => Cargo::Marines { units: take },
            (_, Cargo::Colonists { ptu }) => Cargo::Colonists { ptu: ptu + take },
            (_, _) => Cargo::Colonists { ptu: take },
        };
        remaining -= take;
    }
    Ok(amount - remaining)
}

fn remove_marine_strength(state: &mut GameState, colony_id: ColonyId, mut amount: i64) {
    if amount <= 0 {
        return;
    }
    let Ok(colony) = state.colonies.get_mut(colony_id) else {
        return;
    };
    colony.ground_units.sort_by_key(|u| u.id);
    for unit in colony.ground_units.iter_mut() {
        if amount <= 0 {
            break;
        }
        if unit.kind != GroundUnitKind::Marine {
            continue;
        }
        let take = unit.strength.min(amount);
        unit.strength -= take;
        amount -= take;
    }
    colony.ground_units.retain(|u| u.strength > 0);
}

fn unload_cargo(
    state: &mut GameState,
    house: HouseId,
    fleet_id: FleetId,
    ctx: &TurnContext<'_>,
) -> GameResult<()> {
    let colony_id = fleet_home_colony(state, house, fleet_id)?;
    let mut marines = 0i64;
    let mut ptu = 0i64;
    {
        let fleet = state.fleets.get_mut(fleet_id)?;
        for ship in fleet.spacelift.iter_mut() {
            match std::mem::replace(&mut ship.cargo, Cargo::None) {
                Cargo::Marines { units } => marines += units,
                Cargo::Colonists { ptu: p } => ptu += p,
                other => ship.cargo = other,
            }
        }
    }
    if marines > 0 {
        let unit_id = state.ids.ground_unit();
        if let Ok(colony) = state.colonies.get_mut(colony_id) {
            colony.ground_units.push(GroundUnit {
                id: unit_id,
                kind: GroundUnitKind::Marine,
                strength: marines,
            });
        }
    }
    if ptu > 0 {
        let souls = ptu * ctx.config.economy.ptu_souls;
        let spu = ctx.config.economy.souls_per_pu;
        if let Ok(colony) = state.colonies.get_mut(colony_id) {
            colony.souls += souls;
            colony.pu = colony.souls / spu;
        }
    }
    Ok(())
}

fn unload_fighters(state: &mut GameState, house: HouseId, fleet_id: FleetId) -> GameResult<()> {
    let colony_id = fleet_home_colony(state, house, fleet_id)?;
    let mut unloaded = Vec::new();
    {
        let fleet = state.fleets.get_mut(fleet_id)?;
        let mut carrier_ids: Vec<ShipId> = fleet
            .ships()
            .filter(|s| s.class.is_carrier())
            .map(|s| s.id)
            .collect();
        carrier_ids.sort_unstable();
        for id in carrier_ids {
            if let Some(carrier) = fleet.find_ship_mut(id) {
                if let Cargo::Fighters { ships } = std::mem::replace(&mut carrier.cargo, Cargo::None)
                {
                    unloaded.extend(ships);
                }
            }
        }
    }
    if let Ok(colony) = state.colonies.get_mut(colony_id) {
        colony.fighters.extend(unloaded);
    }
    Ok(())
}

fn house_level_commands(
    state: &mut GameState,
    house: HouseId,
    packet: &CommandPacket,
    ctx: &mut TurnContext<'_>,
) {
    // Diplomacy: unilateral stance changes take effect immediately.
    for action in &packet.diplomacy {
        if action.toward == house || !state.houses.contains(action.toward) {
            ctx.warn(format!("house {}: bad diplomatic target", house));
            continue;
        }
        if let Ok(h) = state.houses.get_mut(house) {
            h.relations.insert(action.toward, action.status);
        }
    }

    if let Some(rate) = packet.tax_rate {
        if rate > 100 {
            ctx.warn(format!("house {}: tax rate {} out of range", house, rate));
        } else if let Ok(h) = state.houses.get_mut(house) {
            h.tax_rate = rate;
        }
    }

    for control in &packet.colony_controls {
        if let Err(e) = apply_colony_control(state, house, control) {
            ctx.warn(format!("house {}: colony control dropped: {}", house, e));
        }
    }

    // Treasury-to-budget conversions, capped per turn.
    let ebp = packet
        .ebp_investment
        .clamp(0, ctx.config.espionage.ebp_invest_cap);
    if ebp > 0 && state.houses.debit(house, ebp).is_ok() {
        if let Ok(h) = state.houses.get_mut(house) {
            h.ebp += ebp;
        }
    }
    let cip = packet
        .cip_investment
        .clamp(0, ctx.config.espionage.cip_invest_cap);
    if cip > 0 && state.houses.debit(house, cip).is_ok() {
        if let Ok(h) = state.houses.get_mut(house) {
            h.cip += cip;
        }
    }

    for transfer in &packet.population_transfers {
        if let Err(e) = apply_population_transfer(state, house, transfer, ctx) {
            ctx.warn(format!("house {}: population transfer dropped: {}", house, e));
        }
    }

    for &colony_id in &packet.terraform {
        if let Err(e) = start_terraform(state, house, colony_id, ctx) {
            ctx.warn(format!("house {}: terraform dropped: {}", house, e));
        }
    }
}

fn apply_colony_control(
    state: &mut GameState,
    house: HouseId,
    control: &ColonyControl,
) -> GameResult<()> {
    let colony = state.colonies.get_mut(control.colony)?;
    if colony.house != house {
        return Err(GameError::NotOwner(format!("colony {}", control.colony)));
    }
    if let Some(v) = control.auto_repair {
        colony.auto_repair = v;
    }
    if let Some(v) = control.auto_load_fighters {
        colony.auto_load_fighters = v;
    }
    if let Some(over) = control.tax_override {
        if let Some(rate) = over {
            if rate > 100 {
                return Err(GameError::InvalidCommand(format!(
                    "tax override {} out of range",
                    rate
                )));
            }
        }
        colony.tax_override = over;
    }
    Ok(())
}

/// PTU-granular migration between two owned colonies in the same or an
/// adjacent system.
fn apply_population_transfer(
    state: &mut GameState,
    house: HouseId,
    transfer: &PopulationTransfer,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    if transfer.ptu <= 0 {
        return Err(GameError::InvalidCommand("nothing to transfer".into()));
    }
    let (from_system, from_souls) = {
        let c = state.colonies.get(transfer.from)?;
        if c.house != house {
            return Err(GameError::NotOwner(format!("colony {}", transfer.from)));
        }
        (c.system, c.souls)
    };
    let to_system = {
        let c = state.colonies.get(transfer.to)?;
        if c.house != house {
            return Err(GameError::NotOwner(format!("colony {}", transfer.to)));
        }
        c.system
    };
    let adjacent = from_system == to_system
        || state.starmap.adjacent(from_system).contains(&to_system);
    if !adjacent {
        return Err(GameError::InvalidCommand(
            "transfer colonies must be adjacent".into(),
        ));
    }
    let souls = transfer.ptu * ctx.config.economy.ptu_souls;
    if from_souls - souls < ctx.config.economy.min_viable_souls {
        return Err(GameError::PopulationTooLow {
            colony: transfer.from,
            required: souls + ctx.config.economy.min_viable_souls,
            available: from_souls,
        });
    }
    let spu = ctx.config.economy.souls_per_pu;
    if let Ok(c) = state.colonies.get_mut(transfer.from) {
        c.souls -= souls;
        c.pu = c.souls / spu;
    }
    if let Ok(c) = state.colonies.get_mut(transfer.to) {
        c.souls += souls;
        c.pu = c.souls / spu;
    }
    Ok(())
}

fn start_terraform(
    state: &mut GameState,
    house: HouseId,
    colony_id: ColonyId,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    {
        let colony = state.colonies.get(colony_id)?;
        if colony.house != house {
            return Err(GameError::NotOwner(format!("colony {}", colony_id)));
        }
        if colony.terraforming.is_some() {
            return Err(GameError::InvalidCommand(
                "terraforming already under way".into(),
            ));
        }
        if colony.planet_class.improved().is_none() {
            return Err(GameError::InvalidCommand(
                "planet cannot be improved further".into(),
            ));
        }
    }
    let cost = ctx.config.terraform.cost;
    state.houses.debit(house, cost)?;
    if let Ok(h) = state.houses.get_mut(house) {
        h.telemetry.build_spent += cost;
    }
    ctx.push(GameEvent::BuildCharged {
        house,
        amount: cost,
    });
    if let Ok(colony) = state.colonies.get_mut(colony_id) {
        colony.terraforming = Some(TerraformProject {
            cost_paid: cost,
            turns_remaining: ctx.config.terraform.turns,
        });
    }
    Ok(())
}

/// Step 5: validate and store fleet orders. A new order for a fleet
/// overwrites whatever was pending.
fn store_fleet_orders(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    for (&house, packet) in packets {
        for cmd in &packet.fleet_orders {
            match orders_exec::validate_order(state, house, cmd, ctx.turn) {
                Ok(order) => {
                    state.fleet_orders.insert(cmd.fleet, order);
                }
                Err(e) => {
                    ctx.warn(format!(
                        "house {}: order {:?} for fleet {} dropped: {}",
                        house, cmd.kind, cmd.fleet, e
                    ));
                }
            }
        }
    }
}

/// Step 6: research allocation. The request is scaled proportionally to
/// what the treasury can actually cover; a broke house researches nothing.
fn allocate_research(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    for (&house_id, packet) in packets {
        let request = &packet.research;
        let requested = request.total();
        if requested <= 0 {
            continue;
        }
        let Ok(house) = state.houses.get(house_id) else {
            continue;
        };
        let treasury = house.treasury;
        if treasury <= 0 {
            ctx.warn(format!(
                "house {}: research cancelled, treasury empty",
                house_id
            ));
            continue;
        }
        let budget = requested.min(treasury);

        // Proportional scaling, integer floor per field; zero stays zero.
        let scale = |amount: i64| amount * budget / requested;
        let economic = scale(request.economic);
        let science = scale(request.science);
        let fields: Vec<(TechField, i64)> = request
            .fields
            .iter()
            .map(|(&f, &amount)| (f, scale(amount)))
            .collect();
        let spent = economic + science + fields.iter().map(|(_, a)| a).sum::<i64>();
        if spent <= 0 {
            continue;
        }
        if state.houses.debit(house_id, spent).is_err() {
            continue;
        }

        let gho = income::gross_house_output(state, house_id, ctx.config);
        let Ok(house) = state.houses.get_mut(house_id) else {
            continue;
        };
        house.telemetry.research_spent = spent;
        house.economic_rp += income::pp_to_rp(economic, gho, house.tech.economic, ctx.config);
        house.science_rp += income::pp_to_rp(science, gho, house.tech.science, ctx.config);
        for (field, amount) in fields {
            let level = house.tech.level(field);
            let rp = income::pp_to_rp(amount, gho, level, ctx.config);
            *house.tech_rp.entry(field).or_insert(0) += rp;
        }
        ctx.push(GameEvent::ResearchAllocated {
            house: house_id,
            amount: spent,
        });
    }
}

/// Step 7: build, repair, scrap and covert submissions.
fn submissions(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, &CommandPacket>,
    ctx: &mut TurnContext<'_>,
) {
    for (&house, packet) in packets {
        for cmd in &packet.builds {
            if let Err(e) = construction::submit_build(state, house, cmd, ctx) {
                ctx.warn(format!("house {}: build dropped: {}", house, e));
            }
        }
        for cmd in &packet.repairs {
            if let Err(e) = construction::submit_repair(state, house, cmd, ctx) {
                ctx.warn(format!("house {}: repair dropped: {}", house, e));
            }
        }
        for cmd in &packet.scraps {
            if let Err(e) = apply_scrap(state, house, cmd, ctx) {
                ctx.warn(format!("house {}: scrap dropped: {}", house, e));
            }
        }
        for action in &packet.covert_actions {
            let cost = ctx
                .config
                .espionage
                .mission_costs
                .get(&action.mission)
                .copied()
                .unwrap_or(i64::MAX);
            let affordable = state
                .houses
                .get(house)
                .map(|h| h.ebp >= cost)
                .unwrap_or(false);
            if !affordable {
                ctx.warn(format!(
                    "house {}: covert action dropped, espionage budget too low",
                    house
                ));
                continue;
            }
            if let Ok(h) = state.houses.get_mut(house) {
                h.ebp -= cost;
            }
            state.pending_covert_actions.push(QueuedCovertAction {
                house,
                action: *action,
                turn_queued: ctx.turn,
            });
        }
    }
}

/// Voluntary scrapping credits half the price actually paid. Planet
/// breakers over the colony cap are scrapped without salvage elsewhere;
/// this is the paid-for path.
fn apply_scrap(
    state: &mut GameState,
    house: HouseId,
    cmd: &ScrapCommand,
    ctx: &mut TurnContext<'_>,
) -> GameResult<()> {
    let rate = ctx.config.shortfall.salvage_rate;
    match cmd {
        ScrapCommand::Ship { fleet, ship } => {
            check_fleet_owner(state, house, *fleet)?;
            let removed = state.fleets.remove_ship(*fleet, *ship)?;
            let credit = (removed.cost_paid as f64 * rate).floor() as i64;
            credit_salvage(state, ctx, house, credit);
            if state.fleets.get(*fleet).map(|f| f.is_empty()).unwrap_or(false) {
                state.destroy_fleet(*fleet, "scrapped out", &mut ctx.events);
            }
            Ok(())
        }
        ScrapCommand::Facility { colony, facility } => {
            let c = state.colonies.get(*colony)?;
            if c.house != house {
                return Err(GameError::NotOwner(format!("colony {}", colony)));
            }
            let removed = state.colonies.remove_facility(*facility)?;
            let mut credit = (removed.cost_paid as f64 * rate).floor() as i64;
            // Work in the yard dies with it; refund at the same rate.
            for project in removed
                .active_construction
                .iter()
                .chain(removed.construction_queue.iter())
            {
                credit += (project.cost_paid as f64 * rate).floor() as i64;
            }
            credit_salvage(state, ctx, house, credit);
            Ok(())
        }
        ScrapCommand::GroundUnit { colony, unit } => {
            let c = state.colonies.get_mut(*colony)?;
            if c.house != house {
                return Err(GameError::NotOwner(format!("colony {}", colony)));
            }
            let pos = c
                .ground_units
                .iter()
                .position(|u| u.id == *unit)
                .ok_or(GameError::InvalidCommand(format!(
                    "ground unit {} not found",
                    unit
                )))?;
            let removed = c.ground_units.remove(pos);
            let spec = ctx.config.ground_unit(removed.kind);
            let credit = (spec.cost as f64 * rate).floor() as i64;
            credit_salvage(state, ctx, house, credit);
            Ok(())
        }
    }
}

fn credit_salvage(state: &mut GameState, ctx: &mut TurnContext<'_>, house: HouseId, credit: i64) {
    if credit <= 0 {
        return;
    }
    let _ = state.houses.credit(house, credit);
    if let Ok(h) = state.houses.get_mut(house) {
        h.telemetry.salvage_credited += credit;
    }
    ctx.push(GameEvent::SalvageCredited {
        house,
        amount: credit,
    });
}
