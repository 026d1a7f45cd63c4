// src/core/entities.rs
//! Entity records for the world state. Every entity is owned by exactly one
//! parent aggregate and referenced elsewhere by id only; lookups through the
//! managers return `GameResult` so a stale id degrades into a dropped command
//! instead of a panic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    /// Production Points. The single currency for everything.
    pub treasury: i64,
    pub prestige: i32,
    pub tech: TechLevels,
    /// Current tax rate, 0–100.
    pub tax_rate: u8,
    /// Rolling window of the last six turns' tax rates, oldest first.
    pub tax_history: VecDeque<u8>,
    /// Espionage Budget Points.
    pub ebp: i64,
    /// Counter-Intelligence Points.
    pub cip: i64,
    pub relations: BTreeMap<HouseId, DiplomaticStatus>,
    pub violations: Vec<Violation>,
    pub status: HouseStatus,
    pub turns_without_orders: u8,
    pub negative_prestige_turns: u8,
    pub consecutive_shortfall_turns: u8,
    /// Turn at which the squadron-cap grace period ends, if over cap.
    pub squadron_cap_grace_until: Option<u32>,
    // Research accumulators. Level advancement is handled outside the engine.
    pub economic_rp: i64,
    pub science_rp: i64,
    pub tech_rp: BTreeMap<TechField, i64>,
    pub telemetry: HouseTelemetry,
}

impl House {
    pub fn new(id: HouseId, name: String) -> Self {
        Self {
            id,
            name,
            treasury: 0,
            prestige: 0,
            tech: TechLevels::default(),
            tax_rate: 20,
            tax_history: VecDeque::new(),
            ebp: 0,
            cip: 0,
            relations: BTreeMap::new(),
            violations: Vec::new(),
            status: HouseStatus::Active,
            turns_without_orders: 0,
            negative_prestige_turns: 0,
            consecutive_shortfall_turns: 0,
            squadron_cap_grace_until: None,
            economic_rp: 0,
            science_rp: 0,
            tech_rp: BTreeMap::new(),
            telemetry: HouseTelemetry::default(),
        }
    }

    pub fn relation_to(&self, other: HouseId) -> DiplomaticStatus {
        self.relations
            .get(&other)
            .copied()
            .unwrap_or(DiplomaticStatus::Neutral)
    }

    pub fn is_eliminated(&self) -> bool {
        self.status == HouseStatus::DefensiveCollapse
    }

    /// Mean of the rolling tax history, rounded down. Used by the prestige
    /// policy in the Income phase.
    pub fn average_tax_rate(&self) -> u8 {
        if self.tax_history.is_empty() {
            return self.tax_rate;
        }
        let sum: u32 = self.tax_history.iter().map(|&r| u32::from(r)).sum();
        (sum / self.tax_history.len() as u32) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub turn: u32,
    pub against: HouseId,
    pub description: String,
}

/// Per-turn totals kept for the report generator; reset each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseTelemetry {
    pub ships_lost: u32,
    pub ships_destroyed: u32,
    pub espionage_attempts: u32,
    pub research_spent: i64,
    pub build_spent: i64,
    pub upkeep_paid: i64,
    pub income_collected: i64,
    pub salvage_credited: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
    pub id: ColonyId,
    pub house: HouseId,
    pub system: SystemId,
    /// Exact population. Display unit is millions; transfers move PTUs.
    pub souls: i64,
    /// Population Units, the production measure. Derived from souls.
    pub pu: i64,
    /// Industrial Units.
    pub iu: i64,
    /// Bombardment damage, 0.0 (intact) to 1.0 (razed).
    pub infrastructure_damage: f64,
    pub planet_class: PlanetClass,
    pub resources: ResourceRating,
    pub spaceports: Vec<FacilityId>,
    pub shipyards: Vec<FacilityId>,
    pub drydocks: Vec<FacilityId>,
    pub starbases: Vec<FacilityId>,
    pub ground_units: Vec<GroundUnit>,
    /// Colony-resident fighters. Carriers load from here.
    pub fighters: Vec<Ship>,
    pub tax_override: Option<u8>,
    pub auto_repair: bool,
    pub auto_load_fighters: bool,
    pub blockaded: bool,
    pub blockaded_by: BTreeSet<HouseId>,
    pub blockade_turns: u32,
    pub terraforming: Option<TerraformProject>,
    /// Planet-side construction: one active project plus a FIFO queue.
    /// Facilities, ground units, IU and infrastructure build here; ships
    /// build at spaceport/shipyard docks.
    pub construction_slot: Option<ConstructionProject>,
    pub construction_queue: VecDeque<ConstructionProject>,
    /// Turn at which the fighter-cap grace period ends, if over cap.
    pub fighter_cap_grace_until: Option<u32>,
    /// Ships waiting for fleet assignment (transient).
    pub unassigned_ships: Vec<Ship>,
}

impl Colony {
    pub fn facility_ids(&self) -> impl Iterator<Item = FacilityId> + '_ {
        self.spaceports
            .iter()
            .chain(self.shipyards.iter())
            .chain(self.drydocks.iter())
            .chain(self.starbases.iter())
            .copied()
    }

    pub fn facility_list_mut(&mut self, kind: FacilityKind) -> &mut Vec<FacilityId> {
        match kind {
            FacilityKind::Spaceport => &mut self.spaceports,
            FacilityKind::Shipyard => &mut self.shipyards,
            FacilityKind::Drydock => &mut self.drydocks,
            FacilityKind::Starbase => &mut self.starbases,
        }
    }

    pub fn facility_list(&self, kind: FacilityKind) -> &Vec<FacilityId> {
        match kind {
            FacilityKind::Spaceport => &self.spaceports,
            FacilityKind::Shipyard => &self.shipyards,
            FacilityKind::Drydock => &self.drydocks,
            FacilityKind::Starbase => &self.starbases,
        }
    }

    pub fn ground_strength(&self, kind: GroundUnitKind) -> i64 {
        self.ground_units
            .iter()
            .filter(|u| u.kind == kind)
            .map(|u| u.strength)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundUnit {
    pub id: GroundUnitId,
    pub kind: GroundUnitKind,
    pub strength: i64,
}

/// Orbital or ground installation owned by a colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub colony: ColonyId,
    pub kind: FacilityKind,
    pub base_docks: u8,
    /// base_docks scaled by construction tech; recomputed when CST changes.
    pub effective_docks: u8,
    pub crippled: bool,
    pub cost_paid: i64,
    pub active_construction: Vec<ConstructionProject>,
    pub construction_queue: VecDeque<ConstructionProject>,
    pub active_repairs: Vec<RepairProject>,
    pub repair_queue: VecDeque<RepairProject>,
}

impl Facility {
    /// Docks occupied by work in progress (construction and repair share
    /// the same berths on a shipyard).
    pub fn active_total(&self) -> usize {
        self.active_construction.len() + self.active_repairs.len()
    }

    /// Dual-slot capacity: each dock holds one active and one waiting
    /// project, so a facility accepts up to 2x effective docks of
    /// construction before refusing a submission.
    pub fn construction_capacity(&self) -> usize {
        self.effective_docks as usize * 2
    }

    pub fn construction_load(&self) -> usize {
        self.active_construction.len() + self.construction_queue.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    pub id: FleetId,
    pub house: HouseId,
    pub system: SystemId,
    pub squadrons: Vec<Squadron>,
    /// ETACs and Troop Transports; not squadron members.
    pub spacelift: Vec<Ship>,
    pub status: FleetStatus,
}

impl Fleet {
    pub fn is_empty(&self) -> bool {
        self.squadrons.is_empty() && self.spacelift.is_empty()
    }

    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.squadrons
            .iter()
            .flat_map(|s| s.ships())
            .chain(self.spacelift.iter())
    }

    pub fn has_combat_ships(&self) -> bool {
        self.ships().any(|s| s.class.is_combat())
    }

    pub fn has_scout(&self) -> bool {
        self.ships().any(|s| s.class == ShipClass::Scout)
    }

    pub fn scout_count(&self) -> usize {
        self.ships().filter(|s| s.class == ShipClass::Scout).count()
    }

    /// A contingent is cloaked only if every ship in it is.
    pub fn is_cloaked(&self) -> bool {
        let mut any = false;
        for ship in self.ships() {
            if !ship.class.is_cloaked() {
                return false;
            }
            any = true;
        }
        any
    }

    /// Pure-scout fleets collect newly commissioned scouts.
    pub fn is_pure_scout(&self) -> bool {
        self.spacelift.is_empty()
            && !self.squadrons.is_empty()
            && self
                .squadrons
                .iter()
                .all(|s| s.ships().all(|ship| ship.class == ShipClass::Scout))
    }

    pub fn find_ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships().find(|s| s.id == id)
    }

    pub fn find_ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        for squadron in &mut self.squadrons {
            if squadron.flagship.id == id {
                return Some(&mut squadron.flagship);
            }
            if let Some(ship) = squadron.escorts.iter_mut().find(|s| s.id == id) {
                return Some(ship);
            }
        }
        self.spacelift.iter_mut().find(|s| s.id == id)
    }

    pub fn loaded_marines(&self) -> i64 {
        self.spacelift
            .iter()
            .filter_map(|s| match &s.cargo {
                Cargo::Marines { units } => Some(*units),
                _ => None,
            })
            .sum()
    }

    pub fn loaded_colonists(&self) -> i64 {
        self.spacelift
            .iter()
            .filter_map(|s| match &s.cargo {
                Cargo::Colonists { ptu } => Some(*ptu),
                _ => None,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squadron {
    pub id: SquadronId,
    /// The flagship's class determines the squadron's command rating.
    pub flagship: Ship,
    pub escorts: Vec<Ship>,
    pub kind: SquadronType,
}

impl Squadron {
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        std::iter::once(&self.flagship).chain(self.escorts.iter())
    }

    pub fn ship_count(&self) -> usize {
        1 + self.escorts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub class: ShipClass,
    pub crippled: bool,
    pub cargo: Cargo,
    /// Price actually paid at build time. Salvage and refunds derive from
    /// this, not from the list price (spaceport builds pay double).
    pub cost_paid: i64,
}

impl Ship {
    pub fn new(id: ShipId, class: ShipClass, cost_paid: i64) -> Self {
        Self {
            id,
            class,
            crippled: false,
            cargo: Cargo::None,
            cost_paid,
        }
    }
}

/// Class-dependent cargo. Transports carry marines, ETACs carry colonist
/// PTUs, carriers hangar fighters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cargo {
    None,
    Marines { units: i64 },
    Colonists { ptu: i64 },
    Fighters { ships: Vec<Ship> },
}

impl Cargo {
    pub fn is_empty(&self) -> bool {
        match self {
            Cargo::None => true,
            Cargo::Marines { units } => *units == 0,
            Cargo::Colonists { ptu } => *ptu == 0,
            Cargo::Fighters { ships } => ships.is_empty(),
        }
    }
}

/// Independent first-class entity; never a squadron member. Deploying one
/// consumes a Scout ship from a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpyScout {
    pub id: ScoutId,
    pub house: HouseId,
    pub system: SystemId,
    pub eli: u8,
    pub mission: SpyMission,
    pub target: SystemId,
    pub state: SpyState,
    pub path: Vec<SystemId>,
    pub path_index: usize,
    /// Merged scouts share a mesh network; the count feeds detection math.
    pub merged_count: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectKind {
    Ship(ShipClass),
    Facility(FacilityKind),
    GroundUnit(GroundUnitKind),
    Industrial { units: i64 },
    Infrastructure { units: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionProject {
    pub kind: ProjectKind,
    pub cost: i64,
    pub cost_paid: i64,
    pub turns_remaining: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairTarget {
    /// Ship stays in its fleet while yard crews work on it.
    Ship { fleet: FleetId, ship: ShipId },
    Starbase { colony: ColonyId, facility: FacilityId },
}

pub const REPAIR_PRIORITY_SHIP: u8 = 1;
pub const REPAIR_PRIORITY_STARBASE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairProject {
    pub target: RepairTarget,
    /// 25% of build cost.
    pub cost: i64,
    pub turns_remaining: u8,
    /// Construction is 0 (implicit); ship repair 1; starbase repair 2.
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformProject {
    pub cost_paid: i64,
    pub turns_remaining: u8,
}

/// A completed military hull waiting for next turn's Command phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCommission {
    pub house: HouseId,
    pub colony: ColonyId,
    pub facility: FacilityId,
    pub class: ShipClass,
    pub cost_paid: i64,
}
