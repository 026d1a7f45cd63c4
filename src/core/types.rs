// src/core/types.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Core type aliases
pub type GameResult<T> = Result<T, GameError>;
pub type HouseId = u8;
pub type SystemId = u16;
pub type ColonyId = u32;
pub type FleetId = u32;
pub type SquadronId = u32;
pub type ShipId = u32;
pub type FacilityId = u32;
pub type GroundUnitId = u32;
pub type ScoutId = u32;

/// Domain errors. Inside a turn these never escape a phase: the offending
/// command is dropped and the error becomes an `EngineWarning` event.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("house {0} not found")]
    HouseNotFound(HouseId),

    #[error("system {0} not found")]
    SystemNotFound(SystemId),

    #[error("colony {0} not found")]
    ColonyNotFound(ColonyId),

    #[error("no colony in system {0}")]
    NoColonyInSystem(SystemId),

    #[error("fleet {0} not found")]
    FleetNotFound(FleetId),

    #[error("squadron {0} not found")]
    SquadronNotFound(SquadronId),

    #[error("ship {0} not found")]
    ShipNotFound(ShipId),

    #[error("facility {0} not found")]
    FacilityNotFound(FacilityId),

    #[error("spy scout {0} not found")]
    ScoutNotFound(ScoutId),

    #[error("insufficient treasury: need {required}, have {available}")]
    InsufficientTreasury { required: i64, available: i64 },

    #[error("dock capacity exceeded at facility {0}")]
    DockCapacityExceeded(FacilityId),

    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("population too low at colony {colony}: {available} souls, need {required}")]
    PopulationTooLow {
        colony: ColonyId,
        required: i64,
        available: i64,
    },

    #[error("fleet {0} is not mobile in its current status")]
    FleetNotMobile(FleetId),

    #[error("not the owner of {0}")]
    NotOwner(String),

    #[error("no jump path between systems {0} and {1}")]
    NoPath(SystemId, SystemId),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Habitability grade of a planet, worst (Extreme) to best (Eden).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PlanetClass {
    Extreme,
    Desolate,
    Hostile,
    Harsh,
    Benign,
    Lush,
    Eden,
}

impl PlanetClass {
    pub fn index(self) -> usize {
        self as usize
    }

    /// One step toward Eden, or `None` if already there. Terraforming uses this.
    pub fn improved(self) -> Option<PlanetClass> {
        match self {
            PlanetClass::Extreme => Some(PlanetClass::Desolate),
            PlanetClass::Desolate => Some(PlanetClass::Hostile),
            PlanetClass::Hostile => Some(PlanetClass::Harsh),
            PlanetClass::Harsh => Some(PlanetClass::Benign),
            PlanetClass::Benign => Some(PlanetClass::Lush),
            PlanetClass::Lush => Some(PlanetClass::Eden),
            PlanetClass::Eden => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ResourceRating {
    VeryPoor,
    Poor,
    Abundant,
    Rich,
    VeryRich,
}

impl ResourceRating {
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiplomaticStatus {
    Neutral,
    Ally,
    Hostile,
    Enemy,
}

impl DiplomaticStatus {
    /// Hostile and Enemy pairs fight on sight.
    pub fn is_belligerent(self) -> bool {
        matches!(self, DiplomaticStatus::Hostile | DiplomaticStatus::Enemy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HouseStatus {
    Active,
    /// MIA: three consecutive turns without a command packet.
    Autopilot,
    /// Eliminated; assets retained for audit only.
    DefensiveCollapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FleetStatus {
    Active,
    Reserve,
    Mothballed,
}

impl FleetStatus {
    /// Maintenance rate multiplier: Active 100%, Reserve 50%, Mothballed 0%.
    pub fn upkeep_factor(self) -> f64 {
        match self {
            FleetStatus::Active => 1.0,
            FleetStatus::Reserve => 0.5,
            FleetStatus::Mothballed => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadronType {
    Combat,
    Auxiliary,
    Intel,
    Expansion,
    Fighter,
}

/// Research fields tracked per house. Levels start at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TechField {
    Construction,
    EconomicLevel,
    ScienceLevel,
    Weapons,
    ElectronicIntel,
}

impl TechField {
    pub fn all() -> &'static [TechField] {
        &[
            TechField::Construction,
            TechField::EconomicLevel,
            TechField::ScienceLevel,
            TechField::Weapons,
            TechField::ElectronicIntel,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechLevels {
    pub construction: u8,
    pub economic: u8,
    pub science: u8,
    pub weapons: u8,
    pub electronic_intel: u8,
}

impl Default for TechLevels {
    fn default() -> Self {
        Self {
            construction: 1,
            economic: 1,
            science: 1,
            weapons: 1,
            electronic_intel: 1,
        }
    }
}

impl TechLevels {
    pub fn level(&self, field: TechField) -> u8 {
        match field {
            TechField::Construction => self.construction,
            TechField::EconomicLevel => self.economic,
            TechField::ScienceLevel => self.science,
            TechField::Weapons => self.weapons,
            TechField::ElectronicIntel => self.electronic_intel,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FacilityKind {
    Spaceport,
    Shipyard,
    Drydock,
    Starbase,
}

impl FacilityKind {
    /// Spaceports serve only construction; Drydocks only repair;
    /// Shipyards both; Starbases are defensive and serve neither.
    pub fn can_construct(self) -> bool {
        matches!(self, FacilityKind::Spaceport | FacilityKind::Shipyard)
    }

    pub fn can_repair(self) -> bool {
        matches!(self, FacilityKind::Shipyard | FacilityKind::Drydock)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GroundUnitKind {
    Battery,
    Army,
    Marine,
    PlanetaryShield,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ShipClass {
    Fighter,
    Corvette,
    Frigate,
    Destroyer,
    LightCruiser,
    HeavyCruiser,
    Battlecruiser,
    Battleship,
    Dreadnought,
    SuperDreadnought,
    EscortCarrier,
    Carrier,
    SuperCarrier,
    Raider,
    Monitor,
    Scout,
    Etac,
    TroopTransport,
    PlanetBreaker,
}

impl ShipClass {
    pub fn all() -> &'static [ShipClass] {
        &[
            ShipClass::Fighter,
            ShipClass::Corvette,
            ShipClass::Frigate,
            ShipClass::Destroyer,
            ShipClass::LightCruiser,
            ShipClass::HeavyCruiser,
            ShipClass::Battlecruiser,
            ShipClass::Battleship,
            ShipClass::Dreadnought,
            ShipClass::SuperDreadnought,
            ShipClass::EscortCarrier,
            ShipClass::Carrier,
            ShipClass::SuperCarrier,
            ShipClass::Raider,
            ShipClass::Monitor,
            ShipClass::Scout,
            ShipClass::Etac,
            ShipClass::TroopTransport,
            ShipClass::PlanetBreaker,
        ]
    }

    /// ETACs and Troop Transports ride in a fleet's spacelift list,
    /// never in a squadron.
    pub fn is_spacelift(self) -> bool {
        matches!(self, ShipClass::Etac | ShipClass::TroopTransport)
    }

    pub fn is_carrier(self) -> bool {
        matches!(
            self,
            ShipClass::EscortCarrier | ShipClass::Carrier | ShipClass::SuperCarrier
        )
    }

    pub fn is_combat(self) -> bool {
        !matches!(
            self,
            ShipClass::Scout | ShipClass::Etac | ShipClass::TroopTransport
        )
    }

    /// Raiders run cloaked; only an opposing scout reveals them.
    pub fn is_cloaked(self) -> bool {
        matches!(self, ShipClass::Raider)
    }

    pub fn squadron_type(self) -> SquadronType {
        match self {
            ShipClass::Fighter => SquadronType::Fighter,
            ShipClass::Scout => SquadronType::Intel,
            ShipClass::Etac => SquadronType::Expansion,
            ShipClass::TroopTransport => SquadronType::Auxiliary,
            _ => SquadronType::Combat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpyMission {
    SpyPlanet,
    HackStarbase,
    SpySystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpyState {
    Traveling,
    OnMission,
    Returning,
    Detected,
}

/// Covert missions paid from the espionage budget (EBP).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CovertMission {
    TechTheft,
    Sabotage,
    Assassination,
    CyberAttack,
    Psyops,
}

/// Hands out fresh entity ids. One per game; ids are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGenerator {
    next_colony: ColonyId,
    next_fleet: FleetId,
    next_squadron: SquadronId,
    next_ship: ShipId,
    next_facility: FacilityId,
    next_ground_unit: GroundUnitId,
    next_scout: ScoutId,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colony(&mut self) -> ColonyId {
        let id = self.next_colony;
        self.next_colony += 1;
        id
    }

    pub fn fleet(&mut self) -> FleetId {
        let id = self.next_fleet;
        self.next_fleet += 1;
        id
    }

    pub fn squadron(&mut self) -> SquadronId {
        let id = self.next_squadron;
        self.next_squadron += 1;
        id
    }

    pub fn ship(&mut self) -> ShipId {
        let id = self.next_ship;
        self.next_ship += 1;
        id
    }

    pub fn facility(&mut self) -> FacilityId {
        let id = self.next_facility;
        self.next_facility += 1;
        id
    }

    pub fn ground_unit(&mut self) -> GroundUnitId {
        let id = self.next_ground_unit;
        self.next_ground_unit += 1;
        id
    }

    pub fn scout(&mut self) -> ScoutId {
        let id = self.next_scout;
        self.next_scout += 1;
        id
    }
}
