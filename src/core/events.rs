// src/core/events.rs
use serde::{Deserialize, Serialize};

use crate::core::types::*;

/// Ordered log entry emitted during a turn. The sequence is part of the
/// deterministic output contract: same state, packets and seed produce the
/// same events in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ShipCommissioned {
        house: HouseId,
        colony: ColonyId,
        ship: ShipId,
        class: ShipClass,
        /// `None` for colony-resident fighters.
        fleet: Option<FleetId>,
    },
    BuildingCompleted {
        colony: ColonyId,
        facility: FacilityId,
        kind: FacilityKind,
    },
    UnitRecruited {
        colony: ColonyId,
        unit: GroundUnitId,
        kind: GroundUnitKind,
    },
    OrderCompleted {
        fleet: FleetId,
        order: OrderKind,
    },
    OrderFailed {
        fleet: FleetId,
        order: OrderKind,
        reason: String,
    },
    OrderAborted {
        fleet: FleetId,
        order: OrderKind,
        reason: String,
    },
    FleetMerged {
        into: FleetId,
        from: FleetId,
    },
    FleetDestroyed {
        fleet: FleetId,
        house: HouseId,
        reason: String,
    },
    ColonyColonized {
        system: SystemId,
        colony: ColonyId,
        house: HouseId,
    },
    ColonyBlockaded {
        colony: ColonyId,
        by: Vec<HouseId>,
    },
    ColonyCaptured {
        colony: ColonyId,
        from: HouseId,
        to: HouseId,
    },
    ColonyBombarded {
        colony: ColonyId,
        house: HouseId,
        damage: f64,
    },
    CombatResolved {
        system: SystemId,
        participants: Vec<HouseId>,
    },
    InvasionResolved {
        colony: ColonyId,
        attacker: HouseId,
        success: bool,
    },
    EspionageResolved {
        house: HouseId,
        target: HouseId,
        mission: EspionageKind,
        success: bool,
    },
    SpyScoutDetected {
        scout: ScoutId,
        house: HouseId,
        system: SystemId,
    },
    SpyScoutDeployed {
        scout: ScoutId,
        house: HouseId,
        target: SystemId,
    },
    MaintenanceShortfall {
        house: HouseId,
        step: ShortfallStep,
        amount: i64,
    },
    HouseEliminated {
        house: HouseId,
    },
    HouseStatusChanged {
        house: HouseId,
        status: HouseStatus,
    },
    PrestigeAdjusted {
        house: HouseId,
        delta: i32,
        reason: String,
    },
    ShipProductionLost {
        colony: ColonyId,
        facility: FacilityId,
        class: ShipClass,
    },
    EngineWarning {
        message: String,
    },
    // Budget conservation trail: treasury' = treasury + income - research
    // - builds - upkeep + salvage, all reconstructible from the log.
    IncomeCollected {
        house: HouseId,
        amount: i64,
    },
    ResearchAllocated {
        house: HouseId,
        amount: i64,
    },
    BuildCharged {
        house: HouseId,
        amount: i64,
    },
    UpkeepPaid {
        house: HouseId,
        amount: i64,
    },
    SalvageCredited {
        house: HouseId,
        amount: i64,
    },
    PopulationGrowth {
        colony: ColonyId,
        souls: i64,
    },
    TerraformCompleted {
        colony: ColonyId,
        class: PlanetClass,
    },
    SquadronDisbanded {
        fleet: FleetId,
        squadron: SquadronId,
        reason: String,
    },
}

/// Order discriminant carried in order lifecycle events; payloads live on
/// the stored order itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum OrderKind {
    Hold,
    Move,
    SeekHome,
    Patrol,
    GuardStarbase,
    GuardPlanet,
    Blockade,
    Bombard,
    Invade,
    Blitz,
    SpyPlanet,
    HackStarbase,
    SpySystem,
    Colonize,
    JoinFleet,
    Rendezvous,
    Salvage,
    Reserve,
    Mothball,
    Reactivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EspionageKind {
    FleetMission(SpyMission),
    Covert(CovertMission),
    Surveillance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortfallStep {
    SalvageMothballed,
    SalvageReserve,
    SalvageActive,
    StripInfrastructure,
    TreasuryZeroed,
}

/// Per-battle output from the combat resolver collaborator. The engine
/// treats the body as opaque apart from the destroyed-ship list, which it
/// uses to strip wrecks and clean up emptied fleets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatReport {
    pub system: SystemId,
    pub participants: Vec<HouseId>,
    pub destroyed: Vec<ShipLoss>,
    pub crippled: Vec<ShipLoss>,
    pub winner: Option<HouseId>,
    pub rounds: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipLoss {
    pub house: HouseId,
    pub fleet: FleetId,
    pub ship: ShipId,
    pub class: ShipClass,
}
