// src/core/orders.rs
//! Player-submitted commands: the per-turn command packet, fleet orders and
//! the administrative zero-turn commands executed inside the Command phase.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::events::OrderKind;
use crate::core::types::*;

/// A stored fleet order. Submitted in Command, activated next Maintenance,
/// executed in the phase its kind belongs to, then cleaned up by the
/// following Command once a lifecycle event names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetOrder {
    pub fleet: FleetId,
    pub house: HouseId,
    pub kind: OrderKind,
    pub target_system: Option<SystemId>,
    pub target_fleet: Option<FleetId>,
    pub priority: u8,
    /// Rules of engagement, 0 (evade) to 10 (press home).
    pub roe: Option<u8>,
    pub active: bool,
    pub issued_turn: u32,
}

impl FleetOrder {
    /// Orders that move or act on the map reject Reserve/Mothballed fleets.
    pub fn requires_motion(&self) -> bool {
        !matches!(
            self.kind,
            OrderKind::Hold | OrderKind::Reserve | OrderKind::Mothball | OrderKind::Reactivate
        )
    }
}

/// Submission shape for a fleet order inside a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetOrderCommand {
    pub fleet: FleetId,
    pub kind: OrderKind,
    pub target_system: Option<SystemId>,
    pub target_fleet: Option<FleetId>,
    pub priority: u8,
    pub roe: Option<u8>,
}

/// Zero-turn administrative commands, executed synchronously in Command
/// steps 3–4. Failures drop the single command, not the packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdminCommand {
    MergeFleets {
        from: FleetId,
        into: FleetId,
    },
    /// Split the named ships out of a fleet into a fresh fleet at the same
    /// system.
    DetachShips {
        fleet: FleetId,
        ships: Vec<ShipId>,
    },
    TransferShips {
        from: FleetId,
        to: FleetId,
        ships: Vec<ShipId>,
    },
    LoadCargo {
        fleet: FleetId,
        cargo: CargoSpec,
    },
    UnloadCargo {
        fleet: FleetId,
    },
    LoadFighters {
        fleet: FleetId,
    },
    UnloadFighters {
        fleet: FleetId,
    },
    TransferShipBetweenSquadrons {
        fleet: FleetId,
        from_squadron: SquadronId,
        to_squadron: SquadronId,
        ship: ShipId,
    },
    AssignSquadronToFleet {
        from_fleet: FleetId,
        squadron: SquadronId,
        to_fleet: FleetId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CargoSpec {
    Marines { units: i64 },
    Colonists { ptu: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildCommand {
    pub colony: ColonyId,
    /// Explicit dock choice; otherwise the lowest-id facility of a suitable
    /// kind with free capacity is picked.
    pub facility: Option<FacilityId>,
    pub project: ProjectKindSpec,
}

/// What to build. Mirrors `ProjectKind` without the cost bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectKindSpec {
    Ship(ShipClass),
    Facility(FacilityKind),
    GroundUnit(GroundUnitKind),
    Industrial { units: i64 },
    Infrastructure { units: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCommand {
    pub colony: ColonyId,
    pub target: RepairTargetSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairTargetSpec {
    Ship { fleet: FleetId, ship: ShipId },
    Starbase { facility: FacilityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapCommand {
    Ship { fleet: FleetId, ship: ShipId },
    Facility { colony: ColonyId, facility: FacilityId },
    GroundUnit { colony: ColonyId, unit: GroundUnitId },
}

/// Requested PP split. Treated as a request: scaled down proportionally
/// when the treasury cannot cover the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchAllocation {
    pub economic: i64,
    pub science: i64,
    pub fields: BTreeMap<TechField, i64>,
}

impl ResearchAllocation {
    pub fn total(&self) -> i64 {
        self.economic + self.science + self.fields.values().sum::<i64>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomaticAction {
    pub toward: HouseId,
    pub status: DiplomaticStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationTransfer {
    pub from: ColonyId,
    pub to: ColonyId,
    pub ptu: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovertAction {
    pub mission: CovertMission,
    pub target: HouseId,
}

/// Per-colony management toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyControl {
    pub colony: ColonyId,
    pub auto_repair: Option<bool>,
    pub auto_load_fighters: Option<bool>,
    /// `Some(None)` clears an override, `Some(Some(r))` sets one.
    pub tax_override: Option<Option<u8>>,
}

/// Everything one house submits for one turn. Absent packets count toward
/// the MIA counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandPacket {
    pub house: HouseId,
    pub fleet_orders: Vec<FleetOrderCommand>,
    pub admin_commands: Vec<AdminCommand>,
    pub builds: Vec<BuildCommand>,
    pub repairs: Vec<RepairCommand>,
    pub scraps: Vec<ScrapCommand>,
    pub research: ResearchAllocation,
    pub diplomacy: Vec<DiplomaticAction>,
    pub population_transfers: Vec<PopulationTransfer>,
    pub terraform: Vec<ColonyId>,
    pub colony_controls: Vec<ColonyControl>,
    pub covert_actions: Vec<CovertAction>,
    pub tax_rate: Option<u8>,
    pub ebp_investment: i64,
    pub cip_investment: i64,
}

impl CommandPacket {
    pub fn empty(house: HouseId) -> Self {
        Self {
            house,
            ..Default::default()
        }
    }
}

/// A covert action queued during Command, resolved next Conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedCovertAction {
    pub house: HouseId,
    pub action: CovertAction,
    pub turn_queued: u32,
}
