// src/config/mod.rs
//! Declarative balance tables. Loaded once at process start, read-only for
//! the lifetime of a run; `advance` never mutates configuration. A broken
//! config file is the only fatal error in the engine: it surfaces before
//! any turn runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{
    CovertMission, FacilityKind, GroundUnitKind, PlanetClass, ShipClass, TechLevels,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipSpec {
    /// List price in PP. Spaceport (planet-side) builds pay double.
    pub cost: i64,
    pub upkeep: i64,
    pub attack: i32,
    pub defense: i32,
    pub hull: i32,
    pub command_rating: u8,
    /// Marines for transports, colonist PTUs for ETACs, zero otherwise.
    pub cargo_capacity: i64,
    /// Fighter berths for carrier classes.
    pub hangar_capacity: u8,
    /// Minimum construction tech to lay down this hull.
    pub min_cst: u8,
    pub build_turns: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacilitySpec {
    pub cost: i64,
    pub upkeep: i64,
    pub base_docks: u8,
    pub build_turns: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundUnitSpec {
    pub cost: i64,
    pub upkeep: i64,
    pub strength: i64,
    /// Souls conscripted when the unit is recruited (armies and marines).
    pub population_cost: i64,
    pub build_turns: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Output share a blockaded colony retains (0.4 = a 60% reduction).
    pub blockade_output_factor: f64,
    /// EL_MOD = 1 + el_mod_per_level * (EL - 1).
    pub el_mod_per_level: f64,
    pub iu_unit_cost: i64,
    pub infrastructure_unit_cost: i64,
    /// Shortfall phase (c): PP recovered per stripped infrastructure unit.
    pub infra_strip_pp_per_unit: i64,
    /// Damage added per stripped unit.
    pub infra_strip_damage_per_unit: f64,
    /// Damage repaired per infrastructure project unit.
    pub infra_repair_per_unit: f64,
    pub souls_per_pu: i64,
    /// One PTU is ~50,000 souls.
    pub ptu_souls: i64,
    /// A colony may not be drained below this by recruitment or transfer.
    pub min_viable_souls: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeConfig {
    /// Rolling-average tax rate at which the penalty starts.
    pub high_tax_threshold: u8,
    /// Extra -1 penalty per this many points over the threshold.
    pub high_tax_step: u8,
    pub high_tax_max_penalty: i32,
    /// (max_rate, bonus per colony), checked in order. Rates above the last
    /// band earn nothing.
    pub colony_bonus_bands: Vec<(u8, i32)>,
    pub shortfall_base_penalty: i32,
    pub shortfall_penalty_increment: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortfallConfig {
    /// Fraction of the price paid recovered by salvage.
    pub salvage_rate: f64,
    pub crippled_upkeep_mult: f64,
    /// Consecutive shortfall turns before the house collapses.
    pub elimination_threshold: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EspionageConfig {
    pub mission_costs: BTreeMap<CovertMission, i64>,
    /// Spy scout detection: 1d20 >= base - merged_count + defender ELI
    /// + starbase bonus.
    pub detect_base: i32,
    pub starbase_detect_bonus: i32,
    /// Per-turn treasury-to-budget conversion caps.
    pub ebp_invest_cap: i64,
    pub cip_invest_cap: i64,
    /// Chance (percent) a starbase surveillance sweep yields intel.
    pub surveillance_chance: u32,
    /// Jumps a spy scout covers per turn once its ELI reaches
    /// `fast_travel_eli`.
    pub fast_travel_eli: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Squadron cap = max(base, total IU / divisor * mult); scouts exempt.
    pub squadron_cap_base: usize,
    pub squadron_iu_divisor: i64,
    pub squadron_cap_mult: usize,
    /// Turns of grace before over-cap enforcement bites.
    pub grace_turns: u32,
    pub fighters_per_iu: f64,
    pub fighters_per_pu: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionConfig {
    /// Planet-side (spaceport) builds pay this multiple of list price.
    pub spaceport_cost_mult: i64,
    /// Repair cost as a fraction of build cost.
    pub repair_cost_rate: f64,
    pub repair_turns: u8,
    /// Effective docks = base * (1 + cst_dock_bonus * (CST - 1)).
    pub cst_dock_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerraformConfig {
    pub cost: i64,
    pub turns: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Base logistic growth rate per turn.
    pub growth_rate: f64,
    /// Carrying capacity in souls per planet class, Extreme..Eden.
    pub max_souls: [i64; 7],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// RP price scales with house output: cost_per_rp =
    /// max(1, GHO / gho_divisor) * current level.
    pub gho_divisor: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub ships: BTreeMap<ShipClass, ShipSpec>,
    pub facilities: BTreeMap<FacilityKind, FacilitySpec>,
    pub ground_units: BTreeMap<GroundUnitKind, GroundUnitSpec>,
    /// RAW_INDEX: rows are planet classes Extreme..Eden, columns resource
    /// ratings VeryPoor..VeryRich. Values span 0.60 to 1.40.
    pub raw_index: [[f64; 5]; 7],
    pub economy: EconomyConfig,
    pub prestige: PrestigeConfig,
    pub shortfall: ShortfallConfig,
    pub espionage: EspionageConfig,
    pub capacity: CapacityConfig,
    pub construction: ConstructionConfig,
    pub terraform: TerraformConfig,
    pub population: PopulationConfig,
    pub research: ResearchConfig,
    /// When set, pending commissions die with their shipyard. The stock
    /// behavior keeps completed hulls in virtual inventory.
    pub strict_commissioning: bool,
    /// Consecutive packet-less turns before a house goes Autopilot.
    pub mia_threshold: u8,
    /// Consecutive negative-prestige turns before DefensiveCollapse.
    pub collapse_threshold: u8,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn ship(&self, class: ShipClass) -> &ShipSpec {
        // validate() guarantees every class has an entry.
        &self.ships[&class]
    }

    pub fn facility(&self, kind: FacilityKind) -> &FacilitySpec {
        &self.facilities[&kind]
    }

    pub fn ground_unit(&self, kind: GroundUnitKind) -> &GroundUnitSpec {
        &self.ground_units[&kind]
    }

    pub fn raw_index(&self, class: PlanetClass, resources: crate::core::types::ResourceRating) -> f64 {
        self.raw_index[class.index()][resources.index()]
    }

    /// Tech-scaled attack strength for a ship class.
    pub fn attack_strength(&self, class: ShipClass, tech: &TechLevels) -> i64 {
        let spec = self.ship(class);
        i64::from(spec.attack) * (10 + i64::from(tech.weapons) - 1) / 10
    }

    pub fn defense_strength(&self, class: ShipClass, tech: &TechLevels) -> i64 {
        let spec = self.ship(class);
        i64::from(spec.defense) * (10 + i64::from(tech.weapons) - 1) / 10
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for &class in ShipClass::all() {
            let spec = self.ships.get(&class).ok_or_else(|| {
                ConfigError::Invalid(format!("missing ship spec for {:?}", class))
            })?;
            if spec.cost <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "ship {:?} has non-positive cost",
                    class
                )));
            }
            if spec.build_turns == 0 {
                return Err(ConfigError::Invalid(format!(
                    "ship {:?} has zero build time",
                    class
                )));
            }
        }
        for kind in [
            FacilityKind::Spaceport,
            FacilityKind::Shipyard,
            FacilityKind::Drydock,
            FacilityKind::Starbase,
        ] {
            let spec = self.facilities.get(&kind).ok_or_else(|| {
                ConfigError::Invalid(format!("missing facility spec for {:?}", kind))
            })?;
            if spec.base_docks == 0 && kind != FacilityKind::Starbase {
                return Err(ConfigError::Invalid(format!(
                    "facility {:?} has zero docks",
                    kind
                )));
            }
        }
        for kind in [
            GroundUnitKind::Battery,
            GroundUnitKind::Army,
            GroundUnitKind::Marine,
            GroundUnitKind::PlanetaryShield,
        ] {
            if !self.ground_units.contains_key(&kind) {
                return Err(ConfigError::Invalid(format!(
                    "missing ground unit spec for {:?}",
                    kind
                )));
            }
        }
        for row in &self.raw_index {
            for &v in row {
                if !(0.1..=5.0).contains(&v) {
                    return Err(ConfigError::Invalid(format!(
                        "RAW_INDEX entry {} out of range",
                        v
                    )));
                }
            }
        }
        if !(0.0..=1.0).contains(&self.economy.blockade_output_factor) {
            return Err(ConfigError::Invalid(
                "blockade_output_factor must be in 0..=1".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.shortfall.salvage_rate) && self.shortfall.salvage_rate != 1.0
        {
            return Err(ConfigError::Invalid("salvage_rate must be in 0..=1".into()));
        }
        if self.economy.souls_per_pu <= 0 || self.economy.ptu_souls <= 0 {
            return Err(ConfigError::Invalid(
                "population unit sizes must be positive".into(),
            ));
        }
        if self.shortfall.elimination_threshold == 0
            || self.mia_threshold == 0
            || self.collapse_threshold == 0
        {
            return Err(ConfigError::Invalid(
                "status-transition thresholds must be at least 1".into(),
            ));
        }
        for mission in [
            CovertMission::TechTheft,
            CovertMission::Sabotage,
            CovertMission::Assassination,
            CovertMission::CyberAttack,
            CovertMission::Psyops,
        ] {
            if !self.espionage.mission_costs.contains_key(&mission) {
                return Err(ConfigError::Invalid(format!(
                    "missing espionage cost for {:?}",
                    mission
                )));
            }
        }
        Ok(())
    }

    /// Compiled-in defaults used by `start` and the test suite.
    pub fn builtin() -> Config {
        let mut ships = BTreeMap::new();
        let spec = |cost, upkeep, attack, defense, hull, command, cargo, hangar, cst, turns| {
            ShipSpec {
                cost,
                upkeep,
                attack,
                defense,
                hull,
                command_rating: command,
                cargo_capacity: cargo,
                hangar_capacity: hangar,
                min_cst: cst,
                build_turns: turns,
            }
        };
        ships.insert(ShipClass::Fighter, spec(15, 1, 3, 1, 2, 0, 0, 0, 1, 1));
        ships.insert(ShipClass::Corvette, spec(30, 1, 4, 3, 4, 1, 0, 0, 1, 1));
        ships.insert(ShipClass::Frigate, spec(45, 2, 6, 5, 6, 2, 0, 0, 1, 1));
        ships.insert(ShipClass::Destroyer, spec(70, 3, 9, 7, 9, 3, 0, 0, 2, 2));
        ships.insert(ShipClass::LightCruiser, spec(110, 4, 13, 10, 13, 4, 0, 0, 3, 2));
        ships.insert(ShipClass::HeavyCruiser, spec(160, 6, 18, 14, 18, 5, 0, 0, 4, 3));
        ships.insert(ShipClass::Battlecruiser, spec(220, 8, 24, 17, 22, 6, 0, 0, 5, 3));
        ships.insert(ShipClass::Battleship, spec(300, 11, 30, 24, 30, 7, 0, 0, 6, 4));
        ships.insert(ShipClass::Dreadnought, spec(420, 15, 40, 32, 40, 8, 0, 0, 7, 5));
        ships.insert(
            ShipClass::SuperDreadnought,
            spec(600, 22, 55, 45, 55, 9, 0, 0, 8, 6),
        );
        ships.insert(ShipClass::EscortCarrier, spec(180, 6, 5, 10, 16, 5, 0, 4, 4, 3));
        ships.insert(ShipClass::Carrier, spec(320, 11, 8, 16, 26, 7, 0, 8, 6, 4));
        ships.insert(ShipClass::SuperCarrier, spec(520, 18, 10, 22, 38, 8, 0, 14, 8, 5));
        ships.insert(ShipClass::Raider, spec(130, 5, 14, 6, 10, 4, 0, 0, 4, 2));
        ships.insert(ShipClass::Monitor, spec(250, 7, 20, 28, 32, 5, 0, 0, 5, 4));
        ships.insert(ShipClass::Scout, spec(25, 1, 1, 2, 3, 1, 0, 0, 1, 1));
        ships.insert(ShipClass::Etac, spec(90, 3, 0, 3, 8, 2, 40, 0, 1, 2));
        ships.insert(ShipClass::TroopTransport, spec(80, 3, 0, 3, 8, 2, 500, 0, 1, 2));
        ships.insert(ShipClass::PlanetBreaker, spec(900, 30, 80, 20, 45, 9, 0, 0, 9, 8));

        let mut facilities = BTreeMap::new();
        facilities.insert(
            FacilityKind::Spaceport,
            FacilitySpec {
                cost: 150,
                upkeep: 5,
                base_docks: 5,
                build_turns: 3,
            },
        );
        facilities.insert(
            FacilityKind::Shipyard,
            FacilitySpec {
                cost: 300,
                upkeep: 10,
                base_docks: 8,
                build_turns: 4,
            },
        );
        facilities.insert(
            FacilityKind::Drydock,
            FacilitySpec {
                cost: 200,
                upkeep: 6,
                base_docks: 6,
                build_turns: 3,
            },
        );
        facilities.insert(
            FacilityKind::Starbase,
            FacilitySpec {
                cost: 500,
                upkeep: 15,
                base_docks: 0,
                build_turns: 5,
            },
        );

        let mut ground_units = BTreeMap::new();
        ground_units.insert(
            GroundUnitKind::Battery,
            GroundUnitSpec {
                cost: 60,
                upkeep: 2,
                strength: 10,
                population_cost: 0,
                build_turns: 2,
            },
        );
        ground_units.insert(
            GroundUnitKind::Army,
            GroundUnitSpec {
                cost: 50,
                upkeep: 2,
                strength: 12,
                population_cost: 100_000,
                build_turns: 2,
            },
        );
        ground_units.insert(
            GroundUnitKind::Marine,
            GroundUnitSpec {
                cost: 70,
                upkeep: 3,
                strength: 15,
                population_cost: 50_000,
                build_turns: 2,
            },
        );
        ground_units.insert(
            GroundUnitKind::PlanetaryShield,
            GroundUnitSpec {
                cost: 250,
                upkeep: 8,
                strength: 40,
                population_cost: 0,
                build_turns: 4,
            },
        );

        // Rows Extreme..Eden, columns VeryPoor..VeryRich; 0.60 to 1.40.
        let mut raw_index = [[0.0; 5]; 7];
        let class_base = [0.60, 0.70, 0.80, 0.90, 1.00, 1.10, 1.20];
        let resource_step = [0.00, 0.05, 0.10, 0.15, 0.20];
        for (row, base) in class_base.iter().enumerate() {
            for (col, step) in resource_step.iter().enumerate() {
                raw_index[row][col] = base + step;
            }
        }

        let mut mission_costs = BTreeMap::new();
        mission_costs.insert(CovertMission::TechTheft, 40);
        mission_costs.insert(CovertMission::Sabotage, 50);
        mission_costs.insert(CovertMission::Assassination, 80);
        mission_costs.insert(CovertMission::CyberAttack, 35);
        mission_costs.insert(CovertMission::Psyops, 30);

        Config {
            ships,
            facilities,
            ground_units,
            raw_index,
            economy: EconomyConfig {
                blockade_output_factor: 0.4,
                el_mod_per_level: 0.10,
                iu_unit_cost: 20,
                infrastructure_unit_cost: 15,
                infra_strip_pp_per_unit: 10,
                infra_strip_damage_per_unit: 0.02,
                infra_repair_per_unit: 0.02,
                souls_per_pu: 500_000,
                ptu_souls: 50_000,
                min_viable_souls: 1_000_000,
            },
            prestige: PrestigeConfig {
                high_tax_threshold: 51,
                high_tax_step: 5,
                high_tax_max_penalty: 11,
                colony_bonus_bands: vec![(10, 3), (20, 2), (40, 1)],
                shortfall_base_penalty: 2,
                shortfall_penalty_increment: 1,
            },
            shortfall: ShortfallConfig {
                salvage_rate: 0.5,
                crippled_upkeep_mult: 1.5,
                elimination_threshold: 3,
            },
            espionage: EspionageConfig {
                mission_costs,
                detect_base: 15,
                starbase_detect_bonus: 2,
                ebp_invest_cap: 100,
                cip_invest_cap: 100,
                surveillance_chance: 35,
                fast_travel_eli: 3,
            },
            capacity: CapacityConfig {
                squadron_cap_base: 8,
                squadron_iu_divisor: 100,
                squadron_cap_mult: 2,
                grace_turns: 2,
                fighters_per_iu: 0.5,
                fighters_per_pu: 1.0,
            },
            construction: ConstructionConfig {
                spaceport_cost_mult: 2,
                repair_cost_rate: 0.25,
                repair_turns: 1,
                cst_dock_bonus: 0.10,
            },
            terraform: TerraformConfig {
                cost: 400,
                turns: 10,
            },
            population: PopulationConfig {
                growth_rate: 0.02,
                max_souls: [
                    50_000_000,
                    120_000_000,
                    300_000_000,
                    800_000_000,
                    2_000_000_000,
                    5_000_000_000,
                    10_000_000_000,
                ],
            },
            research: ResearchConfig { gho_divisor: 1000 },
            strict_commissioning: false,
            mia_threshold: 3,
            collapse_threshold: 3,
        }
    }
}
